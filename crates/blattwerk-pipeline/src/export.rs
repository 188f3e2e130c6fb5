// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Batch export — hand a finished job's artifacts to a sink, either one on
// demand or all of them paced at a fixed interval.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use blattwerk_core::config::PipelineConfig;
use blattwerk_core::error::{BlattwerkError, Result};
use blattwerk_core::types::{JobStatus, OutputArtifact};
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};

use crate::job::ConversionJob;

/// Destination for exported artifacts (a download folder, a test buffer...).
///
/// `emit` may block: bulk exports call it on the tokio blocking pool.
pub trait ArtifactSink: Send + Sync {
    /// Deliver one artifact. Called once per emission; the same artifact may
    /// be delivered more than once.
    fn emit(&self, artifact: &OutputArtifact) -> Result<()>;
}

/// Sink that keeps every emission in memory, in emission order.
#[derive(Debug, Default)]
pub struct MemorySink {
    emitted: Mutex<Vec<(tokio::time::Instant, OutputArtifact)>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.emitted.lock().map_or(0, |emitted| emitted.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Names of emitted artifacts, in emission order.
    pub fn names(&self) -> Vec<String> {
        self.emitted
            .lock()
            .map(|emitted| emitted.iter().map(|(_, artifact)| artifact.name.clone()).collect())
            .unwrap_or_default()
    }

    /// Emission timestamps paired with artifact names.
    pub fn timeline(&self) -> Vec<(tokio::time::Instant, String)> {
        self.emitted
            .lock()
            .map(|emitted| {
                emitted
                    .iter()
                    .map(|(at, artifact)| (*at, artifact.name.clone()))
                    .collect()
            })
            .unwrap_or_default()
    }
}

impl ArtifactSink for MemorySink {
    fn emit(&self, artifact: &OutputArtifact) -> Result<()> {
        let mut emitted = self
            .emitted
            .lock()
            .map_err(|_| BlattwerkError::Export("memory sink lock poisoned".into()))?;
        emitted.push((tokio::time::Instant::now(), artifact.clone()));
        Ok(())
    }
}

/// Emissions scheduled by one [`BatchExportScheduler::export_all`] call.
#[derive(Debug)]
pub struct ExportBatch {
    handles: Vec<JoinHandle<Result<()>>>,
}

impl ExportBatch {
    /// Number of scheduled emissions.
    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// Wait for every emission. Returns the first failure, after all have run.
    pub async fn join(self) -> Result<()> {
        let mut first_error = None;
        for handle in self.handles {
            let outcome = handle
                .await
                .map_err(|err| BlattwerkError::Task(err.to_string()))
                .and_then(|result| result);
            if let Err(err) = outcome {
                first_error.get_or_insert(err);
            }
        }
        first_error.map_or(Ok(()), Err)
    }
}

/// Exposes a succeeded job's artifacts for export.
#[derive(Debug, Clone, Copy)]
pub struct BatchExportScheduler {
    /// Gap between consecutive emissions of a bulk export.
    interval: Duration,
}

impl Default for BatchExportScheduler {
    fn default() -> Self {
        Self::new(Duration::from_millis(100))
    }
}

impl BatchExportScheduler {
    pub fn new(interval: Duration) -> Self {
        Self { interval }
    }

    pub fn from_config(config: &PipelineConfig) -> Self {
        Self::new(Duration::from_millis(config.export_interval_ms))
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Emit the artifact at `index` right away. May be repeated freely.
    #[instrument(skip(self, job, sink), fields(job_id = %job.id))]
    pub fn export_one(&self, job: &ConversionJob, index: usize, sink: &dyn ArtifactSink) -> Result<()> {
        ensure_exportable(job)?;
        let artifact = job.outputs.get(index).ok_or_else(|| {
            BlattwerkError::Export(format!(
                "no artifact at position {index}, job has {}",
                job.outputs.len()
            ))
        })?;
        sink.emit(&artifact)?;
        debug!(name = %artifact.name, "Artifact exported");
        Ok(())
    }

    /// Schedule every artifact for emission, artifact `i` after `i * interval`,
    /// and return without waiting.
    ///
    /// Must be called within a tokio runtime. Each call schedules its own
    /// emissions; releasing the job's outputs afterwards does not cancel them.
    #[instrument(skip(self, job, sink), fields(job_id = %job.id))]
    pub fn export_all(&self, job: &ConversionJob, sink: Arc<dyn ArtifactSink>) -> Result<ExportBatch> {
        ensure_exportable(job)?;

        let handles = job
            .outputs
            .handles()
            .into_iter()
            .enumerate()
            .map(|(index, artifact)| {
                let delay = self.interval * index as u32;
                let sink = Arc::clone(&sink);
                tokio::spawn(async move {
                    if !delay.is_zero() {
                        tokio::time::sleep(delay).await;
                    }
                    tokio::task::spawn_blocking(move || {
                        sink.emit(&artifact).inspect_err(|err| {
                            warn!(name = %artifact.name, %err, "Scheduled export failed");
                        })
                    })
                    .await
                    .map_err(|err| BlattwerkError::Task(err.to_string()))?
                })
            })
            .collect::<Vec<_>>();

        info!(count = handles.len(), interval_ms = self.interval.as_millis() as u64, "Bulk export scheduled");
        Ok(ExportBatch { handles })
    }
}

fn ensure_exportable(job: &ConversionJob) -> Result<()> {
    if job.status != JobStatus::Succeeded {
        return Err(BlattwerkError::Export(format!(
            "job {} has not succeeded (status {:?})",
            job.id, job.status
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifacts::ArtifactSet;
    use blattwerk_core::types::Operation;

    fn succeeded_job(names: &[&str]) -> ConversionJob {
        let mut job = ConversionJob::new(Operation::Split, Vec::new());
        let outputs = names
            .iter()
            .map(|name| OutputArtifact::pdf(*name, name.as_bytes().to_vec()))
            .collect();
        job.succeed(ArtifactSet::from_vec(outputs));
        job
    }

    #[test]
    fn single_export_is_repeatable() {
        let job = succeeded_job(&["page-1.pdf", "page-2.pdf"]);
        let sink = MemorySink::new();
        let scheduler = BatchExportScheduler::default();

        scheduler.export_one(&job, 1, &sink).unwrap();
        scheduler.export_one(&job, 1, &sink).unwrap();
        assert_eq!(sink.names(), ["page-2.pdf", "page-2.pdf"]);
    }

    #[test]
    fn out_of_range_index_is_an_export_error() {
        let job = succeeded_job(&["a.pdf"]);
        let err = BatchExportScheduler::default()
            .export_one(&job, 3, &MemorySink::new())
            .unwrap_err();
        assert!(matches!(err, BlattwerkError::Export(_)));
    }

    #[test]
    fn unfinished_job_cannot_be_exported() {
        let job = ConversionJob::new(Operation::Merge, Vec::new());
        let err = BatchExportScheduler::default()
            .export_one(&job, 0, &MemorySink::new())
            .unwrap_err();
        assert!(matches!(err, BlattwerkError::Export(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn bulk_export_is_paced_and_returns_immediately() {
        let job = succeeded_job(&["page-1.pdf", "page-2.pdf", "page-3.pdf"]);
        let sink = Arc::new(MemorySink::new());
        let start = tokio::time::Instant::now();

        let batch = BatchExportScheduler::default()
            .export_all(&job, sink.clone())
            .unwrap();
        assert_eq!(batch.len(), 3);
        assert!(sink.is_empty());

        batch.join().await.unwrap();
        let timeline = sink.timeline();
        let names: Vec<&str> = timeline.iter().map(|(_, name)| name.as_str()).collect();
        assert_eq!(names, ["page-1.pdf", "page-2.pdf", "page-3.pdf"]);
        for ((at, name), expected_ms) in timeline.iter().zip([0u64, 100, 200]) {
            let offset = *at - start;
            assert!(
                offset >= Duration::from_millis(expected_ms)
                    && offset < Duration::from_millis(expected_ms + 5),
                "{name} emitted after {offset:?}"
            );
        }
    }

    #[tokio::test(start_paused = true)]
    async fn repeated_bulk_exports_emit_independently() {
        let job = succeeded_job(&["a.jpeg", "b.jpeg"]);
        let sink = Arc::new(MemorySink::new());
        let scheduler = BatchExportScheduler::new(Duration::from_millis(10));

        let first = scheduler.export_all(&job, sink.clone()).unwrap();
        let second = scheduler.export_all(&job, sink.clone()).unwrap();
        first.join().await.unwrap();
        second.join().await.unwrap();

        assert_eq!(sink.len(), 4);
    }

    /// Sink that only works off the async workers: `Handle::block_on` panics
    /// when called from inside a runtime task.
    struct BlockingSink(MemorySink);

    impl ArtifactSink for BlockingSink {
        fn emit(&self, artifact: &OutputArtifact) -> Result<()> {
            tokio::runtime::Handle::current().block_on(tokio::task::yield_now());
            self.0.emit(artifact)
        }
    }

    #[tokio::test]
    async fn bulk_emissions_run_on_the_blocking_pool() {
        let job = succeeded_job(&["page-1.pdf", "page-2.pdf"]);
        let sink = Arc::new(BlockingSink(MemorySink::new()));

        BatchExportScheduler::new(Duration::from_millis(1))
            .export_all(&job, sink.clone())
            .unwrap()
            .join()
            .await
            .unwrap();

        assert_eq!(sink.0.names(), ["page-1.pdf", "page-2.pdf"]);
    }

    #[tokio::test(start_paused = true)]
    async fn release_does_not_cancel_scheduled_emissions() {
        let mut job = succeeded_job(&["x.png", "y.png"]);
        let sink = Arc::new(MemorySink::new());

        let batch = BatchExportScheduler::default()
            .export_all(&job, sink.clone())
            .unwrap();
        job.outputs.release();
        batch.join().await.unwrap();

        assert_eq!(sink.names(), ["x.png", "y.png"]);
    }
}
