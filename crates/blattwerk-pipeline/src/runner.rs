// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Job runner — validates inputs, drives the document transforms one item at a
// time on the tokio blocking pool, and records the outcome on the job.
//
// State machine: Idle -> Running -> {Succeeded | Failed}. A runner holds at
// most one job; `run` takes `&mut self`, so a second trigger cannot start
// while the first is in flight.

use std::collections::HashMap;

use blattwerk_core::config::RasterErrorPolicy;
use blattwerk_core::error::{BlattwerkError, Result};
use blattwerk_core::fingerprint::short_fingerprint;
use blattwerk_core::types::{InputFile, JobStatus, Operation, OutputArtifact};
use blattwerk_document::{
    CompressionReport, ImagePdfWriter, PdfCompressor, RasterConverter, merge, split,
};
use tracing::{debug, info, instrument, warn};

use crate::artifacts::ArtifactSet;
use crate::job::{ConversionJob, ItemFailure, ToolContext};

/// What a successful execution produced.
#[derive(Default)]
struct Execution {
    outputs: Vec<OutputArtifact>,
    item_failures: Vec<ItemFailure>,
    /// Error behind the first entry of `item_failures`.
    first_failure: Option<BlattwerkError>,
    compression: Option<CompressionReport>,
}

/// Runs the jobs of one tool.
#[derive(Debug, Default)]
pub struct JobRunner {
    current: Option<ConversionJob>,
}

impl JobRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// The most recent job, if any.
    pub fn job(&self) -> Option<&ConversionJob> {
        self.current.as_ref()
    }

    /// Status of the most recent job; `Idle` before the first trigger.
    pub fn status(&self) -> JobStatus {
        self.current.as_ref().map_or(JobStatus::Idle, |job| job.status)
    }

    /// Drop the current job and free its outputs.
    pub fn release(&mut self) {
        if let Some(mut job) = self.current.take() {
            job.outputs.release();
        }
    }

    /// Run `ctx.operation` over `inputs`.
    ///
    /// Prior outputs are released before the new job starts. The returned job
    /// is always finished: `Succeeded` or `Failed`, never `Running`.
    #[instrument(skip_all, fields(operation = ?ctx.operation, inputs = inputs.len()))]
    pub async fn run(&mut self, ctx: ToolContext, inputs: Vec<InputFile>) -> &ConversionJob {
        self.release();

        let mut job = ConversionJob::new(ctx.operation, inputs);
        for input in &job.inputs {
            debug!(
                job_id = %job.id,
                name = %input.name,
                bytes = input.len(),
                sha256 = %short_fingerprint(&input.bytes),
                "Input received"
            );
        }

        if let Err(err) = validate(ctx.operation, &mut job.inputs) {
            warn!(job_id = %job.id, %err, "Input validation failed");
            job.fail(&err);
            debug_assert!(job.is_finished());
            return self.current.insert(job);
        }

        job.status = JobStatus::Running;
        info!(job_id = %job.id, "Job started");

        match execute(&ctx, &job.inputs).await {
            Ok(execution) => finish(&mut job, execution),
            Err(err) => {
                warn!(job_id = %job.id, %err, "Job failed");
                job.fail(&err);
            }
        }

        info!(
            job_id = %job.id,
            status = ?job.status,
            outputs = job.outputs.len(),
            skipped = job.item_failures.len(),
            "Job finished"
        );
        debug_assert!(job.is_finished());
        self.current.insert(job)
    }
}

/// Check input count and types. Single-input operations keep only the first
/// input.
fn validate(operation: Operation, inputs: &mut Vec<InputFile>) -> Result<()> {
    let required = operation.min_inputs();
    if inputs.len() < required {
        let noun = if operation.takes_images() { "image" } else { "PDF" };
        let plural = if required == 1 { "" } else { "s" };
        return Err(BlattwerkError::InputValidation(format!(
            "{} needs at least {required} {noun}{plural}, got {}",
            operation.label(),
            inputs.len()
        )));
    }

    if operation.is_single_input() && inputs.len() > 1 {
        let discarded: Vec<&str> = inputs[1..].iter().map(|input| input.name.as_str()).collect();
        warn!(?discarded, "{} uses only the first file", operation.label());
        inputs.truncate(1);
    }

    if let Some(bad) = inputs.iter().find(|input| !operation.accepts_mime(&input.mime_type)) {
        return Err(BlattwerkError::InputValidation(format!(
            "{} ({}) is not a supported file type for {}",
            bad.name,
            bad.mime_type,
            operation.label()
        )));
    }
    Ok(())
}

fn finish(job: &mut ConversionJob, execution: Execution) {
    job.item_failures = execution.item_failures;
    job.compression = execution.compression;

    if execution.outputs.is_empty() {
        // Nothing converted: report the first cause as it was raised.
        if let Some(err) = execution.first_failure {
            job.fail(&err);
            return;
        }
    }

    if !job.item_failures.is_empty() {
        let names: Vec<&str> = job.item_failures.iter().map(|f| f.name.as_str()).collect();
        job.error_message = Some(format!(
            "{} of {} files could not be converted: {}",
            names.len(),
            job.inputs.len(),
            names.join(", ")
        ));
    }
    job.succeed(ArtifactSet::from_vec(execution.outputs));
}

/// Run one blocking transform on the tokio blocking pool.
async fn blocking<T, F>(task: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(task)
        .await
        .map_err(|err| BlattwerkError::Task(err.to_string()))?
}

async fn execute(ctx: &ToolContext, inputs: &[InputFile]) -> Result<Execution> {
    match ctx.operation {
        Operation::Merge => {
            let inputs = inputs.to_vec();
            let merged = blocking(move || merge(&inputs)).await?;
            Ok(Execution {
                outputs: vec![merged],
                ..Default::default()
            })
        }
        Operation::ImageToDocument => {
            let writer = ImagePdfWriter::new(ctx.page_size, ctx.embedded_image_quality);
            let inputs = inputs.to_vec();
            let document = blocking(move || writer.write(&inputs)).await?;
            Ok(Execution {
                outputs: vec![document],
                ..Default::default()
            })
        }
        Operation::Split => {
            let input = first(inputs)?;
            let pages = blocking(move || split(&input)).await?;
            Ok(Execution {
                outputs: pages,
                ..Default::default()
            })
        }
        Operation::Compress => {
            let input = first(inputs)?;
            let (artifact, report) = blocking(move || PdfCompressor::new().compress(&input)).await?;
            Ok(Execution {
                outputs: vec![artifact],
                compression: Some(report),
                ..Default::default()
            })
        }
        Operation::RasterConvert => convert_each(ctx, inputs).await,
    }
}

/// Convert images one at a time, each awaited before the next starts.
async fn convert_each(ctx: &ToolContext, inputs: &[InputFile]) -> Result<Execution> {
    let converter = RasterConverter::new(ctx.raster_format, ctx.quality);
    let mut execution = Execution::default();

    for (index, input) in inputs.iter().enumerate() {
        let item = input.clone();
        match blocking(move || converter.convert(&item)).await {
            Ok(artifact) => {
                debug!(index, name = %artifact.name, bytes = artifact.len(), "Item converted");
                execution.outputs.push(artifact);
            }
            Err(err) if isolates(ctx, &err) => {
                warn!(index, name = %input.name, %err, "Skipping item");
                execution.item_failures.push(ItemFailure::from_error(&input.name, &err));
                execution.first_failure.get_or_insert(err);
            }
            Err(err) => return Err(err),
        }
    }
    Ok(execution)
}

/// Whether `err` skips its item instead of failing the whole job.
fn isolates(ctx: &ToolContext, err: &BlattwerkError) -> bool {
    ctx.operation.isolates_item_errors()
        && ctx.raster_error_policy == RasterErrorPolicy::Isolate
        && err.is_item_scoped()
}

fn first(inputs: &[InputFile]) -> Result<InputFile> {
    inputs
        .first()
        .cloned()
        .ok_or_else(|| BlattwerkError::InputValidation("no input file".into()))
}

/// One runner per tool, so a job on one tool never disturbs another.
#[derive(Debug, Default)]
pub struct Workbench {
    runners: HashMap<Operation, JobRunner>,
}

impl Workbench {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run a job on the tool named by `ctx.operation`.
    pub async fn run(&mut self, ctx: ToolContext, inputs: Vec<InputFile>) -> &ConversionJob {
        self.runners
            .entry(ctx.operation)
            .or_default()
            .run(ctx, inputs)
            .await
    }

    pub fn runner(&self, operation: Operation) -> Option<&JobRunner> {
        self.runners.get(&operation)
    }

    /// Status of a tool's latest job; `Idle` for a tool never triggered.
    pub fn status(&self, operation: Operation) -> JobStatus {
        self.runner(operation).map_or(JobStatus::Idle, JobRunner::status)
    }

    /// Release every tool's outputs.
    pub fn release_all(&mut self) {
        for runner in self.runners.values_mut() {
            runner.release();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use blattwerk_core::types::RasterFormat;
    use blattwerk_document::fixtures::{page_labels, pdf_with_pages, png_bytes};

    fn pdf(name: &str, pages: u32) -> InputFile {
        InputFile::from_named_bytes(name, pdf_with_pages(pages, name.trim_end_matches(".pdf")))
    }

    fn png(name: &str) -> InputFile {
        InputFile::from_named_bytes(name, png_bytes(12, 8))
    }

    #[tokio::test]
    async fn merge_with_one_input_fails_validation() {
        let mut runner = JobRunner::new();
        let job = runner.run(ToolContext::new(Operation::Merge), vec![pdf("a.pdf", 1)]).await;

        assert_eq!(job.status, JobStatus::Failed);
        assert!(job.outputs.is_empty());
        let message = job.error_message.as_deref().unwrap();
        assert!(message.contains("at least 2 PDFs"), "{message}");
    }

    #[tokio::test]
    async fn merge_succeeds_in_input_order() {
        let mut runner = JobRunner::new();
        let job = runner
            .run(
                ToolContext::new(Operation::Merge),
                vec![pdf("x.pdf", 2), pdf("y.pdf", 3)],
            )
            .await;

        assert_eq!(job.status, JobStatus::Succeeded);
        assert_eq!(job.outputs.names(), ["merged-document.pdf"]);
        let merged = job.outputs.get(0).unwrap();
        assert_eq!(
            page_labels(&merged.bytes),
            ["x-p1", "x-p2", "y-p1", "y-p2", "y-p3"]
        );
    }

    #[tokio::test]
    async fn corrupt_source_fails_the_whole_merge() {
        let mut runner = JobRunner::new();
        let broken = InputFile::new("broken.pdf", b"%PDF-1.4 nope".to_vec(), "application/pdf");
        let job = runner
            .run(ToolContext::new(Operation::Merge), vec![pdf("a.pdf", 1), broken])
            .await;

        assert_eq!(job.status, JobStatus::Failed);
        assert!(job.outputs.is_empty());
        assert!(job.error_message.as_deref().unwrap().contains("broken.pdf"));
    }

    #[tokio::test]
    async fn split_uses_first_input_only() {
        let mut runner = JobRunner::new();
        let job = runner
            .run(
                ToolContext::new(Operation::Split),
                vec![pdf("five.pdf", 5), pdf("ignored.pdf", 2)],
            )
            .await;

        assert_eq!(job.status, JobStatus::Succeeded);
        assert_eq!(job.inputs.len(), 1);
        assert_eq!(
            job.outputs.names(),
            ["page-1.pdf", "page-2.pdf", "page-3.pdf", "page-4.pdf", "page-5.pdf"]
        );
    }

    #[tokio::test]
    async fn split_of_empty_document_succeeds_with_no_outputs() {
        let mut runner = JobRunner::new();
        let job = runner.run(ToolContext::new(Operation::Split), vec![pdf("none.pdf", 0)]).await;
        assert_eq!(job.status, JobStatus::Succeeded);
        assert!(job.outputs.is_empty());
    }

    #[tokio::test]
    async fn compress_reports_statistics() {
        let mut runner = JobRunner::new();
        let job = runner.run(ToolContext::new(Operation::Compress), vec![pdf("c.pdf", 3)]).await;

        assert_eq!(job.status, JobStatus::Succeeded);
        assert_eq!(job.outputs.names(), ["compressed-document.pdf"]);
        let report = job.compression.unwrap();
        assert!(report.reduction_percent() >= 0.0);
        assert_eq!(report.compressed_bytes, job.outputs.total_bytes());
    }

    #[tokio::test]
    async fn images_become_one_page_each() {
        let mut runner = JobRunner::new();
        let images = vec![
            InputFile::from_named_bytes("1.png", png_bytes(30, 10)),
            InputFile::from_named_bytes("2.png", png_bytes(10, 40)),
            InputFile::from_named_bytes("3.png", png_bytes(25, 25)),
        ];
        let job = runner.run(ToolContext::new(Operation::ImageToDocument), images).await;

        assert_eq!(job.status, JobStatus::Succeeded);
        assert_eq!(job.outputs.names(), ["images-to-pdf.pdf"]);

        let pdf = job.outputs.get(0).unwrap();
        let doc = lopdf::Document::load_mem(&pdf.bytes).unwrap();
        let sizes: Vec<(i64, i64)> = doc
            .get_pages()
            .into_values()
            .flat_map(|page_id| doc.get_page_images(page_id).unwrap())
            .map(|image| (image.width, image.height))
            .collect();
        assert_eq!(sizes, [(30, 10), (10, 40), (25, 25)]);
    }

    #[tokio::test]
    async fn wrong_mime_type_is_rejected() {
        let mut runner = JobRunner::new();
        let job = runner
            .run(ToolContext::new(Operation::ImageToDocument), vec![pdf("doc.pdf", 1)])
            .await;
        assert_eq!(job.status, JobStatus::Failed);
        assert!(job.error_message.as_deref().unwrap().contains("doc.pdf"));
    }

    #[tokio::test]
    async fn raster_failures_are_isolated() {
        let mut runner = JobRunner::new();
        let bad = InputFile::new("bad.png", b"not a png".to_vec(), "image/png");
        let ctx = ToolContext::new(Operation::RasterConvert).with_raster_format(RasterFormat::Webp);
        let job = runner.run(ctx, vec![png("a.png"), bad, png("c.png")]).await;

        assert_eq!(job.status, JobStatus::Succeeded);
        assert_eq!(job.outputs.names(), ["a.webp", "c.webp"]);
        assert_eq!(job.item_failures.len(), 1);
        assert_eq!(job.item_failures[0].name, "bad.png");
        assert!(job.error_message.as_deref().unwrap().contains("1 of 3"));
    }

    #[tokio::test]
    async fn abort_policy_stops_on_first_failure() {
        let mut runner = JobRunner::new();
        let bad = InputFile::new("bad.png", b"not a png".to_vec(), "image/png");
        let ctx = ToolContext::new(Operation::RasterConvert)
            .with_error_policy(RasterErrorPolicy::Abort);
        let job = runner.run(ctx, vec![png("a.png"), bad, png("c.png")]).await;

        assert_eq!(job.status, JobStatus::Failed);
        assert!(job.outputs.is_empty());
    }

    #[tokio::test]
    async fn all_items_failing_fails_the_job() {
        let mut runner = JobRunner::new();
        let bad = InputFile::new("bad.jpg", b"???".to_vec(), "image/jpeg");
        let job = runner.run(ToolContext::new(Operation::RasterConvert), vec![bad]).await;
        assert_eq!(job.status, JobStatus::Failed);
        assert!(job.is_finished());
        let message = job.error_message.as_deref().unwrap();
        assert!(message.contains("couldn't read \"bad.jpg\""), "{message}");
    }

    #[test]
    fn total_failure_keeps_the_original_error_kind() {
        let mut job = ConversionJob::new(Operation::RasterConvert, vec![png("a.png")]);
        let err = BlattwerkError::encode("a.webp", "encoder rejected the buffer");
        let execution = Execution {
            item_failures: vec![ItemFailure::from_error("a.png", &err)],
            first_failure: Some(err),
            ..Default::default()
        };
        finish(&mut job, execution);

        assert_eq!(job.status, JobStatus::Failed);
        let message = job.error_message.as_deref().unwrap();
        assert!(message.contains("couldn't write \"a.webp\""), "{message}");
        assert!(!message.contains("couldn't read"), "{message}");
    }

    #[test]
    fn only_raster_conversion_isolates_item_errors() {
        let err = BlattwerkError::decode("x.png", "truncated");
        assert!(isolates(&ToolContext::new(Operation::RasterConvert), &err));
        assert!(!isolates(&ToolContext::new(Operation::ImageToDocument), &err));
        assert!(!isolates(
            &ToolContext::new(Operation::RasterConvert).with_error_policy(RasterErrorPolicy::Abort),
            &err
        ));
        assert!(!isolates(
            &ToolContext::new(Operation::RasterConvert),
            &BlattwerkError::Task("join".into())
        ));
    }

    #[tokio::test]
    async fn retrigger_replaces_previous_outputs() {
        let mut runner = JobRunner::new();
        let first_id = runner
            .run(ToolContext::new(Operation::Split), vec![pdf("a.pdf", 3)])
            .await
            .id;
        let held = runner.job().unwrap().outputs.get(0).unwrap();

        let job = runner.run(ToolContext::new(Operation::Split), vec![pdf("b.pdf", 1)]).await;
        assert_ne!(job.id, first_id);
        assert_eq!(job.outputs.len(), 1);
        // The previous run's artifacts are no longer owned by the runner.
        assert_eq!(std::sync::Arc::strong_count(&held), 1);
    }

    #[tokio::test]
    async fn tools_do_not_share_jobs() {
        let mut bench = Workbench::new();
        bench.run(ToolContext::new(Operation::Split), vec![pdf("a.pdf", 2)]).await;
        bench.run(ToolContext::new(Operation::Merge), vec![pdf("a.pdf", 1)]).await;

        assert_eq!(bench.status(Operation::Split), JobStatus::Succeeded);
        assert_eq!(bench.status(Operation::Merge), JobStatus::Failed);
        assert_eq!(bench.status(Operation::Compress), JobStatus::Idle);
        assert_eq!(bench.runner(Operation::Split).unwrap().job().unwrap().outputs.len(), 2);

        bench.release_all();
        assert_eq!(bench.status(Operation::Split), JobStatus::Idle);
    }
}
