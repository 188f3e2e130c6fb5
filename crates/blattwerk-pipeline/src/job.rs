// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Conversion jobs — the unit of work a tool runs, plus its parameters and a
// serialisable summary.

use blattwerk_core::config::{PipelineConfig, RasterErrorPolicy};
use blattwerk_core::error::BlattwerkError;
use blattwerk_core::fingerprint::short_fingerprint;
use blattwerk_core::human_errors::humanize_error;
use blattwerk_core::types::{
    InputFile, JobId, JobStatus, Operation, PaperSize, RasterFormat, format_file_size,
};
use blattwerk_document::CompressionReport;
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::artifacts::ArtifactSet;

/// Everything a tool trigger needs besides its inputs.
///
/// Passed explicitly into each run so one tool's settings never leak into
/// another's.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ToolContext {
    pub operation: Operation,
    /// Target encoding for raster conversion.
    pub raster_format: RasterFormat,
    /// Lossy quality for raster conversion, `[0.0, 1.0]`.
    pub quality: f32,
    /// Page format for image → PDF.
    pub page_size: PaperSize,
    /// JPEG quality of rasters embedded by image → PDF.
    pub embedded_image_quality: f32,
    pub raster_error_policy: RasterErrorPolicy,
}

impl ToolContext {
    /// Context for `operation` with the built-in defaults.
    pub fn new(operation: Operation) -> Self {
        Self::from_config(operation, &PipelineConfig::default())
    }

    /// Context for `operation` seeded from a loaded configuration.
    pub fn from_config(operation: Operation, config: &PipelineConfig) -> Self {
        Self {
            operation,
            raster_format: RasterFormat::Jpeg,
            quality: config.raster_quality,
            page_size: config.page_size,
            embedded_image_quality: config.embedded_image_quality,
            raster_error_policy: config.raster_error_policy,
        }
    }

    pub fn with_raster_format(mut self, format: RasterFormat) -> Self {
        self.raster_format = format;
        self
    }

    pub fn with_quality(mut self, quality: f32) -> Self {
        self.quality = quality;
        self
    }

    pub fn with_page_size(mut self, page_size: PaperSize) -> Self {
        self.page_size = page_size;
        self
    }

    pub fn with_error_policy(mut self, policy: RasterErrorPolicy) -> Self {
        self.raster_error_policy = policy;
        self
    }
}

/// One input item that was skipped by an error-isolating batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ItemFailure {
    pub name: String,
    pub message: String,
}

impl ItemFailure {
    pub fn from_error(name: impl Into<String>, err: &BlattwerkError) -> Self {
        Self {
            name: name.into(),
            message: err.to_string(),
        }
    }
}

/// A single run of one tool.
///
/// Only the [`JobRunner`](crate::runner::JobRunner) mutates a job.
#[derive(Debug)]
pub struct ConversionJob {
    pub id: JobId,
    pub operation: Operation,
    pub inputs: Vec<InputFile>,
    pub status: JobStatus,
    pub outputs: ArtifactSet,
    /// One human-readable line; set on failure and on partially failed
    /// batches.
    pub error_message: Option<String>,
    pub item_failures: Vec<ItemFailure>,
    /// Size statistics, for compression jobs only.
    pub compression: Option<CompressionReport>,
    pub created_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl ConversionJob {
    pub fn new(operation: Operation, inputs: Vec<InputFile>) -> Self {
        Self {
            id: JobId::new(),
            operation,
            inputs,
            status: JobStatus::Idle,
            outputs: ArtifactSet::new(),
            error_message: None,
            item_failures: Vec::new(),
            compression: None,
            created_at: Utc::now(),
            finished_at: None,
        }
    }

    /// Terminal failure: no outputs, one message.
    pub(crate) fn fail(&mut self, err: &BlattwerkError) {
        self.outputs.release();
        self.status = JobStatus::Failed;
        self.error_message = Some(humanize_error(err).summary());
        self.finished_at = Some(Utc::now());
    }

    pub(crate) fn succeed(&mut self, outputs: ArtifactSet) {
        self.outputs = outputs;
        self.status = JobStatus::Succeeded;
        self.finished_at = Some(Utc::now());
    }

    pub fn is_finished(&self) -> bool {
        matches!(self.status, JobStatus::Succeeded | JobStatus::Failed)
    }

    /// Snapshot of the job suitable for JSON output.
    pub fn summary(&self) -> JobSummary {
        JobSummary {
            id: self.id,
            operation: self.operation,
            status: self.status,
            inputs: self
                .inputs
                .iter()
                .map(|input| FileSummary::new(&input.name, &input.mime_type, &input.bytes))
                .collect(),
            artifacts: self
                .outputs
                .iter()
                .map(|artifact| FileSummary::new(&artifact.name, &artifact.mime_type, &artifact.bytes))
                .collect(),
            error_message: self.error_message.clone(),
            item_failures: self.item_failures.clone(),
            compression: self.compression.map(CompressionSummary::from),
            created_at: self.created_at,
            finished_at: self.finished_at,
        }
    }
}

/// Serialisable view of a [`ConversionJob`].
#[derive(Debug, Clone, Serialize)]
pub struct JobSummary {
    pub id: JobId,
    pub operation: Operation,
    pub status: JobStatus,
    pub inputs: Vec<FileSummary>,
    pub artifacts: Vec<FileSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub item_failures: Vec<ItemFailure>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub compression: Option<CompressionSummary>,
    pub created_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct FileSummary {
    pub name: String,
    pub mime_type: String,
    pub size_bytes: u64,
    pub size: String,
    /// First 12 hex digits of the SHA-256 of the content.
    pub sha256: String,
}

impl FileSummary {
    fn new(name: &str, mime_type: &str, bytes: &[u8]) -> Self {
        Self {
            name: name.to_string(),
            mime_type: mime_type.to_string(),
            size_bytes: bytes.len() as u64,
            size: format_file_size(bytes.len() as u64),
            sha256: short_fingerprint(bytes),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CompressionSummary {
    pub original_size: String,
    pub compressed_size: String,
    pub reduction_percent: f64,
    pub signed_reduction_percent: f64,
}

impl From<CompressionReport> for CompressionSummary {
    fn from(report: CompressionReport) -> Self {
        Self {
            original_size: format_file_size(report.original_bytes),
            compressed_size: format_file_size(report.compressed_bytes),
            reduction_percent: round2(report.reduction_percent()),
            signed_reduction_percent: round2(report.signed_reduction_percent()),
        }
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
