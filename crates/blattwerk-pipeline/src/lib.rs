// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// blattwerk-pipeline — Drives the document transforms as jobs.
//
// A `JobRunner` owns the job of one tool: it validates inputs, runs the
// transform item by item on the blocking pool, and keeps the resulting
// artifacts until they are superseded. `BatchExportScheduler` hands those
// artifacts to an `ArtifactSink`, one at a time or as a paced batch.

pub mod artifacts;
pub mod export;
pub mod job;
pub mod runner;

pub use artifacts::ArtifactSet;
pub use export::{ArtifactSink, BatchExportScheduler, ExportBatch, MemorySink};
pub use job::{ConversionJob, ItemFailure, JobSummary, ToolContext};
pub use runner::{JobRunner, Workbench};
