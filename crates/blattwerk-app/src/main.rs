// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Blattwerk — local PDF and image workbench.
//
// Entry point. Initialises logging, loads settings, runs one tool over the
// given files, and writes the results into the output folder.

mod cli;
mod sink;

use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use blattwerk_core::config::PipelineConfig;
use blattwerk_core::error::{BlattwerkError, Result};
use blattwerk_core::human_errors::humanize_error;
use blattwerk_core::types::{InputFile, JobStatus};
use blattwerk_pipeline::{BatchExportScheduler, JobRunner};
use clap::Parser;
use tracing::{error, info};

use cli::Cli;
use sink::DirectorySink;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let default_level = if cli.common.verbose { "debug" } else { "info" };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    match run(cli).await {
        Ok(JobStatus::Succeeded) => ExitCode::SUCCESS,
        Ok(_) => ExitCode::FAILURE,
        Err(err) => {
            let human = humanize_error(&err);
            error!(%err, "Blattwerk stopped");
            eprintln!("{}", human.summary());
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<JobStatus> {
    let config = match &cli.common.config {
        Some(path) => PipelineConfig::load(path)?,
        None => PipelineConfig::default(),
    };

    let ctx = cli.command.context(&config);
    let mut inputs = Vec::new();
    for path in cli.command.inputs() {
        inputs.push(read_input(&path).await?);
    }

    info!(tool = ctx.operation.label(), files = inputs.len(), "Blattwerk starting");

    let mut runner = JobRunner::new();
    let job = runner.run(ctx, inputs).await;

    if cli.common.json {
        println!("{}", serde_json::to_string_pretty(&job.summary())?);
    } else if let Some(message) = &job.error_message {
        eprintln!("{message}");
    }

    if job.status != JobStatus::Succeeded {
        return Ok(job.status);
    }

    let interval = cli
        .common
        .interval_ms
        .map(Duration::from_millis)
        .unwrap_or_else(|| BatchExportScheduler::from_config(&config).interval());
    let sink = Arc::new(DirectorySink::create(&cli.common.out_dir)?);
    let batch = BatchExportScheduler::new(interval).export_all(job, sink)?;
    let count = batch.len();
    batch.join().await?;

    info!(count, out_dir = %cli.common.out_dir.display(), "Results written");
    Ok(JobStatus::Succeeded)
}

/// Read one input file, naming it after its final path component.
async fn read_input(path: &Path) -> Result<InputFile> {
    let name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .ok_or_else(|| BlattwerkError::InputValidation(format!("{} is not a file", path.display())))?;
    let bytes = tokio::fs::read(path).await?;
    Ok(InputFile::from_named_bytes(name, bytes))
}
