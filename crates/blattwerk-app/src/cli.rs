// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Command-line arguments and their mapping onto a tool context.

use std::path::PathBuf;

use blattwerk_core::config::{PipelineConfig, RasterErrorPolicy};
use blattwerk_core::types::{Operation, PaperSize, RasterFormat};
use blattwerk_pipeline::ToolContext;
use clap::{Args, Parser, Subcommand, ValueEnum};

/// Local PDF and image workbench. Nothing leaves this machine.
#[derive(Parser, Debug)]
#[command(name = "blattwerk", version, about, arg_required_else_help = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    #[command(flatten)]
    pub common: CommonArgs,
}

#[derive(Args, Debug)]
pub struct CommonArgs {
    /// Folder the results are written to.
    #[arg(short, long, global = true, env = "BLATTWERK_OUT_DIR", default_value = ".")]
    pub out_dir: PathBuf,

    /// JSON settings file. Missing file means defaults.
    #[arg(long, global = true, env = "BLATTWERK_CONFIG")]
    pub config: Option<PathBuf>,

    /// Delay between written results, in milliseconds.
    #[arg(long, global = true)]
    pub interval_ms: Option<u64>,

    /// Print the job summary as JSON on stdout.
    #[arg(long, global = true)]
    pub json: bool,

    /// Enable debug logging.
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Combine several PDFs into merged-document.pdf, in the given order.
    Merge {
        #[arg(required = true, num_args = 2..)]
        inputs: Vec<PathBuf>,
    },
    /// Put each image on its own page of images-to-pdf.pdf.
    ImagesToPdf {
        #[arg(required = true)]
        inputs: Vec<PathBuf>,

        /// Page format.
        #[arg(long, value_enum)]
        page_size: Option<PageSizeArg>,
    },
    /// Write every page of a PDF to its own page-<n>.pdf.
    Split { input: PathBuf },
    /// Re-encode images as JPEG, PNG, or WebP.
    Convert {
        #[arg(required = true)]
        inputs: Vec<PathBuf>,

        /// Target format.
        #[arg(long, value_enum, default_value = "jpeg")]
        to: FormatArg,

        /// JPEG quality between 0.0 and 1.0.
        #[arg(long)]
        quality: Option<f32>,

        /// Stop at the first image that cannot be converted.
        #[arg(long)]
        abort_on_error: bool,
    },
    /// Re-save a PDF compactly as compressed-document.pdf.
    Compress { input: PathBuf },
}

#[derive(ValueEnum, Clone, Copy, Debug)]
pub enum PageSizeArg {
    A4,
    A3,
    A5,
    Letter,
    Legal,
}

impl From<PageSizeArg> for PaperSize {
    fn from(value: PageSizeArg) -> Self {
        match value {
            PageSizeArg::A4 => PaperSize::A4,
            PageSizeArg::A3 => PaperSize::A3,
            PageSizeArg::A5 => PaperSize::A5,
            PageSizeArg::Letter => PaperSize::Letter,
            PageSizeArg::Legal => PaperSize::Legal,
        }
    }
}

#[derive(ValueEnum, Clone, Copy, Debug)]
pub enum FormatArg {
    #[value(alias = "jpg")]
    Jpeg,
    Png,
    Webp,
}

impl From<FormatArg> for RasterFormat {
    fn from(value: FormatArg) -> Self {
        match value {
            FormatArg::Jpeg => RasterFormat::Jpeg,
            FormatArg::Png => RasterFormat::Png,
            FormatArg::Webp => RasterFormat::Webp,
        }
    }
}

impl Command {
    pub fn operation(&self) -> Operation {
        match self {
            Self::Merge { .. } => Operation::Merge,
            Self::ImagesToPdf { .. } => Operation::ImageToDocument,
            Self::Split { .. } => Operation::Split,
            Self::Convert { .. } => Operation::RasterConvert,
            Self::Compress { .. } => Operation::Compress,
        }
    }

    /// Input paths in the order given.
    pub fn inputs(&self) -> Vec<PathBuf> {
        match self {
            Self::Merge { inputs } | Self::ImagesToPdf { inputs, .. } | Self::Convert { inputs, .. } => {
                inputs.clone()
            }
            Self::Split { input } | Self::Compress { input } => vec![input.clone()],
        }
    }

    /// Tool context from the loaded config plus any flag overrides.
    pub fn context(&self, config: &PipelineConfig) -> ToolContext {
        let ctx = ToolContext::from_config(self.operation(), config);
        match self {
            Self::ImagesToPdf {
                page_size: Some(size),
                ..
            } => ctx.with_page_size((*size).into()),
            Self::Convert {
                to,
                quality,
                abort_on_error,
                ..
            } => {
                let mut ctx = ctx.with_raster_format((*to).into());
                if let Some(quality) = quality {
                    ctx = ctx.with_quality(*quality);
                }
                if *abort_on_error {
                    ctx = ctx.with_error_policy(RasterErrorPolicy::Abort);
                }
                ctx
            }
            _ => ctx,
        }
    }
}
