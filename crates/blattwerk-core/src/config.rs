// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Pipeline configuration.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::Result;

/// How a raster conversion batch reacts to a failing item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RasterErrorPolicy {
    /// Skip the failing item, keep converting, report failures at the end.
    Isolate,
    /// Stop the whole batch on the first failure.
    Abort,
}

/// Settings shared by every tool in the workbench.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Page format images are fitted onto when building a PDF from images.
    pub page_size: crate::PaperSize,
    /// Default lossy quality for raster conversion, in `[0.0, 1.0]`.
    pub raster_quality: f32,
    /// JPEG quality used for rasters embedded into generated PDFs.
    pub embedded_image_quality: f32,
    /// Gap between consecutive emissions of a bulk export, in milliseconds.
    pub export_interval_ms: u64,
    /// Failure handling for raster conversion batches.
    pub raster_error_policy: RasterErrorPolicy,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            page_size: crate::PaperSize::A4,
            raster_quality: 0.9,
            embedded_image_quality: 0.95,
            export_interval_ms: 100,
            raster_error_policy: RasterErrorPolicy::Isolate,
        }
    }
}

impl PipelineConfig {
    /// Load the configuration from a JSON file.
    ///
    /// A missing file yields the defaults; a malformed one is an error.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            debug!(path = %path.display(), "no config file, using defaults");
            return Ok(Self::default());
        }
        let data = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&data)?;
        info!(path = %path.display(), "loaded pipeline config");
        Ok(config)
    }

    /// Write the configuration to a JSON file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path.as_ref(), json)?;
        Ok(())
    }
}
