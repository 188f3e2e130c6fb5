// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Core domain types for the Blattwerk document workbench.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// MIME type of every paginated document the workbench reads or writes.
pub const PDF_MIME: &str = "application/pdf";

/// Unique identifier for a conversion job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct JobId(pub Uuid);

impl JobId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for JobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The five operations the workbench offers, one per tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Operation {
    /// Concatenate the pages of several PDFs into one.
    Merge,
    /// Place each image on its own page of a new PDF.
    ImageToDocument,
    /// Produce one PDF per page of a source PDF.
    Split,
    /// Re-encode images into another raster format.
    RasterConvert,
    /// Re-serialize a PDF into its most compact form.
    Compress,
}

impl Operation {
    /// Minimum number of inputs the operation needs before it may start.
    pub fn min_inputs(&self) -> usize {
        match self {
            Self::Merge => 2,
            Self::ImageToDocument | Self::Split | Self::RasterConvert | Self::Compress => 1,
        }
    }

    /// Whether only the first input is used (extra inputs are discarded).
    pub fn is_single_input(&self) -> bool {
        matches!(self, Self::Split | Self::Compress)
    }

    /// Whether per-item failures can be isolated from the rest of the batch.
    ///
    /// Document-composing operations have an ordering dependency across all
    /// inputs, so any failure there is fatal to the job.
    pub fn isolates_item_errors(&self) -> bool {
        matches!(self, Self::RasterConvert)
    }

    /// Whether the operation consumes raster images (as opposed to PDFs).
    pub fn takes_images(&self) -> bool {
        matches!(self, Self::ImageToDocument | Self::RasterConvert)
    }

    /// Whether an input with the given MIME type is acceptable.
    pub fn accepts_mime(&self, mime_type: &str) -> bool {
        if self.takes_images() {
            mime_type.starts_with("image/")
        } else {
            mime_type == PDF_MIME
        }
    }

    /// Short human-readable tool label.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Merge => "PDF Merger",
            Self::ImageToDocument => "Images to PDF",
            Self::Split => "PDF Splitter",
            Self::RasterConvert => "Image Converter",
            Self::Compress => "PDF Compressor",
        }
    }
}

/// Lifecycle states of a conversion job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JobStatus {
    /// Created, not yet triggered.
    Idle,
    /// Items are being processed.
    Running,
    /// All outputs produced.
    Succeeded,
    /// Terminated with an error, see the job's error message.
    Failed,
}

/// Raster encodings the image converter can produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RasterFormat {
    Jpeg,
    Png,
    Webp,
}

impl RasterFormat {
    /// MIME type of the encoded output.
    pub fn mime_type(&self) -> &'static str {
        match self {
            Self::Jpeg => "image/jpeg",
            Self::Png => "image/png",
            Self::Webp => "image/webp",
        }
    }

    /// Canonical file extension (without the dot).
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Jpeg => "jpeg",
            Self::Png => "png",
            Self::Webp => "webp",
        }
    }

    /// Whether the encoder ignores the quality parameter.
    ///
    /// The pure-Rust WebP encoder only writes lossless VP8L bitstreams.
    pub fn is_lossless(&self) -> bool {
        matches!(self, Self::Png | Self::Webp)
    }

    /// Parse a format name or extension (`jpg`, `jpeg`, `png`, `webp`).
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim_start_matches('.').to_ascii_lowercase().as_str() {
            "jpg" | "jpeg" => Some(Self::Jpeg),
            "png" => Some(Self::Png),
            "webp" => Some(Self::Webp),
            _ => None,
        }
    }
}

impl std::fmt::Display for RasterFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.extension())
    }
}

/// Standard paper sizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PaperSize {
    A4,
    A3,
    A5,
    Letter,
    Legal,
    Custom { width_mm: u32, height_mm: u32 },
}

impl PaperSize {
    /// Dimensions in millimetres (width, height).
    pub fn dimensions_mm(&self) -> (u32, u32) {
        match self {
            Self::A4 => (210, 297),
            Self::A3 => (297, 420),
            Self::A5 => (148, 210),
            Self::Letter => (216, 279),
            Self::Legal => (216, 356),
            Self::Custom {
                width_mm,
                height_mm,
            } => (*width_mm, *height_mm),
        }
    }

    /// Dimensions in PDF points (1/72 inch).
    pub fn dimensions_pt(&self) -> (f32, f32) {
        let (w, h) = self.dimensions_mm();
        (w as f32 * MM_TO_PT, h as f32 * MM_TO_PT)
    }
}

const MM_TO_PT: f32 = 72.0 / 25.4;

/// A named, immutable input buffer supplied by the caller.
///
/// The bytes are reference counted so the runner can hand them to blocking
/// worker threads without copying.
#[derive(Debug, Clone)]
pub struct InputFile {
    pub name: String,
    pub bytes: Arc<[u8]>,
    pub mime_type: String,
}

impl InputFile {
    pub fn new(name: impl Into<String>, bytes: impl Into<Arc<[u8]>>, mime_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            bytes: bytes.into(),
            mime_type: mime_type.into(),
        }
    }

    /// Build an input whose MIME type is inferred from the file name.
    pub fn from_named_bytes(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        let name = name.into();
        let mime_type = mime_from_name(&name).to_string();
        Self::new(name, bytes, mime_type)
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// A named output buffer produced by one of the document components.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputArtifact {
    pub name: String,
    pub bytes: Vec<u8>,
    pub mime_type: String,
}

impl OutputArtifact {
    pub fn new(name: impl Into<String>, bytes: Vec<u8>, mime_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            bytes,
            mime_type: mime_type.into(),
        }
    }

    /// Shorthand for a PDF artifact.
    pub fn pdf(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self::new(name, bytes, PDF_MIME)
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Infer a MIME type from a file name's extension.
pub fn mime_from_name(name: &str) -> &'static str {
    let ext = name.rsplit_once('.').map(|(_, ext)| ext).unwrap_or("");
    match ext.to_ascii_lowercase().as_str() {
        "pdf" => PDF_MIME,
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "webp" => "image/webp",
        "gif" => "image/gif",
        "bmp" => "image/bmp",
        "tif" | "tiff" => "image/tiff",
        _ => "application/octet-stream",
    }
}

/// Format a byte count for display (`Bytes`, `KB`, `MB`, `GB`; base 1024).
pub fn format_file_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["Bytes", "KB", "MB", "GB"];
    if bytes == 0 {
        return "0 Bytes".to_string();
    }
    let exponent = ((bytes as f64).ln() / 1024f64.ln()).floor() as usize;
    let exponent = exponent.min(UNITS.len() - 1);
    let value = bytes as f64 / 1024f64.powi(exponent as i32);
    // Two decimals, trailing zeros dropped.
    let rounded = (value * 100.0).round() / 100.0;
    format!("{} {}", rounded, UNITS[exponent])
}
