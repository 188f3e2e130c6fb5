// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// blattwerk-document — Document transforms for the Blattwerk workbench.
//
// Provides PDF page composition (merge, split), image-to-PDF generation,
// structural PDF compression, raster re-encoding (JPEG, PNG, WebP), and the
// page-fit geometry shared by them. Every transform is synchronous and works
// on in-memory buffers.

pub mod geometry;
pub mod pdf;
pub mod raster;

#[cfg(any(test, feature = "fixtures"))]
pub mod fixtures;

// Re-export the primary types so callers can use `blattwerk_document::PdfComposer` etc.
pub use geometry::{PageGeometry, PlacementRect, fit_to_page};
pub use pdf::composer::{MERGED_NAME, merge, split, split_page_name};
pub use pdf::compress::COMPRESSED_NAME;
pub use pdf::writer::IMAGES_PDF_NAME;
pub use pdf::{CompressionReport, ImagePdfWriter, PdfComposer, PdfCompressor, PdfSource};
pub use raster::RasterConverter;
