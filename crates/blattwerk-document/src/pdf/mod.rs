// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// PDF module — page composition (merge, split), image-to-PDF generation, and
// re-serialisation for size reduction.

pub mod composer;
pub mod compress;
pub mod writer;

pub use composer::{PdfComposer, PdfSource};
pub use compress::{CompressionReport, PdfCompressor};
pub use writer::ImagePdfWriter;
