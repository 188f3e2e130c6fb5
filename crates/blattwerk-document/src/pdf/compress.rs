// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// PDF compressor — lossless structural re-serialisation with `lopdf`.
//
// Drops empty streams and unreachable objects, renumbers the rest densely,
// flate-compresses uncompressed streams and writes a single classic
// cross-reference table without object streams.
// Page content is never re-rendered or down-sampled, so the output may be
// larger than the input.

use blattwerk_core::error::{BlattwerkError, Result};
use blattwerk_core::types::{InputFile, OutputArtifact};
use lopdf::Document;
use lopdf::xref::XrefType;
use serde::Serialize;
use tracing::{debug, info, instrument};

/// File name of the artifact produced by [`PdfCompressor::compress`].
pub const COMPRESSED_NAME: &str = "compressed-document.pdf";

/// Trailer entries that describe the input's cross-reference layout and are
/// stale once the document is rewritten.
const STALE_TRAILER_KEYS: [&[u8]; 8] = [
    b"Prev", b"XRefStm", b"Type", b"W", b"Index", b"Filter", b"DecodeParms", b"Length",
];

/// Size comparison between a PDF and its re-serialised form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CompressionReport {
    pub original_bytes: u64,
    pub compressed_bytes: u64,
}

impl CompressionReport {
    /// Size reduction in percent of the original, floored at zero when the
    /// output grew.
    pub fn reduction_percent(&self) -> f64 {
        self.signed_reduction_percent().max(0.0)
    }

    /// `(original - compressed) / original * 100`; negative when the output
    /// grew. An empty original counts as no change.
    pub fn signed_reduction_percent(&self) -> f64 {
        if self.original_bytes == 0 {
            return 0.0;
        }
        let original = self.original_bytes as f64;
        (original - self.compressed_bytes as f64) / original * 100.0
    }

    /// Bytes saved, zero when the output grew.
    pub fn saved_bytes(&self) -> u64 {
        self.original_bytes.saturating_sub(self.compressed_bytes)
    }
}

/// Re-serialises a PDF in its most compact lossless structural form.
#[derive(Debug, Default, Clone, Copy)]
pub struct PdfCompressor;

impl PdfCompressor {
    pub fn new() -> Self {
        Self
    }

    /// Compress `input`, returning the new artifact and its size report.
    #[instrument(skip_all, fields(name = %input.name, input_bytes = input.len()))]
    pub fn compress(&self, input: &InputFile) -> Result<(OutputArtifact, CompressionReport)> {
        let mut document =
            Document::load_mem(&input.bytes).map_err(|err| BlattwerkError::decode(&input.name, err))?;
        let objects_before = document.objects.len();

        // References to a deleted stream are removed along with it.
        let emptied = document.delete_zero_length_streams();
        let pruned = document.prune_objects();
        document.renumber_objects();
        document.compress();
        for key in STALE_TRAILER_KEYS {
            document.trailer.remove(key);
        }
        // The layout is otherwise inherited from the input, which may use an
        // xref stream.
        document.reference_table.cross_reference_type = XrefType::CrossReferenceTable;

        let mut output = Vec::new();
        document
            .save_to(&mut output)
            .map_err(|err| BlattwerkError::encode(COMPRESSED_NAME, err))?;

        debug!(
            objects_before,
            objects_after = document.objects.len(),
            emptied = emptied.len(),
            pruned = pruned.len(),
            "Object graph compacted"
        );

        let report = CompressionReport {
            original_bytes: input.len() as u64,
            compressed_bytes: output.len() as u64,
        };
        info!(
            compressed_bytes = report.compressed_bytes,
            reduction_percent = report.reduction_percent(),
            "PDF compressed"
        );

        Ok((OutputArtifact::pdf(COMPRESSED_NAME, output), report))
    }
}
