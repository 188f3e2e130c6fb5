// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Content fingerprints — SHA-256 digests of input and output buffers.

use sha2::{Digest, Sha256};

/// Compute the SHA-256 hash of `data` and return it as a lowercase hex string.
///
/// Job summaries carry these so a caller can tell which bytes went in and
/// which came out without keeping the buffers around.
pub fn fingerprint(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

/// First twelve hex characters of the fingerprint, for log lines.
pub fn short_fingerprint(data: &[u8]) -> String {
    let mut full = fingerprint(data);
    full.truncate(12);
    full
}
