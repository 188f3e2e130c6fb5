// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Unified error types for Blattwerk.

use thiserror::Error;

/// Top-level error type for all Blattwerk operations.
#[derive(Debug, Error)]
pub enum BlattwerkError {
    // -- Input validation (reported before any processing starts) --
    #[error("invalid input: {0}")]
    InputValidation(String),

    // -- Transform errors --
    #[error("failed to decode {name}: {detail}")]
    Decode { name: String, detail: String },

    #[error("failed to encode {name}: {detail}")]
    Encode { name: String, detail: String },

    #[error("page composition failed: {0}")]
    Compose(String),

    // -- Export --
    #[error("artifact export failed: {0}")]
    Export(String),

    // -- Runtime --
    #[error("background task failed: {0}")]
    Task(String),

    // -- Storage / persistence --
    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl BlattwerkError {
    /// Shorthand for a decode failure of the named input.
    pub fn decode(name: impl Into<String>, detail: impl std::fmt::Display) -> Self {
        Self::Decode {
            name: name.into(),
            detail: detail.to_string(),
        }
    }

    /// Shorthand for an encode failure of the named output.
    pub fn encode(name: impl Into<String>, detail: impl std::fmt::Display) -> Self {
        Self::Encode {
            name: name.into(),
            detail: detail.to_string(),
        }
    }

    /// Whether the error concerns a single item and may be isolated from the
    /// rest of a batch.
    pub fn is_item_scoped(&self) -> bool {
        matches!(self, Self::Decode { .. } | Self::Encode { .. })
    }
}

/// Alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, BlattwerkError>;
