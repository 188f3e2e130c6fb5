// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Blattwerk — Core types, configuration and error definitions shared across all crates.

pub mod config;
pub mod error;
pub mod fingerprint;
pub mod human_errors;
pub mod types;

pub use config::{PipelineConfig, RasterErrorPolicy};
pub use error::BlattwerkError;
pub use fingerprint::{fingerprint, short_fingerprint};
pub use types::*;
