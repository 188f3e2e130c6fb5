// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Ordered output artifacts owned by a job.
//
// The set is the only long-lived owner of a job's output buffers. Releasing it
// (explicitly, on re-trigger, or on drop) frees them; exports already in flight
// hold their own `Arc` and finish unaffected.

use std::sync::Arc;

use blattwerk_core::types::OutputArtifact;
use tracing::debug;

/// Output artifacts in production order.
#[derive(Debug, Default)]
pub struct ArtifactSet {
    items: Vec<Arc<OutputArtifact>>,
}

impl ArtifactSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn from_vec(items: Vec<OutputArtifact>) -> Self {
        Self {
            items: items.into_iter().map(Arc::new).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Shared handle to the artifact at `index`.
    pub fn get(&self, index: usize) -> Option<Arc<OutputArtifact>> {
        self.items.get(index).cloned()
    }

    pub fn iter(&self) -> impl Iterator<Item = &OutputArtifact> {
        self.items.iter().map(Arc::as_ref)
    }

    /// Shared handles to every artifact, in order.
    pub fn handles(&self) -> Vec<Arc<OutputArtifact>> {
        self.items.clone()
    }

    /// Artifact names, in order.
    pub fn names(&self) -> Vec<&str> {
        self.items.iter().map(|artifact| artifact.name.as_str()).collect()
    }

    /// Total payload size in bytes.
    pub fn total_bytes(&self) -> u64 {
        self.items.iter().map(|artifact| artifact.len() as u64).sum()
    }

    /// Drop every artifact, returning how many were released.
    pub fn release(&mut self) -> usize {
        let released = self.items.len();
        if released > 0 {
            debug!(released, bytes = self.total_bytes(), "Releasing artifacts");
        }
        self.items.clear();
        released
    }
}

impl Drop for ArtifactSet {
    fn drop(&mut self) {
        self.release();
    }
}
