// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Directory sink — writes exported artifacts into a local folder.

use std::path::{Path, PathBuf};

use blattwerk_core::error::{BlattwerkError, Result};
use blattwerk_core::types::OutputArtifact;
use blattwerk_pipeline::ArtifactSink;
use tracing::info;

/// Writes each emitted artifact to `<dir>/<name>`, replacing any existing file.
#[derive(Debug, Clone)]
pub struct DirectorySink {
    dir: PathBuf,
}

impl DirectorySink {
    /// Use `dir` as the destination, creating it if needed.
    pub fn create(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    /// Destination path of an artifact. Only the final path component of the
    /// name is used, so artifacts cannot escape the directory.
    pub fn path_for(&self, name: &str) -> Result<PathBuf> {
        let file_name = Path::new(name)
            .file_name()
            .ok_or_else(|| BlattwerkError::Export(format!("unusable artifact name {name:?}")))?;
        Ok(self.dir.join(file_name))
    }
}

impl ArtifactSink for DirectorySink {
    fn emit(&self, artifact: &OutputArtifact) -> Result<()> {
        let path = self.path_for(&artifact.name)?;
        std::fs::write(&path, &artifact.bytes)?;
        info!(path = %path.display(), bytes = artifact.len(), "Artifact written");
        Ok(())
    }
}
