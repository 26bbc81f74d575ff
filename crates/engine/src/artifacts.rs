//! Artifact directory layout
//!
//! Output directories are keyed deterministically by owner and target uid so
//! a re-run of the same target lands in the same place and later lookups
//! need no stored path.

use std::path::{Path, PathBuf};

use simrun_core::{OwnerId, TargetId};

/// Deterministic artifact directory layout under a configured root
#[derive(Debug, Clone)]
pub struct ArtifactLayout {
    root: PathBuf,
}

impl ArtifactLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Output directory for one target: `<root>/<owner>/<target>`
    pub fn output_dir(&self, owner: &OwnerId, target: &TargetId) -> PathBuf {
        self.root.join(owner.as_str()).join(target.as_str())
    }

    /// Create the output directory if it does not exist yet
    pub async fn ensure_output_dir(
        &self,
        owner: &OwnerId,
        target: &TargetId,
    ) -> std::io::Result<PathBuf> {
        let dir = self.output_dir(owner, target);
        tokio::fs::create_dir_all(&dir).await?;
        Ok(dir)
    }

    /// Whether the directory exists and holds at least one entry. Absence of
    /// output after process exit is the sole failure signal the monitor sees.
    pub async fn artifact_present(&self, dir: &Path) -> bool {
        match tokio::fs::read_dir(dir).await {
            Ok(mut entries) => matches!(entries.next_entry().await, Ok(Some(_))),
            Err(_) => false,
        }
    }
}
