//! Filesystem layout for per-attempt result artifacts.
//!
//! ```text
//! <root>/<job_id>/attempt-<n>/<base>_BT.npy
//!                             <base>_mask.npy
//!                             <base>_plot.png
//!                             thumb.png
//! ```
//!
//! Every attempt writes into its own directory, so a discarded attempt can
//! be removed without touching the artifacts of another.

use std::path::{Path, PathBuf};

use cloud_common::Grid;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::StorageResult;
use crate::npy::write_npy;

/// Paths of the artifacts of a completed attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtifactPaths {
    pub bt_path: PathBuf,
    pub mask_path: PathBuf,
    pub plot_path: PathBuf,
    /// Absent when thumbnail generation failed.
    pub thumbnail_path: Option<PathBuf>,
}

/// Base name for artifact files: the part of the file name before `_L1B`,
/// or the file stem when there is no such marker.
pub fn artifact_base_name(file_name: &str) -> String {
    let name = Path::new(file_name)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or(file_name);

    if let Some(idx) = name.find("_L1B") {
        return name[..idx].to_string();
    }
    Path::new(name)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(name)
        .to_string()
}

/// Root directory for all job artifacts.
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    root: PathBuf,
}

impl ArtifactStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn job_dir(&self, job_id: Uuid) -> PathBuf {
        self.root.join(job_id.to_string())
    }

    pub fn attempt_dir(&self, job_id: Uuid, attempt: u32) -> PathBuf {
        self.job_dir(job_id).join(format!("attempt-{}", attempt))
    }

    /// Create an empty directory for an attempt, replacing any leftovers.
    pub fn begin_attempt(
        &self,
        job_id: Uuid,
        attempt: u32,
        file_name: &str,
    ) -> StorageResult<AttemptWriter> {
        let dir = self.attempt_dir(job_id, attempt);
        if dir.exists() {
            std::fs::remove_dir_all(&dir)?;
        }
        std::fs::create_dir_all(&dir)?;
        debug!(job_id = %job_id, attempt = attempt, dir = %dir.display(), "Created attempt directory");

        Ok(AttemptWriter {
            dir,
            base: artifact_base_name(file_name),
        })
    }

    /// Remove everything an attempt wrote. Missing directories are fine.
    pub fn discard_attempt(&self, job_id: Uuid, attempt: u32) -> StorageResult<()> {
        let dir = self.attempt_dir(job_id, attempt);
        match std::fs::remove_dir_all(&dir) {
            Ok(()) => {
                debug!(job_id = %job_id, attempt = attempt, "Discarded attempt artifacts");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => {
                warn!(job_id = %job_id, attempt = attempt, error = %e, "Failed to discard attempt artifacts");
                Err(e.into())
            }
        }
    }
}

/// Writes the artifacts of one attempt into its directory.
#[derive(Debug, Clone)]
pub struct AttemptWriter {
    dir: PathBuf,
    base: String,
}

impl AttemptWriter {
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn base_name(&self) -> &str {
        &self.base
    }

    pub fn write_bt(&self, bt: &Grid<f32>) -> StorageResult<PathBuf> {
        let path = self.dir.join(format!("{}_BT.npy", self.base));
        write_npy(&path, bt)?;
        Ok(path)
    }

    pub fn write_mask(&self, mask: &Grid<u8>) -> StorageResult<PathBuf> {
        let path = self.dir.join(format!("{}_mask.npy", self.base));
        write_npy(&path, mask)?;
        Ok(path)
    }

    pub fn write_plot(&self, png: &[u8]) -> StorageResult<PathBuf> {
        let path = self.dir.join(format!("{}_plot.png", self.base));
        std::fs::write(&path, png)?;
        Ok(path)
    }

    pub fn write_thumbnail(&self, png: &[u8]) -> StorageResult<PathBuf> {
        let path = self.dir.join("thumb.png");
        std::fs::write(&path, png)?;
        Ok(path)
    }
}
