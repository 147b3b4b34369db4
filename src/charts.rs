//! Chart artifact directories.
//!
//! Each question gets its own directory under the chart root. All previous
//! directories are removed before a new question starts so stale charts are
//! never shown next to a new answer.
//!
//! A long-running shell can instead hand out time-ordered session directories
//! and prune all but the newest few.

use crate::error::Result;
use std::path::{Path, PathBuf};
use tracing::debug;

/// File extension of chart artifacts.
pub const CHART_EXTENSION: &str = "svg";

/// Owns the chart root directory.
#[derive(Debug, Clone)]
pub struct ChartStore {
    root: PathBuf,
}

impl ChartStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Remove every per-question directory under the root.
    pub fn clear(&self) -> Result<()> {
        if !self.root.exists() {
            return Ok(());
        }

        for entry in std::fs::read_dir(&self.root)? {
            let path = entry?.path();
            if path.is_dir() {
                debug!("Removing chart directory {:?}", path);
                std::fs::remove_dir_all(&path)?;
            }
        }
        Ok(())
    }

    /// Create a fresh directory for one question.
    pub fn start_invocation(&self) -> Result<PathBuf> {
        let dir = self.root.join(uuid::Uuid::new_v4().to_string());
        std::fs::create_dir_all(&dir)?;
        Ok(dir)
    }

    /// Path for a new session directory. Names sort by creation time.
    pub fn session_dir(&self) -> PathBuf {
        let stamp = chrono::Utc::now().format("%Y%m%dT%H%M%S%.6f");
        self.root.join(format!("{}-{}", stamp, uuid::Uuid::new_v4()))
    }

    /// Remove all but the `keep` newest session directories.
    ///
    /// Returns how many were removed. A directory already removed by a
    /// concurrent prune is not an error.
    pub fn prune(&self, keep: usize) -> Result<usize> {
        if !self.root.exists() {
            return Ok(0);
        }

        let mut dirs: Vec<PathBuf> = std::fs::read_dir(&self.root)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| path.is_dir())
            .collect();
        dirs.sort();

        let excess = dirs.len().saturating_sub(keep);
        let mut removed = 0;
        for dir in dirs.into_iter().take(excess) {
            debug!("Pruning chart session {:?}", dir);
            match std::fs::remove_dir_all(&dir) {
                Ok(()) => removed += 1,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
        }
        Ok(removed)
    }
}

/// Chart files in a directory, sorted by name.
pub fn list_charts(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.exists() {
        return Ok(Vec::new());
    }

    let mut files: Vec<PathBuf> = std::fs::read_dir(dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.extension().is_some_and(|ext| ext == CHART_EXTENSION))
        .collect();
    files.sort();
    Ok(files)
}
