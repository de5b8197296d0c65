//! Artifact persistence.

use std::fmt;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use tracing::debug;

use crate::{OutputError, OutputResult, RenderedMap};

/// Where a saved map can be retrieved from.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ArtifactRef(PathBuf);

impl ArtifactRef {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self(path.into())
    }

    pub fn path(&self) -> &Path {
        &self.0
    }
}

impl fmt::Display for ArtifactRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.display().fmt(f)
    }
}

/// Persists rendered maps.
pub trait ArtifactStore: Send + Sync {
    /// Save `map` under `stem` and return a reference to it.
    ///
    /// Saving the same stem twice replaces the earlier artifact.
    fn save(&self, stem: &str, map: &RenderedMap) -> OutputResult<ArtifactRef>;
}

// ── DirectoryStore ────────────────────────────────────────────────────────────

/// Writes each map to `<dir>/<stem>.<extension>`.
///
/// The directory is created on first save.  Each save writes its own
/// uniquely named temporary file in the same directory and renames it into
/// place, so a reader never sees a partial map and concurrent saves of one
/// stem each land whole (the last rename wins).
#[derive(Debug, Clone)]
pub struct DirectoryStore {
    dir: PathBuf,
}

impl DirectoryStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl ArtifactStore for DirectoryStore {
    fn save(&self, stem: &str, map: &RenderedMap) -> OutputResult<ArtifactRef> {
        if stem.is_empty() || stem.starts_with('.') || stem.contains(['/', '\\']) {
            return Err(OutputError::InvalidStem(stem.to_string()));
        }
        fs::create_dir_all(&self.dir)?;

        let path = self.dir.join(format!("{stem}.{}", map.extension));

        let mut tmp = NamedTempFile::new_in(&self.dir)?;
        tmp.write_all(&map.bytes)?;
        tmp.persist(&path).map_err(|e| e.error)?;

        debug!(path = %path.display(), bytes = map.len(), "saved map artifact");
        Ok(ArtifactRef(path))
    }
}
