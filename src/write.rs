//! Output writer.
//!
//! Writes planned files under the output root. Parent directories are
//! created on demand and existing files are overwritten. Files left over
//! from earlier runs are not removed.

use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

/// One file of the generated site, fully rendered in memory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedFile {
    /// Path relative to the output root.
    pub path: PathBuf,
    pub contents: Vec<u8>,
}

impl PlannedFile {
    pub fn new(path: impl Into<PathBuf>, contents: impl Into<Vec<u8>>) -> Self {
        Self {
            path: path.into(),
            contents: contents.into(),
        }
    }
}

#[derive(Error, Debug)]
#[error("failed to write {path}")]
pub struct WriteError {
    pub path: PathBuf,
    #[source]
    pub source: std::io::Error,
}

pub fn write_file(root: &Path, file: &PlannedFile) -> Result<(), WriteError> {
    let target = root.join(&file.path);
    let fail = |source| WriteError {
        path: target.clone(),
        source,
    };
    if let Some(parent) = target.parent() {
        fs::create_dir_all(parent).map_err(fail)?;
    }
    fs::write(&target, &file.contents).map_err(fail)?;
    debug!(path = %file.path.display(), bytes = file.contents.len(), "wrote file");
    Ok(())
}

/// Write every file, stopping at the first failure.
pub fn write_all(root: &Path, files: &[PlannedFile]) -> Result<(), WriteError> {
    fs::create_dir_all(root).map_err(|source| WriteError {
        path: root.to_path_buf(),
        source,
    })?;
    files.iter().try_for_each(|file| write_file(root, file))
}
