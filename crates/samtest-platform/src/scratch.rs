//! Scratch files handed to the emulator (event payloads, environment overrides).
//!
//! A [`ScratchFile`] removes itself when dropped, so a file never outlives
//! the owner that wrote it, including on early-return paths.

use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::error::Result;

/// A JSON file that is deleted on drop.
#[derive(Debug)]
pub struct ScratchFile {
    path: PathBuf,
}

impl ScratchFile {
    /// Serializes `value` to `path`, creating parent directories.
    ///
    /// # Errors
    /// Returns an error if serialization or the write fails.
    pub fn write_json<T: Serialize + ?Sized>(path: impl Into<PathBuf>, value: &T) -> Result<Self> {
        let path = path.into();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let text = serde_json::to_string_pretty(value)?;
        std::fs::write(&path, text)?;
        tracing::trace!(path = %path.display(), "wrote scratch file");
        Ok(Self { path })
    }

    /// Path of the file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for ScratchFile {
    fn drop(&mut self) {
        match std::fs::remove_file(&self.path) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => tracing::debug!(path = %self.path.display(), error = %e, "failed to remove scratch file"),
        }
    }
}
