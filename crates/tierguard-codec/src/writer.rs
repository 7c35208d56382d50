//! Atomic file writes: sibling temp file, then rename over the destination

use std::path::{Path, PathBuf};

use tokio::fs;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::{CodecError, Result};

/// Writes files through a sibling temp path so readers never see a partial file
///
/// A failed write leaves the destination untouched. When the temp file was
/// already created it is renamed aside with a `.failed` suffix for inspection.
#[derive(Debug, Clone)]
pub struct AtomicWriter {
    verify: bool,
}

impl AtomicWriter {
    /// Creates a writer that reads every file back after the rename
    pub fn new() -> Self {
        AtomicWriter { verify: true }
    }

    /// Creates a writer that skips the read-back check
    pub fn without_verification() -> Self {
        AtomicWriter { verify: false }
    }

    /// Atomically replaces `path` with `content`
    ///
    /// # Arguments
    ///
    /// * `path` - Destination file; its parent directory is created if missing
    /// * `content` - Bytes to write
    pub async fn write(&self, path: &Path, content: impl AsRef<[u8]>) -> Result<()> {
        let content = content.as_ref();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).await?;
            }
        }

        let temp_path = Self::temp_path(path);

        if let Err(e) = Self::write_and_rename(&temp_path, path, content).await {
            Self::set_aside(&temp_path).await;
            return Err(e.into());
        }

        if self.verify {
            let written = fs::read(path).await?;
            if written != content {
                return Err(CodecError::VerificationFailed(path.to_path_buf()));
            }
        }

        debug!(path = %path.display(), bytes = content.len(), "Atomic write complete");
        Ok(())
    }

    async fn write_and_rename(temp_path: &Path, path: &Path, content: &[u8]) -> std::io::Result<()> {
        fs::write(temp_path, content).await?;
        fs::rename(temp_path, path).await
    }

    async fn set_aside(temp_path: &Path) {
        if fs::metadata(temp_path).await.is_err() {
            return;
        }
        let failed_path = Self::failed_path(temp_path);
        match fs::rename(temp_path, &failed_path).await {
            Ok(()) => warn!(path = %failed_path.display(), "Kept failed temp file"),
            Err(e) => warn!(path = %temp_path.display(), error = %e, "Could not set failed temp file aside"),
        }
    }

    /// Sibling temp path for `path`: `<name>.<uuid>.tmp`
    ///
    /// The `.tmp` suffix keeps stray temp files out of config-file scans.
    pub fn temp_path(path: &Path) -> PathBuf {
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("file");
        let mut temp_path = path.to_path_buf();
        temp_path.set_file_name(format!("{}.{}.tmp", file_name, Uuid::new_v4().simple()));
        temp_path
    }

    fn failed_path(temp_path: &Path) -> PathBuf {
        let mut name = temp_path.as_os_str().to_owned();
        name.push(".failed");
        PathBuf::from(name)
    }
}

impl Default for AtomicWriter {
    fn default() -> Self {
        Self::new()
    }
}
