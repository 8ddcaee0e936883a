//! Flat on-disk store of logo files served under `/uploads/`.
//!
//! New files are written to a hidden temp file in the same directory and
//! renamed into place without clobbering, so a final path either holds a
//! complete file or does not exist.

use super::error::CleanupError;
use std::io::Write;
use std::path::{Path, PathBuf};
use synedrius_common::paths::sanitize_filename;
use tempfile::Builder;
use uuid::Uuid;

/// URL prefix under which stored logos are served.
pub const PUBLIC_PREFIX: &str = "/uploads/";

const WRITE_PREFIX: &str = ".synedrius-write-";

/// A logo persisted in the uploads directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredImage {
    /// `<uuid>-<sanitized original name>`
    pub name: String,
    /// Public reference, `/uploads/<name>`
    pub url: String,
    pub path: PathBuf,
}

#[derive(Debug, Clone)]
pub struct LogoStorage {
    dir: PathBuf,
}

impl LogoStorage {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Create the uploads directory if needed.
    pub fn ensure_dir(&self) -> std::io::Result<()> {
        std::fs::create_dir_all(&self.dir)
    }

    /// Generate a fresh `<uuid>-<sanitized>` name.
    pub fn unique_name(original_name: &str) -> String {
        format!("{}-{}", Uuid::new_v4(), sanitize_filename(original_name))
    }

    /// Write `bytes` under a new unique name. Blocking.
    pub fn write(&self, original_name: &str, bytes: &[u8]) -> std::io::Result<StoredImage> {
        let name = Self::unique_name(original_name);
        let path = self.dir.join(&name);

        let mut tmp = Builder::new().prefix(WRITE_PREFIX).tempfile_in(&self.dir)?;
        tmp.write_all(bytes)?;
        tmp.as_file().sync_all()?;
        tmp.persist_noclobber(&path).map_err(|e| e.error)?;

        tracing::debug!("Stored logo {:?} ({} bytes)", path, bytes.len());

        Ok(StoredImage {
            url: format!("{PUBLIC_PREFIX}{name}"),
            name,
            path,
        })
    }

    /// Extract the stored file name from a `/uploads/<name>` reference.
    ///
    /// Returns `None` for external URLs and for anything that is not a single
    /// plain file name (no separators, no dot-files).
    pub fn stored_name(reference: &str) -> Option<&str> {
        let name = reference.strip_prefix(PUBLIC_PREFIX)?;
        let plain = !name.is_empty()
            && !name.starts_with('.')
            && !name.contains(['/', '\\'])
            && !name.contains('\0');
        plain.then_some(name)
    }

    /// Map a `/uploads/<name>` reference to a path inside the directory.
    pub fn resolve_reference(&self, reference: &str) -> Option<PathBuf> {
        Self::stored_name(reference).map(|name| self.dir.join(name))
    }

    /// Delete a stored logo by its public reference.
    ///
    /// Returns `Ok(false)` when the reference is not local or the file is
    /// already gone.
    pub async fn delete_if_exists(&self, reference: &str) -> Result<bool, CleanupError> {
        let Some(path) = self.resolve_reference(reference) else {
            return Ok(false);
        };
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(source) => Err(CleanupError::ReplacedLogo { path, source }),
        }
    }

    /// Remove a file written by this request whose commit failed.
    pub async fn remove_uncommitted(&self, stored: &StoredImage) -> Result<(), CleanupError> {
        match tokio::fs::remove_file(&stored.path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(CleanupError::Uncommitted {
                path: stored.path.clone(),
                source,
            }),
        }
    }
}
