//! Team logo uploads.
//!
//! A logo arrives either as a multipart file (spooled to a temp file by the
//! HTTP layer) or as a remote URL. [`UploadService`] turns it into a JPEG no
//! wider than 800 px stored under a unique name in the public uploads
//! directory, and optionally points a team at it.

pub mod error;
pub mod fetch;
pub mod normalize;
pub mod service;
pub mod source;
pub mod storage;

pub use error::{CleanupError, UploadError};
pub use fetch::RemoteFetcher;
pub use normalize::{JPEG_QUALITY, MAX_LOGO_WIDTH};
pub use service::{UploadOutcome, UploadRequest, UploadService};
pub use source::{TempUpload, UploadSource, UploadedFile};
pub use storage::{LogoStorage, StoredImage, PUBLIC_PREFIX};

use std::path::Path;

/// Remove temp uploads left behind by a previous process.
///
/// Returns the number of files removed. Errors are logged and skipped.
pub fn sweep_stale_temp_files(dir: &Path) -> usize {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            tracing::warn!("Cannot scan temp upload dir {:?}: {}", dir, e);
            return 0;
        }
    };

    let mut removed = 0;
    for entry in entries.flatten() {
        let name = entry.file_name();
        if !source::is_temp_upload_name(&name.to_string_lossy()) {
            continue;
        }
        match std::fs::remove_file(entry.path()) {
            Ok(()) => removed += 1,
            Err(e) => tracing::warn!("Failed to remove stale temp upload {:?}: {}", entry.path(), e),
        }
    }
    removed
}
