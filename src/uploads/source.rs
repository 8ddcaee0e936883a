//! Where an upload's bytes come from.

use super::error::CleanupError;
use std::path::Path;
use tempfile::{Builder, TempPath};

/// Name prefix of in-flight multipart temp files.
pub const TEMP_UPLOAD_PREFIX: &str = ".synedrius-upload-";

/// Input to the upload pipeline: exactly one of a received file or a URL.
#[derive(Debug)]
pub enum UploadSource {
    File(UploadedFile),
    RemoteUrl(String),
}

impl UploadSource {
    /// Drop the source without processing it, deleting any temp file.
    pub fn discard(self) -> Option<CleanupError> {
        match self {
            UploadSource::File(file) => file.temp.close().err(),
            UploadSource::RemoteUrl(_) => None,
        }
    }
}

/// A file received from the client and spooled to a temp path.
#[derive(Debug)]
pub struct UploadedFile {
    pub temp: TempUpload,
    /// Media type declared by the client (not trusted for decoding)
    pub media_type: String,
    /// Client-supplied filename, unsanitized
    pub original_name: String,
}

/// Owned temp file that is deleted exactly once.
///
/// [`TempUpload::close`] deletes it and reports failures; if the value is
/// dropped instead, deletion still happens, silently.
#[derive(Debug)]
pub struct TempUpload {
    path: TempPath,
}

impl TempUpload {
    /// Create an empty temp file in `dir`, returning it with a writable handle.
    pub fn create_in(dir: &Path) -> std::io::Result<(Self, std::fs::File)> {
        let (file, path) = Builder::new()
            .prefix(TEMP_UPLOAD_PREFIX)
            .tempfile_in(dir)?
            .into_parts();
        Ok((Self { path }, file))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Delete the file now.
    pub fn close(self) -> Result<(), CleanupError> {
        let path = self.path.to_path_buf();
        match self.path.close() {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(CleanupError::TempFile { path, source }),
        }
    }
}

/// True for leftover temp upload names swept at startup.
pub fn is_temp_upload_name(name: &str) -> bool {
    name.starts_with(TEMP_UPLOAD_PREFIX)
}
