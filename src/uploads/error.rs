use std::path::PathBuf;
use synedrius_common::Error;

/// Failure of an upload. No file is left at the final destination when one
/// of these is returned.
#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    #[error("No files were uploaded.")]
    Missing,

    #[error("Send either a file or a URL, not both.")]
    Ambiguous,

    #[error("Only image files are allowed.")]
    NotAnImage { media_type: String },

    #[error("Invalid image URL: {0}")]
    InvalidUrl(String),

    #[error("Upload exceeds the {max_bytes} byte limit")]
    TooLarge { max_bytes: usize },

    #[error("Failed to fetch remote image: {0}")]
    Fetch(String),

    #[error("Error processing the image: {0}")]
    Decode(String),

    #[error("Error encoding the image: {0}")]
    Encode(String),

    #[error("Upload storage error: {0}")]
    Io(#[from] std::io::Error),

    /// Team lookup, permission or database failure.
    #[error(transparent)]
    Store(#[from] Error),

    #[error("Upload task failed: {0}")]
    Task(String),
}

impl From<UploadError> for Error {
    fn from(e: UploadError) -> Self {
        match e {
            UploadError::Missing | UploadError::Ambiguous | UploadError::InvalidUrl(_) => {
                Error::validation(e.to_string())
            }
            UploadError::NotAnImage { .. } => Error::UnsupportedMediaType(e.to_string()),
            UploadError::TooLarge { max_bytes } => Error::PayloadTooLarge { max_bytes },
            UploadError::Fetch(_) => Error::Upstream(e.to_string()),
            UploadError::Decode(_) | UploadError::Encode(_) => Error::Processing(e.to_string()),
            UploadError::Io(io) => Error::Io(io),
            UploadError::Store(inner) => inner,
            UploadError::Task(_) => Error::internal(e.to_string()),
        }
    }
}

/// Best-effort cleanup that did not succeed.
///
/// Collected in the upload outcome and logged; never returned to the client.
#[derive(Debug, thiserror::Error)]
pub enum CleanupError {
    #[error("failed to delete temp upload {path:?}: {source}")]
    TempFile {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to delete replaced logo {path:?}: {source}")]
    ReplacedLogo {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to remove uncommitted upload {path:?}: {source}")]
    Uncommitted {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to update the record of stored logo {name}: {source}")]
    Record { name: String, source: Error },
}
