//! Common error type used throughout synedrius.
//!
//! Every crate funnels its failures into [`Error`], which carries enough
//! context for the HTTP layer to derive a status code via
//! [`Error::http_status`].

use std::fmt;

/// Unified error type covering all failure modes in synedrius.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The requested entity could not be found.
    #[error("{entity} not found: {id}")]
    NotFound {
        /// The kind of entity (e.g. "team", "user").
        entity: String,
        /// The identifier that was looked up.
        id: String,
    },

    /// The caller is not authenticated.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// The caller lacks permission for the requested action.
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Request data failed validation.
    #[error("{0}")]
    Validation(String),

    /// A conflicting resource already exists.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// The caller sent too many requests in a short time.
    #[error("Too many requests: {0}")]
    RateLimited(String),

    /// The request body exceeds the configured size limit.
    #[error("Payload too large (max: {max_bytes} bytes)")]
    PayloadTooLarge {
        /// Maximum accepted size in bytes.
        max_bytes: usize,
    },

    /// The declared media type is not accepted.
    #[error("Unsupported media type: {0}")]
    UnsupportedMediaType(String),

    /// A remote resource could not be fetched.
    #[error("Upstream error: {0}")]
    Upstream(String),

    /// Decoding, transforming or encoding content failed.
    #[error("Processing error: {0}")]
    Processing(String),

    /// A database operation failed.
    #[error("Database error: {0}")]
    Database(String),

    /// An I/O operation failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Catch-all for unexpected internal errors.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Map this error to an appropriate HTTP status code.
    pub fn http_status(&self) -> u16 {
        match self {
            Error::NotFound { .. } => 404,
            Error::Unauthorized(_) => 401,
            Error::Forbidden(_) => 403,
            Error::Validation(_) => 400,
            Error::Conflict(_) => 409,
            Error::PayloadTooLarge { .. } => 413,
            Error::RateLimited(_) => 429,
            Error::UnsupportedMediaType(_) => 415,
            Error::Upstream(_) => 502,
            Error::Processing(_) => 500,
            Error::Database(_) => 500,
            Error::Io(_) => 500,
            Error::Internal(_) => 500,
        }
    }

    /// Short machine-readable code used in JSON error bodies.
    pub fn code(&self) -> &'static str {
        match self {
            Error::NotFound { .. } => "not_found",
            Error::Unauthorized(_) => "unauthorized",
            Error::Forbidden(_) => "forbidden",
            Error::Validation(_) => "validation_error",
            Error::Conflict(_) => "conflict",
            Error::PayloadTooLarge { .. } => "payload_too_large",
            Error::RateLimited(_) => "rate_limited",
            Error::UnsupportedMediaType(_) => "unsupported_media_type",
            Error::Upstream(_) => "upstream_error",
            Error::Processing(_) => "processing_error",
            Error::Database(_) => "database_error",
            Error::Io(_) => "io_error",
            Error::Internal(_) => "internal_error",
        }
    }

    /// Convenience constructor for [`Error::NotFound`].
    pub fn not_found(entity: impl Into<String>, id: impl fmt::Display) -> Self {
        Error::NotFound {
            entity: entity.into(),
            id: id.to_string(),
        }
    }

    /// Convenience constructor for [`Error::Database`].
    pub fn database<S: Into<String>>(msg: S) -> Self {
        Error::Database(msg.into())
    }

    /// Convenience constructor for [`Error::Validation`].
    pub fn validation<S: Into<String>>(msg: S) -> Self {
        Error::Validation(msg.into())
    }

    /// Convenience constructor for [`Error::Internal`].
    pub fn internal<S: Into<String>>(msg: S) -> Self {
        Error::Internal(msg.into())
    }
}

/// Result alias using the crate-level [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_display() {
        let err = Error::not_found("team", "abc-123");
        assert_eq!(err.to_string(), "team not found: abc-123");
        assert_eq!(err.http_status(), 404);
        assert_eq!(err.code(), "not_found");
    }

    #[test]
    fn validation_is_client_error() {
        let err = Error::validation("Only image files are allowed.");
        assert_eq!(err.to_string(), "Only image files are allowed.");
        assert_eq!(err.http_status(), 400);
    }

    #[test]
    fn payload_too_large_display() {
        let err = Error::PayloadTooLarge { max_bytes: 1024 };
        assert_eq!(err.to_string(), "Payload too large (max: 1024 bytes)");
        assert_eq!(err.http_status(), 413);
    }

    #[test]
    fn upstream_maps_to_bad_gateway() {
        let err = Error::Upstream("connection refused".into());
        assert_eq!(err.http_status(), 502);
        assert_eq!(err.code(), "upstream_error");
    }

    #[test]
    fn processing_is_server_error() {
        let err = Error::Processing("corrupt header".into());
        assert_eq!(err.to_string(), "Processing error: corrupt header");
        assert_eq!(err.http_status(), 500);
    }

    #[test]
    fn io_from_std() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file missing");
        let err = Error::from(io_err);
        assert!(matches!(err, Error::Io(_)));
        assert_eq!(err.http_status(), 500);
    }

    #[test]
    fn auth_statuses() {
        assert_eq!(Error::Unauthorized("x".into()).http_status(), 401);
        assert_eq!(Error::Forbidden("x".into()).http_status(), 403);
        assert_eq!(Error::Conflict("x".into()).http_status(), 409);
        assert_eq!(Error::UnsupportedMediaType("x".into()).http_status(), 415);
    }

    #[test]
    fn rate_limited_maps_to_429() {
        let err = Error::RateLimited("slow down".into());
        assert_eq!(err.http_status(), 429);
        assert_eq!(err.code(), "rate_limited");
        assert_eq!(err.to_string(), "Too many requests: slow down");
    }
}
