//! Error-to-HTTP response conversion.
//!
//! Route handlers return `Result<T, AppError>`; anything convertible into
//! [`synedrius_common::Error`] can be propagated with `?`.

use crate::uploads::UploadError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use synedrius_common::Error;

/// Wrapper so we can implement `IntoResponse` for an external type.
#[derive(Debug)]
pub struct AppError(pub Error);

impl From<Error> for AppError {
    fn from(e: Error) -> Self {
        Self(e)
    }
}

impl From<UploadError> for AppError {
    fn from(e: UploadError) -> Self {
        Self(e.into())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.0.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        // Internal details stay in the log.
        let message = if status.is_server_error() {
            tracing::error!(
                status = %status,
                error = %self.0,
                "Server error in request handler"
            );
            match &self.0 {
                Error::Processing(m) | Error::Upstream(m) => m.clone(),
                _ => "Internal server error".to_string(),
            }
        } else {
            self.0.to_string()
        };

        let body = json!({
            "error": message,
            "code": self.0.code(),
        });

        (status, axum::Json(body)).into_response()
    }
}
