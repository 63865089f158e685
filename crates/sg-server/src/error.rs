//! Error-to-HTTP response conversion.
//!
//! Route handlers and middleware return `Result<T, AppError>`; the JSON body
//! carries the error message, a stable code, and the request id.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use sg_core::Error;

/// Wrapper so we can implement `IntoResponse` for an external type.
#[derive(Debug)]
pub struct AppError {
    inner: Error,
    request_id: Option<String>,
}

impl AppError {
    pub fn new(inner: Error) -> Self {
        Self {
            inner,
            request_id: None,
        }
    }

    pub fn with_request_id(mut self, id: impl Into<String>) -> Self {
        self.request_id = Some(id.into());
        self
    }

    pub fn inner(&self) -> &Error {
        &self.inner
    }

    /// Stable machine-readable code for the wrapped error.
    pub fn code(&self) -> &'static str {
        match &self.inner {
            Error::NotFound { .. } => "not_found",
            Error::Unauthorized(_) => "unauthorized",
            Error::Forbidden(_) => "forbidden",
            Error::InvalidObjectKey => "forbidden",
            Error::Validation(_) => "validation_error",
            Error::Upstream(_) => "upstream_error",
            Error::Config(_) => "config_error",
            Error::Database { .. } => "database_error",
            Error::Io { .. } => "io_error",
            Error::Internal(_) => "internal_error",
        }
    }
}

impl From<Error> for AppError {
    fn from(e: Error) -> Self {
        Self::new(e)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.inner.http_status())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        if status.is_server_error() {
            tracing::error!(
                status = %status,
                error = %self.inner,
                "Server error in request handler"
            );
        }

        // Internal failure detail stays in the log.
        let message = match &self.inner {
            Error::Database { .. } | Error::Io { .. } | Error::Config(_) | Error::Internal(_) => {
                "internal server error".to_string()
            }
            other => other.to_string(),
        };

        let body = json!({
            "error": message,
            "code": self.code(),
            "request_id": self.request_id,
        });

        (status, axum::Json(body)).into_response()
    }
}
