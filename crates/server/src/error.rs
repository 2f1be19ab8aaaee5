//! API error types.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use ogserver_core::urlkey::UrlError;

/// API error type.
///
/// Bodies are short plaintext lines; clients of this service are social
/// crawlers and curl, not JSON consumers.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("Invalid template")]
    InvalidTemplate,

    #[error("Could not connect to origin URL")]
    OriginUnreachable,

    #[error("Internal Server Error")]
    Internal(String),
}

impl ApiError {
    /// Get the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) | Self::InvalidTemplate => StatusCode::BAD_REQUEST,
            Self::OriginUnreachable => StatusCode::BAD_GATEWAY,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if let Self::Internal(detail) = &self {
            tracing::error!(error = %detail, "request failed");
        }
        (self.status_code(), format!("{self}\n")).into_response()
    }
}

impl From<UrlError> for ApiError {
    fn from(err: UrlError) -> Self {
        Self::BadRequest(err.to_string())
    }
}

impl From<ogserver_core::Error> for ApiError {
    fn from(err: ogserver_core::Error) -> Self {
        Self::Internal(err.to_string())
    }
}

/// Result type for API handlers.
pub type ApiResult<T> = std::result::Result<T, ApiError>;
