//! HTTP error responses.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use notehub_core::Error;

/// Error returned by every handler. Renders as `{"error": message}`.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    Forbidden(String),
    #[error("{0}")]
    Conflict(String),
    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    /// A required request field was absent.
    pub fn missing(field: &str) -> Self {
        ApiError::BadRequest(format!("Missing required field: {field}"))
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        let msg = err.to_string();
        match err {
            Error::NotFound(_)
            | Error::ContentNotFound(_)
            | Error::UserNotFound(_)
            | Error::KeywordNotFound(_) => ApiError::NotFound(msg),
            Error::PermissionDenied(_) => ApiError::Forbidden(msg),
            Error::Conflict { .. } => ApiError::Conflict(msg),
            Error::Serialization(_) => ApiError::Internal(msg),
            Error::InvalidId(_)
            | Error::EmptyTitle
            | Error::EmptyKeyword
            | Error::IndexOutOfBounds { .. }
            | Error::UnsupportedPermissionType(_)
            | Error::UnsupportedContentType(_)
            | Error::InvalidCollaborator(_)
            | Error::DuplicateContentId(_) => ApiError::BadRequest(msg),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "Request failed");
        }
        let body = Json(serde_json::json!({
            "error": self.to_string(),
        }));
        (status, body).into_response()
    }
}

/// Unwrap an optional request field or reject with 400.
pub fn required<T>(value: Option<T>, field: &str) -> Result<T, ApiError> {
    value.ok_or_else(|| ApiError::missing(field))
}
