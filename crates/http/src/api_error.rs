//! Typed API error for HTTP handlers.
//!
//! Converts domain errors into JSON responses with proper status codes;
//! handlers return `Result<Json<T>, ApiError>` and never leak internals.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use kurswissen_dialogue::DialogueError;
use kurswissen_storage::StorageError;

/// API error with HTTP status code and human-readable message.
///
/// Converts to a JSON response: `{"error": "message"}`. The `Internal`
/// variant logs the real error server-side and returns a static message.
#[derive(Debug)]
pub enum ApiError {
    /// 400 Bad Request: invalid input from the caller.
    BadRequest(String),
    /// 404 Not Found: requested resource doesn't exist.
    NotFound(String),
    /// 500 Internal Server Error: unexpected failure, details logged.
    Internal(anyhow::Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            Self::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            Self::Internal(err) => {
                tracing::error!(error = ?err, "internal server error");
                (StatusCode::INTERNAL_SERVER_ERROR, "internal server error".to_owned())
            },
        };
        let body = serde_json::json!({ "error": message });
        (status, Json(body)).into_response()
    }
}

impl From<DialogueError> for ApiError {
    fn from(err: DialogueError) -> Self {
        match err {
            DialogueError::InvalidInput(msg) => Self::BadRequest(msg),
            DialogueError::Storage(StorageError::NotFound { entity, id }) => {
                Self::NotFound(format!("{entity} '{id}' not found"))
            },
            DialogueError::Storage(e) => Self::Internal(e.into()),
        }
    }
}

impl From<StorageError> for ApiError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotFound { entity, id } => {
                Self::NotFound(format!("{entity} '{id}' not found"))
            },
            e => Self::Internal(e.into()),
        }
    }
}
