//! Error types for readlog-server

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use readlog_common::import::BatchAborted;
use serde_json::json;
use thiserror::Error;
use tracing::error;

/// Shown instead of store or internal failure detail
pub const GENERIC_FAILURE_MESSAGE: &str = "操作失敗，請稍後再試。";

/// Shown when a batch import stops on a store or internal failure
pub const IMPORT_FAILURE_MESSAGE: &str = "匯入過程中發生錯誤。";

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// Resource not found (404)
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Invalid request (400)
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Conflict (409): an import for this user is already running
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Feature not configured (503)
    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),

    /// Internal server error (500)
    #[error("Internal server error: {0}")]
    Internal(String),

    /// Batch import stopped part-way; carries what was already written
    #[error(transparent)]
    ImportAborted(#[from] BatchAborted),

    /// readlog-common error
    #[error(transparent)]
    Common(#[from] readlog_common::Error),
}

/// Status and code for a common-library error
fn classify(err: &readlog_common::Error) -> (StatusCode, &'static str) {
    use readlog_common::Error;
    match err {
        Error::Validation(_) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR"),
        Error::Parse(_) => (StatusCode::BAD_REQUEST, "PARSE_ERROR"),
        Error::InvalidInput(_) | Error::InvalidRecord(_) => (StatusCode::BAD_REQUEST, "BAD_REQUEST"),
        Error::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
        e if e.is_transport() => (StatusCode::INTERNAL_SERVER_ERROR, "DATABASE_ERROR"),
        _ => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
    }
}

/// Message for the client; server-side failures are logged and replaced
fn public_message(err: &readlog_common::Error, status: StatusCode, generic: &str) -> String {
    if status.is_server_error() {
        error!(error = %err, "Request failed");
        generic.to_string()
    } else {
        err.to_string()
    }
}

fn error_body(code: &str, message: String) -> serde_json::Value {
    json!({
        "error": {
            "code": code,
            "message": message,
        }
    })
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, "CONFLICT", msg),
            ApiError::ServiceUnavailable(msg) => {
                (StatusCode::SERVICE_UNAVAILABLE, "SERVICE_UNAVAILABLE", msg)
            }
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR", msg),
            ApiError::Common(ref err) => {
                let (status, code) = classify(err);
                (status, code, public_message(err, status, GENERIC_FAILURE_MESSAGE))
            }
            ApiError::ImportAborted(aborted) => {
                let (status, code) = classify(&aborted.cause);
                let message = public_message(&aborted.cause, status, IMPORT_FAILURE_MESSAGE);
                let mut body = error_body(code, message);
                body["completed"] = json!(aborted.completed);
                return (status, Json(body)).into_response();
            }
        };

        (status, Json(error_body(error_code, message))).into_response()
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;
