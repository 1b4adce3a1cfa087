//! Error handling module
//!
//! Request-context errors, body errors, and the handler-facing `AppError`
//! that renders as a JSON response.

use crate::request::Violations;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;
use tracing::error;

/// Failure to build a request context. Always a wiring problem in the
/// middleware chain, never the client's fault.
#[derive(Error, Debug)]
pub enum ContextError {
    #[error("request id not present in the request extensions, middleware not configured")]
    MissingRequestId,

    #[error("unable to read request id {0:?} as a UUID")]
    InvalidRequestId(String),
}

/// Failure to turn a request body into a value.
#[derive(Error, Debug)]
pub enum BodyError {
    #[error("failed to read request body: {0}")]
    Read(#[source] axum::Error),

    #[error("malformed JSON body: {0}")]
    Decode(#[source] serde_json::Error),

    #[error("request body already consumed")]
    AlreadyConsumed,

    #[error("validation failed: {0}")]
    Validation(Violations),
}

/// Application-wide error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Validation error: {0}")]
    Validation(Violations),

    #[error("Request context error: {0}")]
    Context(#[from] ContextError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<BodyError> for AppError {
    fn from(err: BodyError) -> Self {
        match err {
            BodyError::Validation(violations) => AppError::Validation(violations),
            BodyError::AlreadyConsumed => AppError::Internal(err.to_string()),
            BodyError::Read(_) | BodyError::Decode(_) => AppError::BadRequest(err.to_string()),
        }
    }
}

/// Error response structure
#[derive(Serialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub violations: Option<Violations>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_code, message, details, violations) = match self {
            AppError::Unauthorized(msg) => {
                (StatusCode::UNAUTHORIZED, "UNAUTHORIZED", msg, None, None)
            }
            AppError::Forbidden(msg) => (StatusCode::FORBIDDEN, "FORBIDDEN", msg, None, None),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg, None, None),
            AppError::Validation(violations) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "VALIDATION_ERROR",
                "Request body failed validation".to_string(),
                None,
                Some(violations),
            ),
            AppError::Context(e) => {
                error!("Request context error: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "CONTEXT_ERROR",
                    "An internal error occurred".to_string(),
                    Some(e.to_string()),
                    None,
                )
            }
            AppError::Internal(msg) => {
                error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An internal error occurred".to_string(),
                    Some(msg),
                    None,
                )
            }
        };

        let body = Json(ErrorResponse {
            success: false,
            message,
            error: details,
            code: Some(error_code.to_string()),
            violations,
        });

        (status, body).into_response()
    }
}

/// Result type alias for API handlers
pub type ApiResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_body_errors_map_to_distinct_statuses() {
        let decode = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let response = AppError::from(BodyError::Decode(decode)).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = AppError::from(BodyError::AlreadyConsumed).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_context_error_is_internal() {
        let response = AppError::from(ContextError::MissingRequestId).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
