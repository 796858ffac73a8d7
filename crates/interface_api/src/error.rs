//! API error handling

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;
use tracing::error;

use domain_lifecycle::LifecycleError;

/// API error types
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Invalid transition: {0}")]
    InvalidTransition(String),

    #[error("Terminal state: {0}")]
    TerminalState(String),

    #[error("Validation error: {0}")]
    Validation(String, Vec<String>),

    #[error("Document error: {0}")]
    Document(String),

    #[error("Service unavailable: {0}")]
    Unavailable(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

/// Error response body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Vec<String>>,
}

impl ApiError {
    pub fn validation(message: impl Into<String>) -> Self {
        ApiError::Validation(message.into(), Vec::new())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_type, message, details) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", msg, None),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "bad_request", msg, None),
            ApiError::Unauthorized => (StatusCode::UNAUTHORIZED, "unauthorized", "Unauthorized".to_string(), None),
            ApiError::Forbidden(msg) => (StatusCode::FORBIDDEN, "forbidden", msg, None),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, "conflict", msg, None),
            ApiError::InvalidTransition(msg) => (StatusCode::CONFLICT, "invalid_transition", msg, None),
            ApiError::TerminalState(msg) => (StatusCode::CONFLICT, "terminal_state", msg, None),
            ApiError::Validation(msg, details) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "validation_error",
                msg,
                (!details.is_empty()).then_some(details),
            ),
            ApiError::Document(msg) => (StatusCode::BAD_GATEWAY, "document_error", msg, None),
            ApiError::Unavailable(msg) => (StatusCode::SERVICE_UNAVAILABLE, "service_unavailable", msg, None),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error", msg, None),
        };

        let body = ErrorResponse {
            error: error_type.to_string(),
            message,
            details,
        };

        (status, Json(body)).into_response()
    }
}

impl From<LifecycleError> for ApiError {
    fn from(err: LifecycleError) -> Self {
        match err {
            LifecycleError::NotFound { entity, id } => ApiError::NotFound(format!("{} {} not found", entity, id)),
            LifecycleError::Forbidden(msg) => ApiError::Forbidden(msg),
            LifecycleError::TerminalStateViolation(msg) => ApiError::TerminalState(msg),
            LifecycleError::InvalidTransition(msg) => ApiError::InvalidTransition(msg),
            LifecycleError::Validation(msg) => ApiError::validation(msg),
            LifecycleError::Conflict(msg) => ApiError::Conflict(msg),
            LifecycleError::Document(msg) => ApiError::Document(msg),
            LifecycleError::TransientStorage(source) => ApiError::Unavailable(source.to_string()),
            LifecycleError::IntegrityViolation(msg) => {
                error!(message = %msg, "Integrity violation surfaced to API");
                ApiError::Internal(msg)
            }
            LifecycleError::Storage(source) => {
                error!(error = %source, "Storage failure surfaced to API");
                ApiError::Internal("storage failure".to_string())
            }
        }
    }
}

impl From<validator::ValidationErrors> for ApiError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let details = errors
            .field_errors()
            .iter()
            .flat_map(|(field, errors)| {
                errors.iter().map(move |e| match &e.message {
                    Some(message) => format!("{}: {}", field, message),
                    None => format!("{}: {}", field, e.code),
                })
            })
            .collect();
        ApiError::Validation("request body failed validation".to_string(), details)
    }
}
