//! Defines the custom `ApiError` type for the HTTP server.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Json},
};
use serde_json::json;

use crate::{persistence::error::PersistenceError, scheduler::SchedulerError};

/// A custom error type for the API that can be converted into an HTTP response.
pub enum ApiError {
    /// Represents a resource that could not be found.
    NotFound(String),

    /// Represents a validation error for an unprocessable entity.
    UnprocessableEntity(String),

    /// An audit request was rejected because one is already in flight for
    /// the monitor.
    AuditAlreadyRunning(i64),

    /// Represents a generic internal server error.
    InternalServerError(String),
}

/// Converts a `PersistenceError` into an `ApiError`.
///
/// This allows for the convenient use of the `?` operator in handlers
/// on functions that return `Result<_, PersistenceError>`.
impl From<PersistenceError> for ApiError {
    fn from(err: PersistenceError) -> Self {
        match err {
            PersistenceError::NotFound(what) => ApiError::NotFound(what),
            PersistenceError::InvalidInput(msg) => ApiError::UnprocessableEntity(msg),
            _ => ApiError::InternalServerError(err.to_string()),
        }
    }
}

impl From<SchedulerError> for ApiError {
    fn from(err: SchedulerError) -> Self {
        match err {
            SchedulerError::AuditAlreadyRunning(id) => ApiError::AuditAlreadyRunning(id),
            SchedulerError::MonitorNotFound(_) => ApiError::NotFound("Monitor not found".to_string()),
            SchedulerError::Persistence(e) => e.into(),
        }
    }
}

/// Implements the conversion from `ApiError` into an `axum` response.
///
/// This is the central point for mapping internal application errors to
/// user-facing HTTP responses.
impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let (status, body) = match self {
            ApiError::NotFound(message) => (StatusCode::NOT_FOUND, json!({ "error": message })),
            ApiError::UnprocessableEntity(message) =>
                (StatusCode::UNPROCESSABLE_ENTITY, json!({ "error": message })),
            ApiError::AuditAlreadyRunning(monitor_id) => (
                StatusCode::CONFLICT,
                json!({
                    "error": "audit_already_running",
                    "monitor_id": monitor_id,
                }),
            ),
            ApiError::InternalServerError(err) => {
                tracing::error!("Internal server error: {}", err);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({ "error": "An internal server error occurred" }),
                )
            }
        };

        (status, Json(body)).into_response()
    }
}
