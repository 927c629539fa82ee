//! Represents the `/health` and `/status` endpoint handlers.

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
};
use serde::Serialize;
use serde_json::json;

use super::ApiState;

/// Liveness probe. Always returns `200 OK` while the server is up.
pub async fn health() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

/// Represents the response from the `/status` endpoint.
#[derive(Debug, Serialize, Clone)]
pub struct StatusResponse {
    /// The version of the application.
    pub version: String,
    /// Number of monitors with an active probe timer.
    pub scheduled_monitors: usize,
    /// Number of live event-stream subscribers.
    pub event_subscribers: usize,
}

/// Retrieves application status and scheduling metrics.
pub async fn status(State(state): State<ApiState>) -> impl IntoResponse {
    let response = StatusResponse {
        version: env!("CARGO_PKG_VERSION").to_string(),
        scheduled_monitors: state.scheduler.scheduled_count(),
        event_subscribers: state.scheduler.bus().subscriber_count(),
    };
    (StatusCode::OK, Json(response))
}
