//! Handlers for monitor-related endpoints in the HTTP server.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json},
};
use serde::Deserialize;
use serde_json::json;
use url::Url;

use super::{ApiError, ApiState};
use crate::models::{
    event::MonitorEvent,
    monitor::{AuditStrategy, MonitorConfig, MonitorUpdate},
};

const MAX_NAME_LENGTH: usize = 200;
const DEFAULT_CHECKS_LIMIT: u32 = 50;
const MAX_CHECKS_LIMIT: u32 = 500;

/// Retrieves all monitors from the database and returns them as a JSON
/// response.
pub async fn get_monitors(State(state): State<ApiState>) -> Result<impl IntoResponse, ApiError> {
    let monitors = state.repo.get_monitors().await?;
    Ok((StatusCode::OK, Json(json!({ "monitors": monitors }))))
}

/// Retrieves details of a specific monitor by its ID.
pub async fn get_monitor_details(
    State(state): State<ApiState>,
    Path(monitor_id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let monitor = state
        .repo
        .get_monitor(monitor_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Monitor not found".to_string()))?;

    Ok((StatusCode::OK, Json(json!({ "monitor": monitor }))))
}

/// Creates a new monitor based on the provided payload.
///
/// On success the monitor's probe timer starts with an immediate first probe,
/// a `monitor_created` event is published, and an initial audit is requested
/// best-effort.
pub async fn create_monitor(
    State(state): State<ApiState>,
    Json(payload): Json<MonitorConfig>,
) -> Result<impl IntoResponse, ApiError> {
    validate_name(&payload.name)?;
    validate_url(&payload.url)?;
    validate_interval(payload.interval_seconds, state.config.min_interval_secs)?;

    let strategy = payload.strategy;
    let monitor = state.repo.create_monitor(payload).await?;

    state.scheduler.register(&monitor, true);
    state.scheduler.bus().publish(MonitorEvent::MonitorCreated { monitor_id: monitor.id });

    // Fire the first audit eagerly; a rejection here is not the client's
    // problem.
    if let Err(e) = state.scheduler.request_audit(monitor.id, strategy).await {
        tracing::warn!(monitor_id = monitor.id, error = %e, "Initial audit could not be dispatched.");
    }

    Ok((StatusCode::CREATED, Json(json!({ "monitor": monitor }))))
}

/// Applies a partial update to a monitor and reschedules its probe timer.
pub async fn update_monitor(
    State(state): State<ApiState>,
    Path(monitor_id): Path<i64>,
    Json(payload): Json<MonitorUpdate>,
) -> Result<impl IntoResponse, ApiError> {
    if let Some(name) = &payload.name {
        validate_name(name)?;
    }
    if let Some(url) = &payload.url {
        validate_url(url)?;
    }
    if let Some(interval) = payload.interval_seconds {
        validate_interval(interval, state.config.min_interval_secs)?;
    }

    let monitor = state.repo.update_monitor(monitor_id, payload).await?;
    state.scheduler.on_monitor_updated(&monitor);

    Ok((StatusCode::OK, Json(json!({ "monitor": monitor }))))
}

/// Deletes a monitor by its ID and stops its probe timer.
pub async fn delete_monitor(
    State(state): State<ApiState>,
    Path(monitor_id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    state.repo.delete_monitor(monitor_id).await?;
    state.scheduler.unregister(monitor_id);

    Ok(StatusCode::NO_CONTENT)
}

/// Query parameters for an on-demand audit request.
#[derive(Debug, Deserialize)]
pub struct AuditQuery {
    /// Overrides the monitor's stored strategy for this run.
    pub strategy: Option<AuditStrategy>,
}

/// Requests an on-demand audit for a monitor.
///
/// Responds `202 Accepted` once the audit is dispatched; a second request
/// while one is in flight gets `409` with an `audit_already_running` body.
pub async fn request_audit(
    State(state): State<ApiState>,
    Path(monitor_id): Path<i64>,
    Query(query): Query<AuditQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let strategy = match query.strategy {
        Some(strategy) => strategy,
        None => {
            state
                .repo
                .get_monitor(monitor_id)
                .await?
                .ok_or_else(|| ApiError::NotFound("Monitor not found".to_string()))?
                .strategy
        }
    };

    state.scheduler.request_audit(monitor_id, strategy).await?;
    Ok((StatusCode::ACCEPTED, Json(json!({ "status": "audit_started" }))))
}

/// Query parameters for the check-history endpoint.
#[derive(Debug, Deserialize)]
pub struct ChecksQuery {
    /// Maximum number of results, clamped to `1..=500`.
    pub limit: Option<u32>,
}

/// Retrieves the most recent check results for a monitor, newest first.
pub async fn get_checks(
    State(state): State<ApiState>,
    Path(monitor_id): Path<i64>,
    Query(query): Query<ChecksQuery>,
) -> Result<impl IntoResponse, ApiError> {
    state
        .repo
        .get_monitor(monitor_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Monitor not found".to_string()))?;

    let limit = query.limit.unwrap_or(DEFAULT_CHECKS_LIMIT).clamp(1, MAX_CHECKS_LIMIT);
    let checks = state.repo.read_recent_checks(monitor_id, limit).await?;

    Ok((StatusCode::OK, Json(json!({ "checks": checks }))))
}

/// Retrieves a monitor together with its single most recent check result.
pub async fn get_latest(
    State(state): State<ApiState>,
    Path(monitor_id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let monitor = state
        .repo
        .get_monitor(monitor_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Monitor not found".to_string()))?;

    let latest_check = state.repo.read_recent_checks(monitor_id, 1).await?.into_iter().next();

    Ok((StatusCode::OK, Json(json!({ "monitor": monitor, "latest_check": latest_check }))))
}

fn validate_name(name: &str) -> Result<(), ApiError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(ApiError::UnprocessableEntity("Monitor name must not be empty".to_string()));
    }
    if trimmed.len() > MAX_NAME_LENGTH {
        return Err(ApiError::UnprocessableEntity(format!(
            "Monitor name must be at most {MAX_NAME_LENGTH} characters"
        )));
    }
    Ok(())
}

fn validate_url(url: &str) -> Result<(), ApiError> {
    let parsed = Url::parse(url)
        .map_err(|e| ApiError::UnprocessableEntity(format!("Invalid URL: {e}")))?;
    if parsed.scheme() != "http" && parsed.scheme() != "https" {
        return Err(ApiError::UnprocessableEntity(
            "Monitor URL must use the http or https scheme".to_string(),
        ));
    }
    Ok(())
}

fn validate_interval(interval_seconds: u32, floor: u32) -> Result<(), ApiError> {
    if interval_seconds < floor {
        return Err(ApiError::UnprocessableEntity(format!(
            "Probe interval must be at least {floor} seconds"
        )));
    }
    Ok(())
}
