//! HTTP server module: REST endpoints for monitor management plus the
//! WebSocket event stream.

mod error;
mod monitors;
mod status;
mod ws;

use std::{net::SocketAddr, sync::Arc};

use axum::{
    Router,
    routing::{get, post},
};
use thiserror::Error;
use tokio_util::sync::CancellationToken;

pub use error::ApiError;

use crate::{config::AppConfig, persistence::traits::AppRepository, scheduler::Scheduler};

/// Errors that can occur while starting or running the HTTP server.
#[derive(Debug, Error)]
pub enum ServerError {
    /// The configured listen address could not be parsed.
    #[error("Invalid listen address '{0}': {1}")]
    InvalidListenAddress(String, std::net::AddrParseError),

    /// The listener could not be bound or the server failed while serving.
    #[error("HTTP server I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Shared state available to every handler.
#[derive(Clone)]
pub struct ApiState {
    /// The application repository.
    pub repo: Arc<dyn AppRepository>,
    /// The scheduler core, for timer and audit control.
    pub scheduler: Arc<Scheduler>,
    /// The application configuration.
    pub config: Arc<AppConfig>,
}

/// Builds the application router with all routes attached.
pub fn create_router(state: ApiState) -> Router {
    Router::new()
        .route("/health", get(status::health))
        .route("/status", get(status::status))
        .route("/monitors", get(monitors::get_monitors).post(monitors::create_monitor))
        .route(
            "/monitors/{monitor_id}",
            get(monitors::get_monitor_details)
                .patch(monitors::update_monitor)
                .delete(monitors::delete_monitor),
        )
        .route("/monitors/{monitor_id}/audit", post(monitors::request_audit))
        .route("/monitors/{monitor_id}/checks", get(monitors::get_checks))
        .route("/monitors/{monitor_id}/latest", get(monitors::get_latest))
        .route("/ws", get(ws::ws_handler))
        .with_state(state)
}

/// Runs the HTTP server until the cancellation token fires.
pub async fn run_server(
    listen_address: &str,
    state: ApiState,
    cancel: CancellationToken,
) -> Result<(), ServerError> {
    let addr: SocketAddr = listen_address
        .parse()
        .map_err(|e| ServerError::InvalidListenAddress(listen_address.to_string(), e))?;

    let app = create_router(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "HTTP server listening.");

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(cancel.cancelled_owned())
        .await?;

    tracing::info!("HTTP server stopped.");
    Ok(())
}
