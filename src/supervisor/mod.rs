//! The Supervisor module manages the lifecycle of the engine.
//!
//! This module implements the **Supervisor Pattern**: a single top-level
//! owner for all long-running services of the application — the scheduler
//! with its probe timers, the periodic audit policy loop, and the HTTP
//! server.
//!
//! ## Responsibilities
//!
//! - **Initialization**: The `SupervisorBuilder` constructs and wires all
//!   services together, injecting the configuration, repository, prober, and
//!   audit invoker.
//! - **Lifecycle Management**: The `Supervisor` starts all services and
//!   manages their lifetimes.
//! - **Graceful Shutdown**: It listens for shutdown signals (like Ctrl+C or
//!   SIGTERM) and orchestrates a clean shutdown of all managed services.
//! - **Task Supervision**: It monitors the health of each service. If a
//!   critical service fails (panics or returns an error), the supervisor
//!   shuts down all other services so the application exits cleanly rather
//!   than continuing in a partially-functional state.

mod builder;

use std::sync::Arc;

use builder::SupervisorBuilder;
use thiserror::Error;
use tokio::signal;

use crate::{
    config::AppConfig,
    http_server::{self, ApiState},
    persistence::{error::PersistenceError, traits::AppRepository},
    scheduler::Scheduler,
};

/// Represents the set of errors that can occur during the supervisor's
/// operation.
#[derive(Debug, Error)]
pub enum SupervisorError {
    /// A required configuration was not provided to the `SupervisorBuilder`.
    #[error("Missing configuration for Supervisor")]
    MissingConfig,

    /// A repository was not provided to the `SupervisorBuilder`.
    #[error("Missing repository for Supervisor")]
    MissingRepository,

    /// A prober was not provided to the `SupervisorBuilder`.
    #[error("Missing prober for Supervisor")]
    MissingProber,

    /// An audit invoker was not provided to the `SupervisorBuilder`.
    #[error("Missing audit invoker for Supervisor")]
    MissingInvoker,

    /// An error occurred while trying to load monitors from the repository.
    #[error("Failed to load monitors from repository: {0}")]
    MonitorLoadError(#[from] PersistenceError),
}

/// The primary runtime manager for the application.
///
/// The Supervisor owns the scheduler and the repository and is responsible
/// for service startup, shutdown, and health monitoring. Once `run` is
/// called, it becomes the main process loop for the entire application.
pub struct Supervisor {
    /// Shared application configuration.
    config: Arc<AppConfig>,

    /// The persistent repository for monitors and probe history.
    repo: Arc<dyn AppRepository>,

    /// The scheduler core, owner of all probe timers and audit locks.
    scheduler: Arc<Scheduler>,

    /// A token used to signal a graceful shutdown to all supervised tasks.
    cancellation_token: tokio_util::sync::CancellationToken,

    /// A set of all spawned tasks that the supervisor is actively managing.
    join_set: tokio::task::JoinSet<()>,
}

impl Supervisor {
    /// Creates a new Supervisor instance with all its required components.
    ///
    /// This is typically called by the `SupervisorBuilder` after it has
    /// assembled all the necessary dependencies.
    pub fn new(config: AppConfig, repo: Arc<dyn AppRepository>, scheduler: Arc<Scheduler>) -> Self {
        Self {
            config: Arc::new(config),
            repo,
            scheduler,
            cancellation_token: tokio_util::sync::CancellationToken::new(),
            join_set: tokio::task::JoinSet::new(),
        }
    }

    /// Returns a new `SupervisorBuilder` instance.
    ///
    /// This is the public entry point for creating a supervisor.
    pub fn builder() -> SupervisorBuilder {
        SupervisorBuilder::new()
    }

    /// The scheduler owned by this supervisor.
    pub fn scheduler(&self) -> &Arc<Scheduler> {
        &self.scheduler
    }

    /// Starts the supervisor and all its managed services.
    ///
    /// This method is the main entry point for the application's runtime. It
    /// performs the following steps:
    /// 1. Spawns a signal handler to listen for `SIGINT` (Ctrl+C) and
    ///    `SIGTERM`.
    /// 2. Spawns the HTTP server (if enabled) and the periodic audit policy
    ///    loop as background tasks.
    /// 3. Enters the main `select!` loop, which concurrently listens for the
    ///    shutdown signal and monitors the health of all spawned tasks via
    ///    the `JoinSet`.
    /// 4. Upon shutdown, aborts all probe timers and performs graceful
    ///    cleanup of the database connection, bounded by `shutdown_timeout`.
    pub async fn run(mut self) -> Result<(), SupervisorError> {
        // Clone the token for the signal handler task.
        let cancellation_token = self.cancellation_token.clone();

        // Spawn a task to listen for shutdown signals.
        self.join_set.spawn(async move {
            let ctrl_c = signal::ctrl_c();
            #[cfg(unix)]
            let terminate = async {
                signal::unix::signal(signal::unix::SignalKind::terminate())
                    .expect("Failed to register SIGTERM handler")
                    .recv()
                    .await;
            };
            #[cfg(not(unix))]
            let terminate = std::future::pending::<()>();

            tokio::select! {
                _ = ctrl_c => tracing::info!("SIGINT (Ctrl+C) received, initiating graceful shutdown."),
                _ = terminate => tracing::info!("SIGTERM received, initiating graceful shutdown."),
            }

            // Notify all other tasks to begin shutting down.
            cancellation_token.cancel();
        });

        // Spawn the HTTP server as a background task, if enabled.
        if self.config.server.enabled {
            let state = ApiState {
                repo: Arc::clone(&self.repo),
                scheduler: Arc::clone(&self.scheduler),
                config: Arc::clone(&self.config),
            };
            let listen_address = self.config.server.listen_address.clone();
            let http_cancellation_token = self.cancellation_token.clone();
            let failure_token = self.cancellation_token.clone();
            self.join_set.spawn(async move {
                if let Err(e) =
                    http_server::run_server(&listen_address, state, http_cancellation_token).await
                {
                    tracing::error!(error = %e, "HTTP server failed. Initiating shutdown.");
                    failure_token.cancel();
                }
            });
        }

        // Spawn the periodic audit policy loop.
        let policy_scheduler = Arc::clone(&self.scheduler);
        let audit_interval = self.config.audit_interval;
        let policy_cancellation_token = self.cancellation_token.clone();
        self.join_set.spawn(async move {
            policy_scheduler.run_audit_policy(audit_interval, policy_cancellation_token).await;
        });

        // --- Main Supervisor Loop ---
        // This loop is only responsible for monitoring task health and
        // shutdown signals.

        loop {
            tokio::select! {
                maybe_result = self.join_set.join_next() => {
                    match maybe_result {
                        Some(Ok(_)) => {
                            // Task completed successfully, continue monitoring.
                        }
                        Some(Err(e)) => {
                            tracing::error!("A critical task failed: {:?}. Initiating shutdown.", e);
                            self.cancellation_token.cancel();
                        }
                        None => {
                            // All tasks have completed.
                            break;
                        }
                    }
                }
                _ = self.cancellation_token.cancelled() => {
                    // Cancellation requested externally, break the loop.
                    break;
                }
            }
        }

        // --- Graceful Shutdown ---

        // Ensure all spawned tasks are properly awaited before cleanup.
        self.join_set.shutdown().await;
        tracing::info!("All supervised tasks have completed.");

        // Perform final cleanup of resources, with a timeout.
        tracing::info!("Starting graceful resource cleanup...");
        let shutdown_timeout = self.config.shutdown_timeout;

        let cleanup_logic = async {
            // Stop the probe timers; in-flight probes and audits are
            // abandoned with the process.
            self.scheduler.shutdown();
            self.repo.close().await;
        };

        if tokio::time::timeout(shutdown_timeout, cleanup_logic).await.is_err() {
            tracing::warn!(
                "Cleanup did not complete within the timeout of {:?}. Continuing shutdown.",
                shutdown_timeout
            );
        } else {
            tracing::info!("Cleanup completed successfully.");
        }

        tracing::info!("Supervisor shutdown complete.");
        Ok(())
    }
}
