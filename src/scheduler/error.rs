//! Error types for the scheduler core.

use thiserror::Error;

use crate::persistence::error::PersistenceError;

/// Errors surfaced by scheduler entry points.
#[derive(Debug, Error)]
pub enum SchedulerError {
    /// An audit is already in flight for this monitor. The request was
    /// rejected without queueing; nothing changed.
    #[error("An audit is already running for monitor {0}")]
    AuditAlreadyRunning(i64),

    /// The referenced monitor does not exist.
    #[error("Monitor {0} does not exist")]
    MonitorNotFound(i64),

    /// The repository failed while dispatching work.
    #[error("Persistence error: {0}")]
    Persistence(#[from] PersistenceError),
}
