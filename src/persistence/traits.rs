//! The repository contract consumed by the scheduler and the API layer.

use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;

use crate::{
    models::{
        check_result::CheckResult,
        monitor::{AuditReport, Monitor, MonitorConfig, MonitorUpdate},
    },
    persistence::error::PersistenceError,
};

/// Read/write access to monitors and their probe history.
///
/// `CheckResult` rows are append-only; the audit columns on a monitor row are
/// overwritten wholesale by `update_audit_fields` (last-writer-wins, which is
/// safe because at most one audit is in flight per monitor).
#[cfg_attr(test, automock)]
#[async_trait]
pub trait AppRepository: Send + Sync {
    /// Inserts a new monitor and returns the stored row with its assigned id.
    async fn create_monitor(&self, config: MonitorConfig) -> Result<Monitor, PersistenceError>;

    /// Retrieves a single monitor by id.
    async fn get_monitor(&self, monitor_id: i64) -> Result<Option<Monitor>, PersistenceError>;

    /// Retrieves all monitors, ordered by id ascending.
    async fn get_monitors(&self) -> Result<Vec<Monitor>, PersistenceError>;

    /// Applies a partial configuration update and returns the updated row.
    async fn update_monitor(
        &self,
        monitor_id: i64,
        update: MonitorUpdate,
    ) -> Result<Monitor, PersistenceError>;

    /// Deletes a monitor and (via cascade) its probe history.
    async fn delete_monitor(&self, monitor_id: i64) -> Result<(), PersistenceError>;

    /// Appends one probe result to the monitor's history.
    async fn append_check_result(&self, result: &CheckResult) -> Result<(), PersistenceError>;

    /// Reads the most recent probe results for a monitor, newest first.
    async fn read_recent_checks(
        &self,
        monitor_id: i64,
        limit: u32,
    ) -> Result<Vec<CheckResult>, PersistenceError>;

    /// Overwrites the monitor's derived audit columns with a fresh report.
    async fn update_audit_fields(
        &self,
        monitor_id: i64,
        report: &AuditReport,
    ) -> Result<(), PersistenceError>;

    /// Releases the underlying storage resources during shutdown.
    async fn close(&self);
}
