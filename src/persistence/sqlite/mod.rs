//! SQLite-backed implementation of the [`AppRepository`] contract.

use std::str::FromStr;

use async_trait::async_trait;
use chrono::Utc;
use sqlx::{
    SqlitePool,
    sqlite::{SqliteConnectOptions, SqliteJournalMode},
};

use crate::{
    models::{
        check_result::CheckResult,
        monitor::{AuditReport, Monitor, MonitorConfig, MonitorUpdate},
    },
    persistence::{error::PersistenceError, traits::AppRepository},
};

/// A concrete implementation of [`AppRepository`] using SQLite.
pub struct SqliteRepository {
    /// The SQLite connection pool used for database operations.
    pool: SqlitePool,
}

impl SqliteRepository {
    /// Creates a new repository from a database URL, creating the database
    /// file if it does not exist.
    #[tracing::instrument(level = "info")]
    pub async fn new(database_url: &str) -> Result<Self, PersistenceError> {
        tracing::debug!(database_url, "Connecting to SQLite database.");
        let options = SqliteConnectOptions::from_str(database_url)
            .map_err(|e| PersistenceError::InvalidInput(e.to_string()))?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal);
        let pool = SqlitePool::connect_with(options).await.map_err(|e| {
            PersistenceError::OperationFailed(format!("Failed to connect to database: {e}"))
        })?;
        tracing::info!(database_url, "Connected to SQLite database.");
        Ok(Self { pool })
    }

    /// Runs database migrations.
    #[tracing::instrument(skip(self), level = "info")]
    pub async fn run_migrations(&self) -> Result<(), PersistenceError> {
        sqlx::migrate!("./migrations").run(&self.pool).await.map_err(|e| {
            tracing::error!(error = %e, "Failed to run database migrations.");
            PersistenceError::MigrationError(e.to_string())
        })?;
        tracing::info!("Database migrations completed successfully.");
        Ok(())
    }

    /// Gets access to the underlying connection pool for advanced operations.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

#[async_trait]
impl AppRepository for SqliteRepository {
    async fn create_monitor(&self, config: MonitorConfig) -> Result<Monitor, PersistenceError> {
        let monitor = Monitor::from_config(config);
        let result = sqlx::query(
            "INSERT INTO monitors (name, url, interval_seconds, strategy, enabled, created_at) \
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(&monitor.name)
        .bind(&monitor.url)
        .bind(monitor.interval_seconds)
        .bind(monitor.strategy)
        .bind(monitor.enabled)
        .bind(monitor.created_at)
        .execute(&self.pool)
        .await?;

        let id = result.last_insert_rowid();
        let stored = self.get_monitor(id).await?.ok_or_else(|| {
            PersistenceError::OperationFailed(format!(
                "Monitor {id} disappeared right after insertion"
            ))
        })?;
        tracing::debug!(monitor_id = stored.id, name = %stored.name, "Monitor row created.");
        Ok(stored)
    }

    async fn get_monitor(&self, monitor_id: i64) -> Result<Option<Monitor>, PersistenceError> {
        let monitor =
            sqlx::query_as::<_, Monitor>("SELECT * FROM monitors WHERE monitor_id = ?")
                .bind(monitor_id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(monitor)
    }

    async fn get_monitors(&self) -> Result<Vec<Monitor>, PersistenceError> {
        let monitors =
            sqlx::query_as::<_, Monitor>("SELECT * FROM monitors ORDER BY monitor_id ASC")
                .fetch_all(&self.pool)
                .await?;
        Ok(monitors)
    }

    async fn update_monitor(
        &self,
        monitor_id: i64,
        update: MonitorUpdate,
    ) -> Result<Monitor, PersistenceError> {
        let mut monitor = self.get_monitor(monitor_id).await?.ok_or_else(|| {
            PersistenceError::NotFound(format!("Monitor {monitor_id} does not exist"))
        })?;

        if let Some(name) = update.name {
            monitor.name = name;
        }
        if let Some(url) = update.url {
            monitor.url = url;
        }
        if let Some(interval) = update.interval_seconds {
            monitor.interval_seconds = interval;
        }
        if let Some(strategy) = update.strategy {
            monitor.strategy = strategy;
        }
        if let Some(enabled) = update.enabled {
            monitor.enabled = enabled;
        }

        sqlx::query(
            "UPDATE monitors SET name = ?, url = ?, interval_seconds = ?, strategy = ?, \
             enabled = ? WHERE monitor_id = ?",
        )
        .bind(&monitor.name)
        .bind(&monitor.url)
        .bind(monitor.interval_seconds)
        .bind(monitor.strategy)
        .bind(monitor.enabled)
        .bind(monitor_id)
        .execute(&self.pool)
        .await?;

        Ok(monitor)
    }

    async fn delete_monitor(&self, monitor_id: i64) -> Result<(), PersistenceError> {
        // Cascade does not apply without foreign_keys pragma, so clear the
        // history explicitly before removing the monitor row.
        sqlx::query("DELETE FROM check_results WHERE monitor_id = ?")
            .bind(monitor_id)
            .execute(&self.pool)
            .await?;
        let result = sqlx::query("DELETE FROM monitors WHERE monitor_id = ?")
            .bind(monitor_id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(PersistenceError::NotFound(format!(
                "Monitor {monitor_id} does not exist"
            )));
        }
        tracing::debug!(monitor_id, "Monitor row deleted.");
        Ok(())
    }

    async fn append_check_result(&self, result: &CheckResult) -> Result<(), PersistenceError> {
        sqlx::query(
            "INSERT INTO check_results (monitor_id, checked_at, status, response_ms, \
             status_code, error) VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(result.monitor_id)
        .bind(result.checked_at)
        .bind(result.status)
        .bind(result.response_ms)
        .bind(result.status_code)
        .bind(&result.error)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn read_recent_checks(
        &self,
        monitor_id: i64,
        limit: u32,
    ) -> Result<Vec<CheckResult>, PersistenceError> {
        let checks = sqlx::query_as::<_, CheckResult>(
            "SELECT monitor_id, checked_at, status, response_ms, status_code, error \
             FROM check_results WHERE monitor_id = ? ORDER BY checked_at DESC, id DESC LIMIT ?",
        )
        .bind(monitor_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(checks)
    }

    async fn update_audit_fields(
        &self,
        monitor_id: i64,
        report: &AuditReport,
    ) -> Result<(), PersistenceError> {
        let filmstrip = serde_json::to_string(&report.filmstrip)
            .map_err(|e| PersistenceError::SerializationError(e.to_string()))?;
        let opportunities = serde_json::to_string(&report.opportunities)
            .map_err(|e| PersistenceError::SerializationError(e.to_string()))?;

        let result = sqlx::query(
            "UPDATE monitors SET perf_score = ?, accessibility_score = ?, \
             best_practices_score = ?, seo_score = ?, fcp_seconds = ?, lcp_seconds = ?, \
             cls = ?, tbt_ms = ?, screenshot = ?, filmstrip = ?, opportunities = ?, \
             audited_at = ? WHERE monitor_id = ?",
        )
        .bind(report.performance_score)
        .bind(report.accessibility_score)
        .bind(report.best_practices_score)
        .bind(report.seo_score)
        .bind(report.fcp_seconds)
        .bind(report.lcp_seconds)
        .bind(report.cls)
        .bind(report.tbt_ms)
        .bind(&report.screenshot)
        .bind(filmstrip)
        .bind(opportunities)
        .bind(Utc::now())
        .bind(monitor_id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(PersistenceError::NotFound(format!(
                "Monitor {monitor_id} does not exist"
            )));
        }
        Ok(())
    }

    /// Closes the connection pool gracefully.
    async fn close(&self) {
        self.pool.close().await;
        tracing::info!("SQLite connection pool closed.");
    }
}
