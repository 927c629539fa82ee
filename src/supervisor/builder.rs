//! This module provides the `SupervisorBuilder` for constructing a `Supervisor`.

use std::sync::Arc;

use crate::{
    audit::AuditInvoker, config::AppConfig, events::EventBus, persistence::traits::AppRepository,
    probe::Prober, scheduler::Scheduler,
};

use super::{Supervisor, SupervisorError};

/// A builder for creating a `Supervisor` instance.
#[derive(Default)]
pub struct SupervisorBuilder {
    config: Option<AppConfig>,
    repo: Option<Arc<dyn AppRepository>>,
    prober: Option<Arc<dyn Prober>>,
    invoker: Option<Arc<dyn AuditInvoker>>,
}

impl SupervisorBuilder {
    /// Creates a new, empty `SupervisorBuilder`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the application configuration for the `Supervisor`.
    pub fn config(mut self, config: AppConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Sets the repository (database connection) for the `Supervisor`.
    pub fn repository(mut self, repo: Arc<dyn AppRepository>) -> Self {
        self.repo = Some(repo);
        self
    }

    /// Sets the probe implementation for the `Supervisor`.
    pub fn prober(mut self, prober: Arc<dyn Prober>) -> Self {
        self.prober = Some(prober);
        self
    }

    /// Sets the audit invoker for the `Supervisor`.
    pub fn invoker(mut self, invoker: Arc<dyn AuditInvoker>) -> Self {
        self.invoker = Some(invoker);
        self
    }

    /// Assembles and validates the components to build a `Supervisor`.
    ///
    /// Constructs the event bus and scheduler, loads all monitors from the
    /// repository, and registers the enabled ones. Timers started here wait a
    /// full interval before the first probe, so a crash-loop cannot hammer
    /// the monitored targets.
    pub async fn build(self) -> Result<Supervisor, SupervisorError> {
        let config = self.config.ok_or(SupervisorError::MissingConfig)?;
        let repo = self.repo.ok_or(SupervisorError::MissingRepository)?;
        let prober = self.prober.ok_or(SupervisorError::MissingProber)?;
        let invoker = self.invoker.ok_or(SupervisorError::MissingInvoker)?;

        let bus = EventBus::new(config.event_bus_capacity);
        let scheduler =
            Arc::new(Scheduler::new(Arc::clone(&repo), prober, invoker, bus));

        tracing::debug!("Loading monitors from database...");
        let monitors = repo.get_monitors().await?;
        let enabled = monitors.iter().filter(|m| m.enabled).count();
        tracing::info!(count = monitors.len(), enabled, "Loaded monitors from database.");

        for monitor in monitors.iter().filter(|m| m.enabled) {
            scheduler.register(monitor, false);
        }

        Ok(Supervisor::new(config, repo, scheduler))
    }
}
