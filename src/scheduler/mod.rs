//! The scheduler core: owns the timing and concurrency discipline for every
//! monitor.
//!
//! One timer task per monitor drives the periodic probes; each tick spawns
//! the probe work on its own task so a slow probe never delays the ticker or
//! any other monitor. Audits run on independent tasks guarded by a
//! per-monitor in-flight entry, which is the only mutual-exclusion point in
//! the engine: probes and audits for the same monitor may overlap freely.

mod error;

use std::{sync::Arc, time::Duration};

use chrono::Utc;
use dashmap::{DashMap, mapref::entry::Entry};
use tokio::{
    task::JoinHandle,
    time::{Instant, MissedTickBehavior, interval, interval_at},
};
use tokio_util::sync::CancellationToken;

pub use error::SchedulerError;

use crate::{
    audit::{AuditError, AuditInvoker},
    events::EventBus,
    models::{
        check_result::CheckResult,
        event::MonitorEvent,
        monitor::{AuditReport, AuditStrategy, Monitor},
    },
    persistence::{error::PersistenceError, traits::AppRepository},
    probe::Prober,
};

/// How often a failed audit-field write is retried before the attempt is
/// surfaced as a failed audit.
const STORE_RETRY_ATTEMPTS: u32 = 3;
/// Pause between audit-field write retries.
const STORE_RETRY_BACKOFF: Duration = Duration::from_millis(200);

/// Bookkeeping for one in-flight audit. The map entry itself is the
/// per-monitor lock; `discarded` is flipped under the entry's shard lock when
/// the monitor is deleted mid-audit, so deletion and completion cannot race.
struct AuditState {
    strategy: AuditStrategy,
    discarded: bool,
}

/// Owns per-monitor timers, dispatches probes, and serializes audit requests
/// per monitor.
pub struct Scheduler {
    repo: Arc<dyn AppRepository>,
    prober: Arc<dyn Prober>,
    invoker: Arc<dyn AuditInvoker>,
    bus: EventBus,

    /// Live timer handles, keyed by monitor id.
    timers: DashMap<i64, JoinHandle<()>>,
    /// Monitors with an audit currently in flight. An entry here is the
    /// per-monitor audit lock; it is held from acceptance until the audit's
    /// terminal event is recorded.
    audits_in_flight: DashMap<i64, AuditState>,
}

impl Scheduler {
    /// Creates a scheduler with no registered monitors.
    pub fn new(
        repo: Arc<dyn AppRepository>,
        prober: Arc<dyn Prober>,
        invoker: Arc<dyn AuditInvoker>,
        bus: EventBus,
    ) -> Self {
        Self {
            repo,
            prober,
            invoker,
            bus,
            timers: DashMap::new(),
            audits_in_flight: DashMap::new(),
        }
    }

    /// The event bus this scheduler publishes on.
    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    /// Starts (or replaces) the periodic probe timer for a monitor.
    ///
    /// With `initial_probe` the first probe fires immediately (monitor
    /// creation); without it the first tick comes after one full interval
    /// (config updates, startup re-registration). Disabled monitors get no
    /// timer; an existing one is stopped.
    pub fn register(self: &Arc<Self>, monitor: &Monitor, initial_probe: bool) {
        if !monitor.enabled {
            self.stop_timer(monitor.id);
            tracing::debug!(monitor_id = monitor.id, "Monitor disabled; no timer scheduled.");
            return;
        }

        let period = Duration::from_secs(u64::from(monitor.interval_seconds));
        let monitor_id = monitor.id;
        let url = monitor.url.clone();
        let scheduler = Arc::clone(self);

        let handle = tokio::spawn(async move {
            let mut ticker = if initial_probe {
                // The first tick of `interval` completes immediately.
                interval(period)
            } else {
                interval_at(Instant::now() + period, period)
            };
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                scheduler.dispatch_probe(monitor_id, url.clone());
            }
        });

        if let Some(previous) = self.timers.insert(monitor_id, handle) {
            previous.abort();
            tracing::debug!(monitor_id, "Replaced existing probe timer.");
        } else {
            tracing::info!(monitor_id, interval_seconds = monitor.interval_seconds, "Probe timer started.");
        }
    }

    /// Stops the monitor's timer and clears its bookkeeping.
    ///
    /// An audit already delegated to the engine is not aborted, but the
    /// monitor is marked so the audit's terminal event is discarded when it
    /// arrives.
    pub fn unregister(&self, monitor_id: i64) {
        self.stop_timer(monitor_id);
        if let Some(mut state) = self.audits_in_flight.get_mut(&monitor_id) {
            state.discarded = true;
            tracing::debug!(monitor_id, "In-flight audit will be discarded on completion.");
        }
        tracing::info!(monitor_id, "Monitor unregistered.");
    }

    /// Applies a configuration change: reschedules or stops the timer. The
    /// next probe fires one full interval from now.
    pub fn on_monitor_updated(self: &Arc<Self>, monitor: &Monitor) {
        self.register(monitor, false);
    }

    /// Accepts or rejects an audit request for a monitor.
    ///
    /// At most one audit may be in flight per monitor; a second request is
    /// rejected with [`SchedulerError::AuditAlreadyRunning`] so the caller
    /// can tell "already working" apart from "broken". On acceptance the
    /// audit runs on its own task, independent of all probe execution.
    pub async fn request_audit(
        self: &Arc<Self>,
        monitor_id: i64,
        strategy: AuditStrategy,
    ) -> Result<(), SchedulerError> {
        match self.audits_in_flight.entry(monitor_id) {
            Entry::Occupied(occupied) => {
                tracing::debug!(
                    monitor_id,
                    running = %occupied.get().strategy,
                    "Audit request rejected; one is already running."
                );
                return Err(SchedulerError::AuditAlreadyRunning(monitor_id));
            }
            Entry::Vacant(vacant) => {
                vacant.insert(AuditState { strategy, discarded: false });
            }
        }

        // Lock is held from here on; every exit path below must release it.
        let monitor = match self.repo.get_monitor(monitor_id).await {
            Ok(Some(monitor)) => monitor,
            Ok(None) => {
                self.audits_in_flight.remove(&monitor_id);
                return Err(SchedulerError::MonitorNotFound(monitor_id));
            }
            Err(e) => {
                self.audits_in_flight.remove(&monitor_id);
                return Err(e.into());
            }
        };

        tracing::info!(monitor_id, %strategy, url = %monitor.url, "Audit dispatched.");
        let scheduler = Arc::clone(self);
        tokio::spawn(async move {
            scheduler.run_audit(monitor_id, monitor.url, strategy).await;
        });
        Ok(())
    }

    /// Periodically requests an audit for every enabled monitor until
    /// cancelled. Rejections from still-running audits are expected and
    /// ignored.
    pub async fn run_audit_policy(self: Arc<Self>, period: Duration, cancel: CancellationToken) {
        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                _ = ticker.tick() => {}
                _ = cancel.cancelled() => {
                    tracing::info!("Audit policy loop shutting down.");
                    return;
                }
            }

            let monitors = match self.repo.get_monitors().await {
                Ok(monitors) => monitors,
                Err(e) => {
                    tracing::error!(error = %e, "Audit policy could not list monitors.");
                    continue;
                }
            };

            for monitor in monitors.into_iter().filter(|m| m.enabled) {
                match self.request_audit(monitor.id, monitor.strategy).await {
                    Ok(()) | Err(SchedulerError::AuditAlreadyRunning(_)) => {}
                    Err(e) => {
                        tracing::warn!(monitor_id = monitor.id, error = %e, "Scheduled audit could not be dispatched.");
                    }
                }
            }
        }
    }

    /// Aborts all timers. In-flight probe and audit tasks run to completion.
    pub fn shutdown(&self) {
        for entry in self.timers.iter() {
            entry.value().abort();
        }
        self.timers.clear();
        tracing::info!("All probe timers stopped.");
    }

    /// Number of monitors with a live timer.
    pub fn scheduled_count(&self) -> usize {
        self.timers.len()
    }

    /// Whether an audit is currently in flight for the monitor.
    pub fn audit_in_flight(&self, monitor_id: i64) -> bool {
        self.audits_in_flight.contains_key(&monitor_id)
    }

    fn stop_timer(&self, monitor_id: i64) {
        if let Some((_, handle)) = self.timers.remove(&monitor_id) {
            handle.abort();
        }
    }

    /// Spawns one probe execution. Returns immediately so the caller's ticker
    /// is never held up by a slow target.
    fn dispatch_probe(self: &Arc<Self>, monitor_id: i64, url: String) {
        let scheduler = Arc::clone(self);
        tokio::spawn(async move {
            let outcome = scheduler.prober.probe(&url).await;
            let result = CheckResult {
                monitor_id,
                checked_at: Utc::now(),
                status: outcome.status,
                response_ms: outcome.response_ms,
                status_code: outcome.status_code,
                error: outcome.error,
            };

            // A failed write must not stop the monitor's timer or suppress
            // the event; the dashboard re-fetches authoritative state.
            if let Err(e) = scheduler.repo.append_check_result(&result).await {
                tracing::error!(monitor_id, error = %e, "Failed to store check result.");
            }
            scheduler.bus.publish(MonitorEvent::CheckFinished { monitor_id });
        });
    }

    /// Runs one accepted audit to its terminal event. The in-flight entry is
    /// released only after the terminal event is decided, so a second request
    /// stays rejected through the whole store-retry window; the single
    /// `remove` at the end also consumes the discard flag a concurrent
    /// deletion may have set.
    async fn run_audit(&self, monitor_id: i64, url: String, strategy: AuditStrategy) {
        let outcome = self.invoker.run_audit(&url, strategy).await;

        let event = match outcome {
            Ok(_) if self.audit_discarded(monitor_id) => {
                tracing::debug!(monitor_id, "Monitor deleted mid-audit; skipping the report write.");
                None
            }
            Ok(report) => match self.store_report(monitor_id, &report).await {
                Ok(()) => {
                    tracing::info!(monitor_id, score = report.performance_score, "Audit finished.");
                    Some(MonitorEvent::AuditFinished { monitor_id })
                }
                Err(PersistenceError::NotFound(_)) => {
                    // Deleted concurrently; nothing to report to anyone.
                    tracing::debug!(monitor_id, "Monitor vanished before the report was stored.");
                    None
                }
                Err(e) => {
                    tracing::error!(monitor_id, error = %e, "Audit report could not be stored.");
                    Some(MonitorEvent::AuditFailed {
                        monitor_id,
                        error: format!("Failed to store audit report: {e}"),
                    })
                }
            },
            Err(e) => {
                tracing::warn!(monitor_id, error = %e, "Audit failed.");
                Some(MonitorEvent::AuditFailed { monitor_id, error: audit_error_label(&e) })
            }
        };

        let discarded = self
            .audits_in_flight
            .remove(&monitor_id)
            .is_some_and(|(_, state)| state.discarded);
        if discarded {
            tracing::debug!(monitor_id, "Monitor deleted mid-audit; terminal event discarded.");
            return;
        }
        if let Some(event) = event {
            self.bus.publish(event);
        }
    }

    fn audit_discarded(&self, monitor_id: i64) -> bool {
        self.audits_in_flight.get(&monitor_id).is_some_and(|state| state.discarded)
    }

    /// Writes the audit fields with a bounded number of retries. `NotFound`
    /// aborts immediately: the monitor is gone and retrying cannot help.
    async fn store_report(
        &self,
        monitor_id: i64,
        report: &AuditReport,
    ) -> Result<(), PersistenceError> {
        let mut last_error = None;
        for attempt in 1..=STORE_RETRY_ATTEMPTS {
            match self.repo.update_audit_fields(monitor_id, report).await {
                Ok(()) => return Ok(()),
                Err(e @ PersistenceError::NotFound(_)) => return Err(e),
                Err(e) => {
                    tracing::warn!(monitor_id, attempt, error = %e, "Audit-field write failed.");
                    last_error = Some(e);
                    if attempt < STORE_RETRY_ATTEMPTS {
                        tokio::time::sleep(STORE_RETRY_BACKOFF).await;
                    }
                }
            }
        }
        Err(last_error.unwrap_or_else(|| {
            PersistenceError::OperationFailed("audit-field write failed".to_string())
        }))
    }
}

/// Short stable label for an audit failure, used in the event payload.
fn audit_error_label(error: &AuditError) -> String {
    match error {
        AuditError::Timeout(_) => "Timeout".to_string(),
        AuditError::EngineUnavailable(_) => format!("EngineUnavailable: {error}"),
        AuditError::Blocked(_) => format!("Blocked: {error}"),
        AuditError::MalformedResponse(_) => format!("MalformedResponse: {error}"),
    }
}
