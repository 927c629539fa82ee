//! Lifecycle events published on the in-process event bus.
//!
//! Events are ephemeral: they are never persisted and there is no replay for
//! late subscribers. The serialized form is the wire shape forwarded verbatim
//! to WebSocket clients: `{"event": "...", "monitor_id": ..., "error"?: ...}`.

use serde::{Deserialize, Serialize};

/// A lifecycle event concerning one monitor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum MonitorEvent {
    /// A new monitor was registered.
    MonitorCreated {
        /// Id of the monitor that was created.
        monitor_id: i64,
    },
    /// A probe finished and its `CheckResult` was recorded.
    CheckFinished {
        /// Id of the monitor that was probed.
        monitor_id: i64,
    },
    /// An audit completed successfully and the report was stored.
    AuditFinished {
        /// Id of the audited monitor.
        monitor_id: i64,
    },
    /// An audit terminated in failure. No partial results were stored.
    AuditFailed {
        /// Id of the audited monitor.
        monitor_id: i64,
        /// Human-readable failure description.
        error: String,
    },
}

impl MonitorEvent {
    /// The id of the monitor this event concerns.
    pub fn monitor_id(&self) -> i64 {
        match self {
            MonitorEvent::MonitorCreated { monitor_id }
            | MonitorEvent::CheckFinished { monitor_id }
            | MonitorEvent::AuditFinished { monitor_id }
            | MonitorEvent::AuditFailed { monitor_id, .. } => *monitor_id,
        }
    }
}
