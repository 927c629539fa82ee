//! This module defines the `CheckResult` structure, the append-only record of
//! a single uptime/latency probe execution.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// The outcome classification of a single probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum CheckStatus {
    /// The target answered with a 2xx-3xx status within the probe timeout.
    Up,
    /// The target answered, but with a non-success status.
    Down,
    /// The probe itself failed: timeout, DNS failure, or connection error.
    Error,
}

impl fmt::Display for CheckStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CheckStatus::Up => write!(f, "up"),
            CheckStatus::Down => write!(f, "down"),
            CheckStatus::Error => write!(f, "error"),
        }
    }
}

/// One probe execution against one monitor. Immutable once written; rows for
/// a monitor ordered by `checked_at` ascending form the canonical history.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct CheckResult {
    /// The monitor this probe was executed for.
    pub monitor_id: i64,

    /// When the probe completed.
    pub checked_at: DateTime<Utc>,

    /// Outcome classification.
    pub status: CheckStatus,

    /// Round-trip latency in milliseconds. Only present when `status` is
    /// [`CheckStatus::Up`].
    pub response_ms: Option<u32>,

    /// HTTP status code of the response, when one was received.
    pub status_code: Option<u16>,

    /// Human-readable failure detail for down/error outcomes.
    pub error: Option<String>,
}

impl CheckResult {
    /// True when the probe observed a reachable, healthy target.
    pub fn is_up(&self) -> bool {
        self.status == CheckStatus::Up
    }
}
