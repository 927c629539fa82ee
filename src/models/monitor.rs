//! This module defines the `Monitor` structure, which represents a single
//! monitored target, together with its audit-related value types.

use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// The audit profile to simulate when running a performance audit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum AuditStrategy {
    /// Simulates a mid-tier mobile device on a slow connection.
    #[default]
    Mobile,
    /// Simulates a desktop browser on a fast connection.
    Desktop,
}

impl fmt::Display for AuditStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuditStrategy::Mobile => write!(f, "mobile"),
            AuditStrategy::Desktop => write!(f, "desktop"),
        }
    }
}

impl FromStr for AuditStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "mobile" => Ok(AuditStrategy::Mobile),
            "desktop" => Ok(AuditStrategy::Desktop),
            other => Err(format!("Unknown audit strategy: {other}")),
        }
    }
}

/// One frame of the loading filmstrip captured during an audit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilmstripFrame {
    /// Base64-encoded screenshot data.
    pub image: String,
    /// Milliseconds since navigation start at which the frame was captured.
    pub timing_ms: u64,
}

/// A scored improvement suggestion returned by an audit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Opportunity {
    /// Short name of the suggestion (e.g. "Eliminate render-blocking resources").
    pub title: String,
    /// Longer explanation of what to change and why.
    pub description: String,
    /// Estimated load-time savings in milliseconds.
    pub impact_ms: f64,
}

/// The structured result of one successful performance audit.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AuditReport {
    /// Performance category score, 0-100.
    pub performance_score: f64,
    /// Accessibility category score, 0-100.
    pub accessibility_score: f64,
    /// Best-practices category score, 0-100.
    pub best_practices_score: f64,
    /// SEO category score, 0-100.
    pub seo_score: f64,
    /// First Contentful Paint in seconds.
    pub fcp_seconds: f64,
    /// Largest Contentful Paint in seconds.
    pub lcp_seconds: f64,
    /// Cumulative Layout Shift (unitless).
    pub cls: f64,
    /// Total Blocking Time in milliseconds.
    pub tbt_ms: f64,
    /// Base64 data URI of the final rendered page.
    pub screenshot: Option<String>,
    /// Ordered loading filmstrip, earliest frame first.
    pub filmstrip: Vec<FilmstripFrame>,
    /// Improvement opportunities, largest estimated savings first.
    pub opportunities: Vec<Opportunity>,
}

/// Represents a monitored target: its configuration plus the latest audit
/// results. Audit fields are overwritten wholesale on each successful audit.
///
/// Whether an audit is currently in flight for a monitor is runtime state
/// owned by the scheduler and is intentionally absent here.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Monitor {
    /// Unique identifier, assigned by the database at creation.
    #[sqlx(rename = "monitor_id")]
    pub id: i64,

    /// Human-readable name of the monitor.
    pub name: String,

    /// The URL that is probed and audited.
    pub url: String,

    /// Probe cadence in seconds.
    pub interval_seconds: u32,

    /// Default audit strategy for this monitor.
    pub strategy: AuditStrategy,

    /// Whether periodic probes are active.
    pub enabled: bool,

    /// Timestamp when the monitor was created.
    pub created_at: DateTime<Utc>,

    /// Performance score from the latest audit, 0-100.
    pub perf_score: Option<f64>,
    /// Accessibility score from the latest audit, 0-100.
    pub accessibility_score: Option<f64>,
    /// Best-practices score from the latest audit, 0-100.
    pub best_practices_score: Option<f64>,
    /// SEO score from the latest audit, 0-100.
    pub seo_score: Option<f64>,
    /// First Contentful Paint in seconds from the latest audit.
    pub fcp_seconds: Option<f64>,
    /// Largest Contentful Paint in seconds from the latest audit.
    pub lcp_seconds: Option<f64>,
    /// Cumulative Layout Shift from the latest audit.
    pub cls: Option<f64>,
    /// Total Blocking Time in milliseconds from the latest audit.
    pub tbt_ms: Option<f64>,
    /// Final screenshot from the latest audit, base64 data URI.
    pub screenshot: Option<String>,
    /// Loading filmstrip from the latest audit.
    #[sqlx(json(nullable))]
    pub filmstrip: Option<Vec<FilmstripFrame>>,
    /// Improvement opportunities from the latest audit.
    #[sqlx(json(nullable))]
    pub opportunities: Option<Vec<Opportunity>>,
    /// When the latest audit completed.
    pub audited_at: Option<DateTime<Utc>>,
}

/// The user-supplied configuration for creating a monitor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorConfig {
    /// Human-readable name.
    pub name: String,
    /// URL to probe and audit.
    pub url: String,
    /// Probe cadence in seconds.
    #[serde(default = "default_interval_seconds")]
    pub interval_seconds: u32,
    /// Default audit strategy.
    #[serde(default)]
    pub strategy: AuditStrategy,
}

/// Provides the default probe interval for serde deserialization.
fn default_interval_seconds() -> u32 {
    60
}

/// A partial update to a monitor's configuration. `None` fields are left
/// unchanged.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MonitorUpdate {
    /// New name, if any.
    pub name: Option<String>,
    /// New URL, if any.
    pub url: Option<String>,
    /// New probe cadence in seconds, if any.
    pub interval_seconds: Option<u32>,
    /// New default audit strategy, if any.
    pub strategy: Option<AuditStrategy>,
    /// Enable or disable periodic probes.
    pub enabled: Option<bool>,
}

impl Monitor {
    /// Creates an in-memory monitor from a configuration, without an id.
    /// The id is assigned by the repository at insertion.
    pub fn from_config(config: MonitorConfig) -> Self {
        Self {
            id: 0,
            name: config.name,
            url: config.url,
            interval_seconds: config.interval_seconds,
            strategy: config.strategy,
            enabled: true,
            created_at: Utc::now(),
            perf_score: None,
            accessibility_score: None,
            best_practices_score: None,
            seo_score: None,
            fcp_seconds: None,
            lcp_seconds: None,
            cls: None,
            tbt_ms: None,
            screenshot: None,
            filmstrip: None,
            opportunities: None,
            audited_at: None,
        }
    }
}
