//! Top-level application configuration.

use std::time::Duration;

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use url::Url;

use super::{HttpRetryConfig, ServerConfig, deserialize_duration_from_seconds};

/// Provides the default value for probe_timeout.
fn default_probe_timeout() -> Duration {
    Duration::from_secs(10)
}

/// Provides the default value for audit_timeout. Must comfortably exceed the
/// ~60s an audit engine run is expected to take.
fn default_audit_timeout() -> Duration {
    Duration::from_secs(120)
}

/// Provides the default value for audit_interval.
fn default_audit_interval() -> Duration {
    Duration::from_secs(3600)
}

/// Provides the default value for audit_endpoint.
fn default_audit_endpoint() -> Url {
    Url::parse("https://www.googleapis.com/pagespeedonline/v5/runPagespeed")
        .expect("default audit endpoint is a valid URL")
}

/// Loads the audit engine API key from the environment when not configured.
fn default_audit_api_key() -> Option<String> {
    std::env::var("WEBWATCH_PSI_API_KEY").ok()
}

/// Provides the default value for min_interval_secs.
fn default_min_interval_secs() -> u32 {
    10
}

/// Provides the default value for event_bus_capacity.
fn default_event_bus_capacity() -> usize {
    256
}

/// Provides the default value for shutdown_timeout.
fn default_shutdown_timeout() -> Duration {
    Duration::from_secs(30)
}

/// Application configuration for webwatch.
#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    /// Database URL for the SQLite database.
    pub database_url: String,

    /// API server configuration.
    #[serde(default)]
    pub server: ServerConfig,

    /// Hard upper bound on a single probe's duration, independent of the
    /// monitor's probe interval.
    #[serde(
        deserialize_with = "deserialize_duration_from_seconds",
        serialize_with = "serialize_duration_to_seconds",
        default = "default_probe_timeout"
    )]
    pub probe_timeout: Duration,

    /// Hard upper bound on a single audit's duration. Guarantees the
    /// per-monitor audit lock is always eventually released.
    #[serde(
        deserialize_with = "deserialize_duration_from_seconds",
        serialize_with = "serialize_duration_to_seconds",
        default = "default_audit_timeout"
    )]
    pub audit_timeout: Duration,

    /// How often the audit policy loop re-audits every enabled monitor.
    #[serde(
        deserialize_with = "deserialize_duration_from_seconds",
        serialize_with = "serialize_duration_to_seconds",
        default = "default_audit_interval"
    )]
    pub audit_interval: Duration,

    /// Endpoint of the external audit engine (PageSpeed Insights v5).
    #[serde(default = "default_audit_endpoint")]
    pub audit_endpoint: Url,

    /// Optional API key for the audit engine. Falls back to the
    /// `WEBWATCH_PSI_API_KEY` environment variable.
    #[serde(default = "default_audit_api_key")]
    pub audit_api_key: Option<String>,

    /// Minimum allowed probe interval, enforced at the API boundary.
    #[serde(default = "default_min_interval_secs")]
    pub min_interval_secs: u32,

    /// Capacity of the lifecycle event bus. Subscribers that lag further than
    /// this lose the oldest events.
    #[serde(default = "default_event_bus_capacity")]
    pub event_bus_capacity: usize,

    /// Retry policy for the audit engine HTTP client.
    #[serde(default)]
    pub http_retry: HttpRetryConfig,

    /// The maximum time to wait for graceful shutdown.
    #[serde(
        deserialize_with = "deserialize_duration_from_seconds",
        serialize_with = "serialize_duration_to_seconds",
        default = "default_shutdown_timeout"
    )]
    pub shutdown_timeout: Duration,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database_url: "sqlite::memory:".to_string(),
            server: ServerConfig::default(),
            probe_timeout: default_probe_timeout(),
            audit_timeout: default_audit_timeout(),
            audit_interval: default_audit_interval(),
            audit_endpoint: default_audit_endpoint(),
            audit_api_key: None,
            min_interval_secs: default_min_interval_secs(),
            event_bus_capacity: default_event_bus_capacity(),
            http_retry: HttpRetryConfig::default(),
            shutdown_timeout: default_shutdown_timeout(),
        }
    }
}

impl AppConfig {
    /// Creates a new `AppConfig` by reading from the configuration directory,
    /// with `WEBWATCH__`-prefixed environment variables taking precedence.
    pub fn new(config_dir: Option<&str>) -> Result<Self, ConfigError> {
        let config_dir = config_dir.unwrap_or("configs");
        let settings = Config::builder()
            .add_source(File::with_name(&format!("{config_dir}/app")).required(false))
            .add_source(Environment::with_prefix("WEBWATCH").separator("__"))
            .build()?;
        settings.try_deserialize()
    }

    /// Creates a new `AppConfigBuilder` for testing purposes.
    #[cfg(test)]
    pub fn builder() -> AppConfigBuilder {
        AppConfigBuilder::default()
    }
}

/// A builder for creating `AppConfig` instances for testing.
#[cfg(test)]
#[derive(Default)]
pub struct AppConfigBuilder {
    config: AppConfig,
}

#[cfg(test)]
impl AppConfigBuilder {
    pub fn database_url(mut self, url: &str) -> Self {
        self.config.database_url = url.to_string();
        self
    }

    pub fn probe_timeout(mut self, timeout: Duration) -> Self {
        self.config.probe_timeout = timeout;
        self
    }

    pub fn audit_timeout(mut self, timeout: Duration) -> Self {
        self.config.audit_timeout = timeout;
        self
    }

    pub fn audit_endpoint(mut self, endpoint: Url) -> Self {
        self.config.audit_endpoint = endpoint;
        self
    }

    pub fn event_bus_capacity(mut self, capacity: usize) -> Self {
        self.config.event_bus_capacity = capacity;
        self
    }

    pub fn build(self) -> AppConfig {
        self.config
    }
}
