//! The probe runner: one lightweight uptime/latency measurement per call.
//!
//! A probe is infallible by contract: every failure mode resolves to a
//! [`ProbeOutcome`] variant, never an error that could take down the owning
//! task.

use std::time::{Duration, Instant};

use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;

use crate::models::check_result::CheckStatus;

/// The raw outcome of one probe, before the scheduler attaches the monitor id
/// and timestamp to form a `CheckResult`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeOutcome {
    /// Outcome classification.
    pub status: CheckStatus,
    /// Round-trip latency in milliseconds, present only for `Up`.
    pub response_ms: Option<u32>,
    /// HTTP status code, when a response was received at all.
    pub status_code: Option<u16>,
    /// Failure detail for down/error outcomes.
    pub error: Option<String>,
}

/// Executes a single uptime/latency check against one target URL.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait Prober: Send + Sync {
    /// Probes `url` once and classifies the outcome.
    async fn probe(&self, url: &str) -> ProbeOutcome;
}

/// HTTP implementation of [`Prober`] with a bounded per-probe timeout,
/// independent of any monitor's probe interval.
pub struct HttpProber {
    client: reqwest::Client,
}

impl HttpProber {
    /// Creates a prober whose requests are cut off after `timeout`.
    ///
    /// Redirects are not followed: a 3xx answer already proves the target is
    /// alive and is classified as up.
    pub fn new(timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self { client }
    }
}

#[async_trait]
impl Prober for HttpProber {
    async fn probe(&self, url: &str) -> ProbeOutcome {
        let start = Instant::now();
        match self.client.get(url).send().await {
            Ok(response) => {
                let elapsed_ms = start.elapsed().as_millis().min(u32::MAX as u128) as u32;
                let code = response.status();
                if code.is_success() || code.is_redirection() {
                    ProbeOutcome {
                        status: CheckStatus::Up,
                        response_ms: Some(elapsed_ms),
                        status_code: Some(code.as_u16()),
                        error: None,
                    }
                } else {
                    ProbeOutcome {
                        status: CheckStatus::Down,
                        response_ms: None,
                        status_code: Some(code.as_u16()),
                        error: Some(format!("HTTP status {code}")),
                    }
                }
            }
            Err(e) => {
                let detail = if e.is_timeout() {
                    "Probe timed out".to_string()
                } else if e.is_connect() {
                    format!("Connection error: {e}")
                } else {
                    e.to_string()
                };
                tracing::debug!(url, error = %detail, "Probe did not produce a response.");
                ProbeOutcome {
                    status: CheckStatus::Error,
                    response_ms: None,
                    status_code: None,
                    error: Some(detail),
                }
            }
        }
    }
}
