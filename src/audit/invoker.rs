//! Invocation of the external audit engine and extraction of the structured
//! report from its response.

use std::time::Duration;

use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;
use reqwest_middleware::ClientWithMiddleware;
use serde_json::Value;
use url::Url;

use super::error::AuditError;
use crate::models::monitor::{AuditReport, AuditStrategy, FilmstripFrame, Opportunity};

/// Executes one performance audit for one URL.
///
/// The invoker never retries a failed audit; the transient-retry middleware
/// on the HTTP client is the only repetition that happens below this trait.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait AuditInvoker: Send + Sync {
    /// Runs one audit and returns the structured report, or a typed terminal
    /// failure. Bounded: resolves within the configured audit timeout.
    async fn run_audit(
        &self,
        url: &str,
        strategy: AuditStrategy,
    ) -> Result<AuditReport, AuditError>;
}

/// [`AuditInvoker`] implementation backed by the PageSpeed Insights v5 API.
pub struct PagespeedInvoker {
    client: ClientWithMiddleware,
    endpoint: Url,
    api_key: Option<String>,
    timeout: Duration,
}

impl PagespeedInvoker {
    /// Creates an invoker against `endpoint` with an overall per-audit bound
    /// of `timeout`.
    pub fn new(
        client: ClientWithMiddleware,
        endpoint: Url,
        api_key: Option<String>,
        timeout: Duration,
    ) -> Self {
        Self { client, endpoint, api_key, timeout }
    }

    async fn fetch_report(
        &self,
        url: &str,
        strategy: AuditStrategy,
    ) -> Result<AuditReport, AuditError> {
        let mut request_url = self.endpoint.clone();
        {
            let mut query = request_url.query_pairs_mut();
            query.append_pair("url", url);
            query.append_pair("strategy", &strategy.to_string());
            for category in ["performance", "accessibility", "best-practices", "seo"] {
                query.append_pair("category", category);
            }
            if let Some(key) = &self.api_key {
                query.append_pair("key", key);
            }
        }

        let response = self
            .client
            .get(request_url)
            .send()
            .await
            .map_err(|e| AuditError::EngineUnavailable(e.to_string()))?;

        let status = response.status();
        if status == reqwest::StatusCode::FORBIDDEN {
            let detail = response.text().await.unwrap_or_default();
            return Err(AuditError::Blocked(detail));
        }
        if !status.is_success() {
            return Err(AuditError::EngineUnavailable(format!("HTTP status {status}")));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| AuditError::MalformedResponse(e.to_string()))?;
        parse_report(&body)
    }
}

#[async_trait]
impl AuditInvoker for PagespeedInvoker {
    #[tracing::instrument(skip(self), level = "debug")]
    async fn run_audit(
        &self,
        url: &str,
        strategy: AuditStrategy,
    ) -> Result<AuditReport, AuditError> {
        match tokio::time::timeout(self.timeout, self.fetch_report(url, strategy)).await {
            Ok(result) => result,
            Err(_) => Err(AuditError::Timeout(self.timeout.as_secs())),
        }
    }
}

/// Extracts an [`AuditReport`] from a raw PageSpeed Insights response body.
fn parse_report(body: &Value) -> Result<AuditReport, AuditError> {
    let lighthouse = body
        .get("lighthouseResult")
        .ok_or_else(|| AuditError::MalformedResponse("missing lighthouseResult".to_string()))?;

    let categories = lighthouse
        .get("categories")
        .ok_or_else(|| AuditError::MalformedResponse("missing categories".to_string()))?;
    let audits = lighthouse.get("audits").unwrap_or(&Value::Null);

    Ok(AuditReport {
        performance_score: category_score(categories, "performance")?,
        accessibility_score: category_score(categories, "accessibility")?,
        best_practices_score: category_score(categories, "best-practices")?,
        seo_score: category_score(categories, "seo")?,
        fcp_seconds: numeric_value(audits, "first-contentful-paint") / 1000.0,
        lcp_seconds: numeric_value(audits, "largest-contentful-paint") / 1000.0,
        cls: numeric_value(audits, "cumulative-layout-shift"),
        tbt_ms: numeric_value(audits, "total-blocking-time"),
        screenshot: audits
            .pointer("/final-screenshot/details/data")
            .and_then(Value::as_str)
            .map(String::from),
        filmstrip: parse_filmstrip(audits),
        opportunities: parse_opportunities(audits),
    })
}

/// Reads one category score and scales it to 0-100.
fn category_score(categories: &Value, name: &str) -> Result<f64, AuditError> {
    categories
        .pointer(&format!("/{name}/score"))
        .and_then(Value::as_f64)
        .map(|s| s * 100.0)
        .ok_or_else(|| AuditError::MalformedResponse(format!("missing {name} score")))
}

/// Reads the numeric value of one audit entry, defaulting to zero when the
/// engine omitted the metric.
fn numeric_value(audits: &Value, name: &str) -> f64 {
    audits.pointer(&format!("/{name}/numericValue")).and_then(Value::as_f64).unwrap_or(0.0)
}

/// Extracts the loading filmstrip, earliest frame first.
fn parse_filmstrip(audits: &Value) -> Vec<FilmstripFrame> {
    audits
        .pointer("/screenshot-thumbnails/details/items")
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(|item| {
                    Some(FilmstripFrame {
                        image: item.get("data")?.as_str()?.to_string(),
                        timing_ms: item.get("timing")?.as_u64()?,
                    })
                })
                .collect()
        })
        .unwrap_or_default()
}

/// Collects failing opportunity audits, largest estimated savings first.
fn parse_opportunities(audits: &Value) -> Vec<Opportunity> {
    let Some(entries) = audits.as_object() else {
        return Vec::new();
    };

    let mut opportunities: Vec<Opportunity> = entries
        .values()
        .filter(|audit| {
            audit.pointer("/details/type").and_then(Value::as_str) == Some("opportunity")
                && audit.get("score").and_then(Value::as_f64).is_some_and(|s| s < 1.0)
        })
        .map(|audit| Opportunity {
            title: audit.get("title").and_then(Value::as_str).unwrap_or_default().to_string(),
            description: audit
                .get("description")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
            impact_ms: audit
                .pointer("/details/overallSavingsMs")
                .and_then(Value::as_f64)
                .unwrap_or(0.0),
        })
        .collect();

    opportunities.sort_by(|a, b| b.impact_ms.total_cmp(&a.impact_ms));
    opportunities
}
