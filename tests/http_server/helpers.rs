use std::{net::SocketAddr, sync::Arc, time::Duration};

use async_trait::async_trait;
use reqwest::Client;
use tokio::task;
use tokio_util::sync::CancellationToken;
use webwatch::{
    audit::{AuditError, AuditInvoker},
    config::AppConfig,
    events::EventBus,
    http_server::{self, ApiState},
    models::{
        check_result::CheckStatus,
        monitor::{AuditReport, AuditStrategy},
    },
    persistence::{SqliteRepository, traits::AppRepository},
    probe::{ProbeOutcome, Prober},
    scheduler::Scheduler,
};

pub async fn create_test_repo() -> Arc<SqliteRepository> {
    let repo = SqliteRepository::new("sqlite::memory:")
        .await
        .expect("Failed to create in-memory repo");
    repo.run_migrations().await.expect("Failed to run migrations");
    Arc::new(repo)
}

/// A prober that always reports the target as up. Integration tests exercise
/// the HTTP surface, not real probing.
pub struct StaticProber;

#[async_trait]
impl Prober for StaticProber {
    async fn probe(&self, _url: &str) -> ProbeOutcome {
        ProbeOutcome {
            status: CheckStatus::Up,
            response_ms: Some(100),
            status_code: Some(200),
            error: None,
        }
    }
}

/// An invoker that resolves with a fixed report after an optional delay.
pub struct StubInvoker {
    pub delay: Duration,
    pub report: AuditReport,
}

impl StubInvoker {
    pub fn instant() -> Self {
        Self { delay: Duration::ZERO, report: AuditReport::default() }
    }

    /// An invoker that stays in flight for the whole test.
    pub fn hanging() -> Self {
        Self { delay: Duration::from_secs(600), report: AuditReport::default() }
    }
}

#[async_trait]
impl AuditInvoker for StubInvoker {
    async fn run_audit(
        &self,
        _url: &str,
        _strategy: AuditStrategy,
    ) -> Result<AuditReport, AuditError> {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        Ok(self.report.clone())
    }
}

pub struct TestServer {
    pub address: SocketAddr,
    pub server_handle: task::JoinHandle<()>,
    pub client: Client,
    pub scheduler: Arc<Scheduler>,
    cancel: CancellationToken,
}

impl TestServer {
    pub async fn new(repo: Arc<SqliteRepository>) -> Self {
        Self::with_invoker(repo, StubInvoker::instant()).await
    }

    pub async fn with_invoker(repo: Arc<SqliteRepository>, invoker: StubInvoker) -> Self {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.expect("Failed to bind");
        let addr = listener.local_addr().expect("Failed to get address");
        drop(listener); // Release port for the app to use

        let repo: Arc<dyn AppRepository> = repo;
        let scheduler = Arc::new(Scheduler::new(
            Arc::clone(&repo),
            Arc::new(StaticProber),
            Arc::new(invoker),
            EventBus::new(64),
        ));
        let state = ApiState {
            repo,
            scheduler: Arc::clone(&scheduler),
            config: Arc::new(AppConfig::default()),
        };

        let cancel = CancellationToken::new();
        let server_cancel = cancel.clone();
        let listen_address = addr.to_string();
        let server_handle = task::spawn(async move {
            http_server::run_server(&listen_address, state, server_cancel)
                .await
                .expect("Server failed");
        });

        // Wait for server to start
        tokio::time::sleep(Duration::from_millis(500)).await;

        Self { address: addr, server_handle, client: Client::new(), scheduler, cancel }
    }

    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.address, path)
    }

    pub async fn get(&self, path: &str) -> reqwest::Response {
        self.client.get(self.url(path)).send().await.expect("Request failed")
    }

    pub async fn post_json(&self, path: &str, body: serde_json::Value) -> reqwest::Response {
        self.client.post(self.url(path)).json(&body).send().await.expect("Request failed")
    }

    pub async fn post(&self, path: &str) -> reqwest::Response {
        self.client.post(self.url(path)).send().await.expect("Request failed")
    }

    pub async fn patch_json(&self, path: &str, body: serde_json::Value) -> reqwest::Response {
        self.client.patch(self.url(path)).json(&body).send().await.expect("Request failed")
    }

    pub async fn delete(&self, path: &str) -> reqwest::Response {
        self.client.delete(self.url(path)).send().await.expect("Request failed")
    }

    pub fn cleanup(&self) {
        self.scheduler.shutdown();
        self.cancel.cancel();
        self.server_handle.abort();
    }
}

pub fn monitor_payload(name: &str) -> serde_json::Value {
    serde_json::json!({
        "name": name,
        "url": "https://example.com",
        "interval_seconds": 60,
    })
}
