use crate::helpers::*;

#[tokio::test]
async fn health_endpoint_returns_ok() {
    let repo = create_test_repo().await;
    let server = TestServer::new(repo).await;

    let resp = server.get("/health").await;

    assert_eq!(resp.status(), 200);
    let body: serde_json::Value = resp.json().await.expect("Failed to parse JSON");
    assert_eq!(body["status"], "ok");

    server.cleanup();
}

#[tokio::test]
async fn status_endpoint_reports_scheduled_monitors() {
    let repo = create_test_repo().await;
    let server = TestServer::new(repo).await;

    let resp = server.post_json("/monitors", monitor_payload("Status Monitor")).await;
    assert_eq!(resp.status(), 201);

    let resp = server.get("/status").await;
    assert_eq!(resp.status(), 200);
    let body: serde_json::Value = resp.json().await.expect("Failed to parse JSON");
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
    assert_eq!(body["scheduled_monitors"], 1);

    server.cleanup();
}
