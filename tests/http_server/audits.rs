use chrono::Utc;
use webwatch::{
    models::check_result::{CheckResult, CheckStatus},
    persistence::traits::AppRepository,
};

use crate::helpers::*;

#[tokio::test]
async fn audit_request_is_accepted_then_rejected_while_running() {
    let repo = create_test_repo().await;
    let server = TestServer::with_invoker(repo, StubInvoker::hanging()).await;

    let resp = server.post_json("/monitors", monitor_payload("Audited")).await;
    let body: serde_json::Value = resp.json().await.expect("Failed to parse JSON");
    let id = body["monitor"]["id"].as_i64().unwrap();

    // The initial best-effort audit from monitor creation is still hanging,
    // so an explicit request is rejected with a conflict.
    let resp = server.post(&format!("/monitors/{id}/audit")).await;
    assert_eq!(resp.status(), 409);
    let body: serde_json::Value = resp.json().await.expect("Failed to parse JSON");
    assert_eq!(body["error"], "audit_already_running");
    assert_eq!(body["monitor_id"], id);

    server.cleanup();
}

#[tokio::test]
async fn audit_request_accepts_a_strategy_override() {
    let repo = create_test_repo().await;
    let server = TestServer::new(repo.clone()).await;

    let monitor = repo
        .create_monitor(serde_json::from_value(monitor_payload("Manual")).unwrap())
        .await
        .unwrap();

    let resp = server.post(&format!("/monitors/{}/audit?strategy=desktop", monitor.id)).await;
    assert_eq!(resp.status(), 202);
    let body: serde_json::Value = resp.json().await.expect("Failed to parse JSON");
    assert_eq!(body["status"], "audit_started");

    server.cleanup();
}

#[tokio::test]
async fn audit_request_for_unknown_monitor_returns_404() {
    let repo = create_test_repo().await;
    let server = TestServer::new(repo).await;

    let resp = server.post("/monitors/404/audit").await;
    assert_eq!(resp.status(), 404);

    server.cleanup();
}

#[tokio::test]
async fn checks_endpoint_returns_newest_first_with_clamped_limit() {
    let repo = create_test_repo().await;
    let server = TestServer::new(repo.clone()).await;

    let monitor = repo
        .create_monitor(serde_json::from_value(monitor_payload("History")).unwrap())
        .await
        .unwrap();
    for code in [200u16, 503, 200] {
        repo.append_check_result(&CheckResult {
            monitor_id: monitor.id,
            checked_at: Utc::now(),
            status: if code == 200 { CheckStatus::Up } else { CheckStatus::Down },
            response_ms: (code == 200).then_some(80),
            status_code: Some(code),
            error: None,
        })
        .await
        .unwrap();
    }

    let resp = server.get(&format!("/monitors/{}/checks?limit=2", monitor.id)).await;
    assert_eq!(resp.status(), 200);
    let body: serde_json::Value = resp.json().await.expect("Failed to parse JSON");
    assert_eq!(body["checks"].as_array().unwrap().len(), 2);

    // An oversized limit is clamped, not refused.
    let resp = server.get(&format!("/monitors/{}/checks?limit=100000", monitor.id)).await;
    assert_eq!(resp.status(), 200);
    let body: serde_json::Value = resp.json().await.expect("Failed to parse JSON");
    assert_eq!(body["checks"].as_array().unwrap().len(), 3);

    let resp = server.get("/monitors/999/checks").await;
    assert_eq!(resp.status(), 404);

    server.cleanup();
}

#[tokio::test]
async fn latest_endpoint_returns_monitor_with_most_recent_check() {
    let repo = create_test_repo().await;
    let server = TestServer::new(repo.clone()).await;

    let monitor = repo
        .create_monitor(serde_json::from_value(monitor_payload("Latest")).unwrap())
        .await
        .unwrap();

    // No checks yet: the monitor comes back with a null latest check.
    let resp = server.get(&format!("/monitors/{}/latest", monitor.id)).await;
    assert_eq!(resp.status(), 200);
    let body: serde_json::Value = resp.json().await.expect("Failed to parse JSON");
    assert_eq!(body["monitor"]["id"], monitor.id);
    assert!(body["latest_check"].is_null());

    repo.append_check_result(&CheckResult {
        monitor_id: monitor.id,
        checked_at: Utc::now(),
        status: CheckStatus::Up,
        response_ms: Some(55),
        status_code: Some(200),
        error: None,
    })
    .await
    .unwrap();

    let resp = server.get(&format!("/monitors/{}/latest", monitor.id)).await;
    assert_eq!(resp.status(), 200);
    let body: serde_json::Value = resp.json().await.expect("Failed to parse JSON");
    assert_eq!(body["latest_check"]["status"], "up");
    assert_eq!(body["latest_check"]["response_ms"], 55);

    server.cleanup();
}
