use crate::helpers::*;

#[tokio::test]
async fn monitors_endpoint_returns_empty_list() {
    let repo = create_test_repo().await;
    let server = TestServer::new(repo).await;

    let resp = server.get("/monitors").await;

    assert_eq!(resp.status(), 200);
    let body: serde_json::Value = resp.json().await.expect("Failed to parse JSON");
    assert_eq!(body["monitors"], serde_json::Value::Array(vec![]));

    server.cleanup();
}

#[tokio::test]
async fn monitor_by_id_endpoint_returns_404_for_nonexistent_id() {
    let repo = create_test_repo().await;
    let server = TestServer::new(repo).await;

    let resp = server.get("/monitors/1234").await;

    assert_eq!(resp.status(), 404);
    let body: serde_json::Value = resp.json().await.expect("Failed to parse JSON");
    assert_eq!(body["error"], "Monitor not found");

    server.cleanup();
}

#[tokio::test]
async fn create_monitor_returns_row_and_starts_timer() {
    let repo = create_test_repo().await;
    let server = TestServer::new(repo).await;

    let resp = server.post_json("/monitors", monitor_payload("Test Monitor")).await;

    assert_eq!(resp.status(), 201);
    let body: serde_json::Value = resp.json().await.expect("Failed to parse JSON");
    assert_eq!(body["monitor"]["name"], "Test Monitor");
    assert_eq!(body["monitor"]["interval_seconds"], 60);
    assert_eq!(body["monitor"]["enabled"], true);
    let id = body["monitor"]["id"].as_i64().expect("id should be numeric");
    assert!(id > 0);
    assert_eq!(server.scheduler.scheduled_count(), 1);

    let resp = server.get(&format!("/monitors/{id}")).await;
    assert_eq!(resp.status(), 200);
    let body: serde_json::Value = resp.json().await.expect("Failed to parse JSON");
    assert_eq!(body["monitor"]["id"], id);

    server.cleanup();
}

#[tokio::test]
async fn create_monitor_rejects_invalid_payloads() {
    let repo = create_test_repo().await;
    let server = TestServer::new(repo).await;

    let resp = server
        .post_json(
            "/monitors",
            serde_json::json!({ "name": "  ", "url": "https://example.com" }),
        )
        .await;
    assert_eq!(resp.status(), 422);

    let resp = server
        .post_json("/monitors", serde_json::json!({ "name": "Bad URL", "url": "not a url" }))
        .await;
    assert_eq!(resp.status(), 422);

    let resp = server
        .post_json(
            "/monitors",
            serde_json::json!({ "name": "FTP", "url": "ftp://example.com" }),
        )
        .await;
    assert_eq!(resp.status(), 422);

    let resp = server
        .post_json(
            "/monitors",
            serde_json::json!({
                "name": "Too fast",
                "url": "https://example.com",
                "interval_seconds": 1,
            }),
        )
        .await;
    assert_eq!(resp.status(), 422);
    let body: serde_json::Value = resp.json().await.expect("Failed to parse JSON");
    assert_eq!(body["error"], "Probe interval must be at least 10 seconds");

    // Nothing was created.
    let resp = server.get("/monitors").await;
    let body: serde_json::Value = resp.json().await.expect("Failed to parse JSON");
    assert_eq!(body["monitors"].as_array().unwrap().len(), 0);
    assert_eq!(server.scheduler.scheduled_count(), 0);

    server.cleanup();
}

#[tokio::test]
async fn update_monitor_applies_partial_changes() {
    let repo = create_test_repo().await;
    let server = TestServer::new(repo).await;

    let resp = server.post_json("/monitors", monitor_payload("Original")).await;
    let body: serde_json::Value = resp.json().await.expect("Failed to parse JSON");
    let id = body["monitor"]["id"].as_i64().unwrap();

    let resp = server
        .patch_json(
            &format!("/monitors/{id}"),
            serde_json::json!({ "interval_seconds": 120 }),
        )
        .await;
    assert_eq!(resp.status(), 200);
    let body: serde_json::Value = resp.json().await.expect("Failed to parse JSON");
    assert_eq!(body["monitor"]["name"], "Original");
    assert_eq!(body["monitor"]["interval_seconds"], 120);

    // Disabling stops the probe timer.
    let resp = server
        .patch_json(&format!("/monitors/{id}"), serde_json::json!({ "enabled": false }))
        .await;
    assert_eq!(resp.status(), 200);
    assert_eq!(server.scheduler.scheduled_count(), 0);

    server.cleanup();
}

#[tokio::test]
async fn update_monitor_rejects_invalid_interval() {
    let repo = create_test_repo().await;
    let server = TestServer::new(repo).await;

    let resp = server.post_json("/monitors", monitor_payload("Strict")).await;
    let body: serde_json::Value = resp.json().await.expect("Failed to parse JSON");
    let id = body["monitor"]["id"].as_i64().unwrap();

    let resp = server
        .patch_json(&format!("/monitors/{id}"), serde_json::json!({ "interval_seconds": 2 }))
        .await;
    assert_eq!(resp.status(), 422);

    server.cleanup();
}

#[tokio::test]
async fn delete_monitor_removes_row_and_timer() {
    let repo = create_test_repo().await;
    let server = TestServer::new(repo).await;

    let resp = server.post_json("/monitors", monitor_payload("Doomed")).await;
    let body: serde_json::Value = resp.json().await.expect("Failed to parse JSON");
    let id = body["monitor"]["id"].as_i64().unwrap();

    let resp = server.delete(&format!("/monitors/{id}")).await;
    assert_eq!(resp.status(), 204);
    assert_eq!(server.scheduler.scheduled_count(), 0);

    let resp = server.get(&format!("/monitors/{id}")).await;
    assert_eq!(resp.status(), 404);

    let resp = server.delete(&format!("/monitors/{id}")).await;
    assert_eq!(resp.status(), 404);

    server.cleanup();
}
