use std::{collections::HashSet, time::Duration};

use futures_util::{Stream, StreamExt};
use tokio_tungstenite::tungstenite::{Error as WsError, Message};

use crate::helpers::{TestServer, create_test_repo, monitor_payload};

/// Waits until the bus sees `expected` WebSocket subscribers. The upgrade
/// completes before the server task starts forwarding, so a fresh connection
/// is not subscribed the instant the handshake returns.
async fn wait_for_subscribers(server: &TestServer, expected: u64) {
    for _ in 0..40 {
        let status: serde_json::Value =
            server.get("/status").await.json().await.expect("Invalid JSON");
        if status["event_subscribers"].as_u64() == Some(expected) {
            return;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    panic!("event bus never reached {expected} subscriber(s)");
}

/// Reads text frames until `wanted` event kinds for the monitor have all been
/// seen, or panics after `deadline`.
async fn collect_events<S>(
    read: &mut S,
    monitor_id: i64,
    wanted: &[&str],
    deadline: Duration,
) -> Vec<serde_json::Value>
where
    S: Stream<Item = Result<Message, WsError>> + Unpin,
{
    let mut seen: HashSet<String> = HashSet::new();
    let mut frames = Vec::new();
    while !wanted.iter().all(|kind| seen.contains(*kind)) {
        let frame = tokio::time::timeout(deadline, read.next())
            .await
            .expect("timed out waiting for an event frame")
            .expect("socket closed before all events arrived")
            .expect("WebSocket read failed");
        let Message::Text(text) = frame else { continue };
        let payload: serde_json::Value =
            serde_json::from_str(&text).expect("event frame is not valid JSON");
        assert_eq!(payload["monitor_id"].as_i64(), Some(monitor_id));
        if let Some(kind) = payload["event"].as_str() {
            seen.insert(kind.to_string());
        }
        frames.push(payload);
    }
    frames
}

#[tokio::test]
async fn websocket_forwards_lifecycle_events_as_json() {
    let server = TestServer::new(create_test_repo().await).await;

    let ws_url = format!("ws://{}/ws", server.address);
    let (ws_stream, _response) =
        tokio_tungstenite::connect_async(ws_url).await.expect("WebSocket handshake failed");
    let (_write, mut read) = ws_stream.split();
    wait_for_subscribers(&server, 1).await;

    let response = server.post_json("/monitors", monitor_payload("ws-monitor")).await;
    assert_eq!(response.status(), 201);
    let body: serde_json::Value = response.json().await.expect("Invalid JSON");
    let monitor_id = body["monitor"]["id"].as_i64().expect("monitor id missing");

    // Creation publishes monitor_created, the immediate first probe a
    // check_finished, and the initial audit an audit_finished. Relative order
    // of the probe and audit tasks is not fixed.
    let frames = collect_events(
        &mut read,
        monitor_id,
        &["monitor_created", "check_finished", "audit_finished"],
        Duration::from_secs(10),
    )
    .await;

    for frame in &frames {
        assert!(frame["event"].is_string());
        assert!(frame.get("error").is_none(), "unexpected error field: {frame}");
    }

    server.cleanup();
}

#[tokio::test]
async fn websocket_subscriber_counts_and_late_joiners_get_no_replay() {
    let server = TestServer::new(create_test_repo().await).await;

    let response = server.post_json("/monitors", monitor_payload("early-monitor")).await;
    assert_eq!(response.status(), 201);
    let body: serde_json::Value = response.json().await.expect("Invalid JSON");
    let monitor_id = body["monitor"]["id"].as_i64().expect("monitor id missing");

    // Connect after creation: the monitor_created event must not be replayed.
    let ws_url = format!("ws://{}/ws", server.address);
    let (ws_stream, _response) =
        tokio_tungstenite::connect_async(ws_url).await.expect("WebSocket handshake failed");
    let (_write, mut read) = ws_stream.split();
    wait_for_subscribers(&server, 1).await;

    let response = server.post_json("/monitors", monitor_payload("late-monitor")).await;
    assert_eq!(response.status(), 201);
    let body: serde_json::Value = response.json().await.expect("Invalid JSON");
    let second_id = body["monitor"]["id"].as_i64().expect("monitor id missing");
    assert_ne!(second_id, monitor_id);

    // The first creation this subscriber sees is the one from after it
    // joined, never the one it missed.
    loop {
        let frame = tokio::time::timeout(Duration::from_secs(10), read.next())
            .await
            .expect("timed out waiting for an event frame")
            .expect("socket closed unexpectedly")
            .expect("WebSocket read failed");
        let Message::Text(text) = frame else { continue };
        let payload: serde_json::Value =
            serde_json::from_str(&text).expect("event frame is not valid JSON");
        if payload["event"].as_str() == Some("monitor_created") {
            assert_eq!(payload["monitor_id"].as_i64(), Some(second_id));
            break;
        }
    }

    server.cleanup();
}
