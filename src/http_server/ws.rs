//! WebSocket endpoint that streams lifecycle events to dashboard clients.
//!
//! Each connection gets its own bus subscription, so a slow client only ever
//! loses its own events. Lagged gaps are skipped silently; clients are
//! expected to re-fetch authoritative state over the REST API.

use axum::{
    extract::{
        State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::IntoResponse,
};

use super::ApiState;

/// Upgrades the connection and starts forwarding bus events.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<ApiState>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(mut socket: WebSocket, state: ApiState) {
    let mut stream = state.scheduler.bus().subscribe();
    tracing::debug!("Event-stream client connected.");

    loop {
        tokio::select! {
            event = stream.recv() => {
                let Some(event) = event else {
                    // Bus closed; the engine is shutting down.
                    break;
                };
                let payload = match serde_json::to_string(&event) {
                    Ok(payload) => payload,
                    Err(e) => {
                        tracing::error!(error = %e, "Failed to serialize event.");
                        continue;
                    }
                };
                if socket.send(Message::Text(payload.into())).await.is_err() {
                    break;
                }
            }
            incoming = socket.recv() => {
                match incoming {
                    // Answer pings, ignore everything else the client sends.
                    Some(Ok(Message::Ping(data))) => {
                        if socket.send(Message::Pong(data)).await.is_err() {
                            break;
                        }
                    }
                    Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                    Some(Ok(_)) => {}
                }
            }
        }
    }

    tracing::debug!("Event-stream client disconnected.");
}
