//! WebSocket subscriber lifecycle.
//!
//! On connect the client is registered and immediately sent the current
//! full snapshot, so late joiners are not starved until the next cycle.
//! The read loop then consumes interval-change requests; its termination
//! is the only thing that unregisters the connection.

use crate::state::AppState;
use axum::{
    extract::{
        State, WebSocketUpgrade,
        ws::{Message, WebSocket},
    },
    response::IntoResponse,
};
use coinwatch_data::interval;
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// Upgrade handler for `/ws`.
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Client → server message. Interval-change requests are the only inbound
/// message type.
#[derive(Debug, Deserialize)]
struct IntervalRequest {
    #[serde(default)]
    interval: String,
}

async fn handle_socket(socket: WebSocket, state: AppState) {
    let (mut sink, mut stream) = socket.split();

    let (tx, mut rx) = mpsc::unbounded_channel::<String>();
    let id = state.registry.register(tx.clone());

    // Join-time snapshot, ahead of any broadcast frame.
    match serde_json::to_string(&state.store.snapshot()) {
        Ok(frame) => {
            let _ = tx.send(frame);
        }
        Err(error) => warn!(%error, "failed to serialise join-time snapshot"),
    }

    let forward = tokio::spawn(async move {
        while let Some(frame) = rx.recv().await {
            if sink.send(Message::Text(frame)).await.is_err() {
                break;
            }
        }
    });

    while let Some(message) = stream.next().await {
        match message {
            Ok(Message::Text(text)) => {
                let Ok(request) = serde_json::from_str::<IntervalRequest>(&text) else {
                    debug!(%text, "ignoring unparseable client message");
                    continue;
                };
                if request.interval.is_empty() {
                    continue;
                }
                if !interval::is_supported(&request.interval) {
                    warn!(label = %request.interval, "ignoring unsupported interval request");
                    continue;
                }

                state.store.set_active_interval(&request.interval);
                debug!(label = %request.interval, "active interval switched");

                // Refresh out of band so the requester sees the new
                // interval's data without waiting for the next tick.
                let aggregator = Arc::clone(&state.aggregator);
                tokio::spawn(async move {
                    aggregator.refresh().await;
                });
            }
            Ok(Message::Close(_)) | Err(_) => break,
            Ok(_) => {}
        }
    }

    state.registry.unregister(id);
    forward.abort();
}
