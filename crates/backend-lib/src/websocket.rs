// ==================
// crates/backend-lib/src/websocket.rs
// ==================
//! WebSocket connection driver.
//!
//! One task per socket half: the send task drains the connection's hub
//! queue into the socket, the read loop feeds text frames to the gateway.
//! When the read loop ends for any reason the connection is disconnected
//! exactly once and the send task is stopped.

use crate::gateway::SessionGateway;
use axum::extract::ws::{Message, WebSocket};
use codecollab_common::ServerToClient;
use futures_util::{SinkExt, StreamExt};
use std::sync::Arc;
use tracing::{debug, error};

/// Drive one WebSocket until either side closes it
pub async fn serve_connection(socket: WebSocket, gateway: Arc<SessionGateway>) {
    let (mut tx, mut rx) = socket.split();
    let (connection, mut outbound) = gateway.connect();

    // Task 1: Forward queued events to the socket
    let send_task = tokio::spawn(async move {
        while let Some(event) = outbound.recv().await {
            let json = match serde_json::to_string(&event) {
                Ok(json) => json,
                Err(e) => {
                    error!(%connection, "Failed to serialize event: {e}");
                    continue;
                },
            };
            if tx.send(Message::Text(json.into())).await.is_err() {
                break;
            }
        }
    });

    // Main task: Process incoming frames
    while let Some(frame) = rx.next().await {
        match frame {
            Ok(Message::Text(text)) => {
                gateway.handle_text(connection, text.as_str());
            },
            Ok(Message::Binary(_)) => {
                gateway.hub().send(
                    &connection,
                    ServerToClient::MalformedMessage {
                        err_msg: "binary frames are not supported".to_string(),
                    },
                );
            },
            Ok(Message::Close(_)) => break,
            Ok(_) => {}, // ping/pong are answered by axum
            Err(e) => {
                debug!(%connection, "WebSocket read error: {e}");
                break;
            },
        }
    }

    // Cleanup
    gateway.disconnect(connection);
    send_task.abort();
}
