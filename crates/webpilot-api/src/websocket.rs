//! Live event push over WebSocket.
//!
//! Every event published on the engine's bus is sent to each connected
//! client as a JSON text frame. Incoming frames are ignored apart from
//! close. A client that falls behind gets a `lagged` notice with the number
//! of events it missed.

use std::sync::Arc;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::IntoResponse,
};
use futures::{SinkExt, StreamExt};
use serde_json::json;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, info, warn};

use crate::state::AppState;

/// WebSocket upgrade handler.
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<Arc<AppState>>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: Arc<AppState>) {
    let mut events = state.engine.events().subscribe();
    let (mut sender, mut receiver) = socket.split();
    info!("WebSocket client connected");

    loop {
        tokio::select! {
            received = events.recv() => {
                let payload = match received {
                    Ok(event) => match serde_json::to_string(&event) {
                        Ok(json) => json,
                        Err(e) => {
                            warn!("Failed to encode event: {}", e);
                            continue;
                        }
                    },
                    Err(RecvError::Lagged(missed)) => {
                        warn!(missed, "WebSocket client lagging behind");
                        json!({ "type": "lagged", "missed": missed }).to_string()
                    }
                    Err(RecvError::Closed) => break,
                };
                if sender.send(Message::Text(payload.into())).await.is_err() {
                    break;
                }
            }
            incoming = receiver.next() => match incoming {
                Some(Ok(Message::Close(_))) | None => break,
                Some(Ok(_)) => debug!("Ignoring client frame"),
                Some(Err(e)) => {
                    warn!("WebSocket error: {}", e);
                    break;
                }
            },
        }
    }

    info!("WebSocket client disconnected");
}
