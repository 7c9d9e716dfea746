//! WebSocket live feed.
//!
//! Each connection gets its own [`EventBus`] subscription and receives every
//! [`MonitorEvent`](gasguard_events::MonitorEvent) as a JSON text frame.
//! Inbound frames other than close are ignored.

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use futures::{SinkExt, StreamExt};
use gasguard_events::EventBus;
use tokio::sync::broadcast::error::RecvError;

use crate::state::AppState;

/// GET /api/v1/ws -- upgrade to the live event feed.
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state.event_bus))
}

async fn handle_socket(socket: WebSocket, event_bus: Arc<EventBus>) {
    let conn_id = uuid::Uuid::new_v4().to_string();
    tracing::info!(conn_id = %conn_id, "WebSocket connected");

    let mut events = event_bus.subscribe();
    let (mut sink, mut stream) = socket.split();

    loop {
        tokio::select! {
            event = events.recv() => match event {
                Ok(event) => {
                    let text = match serde_json::to_string(&event) {
                        Ok(text) => text,
                        Err(e) => {
                            tracing::error!(conn_id = %conn_id, error = %e, "Failed to serialize event");
                            continue;
                        }
                    };
                    if sink.send(Message::Text(text.into())).await.is_err() {
                        tracing::debug!(conn_id = %conn_id, "WebSocket sink closed");
                        break;
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(conn_id = %conn_id, skipped, "WebSocket client lagging, events skipped");
                }
                Err(RecvError::Closed) => break,
            },
            inbound = stream.next() => match inbound {
                Some(Ok(Message::Close(_))) | None => break,
                Some(Ok(Message::Pong(_))) => {
                    tracing::trace!(conn_id = %conn_id, "Pong received");
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    tracing::debug!(conn_id = %conn_id, error = %e, "WebSocket receive error");
                    break;
                }
            },
        }
    }

    tracing::info!(conn_id = %conn_id, "WebSocket disconnected");
}
