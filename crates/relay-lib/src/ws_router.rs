// ============================
// crates/relay-lib/src/ws_router.rs
// ============================
//! WebSocket router and connection handling.
//!
//! Thin transport adapter: everything stateful happens inside the relay
//! actor. Each connection gets one forwarding task that drains the ordered
//! outbound queue into the socket and closes it when the terminal marker
//! arrives.
use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::IntoResponse,
    routing::get,
    Router,
};
use chat_relay_common::{ClientEvent, ConnectionId, ServerEvent};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tracing::debug;
use uuid::Uuid;

use crate::actor::RelayHandle;
use crate::registry::Outbound;

/// Create the WebSocket router
pub fn create_router(handle: RelayHandle) -> Router {
    Router::new()
        .route("/ws", get(ws_handler))
        .with_state(handle)
}

/// Handler for WebSocket connections
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(handle): State<RelayHandle>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_connection(socket, handle))
}

async fn handle_connection(socket: WebSocket, handle: RelayHandle) {
    let id: ConnectionId = Uuid::new_v4();
    let (mut ws_tx, mut ws_rx) = socket.split();

    // Ordered outbound queue for this connection
    let (tx, mut rx) = mpsc::unbounded_channel::<Outbound>();
    let alert_tx = tx.clone();

    if handle.connect(id, tx).is_err() {
        return;
    }
    debug!(%id, "websocket session opened");

    // Forward queued events to the socket; the Close marker ends the session
    // only after everything queued before it has been flushed.
    let send_task = tokio::spawn(async move {
        while let Some(outbound) = rx.recv().await {
            match outbound {
                Outbound::Event(event) => {
                    let json = match serde_json::to_string(&event) {
                        Ok(json) => json,
                        Err(err) => {
                            debug!(%id, error = %err, "failed to serialize event");
                            continue;
                        }
                    };
                    if ws_tx.send(Message::Text(json.into())).await.is_err() {
                        break;
                    }
                }
                Outbound::Close => {
                    let _ = ws_tx.send(Message::Close(None)).await;
                    break;
                }
            }
        }
    });

    // Main loop: parse and dispatch inbound events
    while let Some(Ok(message)) = ws_rx.next().await {
        match message {
            Message::Text(text) => match serde_json::from_str::<ClientEvent>(&text) {
                Ok(ClientEvent::JoinRoom { room_name }) => {
                    match handle.join_room(id, room_name).await {
                        Ok(ack) => debug!(%id, success = ack.success, "join handled"),
                        Err(_) => break,
                    }
                }
                Ok(event) => {
                    if handle.event(id, event).is_err() {
                        break;
                    }
                }
                Err(err) => {
                    // a malformed payload fails only this invocation
                    debug!(%id, error = %err, "malformed client event");
                    let _ = alert_tx.send(Outbound::Event(ServerEvent::ServerAlert {
                        message: format!("malformed event: {err}"),
                    }));
                }
            },
            Message::Close(_) => break,
            _ => {}
        }
    }

    let _ = handle.disconnect(id);
    debug!(%id, "websocket session ended");
    send_task.abort();
}
