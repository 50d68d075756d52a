//! WebSocket endpoint: one RPC channel per accepted socket

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        ConnectInfo, State,
    },
    response::Response,
    routing::get,
    Router,
};
use futures_util::{SinkExt, StreamExt};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tabsync_rpc::{drive, ChannelTransport, TransportEvent};
use tokio::sync::mpsc;

use crate::state::ServerState;

/// How often pending requests are checked for expiry
const EXPIRY_TICK: Duration = Duration::from_millis(500);

pub fn router(state: ServerState) -> Router {
    Router::new()
        .route("/", get(websocket_handler))
        .route("/ws", get(websocket_handler))
        .route("/health", get(health_check))
        .with_state(state)
}

async fn health_check() -> &'static str {
    "ok"
}

/// WebSocket upgrade handler
pub async fn websocket_handler(
    ws: WebSocketUpgrade,
    ConnectInfo(remote_addr): ConnectInfo<SocketAddr>,
    State(state): State<ServerState>,
) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state, remote_addr))
}

async fn handle_socket(socket: WebSocket, state: ServerState, remote_addr: SocketAddr) {
    let (mut sender, mut receiver) = socket.split();

    let (transport, mut outbound) = ChannelTransport::new();
    let (client_id, rpc) = state.open_channel(Arc::new(transport), Some(remote_addr));

    let send_task = tokio::spawn(async move {
        while let Some(frame) = outbound.recv().await {
            if sender.send(Message::Text(frame)).await.is_err() {
                break;
            }
        }
    });

    let (events_tx, events_rx) = mpsc::unbounded_channel();
    let recv_task = tokio::spawn(async move {
        while let Some(msg) = receiver.next().await {
            let event = match msg {
                Ok(msg) => match frame_event(msg) {
                    Some(event) => event,
                    None => continue,
                },
                Err(err) => TransportEvent::Error(err.to_string()),
            };
            let closed = event == TransportEvent::Closed;
            if events_tx.send(event).is_err() || closed {
                return;
            }
        }
        let _ = events_tx.send(TransportEvent::Closed);
    });

    if let Err(err) = drive(rpc, events_rx, EXPIRY_TICK).await {
        tracing::warn!(client_id, error = %err, "Dropping connection after protocol violation");
    }

    recv_task.abort();
    send_task.abort();
    state.close_channel(client_id);
}

/// Translate one inbound socket message. Ping and pong carry nothing.
fn frame_event(msg: Message) -> Option<TransportEvent> {
    match msg {
        Message::Text(text) => Some(TransportEvent::Message(text)),
        Message::Binary(data) => Some(match String::from_utf8(data) {
            Ok(text) => TransportEvent::Message(text),
            Err(err) => TransportEvent::Error(format!("binary frame is not UTF-8: {}", err)),
        }),
        Message::Close(_) => Some(TransportEvent::Closed),
        Message::Ping(_) | Message::Pong(_) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_event() {
        assert_eq!(
            frame_event(Message::Text("{}".to_string())),
            Some(TransportEvent::Message("{}".to_string()))
        );
        assert_eq!(
            frame_event(Message::Binary(b"{}".to_vec())),
            Some(TransportEvent::Message("{}".to_string()))
        );
        assert!(matches!(
            frame_event(Message::Binary(vec![0xff, 0xfe])),
            Some(TransportEvent::Error(_))
        ));
        assert_eq!(frame_event(Message::Close(None)), Some(TransportEvent::Closed));
        assert_eq!(frame_event(Message::Ping(Vec::new())), None);
    }
}
