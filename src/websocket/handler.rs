use std::sync::Arc;

use axum::{
    extract::{
        ws::{Message, WebSocket},
        State, WebSocketUpgrade,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
};
use futures::{SinkExt, StreamExt};
use uuid::Uuid;

use crate::router::{ConnectionEvent, InboundEvent, RelayRequest};
use crate::server::AppState;
use crate::transport::{LocalTransport, Transport};

use super::message::{ClientMessage, ServerMessage};

/// WebSocket upgrade handler
#[tracing::instrument(name = "ws.upgrade", skip(ws, state))]
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    let local = match state.local_transport.clone() {
        Some(local) => local,
        None => {
            return (
                StatusCode::SERVICE_UNAVAILABLE,
                "WebSocket endpoint is disabled for this transport backend",
            )
                .into_response();
        }
    };

    ws.on_upgrade(move |socket| handle_socket(socket, state, local))
}

/// Handle an established WebSocket connection
#[tracing::instrument(name = "ws.connection", skip(socket, state, local))]
async fn handle_socket(socket: WebSocket, state: AppState, local: Arc<LocalTransport>) {
    let connection_id = Uuid::new_v4().to_string();
    let connection_start = std::time::Instant::now();
    let (mut ws_sender, mut ws_receiver) = socket.split();

    // Attach before registering so a broadcast never sees a registered id
    // without a socket behind it
    let mut rx = local.attach(&connection_id);

    let response = state
        .router
        .handle(InboundEvent::Connect(ConnectionEvent::new(&connection_id)))
        .await;
    if !response.is_ok() {
        local.detach(&connection_id);
        let detail = response.detail.unwrap_or_default();
        tracing::warn!(connection_id = %connection_id, error = %detail, "Connection rejected");
        if let Ok(payload) = ServerMessage::error("REGISTER_FAILED", detail).to_payload() {
            let _ = ws_sender.send(Message::Text(payload.to_string().into())).await;
        }
        let _ = ws_sender.close().await;
        return;
    }

    match ServerMessage::connected(&connection_id).to_payload() {
        Ok(payload) => {
            if ws_sender
                .send(Message::Text(payload.to_string().into()))
                .await
                .is_err()
            {
                tracing::debug!(connection_id = %connection_id, "Client left during handshake");
            }
        }
        Err(e) => tracing::error!(error = %e, "Failed to serialize message"),
    }

    tracing::info!(connection_id = %connection_id, "WebSocket connection established");

    // Task for forwarding outbound payloads to the socket
    let mut send_task = tokio::spawn(async move {
        while let Some(payload) = rx.recv().await {
            if ws_sender
                .send(Message::Text(payload.to_string().into()))
                .await
                .is_err()
            {
                break;
            }
        }
    });

    // Task for receiving frames from the socket
    let state_clone = state.clone();
    let local_clone = local.clone();
    let id_clone = connection_id.clone();
    let mut recv_task = tokio::spawn(async move {
        while let Some(result) = ws_receiver.next().await {
            match result {
                Ok(msg) => {
                    if !process_message(msg, &state_clone, &local_clone, &id_clone).await {
                        break;
                    }
                }
                Err(e) => {
                    tracing::warn!(error = %e, "WebSocket receive error");
                    break;
                }
            }
        }
    });

    tokio::select! {
        _ = &mut send_task => {
            tracing::debug!(connection_id = %connection_id, "Send task completed");
            recv_task.abort();
        }
        _ = &mut recv_task => {
            tracing::debug!(connection_id = %connection_id, "Receive task completed");
            send_task.abort();
        }
    }

    local.detach(&connection_id);
    let response = state
        .router
        .handle(InboundEvent::Disconnect(ConnectionEvent::new(&connection_id)))
        .await;
    if !response.is_ok() {
        // A broadcast will prune the record once the socket is seen gone
        tracing::warn!(
            connection_id = %connection_id,
            error = ?response.detail,
            "Failed to unregister closed connection"
        );
    }

    tracing::info!(
        connection_id = %connection_id,
        duration_secs = connection_start.elapsed().as_secs_f64(),
        "WebSocket connection closed"
    );
}

/// Process a received WebSocket frame.
/// Returns false if the connection should be closed
async fn process_message(
    msg: Message,
    state: &AppState,
    local: &LocalTransport,
    connection_id: &str,
) -> bool {
    match msg {
        Message::Text(text) => {
            let client_msg: ClientMessage = match serde_json::from_str(&text) {
                Ok(m) => m,
                Err(e) => {
                    tracing::warn!(error = %e, "Failed to parse client message");
                    let error = ServerMessage::error("INVALID_MESSAGE", e.to_string());
                    send_to(local, connection_id, error).await;
                    return true;
                }
            };

            handle_client_message(client_msg, state, local, connection_id).await;
            true
        }
        Message::Binary(_) => {
            send_to(
                local,
                connection_id,
                ServerMessage::error("UNSUPPORTED_FORMAT", "Binary messages are not supported"),
            )
            .await;
            true
        }
        // Axum answers pings itself
        Message::Ping(_) | Message::Pong(_) => true,
        Message::Close(_) => {
            tracing::debug!(connection_id = %connection_id, "Received close frame");
            false
        }
    }
}

/// Handle a parsed client frame
#[tracing::instrument(name = "ws.message", skip(state, local, msg), fields(message_type = ?msg))]
async fn handle_client_message(
    msg: ClientMessage,
    state: &AppState,
    local: &LocalTransport,
    connection_id: &str,
) {
    let event = match msg {
        ClientMessage::Ping => {
            send_to(local, connection_id, ServerMessage::Pong).await;
            return;
        }
        ClientMessage::Echo { message } => InboundEvent::DirectReply(RelayRequest {
            connection_id: Some(connection_id.to_string()),
            message,
        }),
        ClientMessage::Broadcast { message } => InboundEvent::BroadcastAll(RelayRequest {
            connection_id: Some(connection_id.to_string()),
            message,
        }),
    };

    let response = state.router.handle(event).await;
    if !response.is_ok() {
        let detail = response.detail.unwrap_or_default();
        send_to(local, connection_id, ServerMessage::error("RELAY_FAILED", detail)).await;
    }
}

/// Queue a server frame on this connection's outbound channel
async fn send_to(local: &LocalTransport, connection_id: &str, msg: ServerMessage) {
    let payload = match msg.to_payload() {
        Ok(p) => p,
        Err(e) => {
            tracing::error!(error = %e, "Failed to serialize message");
            return;
        }
    };

    if let Err(e) = local.post_to_connection(connection_id, payload).await {
        tracing::debug!(connection_id = %connection_id, error = %e, "Dropped server frame");
    }
}
