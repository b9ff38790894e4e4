//! Axum WebSocket handler
//!
//! Upgrades `/ws`, assigns the connection an identifier, and runs the
//! receive loop until the client goes away.

use axum::{
    extract::{
        State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::Response,
};
use futures::{SinkExt, StreamExt};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::state::AppState;

use super::{
    conversation,
    error::WebSocketError,
    messages::{IncomingMessage, MessageRoute, OutgoingMessage},
    processor::{handle_audio_message, handle_incoming_message},
};

/// Outgoing frames buffered per connection
const CHANNEL_BUFFER_SIZE: usize = 256;

/// WebSocket conversation handler
pub async fn ws_conversation_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> Response {
    info!("WebSocket connection upgrade requested");
    ws.on_upgrade(move |socket| handle_conversation_socket(socket, state))
}

async fn handle_conversation_socket(socket: WebSocket, app_state: Arc<AppState>) {
    let conn_id = Uuid::new_v4().to_string();
    info!("Client connected: {}", conn_id);

    let (mut sender, mut receiver) = socket.split();
    let (message_tx, mut message_rx) = mpsc::channel::<MessageRoute>(CHANNEL_BUFFER_SIZE);

    let sender_task = tokio::spawn(async move {
        while let Some(route) = message_rx.recv().await {
            let result = match route {
                MessageRoute::Outgoing(message) => match serde_json::to_string(&message) {
                    Ok(json_str) => sender.send(Message::Text(json_str.into())).await,
                    Err(e) => {
                        error!("Failed to serialize outgoing message: {}", e);
                        continue;
                    }
                },
                MessageRoute::Binary(data) => sender.send(Message::Binary(data)).await,
            };

            if let Err(e) = result {
                error!("Failed to send WebSocket message: {}", e);
                break;
            }
        }
    });

    app_state.sessions.create(&conn_id);
    app_state.gateway.register(&conn_id, message_tx);
    app_state
        .gateway
        .emit(
            &conn_id,
            OutgoingMessage::Connected {
                id: conn_id.clone(),
            },
        )
        .await;

    while let Some(msg_result) = receiver.next().await {
        match msg_result {
            Ok(msg) => {
                if !process_message(msg, &conn_id, &app_state).await {
                    break;
                }
            }
            Err(e) => {
                warn!("WebSocket error for {}: {}", conn_id, e);
                break;
            }
        }
    }

    conversation::disconnect(&conn_id, &app_state);
    // The gateway held the last sender; the task drains what is queued and exits
    if let Err(e) = sender_task.await {
        debug!("Sender task for {} ended abnormally: {}", conn_id, e);
    }
    info!("WebSocket connection terminated: {}", conn_id);
}

/// Process one frame. Returns `false` when the connection should end.
async fn process_message(msg: Message, conn_id: &str, app_state: &Arc<AppState>) -> bool {
    match msg {
        Message::Text(text) => {
            debug!("Received text message: {} bytes", text.len());

            match IncomingMessage::parse(text.as_str()) {
                Ok(incoming) => handle_incoming_message(incoming, conn_id, app_state).await,
                Err(e) => {
                    warn!("Failed to parse incoming message from {}: {}", conn_id, e);
                    app_state
                        .gateway
                        .emit(conn_id, OutgoingMessage::error(e.to_string()))
                        .await;
                }
            }
            true
        }
        Message::Binary(data) => {
            match handle_audio_message(data, conn_id, app_state) {
                Ok(()) => {}
                Err(WebSocketError::NoActiveStream) => {
                    debug!("Dropping audio from {}: no active conversation", conn_id);
                }
                Err(e) => warn!("Audio from {} not forwarded: {}", conn_id, e),
            }
            true
        }
        Message::Ping(_) | Message::Pong(_) => true,
        Message::Close(_) => {
            info!("WebSocket connection closed by client: {}", conn_id);
            false
        }
    }
}
