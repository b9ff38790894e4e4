//! Message processing for WebSocket connections
//!
//! Dispatches parsed client events to the conversation lifecycle and
//! forwards binary microphone frames to the active stream.

use bytes::Bytes;
use std::sync::Arc;
use tracing::debug;

use crate::state::AppState;

use super::{
    conversation,
    error::{WebSocketError, WebSocketResult},
    messages::IncomingMessage,
};

/// Handle one parsed client event
pub async fn handle_incoming_message(
    msg: IncomingMessage,
    conn_id: &str,
    app_state: &Arc<AppState>,
) {
    match msg {
        IncomingMessage::Signal(signal) => {
            conversation::handle_signal(conn_id, signal, app_state).await
        }
        IncomingMessage::StartConversation => {
            conversation::start_conversation(conn_id, app_state).await
        }
        IncomingMessage::StopConversation => {
            conversation::stop_conversation(conn_id, app_state).await
        }
    }
}

/// Forward microphone audio to the connection's active stream
pub fn handle_audio_message(
    data: Bytes,
    conn_id: &str,
    app_state: &AppState,
) -> WebSocketResult<()> {
    let stream = app_state
        .sessions
        .active_stream(conn_id)
        .ok_or(WebSocketError::NoActiveStream)?;

    debug!("Forwarding {} bytes of audio to stream {}", data.len(), stream.id());
    stream.push_input(data)?;
    Ok(())
}
