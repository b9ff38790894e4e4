//! Conversation lifecycle for one connection
//!
//! connect → signal → startConversation → stream events → stop/disconnect

use std::sync::Arc;

use bytes::Bytes;
use serde_json::Value;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::core::realtime::{RealtimeEvent, SharedStream};
use crate::core::session::AttachOutcome;
use crate::state::AppState;

use super::messages::OutgoingMessage;

const START_FAILED: &str = "Failed to start conversation";
const STREAM_ERROR: &str = "Stream error";
const REPLY_FAILED: &str = "Failed to process your request";
const SIGNAL_FAILED: &str = "WebRTC connection failed";

/// Relay a signaling payload and emit the answer
pub async fn handle_signal(conn_id: &str, signal: Value, app_state: &Arc<AppState>) {
    info!("Signal received from {}", conn_id);

    match app_state.core_state.relay.answer(&signal).await {
        Ok(answer) => {
            app_state
                .gateway
                .emit(conn_id, OutgoingMessage::Signal(answer))
                .await;
        }
        Err(e) => {
            error!("Signal relay failed for {}: {}", conn_id, e);
            app_state
                .gateway
                .emit(conn_id, OutgoingMessage::error(SIGNAL_FAILED))
                .await;
        }
    }
}

/// Open a realtime stream for the connection and start consuming its events
pub async fn start_conversation(conn_id: &str, app_state: &Arc<AppState>) {
    info!("Starting conversation for {}", conn_id);

    let (playback_tx, playback_rx) = mpsc::unbounded_channel::<Bytes>();

    let session = match app_state
        .core_state
        .realtime
        .open(conn_id, playback_tx)
        .await
    {
        Ok(session) => session,
        Err(e) => {
            error!("Failed to open realtime stream for {}: {}", conn_id, e);
            app_state
                .gateway
                .emit(conn_id, OutgoingMessage::error(START_FAILED))
                .await;
            return;
        }
    };

    let handle = session.handle.clone();
    match app_state.sessions.attach_stream(conn_id, handle.clone()) {
        AttachOutcome::Attached => {}
        AttachOutcome::Replaced(previous) => {
            info!(
                "Replacing stream {} with {} for {}",
                previous.id(),
                handle.id(),
                conn_id
            );
            previous.close();
        }
        AttachOutcome::SessionMissing(orphan) => {
            // Client left while the stream was opening
            orphan.close();
            return;
        }
    }

    tokio::spawn(forward_playback(
        conn_id.to_string(),
        playback_rx,
        app_state.clone(),
    ));
    tokio::spawn(consume_events(
        conn_id.to_string(),
        handle.id().to_string(),
        session.events,
        app_state.clone(),
    ));

    app_state
        .gateway
        .emit(conn_id, OutgoingMessage::ConversationStarted)
        .await;
}

/// Close the connection's active stream, if any
pub async fn stop_conversation(conn_id: &str, app_state: &Arc<AppState>) {
    info!("Stopping conversation for {}", conn_id);

    if let Some(handle) = app_state.sessions.detach_stream(conn_id) {
        close_stream(conn_id, &handle);
    }

    app_state
        .gateway
        .emit(conn_id, OutgoingMessage::ConversationStopped)
        .await;
}

/// Tear down the session of a closed connection
pub fn disconnect(conn_id: &str, app_state: &AppState) {
    app_state.gateway.unregister(conn_id);

    if let Some(session) = app_state.sessions.remove(conn_id)
        && let Some(handle) = session.stream()
    {
        close_stream(conn_id, handle);
    }
    info!("Client disconnected: {}", conn_id);
}

fn close_stream(conn_id: &str, handle: &SharedStream) {
    if handle.close() {
        info!("Closed stream {} for {}", handle.id(), conn_id);
    }
}

/// Deliver audio sent on the stream's media leg to the client as binary frames
async fn forward_playback(
    conn_id: String,
    mut playback_rx: mpsc::UnboundedReceiver<Bytes>,
    app_state: Arc<AppState>,
) {
    while let Some(audio) = playback_rx.recv().await {
        if !app_state.gateway.send_binary(&conn_id, audio).await {
            break;
        }
    }
    debug!("Playback forwarding ended for {}", conn_id);
}

/// Process one stream's events in order until it closes
async fn consume_events(
    conn_id: String,
    stream_id: String,
    mut events: mpsc::Receiver<RealtimeEvent>,
    app_state: Arc<AppState>,
) {
    while let Some(event) = events.recv().await {
        match event {
            RealtimeEvent::Transcript(text) => {
                info!("Transcript for {}: {}", conn_id, text);
                tokio::spawn(run_reply(conn_id.clone(), text, app_state.clone()));
            }
            RealtimeEvent::Status(status) => {
                debug!("Stream status for {}: {}", conn_id, status);
                app_state
                    .gateway
                    .emit(&conn_id, OutgoingMessage::StreamStatus { status })
                    .await;
            }
            RealtimeEvent::Error(message) => {
                error!("Stream error for {}: {}", conn_id, message);
                app_state
                    .gateway
                    .emit(&conn_id, OutgoingMessage::error(STREAM_ERROR))
                    .await;
            }
            RealtimeEvent::Closed => {
                info!("Stream {} closed for {}", stream_id, conn_id);
                app_state
                    .gateway
                    .emit(&conn_id, OutgoingMessage::StreamClosed)
                    .await;
                app_state.sessions.detach_stream_if(&conn_id, &stream_id);
                break;
            }
        }
    }
}

/// Generate a reply for one transcript and deliver it
async fn run_reply(conn_id: String, transcript: String, app_state: Arc<AppState>) {
    let reply = match app_state.core_state.pipeline.respond(&transcript).await {
        Ok(Some(reply)) => reply,
        Ok(None) => return,
        Err(e) => {
            error!("Reply pipeline failed for {}: {}", conn_id, e);
            app_state
                .gateway
                .emit(&conn_id, OutgoingMessage::error(REPLY_FAILED))
                .await;
            return;
        }
    };

    // The stream may have been stopped while the reply was generated
    if let Some(stream) = app_state.sessions.active_stream(&conn_id)
        && let Err(e) = stream.send(reply.audio.clone())
    {
        warn!("Failed to send reply audio for {}: {}", conn_id, e);
    }

    app_state
        .gateway
        .emit(
            &conn_id,
            OutgoingMessage::transcript_response(reply.text, reply.duration_ms),
        )
        .await;
}
