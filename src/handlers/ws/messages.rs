//! WebSocket message types
//!
//! Every JSON frame is an envelope `{"event": <name>, "data": <payload>}`.
//! Binary frames carry raw audio in both directions.

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::error::WebSocketError;

/// Raw envelope as received from the client
#[derive(Debug, Deserialize)]
struct Envelope {
    event: String,
    #[serde(default)]
    data: Value,
}

/// Incoming events from the client
#[derive(Debug, Clone, PartialEq)]
pub enum IncomingMessage {
    /// Opaque signaling payload (an SDP offer)
    Signal(Value),
    StartConversation,
    StopConversation,
}

impl IncomingMessage {
    /// Parse a text frame into an incoming event
    pub fn parse(text: &str) -> Result<Self, WebSocketError> {
        let envelope: Envelope = serde_json::from_str(text)
            .map_err(|e| WebSocketError::InvalidMessage(e.to_string()))?;

        match envelope.event.as_str() {
            "signal" => Ok(Self::Signal(envelope.data)),
            "startConversation" => Ok(Self::StartConversation),
            "stopConversation" => Ok(Self::StopConversation),
            other => Err(WebSocketError::InvalidMessage(format!(
                "unknown event '{other}'"
            ))),
        }
    }
}

/// Outgoing events to the client
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "event", content = "data", rename_all = "camelCase")]
pub enum OutgoingMessage {
    /// Sent once after the upgrade with the connection identifier
    Connected { id: String },
    /// Negotiated answer (`{type: "answer", sdp}`)
    Signal(Value),
    ConversationStarted,
    ConversationStopped,
    Error { message: String },
    StreamStatus { status: String },
    StreamClosed,
    AiResponse {
        #[serde(rename = "type")]
        response_type: String,
        text: String,
        /// Estimated speaking time in milliseconds
        duration: f64,
    },
}

impl OutgoingMessage {
    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
        }
    }

    pub fn transcript_response(text: impl Into<String>, duration_ms: f64) -> Self {
        Self::AiResponse {
            response_type: "transcript".to_string(),
            text: text.into(),
            duration: duration_ms,
        }
    }
}

/// Frames queued for the client's socket
#[derive(Debug)]
pub enum MessageRoute {
    Outgoing(OutgoingMessage),
    Binary(Bytes),
}
