//! WebSocket error types

use thiserror::Error;

use crate::core::realtime::RealtimeError;

/// WebSocket handler error types
#[derive(Debug, Error)]
pub enum WebSocketError {
    /// Frame could not be parsed into a known event
    #[error("Invalid message format: {0}")]
    InvalidMessage(String),

    /// Binary audio arrived with no conversation running
    #[error("No active conversation")]
    NoActiveStream,

    /// Forwarding audio to the realtime stream failed
    #[error("Failed to forward audio: {0}")]
    AudioForward(#[from] RealtimeError),
}

/// Result type for WebSocket operations
pub type WebSocketResult<T> = Result<T, WebSocketError>;
