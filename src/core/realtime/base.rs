use std::sync::Arc;

use bytes::Bytes;
use tokio::sync::mpsc;

use crate::config::ServerConfig;

/// Configuration for a realtime voice session
#[derive(Debug, Clone)]
pub struct RealtimeConfig {
    /// API key for the provider
    pub api_key: String,
    /// WebSocket endpoint (without the model query parameter)
    pub url: String,
    /// Realtime model name
    pub model: String,
    /// Voice used by the provider for its own audio output
    pub voice: String,
    /// Model used to transcribe the input audio buffer
    pub transcription_model: String,
    /// Whether server VAD should trigger provider-side responses
    pub create_responses: bool,
}

impl From<&ServerConfig> for RealtimeConfig {
    fn from(config: &ServerConfig) -> Self {
        Self {
            api_key: config.openai_api_key.clone(),
            url: config.realtime_url.clone(),
            model: config.realtime_model.clone(),
            voice: config.voice.clone(),
            transcription_model: config.transcription_model.clone(),
            create_responses: config.create_responses,
        }
    }
}

/// Typed event pushed by an open stream, delivered in provider order
#[derive(Debug, Clone, PartialEq)]
pub enum RealtimeEvent {
    /// A finished transcript of the user's speech
    Transcript(String),
    /// Provider status change (the provider event type, e.g. `session.created`)
    Status(String),
    /// Provider reported an error; the stream may still be open
    Error(String),
    /// The stream ended; always the last event
    Closed,
}

/// Error types for realtime stream operations
#[derive(Debug, Clone, thiserror::Error)]
pub enum RealtimeError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),
    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),
    #[error("Configuration error: {0}")]
    ConfigurationError(String),
    #[error("Provider error: {0}")]
    ProviderError(String),
    #[error("Stream is closed")]
    StreamClosed,
}

/// Receiver half of a session's media leg: synthesized audio sent on a
/// stream handle ends up here and is forwarded to the client.
pub type PlaybackSink = mpsc::UnboundedSender<Bytes>;

/// Handle to one open realtime stream
pub trait StreamHandle: Send + Sync {
    /// Unique identifier of this stream
    fn id(&self) -> &str;

    /// Append microphone audio (PCM16) to the provider's input buffer
    fn push_input(&self, audio: Bytes) -> Result<(), RealtimeError>;

    /// Deliver synthesized reply audio on the session's media leg
    fn send(&self, audio: Bytes) -> Result<(), RealtimeError>;

    /// Close the stream. Returns `true` only for the call that closed it.
    fn close(&self) -> bool;

    /// Whether the stream still accepts audio
    fn is_open(&self) -> bool;
}

pub type SharedStream = Arc<dyn StreamHandle>;

/// An opened stream together with its ordered event receiver
pub struct RealtimeSession {
    pub handle: SharedStream,
    pub events: mpsc::Receiver<RealtimeEvent>,
}

/// Opens realtime streams against a provider
#[async_trait::async_trait]
pub trait RealtimeConnector: Send + Sync {
    /// Open a new stream for the given session.
    ///
    /// `playback` receives any audio later passed to [`StreamHandle::send`].
    async fn open(
        &self,
        session_id: &str,
        playback: PlaybackSink,
    ) -> Result<RealtimeSession, RealtimeError>;

    /// Provider name used in logs
    fn provider_name(&self) -> &'static str;
}
