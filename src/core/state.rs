use std::sync::Arc;

use tracing::info;

use crate::config::ServerConfig;
use crate::core::openai::{OpenAIClient, OpenAIError};
use crate::core::pipeline::ReplyPipeline;
use crate::core::realtime::{OpenAIRealtime, RealtimeConfig, RealtimeConnector, RealtimeError};
use crate::core::relay::SignalingRelay;
use crate::core::session_id::SessionIdGenerator;

#[derive(Debug, thiserror::Error)]
pub enum CoreInitError {
    #[error("Failed to create OpenAI client: {0}")]
    OpenAI(#[from] OpenAIError),
    #[error("Failed to create realtime connector: {0}")]
    Realtime(#[from] RealtimeError),
}

/// Core-specific shared state for the application.
///
/// Holds the provider clients shared by every connection: one pooled REST
/// client, the signaling relay and reply pipeline built on it, the realtime
/// connector, and the session identifier generator used by the HTTP path.
pub struct CoreState {
    pub openai: Arc<OpenAIClient>,
    pub relay: SignalingRelay,
    pub pipeline: ReplyPipeline,
    pub realtime: Arc<dyn RealtimeConnector>,
    pub session_ids: SessionIdGenerator,
}

impl CoreState {
    /// Initialize core state with the OpenAI realtime connector
    pub fn new(config: &ServerConfig) -> Result<Arc<Self>, CoreInitError> {
        let realtime = Arc::new(OpenAIRealtime::new(RealtimeConfig::from(config))?);
        Self::with_connector(config, realtime)
    }

    /// Initialize core state around a caller-supplied realtime connector
    pub fn with_connector(
        config: &ServerConfig,
        realtime: Arc<dyn RealtimeConnector>,
    ) -> Result<Arc<Self>, CoreInitError> {
        let openai = Arc::new(OpenAIClient::from_config(config)?);
        info!(
            "Initialized OpenAI client with {} concurrent requests, realtime provider: {}",
            config.max_concurrent_requests,
            realtime.provider_name()
        );

        Ok(Arc::new(Self {
            relay: SignalingRelay::new(openai.clone()),
            pipeline: ReplyPipeline::new(openai.clone()),
            openai,
            realtime,
            session_ids: SessionIdGenerator::new(),
        }))
    }
}
