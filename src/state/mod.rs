use std::sync::Arc;

use crate::config::ServerConfig;
use crate::core::realtime::RealtimeConnector;
use crate::core::{CoreInitError, CoreState, SessionRegistry};
use crate::handlers::ws::Gateway;

/// Application state that can be shared across handlers
pub struct AppState {
    pub config: ServerConfig,
    /// Core layer state: provider clients, relay and reply pipeline
    pub core_state: Arc<CoreState>,
    /// Sessions of the persistent-channel clients
    pub sessions: SessionRegistry,
    /// Outbound routes to connected WebSocket clients
    pub gateway: Gateway,
}

impl AppState {
    pub fn new(config: ServerConfig) -> Result<Arc<Self>, CoreInitError> {
        let core_state = CoreState::new(&config)?;
        Ok(Self::from_parts(config, core_state))
    }

    /// Build state around a specific realtime connector
    pub fn with_connector(
        config: ServerConfig,
        connector: Arc<dyn RealtimeConnector>,
    ) -> Result<Arc<Self>, CoreInitError> {
        let core_state = CoreState::with_connector(&config, connector)?;
        Ok(Self::from_parts(config, core_state))
    }

    fn from_parts(config: ServerConfig, core_state: Arc<CoreState>) -> Arc<Self> {
        Arc::new(Self {
            config,
            core_state,
            sessions: SessionRegistry::new(),
            gateway: Gateway::new(),
        })
    }
}
