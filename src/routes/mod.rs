pub mod api;
pub mod ws;

use axum::Router;
use std::sync::Arc;

use crate::state::AppState;

/// Combine the public, signaling and WebSocket routers into one application
pub fn create_app(state: Arc<AppState>) -> Router {
    api::create_public_router()
        .merge(api::create_signal_router())
        .merge(ws::create_ws_router())
        .with_state(state)
}
