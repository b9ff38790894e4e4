use axum::{
    Router,
    http::{HeaderValue, header},
    routing::{get, post},
};
use tower_http::{set_header::SetResponseHeaderLayer, trace::TraceLayer};

use crate::handlers::{api, signal};
use crate::state::AppState;
use std::sync::Arc;

/// Health check router
pub fn create_public_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(api::health_check))
        .layer(TraceLayer::new_for_http())
}

/// Stateless signaling endpoints. Every response, errors included, carries
/// `Access-Control-Allow-Origin: *`.
pub fn create_signal_router() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/openai-signal",
            post(signal::openai_signal)
                .options(signal::preflight)
                .fallback(signal::method_not_allowed),
        )
        .route(
            "/start-conversation",
            post(signal::start_conversation)
                .options(signal::preflight)
                .fallback(signal::method_not_allowed),
        )
        .layer(SetResponseHeaderLayer::overriding(
            header::ACCESS_CONTROL_ALLOW_ORIGIN,
            HeaderValue::from_static("*"),
        ))
        .layer(TraceLayer::new_for_http())
}
