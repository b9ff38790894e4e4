//! Stateless HTTP signaling endpoints
//!
//! `/openai-signal` relays an SDP offer outside the WebSocket path and
//! `/start-conversation` hands out a session identifier. Neither touches the
//! session registry. CORS headers are added by the router.

use axum::{
    body::Bytes,
    extract::State,
    http::{StatusCode, header},
    response::{IntoResponse, Json, Response},
};
use serde_json::{Value, json};
use std::sync::Arc;
use tracing::info;

use crate::core::relay::{RelayError, is_missing_signal};
use crate::errors::app_error::{AppError, AppResult};
use crate::state::AppState;

pub const SESSION_READY_MESSAGE: &str = "Session initialized. Ready for WebRTC connection.";

/// Parse a JSON request body; an empty body is allowed only when `allow_empty`
fn parse_body(body: &Bytes, allow_empty: bool) -> AppResult<Value> {
    if allow_empty && body.iter().all(u8::is_ascii_whitespace) {
        return Ok(Value::Null);
    }
    serde_json::from_slice(body).map_err(|_| AppError::BadRequest("Invalid JSON body".to_string()))
}

/// `POST /openai-signal`
pub async fn openai_signal(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> AppResult<Json<Value>> {
    let request = parse_body(&body, false)?;
    let signal = request.get("signal");
    if is_missing_signal(signal) {
        return Err(AppError::BadRequest("Signal data is required".to_string()));
    }
    let signal = signal.cloned().unwrap_or(Value::Null);

    info!("HTTP signal received");
    match state.core_state.relay.answer(&signal).await {
        Ok(answer) => Ok(Json(json!({ "signal": answer }))),
        Err(RelayError::InvalidSignal(reason)) => {
            tracing::warn!("Rejected signal: {}", reason);
            Err(AppError::BadRequest(
                "Signal must carry an SDP offer".to_string(),
            ))
        }
        Err(RelayError::Upstream(e)) => Err(AppError::InternalServerError(e.to_string())),
    }
}

/// `POST /start-conversation`
pub async fn start_conversation(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> AppResult<Json<Value>> {
    parse_body(&body, true)?;

    let session_id = state.core_state.session_ids.next_id();
    info!("HTTP session initialized: {}", session_id);

    Ok(Json(json!({
        "sessionId": session_id,
        "message": SESSION_READY_MESSAGE,
    })))
}

/// `OPTIONS` preflight for the signal endpoints
pub async fn preflight() -> Response {
    (
        StatusCode::OK,
        [
            (header::ACCESS_CONTROL_ALLOW_HEADERS, "Content-Type"),
            (header::ACCESS_CONTROL_ALLOW_METHODS, "POST, OPTIONS"),
        ],
    )
        .into_response()
}

/// Any method other than `POST` or `OPTIONS`
pub async fn method_not_allowed() -> AppError {
    AppError::MethodNotAllowed
}
