use std::sync::Arc;

use serde_json::{Value, json};
use tracing::{debug, info};

use super::openai::{OpenAIClient, OpenAIError};

/// Errors produced while relaying a signaling payload
#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    #[error("Invalid signal: {0}")]
    InvalidSignal(String),
    #[error("Upstream negotiation failed: {0}")]
    Upstream(#[from] OpenAIError),
}

/// Whether a signal value counts as absent (`null`, missing or `""`)
pub fn is_missing_signal(signal: Option<&Value>) -> bool {
    match signal {
        None | Some(Value::Null) => true,
        Some(Value::String(s)) => s.is_empty(),
        Some(Value::Bool(b)) => !b,
        Some(Value::Number(n)) => n.as_f64() == Some(0.0),
        _ => false,
    }
}

/// Extract the SDP offer from an opaque signal.
///
/// Accepts a bare SDP string or an object carrying an `sdp` string whose
/// `type`, when present, is `offer`.
pub fn offer_sdp(signal: &Value) -> Result<&str, RelayError> {
    match signal {
        Value::String(sdp) if !sdp.trim().is_empty() => Ok(sdp),
        Value::Object(map) => {
            if let Some(kind) = map.get("type").and_then(Value::as_str)
                && kind != "offer"
            {
                return Err(RelayError::InvalidSignal(format!(
                    "expected an offer, got '{kind}'"
                )));
            }
            match map.get("sdp").and_then(Value::as_str) {
                Some(sdp) if !sdp.trim().is_empty() => Ok(sdp),
                _ => Err(RelayError::InvalidSignal("missing sdp".to_string())),
            }
        }
        _ => Err(RelayError::InvalidSignal(
            "signal is neither an SDP string nor an offer object".to_string(),
        )),
    }
}

/// Forwards client offers to the provider's WebRTC endpoint
#[derive(Clone)]
pub struct SignalingRelay {
    openai: Arc<OpenAIClient>,
}

impl SignalingRelay {
    pub fn new(openai: Arc<OpenAIClient>) -> Self {
        Self { openai }
    }

    /// Negotiate an answer for `signal` and return it as `{type, sdp}`
    pub async fn answer(&self, signal: &Value) -> Result<Value, RelayError> {
        let offer = offer_sdp(signal)?;
        debug!("Relaying SDP offer ({} bytes)", offer.len());

        let answer = self.openai.negotiate_sdp(offer).await?;
        info!("Received SDP answer ({} bytes)", answer.len());

        Ok(json!({
            "type": "answer",
            "sdp": answer,
        }))
    }
}
