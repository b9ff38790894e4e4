use std::sync::Arc;

use axum::{extract::State, response::Json};
use serde_json::{Value, json};
use tracing::debug;

use crate::state::AppState;

/// Liveness probe. The body stays `{"status":"OK"}` so load balancers can
/// match on it; session and upstream counters only go to the debug log.
pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<Value> {
    debug!("Health check: {}", status_line(&state));
    Json(json!({ "status": "OK" }))
}

fn status_line(state: &AppState) -> String {
    let req_manager = state.core_state.openai.req_manager();
    format!(
        "{} sessions, {} upstream permits free, {}",
        state.sessions.len(),
        req_manager.available_permits(),
        req_manager.metrics().summary()
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ServerConfig;

    #[tokio::test]
    async fn test_health_check_reports_ok() {
        let state = AppState::new(ServerConfig::with_api_key("sk-test")).unwrap();
        state.sessions.create("conn-1");

        let Json(body) = health_check(State(state.clone())).await;
        assert_eq!(body, json!({"status": "OK"}));

        let line = status_line(&state);
        assert!(line.starts_with("1 sessions, 16 upstream permits free"), "{line}");
        assert!(line.contains("Requests - Total: 0"), "{line}");
    }
}
