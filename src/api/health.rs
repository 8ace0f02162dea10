use crate::api::AppState;
use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;

pub async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({"status": "ok"}))
}

/// Ready once every collateral asset has a price.
pub async fn ready(State(state): State<AppState>) -> (StatusCode, Json<serde_json::Value>) {
    match state.orchestrator.system_status().await {
        Ok(_) => (
            StatusCode::OK,
            Json(serde_json::json!({"status": "ready"})),
        ),
        Err(e) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(serde_json::json!({"status": "unavailable", "reason": e.to_string()})),
        ),
    }
}
