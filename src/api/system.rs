use crate::api::AppState;
use crate::engine::SystemStatus;
use crate::error::AppError;
use axum::extract::State;
use axum::Json;

/// Prices, TCR, mode and totals as of now.
pub async fn get_system(State(state): State<AppState>) -> Result<Json<SystemStatus>, AppError> {
    Ok(Json(state.orchestrator.system_status().await?))
}
