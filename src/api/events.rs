use crate::api::{parse_address, AppState};
use crate::db::StoredEvent;
use crate::error::AppError;
use axum::extract::{Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};

const DEFAULT_LIMIT: i64 = 500;
const MAX_LIMIT: i64 = 5_000;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventsQuery {
    pub owner: Option<String>,
    pub limit: Option<i64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventsResponse {
    pub events: Vec<StoredEvent>,
}

pub async fn get_events(
    Query(params): Query<EventsQuery>,
    State(state): State<AppState>,
) -> Result<Json<EventsResponse>, AppError> {
    let owner = params
        .owner
        .as_deref()
        .map(|raw| parse_address("owner", raw))
        .transpose()?;
    let limit = params.limit.unwrap_or(DEFAULT_LIMIT);
    if !(1..=MAX_LIMIT).contains(&limit) {
        return Err(AppError::BadRequest(format!(
            "limit must be between 1 and {}",
            MAX_LIMIT
        )));
    }

    let events = state.orchestrator.events(owner.as_ref(), limit).await?;
    Ok(Json(EventsResponse { events }))
}
