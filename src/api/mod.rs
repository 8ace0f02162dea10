pub mod events;
pub mod health;
pub mod system;
pub mod troves;

use crate::domain::Address;
use crate::error::AppError;
use crate::orchestration::Orchestrator;
use axum::{
    routing::{get, post},
    Router,
};
use std::str::FromStr;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<Orchestrator>,
}

impl AppState {
    pub fn new(orchestrator: Arc<Orchestrator>) -> Self {
        Self { orchestrator }
    }
}

pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health::health))
        .route("/ready", get(health::ready))
        .route("/v1/system", get(system::get_system))
        .route("/v1/troves/open", post(troves::open_trove))
        .route("/v1/troves/adjust", post(troves::adjust_trove))
        .route("/v1/troves/close", post(troves::close_trove))
        .route("/v1/troves/:owner", get(troves::get_trove))
        .route("/v1/collateral/claim", post(troves::claim_collateral))
        .route("/v1/events", get(events::get_events))
        .layer(cors)
        .with_state(state)
}

/// Parse a request address, naming the offending field on failure.
pub(crate) fn parse_address(field: &str, raw: &str) -> Result<Address, AppError> {
    Address::from_str(raw).map_err(|_| AppError::BadRequest(format!("Invalid {} address", field)))
}
