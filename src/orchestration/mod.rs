//! Service-side orchestration: serialized engine access, event persistence, price refresh.

pub mod orchestrator;
pub mod price_refresh;

pub use orchestrator::{OrchestrationError, Orchestrator};
pub use price_refresh::PriceRefresher;
