pub mod api;
pub mod collaborators;
pub mod config;
pub mod db;
pub mod domain;
pub mod engine;
pub mod error;
pub mod oracle;
pub mod orchestration;

pub use collaborators::{InMemoryProtocol, PriceVector};
pub use config::Config;
pub use db::{init_db, Repository};
pub use domain::{Address, AssetId, CollateralRegistry, EngineEvent, TimeMs, TroveStatus, Wad};
pub use engine::{BorrowerOperations, EngineError, ProtocolParams, ProtocolSetup, SystemMode};
pub use error::AppError;
pub use oracle::{HttpPriceFeed, MockPriceFeed, PriceFeed, PriceFeedError};
pub use orchestration::{Orchestrator, PriceRefresher};
