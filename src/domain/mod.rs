//! Domain types for the trove engine.
//!
//! This module provides:
//! - Fixed-point amounts via the `Wad` type
//! - Domain primitives: TimeMs, Address
//! - The collateral asset registry and validated `AssetId`
//! - Trove status, borrower operations and emitted events

pub mod asset;
pub mod event;
pub mod primitives;
pub mod trove;
pub mod wad;

pub use asset::{AssetId, CollateralAsset, CollateralRegistry, RegistryError};
pub use event::EngineEvent;
pub use primitives::{Address, AddressParseError, TimeMs};
pub use trove::{BorrowerOperation, TroveStatus, TroveView};
pub use wad::{Wad, WadParseError, DECIMAL_PRECISION};
