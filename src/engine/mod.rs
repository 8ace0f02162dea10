//! Trove lifecycle engine: ratio math, fees, admissibility and the borrower operations.

pub mod admissibility;
pub mod borrower_ops;
pub mod error;
pub mod fee;
pub mod ratio;
pub mod setup;

pub use admissibility::SystemMode;
pub use borrower_ops::{
    AdjustTroveRequest, AssetTotals, BorrowerOperations, ClaimReceipt, ClaimedCollateral,
    OpenTroveRequest, OperationReceipt, SystemStatus,
};
pub use error::EngineError;
pub use fee::FeeQuote;
pub use ratio::{Delta, SystemSnapshot};
pub use setup::{ProtocolParams, ProtocolSetup, ProtocolSetupBuilder, SetupError};
