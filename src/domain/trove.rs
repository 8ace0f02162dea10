//! Trove status and the figures the engine reports about a position.

use crate::domain::{Address, AssetId, Wad};
use serde::Serialize;

/// Lifecycle status of a trove. Only `Active` troves can be adjusted or closed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum TroveStatus {
    #[default]
    NonExistent,
    Active,
    ClosedByOwner,
    ClosedByLiquidation,
    ClosedByRedemption,
}

impl TroveStatus {
    pub fn is_active(&self) -> bool {
        matches!(self, TroveStatus::Active)
    }
}

/// Borrower-facing operation recorded on `TroveUpdated` events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum BorrowerOperation {
    OpenTrove,
    CloseTrove,
    AdjustTrove,
}

impl std::fmt::Display for BorrowerOperation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BorrowerOperation::OpenTrove => write!(f, "openTrove"),
            BorrowerOperation::CloseTrove => write!(f, "closeTrove"),
            BorrowerOperation::AdjustTrove => write!(f, "adjustTrove"),
        }
    }
}

/// Point-in-time view of a trove, including pending redistribution rewards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TroveView {
    pub owner: Address,
    pub status: TroveStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub asset: Option<AssetId>,
    pub coll: Wad,
    pub debt: Wad,
    pub stake: Wad,
    pub pending_coll: Wad,
    pub pending_debt: Wad,
    pub icr: Wad,
    pub nicr: Wad,
}
