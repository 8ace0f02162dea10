//! Events emitted by committed borrower operations.

use crate::domain::{Address, AssetId, BorrowerOperation, Wad};
use serde::Serialize;

/// Observability record of a committed mutation. Never consulted for control flow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum EngineEvent {
    #[serde(rename_all = "camelCase")]
    TroveCreated { owner: Address, array_index: usize },
    #[serde(rename_all = "camelCase")]
    TroveUpdated {
        owner: Address,
        debt: Wad,
        coll: Wad,
        stake: Wad,
        operation: BorrowerOperation,
    },
    #[serde(rename_all = "camelCase")]
    BorrowingFeePaid { owner: Address, fee: Wad },
    #[serde(rename_all = "camelCase")]
    CollateralClaimed {
        owner: Address,
        asset: AssetId,
        amount: Wad,
    },
}

impl EngineEvent {
    pub fn kind(&self) -> &'static str {
        match self {
            EngineEvent::TroveCreated { .. } => "troveCreated",
            EngineEvent::TroveUpdated { .. } => "troveUpdated",
            EngineEvent::BorrowingFeePaid { .. } => "borrowingFeePaid",
            EngineEvent::CollateralClaimed { .. } => "collateralClaimed",
        }
    }

    pub fn owner(&self) -> &Address {
        match self {
            EngineEvent::TroveCreated { owner, .. }
            | EngineEvent::TroveUpdated { owner, .. }
            | EngineEvent::BorrowingFeePaid { owner, .. }
            | EngineEvent::CollateralClaimed { owner, .. } => owner,
        }
    }

    /// Stable unique key for the `position`-th event of operation `op_seq`.
    ///
    /// Truncated SHA-256 over length-prefixed fields, so replaying a batch is idempotent.
    pub fn event_key(&self, op_seq: u64, position: usize) -> String {
        use sha2::{Digest, Sha256};

        fn hash_var(hasher: &mut Sha256, data: &str) {
            hasher.update((data.len() as u32).to_le_bytes());
            hasher.update(data.as_bytes());
        }

        let mut hasher = Sha256::new();
        hasher.update(op_seq.to_le_bytes());
        hasher.update((position as u64).to_le_bytes());
        hash_var(&mut hasher, self.kind());
        hash_var(&mut hasher, self.owner().as_str());

        let hash = hasher.finalize();
        format!("evt:{}", hex::encode(&hash[..16]))
    }
}
