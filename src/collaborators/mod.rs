//! Collaborator interfaces consumed by the borrower-operations engine.
//!
//! The engine owns none of the protocol state: positions, the sorted index, pool totals,
//! token balances and prices all live behind these traits. Read methods take `&self` and
//! are used during validation; mutating methods are only called after every check passed
//! and are infallible by contract. An implementation that cannot honor a mutation has
//! diverged from the engine's snapshot and must panic rather than half-apply it.

use crate::domain::{Address, AssetId, TroveStatus, Wad};
use std::fmt;

pub mod clock;
pub mod memory;
pub mod sorted;

pub use clock::{Clock, ManualClock, SystemClock};
pub use memory::{
    InMemoryActivePool, InMemoryFeeSink, InMemoryProtocol, InMemoryStableLedger,
    InMemorySurplusPool, InMemoryTroveLedger, PriceBook,
};
pub use sorted::InMemorySortedTroves;

/// Redistribution rewards accrued to a trove but not yet folded into it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PendingRewards {
    pub coll: Wad,
    pub debt: Wad,
}

/// Caller-supplied neighbours for O(1) insertion into the sorted index.
///
/// `upper` should sit closer to the head (higher NICR), `lower` closer to the tail.
/// Wrong or stale hints only cost a search, never correctness.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Hints {
    pub upper: Option<Address>,
    pub lower: Option<Address>,
}

impl Hints {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn between(upper: Option<Address>, lower: Option<Address>) -> Self {
        Self { upper, lower }
    }
}

/// Position ledger: persists per-trove state and the decaying base rate.
pub trait TroveLedger {
    fn status(&self, owner: &Address) -> TroveStatus;
    fn collateral(&self, owner: &Address) -> Wad;
    fn debt(&self, owner: &Address) -> Wad;
    fn collateral_asset(&self, owner: &Address) -> Option<AssetId>;
    fn stake(&self, owner: &Address) -> Wad;
    fn pending_rewards(&self, owner: &Address) -> PendingRewards;
    /// Base rate as it would be after decaying to the current time.
    fn decayed_base_rate(&self) -> Wad;

    fn set_status(&mut self, owner: &Address, status: TroveStatus);
    fn set_collateral_asset(&mut self, owner: &Address, asset: AssetId);
    /// Returns the new collateral.
    fn increase_collateral(&mut self, owner: &Address, amount: Wad) -> Wad;
    fn decrease_collateral(&mut self, owner: &Address, amount: Wad) -> Wad;
    /// Returns the new debt.
    fn increase_debt(&mut self, owner: &Address, amount: Wad) -> Wad;
    fn decrease_debt(&mut self, owner: &Address, amount: Wad) -> Wad;
    fn apply_pending_rewards(&mut self, owner: &Address);
    /// Recompute the trove's stake from its collateral; returns the new stake.
    fn update_stake_and_totals(&mut self, owner: &Address) -> Wad;
    fn remove_stake(&mut self, owner: &Address);
    /// Mark the trove closed by its owner, zero it and drop it from the owner registry.
    fn close(&mut self, owner: &Address);
    /// Returns the owner's index in the registry.
    fn add_owner_to_registry(&mut self, owner: &Address) -> usize;
    /// Persist the decayed base rate and stamp the fee-operation time.
    fn decay_base_rate_from_borrowing(&mut self);
}

/// Index of active troves ordered by non-increasing nominal ICR, head to tail.
pub trait SortedIndex {
    fn contains(&self, owner: &Address) -> bool;
    fn insert(&mut self, owner: &Address, nicr: Wad, hints: &Hints);
    fn reinsert(&mut self, owner: &Address, nicr: Wad, hints: &Hints);
    fn remove(&mut self, owner: &Address);
}

/// Custody pool holding all active collateral and the system debt accounting.
pub trait ActivePool {
    /// Entire system collateral of one asset, including amounts awaiting redistribution.
    fn collateral(&self, asset: AssetId) -> Wad;
    /// Entire system debt, including amounts awaiting redistribution.
    fn total_debt(&self) -> Wad;

    fn receive_collateral(&mut self, asset: AssetId, amount: Wad);
    fn send_collateral(&mut self, to: &Address, asset: AssetId, amount: Wad);
    fn increase_debt(&mut self, amount: Wad);
    fn decrease_debt(&mut self, amount: Wad);
}

/// Stable-asset token ledger.
pub trait StableLedger {
    fn balance_of(&self, owner: &Address) -> Wad;
    fn mint(&mut self, to: &Address, amount: Wad);
    fn burn(&mut self, from: &Address, amount: Wad);
}

/// Prices of every registered collateral asset, indexed by `AssetId`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PriceVector {
    prices: Vec<Wad>,
}

impl PriceVector {
    pub fn new(prices: Vec<Wad>) -> Self {
        Self { prices }
    }

    pub fn get(&self, asset: AssetId) -> Option<Wad> {
        self.prices.get(asset.index()).copied()
    }

    pub fn len(&self) -> usize {
        self.prices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.prices.is_empty()
    }

    pub fn as_slice(&self) -> &[Wad] {
        &self.prices
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OracleError {
    /// No price has been published yet.
    NotInitialized,
    /// The oracle has fewer prices than there are registered assets.
    MissingPrice(AssetId),
    /// A published price is zero.
    ZeroPrice(AssetId),
}

impl fmt::Display for OracleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OracleError::NotInitialized => write!(f, "price oracle not initialized"),
            OracleError::MissingPrice(asset) => write!(f, "no price for asset {}", asset),
            OracleError::ZeroPrice(asset) => write!(f, "zero price for asset {}", asset),
        }
    }
}

impl std::error::Error for OracleError {}

/// Price oracle returning the whole price vector at once.
pub trait PriceOracle {
    fn fetch_prices(&self) -> Result<PriceVector, OracleError>;
}

/// Staking contract that receives borrowing fees.
pub trait FeeSink {
    fn accumulate_fee(&mut self, amount: Wad);
}

/// Holds collateral left over from liquidations and redemptions until claimed.
pub trait SurplusPool {
    fn claimable(&self, owner: &Address) -> Vec<(AssetId, Wad)>;
    /// Pay out and clear everything claimable by `owner`.
    fn claim(&mut self, owner: &Address) -> Vec<(AssetId, Wad)>;
}

/// Mutable borrow of every collaborator for the duration of one engine call.
pub struct Collaborators<'a> {
    pub troves: &'a mut dyn TroveLedger,
    pub sorted: &'a mut dyn SortedIndex,
    pub active_pool: &'a mut dyn ActivePool,
    pub stable: &'a mut dyn StableLedger,
    pub oracle: &'a dyn PriceOracle,
    pub fee_sink: &'a mut dyn FeeSink,
    pub surplus: &'a mut dyn SurplusPool,
}
