//! In-memory implementations of every collaborator.
//!
//! These back the service binary and the test suites. They keep the bookkeeping the engine
//! relies on and nothing more; redistribution and redemption math are not modeled; tests
//! seed their results (pending rewards, surplus, base rate) through the helper methods.

use super::{
    ActivePool, Clock, Collaborators, FeeSink, InMemorySortedTroves, OracleError,
    PendingRewards, PriceOracle, PriceVector, StableLedger, SurplusPool, TroveLedger,
};
use crate::domain::{Address, AssetId, CollateralRegistry, TimeMs, TroveStatus, Wad};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tracing::debug;

/// Per-minute base-rate decay factor (12 hour half-life).
pub const BASE_RATE_DECAY_FACTOR: Wad = Wad::from_raw(999_037_758_833_783_000);

const MINUTE_MS: i64 = 60_000;

#[derive(Debug, Clone, Default)]
struct TroveRecord {
    status: TroveStatus,
    asset: Option<AssetId>,
    coll: Wad,
    debt: Wad,
    stake: Wad,
    array_index: Option<usize>,
}

/// Stake snapshot written by liquidations: (total stakes, total collateral).
#[derive(Debug, Clone, Copy, Default)]
struct StakeSnapshot {
    total_stakes: Wad,
    total_collateral: Wad,
}

/// Position ledger with an owner registry, per-asset stakes and a decaying base rate.
#[derive(Debug)]
pub struct InMemoryTroveLedger {
    troves: HashMap<Address, TroveRecord>,
    owners: Vec<Address>,
    pending: HashMap<Address, PendingRewards>,
    total_stakes: HashMap<AssetId, Wad>,
    snapshots: HashMap<AssetId, StakeSnapshot>,
    base_rate: Wad,
    last_fee_operation: TimeMs,
    clock: Arc<dyn Clock>,
}

impl InMemoryTroveLedger {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        let last_fee_operation = clock.now();
        Self {
            troves: HashMap::new(),
            owners: Vec::new(),
            pending: HashMap::new(),
            total_stakes: HashMap::new(),
            snapshots: HashMap::new(),
            base_rate: Wad::ZERO,
            last_fee_operation,
            clock,
        }
    }

    pub fn base_rate(&self) -> Wad {
        self.base_rate
    }

    pub fn last_fee_operation(&self) -> TimeMs {
        self.last_fee_operation
    }

    /// Set the base rate as a redemption would, stamping the fee-operation time.
    pub fn set_base_rate(&mut self, rate: Wad) {
        assert!(rate <= Wad::ONE, "base rate cannot exceed 100%");
        self.base_rate = rate;
        self.last_fee_operation = self.clock.now();
    }

    /// Record redistribution rewards owed to `owner`, as a liquidation would.
    pub fn credit_pending_rewards(&mut self, owner: &Address, coll: Wad, debt: Wad) {
        let entry = self.pending.entry(owner.clone()).or_default();
        entry.coll += coll;
        entry.debt += debt;
    }

    /// Record the stake snapshot a liquidation leaves behind.
    pub fn set_stake_snapshot(&mut self, asset: AssetId, total_stakes: Wad, total_collateral: Wad) {
        self.snapshots.insert(
            asset,
            StakeSnapshot {
                total_stakes,
                total_collateral,
            },
        );
    }

    pub fn total_stakes(&self, asset: AssetId) -> Wad {
        self.total_stakes.get(&asset).copied().unwrap_or_default()
    }

    pub fn owners(&self) -> &[Address] {
        &self.owners
    }

    pub fn owner_index(&self, owner: &Address) -> Option<usize> {
        self.troves.get(owner).and_then(|t| t.array_index)
    }

    fn record(&self, owner: &Address) -> Option<&TroveRecord> {
        self.troves.get(owner)
    }

    fn record_mut(&mut self, owner: &Address) -> &mut TroveRecord {
        self.troves.entry(owner.clone()).or_default()
    }

    fn compute_stake(&self, asset: AssetId, coll: Wad) -> Wad {
        match self.snapshots.get(&asset) {
            Some(s) if !s.total_collateral.is_zero() => {
                coll.mul_div(s.total_stakes, s.total_collateral)
            }
            _ => coll,
        }
    }
}

impl TroveLedger for InMemoryTroveLedger {
    fn status(&self, owner: &Address) -> TroveStatus {
        self.record(owner).map(|t| t.status).unwrap_or_default()
    }

    fn collateral(&self, owner: &Address) -> Wad {
        self.record(owner).map(|t| t.coll).unwrap_or_default()
    }

    fn debt(&self, owner: &Address) -> Wad {
        self.record(owner).map(|t| t.debt).unwrap_or_default()
    }

    fn collateral_asset(&self, owner: &Address) -> Option<AssetId> {
        self.record(owner).and_then(|t| t.asset)
    }

    fn stake(&self, owner: &Address) -> Wad {
        self.record(owner).map(|t| t.stake).unwrap_or_default()
    }

    fn pending_rewards(&self, owner: &Address) -> PendingRewards {
        if !self.status(owner).is_active() {
            return PendingRewards::default();
        }
        self.pending.get(owner).copied().unwrap_or_default()
    }

    fn decayed_base_rate(&self) -> Wad {
        let minutes = self.clock.now().minutes_since(self.last_fee_operation);
        self.base_rate.mul(BASE_RATE_DECAY_FACTOR.dec_pow(minutes))
    }

    fn set_status(&mut self, owner: &Address, status: TroveStatus) {
        self.record_mut(owner).status = status;
    }

    fn set_collateral_asset(&mut self, owner: &Address, asset: AssetId) {
        self.record_mut(owner).asset = Some(asset);
    }

    fn increase_collateral(&mut self, owner: &Address, amount: Wad) -> Wad {
        let record = self.record_mut(owner);
        record.coll += amount;
        record.coll
    }

    fn decrease_collateral(&mut self, owner: &Address, amount: Wad) -> Wad {
        let record = self.record_mut(owner);
        record.coll -= amount;
        record.coll
    }

    fn increase_debt(&mut self, owner: &Address, amount: Wad) -> Wad {
        let record = self.record_mut(owner);
        record.debt += amount;
        record.debt
    }

    fn decrease_debt(&mut self, owner: &Address, amount: Wad) -> Wad {
        let record = self.record_mut(owner);
        record.debt -= amount;
        record.debt
    }

    fn apply_pending_rewards(&mut self, owner: &Address) {
        if !self.status(owner).is_active() {
            return;
        }
        if let Some(rewards) = self.pending.remove(owner) {
            let record = self.record_mut(owner);
            record.coll += rewards.coll;
            record.debt += rewards.debt;
            debug!(
                "Applied pending rewards to {}: coll={}, debt={}",
                owner, rewards.coll, rewards.debt
            );
        }
    }

    fn update_stake_and_totals(&mut self, owner: &Address) -> Wad {
        let (asset, coll, old_stake) = {
            let record = self.record_mut(owner);
            let asset = record.asset.expect("trove has no collateral asset");
            (asset, record.coll, record.stake)
        };
        let new_stake = self.compute_stake(asset, coll);
        let total = self.total_stakes.entry(asset).or_default();
        *total = *total - old_stake + new_stake;
        self.record_mut(owner).stake = new_stake;
        new_stake
    }

    fn remove_stake(&mut self, owner: &Address) {
        let record = self.record_mut(owner);
        let stake = record.stake;
        record.stake = Wad::ZERO;
        if let Some(asset) = record.asset {
            let total = self.total_stakes.entry(asset).or_default();
            *total -= stake;
        }
    }

    fn close(&mut self, owner: &Address) {
        let idx = {
            let record = self.record_mut(owner);
            record.status = TroveStatus::ClosedByOwner;
            record.coll = Wad::ZERO;
            record.debt = Wad::ZERO;
            record.array_index.take()
        };
        self.pending.remove(owner);

        if let Some(idx) = idx {
            self.owners.swap_remove(idx);
            if let Some(moved) = self.owners.get(idx).cloned() {
                self.record_mut(&moved).array_index = Some(idx);
            }
        }
    }

    fn add_owner_to_registry(&mut self, owner: &Address) -> usize {
        self.owners.push(owner.clone());
        let idx = self.owners.len() - 1;
        self.record_mut(owner).array_index = Some(idx);
        idx
    }

    fn decay_base_rate_from_borrowing(&mut self) {
        let decayed = self.decayed_base_rate();
        assert!(decayed <= Wad::ONE, "decayed base rate exceeds 100%");
        self.base_rate = decayed;

        let now = self.clock.now();
        if now.as_ms() - self.last_fee_operation.as_ms() >= MINUTE_MS {
            self.last_fee_operation = now;
        }
    }
}

/// Active pool with per-asset collateral custody and the system debt total.
#[derive(Debug, Clone, Default)]
pub struct InMemoryActivePool {
    collateral: BTreeMap<AssetId, Wad>,
    debt: Wad,
    sent: HashMap<(Address, AssetId), Wad>,
}

impl InMemoryActivePool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total collateral of `asset` sent to `to` so far.
    pub fn collateral_sent_to(&self, to: &Address, asset: AssetId) -> Wad {
        self.sent
            .get(&(to.clone(), asset))
            .copied()
            .unwrap_or_default()
    }
}

impl ActivePool for InMemoryActivePool {
    fn collateral(&self, asset: AssetId) -> Wad {
        self.collateral.get(&asset).copied().unwrap_or_default()
    }

    fn total_debt(&self) -> Wad {
        self.debt
    }

    fn receive_collateral(&mut self, asset: AssetId, amount: Wad) {
        *self.collateral.entry(asset).or_default() += amount;
    }

    fn send_collateral(&mut self, to: &Address, asset: AssetId, amount: Wad) {
        let held = self.collateral.entry(asset).or_default();
        assert!(*held >= amount, "active pool holds less collateral than requested");
        *held -= amount;
        *self.sent.entry((to.clone(), asset)).or_default() += amount;
    }

    fn increase_debt(&mut self, amount: Wad) {
        self.debt += amount;
    }

    fn decrease_debt(&mut self, amount: Wad) {
        self.debt -= amount;
    }
}

/// Stable-asset balances and supply.
#[derive(Debug, Clone, Default)]
pub struct InMemoryStableLedger {
    balances: HashMap<Address, Wad>,
    total_supply: Wad,
}

impl InMemoryStableLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn total_supply(&self) -> Wad {
        self.total_supply
    }

    /// Move tokens between holders, e.g. to fund a repayment in tests.
    pub fn transfer(&mut self, from: &Address, to: &Address, amount: Wad) {
        self.burn(from, amount);
        self.mint(to, amount);
    }
}

impl StableLedger for InMemoryStableLedger {
    fn balance_of(&self, owner: &Address) -> Wad {
        self.balances.get(owner).copied().unwrap_or_default()
    }

    fn mint(&mut self, to: &Address, amount: Wad) {
        *self.balances.entry(to.clone()).or_default() += amount;
        self.total_supply += amount;
    }

    fn burn(&mut self, from: &Address, amount: Wad) {
        let balance = self.balances.entry(from.clone()).or_default();
        assert!(*balance >= amount, "burn exceeds balance of {}", from);
        *balance -= amount;
        self.total_supply -= amount;
    }
}

/// Last published price of every registered asset.
#[derive(Debug, Clone)]
pub struct PriceBook {
    assets: Vec<AssetId>,
    prices: Option<PriceVector>,
}

impl PriceBook {
    pub fn new(registry: &CollateralRegistry) -> Self {
        Self {
            assets: registry.ids().collect(),
            prices: None,
        }
    }

    pub fn set_prices(&mut self, prices: PriceVector) {
        self.prices = Some(prices);
    }

    /// Update one asset's price, keeping the others.
    pub fn set_price(&mut self, asset: AssetId, price: Wad) {
        let mut prices = self
            .prices
            .as_ref()
            .map(|p| p.as_slice().to_vec())
            .unwrap_or_else(|| vec![Wad::ZERO; self.assets.len()]);
        if prices.len() <= asset.index() {
            prices.resize(asset.index() + 1, Wad::ZERO);
        }
        prices[asset.index()] = price;
        self.prices = Some(PriceVector::new(prices));
    }
}

impl PriceOracle for PriceBook {
    fn fetch_prices(&self) -> Result<PriceVector, OracleError> {
        let prices = self.prices.as_ref().ok_or(OracleError::NotInitialized)?;
        for asset in &self.assets {
            match prices.get(*asset) {
                None => return Err(OracleError::MissingPrice(*asset)),
                Some(p) if p.is_zero() => return Err(OracleError::ZeroPrice(*asset)),
                Some(_) => {}
            }
        }
        Ok(prices.clone())
    }
}

/// Fee sink that tallies accrued borrowing fees.
#[derive(Debug, Clone, Default)]
pub struct InMemoryFeeSink {
    accrued: Wad,
}

impl InMemoryFeeSink {
    pub fn accrued(&self) -> Wad {
        self.accrued
    }
}

impl FeeSink for InMemoryFeeSink {
    fn accumulate_fee(&mut self, amount: Wad) {
        self.accrued += amount;
    }
}

/// Collateral surplus awaiting claim, per owner and asset.
#[derive(Debug, Clone, Default)]
pub struct InMemorySurplusPool {
    claimable: HashMap<Address, BTreeMap<AssetId, Wad>>,
    paid: HashMap<(Address, AssetId), Wad>,
}

impl InMemorySurplusPool {
    /// Record surplus for `owner`, as a liquidation or redemption would.
    pub fn credit(&mut self, owner: &Address, asset: AssetId, amount: Wad) {
        *self
            .claimable
            .entry(owner.clone())
            .or_default()
            .entry(asset)
            .or_default() += amount;
    }

    pub fn paid_to(&self, owner: &Address, asset: AssetId) -> Wad {
        self.paid
            .get(&(owner.clone(), asset))
            .copied()
            .unwrap_or_default()
    }
}

impl SurplusPool for InMemorySurplusPool {
    fn claimable(&self, owner: &Address) -> Vec<(AssetId, Wad)> {
        self.claimable
            .get(owner)
            .map(|by_asset| {
                by_asset
                    .iter()
                    .filter(|(_, amount)| !amount.is_zero())
                    .map(|(asset, amount)| (*asset, *amount))
                    .collect()
            })
            .unwrap_or_default()
    }

    fn claim(&mut self, owner: &Address) -> Vec<(AssetId, Wad)> {
        let claimed = self.claimable(owner);
        self.claimable.remove(owner);
        for (asset, amount) in &claimed {
            *self.paid.entry((owner.clone(), *asset)).or_default() += *amount;
        }
        claimed
    }
}

/// Every in-memory collaborator bundled together.
#[derive(Debug)]
pub struct InMemoryProtocol {
    pub troves: InMemoryTroveLedger,
    pub sorted: InMemorySortedTroves,
    pub active_pool: InMemoryActivePool,
    pub stable: InMemoryStableLedger,
    pub prices: PriceBook,
    pub fee_sink: InMemoryFeeSink,
    pub surplus: InMemorySurplusPool,
}

impl InMemoryProtocol {
    pub fn new(registry: &CollateralRegistry, clock: Arc<dyn Clock>) -> Self {
        Self {
            troves: InMemoryTroveLedger::new(clock),
            sorted: InMemorySortedTroves::new(),
            active_pool: InMemoryActivePool::new(),
            stable: InMemoryStableLedger::new(),
            prices: PriceBook::new(registry),
            fee_sink: InMemoryFeeSink::default(),
            surplus: InMemorySurplusPool::default(),
        }
    }

    /// Borrow every collaborator for one engine call.
    pub fn collaborators(&mut self) -> Collaborators<'_> {
        Collaborators {
            troves: &mut self.troves,
            sorted: &mut self.sorted,
            active_pool: &mut self.active_pool,
            stable: &mut self.stable,
            oracle: &self.prices,
            fee_sink: &mut self.fee_sink,
            surplus: &mut self.surplus,
        }
    }

    /// Credit redistribution rewards to an active trove, with the matching collateral
    /// and debt already held in pool custody.
    pub fn seed_redistribution(&mut self, owner: &Address, coll: Wad, debt: Wad) {
        let asset = self
            .troves
            .collateral_asset(owner)
            .expect("redistribution target has no trove");
        self.troves.credit_pending_rewards(owner, coll, debt);
        self.active_pool.receive_collateral(asset, coll);
        self.active_pool.increase_debt(debt);
    }
}
