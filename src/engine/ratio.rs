//! Collateralization ratios for a single trove and for the whole system.

use crate::collaborators::{ActivePool, OracleError, PriceOracle, PriceVector};
use crate::domain::{AssetId, CollateralRegistry, Wad};
use crate::engine::EngineError;

/// Price-independent collateral-to-debt ratio used to order the sorted index.
pub fn nominal_cr(coll: Wad, debt: Wad) -> Wad {
    if debt.is_zero() {
        return Wad::MAX;
    }
    coll.div(debt)
}

/// Price-weighted collateral ratio (ICR for a trove).
pub fn collateral_ratio(coll: Wad, debt: Wad, price: Wad) -> Wad {
    if debt.is_zero() {
        return Wad::MAX;
    }
    coll.mul_div(price, debt)
}

/// Signed change to a collateral or debt figure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delta {
    Increase(Wad),
    Decrease(Wad),
}

impl Delta {
    pub const NONE: Delta = Delta::Increase(Wad::ZERO);

    pub fn new(amount: Wad, is_increase: bool) -> Self {
        if is_increase {
            Delta::Increase(amount)
        } else {
            Delta::Decrease(amount)
        }
    }

    pub fn amount(&self) -> Wad {
        match self {
            Delta::Increase(amount) | Delta::Decrease(amount) => *amount,
        }
    }

    pub fn is_increase(&self) -> bool {
        matches!(self, Delta::Increase(_))
    }

    /// `base` with the delta applied; `None` on overflow or when decreasing below zero.
    pub fn apply(&self, base: Wad) -> Option<Wad> {
        match self {
            Delta::Increase(amount) => base.checked_add(*amount),
            Delta::Decrease(amount) => base.checked_sub(*amount),
        }
    }
}

/// ICR of a trove after applying `coll_delta` and `debt_delta` to its current figures.
pub fn new_icr(
    coll: Wad,
    debt: Wad,
    coll_delta: Delta,
    debt_delta: Delta,
    price: Wad,
) -> Result<Wad, EngineError> {
    let coll = coll_delta.apply(coll).ok_or(EngineError::AmountOverflow)?;
    let debt = debt_delta.apply(debt).ok_or(EngineError::AmountOverflow)?;
    Ok(collateral_ratio(coll, debt, price))
}

/// Prices and system totals read once at the start of an operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SystemSnapshot {
    prices: PriceVector,
    /// System collateral per asset, indexed by `AssetId`.
    collateral: Vec<Wad>,
    debt: Wad,
}

impl SystemSnapshot {
    pub fn capture(
        registry: &CollateralRegistry,
        active_pool: &dyn ActivePool,
        oracle: &dyn PriceOracle,
    ) -> Result<Self, EngineError> {
        let prices = oracle.fetch_prices()?;
        let mut collateral = vec![Wad::ZERO; registry.len()];
        for asset in registry.ids() {
            if prices.get(asset).is_none() {
                return Err(OracleError::MissingPrice(asset).into());
            }
            collateral[asset.index()] = active_pool.collateral(asset);
        }
        Ok(Self {
            prices,
            collateral,
            debt: active_pool.total_debt(),
        })
    }

    /// Build a snapshot from explicit figures.
    pub fn from_parts(prices: PriceVector, collateral: Vec<Wad>, debt: Wad) -> Self {
        assert_eq!(
            prices.len(),
            collateral.len(),
            "one price per collateral total is required"
        );
        Self {
            prices,
            collateral,
            debt,
        }
    }

    pub fn prices(&self) -> &PriceVector {
        &self.prices
    }

    /// Price of `asset`. Registered assets always have one once the snapshot exists.
    pub fn price(&self, asset: AssetId) -> Wad {
        self.prices.get(asset).unwrap_or(Wad::ZERO)
    }

    pub fn collateral(&self, asset: AssetId) -> Wad {
        self.collateral.get(asset.index()).copied().unwrap_or_default()
    }

    pub fn debt(&self) -> Wad {
        self.debt
    }

    /// Σ(collateral × price) over every asset. Saturates at `Wad::MAX`.
    pub fn total_value(&self) -> Wad {
        Self::value_of(&self.collateral, &self.prices)
    }

    pub fn tcr(&self) -> Wad {
        Self::ratio(self.total_value(), self.debt)
    }

    /// TCR after moving `asset` collateral by `coll_delta` and system debt by `debt_delta`.
    ///
    /// The same computation serves open, adjust and close.
    pub fn tcr_with(
        &self,
        asset: AssetId,
        coll_delta: Delta,
        debt_delta: Delta,
    ) -> Result<Wad, EngineError> {
        let mut collateral = self.collateral.clone();
        let slot = collateral
            .get_mut(asset.index())
            .ok_or(EngineError::InvalidCollateralAsset)?;
        *slot = coll_delta.apply(*slot).ok_or(EngineError::AmountOverflow)?;
        let debt = debt_delta.apply(self.debt).ok_or(EngineError::AmountOverflow)?;
        Ok(Self::ratio(Self::value_of(&collateral, &self.prices), debt))
    }

    fn value_of(collateral: &[Wad], prices: &PriceVector) -> Wad {
        collateral
            .iter()
            .zip(prices.as_slice())
            .map(|(coll, price)| coll.mul(*price))
            .try_fold(Wad::ZERO, |acc, value| acc.checked_add(value))
            .unwrap_or(Wad::MAX)
    }

    fn ratio(value: Wad, debt: Wad) -> Wad {
        if debt.is_zero() {
            return Wad::MAX;
        }
        value.div(debt)
    }
}
