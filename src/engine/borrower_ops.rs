//! Borrower operations: open, adjust, close and claim.
//!
//! Every operation runs checks, then effects, then interactions:
//!
//! 1. checks read one snapshot (prices, system totals, the trove with its pending rewards,
//!    the decayed base rate) and validate without mutating anything;
//! 2. effects update the trove ledger, stakes and the sorted index;
//! 3. interactions move fees, stable-asset balances, debt accounting and collateral.
//!
//! A rejection can only come out of phase 1, so a rejected call touches no collaborator.

use crate::collaborators::{Collaborators, Hints};
use crate::domain::{
    Address, AssetId, BorrowerOperation, EngineEvent, TroveStatus, TroveView, Wad,
};
use crate::engine::admissibility::{self, AdjustmentCheck, SystemMode};
use crate::engine::fee::{self, FeeQuote};
use crate::engine::ratio::{self, Delta, SystemSnapshot};
use crate::engine::{EngineError, ProtocolSetup};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenTroveRequest {
    /// Raw collateral asset index, resolved against the registry.
    pub asset: u8,
    pub coll: Wad,
    /// Debt minted to the caller, before fee and gas compensation.
    pub debt: Wad,
    pub max_fee_percentage: Wad,
    pub hints: Hints,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdjustTroveRequest {
    pub borrower: Address,
    pub coll_top_up: Wad,
    pub coll_withdrawal: Wad,
    pub debt_change: Wad,
    pub is_debt_increase: bool,
    pub max_fee_percentage: Wad,
    pub hints: Hints,
}

impl AdjustTroveRequest {
    /// A no-op adjustment of `borrower`'s trove, to be filled in field by field.
    pub fn for_borrower(borrower: Address) -> Self {
        Self {
            borrower,
            coll_top_up: Wad::ZERO,
            coll_withdrawal: Wad::ZERO,
            debt_change: Wad::ZERO,
            is_debt_increase: false,
            max_fee_percentage: Wad::ZERO,
            hints: Hints::none(),
        }
    }
}

/// Outcome of a committed open, adjust or close.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationReceipt {
    pub owner: Address,
    pub operation: BorrowerOperation,
    pub coll: Wad,
    pub debt: Wad,
    pub stake: Wad,
    pub icr: Wad,
    pub nicr: Wad,
    pub fee: Wad,
    pub events: Vec<EngineEvent>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClaimedCollateral {
    pub asset: AssetId,
    pub amount: Wad,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClaimReceipt {
    pub owner: Address,
    pub claimed: Vec<ClaimedCollateral>,
    pub events: Vec<EngineEvent>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetTotals {
    pub asset: AssetId,
    pub symbol: String,
    pub price: Wad,
    pub collateral: Wad,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemStatus {
    pub tcr: Wad,
    pub mode: SystemMode,
    pub recovery_mode: bool,
    pub total_debt: Wad,
    pub assets: Vec<AssetTotals>,
}

struct OpenContext {
    asset: AssetId,
    mode: SystemMode,
    fee: FeeQuote,
    net_debt: Wad,
    composite_debt: Wad,
    icr: Wad,
    nicr: Wad,
}

struct AdjustContext {
    asset: AssetId,
    mode: SystemMode,
    coll_delta: Delta,
    debt_delta: Delta,
    /// Debt minted to or burned from the borrower, excluding the fee.
    debt_change: Wad,
    fee: FeeQuote,
    new_coll: Wad,
    new_debt: Wad,
    new_icr: Wad,
}

struct CloseContext {
    asset: AssetId,
    coll: Wad,
    repayment: Wad,
}

/// The position engine. Holds only the sealed setup; all state lives in the collaborators.
#[derive(Debug, Clone)]
pub struct BorrowerOperations {
    setup: Arc<ProtocolSetup>,
}

impl BorrowerOperations {
    pub fn new(setup: Arc<ProtocolSetup>) -> Self {
        Self { setup }
    }

    pub fn setup(&self) -> &ProtocolSetup {
        &self.setup
    }

    /// Net debt plus the gas compensation reserve.
    pub fn composite_debt(&self, net_debt: Wad) -> Result<Wad, EngineError> {
        net_debt
            .checked_add(self.setup.params().gas_compensation)
            .ok_or(EngineError::AmountOverflow)
    }

    pub fn net_debt(&self, composite_debt: Wad) -> Wad {
        composite_debt.saturating_sub(self.setup.params().gas_compensation)
    }

    // ---- open -------------------------------------------------------------------------

    pub fn open_trove(
        &self,
        c: &mut Collaborators<'_>,
        caller: &Address,
        req: &OpenTroveRequest,
    ) -> Result<OperationReceipt, EngineError> {
        let ctx = self.open_checks(c, caller, req).map_err(|err| {
            warn!("openTrove rejected for {}: {}", caller, err);
            err
        })?;
        let params = self.setup.params();

        // Effects
        if !ctx.mode.is_recovery() {
            c.troves.decay_base_rate_from_borrowing();
        }
        c.troves.set_status(caller, TroveStatus::Active);
        c.troves.set_collateral_asset(caller, ctx.asset);
        let coll = c.troves.increase_collateral(caller, req.coll);
        let debt = c.troves.increase_debt(caller, ctx.composite_debt);
        let stake = c.troves.update_stake_and_totals(caller);
        c.sorted.insert(caller, ctx.nicr, &req.hints);
        let array_index = c.troves.add_owner_to_registry(caller);

        let mut events = vec![
            EngineEvent::TroveCreated {
                owner: caller.clone(),
                array_index,
            },
            EngineEvent::TroveUpdated {
                owner: caller.clone(),
                debt,
                coll,
                stake,
                operation: BorrowerOperation::OpenTrove,
            },
        ];

        // Interactions
        if !ctx.fee.fee.is_zero() {
            c.fee_sink.accumulate_fee(ctx.fee.fee);
            c.stable.mint(self.setup.fee_sink(), ctx.fee.fee);
            events.push(EngineEvent::BorrowingFeePaid {
                owner: caller.clone(),
                fee: ctx.fee.fee,
            });
        }
        c.active_pool.receive_collateral(ctx.asset, req.coll);
        c.active_pool.increase_debt(ctx.net_debt);
        c.stable.mint(caller, req.debt);
        c.active_pool.increase_debt(params.gas_compensation);
        c.stable.mint(self.setup.gas_pool(), params.gas_compensation);

        info!(
            "Opened trove for {}: coll={}, debt={}, fee={}, ICR={}",
            caller, coll, debt, ctx.fee.fee, ctx.icr
        );
        Ok(OperationReceipt {
            owner: caller.clone(),
            operation: BorrowerOperation::OpenTrove,
            coll,
            debt,
            stake,
            icr: ctx.icr,
            nicr: ctx.nicr,
            fee: ctx.fee.fee,
            events,
        })
    }

    fn open_checks(
        &self,
        c: &Collaborators<'_>,
        caller: &Address,
        req: &OpenTroveRequest,
    ) -> Result<OpenContext, EngineError> {
        let params = self.setup.params();
        let asset = self
            .setup
            .registry()
            .resolve(req.asset)
            .ok_or(EngineError::InvalidCollateralAsset)?;

        let snapshot = self.snapshot(c)?;
        let mode = SystemMode::from_tcr(snapshot.tcr(), params);
        fee::check_max_fee_percentage(params, mode, req.max_fee_percentage)?;

        if self.setup.is_system_account(caller) {
            return Err(EngineError::CallerNotAuthorized);
        }
        if c.troves.status(caller).is_active() {
            return Err(EngineError::PositionAlreadyActive);
        }
        if req.coll.is_zero() {
            return Err(EngineError::ZeroOrInvalidAmount);
        }

        let fee = fee::quote_fee(
            params,
            mode,
            c.troves.decayed_base_rate(),
            req.debt,
            req.max_fee_percentage,
        )?;
        let net_debt = req
            .debt
            .checked_add(fee.fee)
            .ok_or(EngineError::AmountOverflow)?;
        if net_debt < params.min_net_debt {
            return Err(EngineError::BelowMinimumNetDebt);
        }
        let composite_debt = self.composite_debt(net_debt)?;
        assert!(!composite_debt.is_zero(), "composite debt must be positive");

        let price = snapshot.price(asset);
        let icr = ratio::collateral_ratio(req.coll, composite_debt, price);
        let nicr = ratio::nominal_cr(req.coll, composite_debt);
        let new_tcr = snapshot.tcr_with(
            asset,
            Delta::Increase(req.coll),
            Delta::Increase(composite_debt),
        )?;
        debug!(
            "openTrove figures for {}: mode={:?}, fee={}, composite={}, ICR={}, new TCR={}",
            caller, mode, fee.fee, composite_debt, icr, new_tcr
        );
        admissibility::check_open(params, mode, icr, new_tcr)?;

        Ok(OpenContext {
            asset,
            mode,
            fee,
            net_debt,
            composite_debt,
            icr,
            nicr,
        })
    }

    // ---- adjust -----------------------------------------------------------------------

    pub fn adjust_trove(
        &self,
        c: &mut Collaborators<'_>,
        caller: &Address,
        req: &AdjustTroveRequest,
    ) -> Result<OperationReceipt, EngineError> {
        let ctx = self.adjust_checks(c, caller, req).map_err(|err| {
            warn!("adjustTrove rejected for {}: {}", req.borrower, err);
            err
        })?;
        let borrower = &req.borrower;

        // Effects
        c.troves.apply_pending_rewards(borrower);
        if ctx.debt_delta.is_increase() && !ctx.mode.is_recovery() {
            c.troves.decay_base_rate_from_borrowing();
        }
        let coll = match ctx.coll_delta {
            Delta::Increase(amount) if !amount.is_zero() => {
                c.troves.increase_collateral(borrower, amount)
            }
            Delta::Decrease(amount) if !amount.is_zero() => {
                c.troves.decrease_collateral(borrower, amount)
            }
            _ => c.troves.collateral(borrower),
        };
        let debt = match ctx.debt_delta {
            Delta::Increase(amount) if !amount.is_zero() => c.troves.increase_debt(borrower, amount),
            Delta::Decrease(amount) if !amount.is_zero() => c.troves.decrease_debt(borrower, amount),
            _ => c.troves.debt(borrower),
        };
        assert_eq!(
            (coll, debt),
            (ctx.new_coll, ctx.new_debt),
            "trove ledger diverged from the checked snapshot"
        );
        let stake = c.troves.update_stake_and_totals(borrower);
        let nicr = ratio::nominal_cr(coll, debt);
        c.sorted.reinsert(borrower, nicr, &req.hints);

        let mut events = vec![EngineEvent::TroveUpdated {
            owner: borrower.clone(),
            debt,
            coll,
            stake,
            operation: BorrowerOperation::AdjustTrove,
        }];

        // Interactions
        if !ctx.fee.fee.is_zero() {
            c.fee_sink.accumulate_fee(ctx.fee.fee);
            c.stable.mint(self.setup.fee_sink(), ctx.fee.fee);
            events.push(EngineEvent::BorrowingFeePaid {
                owner: borrower.clone(),
                fee: ctx.fee.fee,
            });
        }
        match ctx.debt_delta {
            Delta::Increase(net_change) if !net_change.is_zero() => {
                c.active_pool.increase_debt(net_change);
                c.stable.mint(borrower, ctx.debt_change);
            }
            Delta::Decrease(repayment) if !repayment.is_zero() => {
                c.active_pool.decrease_debt(repayment);
                c.stable.burn(borrower, repayment);
            }
            _ => {}
        }
        match ctx.coll_delta {
            Delta::Increase(amount) if !amount.is_zero() => {
                c.active_pool.receive_collateral(ctx.asset, amount);
            }
            Delta::Decrease(amount) if !amount.is_zero() => {
                c.active_pool.send_collateral(borrower, ctx.asset, amount);
            }
            _ => {}
        }

        info!(
            "Adjusted trove of {} (caller {}): coll={}, debt={}, fee={}, ICR={}",
            borrower, caller, coll, debt, ctx.fee.fee, ctx.new_icr
        );
        Ok(OperationReceipt {
            owner: borrower.clone(),
            operation: BorrowerOperation::AdjustTrove,
            coll,
            debt,
            stake,
            icr: ctx.new_icr,
            nicr,
            fee: ctx.fee.fee,
            events,
        })
    }

    fn adjust_checks(
        &self,
        c: &Collaborators<'_>,
        caller: &Address,
        req: &AdjustTroveRequest,
    ) -> Result<AdjustContext, EngineError> {
        let params = self.setup.params();
        let borrower = &req.borrower;

        if !req.coll_top_up.is_zero() && !req.coll_withdrawal.is_zero() {
            return Err(EngineError::BothCollateralDirectionsNonZero);
        }

        let snapshot = self.snapshot(c)?;
        let mode = SystemMode::from_tcr(snapshot.tcr(), params);

        if req.is_debt_increase {
            fee::check_max_fee_percentage(params, mode, req.max_fee_percentage)?;
            if req.debt_change.is_zero() {
                return Err(EngineError::ZeroOrInvalidAmount);
            }
        }
        if req.coll_top_up.is_zero() && req.coll_withdrawal.is_zero() && req.debt_change.is_zero()
        {
            return Err(EngineError::NoEffectiveChange);
        }
        if !c.troves.status(borrower).is_active() {
            return Err(EngineError::PositionNotActive);
        }
        let backstop_top_up = caller == self.setup.backstop_pool()
            && !req.coll_top_up.is_zero()
            && req.debt_change.is_zero();
        if caller != borrower && !backstop_top_up {
            return Err(EngineError::CallerNotAuthorized);
        }

        let asset = c
            .troves
            .collateral_asset(borrower)
            .ok_or(EngineError::InvalidCollateralAsset)?;
        let pending = c.troves.pending_rewards(borrower);
        let coll = c
            .troves
            .collateral(borrower)
            .checked_add(pending.coll)
            .ok_or(EngineError::AmountOverflow)?;
        let debt = c
            .troves
            .debt(borrower)
            .checked_add(pending.debt)
            .ok_or(EngineError::AmountOverflow)?;

        let fee = if req.is_debt_increase {
            fee::quote_fee(
                params,
                mode,
                c.troves.decayed_base_rate(),
                req.debt_change,
                req.max_fee_percentage,
            )?
        } else {
            FeeQuote::NONE
        };
        let net_debt_change = req
            .debt_change
            .checked_add(fee.fee)
            .ok_or(EngineError::AmountOverflow)?;

        let is_coll_withdrawal = !req.coll_withdrawal.is_zero();
        if req.coll_withdrawal > coll {
            return Err(EngineError::WithdrawalExceedsCollateral);
        }
        let repayable = debt.saturating_sub(params.gas_compensation);
        let is_repayment = !req.is_debt_increase && !req.debt_change.is_zero();
        if is_repayment && req.debt_change > repayable {
            return Err(EngineError::RepaymentExceedsAllowedDebt);
        }

        let coll_delta = if is_coll_withdrawal {
            Delta::Decrease(req.coll_withdrawal)
        } else {
            Delta::Increase(req.coll_top_up)
        };
        let debt_delta = Delta::new(net_debt_change, req.is_debt_increase);

        let price = snapshot.price(asset);
        let old_icr = ratio::collateral_ratio(coll, debt, price);
        let new_icr = ratio::new_icr(coll, debt, coll_delta, debt_delta, price)?;
        let new_tcr = snapshot.tcr_with(asset, coll_delta, debt_delta)?;
        debug!(
            "adjustTrove figures for {}: mode={:?}, fee={}, old ICR={}, new ICR={}, new TCR={}",
            borrower, mode, fee.fee, old_icr, new_icr, new_tcr
        );
        admissibility::check_adjustment(
            params,
            mode,
            &AdjustmentCheck {
                is_coll_withdrawal,
                is_debt_increase: req.is_debt_increase,
                old_icr,
                new_icr,
                new_tcr,
            },
        )?;

        if is_repayment {
            if repayable - req.debt_change < params.min_net_debt {
                return Err(EngineError::BelowMinimumNetDebt);
            }
            if c.stable.balance_of(borrower) < req.debt_change {
                return Err(EngineError::InsufficientStableAssetBalance);
            }
        }

        let new_coll = coll_delta.apply(coll).ok_or(EngineError::AmountOverflow)?;
        let new_debt = debt_delta.apply(debt).ok_or(EngineError::AmountOverflow)?;
        assert!(!new_debt.is_zero(), "composite debt must be positive");

        Ok(AdjustContext {
            asset,
            mode,
            coll_delta,
            debt_delta,
            debt_change: req.debt_change,
            fee,
            new_coll,
            new_debt,
            new_icr,
        })
    }

    pub fn add_collateral(
        &self,
        c: &mut Collaborators<'_>,
        caller: &Address,
        amount: Wad,
        hints: Hints,
    ) -> Result<OperationReceipt, EngineError> {
        let req = AdjustTroveRequest {
            coll_top_up: amount,
            hints,
            ..AdjustTroveRequest::for_borrower(caller.clone())
        };
        self.adjust_trove(c, caller, &req)
    }

    /// Backstop-pool top-up of `borrower`'s collateral with its compensation gains.
    pub fn move_backstop_gain_to_trove(
        &self,
        c: &mut Collaborators<'_>,
        caller: &Address,
        borrower: &Address,
        amount: Wad,
        hints: Hints,
    ) -> Result<OperationReceipt, EngineError> {
        if caller != self.setup.backstop_pool() {
            warn!("moveBackstopGainToTrove rejected: {} is not the backstop pool", caller);
            return Err(EngineError::CallerNotAuthorized);
        }
        let req = AdjustTroveRequest {
            coll_top_up: amount,
            hints,
            ..AdjustTroveRequest::for_borrower(borrower.clone())
        };
        self.adjust_trove(c, caller, &req)
    }

    pub fn withdraw_collateral(
        &self,
        c: &mut Collaborators<'_>,
        caller: &Address,
        amount: Wad,
        hints: Hints,
    ) -> Result<OperationReceipt, EngineError> {
        let req = AdjustTroveRequest {
            coll_withdrawal: amount,
            hints,
            ..AdjustTroveRequest::for_borrower(caller.clone())
        };
        self.adjust_trove(c, caller, &req)
    }

    pub fn withdraw_debt(
        &self,
        c: &mut Collaborators<'_>,
        caller: &Address,
        amount: Wad,
        max_fee_percentage: Wad,
        hints: Hints,
    ) -> Result<OperationReceipt, EngineError> {
        let req = AdjustTroveRequest {
            debt_change: amount,
            is_debt_increase: true,
            max_fee_percentage,
            hints,
            ..AdjustTroveRequest::for_borrower(caller.clone())
        };
        self.adjust_trove(c, caller, &req)
    }

    pub fn repay_debt(
        &self,
        c: &mut Collaborators<'_>,
        caller: &Address,
        amount: Wad,
        hints: Hints,
    ) -> Result<OperationReceipt, EngineError> {
        let req = AdjustTroveRequest {
            debt_change: amount,
            hints,
            ..AdjustTroveRequest::for_borrower(caller.clone())
        };
        self.adjust_trove(c, caller, &req)
    }

    // ---- close ------------------------------------------------------------------------

    pub fn close_trove(
        &self,
        c: &mut Collaborators<'_>,
        caller: &Address,
    ) -> Result<OperationReceipt, EngineError> {
        let ctx = self.close_checks(c, caller).map_err(|err| {
            warn!("closeTrove rejected for {}: {}", caller, err);
            err
        })?;
        let gas_compensation = self.setup.params().gas_compensation;

        // Effects
        c.troves.apply_pending_rewards(caller);
        c.troves.remove_stake(caller);
        c.troves.close(caller);
        c.sorted.remove(caller);
        let events = vec![EngineEvent::TroveUpdated {
            owner: caller.clone(),
            debt: Wad::ZERO,
            coll: Wad::ZERO,
            stake: Wad::ZERO,
            operation: BorrowerOperation::CloseTrove,
        }];

        // Interactions
        c.stable.burn(caller, ctx.repayment);
        c.active_pool.decrease_debt(ctx.repayment);
        c.stable.burn(self.setup.gas_pool(), gas_compensation);
        c.active_pool.decrease_debt(gas_compensation);
        c.active_pool.send_collateral(caller, ctx.asset, ctx.coll);

        info!(
            "Closed trove of {}: repaid={}, returned coll={}",
            caller, ctx.repayment, ctx.coll
        );
        Ok(OperationReceipt {
            owner: caller.clone(),
            operation: BorrowerOperation::CloseTrove,
            coll: Wad::ZERO,
            debt: Wad::ZERO,
            stake: Wad::ZERO,
            icr: Wad::MAX,
            nicr: Wad::MAX,
            fee: Wad::ZERO,
            events,
        })
    }

    fn close_checks(
        &self,
        c: &Collaborators<'_>,
        caller: &Address,
    ) -> Result<CloseContext, EngineError> {
        let params = self.setup.params();
        if !c.troves.status(caller).is_active() {
            return Err(EngineError::PositionNotActive);
        }
        let snapshot = self.snapshot(c)?;
        let mode = SystemMode::from_tcr(snapshot.tcr(), params);
        if mode.is_recovery() {
            return Err(EngineError::UnauthorizedDuringRecoveryMode);
        }

        let asset = c
            .troves
            .collateral_asset(caller)
            .ok_or(EngineError::InvalidCollateralAsset)?;
        let pending = c.troves.pending_rewards(caller);
        let coll = c
            .troves
            .collateral(caller)
            .checked_add(pending.coll)
            .ok_or(EngineError::AmountOverflow)?;
        let debt = c
            .troves
            .debt(caller)
            .checked_add(pending.debt)
            .ok_or(EngineError::AmountOverflow)?;
        let repayment = debt
            .checked_sub(params.gas_compensation)
            .ok_or(EngineError::AmountOverflow)?;

        let new_tcr = snapshot.tcr_with(asset, Delta::Decrease(coll), Delta::Decrease(debt))?;
        debug!("closeTrove figures for {}: new TCR={}", caller, new_tcr);
        admissibility::check_close(params, mode, new_tcr)?;

        if c.stable.balance_of(caller) < repayment {
            return Err(EngineError::InsufficientStableAssetBalance);
        }
        if c.stable.balance_of(self.setup.gas_pool()) < params.gas_compensation {
            return Err(EngineError::GasCompensationReserveShortfall);
        }

        Ok(CloseContext {
            asset,
            coll,
            repayment,
        })
    }

    // ---- claim ------------------------------------------------------------------------

    /// Pay out surplus collateral left for `caller` by a past liquidation or redemption.
    pub fn claim_collateral(
        &self,
        c: &mut Collaborators<'_>,
        caller: &Address,
    ) -> Result<ClaimReceipt, EngineError> {
        if c.surplus.claimable(caller).is_empty() {
            warn!("claimCollateral rejected for {}: nothing to claim", caller);
            return Err(EngineError::NoCollateralToClaim);
        }

        let claimed: Vec<ClaimedCollateral> = c
            .surplus
            .claim(caller)
            .into_iter()
            .map(|(asset, amount)| ClaimedCollateral { asset, amount })
            .collect();
        let events = claimed
            .iter()
            .map(|entry| EngineEvent::CollateralClaimed {
                owner: caller.clone(),
                asset: entry.asset,
                amount: entry.amount,
            })
            .collect();

        info!("Claimed {} surplus collateral balance(s) for {}", claimed.len(), caller);
        Ok(ClaimReceipt {
            owner: caller.clone(),
            claimed,
            events,
        })
    }

    // ---- reads ------------------------------------------------------------------------

    pub fn system_status(&self, c: &Collaborators<'_>) -> Result<SystemStatus, EngineError> {
        let snapshot = self.snapshot(c)?;
        let tcr = snapshot.tcr();
        let mode = SystemMode::from_tcr(tcr, self.setup.params());
        let assets = self
            .setup
            .registry()
            .ids()
            .map(|asset| AssetTotals {
                asset,
                symbol: self
                    .setup
                    .registry()
                    .get(asset)
                    .map(|a| a.symbol.clone())
                    .unwrap_or_default(),
                price: snapshot.price(asset),
                collateral: snapshot.collateral(asset),
            })
            .collect();
        Ok(SystemStatus {
            tcr,
            mode,
            recovery_mode: mode.is_recovery(),
            total_debt: snapshot.debt(),
            assets,
        })
    }

    /// Current figures of `owner`'s trove, pending rewards included.
    pub fn trove_view(
        &self,
        c: &Collaborators<'_>,
        owner: &Address,
    ) -> Result<TroveView, EngineError> {
        let status = c.troves.status(owner);
        let asset = c.troves.collateral_asset(owner);
        let pending = c.troves.pending_rewards(owner);
        let coll = c.troves.collateral(owner).saturating_add(pending.coll);
        let debt = c.troves.debt(owner).saturating_add(pending.debt);

        let icr = match asset {
            Some(asset) if status.is_active() => {
                let prices = c.oracle.fetch_prices()?;
                let price = prices
                    .get(asset)
                    .ok_or(EngineError::InvalidCollateralAsset)?;
                ratio::collateral_ratio(coll, debt, price)
            }
            _ => Wad::MAX,
        };

        Ok(TroveView {
            owner: owner.clone(),
            status,
            asset,
            coll,
            debt,
            stake: c.troves.stake(owner),
            pending_coll: pending.coll,
            pending_debt: pending.debt,
            icr,
            nicr: ratio::nominal_cr(coll, debt),
        })
    }

    fn snapshot(&self, c: &Collaborators<'_>) -> Result<SystemSnapshot, EngineError> {
        SystemSnapshot::capture(self.setup.registry(), &*c.active_pool, c.oracle)
    }
}
