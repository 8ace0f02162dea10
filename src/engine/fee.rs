//! Borrowing fee: floor plus decayed base rate, capped, and bounded by the caller's maximum.

use crate::engine::{EngineError, ProtocolParams, SystemMode};
use crate::domain::Wad;

/// Fee charged on a debt increase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeeQuote {
    pub rate: Wad,
    pub fee: Wad,
}

impl FeeQuote {
    pub const NONE: FeeQuote = FeeQuote {
        rate: Wad::ZERO,
        fee: Wad::ZERO,
    };
}

/// `min(floor + base_rate, max_borrowing_fee)`.
pub fn borrowing_rate(params: &ProtocolParams, base_rate: Wad) -> Wad {
    params
        .borrowing_fee_floor
        .checked_add(base_rate)
        .map_or(params.max_borrowing_fee, |rate| rate.min(params.max_borrowing_fee))
}

pub fn borrowing_fee(params: &ProtocolParams, base_rate: Wad, debt: Wad) -> Wad {
    borrowing_rate(params, base_rate).mul(debt)
}

/// Validate the caller's maximum acceptable fee for the current mode.
pub fn check_max_fee_percentage(
    params: &ProtocolParams,
    mode: SystemMode,
    max_fee_percentage: Wad,
) -> Result<(), EngineError> {
    let in_range = match mode {
        SystemMode::Recovery => max_fee_percentage <= Wad::ONE,
        SystemMode::Normal => {
            max_fee_percentage >= params.borrowing_fee_floor && max_fee_percentage <= Wad::ONE
        }
    };
    if in_range {
        Ok(())
    } else {
        Err(EngineError::InvalidMaxFeePercentage)
    }
}

/// Fee for borrowing `debt` in `mode`. Recovery Mode borrowing is free.
///
/// # Errors
/// `FeeExceedsCallerMaximum` when the fee is above `max_fee_percentage × debt`.
pub fn quote_fee(
    params: &ProtocolParams,
    mode: SystemMode,
    base_rate: Wad,
    debt: Wad,
    max_fee_percentage: Wad,
) -> Result<FeeQuote, EngineError> {
    if mode.is_recovery() {
        return Ok(FeeQuote::NONE);
    }
    let rate = borrowing_rate(params, base_rate);
    let fee = rate.mul(debt);
    if fee > max_fee_percentage.mul(debt) {
        return Err(EngineError::FeeExceedsCallerMaximum);
    }
    Ok(FeeQuote { rate, fee })
}
