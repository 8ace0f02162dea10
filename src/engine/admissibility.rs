//! Mode-dependent admissibility rules.
//!
//! The system mode is derived from the TCR snapshot taken at the start of every call and
//! is never stored.

use crate::domain::Wad;
use crate::engine::{EngineError, ProtocolParams};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum SystemMode {
    Normal,
    Recovery,
}

impl SystemMode {
    /// Recovery Mode iff `tcr < ccr`.
    pub fn from_tcr(tcr: Wad, params: &ProtocolParams) -> Self {
        if tcr < params.ccr {
            SystemMode::Recovery
        } else {
            SystemMode::Normal
        }
    }

    pub fn is_recovery(&self) -> bool {
        matches!(self, SystemMode::Recovery)
    }
}

pub fn check_open(
    params: &ProtocolParams,
    mode: SystemMode,
    icr: Wad,
    new_tcr: Wad,
) -> Result<(), EngineError> {
    match mode {
        SystemMode::Recovery => {
            if icr < params.ccr {
                return Err(EngineError::IcrBelowRequiredThreshold);
            }
        }
        SystemMode::Normal => {
            if icr < params.mcr {
                return Err(EngineError::IcrBelowRequiredThreshold);
            }
            if new_tcr < params.ccr {
                return Err(EngineError::TcrBelowCriticalRatio);
            }
        }
    }
    Ok(())
}

/// Figures of a proposed adjustment the mode rules look at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AdjustmentCheck {
    pub is_coll_withdrawal: bool,
    pub is_debt_increase: bool,
    pub old_icr: Wad,
    pub new_icr: Wad,
    pub new_tcr: Wad,
}

pub fn check_adjustment(
    params: &ProtocolParams,
    mode: SystemMode,
    check: &AdjustmentCheck,
) -> Result<(), EngineError> {
    match mode {
        SystemMode::Recovery => {
            if check.is_coll_withdrawal {
                return Err(EngineError::RecoveryModeWithdrawalForbidden);
            }
            if check.is_debt_increase {
                if check.new_icr < params.ccr {
                    return Err(EngineError::IcrBelowRequiredThreshold);
                }
                if check.new_icr < check.old_icr {
                    return Err(EngineError::IcrNotImproved);
                }
            }
        }
        SystemMode::Normal => {
            if check.new_icr < params.mcr {
                return Err(EngineError::IcrBelowRequiredThreshold);
            }
            if check.new_tcr < params.ccr {
                return Err(EngineError::TcrBelowCriticalRatio);
            }
        }
    }
    Ok(())
}

pub fn check_close(
    params: &ProtocolParams,
    mode: SystemMode,
    new_tcr: Wad,
) -> Result<(), EngineError> {
    if mode.is_recovery() {
        return Err(EngineError::UnauthorizedDuringRecoveryMode);
    }
    if new_tcr < params.ccr {
        return Err(EngineError::TcrBelowCriticalRatio);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ratio(num: u64, den: u64) -> Wad {
        Wad::from_ratio(num, den)
    }

    fn adjustment(withdrawal: bool, increase: bool, old: Wad, new: Wad) -> AdjustmentCheck {
        AdjustmentCheck {
            is_coll_withdrawal: withdrawal,
            is_debt_increase: increase,
            old_icr: old,
            new_icr: new,
            new_tcr: ratio(2, 1),
        }
    }

    #[test]
    fn test_mode_from_tcr() {
        let params = ProtocolParams::default();
        assert_eq!(SystemMode::from_tcr(ratio(14, 10), &params), SystemMode::Recovery);
        assert_eq!(SystemMode::from_tcr(ratio(15, 10), &params), SystemMode::Normal);
        assert_eq!(SystemMode::from_tcr(Wad::MAX, &params), SystemMode::Normal);
    }

    #[test]
    fn test_open_thresholds_per_mode() {
        let params = ProtocolParams::default();
        assert!(check_open(&params, SystemMode::Normal, ratio(12, 10), ratio(2, 1)).is_ok());
        assert_eq!(
            check_open(&params, SystemMode::Normal, ratio(12, 10), ratio(14, 10)),
            Err(EngineError::TcrBelowCriticalRatio)
        );
        assert_eq!(
            check_open(&params, SystemMode::Recovery, ratio(14, 10), ratio(14, 10)),
            Err(EngineError::IcrBelowRequiredThreshold)
        );
        assert!(check_open(&params, SystemMode::Recovery, ratio(16, 10), ratio(14, 10)).is_ok());
    }

    #[test]
    fn test_recovery_mode_forbids_withdrawal_at_any_icr() {
        let params = ProtocolParams::default();
        let check = adjustment(true, false, ratio(5, 1), ratio(4, 1));
        assert_eq!(
            check_adjustment(&params, SystemMode::Recovery, &check),
            Err(EngineError::RecoveryModeWithdrawalForbidden)
        );
    }

    #[test]
    fn test_recovery_mode_debt_increase_must_improve_icr() {
        let params = ProtocolParams::default();
        let worse = adjustment(false, true, ratio(3, 1), ratio(2, 1));
        assert_eq!(
            check_adjustment(&params, SystemMode::Recovery, &worse),
            Err(EngineError::IcrNotImproved)
        );
        let below_ccr = adjustment(false, true, ratio(12, 10), ratio(13, 10));
        assert_eq!(
            check_adjustment(&params, SystemMode::Recovery, &below_ccr),
            Err(EngineError::IcrBelowRequiredThreshold)
        );
        let better = adjustment(false, true, ratio(15, 10), ratio(16, 10));
        assert!(check_adjustment(&params, SystemMode::Recovery, &better).is_ok());
    }

    #[test]
    fn test_recovery_mode_allows_pure_repayment_below_mcr() {
        let params = ProtocolParams::default();
        let check = adjustment(false, false, ratio(10, 10), ratio(105, 100));
        assert!(check_adjustment(&params, SystemMode::Recovery, &check).is_ok());
    }

    #[test]
    fn test_close_rules() {
        let params = ProtocolParams::default();
        assert_eq!(
            check_close(&params, SystemMode::Recovery, Wad::MAX),
            Err(EngineError::UnauthorizedDuringRecoveryMode)
        );
        assert_eq!(
            check_close(&params, SystemMode::Normal, ratio(14, 10)),
            Err(EngineError::TcrBelowCriticalRatio)
        );
        assert!(check_close(&params, SystemMode::Normal, ratio(15, 10)).is_ok());
    }
}
