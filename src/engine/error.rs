//! Named rejections of borrower operations.

use crate::collaborators::OracleError;
use thiserror::Error;

/// Every way a borrower operation can be rejected. A rejection leaves no side effects.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    #[error("collateral asset is not registered")]
    InvalidCollateralAsset,
    #[error("trove is already active")]
    PositionAlreadyActive,
    #[error("trove does not exist or is closed")]
    PositionNotActive,
    #[error("amount must be non-zero")]
    ZeroOrInvalidAmount,
    #[error("cannot withdraw and add collateral in the same call")]
    BothCollateralDirectionsNonZero,
    #[error("there must be either a collateral change or a debt change")]
    NoEffectiveChange,
    #[error("net debt must be at least the minimum")]
    BelowMinimumNetDebt,
    #[error("collateral ratio is below the required threshold")]
    IcrBelowRequiredThreshold,
    #[error("operation would leave the system collateral ratio below the critical ratio")]
    TcrBelowCriticalRatio,
    #[error("collateral withdrawal is not permitted in Recovery Mode")]
    RecoveryModeWithdrawalForbidden,
    #[error("cannot decrease the collateral ratio in Recovery Mode")]
    IcrNotImproved,
    #[error("repayment exceeds the trove's repayable debt")]
    RepaymentExceedsAllowedDebt,
    #[error("caller does not hold enough of the stable asset")]
    InsufficientStableAssetBalance,
    #[error("fee exceeded the provided maximum")]
    FeeExceedsCallerMaximum,
    #[error("caller is not authorized for this trove")]
    CallerNotAuthorized,
    #[error("operation not permitted during Recovery Mode")]
    UnauthorizedDuringRecoveryMode,
    #[error("max fee percentage is out of range")]
    InvalidMaxFeePercentage,
    #[error("collateral withdrawal exceeds the trove's collateral")]
    WithdrawalExceedsCollateral,
    #[error("gas compensation reserve cannot cover this trove")]
    GasCompensationReserveShortfall,
    #[error("no collateral available to claim")]
    NoCollateralToClaim,
    #[error("amount out of range")]
    AmountOverflow,
    #[error("price unavailable: {0}")]
    PriceUnavailable(OracleError),
}

impl EngineError {
    /// Stable machine-readable code for API clients.
    pub fn code(&self) -> &'static str {
        match self {
            EngineError::InvalidCollateralAsset => "INVALID_COLLATERAL_ASSET",
            EngineError::PositionAlreadyActive => "POSITION_ALREADY_ACTIVE",
            EngineError::PositionNotActive => "POSITION_NOT_ACTIVE",
            EngineError::ZeroOrInvalidAmount => "ZERO_OR_INVALID_AMOUNT",
            EngineError::BothCollateralDirectionsNonZero => "BOTH_COLLATERAL_DIRECTIONS_NON_ZERO",
            EngineError::NoEffectiveChange => "NO_EFFECTIVE_CHANGE",
            EngineError::BelowMinimumNetDebt => "BELOW_MINIMUM_NET_DEBT",
            EngineError::IcrBelowRequiredThreshold => "ICR_BELOW_REQUIRED_THRESHOLD",
            EngineError::TcrBelowCriticalRatio => "TCR_BELOW_CRITICAL_RATIO",
            EngineError::RecoveryModeWithdrawalForbidden => "RECOVERY_MODE_WITHDRAWAL_FORBIDDEN",
            EngineError::IcrNotImproved => "ICR_NOT_IMPROVED",
            EngineError::RepaymentExceedsAllowedDebt => "REPAYMENT_EXCEEDS_ALLOWED_DEBT",
            EngineError::InsufficientStableAssetBalance => "INSUFFICIENT_STABLE_ASSET_BALANCE",
            EngineError::FeeExceedsCallerMaximum => "FEE_EXCEEDS_CALLER_MAXIMUM",
            EngineError::CallerNotAuthorized => "CALLER_NOT_AUTHORIZED",
            EngineError::UnauthorizedDuringRecoveryMode => "UNAUTHORIZED_DURING_RECOVERY_MODE",
            EngineError::InvalidMaxFeePercentage => "INVALID_MAX_FEE_PERCENTAGE",
            EngineError::WithdrawalExceedsCollateral => "WITHDRAWAL_EXCEEDS_COLLATERAL",
            EngineError::GasCompensationReserveShortfall => "GAS_COMPENSATION_RESERVE_SHORTFALL",
            EngineError::NoCollateralToClaim => "NO_COLLATERAL_TO_CLAIM",
            EngineError::AmountOverflow => "AMOUNT_OVERFLOW",
            EngineError::PriceUnavailable(_) => "PRICE_UNAVAILABLE",
        }
    }
}

impl From<OracleError> for EngineError {
    fn from(err: OracleError) -> Self {
        EngineError::PriceUnavailable(err)
    }
}
