//! Protocol parameters and the sealed deployment context handed to the engine.

use crate::domain::{Address, CollateralRegistry, Wad};
use thiserror::Error;
use tracing::info;

/// Solvency and fee parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProtocolParams {
    /// Minimum collateral ratio in Normal Mode (MCR).
    pub mcr: Wad,
    /// Critical system collateral ratio (CCR); below it the system is in Recovery Mode.
    pub ccr: Wad,
    /// Debt reserved per trove to compensate liquidators.
    pub gas_compensation: Wad,
    /// Minimum net debt of an active trove.
    pub min_net_debt: Wad,
    pub borrowing_fee_floor: Wad,
    pub max_borrowing_fee: Wad,
}

impl Default for ProtocolParams {
    fn default() -> Self {
        Self {
            mcr: Wad::from_ratio(11, 10),
            ccr: Wad::from_ratio(3, 2),
            gas_compensation: Wad::from_units(200),
            min_net_debt: Wad::from_units(1_800),
            borrowing_fee_floor: Wad::from_ratio(5, 1_000),
            max_borrowing_fee: Wad::from_ratio(5, 100),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SetupError {
    #[error("MCR must be above 100%")]
    McrTooLow,
    #[error("CCR must not be below MCR")]
    CcrBelowMcr,
    #[error("minimum net debt must be positive")]
    ZeroMinNetDebt,
    #[error("borrowing fee floor must not exceed the maximum borrowing fee")]
    FeeFloorAboveMax,
    #[error("maximum borrowing fee must not exceed 100%")]
    MaxFeeAboveOne,
    #[error("missing address: {0}")]
    MissingAddress(&'static str),
    #[error("{0} and {1} must be distinct accounts")]
    DuplicateAddress(&'static str, &'static str),
}

impl ProtocolParams {
    pub fn validate(&self) -> Result<(), SetupError> {
        if self.mcr <= Wad::ONE {
            return Err(SetupError::McrTooLow);
        }
        if self.ccr < self.mcr {
            return Err(SetupError::CcrBelowMcr);
        }
        if self.min_net_debt.is_zero() {
            return Err(SetupError::ZeroMinNetDebt);
        }
        if self.max_borrowing_fee > Wad::ONE {
            return Err(SetupError::MaxFeeAboveOne);
        }
        if self.borrowing_fee_floor > self.max_borrowing_fee {
            return Err(SetupError::FeeFloorAboveMax);
        }
        Ok(())
    }
}

/// Immutable deployment context: parameters, collateral registry and well-known accounts.
///
/// Only obtainable through [`ProtocolSetupBuilder::seal`]; it has no setters.
#[derive(Debug, Clone)]
pub struct ProtocolSetup {
    params: ProtocolParams,
    registry: CollateralRegistry,
    gas_pool: Address,
    fee_sink: Address,
    backstop_pool: Address,
}

impl ProtocolSetup {
    pub fn builder(registry: CollateralRegistry) -> ProtocolSetupBuilder {
        ProtocolSetupBuilder {
            params: ProtocolParams::default(),
            registry,
            gas_pool: None,
            fee_sink: None,
            backstop_pool: None,
        }
    }

    pub fn params(&self) -> &ProtocolParams {
        &self.params
    }

    pub fn registry(&self) -> &CollateralRegistry {
        &self.registry
    }

    /// Account holding the gas-compensation reserve of every trove.
    pub fn gas_pool(&self) -> &Address {
        &self.gas_pool
    }

    /// Account receiving minted borrowing fees.
    pub fn fee_sink(&self) -> &Address {
        &self.fee_sink
    }

    /// Backstop (stability) pool allowed to top up collateral on a borrower's behalf.
    pub fn backstop_pool(&self) -> &Address {
        &self.backstop_pool
    }

    /// Whether `address` is one of the protocol's own accounts, which never own troves.
    pub fn is_system_account(&self, address: &Address) -> bool {
        address == &self.gas_pool || address == &self.fee_sink || address == &self.backstop_pool
    }
}

/// One-shot builder for [`ProtocolSetup`].
#[derive(Debug)]
pub struct ProtocolSetupBuilder {
    params: ProtocolParams,
    registry: CollateralRegistry,
    gas_pool: Option<Address>,
    fee_sink: Option<Address>,
    backstop_pool: Option<Address>,
}

impl ProtocolSetupBuilder {
    pub fn params(mut self, params: ProtocolParams) -> Self {
        self.params = params;
        self
    }

    pub fn gas_pool(mut self, address: Address) -> Self {
        self.gas_pool = Some(address);
        self
    }

    pub fn fee_sink(mut self, address: Address) -> Self {
        self.fee_sink = Some(address);
        self
    }

    pub fn backstop_pool(mut self, address: Address) -> Self {
        self.backstop_pool = Some(address);
        self
    }

    /// Validate and freeze the setup. Consuming the builder is the ownership renouncement:
    /// nothing can change the returned value afterwards.
    pub fn seal(self) -> Result<ProtocolSetup, SetupError> {
        self.params.validate()?;
        let setup = ProtocolSetup {
            params: self.params,
            registry: self.registry,
            gas_pool: self.gas_pool.ok_or(SetupError::MissingAddress("gas pool"))?,
            fee_sink: self.fee_sink.ok_or(SetupError::MissingAddress("fee sink"))?,
            backstop_pool: self
                .backstop_pool
                .ok_or(SetupError::MissingAddress("backstop pool"))?,
        };
        if setup.gas_pool == setup.fee_sink {
            return Err(SetupError::DuplicateAddress("gas pool", "fee sink"));
        }
        if setup.gas_pool == setup.backstop_pool {
            return Err(SetupError::DuplicateAddress("gas pool", "backstop pool"));
        }
        if setup.fee_sink == setup.backstop_pool {
            return Err(SetupError::DuplicateAddress("fee sink", "backstop pool"));
        }
        info!(
            "Protocol setup sealed: {} collateral asset(s), MCR={}, CCR={}",
            setup.registry.len(),
            setup.params.mcr,
            setup.params.ccr
        );
        Ok(setup)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn builder() -> ProtocolSetupBuilder {
        ProtocolSetup::builder(CollateralRegistry::native_only("ETH"))
            .gas_pool(Address::new("gas"))
            .fee_sink(Address::new("fees"))
            .backstop_pool(Address::new("backstop"))
    }

    #[test]
    fn test_default_params_are_valid() {
        let params = ProtocolParams::default();
        assert!(params.validate().is_ok());
        assert_eq!(params.mcr.to_canonical_string(), "1.1");
        assert_eq!(params.ccr.to_canonical_string(), "1.5");
    }

    #[test]
    fn test_seal_requires_addresses() {
        let result = ProtocolSetup::builder(CollateralRegistry::native_only("ETH"))
            .gas_pool(Address::new("gas"))
            .seal();
        assert_eq!(result.unwrap_err(), SetupError::MissingAddress("fee sink"));
    }

    #[test]
    fn test_seal_validates_params() {
        let params = ProtocolParams {
            ccr: Wad::ONE,
            ..ProtocolParams::default()
        };
        assert_eq!(builder().params(params).seal().unwrap_err(), SetupError::CcrBelowMcr);
    }

    #[test]
    fn test_sealed_setup_exposes_accounts() {
        let setup = builder().seal().unwrap();
        assert_eq!(setup.gas_pool().as_str(), "gas");
        assert_eq!(setup.backstop_pool().as_str(), "backstop");
        assert!(setup.is_system_account(&Address::new("fees")));
        assert!(!setup.is_system_account(&Address::new("alice")));
    }

    #[test]
    fn test_seal_rejects_shared_accounts() {
        let result = builder().fee_sink(Address::new("gas")).seal();
        assert_eq!(
            result.unwrap_err(),
            SetupError::DuplicateAddress("gas pool", "fee sink")
        );

        let result = builder().backstop_pool(Address::new("fees")).seal();
        assert_eq!(
            result.unwrap_err(),
            SetupError::DuplicateAddress("fee sink", "backstop pool")
        );
    }
}
