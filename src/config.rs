use crate::domain::{Address, CollateralRegistry, Wad};
use crate::engine::{ProtocolParams, ProtocolSetup};
use std::collections::HashMap;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub database_path: String,
    /// Optional; without a feed the service runs on `initial_prices` only.
    pub price_feed_url: Option<String>,
    pub price_refresh_ms: u64,
    pub collateral_assets: Vec<String>,
    /// One price per collateral asset, in registry order.
    pub initial_prices: Option<Vec<Wad>>,
    pub params: ProtocolParams,
    pub gas_pool_address: Address,
    pub fee_sink_address: Address,
    pub backstop_pool_address: Address,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnv(String),
    #[error("Invalid value for {0}: {1}")]
    InvalidValue(String, String),
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_env_map(std::env::vars().collect())
    }

    pub fn from_env_map(env_map: HashMap<String, String>) -> Result<Self, ConfigError> {
        let port = parse_var::<u16>(&env_map, "PORT", "8080", "must be a valid u16")?;

        let database_path = env_map
            .get("DATABASE_PATH")
            .cloned()
            .ok_or_else(|| ConfigError::MissingEnv("DATABASE_PATH".to_string()))?;

        let price_feed_url = env_map
            .get("PRICE_FEED_URL")
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());

        let price_refresh_ms =
            parse_var::<u64>(&env_map, "PRICE_REFRESH_MS", "15000", "must be a valid u64")?;
        if price_refresh_ms == 0 {
            return Err(ConfigError::InvalidValue(
                "PRICE_REFRESH_MS".to_string(),
                "must be positive".to_string(),
            ));
        }

        let collateral_assets = split_list(
            env_map
                .get("COLLATERAL_ASSETS")
                .map(|s| s.as_str())
                .unwrap_or("ETH"),
        );
        CollateralRegistry::new(collateral_assets.clone()).map_err(|e| {
            ConfigError::InvalidValue("COLLATERAL_ASSETS".to_string(), e.to_string())
        })?;

        let initial_prices = match env_map.get("INITIAL_PRICES") {
            Some(raw) => {
                let prices = split_list(raw)
                    .iter()
                    .map(|p| parse_wad("INITIAL_PRICES", p))
                    .collect::<Result<Vec<_>, _>>()?;
                if prices.len() != collateral_assets.len() || prices.iter().any(Wad::is_zero) {
                    return Err(ConfigError::InvalidValue(
                        "INITIAL_PRICES".to_string(),
                        format!(
                            "expected {} non-zero price(s), one per collateral asset",
                            collateral_assets.len()
                        ),
                    ));
                }
                Some(prices)
            }
            None => None,
        };

        let defaults = ProtocolParams::default();
        let params = ProtocolParams {
            mcr: wad_var(&env_map, "MCR", defaults.mcr)?,
            ccr: wad_var(&env_map, "CCR", defaults.ccr)?,
            gas_compensation: wad_var(&env_map, "GAS_COMPENSATION", defaults.gas_compensation)?,
            min_net_debt: wad_var(&env_map, "MIN_NET_DEBT", defaults.min_net_debt)?,
            borrowing_fee_floor: wad_var(
                &env_map,
                "BORROWING_FEE_FLOOR",
                defaults.borrowing_fee_floor,
            )?,
            max_borrowing_fee: wad_var(&env_map, "MAX_BORROWING_FEE", defaults.max_borrowing_fee)?,
        };
        params
            .validate()
            .map_err(|e| ConfigError::InvalidValue("protocol parameters".to_string(), e.to_string()))?;

        Ok(Config {
            port,
            database_path,
            price_feed_url,
            price_refresh_ms,
            collateral_assets,
            initial_prices,
            params,
            gas_pool_address: address_var(&env_map, "GAS_POOL_ADDRESS", "gas-pool")?,
            fee_sink_address: address_var(&env_map, "FEE_SINK_ADDRESS", "fee-sink")?,
            backstop_pool_address: address_var(&env_map, "BACKSTOP_POOL_ADDRESS", "backstop-pool")?,
        })
    }

    pub fn registry(&self) -> Result<CollateralRegistry, ConfigError> {
        CollateralRegistry::new(self.collateral_assets.clone()).map_err(|e| {
            ConfigError::InvalidValue("COLLATERAL_ASSETS".to_string(), e.to_string())
        })
    }

    /// Build and seal the protocol setup described by this configuration.
    pub fn protocol_setup(&self) -> Result<ProtocolSetup, ConfigError> {
        ProtocolSetup::builder(self.registry()?)
            .params(self.params.clone())
            .gas_pool(self.gas_pool_address.clone())
            .fee_sink(self.fee_sink_address.clone())
            .backstop_pool(self.backstop_pool_address.clone())
            .seal()
            .map_err(|e| ConfigError::InvalidValue("protocol setup".to_string(), e.to_string()))
    }
}

fn parse_var<T: FromStr>(
    env_map: &HashMap<String, String>,
    key: &str,
    default: &str,
    expected: &str,
) -> Result<T, ConfigError> {
    env_map
        .get(key)
        .map(|s| s.as_str())
        .unwrap_or(default)
        .trim()
        .parse::<T>()
        .map_err(|_| ConfigError::InvalidValue(key.to_string(), expected.to_string()))
}

fn parse_wad(key: &str, raw: &str) -> Result<Wad, ConfigError> {
    Wad::from_str_canonical(raw).map_err(|e| ConfigError::InvalidValue(key.to_string(), e.to_string()))
}

fn wad_var(env_map: &HashMap<String, String>, key: &str, default: Wad) -> Result<Wad, ConfigError> {
    match env_map.get(key) {
        Some(raw) => parse_wad(key, raw),
        None => Ok(default),
    }
}

fn address_var(
    env_map: &HashMap<String, String>,
    key: &str,
    default: &str,
) -> Result<Address, ConfigError> {
    env_map
        .get(key)
        .map(|s| s.as_str())
        .unwrap_or(default)
        .parse::<Address>()
        .map_err(|e| ConfigError::InvalidValue(key.to_string(), e.to_string()))
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}
