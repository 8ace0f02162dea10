//! External price feeds that publish collateral prices into the protocol's price book.

use crate::collaborators::PriceVector;
use crate::domain::{CollateralRegistry, Wad};
use async_trait::async_trait;
use std::collections::HashMap;
use std::fmt;

pub mod http;
pub mod mock;

pub use http::HttpPriceFeed;
pub use mock::MockPriceFeed;

/// Source of collateral prices, keyed by uppercase asset symbol.
///
/// Implementations handle retry/backoff themselves.
#[async_trait]
pub trait PriceFeed: Send + Sync + fmt::Debug {
    async fn fetch_quotes(&self) -> Result<HashMap<String, Wad>, PriceFeedError>;
}

/// Error type for price feed operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PriceFeedError {
    /// Network error (e.g., connection timeout, DNS failure)
    NetworkError(String),
    /// HTTP error (e.g., 429 rate limit, 5xx server error)
    HttpError { status: u16, message: String },
    /// Parsing error (invalid JSON or malformed price)
    ParseError(String),
    /// Rate limit exceeded
    RateLimited,
    /// The feed has no usable quote for a registered asset
    MissingQuote(String),
}

impl fmt::Display for PriceFeedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PriceFeedError::NetworkError(msg) => write!(f, "Network error: {}", msg),
            PriceFeedError::HttpError { status, message } => {
                write!(f, "HTTP error {}: {}", status, message)
            }
            PriceFeedError::ParseError(msg) => write!(f, "Parse error: {}", msg),
            PriceFeedError::RateLimited => write!(f, "Rate limited"),
            PriceFeedError::MissingQuote(symbol) => write!(f, "No quote for {}", symbol),
        }
    }
}

impl std::error::Error for PriceFeedError {}

/// Order `quotes` by asset id. Every registered asset needs a non-zero quote.
pub fn to_price_vector(
    registry: &CollateralRegistry,
    quotes: &HashMap<String, Wad>,
) -> Result<PriceVector, PriceFeedError> {
    registry
        .symbols()
        .into_iter()
        .map(|symbol| match quotes.get(&symbol) {
            Some(price) if !price.is_zero() => Ok(*price),
            _ => Err(PriceFeedError::MissingQuote(symbol)),
        })
        .collect::<Result<Vec<_>, _>>()
        .map(PriceVector::new)
}
