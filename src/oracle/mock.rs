//! Mock price feed for testing without network calls.

use super::{PriceFeed, PriceFeedError};
use crate::domain::Wad;
use async_trait::async_trait;
use std::collections::HashMap;

/// Price feed returning predefined quotes, or a predefined error.
#[derive(Debug, Clone, Default)]
pub struct MockPriceFeed {
    quotes: HashMap<String, Wad>,
    failure: Option<PriceFeedError>,
}

impl MockPriceFeed {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a quote for `symbol`.
    pub fn with_quote(mut self, symbol: &str, price: Wad) -> Self {
        self.quotes.insert(symbol.trim().to_uppercase(), price);
        self
    }

    /// Make every fetch fail with `error`.
    pub fn with_failure(mut self, error: PriceFeedError) -> Self {
        self.failure = Some(error);
        self
    }
}

#[async_trait]
impl PriceFeed for MockPriceFeed {
    async fn fetch_quotes(&self) -> Result<HashMap<String, Wad>, PriceFeedError> {
        match &self.failure {
            Some(err) => Err(err.clone()),
            None => Ok(self.quotes.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_returns_quotes() {
        let feed = MockPriceFeed::new().with_quote("eth", Wad::from_units(2_000));
        let quotes = feed.fetch_quotes().await.unwrap();
        assert_eq!(quotes.get("ETH"), Some(&Wad::from_units(2_000)));
    }

    #[tokio::test]
    async fn test_mock_failure() {
        let feed = MockPriceFeed::new().with_failure(PriceFeedError::RateLimited);
        assert_eq!(feed.fetch_quotes().await, Err(PriceFeedError::RateLimited));
    }
}
