//! HTTP price feed client.

use super::{PriceFeed, PriceFeedError};
use crate::domain::Wad;
use async_trait::async_trait;
use backoff::future::retry;
use backoff::ExponentialBackoff;
use reqwest::Client;
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, warn};

/// Price feed polling a JSON endpoint shaped like `{"prices": {"ETH": "2000.5"}}`.
#[derive(Debug, Clone)]
pub struct HttpPriceFeed {
    client: Client,
    url: String,
}

impl HttpPriceFeed {
    pub fn new(url: String) -> Self {
        Self {
            client: Client::new(),
            url,
        }
    }

    async fn get_json(&self) -> Result<serde_json::Value, PriceFeedError> {
        let backoff = ExponentialBackoff {
            max_elapsed_time: Some(Duration::from_secs(30)),
            ..Default::default()
        };

        retry(backoff, || async {
            let response = self.client.get(&self.url).send().await.map_err(|e| {
                backoff::Error::transient(PriceFeedError::NetworkError(e.to_string()))
            })?;

            let status = response.status();
            if status == 429 {
                return Err(backoff::Error::transient(PriceFeedError::RateLimited));
            }
            if status.is_server_error() {
                return Err(backoff::Error::transient(PriceFeedError::HttpError {
                    status: status.as_u16(),
                    message: "Server error".to_string(),
                }));
            }
            if !status.is_success() {
                return Err(backoff::Error::permanent(PriceFeedError::HttpError {
                    status: status.as_u16(),
                    message: "Client error".to_string(),
                }));
            }

            response
                .json::<serde_json::Value>()
                .await
                .map_err(|e| backoff::Error::permanent(PriceFeedError::ParseError(e.to_string())))
        })
        .await
    }
}

#[async_trait]
impl PriceFeed for HttpPriceFeed {
    async fn fetch_quotes(&self) -> Result<HashMap<String, Wad>, PriceFeedError> {
        debug!("Fetching prices from {}", self.url);
        let response = self.get_json().await?;
        parse_quotes(&response)
    }
}

/// Extract quotes from a feed response. Malformed entries are skipped with a warning;
/// callers detect the gap when mapping onto the registry.
pub fn parse_quotes(response: &serde_json::Value) -> Result<HashMap<String, Wad>, PriceFeedError> {
    let prices = response
        .get("prices")
        .and_then(|v| v.as_object())
        .ok_or_else(|| PriceFeedError::ParseError("Missing prices object".to_string()))?;

    let mut quotes = HashMap::with_capacity(prices.len());
    for (symbol, value) in prices {
        let raw = match value {
            serde_json::Value::String(s) => s.clone(),
            serde_json::Value::Number(n) => n.to_string(),
            _ => {
                warn!("Ignoring non-numeric price for {}", symbol);
                continue;
            }
        };
        match Wad::from_str_canonical(&raw) {
            Ok(price) => {
                quotes.insert(symbol.trim().to_uppercase(), price);
            }
            Err(e) => warn!("Ignoring invalid price for {}: {}", symbol, e),
        }
    }
    Ok(quotes)
}
