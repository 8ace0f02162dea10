//! Background task pulling prices from a feed into the protocol's price book.

use crate::collaborators::PriceVector;
use crate::domain::CollateralRegistry;
use crate::oracle::{self, PriceFeed, PriceFeedError};
use crate::orchestration::Orchestrator;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

pub struct PriceRefresher {
    feed: Arc<dyn PriceFeed>,
    orchestrator: Orchestrator,
    registry: CollateralRegistry,
    interval: Duration,
}

impl PriceRefresher {
    pub fn new(feed: Arc<dyn PriceFeed>, orchestrator: Orchestrator, interval: Duration) -> Self {
        let registry = orchestrator.engine().setup().registry().clone();
        Self {
            feed,
            orchestrator,
            registry,
            interval,
        }
    }

    /// Fetch one round of quotes and publish them.
    ///
    /// A failed or incomplete round publishes nothing, so the engine keeps the last good
    /// prices.
    pub async fn refresh_once(&self) -> Result<PriceVector, PriceFeedError> {
        let quotes = self.feed.fetch_quotes().await?;
        let prices = oracle::to_price_vector(&self.registry, &quotes)?;
        self.orchestrator.publish_prices(prices.clone()).await;
        debug!("Published prices: {:?}", prices.as_slice());
        Ok(prices)
    }

    /// Refresh on a fixed interval until the task is aborted.
    pub fn spawn(self) -> JoinHandle<()> {
        info!("Starting price refresh every {:?}", self.interval);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(self.interval);
            loop {
                ticker.tick().await;
                if let Err(e) = self.refresh_once().await {
                    warn!("Price refresh failed: {}", e);
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collaborators::{InMemoryProtocol, ManualClock};
    use crate::db::{init_db, Repository};
    use crate::domain::{Address, AssetId, TimeMs, Wad};
    use crate::engine::{BorrowerOperations, EngineError, ProtocolSetup};
    use crate::oracle::MockPriceFeed;
    use crate::orchestration::OrchestrationError;
    use tempfile::TempDir;

    async fn setup(symbols: &[&str]) -> (Orchestrator, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir
            .path()
            .join("test.db")
            .to_string_lossy()
            .to_string();
        let pool = init_db(&db_path).await.expect("init_db failed");

        let registry = CollateralRegistry::new(symbols.iter().copied()).unwrap();
        let setup = ProtocolSetup::builder(registry.clone())
            .gas_pool(Address::new("gas"))
            .fee_sink(Address::new("fees"))
            .backstop_pool(Address::new("backstop"))
            .seal()
            .unwrap();
        let protocol =
            InMemoryProtocol::new(&registry, Arc::new(ManualClock::new(TimeMs::new(0))));
        let orchestrator = Orchestrator::new(
            BorrowerOperations::new(Arc::new(setup)),
            protocol,
            Arc::new(Repository::new(pool)),
            1,
        );
        (orchestrator, temp_dir)
    }

    #[tokio::test]
    async fn test_refresh_publishes_prices() {
        let (orchestrator, _temp) = setup(&["ETH", "WBTC"]).await;
        let feed = MockPriceFeed::new()
            .with_quote("ETH", Wad::from_units(2_000))
            .with_quote("WBTC", Wad::from_units(30_000));
        let refresher =
            PriceRefresher::new(Arc::new(feed), orchestrator.clone(), Duration::from_secs(1));

        refresher.refresh_once().await.unwrap();

        let status = orchestrator.system_status().await.unwrap();
        assert_eq!(status.assets[0].price, Wad::from_units(2_000));
        assert_eq!(status.assets[1].price, Wad::from_units(30_000));
    }

    #[tokio::test]
    async fn test_incomplete_quotes_publish_nothing() {
        let (orchestrator, _temp) = setup(&["ETH", "WBTC"]).await;
        let feed = MockPriceFeed::new().with_quote("ETH", Wad::from_units(2_000));
        let refresher =
            PriceRefresher::new(Arc::new(feed), orchestrator.clone(), Duration::from_secs(1));

        let err = refresher.refresh_once().await.unwrap_err();
        assert_eq!(err, PriceFeedError::MissingQuote("WBTC".to_string()));

        let err = orchestrator.system_status().await.unwrap_err();
        assert!(matches!(
            err,
            OrchestrationError::Rejected(EngineError::PriceUnavailable(_))
        ));
    }

    #[tokio::test]
    async fn test_feed_failure_keeps_last_prices() {
        let (orchestrator, _temp) = setup(&["ETH"]).await;
        orchestrator
            .with_protocol(|p| p.prices.set_price(AssetId::NATIVE, Wad::from_units(1_500)))
            .await;
        let feed = MockPriceFeed::new().with_failure(PriceFeedError::RateLimited);
        let refresher =
            PriceRefresher::new(Arc::new(feed), orchestrator.clone(), Duration::from_secs(1));

        assert!(refresher.refresh_once().await.is_err());
        let status = orchestrator.system_status().await.unwrap();
        assert_eq!(status.assets[0].price, Wad::from_units(1_500));
    }
}
