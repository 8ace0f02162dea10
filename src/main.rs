use anyhow::Context;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use trove_engine::collaborators::SystemClock;
use trove_engine::{
    api, init_db, BorrowerOperations, Config, HttpPriceFeed, InMemoryProtocol, Orchestrator,
    PriceFeed, PriceRefresher, PriceVector, Repository,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing_subscriber::filter::LevelFilter::INFO.into()),
        )
        .init();

    let config = Config::from_env().context("Configuration error")?;
    let port = config.port;

    let pool = init_db(&config.database_path)
        .await
        .context("Failed to initialize database")?;
    let repo = Arc::new(Repository::new(pool));

    let setup = Arc::new(config.protocol_setup().context("Invalid protocol setup")?);
    let mut protocol = InMemoryProtocol::new(setup.registry(), Arc::new(SystemClock));
    if let Some(prices) = &config.initial_prices {
        protocol.prices.set_prices(PriceVector::new(prices.clone()));
    }

    let orchestrator = Orchestrator::resume(BorrowerOperations::new(setup), protocol, repo)
        .await
        .context("Failed to read the event store")?;

    match &config.price_feed_url {
        Some(url) => {
            let feed: Arc<dyn PriceFeed> = Arc::new(HttpPriceFeed::new(url.clone()));
            let refresher = PriceRefresher::new(
                feed,
                orchestrator.clone(),
                Duration::from_millis(config.price_refresh_ms),
            );
            refresher.spawn();
        }
        None if config.initial_prices.is_none() => {
            tracing::warn!("No price feed or initial prices configured; operations will be rejected until prices are published");
        }
        None => {}
    }

    let app = api::create_router(api::AppState::new(Arc::new(orchestrator)));

    let addr = SocketAddr::from(([127, 0, 0, 1], port));
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, app).await.context("Server error")?;
    Ok(())
}
