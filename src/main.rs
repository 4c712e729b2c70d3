// src/main.rs
use clap::Parser;
use env_logger::Builder;
use log::{error, info, LevelFilter};
use portfolio_tracker::api;
use portfolio_tracker::client::ApiClient;
use portfolio_tracker::config::Config;
use portfolio_tracker::market::{refresh_worker, MarketCatalog, PriceCache};
use portfolio_tracker::service::PortfolioService;
use std::sync::Arc;
use tokio::task;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    Builder::new()
        .filter_level(LevelFilter::Info)
        .parse_default_env()
        .format_timestamp_secs()
        .init();

    let config = Config::parse();
    info!("Starting the portfolio tracker against {}", config.api_base_url);

    let client = match ApiClient::new(
        &config.api_base_url,
        config.request_timeout(),
        config.insight_timeout(),
    ) {
        Ok(client) => Arc::new(client.with_service_token(config.api_token.clone())),
        Err(e) => {
            error!("Failed to build backend client: {}", e);
            return;
        }
    };

    let catalog = Arc::new(MarketCatalog::default());
    let cache = Arc::new(PriceCache::default());

    if let Some(every) = config.market_refresh() {
        let catalog = catalog.clone();
        let cache = cache.clone();
        let feed = client.clone();
        task::spawn(async move {
            refresh_worker(catalog, cache, feed, every).await;
        });
    }

    let service = Arc::new(PortfolioService::new(
        client.clone(),
        client.clone(),
        client,
        catalog,
        cache,
    ));

    info!("Server running on http://{}", config.listen);
    warp::serve(api::app(service)).run(config.listen).await;
}
