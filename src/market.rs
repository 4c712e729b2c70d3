// src/market.rs
use crate::backend::{ApiResult, PriceFeed};
use crate::models::PriceMap;
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time;

/// A tradable listing with its latest known price.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketQuote {
    pub symbol: String,
    pub name: String,
    pub price: f64,
    pub sector: String,
}

// Seed prices; replaced once the price feed answers.
const DEFAULT_LISTINGS: [(&str, &str, f64, &str); 12] = [
    ("RELIANCE", "Reliance Industries", 2980.50, "Energy"),
    ("TCS", "Tata Consultancy Services", 4150.20, "IT"),
    ("HDFCBANK", "HDFC Bank Ltd", 1675.00, "Finance"),
    ("INFY", "Infosys Ltd", 1530.45, "IT"),
    ("ICICIBANK", "ICICI Bank", 1150.00, "Finance"),
    ("ITC", "ITC Limited", 435.00, "Consumer"),
    ("SBIN", "State Bank of India", 790.15, "Finance"),
    ("BHARTIARTL", "Bharti Airtel", 1250.00, "Telecom"),
    ("LICI", "LIC of India", 920.00, "Insurance"),
    ("LT", "Larsen & Toubro", 3550.00, "Construction"),
    ("WIPRO", "Wipro Ltd", 580.00, "IT"),
    ("AXISBANK", "Axis Bank", 1089.00, "Finance"),
];

pub struct MarketCatalog {
    quotes: RwLock<Vec<MarketQuote>>,
}

impl Default for MarketCatalog {
    fn default() -> Self {
        MarketCatalog::new(
            DEFAULT_LISTINGS
                .iter()
                .map(|(symbol, name, price, sector)| MarketQuote {
                    symbol: symbol.to_string(),
                    name: name.to_string(),
                    price: *price,
                    sector: sector.to_string(),
                })
                .collect(),
        )
    }
}

impl MarketCatalog {
    pub fn new(quotes: Vec<MarketQuote>) -> Self {
        MarketCatalog {
            quotes: RwLock::new(quotes),
        }
    }

    pub async fn quotes(&self) -> Vec<MarketQuote> {
        self.quotes.read().await.clone()
    }

    pub async fn symbols(&self) -> Vec<String> {
        self.quotes
            .read()
            .await
            .iter()
            .map(|q| q.symbol.clone())
            .collect()
    }

    pub async fn listing(&self, symbol: &str) -> Option<MarketQuote> {
        self.quotes
            .read()
            .await
            .iter()
            .find(|q| q.symbol.eq_ignore_ascii_case(symbol))
            .cloned()
    }

    /// Overwrites prices the map covers and leaves the rest untouched.
    pub async fn apply_prices(&self, prices: &PriceMap) -> usize {
        let mut quotes = self.quotes.write().await;
        let mut updated = 0;
        for quote in quotes.iter_mut() {
            if let Some(price) = prices.get(&quote.symbol).filter(|p| p.is_finite() && **p > 0.0) {
                quote.price = *price;
                updated += 1;
            }
        }
        updated
    }

    pub async fn refresh(&self, feed: &dyn PriceFeed) -> ApiResult<PriceMap> {
        let prices = feed.fetch_prices(None, &self.symbols().await).await?;
        let updated = self.apply_prices(&prices).await;
        info!("Market catalog refreshed, {} listings repriced.", updated);
        Ok(prices)
    }
}

/// Last prices seen from the feed, used when a live fetch fails.
#[derive(Default)]
pub struct PriceCache {
    prices: RwLock<PriceMap>,
}

impl PriceCache {
    pub async fn merge(&self, prices: &PriceMap) {
        let mut cached = self.prices.write().await;
        for (symbol, price) in prices {
            cached.insert(symbol.clone(), *price);
        }
    }

    pub async fn lookup(&self, symbols: &[String]) -> PriceMap {
        let cached = self.prices.read().await;
        symbols
            .iter()
            .filter_map(|s| cached.get(s).map(|p| (s.clone(), *p)))
            .collect()
    }
}

/// Periodically reprices the catalog and warms the price cache.
pub async fn refresh_worker(
    catalog: Arc<MarketCatalog>,
    cache: Arc<PriceCache>,
    feed: Arc<dyn PriceFeed>,
    every: Duration,
) {
    let mut ticker = time::interval(every);
    loop {
        ticker.tick().await;
        match catalog.refresh(feed.as_ref()).await {
            Ok(prices) => cache.merge(&prices).await,
            Err(e) => warn!("Market refresh failed, keeping previous prices: {}", e),
        }
    }
}
