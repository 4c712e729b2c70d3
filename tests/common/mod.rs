// tests/common/mod.rs
#![allow(dead_code)]

use async_trait::async_trait;
use portfolio_tracker::backend::{ApiResult, InsightService, PortfolioStore, PriceFeed};
use portfolio_tracker::error::ApiError;
use portfolio_tracker::insights::{AiAnalysis, Prediction};
use portfolio_tracker::market::{MarketCatalog, PriceCache};
use portfolio_tracker::models::{
    Holding, HoldingUpdate, NewHolding, NewTransaction, PriceMap, Transaction, UserSession,
};
use portfolio_tracker::service::PortfolioService;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

/// In-memory stand-in for the remote backend.
#[derive(Default)]
pub struct FakeBackend {
    pub holdings: Mutex<Vec<Holding>>,
    pub transactions: Mutex<Vec<Transaction>>,
    pub prices: Mutex<PriceMap>,
    pub calls: Mutex<Vec<String>>,
    /// Bearer token seen by each price or insight request, `-` when none.
    pub seen_tokens: Mutex<Vec<String>>,
    pub prices_down: AtomicBool,
    pub store_down: AtomicBool,
    pub reject_token: AtomicBool,
}

impl FakeBackend {
    pub fn with_holdings(holdings: Vec<Holding>) -> Arc<Self> {
        let backend = FakeBackend::default();
        *backend.holdings.lock().unwrap() = holdings;
        Arc::new(backend)
    }

    pub fn set_price(&self, symbol: &str, price: f64) {
        self.prices.lock().unwrap().insert(symbol.to_string(), price);
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn seen_tokens(&self) -> Vec<String> {
        self.seen_tokens.lock().unwrap().clone()
    }

    fn log(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }

    fn saw_token(&self, token: Option<&str>) {
        self.seen_tokens
            .lock()
            .unwrap()
            .push(token.unwrap_or("-").to_string());
    }

    fn check_store(&self) -> ApiResult<()> {
        if self.reject_token.load(Ordering::SeqCst) {
            return Err(ApiError::Unauthorized);
        }
        if self.store_down.load(Ordering::SeqCst) {
            return Err(ApiError::Status {
                status: 503,
                message: "store unavailable".into(),
            });
        }
        Ok(())
    }

    fn next_id(&self) -> i64 {
        self.holdings
            .lock()
            .unwrap()
            .iter()
            .filter_map(|h| h.id)
            .max()
            .unwrap_or(0)
            + 1
    }
}

#[async_trait]
impl PortfolioStore for FakeBackend {
    async fn fetch_holdings(&self, _session: &UserSession) -> ApiResult<Vec<Holding>> {
        self.check_store()?;
        self.log("fetch_holdings".into());
        Ok(self.holdings.lock().unwrap().clone())
    }

    async fn create_holding(&self, _session: &UserSession, holding: &NewHolding) -> ApiResult<()> {
        self.check_store()?;
        self.log(format!("create_holding {}", holding.symbol));
        let id = self.next_id();
        let mut row = Holding::new(&holding.symbol, holding.shares, holding.average_price)
            .with_sector(&holding.sector)
            .with_id(id);
        row.name = holding.name.clone();
        self.holdings.lock().unwrap().push(row);
        Ok(())
    }

    async fn update_holding(
        &self,
        _session: &UserSession,
        id: i64,
        update: &HoldingUpdate,
    ) -> ApiResult<()> {
        self.check_store()?;
        self.log(format!("update_holding {}", id));
        for holding in self.holdings.lock().unwrap().iter_mut() {
            if holding.id == Some(id) {
                holding.shares = update.shares;
                holding.average_price = update.average_price;
            }
        }
        Ok(())
    }

    async fn delete_holding(&self, _session: &UserSession, id: i64) -> ApiResult<()> {
        self.check_store()?;
        self.log(format!("delete_holding {}", id));
        self.holdings.lock().unwrap().retain(|h| h.id != Some(id));
        Ok(())
    }

    async fn record_transaction(
        &self,
        _session: &UserSession,
        transaction: &NewTransaction,
    ) -> ApiResult<()> {
        self.check_store()?;
        self.log(format!("record_transaction {}", transaction.symbol));
        let mut transactions = self.transactions.lock().unwrap();
        let id = transactions.len() as i64 + 1;
        transactions.push(Transaction {
            id: Some(id),
            symbol: transaction.symbol.clone(),
            trade_type: transaction.trade_type,
            shares: transaction.shares,
            price: transaction.price,
            total: transaction.total,
            timestamp: Some(transaction.timestamp),
            user_email: transaction.user_email.clone(),
        });
        Ok(())
    }

    async fn fetch_transactions(&self, _session: &UserSession) -> ApiResult<Vec<Transaction>> {
        self.check_store()?;
        Ok(self.transactions.lock().unwrap().clone())
    }
}

#[async_trait]
impl PriceFeed for FakeBackend {
    async fn fetch_prices(&self, token: Option<&str>, symbols: &[String]) -> ApiResult<PriceMap> {
        self.saw_token(token);
        if self.prices_down.load(Ordering::SeqCst) {
            return Err(ApiError::Status {
                status: 504,
                message: "price feed timeout".into(),
            });
        }
        let prices = self.prices.lock().unwrap();
        Ok(symbols
            .iter()
            .filter_map(|s| prices.get(s).map(|p| (s.clone(), *p)))
            .collect())
    }
}

#[async_trait]
impl InsightService for FakeBackend {
    async fn analyze(&self, token: Option<&str>, symbols: &[String]) -> ApiResult<AiAnalysis> {
        self.saw_token(token);
        self.log(format!("analyze {}", symbols.join(",")));
        Ok(AiAnalysis {
            insights: Vec::new(),
            predictions: symbols
                .iter()
                .map(|s| Prediction {
                    symbol: s.clone(),
                    name: String::new(),
                    current_price: 100.0,
                    predicted_price: 110.0,
                    confidence: 70.0,
                    timeframe: "1 month".into(),
                    sentiment: "Bullish".into(),
                })
                .collect(),
            score: 8.0,
        })
    }
}

pub fn service_for(backend: &Arc<FakeBackend>) -> PortfolioService {
    PortfolioService::new(
        backend.clone(),
        backend.clone(),
        backend.clone(),
        Arc::new(MarketCatalog::default()),
        Arc::new(PriceCache::default()),
    )
}

pub fn session() -> UserSession {
    UserSession::new("investor@example.com").with_token("t0k3n")
}

pub fn two_sector_portfolio() -> Vec<Holding> {
    vec![
        Holding::new("A", 10, 100.0).with_sector("Tech").with_id(1),
        Holding::new("B", 5, 200.0).with_sector("Finance").with_id(2),
    ]
}
