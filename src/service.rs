// src/service.rs
use crate::backend::{InsightService, PortfolioStore, PriceFeed};
use crate::error::{Result, ServiceError, TradeError};
use crate::insights::AiAnalysis;
use crate::market::{MarketCatalog, MarketQuote, PriceCache};
use crate::models::{
    Holding, HoldingMetrics, NewTransaction, PortfolioStats, PriceMap, SectorAllocation,
    TradeType, Transaction, UserSession,
};
use crate::trade::{normalize_symbol, plan_trade, HoldingChange, TradeRequest};
use crate::valuation::{
    compute_holding_metrics, compute_sector_allocation, compute_stats, effective_price,
    find_extremum, Extremum,
};
use chrono::Utc;
use log::{error, info, warn};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// A holding row as displayed: the stored fields, the price it was valued at
/// and its derived metrics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HoldingView {
    #[serde(flatten)]
    pub holding: Holding,
    #[serde(flatten)]
    pub metrics: HoldingMetrics,
}

impl HoldingView {
    fn new(holding: &Holding, prices: &PriceMap) -> Self {
        let mut holding = holding.clone();
        let metrics = compute_holding_metrics(&holding, prices);
        holding.current_price = Some(effective_price(&holding, prices));
        HoldingView { holding, metrics }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PortfolioSummary {
    pub holdings: Vec<HoldingView>,
    pub stats: PortfolioStats,
    pub sectors: Vec<SectorAllocation>,
    pub top_gainer: Option<HoldingView>,
    pub top_loser: Option<HoldingView>,
    /// Set when the live price fetch failed and cached prices were used.
    pub prices_stale: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetDetail {
    pub holding: HoldingView,
    pub weight_percent: f64,
    pub transactions: Vec<Transaction>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TradeOrder {
    pub symbol: String,
    pub shares: i64,
    #[serde(default)]
    pub price: Option<f64>,
    #[serde(default)]
    pub sector: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TradeReceipt {
    pub transaction: NewTransaction,
    pub summary: PortfolioSummary,
}

/// Assembles the summary for an already-priced snapshot.
pub fn build_summary(holdings: &[Holding], prices: &PriceMap, prices_stale: bool) -> PortfolioSummary {
    PortfolioSummary {
        holdings: holdings.iter().map(|h| HoldingView::new(h, prices)).collect(),
        stats: compute_stats(holdings, prices),
        sectors: compute_sector_allocation(holdings, prices),
        top_gainer: find_extremum(holdings, prices, Extremum::Max)
            .map(|h| HoldingView::new(h, prices)),
        top_loser: find_extremum(holdings, prices, Extremum::Min)
            .map(|h| HoldingView::new(h, prices)),
        prices_stale,
    }
}

pub struct PortfolioService {
    store: Arc<dyn PortfolioStore>,
    feed: Arc<dyn PriceFeed>,
    insights: Arc<dyn InsightService>,
    catalog: Arc<MarketCatalog>,
    cache: Arc<PriceCache>,
}

impl PortfolioService {
    pub fn new(
        store: Arc<dyn PortfolioStore>,
        feed: Arc<dyn PriceFeed>,
        insights: Arc<dyn InsightService>,
        catalog: Arc<MarketCatalog>,
        cache: Arc<PriceCache>,
    ) -> Self {
        PortfolioService {
            store,
            feed,
            insights,
            catalog,
            cache,
        }
    }

    async fn load_holdings(&self, session: &UserSession) -> Result<Vec<Holding>> {
        let holdings = self.store.fetch_holdings(session).await?;
        Ok(holdings.into_iter().filter(|h| h.shares != 0).collect())
    }

    /// Live prices when the feed answers, otherwise whatever the cache remembers.
    async fn price_snapshot(&self, token: Option<&str>, symbols: &[String]) -> (PriceMap, bool) {
        if symbols.is_empty() {
            return (PriceMap::new(), false);
        }
        match self.feed.fetch_prices(token, symbols).await {
            Ok(prices) => {
                self.cache.merge(&prices).await;
                (prices, false)
            }
            Err(e) => {
                warn!("Failed to fetch live prices, using cached prices: {}", e);
                (self.cache.lookup(symbols).await, true)
            }
        }
    }

    async fn summarize(&self, session: &UserSession, holdings: &[Holding]) -> PortfolioSummary {
        let symbols: Vec<String> = holdings.iter().map(|h| h.symbol.clone()).collect();
        let (prices, stale) = self
            .price_snapshot(session.token.as_deref(), &symbols)
            .await;
        build_summary(holdings, &prices, stale)
    }

    pub async fn summary(&self, session: &UserSession) -> Result<PortfolioSummary> {
        let holdings = self.load_holdings(session).await?;
        let summary = self.summarize(session, &holdings).await;
        info!(
            "Portfolio for {}: {} holdings, value {:.2}",
            session.email, summary.stats.asset_count, summary.stats.total_value
        );
        Ok(summary)
    }

    pub async fn asset(&self, session: &UserSession, symbol: &str) -> Result<AssetDetail> {
        let symbol = normalize_symbol(symbol);
        let holdings = self.load_holdings(session).await?;
        let summary = self.summarize(session, &holdings).await;
        let holding = summary
            .holdings
            .into_iter()
            .find(|view| normalize_symbol(&view.holding.symbol) == symbol)
            .ok_or_else(|| ServiceError::NotFound(symbol.clone()))?;

        let weight_percent = if summary.stats.total_value == 0.0 {
            0.0
        } else {
            holding.metrics.current_value / summary.stats.total_value * 100.0
        };
        let transactions = self
            .transactions(session, None)
            .await?
            .into_iter()
            .filter(|t| normalize_symbol(&t.symbol) == symbol)
            .collect();

        Ok(AssetDetail {
            holding,
            weight_percent,
            transactions,
        })
    }

    pub async fn market(&self) -> Vec<MarketQuote> {
        self.catalog.quotes().await
    }

    /// Newest first; rows without a timestamp keep their order at the end.
    pub async fn transactions(
        &self,
        session: &UserSession,
        filter: Option<TradeType>,
    ) -> Result<Vec<Transaction>> {
        let mut transactions: Vec<Transaction> = self
            .store
            .fetch_transactions(session)
            .await?
            .into_iter()
            .filter(|t| filter.map_or(true, |kind| t.trade_type == kind))
            .collect();
        transactions.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        Ok(transactions)
    }

    pub async fn insights(&self, session: &UserSession, symbols: &[String]) -> Result<AiAnalysis> {
        let mut wanted: Vec<String> = Vec::new();
        for symbol in symbols.iter().map(|s| normalize_symbol(s)) {
            if !symbol.is_empty() && !wanted.contains(&symbol) {
                wanted.push(symbol);
            }
        }
        if wanted.is_empty() {
            return Err(ServiceError::BadRequest(
                "at least one symbol is required".to_string(),
            ));
        }
        Ok(self
            .insights
            .analyze(session.token.as_deref(), &wanted)
            .await?)
    }

    pub async fn buy(&self, session: &UserSession, order: TradeOrder) -> Result<TradeReceipt> {
        self.execute(session, TradeType::Buy, order).await
    }

    pub async fn sell(&self, session: &UserSession, order: TradeOrder) -> Result<TradeReceipt> {
        self.execute(session, TradeType::Sell, order).await
    }

    /// Price for an order that names none. A live (or cached) quote wins.
    /// A SELL then falls back to the held position's effective price before
    /// the catalog listing; a BUY tries the listing first.
    async fn resolve_price(
        &self,
        session: &UserSession,
        trade_type: TradeType,
        symbol: &str,
        holdings: &[Holding],
        listing: Option<&MarketQuote>,
    ) -> Option<f64> {
        let (prices, _) = self
            .price_snapshot(session.token.as_deref(), &[symbol.to_string()])
            .await;
        let usable = |p: &f64| p.is_finite() && *p > 0.0;
        if let Some(price) = prices.get(symbol).copied().filter(usable) {
            return Some(price);
        }
        let listed = listing.map(|l| l.price).filter(usable);
        let held = holdings
            .iter()
            .find(|h| normalize_symbol(&h.symbol) == symbol)
            .map(|h| effective_price(h, &PriceMap::new()))
            .filter(usable);
        match trade_type {
            TradeType::Sell => held.or(listed),
            TradeType::Buy => listed.or(held),
        }
    }

    async fn execute(
        &self,
        session: &UserSession,
        trade_type: TradeType,
        order: TradeOrder,
    ) -> Result<TradeReceipt> {
        let symbol = normalize_symbol(&order.symbol);
        if symbol.is_empty() {
            return Err(TradeError::EmptySymbol.into());
        }
        let holdings = self.load_holdings(session).await?;
        let listing = self.catalog.listing(&symbol).await;

        let price = match order.price {
            Some(price) => price,
            None => self
                .resolve_price(session, trade_type, &symbol, &holdings, listing.as_ref())
                .await
                .ok_or_else(|| TradeError::NoPrice(symbol.clone()))?,
        };
        let request = TradeRequest {
            trade_type,
            symbol,
            shares: order.shares,
            price,
            sector: order
                .sector
                .or_else(|| listing.as_ref().map(|l| l.sector.clone())),
            name: order.name.or_else(|| listing.as_ref().map(|l| l.name.clone())),
        };
        let plan = plan_trade(&holdings, &request, &session.email, Utc::now())?;

        self.store
            .record_transaction(session, &plan.transaction)
            .await?;
        let applied = match &plan.change {
            HoldingChange::Create(holding) => self.store.create_holding(session, holding).await,
            HoldingChange::Update { id, update } => {
                self.store.update_holding(session, *id, update).await
            }
            HoldingChange::Delete { id } => self.store.delete_holding(session, *id).await,
        };
        if let Err(e) = applied {
            error!(
                "{} {} recorded but holding update failed: {}",
                plan.transaction.trade_type, plan.transaction.symbol, e
            );
            return Err(e.into());
        }
        info!(
            "Executed {} {} x{} @ {:.2} for {}",
            plan.transaction.trade_type,
            plan.transaction.symbol,
            plan.transaction.shares,
            plan.transaction.price,
            session.email
        );

        let summary = self.summary(session).await?;
        Ok(TradeReceipt {
            transaction: plan.transaction,
            summary,
        })
    }
}
