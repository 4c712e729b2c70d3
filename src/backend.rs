// src/backend.rs
//! Seams to the remote collaborators. The REST implementation lives in
//! [`crate::client`]; tests plug in in-memory fakes.

use crate::error::ApiError;
use crate::insights::AiAnalysis;
use crate::models::{
    Holding, HoldingUpdate, NewHolding, NewTransaction, PriceMap, Transaction, UserSession,
};
use async_trait::async_trait;

pub type ApiResult<T> = std::result::Result<T, ApiError>;

#[async_trait]
pub trait PortfolioStore: Send + Sync {
    async fn fetch_holdings(&self, session: &UserSession) -> ApiResult<Vec<Holding>>;

    async fn create_holding(&self, session: &UserSession, holding: &NewHolding) -> ApiResult<()>;

    async fn update_holding(
        &self,
        session: &UserSession,
        id: i64,
        update: &HoldingUpdate,
    ) -> ApiResult<()>;

    async fn delete_holding(&self, session: &UserSession, id: i64) -> ApiResult<()>;

    async fn record_transaction(
        &self,
        session: &UserSession,
        transaction: &NewTransaction,
    ) -> ApiResult<()>;

    async fn fetch_transactions(&self, session: &UserSession) -> ApiResult<Vec<Transaction>>;
}

/// Source of live prices. Symbols the feed cannot price are absent from the map.
///
/// `token` is the caller's bearer token; `None` means a background request.
#[async_trait]
pub trait PriceFeed: Send + Sync {
    async fn fetch_prices(&self, token: Option<&str>, symbols: &[String]) -> ApiResult<PriceMap>;
}

#[async_trait]
pub trait InsightService: Send + Sync {
    async fn analyze(&self, token: Option<&str>, symbols: &[String]) -> ApiResult<AiAnalysis>;
}
