// src/trade.rs
//! Planning of simulated BUY/SELL trades against a holdings snapshot.
//!
//! A repeat BUY blends the cost basis: the new average price is the
//! share-weighted mean of the old position and the new lot. A partial SELL
//! keeps the average price; selling every share removes the holding.

use crate::error::TradeError;
use crate::models::{
    Holding, HoldingUpdate, NewHolding, NewTransaction, TradeType, DEFAULT_SECTOR,
};
use chrono::{DateTime, Utc};

/// What the caller asked for, with the price already resolved.
#[derive(Debug, Clone, PartialEq)]
pub struct TradeRequest {
    pub trade_type: TradeType,
    pub symbol: String,
    pub shares: i64,
    pub price: f64,
    pub sector: Option<String>,
    pub name: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum HoldingChange {
    Create(NewHolding),
    Update { id: i64, update: HoldingUpdate },
    Delete { id: i64 },
}

/// The two store calls a trade turns into. The transaction is recorded first.
#[derive(Debug, Clone, PartialEq)]
pub struct TradePlan {
    pub transaction: NewTransaction,
    pub change: HoldingChange,
}

pub fn normalize_symbol(symbol: &str) -> String {
    symbol.trim().to_ascii_uppercase()
}

fn blended_average(holding: &Holding, shares: i64, price: f64) -> f64 {
    let held = holding.shares.max(0) as f64;
    let added = shares as f64;
    (holding.average_price * held + price * added) / (held + added)
}

pub fn plan_trade(
    holdings: &[Holding],
    request: &TradeRequest,
    user_email: &str,
    now: DateTime<Utc>,
) -> Result<TradePlan, TradeError> {
    let symbol = normalize_symbol(&request.symbol);
    if symbol.is_empty() {
        return Err(TradeError::EmptySymbol);
    }
    if request.shares <= 0 {
        return Err(TradeError::InvalidShares(request.shares));
    }
    if !request.price.is_finite() || request.price <= 0.0 {
        return Err(TradeError::InvalidPrice(request.price));
    }

    let existing = holdings
        .iter()
        .find(|h| normalize_symbol(&h.symbol) == symbol);

    let change = match (request.trade_type, existing) {
        (TradeType::Buy, None) => HoldingChange::Create(NewHolding {
            symbol: symbol.clone(),
            name: request.name.clone(),
            shares: request.shares,
            average_price: request.price,
            sector: request
                .sector
                .clone()
                .filter(|s| !s.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_SECTOR.to_string()),
            user_email: user_email.to_string(),
        }),
        (TradeType::Buy, Some(holding)) => {
            let id = holding.id.ok_or_else(|| TradeError::MissingId(symbol.clone()))?;
            let shares = holding
                .shares
                .max(0)
                .checked_add(request.shares)
                .ok_or(TradeError::InvalidShares(request.shares))?;
            HoldingChange::Update {
                id,
                update: HoldingUpdate {
                    shares,
                    average_price: blended_average(holding, request.shares, request.price),
                },
            }
        }
        (TradeType::Sell, None) => return Err(TradeError::NotHeld(symbol)),
        (TradeType::Sell, Some(holding)) => {
            if request.shares > holding.shares {
                return Err(TradeError::InsufficientShares {
                    symbol,
                    requested: request.shares,
                    owned: holding.shares,
                });
            }
            let id = holding.id.ok_or_else(|| TradeError::MissingId(symbol.clone()))?;
            if request.shares == holding.shares {
                HoldingChange::Delete { id }
            } else {
                HoldingChange::Update {
                    id,
                    update: HoldingUpdate {
                        shares: holding.shares - request.shares,
                        average_price: holding.average_price,
                    },
                }
            }
        }
    };

    Ok(TradePlan {
        transaction: NewTransaction {
            symbol,
            trade_type: request.trade_type,
            shares: request.shares,
            price: request.price,
            total: request.shares as f64 * request.price,
            timestamp: now,
            user_email: user_email.to_string(),
        },
        change,
    })
}
