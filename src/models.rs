// src/models.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Sector bucket used for holdings that carry no classification.
pub const DEFAULT_SECTOR: &str = "Others";

/// Live prices keyed by ticker symbol. May cover only part of a portfolio.
pub type PriceMap = HashMap<String, f64>;

/// One owned position, as returned by the remote portfolio store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Holding {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub symbol: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub shares: i64,
    pub average_price: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sector: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_price: Option<f64>,
}

impl Holding {
    pub fn new(symbol: &str, shares: i64, average_price: f64) -> Self {
        Holding {
            id: None,
            symbol: symbol.to_string(),
            name: None,
            shares,
            average_price,
            sector: None,
            current_price: None,
        }
    }

    pub fn with_sector(mut self, sector: &str) -> Self {
        self.sector = Some(sector.to_string());
        self
    }

    pub fn with_id(mut self, id: i64) -> Self {
        self.id = Some(id);
        self
    }

    /// Sector name with blank or missing values folded into [`DEFAULT_SECTOR`].
    pub fn sector_or_default(&self) -> &str {
        match self.sector.as_deref().map(str::trim) {
            Some(sector) if !sector.is_empty() => sector,
            _ => DEFAULT_SECTOR,
        }
    }
}

/// Aggregate figures for a whole portfolio. Derived on every call, never stored.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PortfolioStats {
    pub total_value: f64,
    pub total_investment: f64,
    pub total_gain: f64,
    pub gain_percent: f64,
    pub asset_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SectorAllocation {
    pub sector: String,
    pub value: f64,
    pub percentage: f64,
    pub asset_count: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HoldingMetrics {
    pub current_value: f64,
    pub gain: f64,
    pub gain_percent: f64,
}

/// Serialized as `BUY`/`SELL`; any casing is accepted on input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TradeType {
    Buy,
    Sell,
}

impl fmt::Display for TradeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TradeType::Buy => write!(f, "BUY"),
            TradeType::Sell => write!(f, "SELL"),
        }
    }
}

impl std::str::FromStr for TradeType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "BUY" => Ok(TradeType::Buy),
            "SELL" => Ok(TradeType::Sell),
            other => Err(format!("unknown trade type: {}", other)),
        }
    }
}

impl<'de> Deserialize<'de> for TradeType {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// A recorded trade as returned by the store. Immutable once recorded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub symbol: String,
    #[serde(rename = "type")]
    pub trade_type: TradeType,
    pub shares: i64,
    pub price: f64,
    pub total: f64,
    #[serde(default, alias = "createdAt", skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
    #[serde(default)]
    pub user_email: String,
}

/// Body posted to the store when a trade is recorded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTransaction {
    pub symbol: String,
    #[serde(rename = "type")]
    pub trade_type: TradeType,
    pub shares: i64,
    pub price: f64,
    pub total: f64,
    pub timestamp: DateTime<Utc>,
    pub user_email: String,
}

/// Body posted to the store when a holding is first created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewHolding {
    pub symbol: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub shares: i64,
    pub average_price: f64,
    pub sector: String,
    pub user_email: String,
}

/// Body sent to the store when an existing holding changes size or cost basis.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HoldingUpdate {
    pub shares: i64,
    pub average_price: f64,
}

/// Who a request is made for. Passed explicitly to everything that talks to the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserSession {
    pub email: String,
    pub token: Option<String>,
}

impl UserSession {
    pub fn new(email: &str) -> Self {
        UserSession {
            email: email.to_string(),
            token: None,
        }
    }

    pub fn with_token(mut self, token: &str) -> Self {
        self.token = Some(token.to_string());
        self
    }
}
