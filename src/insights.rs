// src/insights.rs
use serde::{Deserialize, Serialize};

const BULLISH_TERMS: [&str; 6] = [
    "bullish",
    "growth",
    "positive",
    "buy",
    "strong buy",
    "high growth",
];

/// Response of the remote insight service. Passed through untouched apart
/// from defaulting absent sections.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AiAnalysis {
    #[serde(default)]
    pub insights: Vec<Insight>,
    #[serde(default)]
    pub predictions: Vec<Prediction>,
    #[serde(default)]
    pub score: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Insight {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub severity: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub recommendation: String,
    #[serde(default)]
    pub impact: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Prediction {
    pub symbol: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub current_price: f64,
    #[serde(default)]
    pub predicted_price: f64,
    #[serde(default)]
    pub confidence: f64,
    #[serde(default)]
    pub timeframe: String,
    #[serde(default)]
    pub sentiment: String,
}

impl Prediction {
    /// Predicted move relative to the current price, in percent.
    pub fn expected_move_percent(&self) -> f64 {
        if self.current_price == 0.0 {
            return 0.0;
        }
        (self.predicted_price - self.current_price) / self.current_price * 100.0
    }

    pub fn is_bullish(&self) -> bool {
        is_bullish(&self.sentiment)
    }
}

pub fn is_bullish(sentiment: &str) -> bool {
    let sentiment = sentiment.to_lowercase();
    BULLISH_TERMS.iter().any(|term| sentiment.contains(term))
}
