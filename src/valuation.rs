// src/valuation.rs
//! Portfolio valuation engine.
//!
//! Every function here is a pure projection over a holdings snapshot and a
//! price map. Missing prices degrade to cost-basis valuation and every ratio
//! is guarded against a zero denominator, so callers always get a fully
//! populated result.

use crate::models::{Holding, HoldingMetrics, PortfolioStats, PriceMap, SectorAllocation};
use std::cmp::Ordering;
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Extremum {
    Max,
    Min,
}

fn usable_price(price: Option<f64>) -> Option<f64> {
    price.filter(|p| p.is_finite() && *p > 0.0)
}

/// Live price from `prices`, then the holding's own quote, then its average cost.
pub fn effective_price(holding: &Holding, prices: &PriceMap) -> f64 {
    usable_price(prices.get(&holding.symbol).copied())
        .or_else(|| usable_price(holding.current_price))
        .unwrap_or(holding.average_price)
}

fn percent_of(part: f64, whole: f64) -> f64 {
    if whole == 0.0 {
        0.0
    } else {
        part / whole * 100.0
    }
}

pub fn compute_stats(holdings: &[Holding], prices: &PriceMap) -> PortfolioStats {
    let (total_investment, total_value) =
        holdings
            .iter()
            .fold((0.0, 0.0), |(investment, value), holding| {
                let shares = holding.shares as f64;
                (
                    investment + holding.average_price * shares,
                    value + effective_price(holding, prices) * shares,
                )
            });
    let total_gain = total_value - total_investment;

    PortfolioStats {
        total_value,
        total_investment,
        total_gain,
        gain_percent: percent_of(total_gain, total_investment),
        asset_count: holdings.len(),
    }
}

pub fn compute_sector_allocation(holdings: &[Holding], prices: &PriceMap) -> Vec<SectorAllocation> {
    let mut sectors: Vec<SectorAllocation> = Vec::new();
    let mut index: HashMap<&str, usize> = HashMap::new();
    let mut total_value = 0.0;

    for holding in holdings {
        let value = effective_price(holding, prices) * holding.shares as f64;
        total_value += value;

        let sector = holding.sector_or_default();
        match index.get(sector) {
            Some(&i) => {
                sectors[i].value += value;
                sectors[i].asset_count += 1;
            }
            None => {
                index.insert(sector, sectors.len());
                sectors.push(SectorAllocation {
                    sector: sector.to_string(),
                    value,
                    percentage: 0.0,
                    asset_count: 1,
                });
            }
        }
    }

    for allocation in &mut sectors {
        allocation.percentage = percent_of(allocation.value, total_value);
    }
    // sort_by is stable: equal values keep first-appearance order
    sectors.sort_by(|a, b| b.value.partial_cmp(&a.value).unwrap_or(Ordering::Equal));
    sectors
}

pub fn compute_holding_metrics(holding: &Holding, prices: &PriceMap) -> HoldingMetrics {
    let price = effective_price(holding, prices);
    let shares = holding.shares as f64;
    let per_share_gain = price - holding.average_price;

    HoldingMetrics {
        current_value: price * shares,
        gain: per_share_gain * shares,
        gain_percent: percent_of(per_share_gain, holding.average_price),
    }
}

/// Best or worst performer by gain percentage.
///
/// Ties go to the lexicographically smallest symbol so the answer does not
/// depend on the order the store happened to return rows in.
pub fn find_extremum<'a>(
    holdings: &'a [Holding],
    prices: &PriceMap,
    direction: Extremum,
) -> Option<&'a Holding> {
    let mut best: Option<(&Holding, f64)> = None;

    for holding in holdings {
        let gain = compute_holding_metrics(holding, prices).gain_percent;
        let replace = match best {
            None => true,
            Some((current, current_gain)) => {
                let ordering = match direction {
                    Extremum::Max => gain.partial_cmp(&current_gain),
                    Extremum::Min => current_gain.partial_cmp(&gain),
                };
                match ordering {
                    Some(Ordering::Greater) => true,
                    Some(Ordering::Equal) => holding.symbol < current.symbol,
                    _ => false,
                }
            }
        };
        if replace {
            best = Some((holding, gain));
        }
    }

    best.map(|(holding, _)| holding)
}
