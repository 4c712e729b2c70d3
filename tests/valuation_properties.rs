//! Property-based tests for the valuation engine.

use portfolio_tracker::models::{Holding, PortfolioStats, PriceMap, DEFAULT_SECTOR};
use portfolio_tracker::valuation::{
    compute_holding_metrics, compute_sector_allocation, compute_stats, find_extremum, Extremum,
};
use proptest::prelude::*;

// =============================================================================
// Generators
// =============================================================================

fn arb_sector() -> impl Strategy<Value = Option<String>> {
    prop_oneof![
        Just(None),
        Just(Some(String::new())),
        Just(Some("IT".to_string())),
        Just(Some("Finance".to_string())),
        Just(Some("Energy".to_string())),
    ]
}

/// Holdings with unique symbols, non-negative shares and cost basis.
fn arb_holdings(max: usize) -> impl Strategy<Value = Vec<Holding>> {
    proptest::collection::vec((0i64..1_000, 0.0f64..5_000.0, arb_sector()), 0..=max).prop_map(
        |rows| {
            rows.into_iter()
                .enumerate()
                .map(|(i, (shares, average_price, sector))| {
                    let mut holding = Holding::new(&format!("S{}", i), shares, average_price);
                    holding.sector = sector;
                    holding
                })
                .collect()
        },
    )
}

/// Prices for a random subset of the generated symbols.
fn arb_prices(max: usize) -> impl Strategy<Value = PriceMap> {
    proptest::collection::hash_map((0..max).prop_map(|i| format!("S{}", i)), 0.01f64..10_000.0, 0..=max)
}

// =============================================================================
// Property Tests
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    #[test]
    fn prop_stats_never_nan(holdings in arb_holdings(30), prices in arb_prices(30)) {
        let stats = compute_stats(&holdings, &prices);
        prop_assert!(stats.total_value.is_finite());
        prop_assert!(stats.total_investment.is_finite());
        prop_assert!(stats.total_gain.is_finite());
        prop_assert!(stats.gain_percent.is_finite());
    }

    #[test]
    fn prop_zero_cost_basis_gives_zero_gain_percent(shares in 0i64..1_000, price in 0.01f64..10_000.0) {
        let holding = Holding::new("FREE", shares, 0.0);
        let prices: PriceMap = [("FREE".to_string(), price)].into_iter().collect();
        prop_assert_eq!(compute_holding_metrics(&holding, &prices).gain_percent, 0.0);
    }

    #[test]
    fn prop_sector_percentages_sum_to_hundred(holdings in arb_holdings(30), prices in arb_prices(30)) {
        let stats = compute_stats(&holdings, &prices);
        let total: f64 = compute_sector_allocation(&holdings, &prices)
            .iter()
            .map(|s| s.percentage)
            .sum();
        if stats.total_value > 0.0 {
            prop_assert!((total - 100.0).abs() < 1e-6, "sum was {}", total);
        } else {
            prop_assert_eq!(total, 0.0);
        }
    }

    #[test]
    fn prop_sector_allocation_is_sorted_and_complete(holdings in arb_holdings(30), prices in arb_prices(30)) {
        let sectors = compute_sector_allocation(&holdings, &prices);
        prop_assert!(sectors.windows(2).all(|w| w[0].value >= w[1].value));
        let counted: usize = sectors.iter().map(|s| s.asset_count).sum();
        prop_assert_eq!(counted, holdings.len());
        prop_assert!(sectors.iter().all(|s| !s.sector.is_empty()));
    }

    #[test]
    fn prop_stats_are_idempotent(holdings in arb_holdings(30), prices in arb_prices(30)) {
        prop_assert_eq!(compute_stats(&holdings, &prices), compute_stats(&holdings, &prices));
        prop_assert_eq!(
            compute_sector_allocation(&holdings, &prices),
            compute_sector_allocation(&holdings, &prices)
        );
    }

    #[test]
    fn prop_raising_a_price_never_lowers_value(
        holdings in arb_holdings(20).prop_filter("non-empty", |h| !h.is_empty()),
        prices in arb_prices(20),
        pick in any::<prop::sample::Index>(),
        bump in 0.0f64..1_000.0,
    ) {
        let target = &holdings[pick.index(holdings.len())];
        let before = compute_stats(&holdings, &prices).total_value;

        let current = prices.get(&target.symbol).copied().unwrap_or(target.average_price);
        let mut raised = prices.clone();
        raised.insert(target.symbol.clone(), current.max(0.01) + bump);
        let after = compute_stats(&holdings, &raised).total_value;

        prop_assert!(after >= before - 1e-6, "{} < {}", after, before);
    }

    #[test]
    fn prop_missing_prices_value_at_cost(holdings in arb_holdings(30)) {
        let stats = compute_stats(&holdings, &PriceMap::new());
        prop_assert!((stats.total_value - stats.total_investment).abs() < 1e-6);
        prop_assert_eq!(stats.gain_percent, 0.0);
    }

    #[test]
    fn prop_extremum_bounds_every_holding(holdings in arb_holdings(30), prices in arb_prices(30)) {
        let best = find_extremum(&holdings, &prices, Extremum::Max);
        let worst = find_extremum(&holdings, &prices, Extremum::Min);
        prop_assert_eq!(best.is_none(), holdings.is_empty());
        if let (Some(best), Some(worst)) = (best, worst) {
            let hi = compute_holding_metrics(best, &prices).gain_percent;
            let lo = compute_holding_metrics(worst, &prices).gain_percent;
            for holding in &holdings {
                let gain = compute_holding_metrics(holding, &prices).gain_percent;
                prop_assert!(gain <= hi && gain >= lo);
            }
        }
    }
}

#[test]
fn empty_inputs_give_zero_stats() {
    let stats = compute_stats(&[], &PriceMap::new());
    assert_eq!(stats, PortfolioStats::default());
    assert!(compute_sector_allocation(&[], &PriceMap::new()).is_empty());
}

#[test]
fn unclassified_holdings_group_under_others() {
    let mut blank = Holding::new("B", 1, 10.0);
    blank.sector = Some(String::new());
    let holdings = vec![Holding::new("A", 1, 10.0), blank];
    let sectors = compute_sector_allocation(&holdings, &PriceMap::new());
    assert_eq!(sectors.len(), 1);
    assert_eq!(sectors[0].sector, DEFAULT_SECTOR);
    assert_eq!(sectors[0].asset_count, 2);
}
