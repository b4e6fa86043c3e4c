use approx::assert_relative_eq;
use portfolio_analytics_core::liquidity::LiquidityAnalyzer;
use portfolio_analytics_core::risk::RiskEngine;
use portfolio_analytics_core::stress::{
    EquityExposure, FixedIncomeExposure, Scenario, ScenarioExposures, ScenarioType, StressEngine,
};
use portfolio_analytics_core::AnalyticsConfig;

fn balanced_book() -> ScenarioExposures {
    let mut exposures = ScenarioExposures::default();
    exposures.equity.insert(
        "AAPL".into(),
        EquityExposure {
            value: 100_000.0,
            beta: 1.2,
        },
    );
    exposures.fixed_income.insert(
        "UST10".into(),
        FixedIncomeExposure {
            value: 200_000.0,
            duration: 8.5,
            convexity: 90.0,
        },
    );
    exposures.commodity.insert("OIL".into(), 25_000.0);
    exposures
}

// ===========================================================================
// Scenarios
// ===========================================================================

#[test]
fn test_gfc_equity_impact() {
    let engine = StressEngine::default();
    let exposures = ScenarioExposures {
        equity: [(
            "AAPL".to_string(),
            EquityExposure {
                value: 100_000.0,
                beta: 1.2,
            },
        )]
        .into_iter()
        .collect(),
        ..Default::default()
    };
    let result = engine.run_scenario(engine.get_scenario("GFC_2008").unwrap(), &exposures);
    assert_relative_eq!(result.equity_impact, -54_000.0, epsilon = 1e-9);
}

#[test]
fn test_channels_sum_to_portfolio_impact() {
    let engine = StressEngine::default();
    for (key, result) in engine.run_all_scenarios(&balanced_book(), None) {
        let channels = result.equity_impact
            + result.fixed_income_impact
            + result.fx_impact
            + result.commodity_impact;
        assert_relative_eq!(result.portfolio_impact, channels, epsilon = 1e-9);
        let positions: f64 = result.position_impacts.values().sum();
        assert_relative_eq!(result.portfolio_impact, positions, epsilon = 1e-6, max_relative = 1e-12);
        assert!(!key.is_empty());
    }
}

#[test]
fn test_net_spread_move_drives_bonds() {
    let engine = StressEngine::default();
    // GFC: -200 rates + 500 credit = +300 bps net, bonds lose
    let gfc = engine.run_scenario(engine.get_scenario("GFC_2008").unwrap(), &balanced_book());
    assert!(gfc.fixed_income_impact < 0.0);
    // RATES_DOWN_200: -200 rates - 25 credit, bonds rally
    let down = engine.run_scenario(engine.get_scenario("RATES_DOWN_200").unwrap(), &balanced_book());
    assert!(down.fixed_income_impact > 0.0);
}

#[test]
fn test_custom_scenario_round_trips_through_catalog() {
    let mut engine = StressEngine::default();
    let custom: Scenario = serde_json::from_str(
        r#"{"name": "Oil spike", "scenario_type": "custom", "commodity_shocks": {"OIL": 0.5}}"#,
    )
    .unwrap();
    engine.add_scenario("OIL_SPIKE", custom);
    let results = engine.run_all_scenarios(&balanced_book(), Some(ScenarioType::Custom));
    assert_eq!(results.len(), 1);
    assert_relative_eq!(results["OIL_SPIKE"].commodity_impact, 12_500.0, epsilon = 1e-9);
}

// ===========================================================================
// Monte Carlo
// ===========================================================================

#[cfg(feature = "monte_carlo")]
#[test]
fn test_monte_carlo_percentile_bracket() {
    let engine = StressEngine::new(AnalyticsConfig {
        seed: Some(11),
        ..AnalyticsConfig::default()
    });
    let history = vec![
        vec![0.012, -0.008, 0.004, -0.021, 0.015, 0.007, -0.013, 0.009, -0.002, 0.018],
        vec![0.003, 0.001, -0.002, 0.004, -0.001, 0.002, 0.000, 0.001, -0.003, 0.002],
        vec![0.020, -0.015, 0.010, -0.030, 0.025, 0.012, -0.020, 0.015, -0.005, 0.028],
    ];
    let result = engine
        .monte_carlo_simulation(&history, &[0.5, 0.3, 0.2], 1_000, 30, 1_000_000.0)
        .unwrap();
    assert!(result.percentile_5 < result.mean_final_value);
    assert!(result.mean_final_value < result.percentile_95);
    assert!(result.percentile_25 <= result.percentile_50);
    assert!(result.percentile_50 <= result.percentile_75);

    let again = engine
        .monte_carlo_simulation(&history, &[0.5, 0.3, 0.2], 1_000, 30, 1_000_000.0)
        .unwrap();
    assert_eq!(result, again);
}

#[cfg(feature = "monte_carlo")]
#[test]
fn test_portfolio_var_and_simulation_share_matrix_layout() {
    // assets x time: two assets, five observations each
    let history = vec![
        vec![0.010, -0.020, 0.015, -0.030, 0.020],
        vec![0.000, -0.010, 0.005, -0.010, 0.010],
    ];
    let weights = [0.5, 0.5];
    let config = AnalyticsConfig {
        seed: Some(3),
        ..AnalyticsConfig::default()
    };

    // portfolio series: 0.005, -0.015, 0.010, -0.020, 0.015
    let var = RiskEngine::new(config.clone())
        .portfolio_var(&weights, &history, 0.95, 1_000_000.0)
        .unwrap();
    assert_relative_eq!(var, 19_000.0, epsilon = 1e-6);

    let sim = StressEngine::new(config)
        .monte_carlo_simulation(&history, &weights, 500, 5, 1_000_000.0)
        .unwrap();
    assert_eq!(sim.num_simulations, 500);
    assert!(sim.percentile_5 < sim.percentile_95);
}

// ===========================================================================
// Liquidity
// ===========================================================================

#[test]
fn test_market_impact_tenth_of_adv() {
    let impact = LiquidityAnalyzer::new()
        .estimate_market_impact(100_000.0, 1_000_000.0, 10.0, 0.02, 0.10)
        .unwrap();
    assert_relative_eq!(impact.pct_adv, 0.10, epsilon = 1e-12);
    assert_relative_eq!(impact.days_to_trade, 1.0, epsilon = 1e-9);
}

#[test]
fn test_infinite_days_serialize_as_null() {
    let impact = LiquidityAnalyzer::new()
        .estimate_market_impact(1_000.0, 0.0, 10.0, 0.02, 0.10)
        .unwrap();
    let json = serde_json::to_value(impact).unwrap();
    assert!(json["days_to_trade"].is_null());
    assert_eq!(json["total_cost_bps"], 10.0);
}
