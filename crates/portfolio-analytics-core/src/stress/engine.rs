use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

use crate::config::AnalyticsConfig;
use crate::types::Money;

use super::impact::{
    commodity_impact, equity_impact, fixed_income_impact, fx_impact, EquityExposure,
    FixedIncomeExposure,
};
use super::scenario::{default_catalog, Scenario, ScenarioCatalog, ScenarioType};

/// Portfolio exposures a scenario is applied to. Every class is optional.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScenarioExposures {
    /// Symbol -> value and beta
    #[serde(default)]
    pub equity: BTreeMap<String, EquityExposure>,
    /// Symbol -> value, duration and convexity
    #[serde(default)]
    pub fixed_income: BTreeMap<String, FixedIncomeExposure>,
    /// Currency pair -> exposure
    #[serde(default)]
    pub fx: BTreeMap<String, Money>,
    /// Commodity -> exposure
    #[serde(default)]
    pub commodity: BTreeMap<String, Money>,
}

/// P&L of a portfolio under one scenario.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioResult {
    pub scenario: Scenario,
    /// Sum of every asset-class impact
    pub portfolio_impact: Money,
    pub equity_impact: Money,
    pub fixed_income_impact: Money,
    pub fx_impact: Money,
    pub commodity_impact: Money,
    /// Position key -> P&L, across all asset classes
    pub position_impacts: BTreeMap<String, Money>,
}

/// Scenario catalog plus the settings used for Monte Carlo simulation.
#[derive(Debug, Clone)]
pub struct StressEngine {
    pub(crate) config: AnalyticsConfig,
    scenarios: ScenarioCatalog,
}

impl Default for StressEngine {
    fn default() -> Self {
        StressEngine::new(AnalyticsConfig::default())
    }
}

impl StressEngine {
    /// Engine preloaded with the historical and hypothetical catalogs.
    pub fn new(config: AnalyticsConfig) -> Self {
        StressEngine {
            config,
            scenarios: default_catalog(),
        }
    }

    pub fn config(&self) -> &AnalyticsConfig {
        &self.config
    }

    /// Register a scenario, replacing any existing one under `key`.
    pub fn add_scenario(&mut self, key: impl Into<String>, scenario: Scenario) {
        self.scenarios.insert(key.into(), scenario);
    }

    pub fn get_scenario(&self, key: &str) -> Option<&Scenario> {
        self.scenarios.get(key)
    }

    /// Scenario keys in sorted order, optionally restricted to one type.
    pub fn list_scenarios(&self, scenario_type: Option<ScenarioType>) -> Vec<String> {
        self.scenarios
            .iter()
            .filter(|(_, s)| scenario_type.map_or(true, |t| s.scenario_type == t))
            .map(|(k, _)| k.clone())
            .collect()
    }

    /// Apply one scenario's shocks to the exposures.
    ///
    /// FX and commodity impacts are computed only when the scenario defines
    /// shocks for that class; otherwise they stay at zero.
    pub fn run_scenario(&self, scenario: &Scenario, exposures: &ScenarioExposures) -> ScenarioResult {
        let mut position_impacts = BTreeMap::new();

        let mut equity = 0.0;
        if !exposures.equity.is_empty() {
            let breakdown = equity_impact(&exposures.equity, scenario.equity_shock);
            equity = breakdown.total;
            position_impacts.extend(breakdown.by_position);
        }

        let mut fixed_income = 0.0;
        if !exposures.fixed_income.is_empty() {
            let breakdown = fixed_income_impact(
                &exposures.fixed_income,
                scenario.rates_shock_bps,
                scenario.credit_spread_shock_bps,
            );
            fixed_income = breakdown.total;
            position_impacts.extend(breakdown.by_position);
        }

        let mut fx = 0.0;
        if !exposures.fx.is_empty() && !scenario.fx_shocks.is_empty() {
            let breakdown = fx_impact(&exposures.fx, &scenario.fx_shocks);
            fx = breakdown.total;
            position_impacts.extend(breakdown.by_position);
        }

        let mut commodity = 0.0;
        if !exposures.commodity.is_empty() && !scenario.commodity_shocks.is_empty() {
            let breakdown = commodity_impact(&exposures.commodity, &scenario.commodity_shocks);
            commodity = breakdown.total;
            position_impacts.extend(breakdown.by_position);
        }

        let portfolio_impact = equity + fixed_income + fx + commodity;
        debug!(scenario = %scenario.name, portfolio_impact, "scenario applied");

        ScenarioResult {
            scenario: scenario.clone(),
            portfolio_impact,
            equity_impact: equity,
            fixed_income_impact: fixed_income,
            fx_impact: fx,
            commodity_impact: commodity,
            position_impacts,
        }
    }

    /// Run every catalog scenario (optionally of one type), keyed like the catalog.
    pub fn run_all_scenarios(
        &self,
        exposures: &ScenarioExposures,
        scenario_type: Option<ScenarioType>,
    ) -> BTreeMap<String, ScenarioResult> {
        self.scenarios
            .iter()
            .filter(|(_, s)| scenario_type.map_or(true, |t| s.scenario_type == t))
            .map(|(key, s)| (key.clone(), self.run_scenario(s, exposures)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn equity_book() -> ScenarioExposures {
        ScenarioExposures {
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
        }
    }

    #[test]
    fn test_gfc_equity_only() {
        let engine = StressEngine::default();
        let gfc = engine.get_scenario("GFC_2008").unwrap();
        let result = engine.run_scenario(gfc, &equity_book());
        assert_relative_eq!(result.equity_impact, -54_000.0, epsilon = 1e-9);
        assert_relative_eq!(result.portfolio_impact, -54_000.0, epsilon = 1e-9);
        assert_eq!(result.fixed_income_impact, 0.0);
        assert_relative_eq!(result.position_impacts["AAPL"], -54_000.0, epsilon = 1e-9);
    }

    #[test]
    fn test_fx_skipped_without_scenario_shocks() {
        let engine = StressEngine::default();
        let mut exposures = equity_book();
        exposures.fx.insert("USD/EUR".into(), 100_000.0);

        let gfc = engine.run_scenario(engine.get_scenario("GFC_2008").unwrap(), &exposures);
        assert_eq!(gfc.fx_impact, 0.0);
        assert!(!gfc.position_impacts.contains_key("USD/EUR"));

        let usd = engine.run_scenario(engine.get_scenario("USD_CRISIS").unwrap(), &exposures);
        assert_relative_eq!(usd.fx_impact, -15_000.0, epsilon = 1e-9);
        assert_relative_eq!(
            usd.portfolio_impact,
            usd.equity_impact + usd.fx_impact,
            epsilon = 1e-9
        );
    }

    #[test]
    fn test_list_and_filter() {
        let engine = StressEngine::default();
        assert_eq!(engine.list_scenarios(None).len(), 17);
        assert_eq!(engine.list_scenarios(Some(ScenarioType::Historical)).len(), 7);
        assert!(engine.list_scenarios(Some(ScenarioType::Custom)).is_empty());
        let keys = engine.list_scenarios(None);
        let mut sorted = keys.clone();
        sorted.sort();
        assert_eq!(keys, sorted);
    }

    #[test]
    fn test_add_custom_scenario() {
        let mut engine = StressEngine::default();
        engine.add_scenario(
            "TECH_SELLOFF",
            Scenario::new("Tech selloff", ScenarioType::Custom, "").equity(-0.3),
        );
        assert_eq!(engine.list_scenarios(Some(ScenarioType::Custom)), vec!["TECH_SELLOFF"]);
        let results = engine.run_all_scenarios(&equity_book(), Some(ScenarioType::Custom));
        assert_relative_eq!(results["TECH_SELLOFF"].portfolio_impact, -36_000.0, epsilon = 1e-9);
    }

    #[test]
    fn test_run_all_covers_catalog() {
        let engine = StressEngine::default();
        let results = engine.run_all_scenarios(&equity_book(), None);
        assert_eq!(results.len(), 17);
        // RATES_DOWN_200 is the only equity-positive scenario
        let gains: Vec<_> = results
            .iter()
            .filter(|(_, r)| r.portfolio_impact > 0.0)
            .map(|(k, _)| k.as_str())
            .collect();
        assert_eq!(gains, vec!["RATES_DOWN_200"]);
    }

    #[test]
    fn test_empty_exposures() {
        let engine = StressEngine::default();
        let result = engine.run_scenario(
            engine.get_scenario("STAGFLATION").unwrap(),
            &ScenarioExposures::default(),
        );
        assert_eq!(result.portfolio_impact, 0.0);
        assert!(result.position_impacts.is_empty());
    }
}
