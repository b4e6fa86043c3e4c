use clap::Args;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::BTreeMap;
use std::time::Instant;

use portfolio_analytics_core::stress::{Scenario, ScenarioExposures, ScenarioType, StressEngine};
use portfolio_analytics_core::AnalyticsConfig;

use super::{envelope, CommandResult};
use crate::input;

/// Arguments for scenario stress testing
#[derive(Args)]
pub struct StressArgs {
    /// Path to JSON input file (exposures and optional custom_scenarios)
    #[arg(long)]
    pub input: Option<String>,

    /// Run a single scenario by key (e.g. GFC_2008)
    #[arg(long)]
    pub scenario: Option<String>,

    /// Restrict to historical, hypothetical or custom scenarios
    #[arg(long)]
    pub scenario_type: Option<String>,
}

/// Arguments for listing the scenario catalog
#[derive(Args)]
pub struct ScenariosArgs {
    /// Restrict to historical, hypothetical or custom scenarios
    #[arg(long)]
    pub scenario_type: Option<String>,
}

/// Arguments for Monte Carlo portfolio simulation
#[derive(Args)]
pub struct MonteCarloArgs {
    /// Path to JSON input file (returns_matrix one row per asset, weights)
    #[arg(long)]
    pub input: Option<String>,

    /// Number of simulated paths
    #[arg(long, default_value = "10000")]
    pub simulations: usize,

    /// Horizon in trading days
    #[arg(long, default_value = "252")]
    pub horizon: usize,

    /// Starting portfolio value
    #[arg(long, default_value = "1000000")]
    pub initial_value: f64,
}

#[derive(Debug, Deserialize)]
struct StressInput {
    #[serde(flatten)]
    exposures: ScenarioExposures,
    #[serde(default)]
    custom_scenarios: BTreeMap<String, Scenario>,
}

#[derive(Debug, Deserialize)]
struct MonteCarloInput {
    returns_matrix: Vec<Vec<f64>>,
    weights: Vec<f64>,
}

#[derive(Debug, Serialize)]
struct ScenarioSummary {
    key: String,
    name: String,
    scenario_type: ScenarioType,
    equity_shock: f64,
    rates_shock_bps: f64,
    credit_spread_shock_bps: f64,
    description: String,
}

fn parse_type(name: &Option<String>) -> Result<Option<ScenarioType>, Box<dyn std::error::Error>> {
    Ok(match name {
        Some(n) => Some(n.parse()?),
        None => None,
    })
}

pub fn run_stress(args: StressArgs, config: &AnalyticsConfig) -> CommandResult {
    let started = Instant::now();
    let data: StressInput = input::load(&args.input, "stress testing")?;
    let scenario_type = parse_type(&args.scenario_type)?;

    let mut engine = StressEngine::new(config.clone());
    for (key, scenario) in data.custom_scenarios {
        engine.add_scenario(key, scenario);
    }

    let assumptions = json!({
        "equity": "value * beta * shock",
        "fixed_income": "-D * s * V + 0.5 * C * s^2 * V, s = rates + credit spread",
    });
    let methodology = "Deterministic scenario shocks applied to position exposures";

    if let Some(key) = args.scenario {
        let scenario = engine
            .get_scenario(&key)
            .ok_or_else(|| format!("Unknown scenario '{key}'. Run `pa scenarios` to list keys"))?;
        let result = engine.run_scenario(scenario, &data.exposures);
        return envelope(methodology, &assumptions, Vec::new(), started, result);
    }

    let results = engine.run_all_scenarios(&data.exposures, scenario_type);
    let worst = results
        .iter()
        .min_by(|a, b| a.1.portfolio_impact.total_cmp(&b.1.portfolio_impact))
        .map(|(k, r)| format!("Worst scenario: {} ({:.2})", k, r.portfolio_impact));
    envelope(methodology, &assumptions, worst.into_iter().collect(), started, results)
}

pub fn run_scenarios(args: ScenariosArgs, config: &AnalyticsConfig) -> CommandResult {
    let started = Instant::now();
    let scenario_type = parse_type(&args.scenario_type)?;
    let engine = StressEngine::new(config.clone());

    let rows: Vec<ScenarioSummary> = engine
        .list_scenarios(scenario_type)
        .into_iter()
        .filter_map(|key| {
            engine.get_scenario(&key).map(|s| ScenarioSummary {
                name: s.name.clone(),
                scenario_type: s.scenario_type,
                equity_shock: s.equity_shock,
                rates_shock_bps: s.rates_shock_bps,
                credit_spread_shock_bps: s.credit_spread_shock_bps,
                description: s.description.clone(),
                key,
            })
        })
        .collect();

    envelope("Built-in scenario catalog", &json!({}), Vec::new(), started, rows)
}

pub fn run_monte_carlo(args: MonteCarloArgs, config: &AnalyticsConfig) -> CommandResult {
    let started = Instant::now();
    let data: MonteCarloInput = input::load(&args.input, "Monte Carlo simulation")?;

    let engine = StressEngine::new(config.clone());
    let result = engine.monte_carlo_simulation(
        &data.returns_matrix,
        &data.weights,
        args.simulations,
        args.horizon,
        args.initial_value,
    )?;

    let mut warnings = Vec::new();
    if config.seed.is_none() {
        warnings.push("No seed configured; results are not reproducible".to_string());
    }

    envelope(
        "Multivariate normal daily returns (sample mean and covariance, Cholesky), compounded",
        &json!({
            "simulations": args.simulations,
            "horizon_days": args.horizon,
            "seed": config.seed,
        }),
        warnings,
        started,
        result,
    )
}
