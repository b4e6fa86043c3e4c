use clap::Args;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::time::Instant;

use portfolio_analytics_core::optimization::{
    marginal_risk_contribution, risk_contribution, BlView, OptimizationConstraints, OptimizationEngine,
    OptimizationObjective, OptimizationResult, DEFAULT_RISK_AVERSION, DEFAULT_TAU,
};
use portfolio_analytics_core::AnalyticsConfig;

use super::{envelope, CommandResult};
use crate::input;

/// Arguments for mean-variance optimization
#[derive(Args)]
pub struct OptimizeArgs {
    /// Path to JSON input file (symbols, expected_returns, covariance, constraints)
    #[arg(long)]
    pub input: Option<String>,

    /// Objective override: max_sharpe, min_variance, max_return, target_return, target_volatility
    #[arg(long)]
    pub objective: Option<String>,
}

/// Arguments for risk-parity construction
#[derive(Args)]
pub struct RiskParityArgs {
    /// Path to JSON input file (symbols, covariance, optional risk_budget)
    #[arg(long)]
    pub input: Option<String>,
}

/// Arguments for Black-Litterman optimization
#[derive(Args)]
pub struct BlackLittermanArgs {
    /// Path to JSON input file (symbols, market_cap_weights, covariance, views)
    #[arg(long)]
    pub input: Option<String>,
}

/// Arguments for efficient frontier tracing
#[derive(Args)]
pub struct FrontierArgs {
    /// Path to JSON input file (symbols, expected_returns, covariance, constraints)
    #[arg(long)]
    pub input: Option<String>,

    /// Number of frontier points
    #[arg(long, default_value = "20")]
    pub points: usize,
}

/// Arguments for risk decomposition of a fixed portfolio
#[derive(Args)]
pub struct RiskContributionArgs {
    /// Path to JSON input file (symbols, weights, covariance)
    #[arg(long)]
    pub input: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OptimizeInput {
    symbols: Vec<String>,
    expected_returns: Vec<f64>,
    covariance: Vec<Vec<f64>>,
    #[serde(default)]
    objective: Option<String>,
    #[serde(default)]
    constraints: OptimizationConstraints,
}

#[derive(Debug, Deserialize)]
struct RiskParityInput {
    symbols: Vec<String>,
    covariance: Vec<Vec<f64>>,
    #[serde(default)]
    risk_budget: Option<Vec<f64>>,
}

#[derive(Debug, Deserialize)]
struct BlackLittermanInput {
    symbols: Vec<String>,
    market_cap_weights: Vec<f64>,
    covariance: Vec<Vec<f64>>,
    #[serde(default)]
    views: Vec<BlView>,
    #[serde(default = "default_tau")]
    tau: f64,
    #[serde(default = "default_risk_aversion")]
    risk_aversion: f64,
}

fn default_tau() -> f64 {
    DEFAULT_TAU
}

fn default_risk_aversion() -> f64 {
    DEFAULT_RISK_AVERSION
}

#[derive(Debug, Deserialize)]
struct FrontierInput {
    symbols: Vec<String>,
    expected_returns: Vec<f64>,
    covariance: Vec<Vec<f64>>,
    #[serde(default)]
    n_points: Option<usize>,
    #[serde(default)]
    constraints: OptimizationConstraints,
}

#[derive(Debug, Deserialize)]
struct RiskContributionInput {
    symbols: Vec<String>,
    weights: Vec<f64>,
    covariance: Vec<Vec<f64>>,
}

#[derive(Debug, Serialize)]
struct AssetRisk {
    symbol: String,
    weight: f64,
    marginal_contribution: f64,
    absolute_contribution: f64,
    percentage_contribution: f64,
}

#[derive(Debug, Serialize)]
struct BlackLittermanOutput {
    posterior_returns: Vec<f64>,
    portfolio: OptimizationResult,
}

fn solver_warnings(result: &OptimizationResult) -> Vec<String> {
    if result.success {
        Vec::new()
    } else {
        vec![format!("Optimizer did not converge: {}", result.message)]
    }
}

pub fn run_optimize(args: OptimizeArgs, config: &AnalyticsConfig) -> CommandResult {
    let started = Instant::now();
    let data: OptimizeInput = input::load(&args.input, "optimization")?;
    let objective: OptimizationObjective = match args.objective.or(data.objective) {
        Some(name) => name.parse()?,
        None => OptimizationObjective::MaxSharpe,
    };

    let engine = OptimizationEngine::new(config.clone());
    let result = engine.mean_variance_optimize(
        &data.symbols,
        &data.expected_returns,
        &data.covariance,
        objective,
        &data.constraints,
    )?;

    envelope(
        &format!("Mean-variance optimization ({objective}), augmented Lagrangian solver"),
        &json!({
            "risk_free_rate": config.risk_free_rate,
            "constraints": data.constraints,
        }),
        solver_warnings(&result),
        started,
        result,
    )
}

pub fn run_risk_parity(args: RiskParityArgs, config: &AnalyticsConfig) -> CommandResult {
    let started = Instant::now();
    let data: RiskParityInput = input::load(&args.input, "risk parity")?;

    let engine = OptimizationEngine::new(config.clone());
    let result = engine.risk_parity_optimize(&data.symbols, &data.covariance, data.risk_budget.as_deref())?;

    envelope(
        "Risk parity: squared deviation of risk contributions from budget",
        &json!({ "risk_budget": data.risk_budget }),
        solver_warnings(&result),
        started,
        result,
    )
}

pub fn run_black_litterman(args: BlackLittermanArgs, config: &AnalyticsConfig) -> CommandResult {
    let started = Instant::now();
    let data: BlackLittermanInput = input::load(&args.input, "Black-Litterman")?;

    let engine = OptimizationEngine::new(config.clone());
    let posterior_returns = engine.black_litterman_returns(
        &data.market_cap_weights,
        &data.covariance,
        &data.views,
        data.tau,
        data.risk_aversion,
    )?;
    let portfolio = engine.black_litterman(
        &data.symbols,
        &data.market_cap_weights,
        &data.covariance,
        &data.views,
        data.tau,
        data.risk_aversion,
    )?;
    let warnings = solver_warnings(&portfolio);

    envelope(
        "Black-Litterman posterior returns, max-Sharpe allocation",
        &json!({
            "tau": data.tau,
            "risk_aversion": data.risk_aversion,
            "views": data.views.len(),
        }),
        warnings,
        started,
        BlackLittermanOutput {
            posterior_returns,
            portfolio,
        },
    )
}

pub fn run_frontier(args: FrontierArgs, config: &AnalyticsConfig) -> CommandResult {
    let started = Instant::now();
    let data: FrontierInput = input::load(&args.input, "efficient frontier")?;
    let n_points = data.n_points.unwrap_or(args.points);

    let engine = OptimizationEngine::new(config.clone());
    let points = engine.efficient_frontier(
        &data.symbols,
        &data.expected_returns,
        &data.covariance,
        n_points,
        &data.constraints,
    )?;

    let mut warnings = Vec::new();
    if points.len() < n_points {
        warnings.push(format!(
            "{} of {} frontier points did not solve",
            n_points - points.len(),
            n_points
        ));
    }

    envelope(
        "Efficient frontier: minimum variance at evenly spaced target returns",
        &json!({ "n_points": n_points, "risk_free_rate": config.risk_free_rate }),
        warnings,
        started,
        points,
    )
}

pub fn run_risk_contribution(args: RiskContributionArgs, _config: &AnalyticsConfig) -> CommandResult {
    let started = Instant::now();
    let data: RiskContributionInput = input::load(&args.input, "risk contribution")?;
    if data.symbols.len() != data.weights.len() {
        return Err(format!(
            "{} symbols but {} weights",
            data.symbols.len(),
            data.weights.len()
        )
        .into());
    }

    let marginal = marginal_risk_contribution(&data.weights, &data.covariance)?;
    let contribution = risk_contribution(&data.weights, &data.covariance)?;

    let rows: Vec<AssetRisk> = data
        .symbols
        .iter()
        .enumerate()
        .map(|(i, symbol)| AssetRisk {
            symbol: symbol.clone(),
            weight: data.weights[i],
            marginal_contribution: marginal[i],
            absolute_contribution: contribution.absolute[i],
            percentage_contribution: contribution.percentage[i],
        })
        .collect();

    envelope(
        "Euler risk decomposition of portfolio volatility",
        &json!({}),
        Vec::new(),
        started,
        rows,
    )
}
