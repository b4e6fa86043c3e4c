use clap::Args;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::time::Instant;

use portfolio_analytics_core::risk::{RiskEngine, VarMethod};
use portfolio_analytics_core::AnalyticsConfig;

use super::{envelope, CommandResult};
use crate::input;

/// Arguments for the full risk metric set
#[derive(Args)]
pub struct RiskMetricsArgs {
    /// Path to JSON input file ({"returns": [...], "prices": [...], "benchmark": [...]})
    #[arg(long)]
    pub input: Option<String>,

    /// Comma-separated periodic returns (e.g. "0.01,-0.02,0.015")
    #[arg(long, value_delimiter = ',', allow_hyphen_values = true)]
    pub returns: Option<Vec<f64>>,

    /// Comma-separated benchmark returns aligned with --returns
    #[arg(long, value_delimiter = ',', allow_hyphen_values = true)]
    pub benchmark: Option<Vec<f64>>,
}

/// Arguments for a single VaR / CVaR estimate
#[derive(Args)]
pub struct VarArgs {
    /// Path to JSON input file with a "returns" array
    #[arg(long)]
    pub input: Option<String>,

    /// Comma-separated periodic returns
    #[arg(long, value_delimiter = ',', allow_hyphen_values = true)]
    pub returns: Option<Vec<f64>>,

    /// Confidence level (e.g. 0.95)
    #[arg(long, default_value = "0.95")]
    pub confidence: f64,

    /// historical, parametric or monte_carlo
    #[arg(long, default_value = "historical")]
    pub method: String,

    /// Portfolio value for monetary VaR
    #[arg(long, default_value = "1.0")]
    pub portfolio_value: f64,
}

#[derive(Debug, Deserialize)]
struct ReturnsInput {
    returns: Vec<f64>,
    #[serde(default)]
    prices: Option<Vec<f64>>,
    #[serde(default)]
    benchmark: Option<Vec<f64>>,
}

#[derive(Debug, Serialize)]
struct VarOutput {
    method: VarMethod,
    confidence: f64,
    portfolio_value: f64,
    var: f64,
    cvar: f64,
    observations: usize,
}

fn get_returns(
    path: &Option<String>,
    cli_returns: &Option<Vec<f64>>,
    cli_benchmark: &Option<Vec<f64>>,
    what: &str,
) -> Result<ReturnsInput, Box<dyn std::error::Error>> {
    match (path, cli_returns) {
        (None, Some(returns)) => Ok(ReturnsInput {
            returns: returns.clone(),
            prices: None,
            benchmark: cli_benchmark.clone(),
        }),
        _ => input::load(path, what),
    }
}

/// Price path implied by compounding returns from 100.
fn implied_prices(returns: &[f64]) -> Vec<f64> {
    let mut prices = Vec::with_capacity(returns.len() + 1);
    let mut level = 100.0;
    prices.push(level);
    for r in returns {
        level *= 1.0 + r;
        prices.push(level);
    }
    prices
}

pub fn run_risk_metrics(args: RiskMetricsArgs, config: &AnalyticsConfig) -> CommandResult {
    let started = Instant::now();
    let data = get_returns(&args.input, &args.returns, &args.benchmark, "risk metrics")?;

    let mut warnings = Vec::new();
    let prices = match data.prices {
        Some(p) => p,
        None => {
            warnings.push("No prices supplied; drawdown uses the compounded return path".to_string());
            implied_prices(&data.returns)
        }
    };

    let engine = RiskEngine::new(config.clone());
    let metrics = engine.calculate_all_metrics(&data.returns, &prices, data.benchmark.as_deref())?;
    if metrics.sortino_ratio.is_infinite() {
        warnings.push("No returns below target; Sortino ratio is unbounded".to_string());
    }

    envelope(
        "Historical VaR/CVaR, annualized volatility, Sharpe, Sortino, Calmar and drawdown",
        &json!({
            "risk_free_rate": config.risk_free_rate,
            "trading_days_per_year": config.trading_days_per_year,
        }),
        warnings,
        started,
        metrics,
    )
}

pub fn run_var(args: VarArgs, config: &AnalyticsConfig) -> CommandResult {
    let started = Instant::now();
    let data = get_returns(&args.input, &args.returns, &None, "VaR")?;
    let method: VarMethod = args.method.parse()?;

    let engine = RiskEngine::new(config.clone());
    let var = engine.value_at_risk(&data.returns, args.confidence, method, args.portfolio_value)?;
    let cvar = engine.conditional_var(&data.returns, args.confidence, args.portfolio_value)?;

    let output = VarOutput {
        method,
        confidence: args.confidence,
        portfolio_value: args.portfolio_value,
        var,
        cvar,
        observations: data.returns.len(),
    };
    envelope(
        &format!("{method} value at risk with historical expected shortfall"),
        &json!({ "simulations": config.var_simulations, "seed": config.seed }),
        Vec::new(),
        started,
        output,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn var_args(returns: Option<Vec<f64>>) -> VarArgs {
        VarArgs {
            input: None,
            returns,
            confidence: 0.95,
            method: "historical".into(),
            portfolio_value: 1_000.0,
        }
    }

    #[test]
    fn test_var_from_cli_returns() {
        let returns = vec![0.01, -0.02, 0.015, -0.03, 0.005];
        let out = run_var(var_args(Some(returns)), &AnalyticsConfig::default()).unwrap();
        // 5th percentile of the sorted sample: 0.8 * -0.03 + 0.2 * -0.02
        let var = out["result"]["var"].as_f64().unwrap();
        assert!((var - 28.0).abs() < 1e-9, "{var}");
        assert_eq!(out["result"]["method"], "historical");
        assert_eq!(out["result"]["observations"], 5);
        assert!(out["methodology"].as_str().unwrap().starts_with("historical value at risk"));
    }

    #[test]
    fn test_var_rejects_unknown_method() {
        let mut args = var_args(Some(vec![0.01, -0.01]));
        args.method = "bootstrap".into();
        assert!(run_var(args, &AnalyticsConfig::default()).is_err());
    }

    #[test]
    fn test_input_errors_carry_command_label() {
        let mut args = var_args(None);
        args.input = Some("/nonexistent/returns.json".into());
        let err = run_var(args, &AnalyticsConfig::default()).unwrap_err();
        assert!(err.to_string().starts_with("VaR: "), "{err}");

        let metrics = RiskMetricsArgs {
            input: Some("/nonexistent/returns.json".into()),
            returns: None,
            benchmark: None,
        };
        let err = run_risk_metrics(metrics, &AnalyticsConfig::default()).unwrap_err();
        assert!(err.to_string().starts_with("risk metrics: "), "{err}");
    }

    #[test]
    fn test_risk_metrics_with_benchmark() {
        let args = RiskMetricsArgs {
            input: None,
            returns: Some(vec![0.01, -0.02, 0.015, 0.004, -0.006, 0.012]),
            benchmark: Some(vec![0.008, -0.015, 0.01, 0.003, -0.004, 0.009]),
        };
        let out = run_risk_metrics(args, &AnalyticsConfig::default()).unwrap();
        assert_eq!(out["result"]["observations"], 6);
        assert!(out["result"]["benchmark"]["beta"].as_f64().unwrap() > 1.0);
        // drawdown falls back to the compounded path
        assert_eq!(out["warnings"].as_array().unwrap().len(), 1);
        assert!(out["metadata"]["version"].is_string());
    }

    #[test]
    fn test_risk_metrics_reads_prices_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"returns": [0.02, -0.01, 0.03], "prices": [100.0, 102.0, 100.98, 104.0094]}}"#
        )
        .unwrap();
        let args = RiskMetricsArgs {
            input: Some(file.path().to_string_lossy().into_owned()),
            returns: None,
            benchmark: None,
        };
        let out = run_risk_metrics(args, &AnalyticsConfig::default()).unwrap();
        assert!(out["warnings"].as_array().unwrap().is_empty());
        assert!(out["result"]["benchmark"].is_null());
        let dd = out["result"]["max_drawdown"].as_f64().unwrap();
        assert!((dd - (100.98 / 102.0 - 1.0)).abs() < 1e-12, "{dd}");
    }

    #[test]
    fn test_implied_prices_compound_from_100() {
        let p = implied_prices(&[0.1, -0.5]);
        assert_eq!(p.len(), 3);
        assert!((p[2] - 55.0).abs() < 1e-12);
    }
}
