use clap::Args;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::BTreeMap;
use std::time::Instant;

use portfolio_analytics_core::attribution::{
    AttributionEngine, AttributionInput, Idea, IdeaStatus, IdeaTracker,
};
use portfolio_analytics_core::AnalyticsConfig;

use super::{envelope, CommandResult};
use crate::input;

/// Arguments for full-period performance attribution
#[derive(Args)]
pub struct AttributionArgs {
    /// Path to JSON input file (period, returns, sector weights and returns)
    #[arg(long)]
    pub input: Option<String>,
}

pub fn run_attribution(args: AttributionArgs, config: &AnalyticsConfig) -> CommandResult {
    let started = Instant::now();
    let data: AttributionInput = input::load(&args.input, "attribution")?;

    let mut warnings = Vec::new();
    if data.portfolio_returns.len() != data.benchmark_returns.len() {
        warnings.push(format!(
            "Return series differ in length ({} vs {}); alpha and beta use the common prefix",
            data.portfolio_returns.len(),
            data.benchmark_returns.len()
        ));
    }

    let engine = AttributionEngine::new(config.clone());
    let result = engine.full_analysis(&data)?;

    envelope(
        "Brinson-Fachler sector attribution with factor, alpha/beta, timing and cost decomposition",
        &json!({
            "risk_free_rate": config.risk_free_rate,
            "trading_days_per_year": config.trading_days_per_year,
        }),
        warnings,
        started,
        result,
    )
}

/// Arguments for the investment idea book
#[derive(Args)]
pub struct IdeasArgs {
    /// Path to JSON input file (ideas and optional latest prices)
    #[arg(long)]
    pub input: Option<String>,

    /// Only report ideas at or above this conviction (1-5)
    #[arg(long)]
    pub min_conviction: Option<u8>,

    /// Include closed and stopped ideas
    #[arg(long)]
    pub all: bool,
}

#[derive(Deserialize)]
struct IdeasInput {
    ideas: Vec<Idea>,
    #[serde(default)]
    prices: BTreeMap<String, f64>,
}

#[derive(Serialize)]
struct IdeaSummary {
    id: String,
    symbol: String,
    status: IdeaStatus,
    conviction: u8,
    current_price: Option<f64>,
    return_pct: Option<f64>,
    upside_pct: Option<f64>,
    risk_reward_ratio: Option<f64>,
}

pub fn run_ideas(args: IdeasArgs) -> CommandResult {
    let started = Instant::now();
    let data: IdeasInput = input::load(&args.input, "ideas")?;

    let mut tracker = IdeaTracker::new();
    for idea in data.ideas {
        tracker.add_idea(idea)?;
    }
    tracker.update_prices(&data.prices);

    let selected = tracker.ideas_by_conviction(args.min_conviction.unwrap_or(1));

    let mut warnings = Vec::new();
    let summaries: Vec<IdeaSummary> = selected
        .into_iter()
        .filter(|i| args.all || i.status == IdeaStatus::Active)
        .map(|i| {
            if i.current_price.is_none() {
                warnings.push(format!("No price for {} ({})", i.id, i.symbol));
            }
            IdeaSummary {
                id: i.id.clone(),
                symbol: i.symbol.clone(),
                status: i.status,
                conviction: i.conviction,
                current_price: i.current_price,
                return_pct: i.return_pct(),
                upside_pct: i.upside_pct(),
                risk_reward_ratio: i.risk_reward_ratio(),
            }
        })
        .collect();

    envelope(
        "Investment idea book: return since entry, upside to target, reward to stop-loss risk",
        &json!({
            "min_conviction": args.min_conviction,
            "include_inactive": args.all,
        }),
        warnings,
        started,
        summaries,
    )
}
