use clap::Args;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::BTreeMap;
use std::time::Instant;

use portfolio_analytics_core::liquidity::{
    LiquidityAnalyzer, LiquidityMetrics, LiquidityPosition, DEFAULT_DAILY_VOLATILITY,
    DEFAULT_PARTICIPATION_RATE, DEFAULT_SPREAD_BPS,
};

use super::{envelope, CommandResult};
use crate::input;

/// Arguments for single-order market impact
#[derive(Args)]
pub struct MarketImpactArgs {
    /// Shares to trade
    #[arg(long)]
    pub shares: f64,

    /// Average daily volume in shares
    #[arg(long)]
    pub adv: f64,

    /// Quoted bid-ask spread in basis points
    #[arg(long, default_value_t = DEFAULT_SPREAD_BPS)]
    pub spread_bps: f64,

    /// Daily volatility of the name
    #[arg(long, default_value_t = DEFAULT_DAILY_VOLATILITY)]
    pub volatility: f64,

    /// Target share of daily volume
    #[arg(long, default_value_t = DEFAULT_PARTICIPATION_RATE)]
    pub participation: f64,
}

/// Arguments for portfolio liquidity and crowding
#[derive(Args)]
pub struct LiquidityArgs {
    /// Path to JSON input file (positions, optional hedge_fund_ownership)
    #[arg(long)]
    pub input: Option<String>,
}

#[derive(Debug, Deserialize)]
struct LiquidityInput {
    positions: BTreeMap<String, LiquidityPosition>,
    #[serde(default)]
    hedge_fund_ownership: Option<BTreeMap<String, f64>>,
}

#[derive(Debug, Serialize)]
struct LiquidityOutput {
    #[serde(flatten)]
    metrics: LiquidityMetrics,
    #[serde(skip_serializing_if = "Option::is_none")]
    crowding: Option<BTreeMap<String, u32>>,
}

pub fn run_market_impact(args: MarketImpactArgs) -> CommandResult {
    let started = Instant::now();
    let impact = LiquidityAnalyzer::new().estimate_market_impact(
        args.shares,
        args.adv,
        args.spread_bps,
        args.volatility,
        args.participation,
    )?;

    let mut warnings = Vec::new();
    if impact.pct_adv.is_infinite() {
        warnings.push("Zero ADV: the order cannot be worked; cost is the full spread".to_string());
    } else if impact.pct_adv > 0.25 {
        warnings.push(format!("Order is {:.0}% of ADV", impact.pct_adv * 100.0));
    }

    envelope(
        "Square-root market impact plus half-spread",
        &json!({
            "spread_bps": args.spread_bps,
            "volatility": args.volatility,
            "participation_rate": args.participation,
        }),
        warnings,
        started,
        impact,
    )
}

pub fn run_liquidity(args: LiquidityArgs) -> CommandResult {
    let started = Instant::now();
    let data: LiquidityInput = input::load(&args.input, "liquidity analysis")?;

    let analyzer = LiquidityAnalyzer::new();
    let metrics = analyzer.liquidity_score(&data.positions);
    let crowding = data.hedge_fund_ownership.as_ref().map(|ownership| {
        let values: BTreeMap<String, f64> = data
            .positions
            .iter()
            .map(|(symbol, p)| (symbol.clone(), p.value))
            .collect();
        analyzer.crowding_analysis(&values, ownership)
    });

    envelope(
        "Value-weighted %ADV liquidity score with hedge fund crowding buckets",
        &json!({ "participation_rate": DEFAULT_PARTICIPATION_RATE }),
        Vec::new(),
        started,
        LiquidityOutput { metrics, crowding },
    )
}
