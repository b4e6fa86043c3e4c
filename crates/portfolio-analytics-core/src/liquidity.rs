use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::AnalyticsError;
use crate::types::{Bps, Money};
use crate::AnalyticsResult;

pub const DEFAULT_SPREAD_BPS: Bps = 10.0;
pub const DEFAULT_DAILY_VOLATILITY: f64 = 0.02;
pub const DEFAULT_PARTICIPATION_RATE: f64 = 0.10;

const BPS_PER_UNIT: f64 = 10_000.0;

/// Estimated cost of working an order through the market.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MarketImpact {
    /// Order size as a fraction of average daily volume
    pub pct_adv: f64,
    pub days_to_trade: f64,
    /// Half the quoted spread
    pub spread_cost_bps: Bps,
    pub market_impact_bps: Bps,
    pub total_cost_bps: Bps,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LiquidityPosition {
    pub value: Money,
    /// Average daily volume, in the same units as `value`
    pub adv: f64,
}

/// Portfolio-level liquidity summary.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LiquidityMetrics {
    pub weighted_pct_adv: f64,
    pub max_pct_adv: f64,
    pub days_to_liquidate_100pct: f64,
    pub days_to_liquidate_10pct_participation: f64,
    /// 0-100, higher is more liquid
    pub liquidity_score: u32,
}

impl LiquidityMetrics {
    fn fully_liquid() -> Self {
        LiquidityMetrics {
            weighted_pct_adv: 0.0,
            max_pct_adv: 0.0,
            days_to_liquidate_100pct: 0.0,
            days_to_liquidate_10pct_participation: 0.0,
            liquidity_score: 100,
        }
    }
}

/// Trading cost and liquidity risk estimates.
#[derive(Debug, Clone, Copy, Default)]
pub struct LiquidityAnalyzer;

impl LiquidityAnalyzer {
    pub fn new() -> Self {
        LiquidityAnalyzer
    }

    /// Square-root impact model: `impact = σ · √(shares / adv)` in bps, on
    /// top of half the spread.
    ///
    /// A zero `adv` means the name cannot be traded: `pct_adv` and
    /// `days_to_trade` are +∞ and the cost is the full spread.
    pub fn estimate_market_impact(
        &self,
        shares_to_trade: f64,
        adv: f64,
        spread_bps: Bps,
        volatility: f64,
        participation_rate: f64,
    ) -> AnalyticsResult<MarketImpact> {
        if !(shares_to_trade.is_finite() && shares_to_trade >= 0.0) {
            return Err(AnalyticsError::invalid("shares_to_trade", "must be non-negative"));
        }
        if !(adv.is_finite() && adv >= 0.0) {
            return Err(AnalyticsError::invalid("adv", "must be non-negative"));
        }
        if !(participation_rate > 0.0 && participation_rate <= 1.0) {
            return Err(AnalyticsError::invalid(
                "participation_rate",
                format!("must lie in (0, 1], got {participation_rate}"),
            ));
        }
        if volatility < 0.0 || spread_bps < 0.0 {
            return Err(AnalyticsError::invalid(
                "volatility",
                "volatility and spread must be non-negative",
            ));
        }

        if adv == 0.0 {
            return Ok(MarketImpact {
                pct_adv: f64::INFINITY,
                days_to_trade: f64::INFINITY,
                spread_cost_bps: spread_bps,
                market_impact_bps: 0.0,
                total_cost_bps: spread_bps,
            });
        }

        let pct_adv = shares_to_trade / adv;
        let market_impact_bps = volatility * pct_adv.sqrt() * BPS_PER_UNIT;
        let spread_cost_bps = spread_bps / 2.0;
        Ok(MarketImpact {
            pct_adv,
            days_to_trade: shares_to_trade / (adv * participation_rate),
            spread_cost_bps,
            market_impact_bps,
            total_cost_bps: spread_cost_bps + market_impact_bps,
        })
    }

    /// Value-weighted %ADV across positions and a bucketed 0-100 score.
    ///
    /// Positions with zero ADV are excluded from the weighted and max %ADV.
    /// An empty book or zero total value scores 100.
    pub fn liquidity_score(&self, positions: &BTreeMap<String, LiquidityPosition>) -> LiquidityMetrics {
        let total_value: Money = positions.values().map(|p| p.value).sum();
        if positions.is_empty() || total_value == 0.0 {
            return LiquidityMetrics::fully_liquid();
        }

        let finite: Vec<(f64, f64)> = positions
            .values()
            .filter(|p| p.adv > 0.0)
            .map(|p| (p.value / total_value, p.value / p.adv))
            .collect();

        let weighted_pct_adv: f64 = finite.iter().map(|(w, pct)| w * pct).sum();
        let max_pct_adv = finite.iter().map(|(_, pct)| *pct).fold(0.0, f64::max);

        LiquidityMetrics {
            weighted_pct_adv,
            max_pct_adv,
            days_to_liquidate_100pct: max_pct_adv,
            days_to_liquidate_10pct_participation: max_pct_adv / DEFAULT_PARTICIPATION_RATE,
            liquidity_score: score_bucket(weighted_pct_adv),
        }
    }

    /// Crowding score per held symbol from hedge fund ownership share.
    /// Symbols without ownership data count as uncrowded.
    pub fn crowding_analysis(
        &self,
        positions: &BTreeMap<String, Money>,
        hedge_fund_ownership: &BTreeMap<String, f64>,
    ) -> BTreeMap<String, u32> {
        positions
            .keys()
            .map(|symbol| {
                let ownership = hedge_fund_ownership.get(symbol).copied().unwrap_or(0.0);
                (symbol.clone(), crowding_bucket(ownership))
            })
            .collect()
    }
}

fn score_bucket(weighted_pct_adv: f64) -> u32 {
    match weighted_pct_adv {
        x if x == 0.0 => 100,
        x if x < 0.01 => 95,
        x if x < 0.05 => 80,
        x if x < 0.10 => 60,
        x if x < 0.25 => 40,
        _ => 20,
    }
}

fn crowding_bucket(ownership: f64) -> u32 {
    match ownership {
        x if x > 0.30 => 90,
        x if x > 0.20 => 70,
        x if x > 0.10 => 50,
        x if x > 0.05 => 30,
        _ => 10,
    }
}
