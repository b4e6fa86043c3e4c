use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::types::{Bps, Money, Rate};

const BPS_PER_UNIT: f64 = 10_000.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EquityExposure {
    pub value: Money,
    pub beta: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FixedIncomeExposure {
    pub value: Money,
    /// Modified duration in years
    pub duration: f64,
    pub convexity: f64,
}

/// P&L of one asset class under a shock, total and per position.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ImpactBreakdown {
    pub total: Money,
    pub by_position: BTreeMap<String, Money>,
}

impl ImpactBreakdown {
    fn from_positions(by_position: BTreeMap<String, Money>) -> Self {
        ImpactBreakdown {
            total: by_position.values().sum(),
            by_position,
        }
    }
}

/// Beta-scaled equity P&L: `value * beta * shock` per position.
pub fn equity_impact(positions: &BTreeMap<String, EquityExposure>, shock: Rate) -> ImpactBreakdown {
    ImpactBreakdown::from_positions(
        positions
            .iter()
            .map(|(symbol, p)| (symbol.clone(), p.value * p.beta * shock))
            .collect(),
    )
}

/// Duration-convexity P&L for a combined rate and spread move.
///
/// With `s = (rates + credit) / 10000`, each position moves by
/// `-D·s·V + ½·C·s²·V`.
pub fn fixed_income_impact(
    positions: &BTreeMap<String, FixedIncomeExposure>,
    rates_shock_bps: Bps,
    credit_spread_shock_bps: Bps,
) -> ImpactBreakdown {
    let s = (rates_shock_bps + credit_spread_shock_bps) / BPS_PER_UNIT;
    ImpactBreakdown::from_positions(
        positions
            .iter()
            .map(|(symbol, p)| {
                let duration_effect = -p.duration * s * p.value;
                let convexity_effect = 0.5 * p.convexity * s * s * p.value;
                (symbol.clone(), duration_effect + convexity_effect)
            })
            .collect(),
    )
}

/// Linear `exposure * shock` per currency pair; pairs without a shock move 0.
pub fn fx_impact(exposures: &BTreeMap<String, Money>, shocks: &BTreeMap<String, Rate>) -> ImpactBreakdown {
    linear_impact(exposures, shocks)
}

/// Linear `exposure * shock` per commodity; commodities without a shock move 0.
pub fn commodity_impact(exposures: &BTreeMap<String, Money>, shocks: &BTreeMap<String, Rate>) -> ImpactBreakdown {
    linear_impact(exposures, shocks)
}

fn linear_impact(exposures: &BTreeMap<String, Money>, shocks: &BTreeMap<String, Rate>) -> ImpactBreakdown {
    ImpactBreakdown::from_positions(
        exposures
            .iter()
            .map(|(key, exposure)| {
                let shock = shocks.get(key).copied().unwrap_or(0.0);
                (key.clone(), exposure * shock)
            })
            .collect(),
    )
}
