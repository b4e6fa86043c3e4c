use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

use crate::error::AnalyticsError;
use crate::types::{Money, Rate};
use crate::AnalyticsResult;

use super::brinson::{brinson_fachler, SectorAttribution};
use super::decomposition::{timing_contribution, transaction_cost_impact, AttributionEngine, Trade};
use super::factor::{factor_attribution, FactorAttribution};

/// Everything needed for a full attribution run over one period.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttributionInput {
    pub period_start: NaiveDate,
    pub period_end: NaiveDate,
    /// Periodic portfolio returns over the period.
    pub portfolio_returns: Vec<Rate>,
    pub benchmark_returns: Vec<Rate>,
    /// Sector -> weight
    pub portfolio_weights: BTreeMap<String, f64>,
    pub benchmark_weights: BTreeMap<String, f64>,
    /// Sector -> period return
    pub sector_portfolio_returns: BTreeMap<String, Rate>,
    pub sector_benchmark_returns: BTreeMap<String, Rate>,
    #[serde(default)]
    pub factor_exposures: Option<BTreeMap<String, f64>>,
    #[serde(default)]
    pub factor_returns: Option<BTreeMap<String, Vec<Rate>>>,
    /// Sector weights per sub-period, for timing.
    #[serde(default)]
    pub weight_series: Option<Vec<BTreeMap<String, f64>>>,
    /// Sector returns per sub-period, aligned with `weight_series`.
    #[serde(default)]
    pub sector_return_series: Option<Vec<BTreeMap<String, Rate>>>,
    #[serde(default)]
    pub trades: Option<Vec<Trade>>,
    #[serde(default)]
    pub total_nav: Money,
}

/// Full attribution of one period.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttributionResult {
    pub period_start: NaiveDate,
    pub period_end: NaiveDate,
    /// Compounded portfolio return
    pub portfolio_return: Rate,
    /// Compounded benchmark return
    pub benchmark_return: Rate,
    pub excess_return: Rate,
    pub sector_attribution: Vec<SectorAttribution>,
    pub factor_attribution: Vec<FactorAttribution>,
    pub alpha: Rate,
    pub beta: f64,
    pub beta_contribution: Rate,
    pub selection_total: f64,
    pub allocation_total: f64,
    pub interaction_total: f64,
    pub timing_contribution: f64,
    pub transaction_cost_drag: Rate,
}

impl AttributionEngine {
    /// Run every attribution applicable to the supplied data.
    ///
    /// Factor attribution needs both exposures and factor returns, timing
    /// needs both weight and return series, cost drag needs trades and a
    /// positive NAV. Missing optional data leaves that component at zero.
    pub fn full_analysis(&self, input: &AttributionInput) -> AnalyticsResult<AttributionResult> {
        if input.period_end < input.period_start {
            return Err(AnalyticsError::invalid(
                "period_end",
                format!(
                    "period end {} precedes start {}",
                    input.period_end, input.period_start
                ),
            ));
        }
        if input.portfolio_returns.is_empty() || input.benchmark_returns.is_empty() {
            return Err(AnalyticsError::InsufficientData(
                "portfolio and benchmark return series must be non-empty".into(),
            ));
        }

        let portfolio_return = compound(&input.portfolio_returns);
        let benchmark_return = compound(&input.benchmark_returns);

        let sector_attribution = brinson_fachler(
            &input.portfolio_weights,
            &input.benchmark_weights,
            &input.sector_portfolio_returns,
            &input.sector_benchmark_returns,
        );
        let allocation_total = sector_attribution.iter().map(|s| s.allocation_effect).sum();
        let selection_total = sector_attribution.iter().map(|s| s.selection_effect).sum();
        let interaction_total = sector_attribution.iter().map(|s| s.interaction_effect).sum();

        let decomposition = self.alpha_beta_decomposition(&input.portfolio_returns, &input.benchmark_returns)?;

        let factor_attribution = match (&input.factor_exposures, &input.factor_returns) {
            (Some(exposures), Some(returns)) if !exposures.is_empty() && !returns.is_empty() => {
                factor_attribution(&input.portfolio_returns, exposures, returns)?
            }
            _ => Vec::new(),
        };

        let timing = match (&input.weight_series, &input.sector_return_series) {
            (Some(weights), Some(returns)) => timing_contribution(weights, returns),
            _ => 0.0,
        };

        let transaction_cost_drag = match &input.trades {
            Some(trades) if !trades.is_empty() && input.total_nav > 0.0 => {
                transaction_cost_impact(trades, input.total_nav)
            }
            _ => 0.0,
        };

        debug!(
            start = %input.period_start,
            end = %input.period_end,
            sectors = sector_attribution.len(),
            factors = factor_attribution.len(),
            "attribution complete"
        );

        Ok(AttributionResult {
            period_start: input.period_start,
            period_end: input.period_end,
            portfolio_return,
            benchmark_return,
            excess_return: portfolio_return - benchmark_return,
            sector_attribution,
            factor_attribution,
            alpha: decomposition.alpha,
            beta: decomposition.beta,
            beta_contribution: decomposition.beta_contribution,
            selection_total,
            allocation_total,
            interaction_total,
            timing_contribution: timing,
            transaction_cost_drag,
        })
    }
}

/// Geometric linking of periodic returns.
fn compound(returns: &[Rate]) -> Rate {
    returns.iter().fold(1.0, |acc, r| acc * (1.0 + r)) - 1.0
}
