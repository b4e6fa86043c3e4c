use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::config::AnalyticsConfig;
use crate::error::AnalyticsError;
use crate::risk::engine::jensen_alpha;
use crate::risk::RiskEngine;
use crate::stats;
use crate::types::{Money, Rate};
use crate::AnalyticsResult;

/// Alpha / beta split of portfolio return against a benchmark.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AlphaBetaDecomposition {
    /// Annualized Jensen's alpha
    pub alpha: Rate,
    pub beta: f64,
    /// β · mean(benchmark) · periods per year
    pub beta_contribution: Rate,
}

/// An executed trade, for transaction cost drag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    pub symbol: String,
    /// Signed share quantity; sells are negative.
    pub shares: f64,
    pub cost_per_share: Money,
}

/// Return attribution: sector, factor, alpha/beta, timing and costs.
#[derive(Debug, Clone, Default)]
pub struct AttributionEngine {
    risk: RiskEngine,
}

impl AttributionEngine {
    pub fn new(config: AnalyticsConfig) -> Self {
        AttributionEngine {
            risk: RiskEngine::new(config),
        }
    }

    pub fn config(&self) -> &AnalyticsConfig {
        self.risk.config()
    }

    /// Split returns into annualized alpha and beta contribution over the
    /// common prefix of both series.
    pub fn alpha_beta_decomposition(
        &self,
        portfolio_returns: &[Rate],
        benchmark_returns: &[Rate],
    ) -> AnalyticsResult<AlphaBetaDecomposition> {
        let (p, b) = stats::truncate_pair(portfolio_returns, benchmark_returns);
        if p.is_empty() {
            return Err(AnalyticsError::InsufficientData(
                "alpha/beta decomposition needs overlapping portfolio and benchmark returns".into(),
            ));
        }
        let beta = self.risk.beta(p, b);
        let config = self.config();
        Ok(AlphaBetaDecomposition {
            alpha: jensen_alpha(p, b, beta, config),
            beta,
            beta_contribution: beta * stats::mean(b) * config.periods_per_year(),
        })
    }
}

/// Return earned by shifting sector weights between periods.
///
/// For each period t ≥ 1 and each sector held at t, adds
/// `(w_t - w_{t-1}) * r_t`. Periods without a matching return entry add 0.
pub fn timing_contribution(
    weight_series: &[BTreeMap<String, f64>],
    sector_return_series: &[BTreeMap<String, Rate>],
) -> f64 {
    if weight_series.len() < 2 {
        return 0.0;
    }
    weight_series
        .windows(2)
        .zip(1usize..)
        .map(|(pair, t)| {
            let (previous, current) = (&pair[0], &pair[1]);
            let Some(returns) = sector_return_series.get(t) else {
                return 0.0;
            };
            current
                .iter()
                .map(|(sector, w)| {
                    let change = w - previous.get(sector).copied().unwrap_or(0.0);
                    change * returns.get(sector).copied().unwrap_or(0.0)
                })
                .sum::<f64>()
        })
        .sum()
}

/// Transaction cost drag `-Σ|shares|·cost / nav`. Zero when `nav` is 0.
pub fn transaction_cost_impact(trades: &[Trade], nav: Money) -> Rate {
    if nav == 0.0 {
        return 0.0;
    }
    let total_cost: f64 = trades
        .iter()
        .map(|t| t.shares.abs() * t.cost_per_share)
        .sum();
    -total_cost / nav
}
