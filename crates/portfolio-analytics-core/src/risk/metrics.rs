use serde::{Deserialize, Serialize};

use crate::error::AnalyticsError;
use crate::linalg;
use crate::stats;
use crate::types::{Money, Rate};
use crate::AnalyticsResult;

use super::engine::{require_len, RiskEngine, VarMethod};

/// Benchmark-relative statistics, present only when a benchmark is given.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BenchmarkMetrics {
    pub beta: f64,
    /// Annualized Jensen's alpha
    pub alpha: Rate,
    pub tracking_error: Rate,
    pub information_ratio: f64,
    pub upside_capture: f64,
    pub downside_capture: f64,
}

/// Full risk profile of a return series.
///
/// VaR and CVaR are loss fractions of portfolio value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskMetrics {
    pub observations: usize,
    /// Annualized sample volatility
    pub volatility: Rate,
    pub var_95: Rate,
    pub var_99: Rate,
    pub cvar_95: Rate,
    pub cvar_99: Rate,
    pub sharpe_ratio: f64,
    pub sortino_ratio: f64,
    pub max_drawdown: Rate,
    pub calmar_ratio: f64,
    pub downside_deviation: Rate,
    pub skewness: f64,
    /// Excess kurtosis (normal = 0)
    pub kurtosis: f64,
    pub benchmark: Option<BenchmarkMetrics>,
}

impl RiskEngine {
    /// Compute every single-series statistic, plus benchmark-relative ones
    /// when `benchmark` is supplied.
    pub fn calculate_all_metrics(
        &self,
        returns: &[Rate],
        prices: &[f64],
        benchmark: Option<&[Rate]>,
    ) -> AnalyticsResult<RiskMetrics> {
        require_len(returns, 2, "returns")?;

        let benchmark = match benchmark {
            Some(b) => Some(BenchmarkMetrics {
                beta: self.beta(returns, b),
                alpha: self.alpha(returns, b, None)?,
                tracking_error: self.tracking_error(returns, b)?,
                information_ratio: self.information_ratio(returns, b)?,
                upside_capture: self.capture_ratios(returns, b).upside,
                downside_capture: self.capture_ratios(returns, b).downside,
            }),
            None => None,
        };

        Ok(RiskMetrics {
            observations: returns.len(),
            volatility: self.volatility(returns, true)?,
            var_95: self.value_at_risk(returns, 0.95, VarMethod::Historical, 1.0)?,
            var_99: self.value_at_risk(returns, 0.99, VarMethod::Historical, 1.0)?,
            cvar_95: self.conditional_var(returns, 0.95, 1.0)?,
            cvar_99: self.conditional_var(returns, 0.99, 1.0)?,
            sharpe_ratio: self.sharpe_ratio(returns)?,
            sortino_ratio: self.sortino_ratio(returns, 0.0)?,
            max_drawdown: self.max_drawdown(prices)?.max_drawdown,
            calmar_ratio: self.calmar_ratio(returns, prices)?,
            downside_deviation: self.downside_deviation(returns),
            skewness: stats::sample_skewness(returns),
            kurtosis: stats::sample_excess_kurtosis(returns),
            benchmark,
        })
    }

    /// Historical VaR of a weighted portfolio.
    ///
    /// `returns_matrix` is assets x time: one row of returns per asset, in
    /// the same order as `weights`, matching `monte_carlo_simulation`. The
    /// portfolio series is `sum_i w_i * row_i`.
    pub fn portfolio_var(
        &self,
        weights: &[f64],
        returns_matrix: &[Vec<Rate>],
        confidence: f64,
        portfolio_value: Money,
    ) -> AnalyticsResult<f64> {
        if weights.is_empty() {
            return Err(AnalyticsError::invalid("weights", "At least one weight required"));
        }
        if returns_matrix.len() != weights.len() {
            return Err(AnalyticsError::invalid(
                "returns_matrix",
                format!(
                    "{} asset rows for {} weights",
                    returns_matrix.len(),
                    weights.len()
                ),
            ));
        }
        let observations = returns_matrix[0].len();
        if let Some(asset) = returns_matrix.iter().position(|r| r.len() != observations) {
            return Err(AnalyticsError::invalid(
                "returns_matrix",
                format!(
                    "asset {asset} has {} observations, expected {observations}",
                    returns_matrix[asset].len()
                ),
            ));
        }
        let by_time = linalg::mat_transpose(returns_matrix);
        let portfolio_returns = linalg::mat_vec_multiply(&by_time, weights);
        self.value_at_risk(
            &portfolio_returns,
            confidence,
            VarMethod::Historical,
            portfolio_value,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AnalyticsConfig;
    use crate::risk::calculate_returns;
    use crate::types::ReturnMethod;
    use approx::assert_relative_eq;

    fn prices() -> Vec<f64> {
        vec![
            100.0, 101.2, 100.4, 101.9, 103.0, 101.5, 102.2, 104.0, 103.1, 105.3, 104.6, 106.0,
        ]
    }

    #[test]
    fn test_all_metrics_without_benchmark() {
        let p = prices();
        let r = calculate_returns(&p, ReturnMethod::Simple);
        let engine = RiskEngine::new(AnalyticsConfig::default());
        let m = engine.calculate_all_metrics(&r, &p, None).unwrap();
        assert_eq!(m.observations, 11);
        assert!(m.volatility > 0.0);
        assert!(m.cvar_95 >= m.var_95);
        assert!(m.cvar_99 >= m.var_99);
        assert!(m.max_drawdown < 0.0);
        assert!(m.benchmark.is_none());
    }

    #[test]
    fn test_all_metrics_with_benchmark() {
        let p = prices();
        let r = calculate_returns(&p, ReturnMethod::Simple);
        let b: Vec<f64> = r.iter().map(|x| x * 0.8).collect();
        let engine = RiskEngine::new(AnalyticsConfig::with_risk_free_rate(0.0));
        let m = engine.calculate_all_metrics(&r, &p, Some(&b)).unwrap();
        let bm = m.benchmark.unwrap();
        assert_relative_eq!(bm.beta, 1.25, epsilon = 1e-10);
        assert_relative_eq!(bm.alpha, 0.0, epsilon = 1e-10);
    }

    #[test]
    fn test_all_metrics_rejects_short_series() {
        let engine = RiskEngine::default();
        assert!(matches!(
            engine.calculate_all_metrics(&[0.01], &[1.0, 1.01], None),
            Err(AnalyticsError::InsufficientData(_))
        ));
    }

    #[test]
    fn test_portfolio_var_matches_weighted_series() {
        // two assets, five observations each
        let rows = vec![
            vec![0.01, -0.03, 0.02, -0.01, 0.00],
            vec![-0.02, 0.01, 0.00, -0.01, 0.03],
        ];
        let w = [0.6, 0.4];
        let engine = RiskEngine::default();
        let pv = engine.portfolio_var(&w, &rows, 0.95, 1_000.0).unwrap();
        let series: Vec<f64> = (0..5).map(|t| 0.6 * rows[0][t] + 0.4 * rows[1][t]).collect();
        let direct = engine
            .value_at_risk(&series, 0.95, VarMethod::Historical, 1_000.0)
            .unwrap();
        assert_relative_eq!(pv, direct, epsilon = 1e-12);
    }

    #[test]
    fn test_portfolio_var_shape_mismatch() {
        let engine = RiskEngine::default();
        let err = engine
            .portfolio_var(&[0.5, 0.5], &[vec![0.01, 0.02]], 0.95, 1.0)
            .unwrap_err();
        assert!(matches!(err, AnalyticsError::InvalidInput { .. }));
        let ragged = vec![vec![0.01, 0.02, 0.03], vec![0.01, 0.02]];
        assert!(engine.portfolio_var(&[0.5, 0.5], &ragged, 0.95, 1.0).is_err());
    }
}
