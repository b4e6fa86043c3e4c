use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use statrs::distribution::Normal;
use tracing::debug;

use crate::error::AnalyticsError;
use crate::linalg::{cholesky_psd, mat_vec_multiply, vec_dot};
use crate::stats;
use crate::types::{Money, Rate};
use crate::AnalyticsResult;

use super::engine::StressEngine;

/// Distribution of simulated terminal portfolio values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationResult {
    pub num_simulations: usize,
    pub horizon_days: usize,
    pub initial_value: Money,
    pub mean_final_value: Money,
    /// Population standard deviation of terminal values
    pub std_final_value: Money,
    pub min_final_value: Money,
    pub max_final_value: Money,
    pub percentile_1: Money,
    pub percentile_5: Money,
    pub percentile_10: Money,
    pub percentile_25: Money,
    pub percentile_50: Money,
    pub percentile_75: Money,
    pub percentile_90: Money,
    pub percentile_95: Money,
    pub percentile_99: Money,
    /// Share of paths ending below the initial value
    pub prob_loss: f64,
    /// Mean terminal value of paths at or below the 5th percentile
    pub expected_shortfall_5: Money,
}

impl StressEngine {
    /// Simulate correlated daily asset returns and compound a fixed-weight
    /// portfolio over `horizon_days`.
    ///
    /// `returns_matrix` holds one row of historical returns per asset. Daily
    /// draws are multivariate normal with the sample mean and covariance of
    /// those rows. Seeded from the engine config, so a fixed seed reproduces
    /// the same distribution.
    pub fn monte_carlo_simulation(
        &self,
        returns_matrix: &[Vec<Rate>],
        weights: &[f64],
        num_simulations: usize,
        horizon_days: usize,
        initial_value: Money,
    ) -> AnalyticsResult<SimulationResult> {
        validate_inputs(returns_matrix, weights, num_simulations, horizon_days, initial_value)?;

        let means: Vec<f64> = returns_matrix.iter().map(|r| stats::mean(r)).collect();
        let cov = stats::covariance_matrix(returns_matrix);
        let chol = cholesky_psd(&cov);
        let n = means.len();

        let mut rng = match self.config.seed {
            Some(s) => StdRng::seed_from_u64(s),
            None => StdRng::from_entropy(),
        };
        let standard = Normal::new(0.0, 1.0)
            .map_err(|e| AnalyticsError::invalid("distribution", e.to_string()))?;

        let mut finals = Vec::with_capacity(num_simulations);
        let mut z = vec![0.0; n];
        for _ in 0..num_simulations {
            let mut value = initial_value;
            for _ in 0..horizon_days {
                for zi in z.iter_mut() {
                    *zi = rng.sample(standard);
                }
                let shocks = mat_vec_multiply(&chol, &z);
                let asset_returns: Vec<f64> = means.iter().zip(&shocks).map(|(m, s)| m + s).collect();
                value *= 1.0 + vec_dot(weights, &asset_returns);
            }
            finals.push(value);
        }

        debug!(num_simulations, horizon_days, assets = n, "monte carlo complete");
        Ok(summarize(finals, num_simulations, horizon_days, initial_value))
    }
}

fn validate_inputs(
    returns_matrix: &[Vec<Rate>],
    weights: &[f64],
    num_simulations: usize,
    horizon_days: usize,
    initial_value: Money,
) -> AnalyticsResult<()> {
    if returns_matrix.is_empty() {
        return Err(AnalyticsError::invalid("returns_matrix", "needs at least one asset"));
    }
    if weights.len() != returns_matrix.len() {
        return Err(AnalyticsError::invalid(
            "weights",
            format!(
                "{} weights for {} assets",
                weights.len(),
                returns_matrix.len()
            ),
        ));
    }
    let observations = returns_matrix[0].len();
    if returns_matrix.iter().any(|row| row.len() != observations) {
        return Err(AnalyticsError::invalid(
            "returns_matrix",
            "every asset needs the same number of observations",
        ));
    }
    if observations < 2 {
        return Err(AnalyticsError::InsufficientData(format!(
            "simulation needs at least 2 observations per asset, got {observations}"
        )));
    }
    if returns_matrix.iter().flatten().chain(weights).any(|x| !x.is_finite()) {
        return Err(AnalyticsError::invalid(
            "returns_matrix",
            "returns and weights must be finite",
        ));
    }
    if num_simulations == 0 {
        return Err(AnalyticsError::invalid("num_simulations", "must be positive"));
    }
    if horizon_days == 0 {
        return Err(AnalyticsError::invalid("horizon_days", "must be positive"));
    }
    if !(initial_value.is_finite() && initial_value > 0.0) {
        return Err(AnalyticsError::invalid("initial_value", "must be positive"));
    }
    Ok(())
}

fn summarize(
    mut finals: Vec<f64>,
    num_simulations: usize,
    horizon_days: usize,
    initial_value: Money,
) -> SimulationResult {
    stats::sort_ascending(&mut finals);
    let pct = |p: f64| stats::percentile_sorted(&finals, p);
    let p5 = pct(5.0);

    let losses = finals.iter().filter(|v| **v < initial_value).count();
    let tail: Vec<f64> = finals.iter().copied().filter(|v| *v <= p5).collect();

    SimulationResult {
        num_simulations,
        horizon_days,
        initial_value,
        mean_final_value: stats::mean(&finals),
        std_final_value: stats::population_std(&finals),
        min_final_value: finals[0],
        max_final_value: finals[finals.len() - 1],
        percentile_1: pct(1.0),
        percentile_5: p5,
        percentile_10: pct(10.0),
        percentile_25: pct(25.0),
        percentile_50: pct(50.0),
        percentile_75: pct(75.0),
        percentile_90: pct(90.0),
        percentile_95: pct(95.0),
        percentile_99: pct(99.0),
        prob_loss: losses as f64 / finals.len() as f64,
        expected_shortfall_5: if tail.is_empty() { p5 } else { stats::mean(&tail) },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AnalyticsConfig;

    fn history() -> Vec<Vec<f64>> {
        vec![
            vec![0.010, -0.020, 0.015, 0.005, -0.010, 0.020, -0.005, 0.012],
            vec![0.004, -0.006, 0.007, 0.002, -0.003, 0.008, -0.001, 0.005],
        ]
    }

    #[test]
    fn test_distribution_ordering() {
        let engine = StressEngine::default();
        let r = engine
            .monte_carlo_simulation(&history(), &[0.6, 0.4], 2_000, 20, 1_000_000.0)
            .unwrap();
        assert!(r.min_final_value <= r.percentile_1);
        assert!(r.percentile_5 < r.mean_final_value);
        assert!(r.mean_final_value < r.percentile_95);
        assert!(r.percentile_99 <= r.max_final_value);
        assert!(r.expected_shortfall_5 <= r.percentile_5);
        assert!(r.prob_loss > 0.0 && r.prob_loss < 1.0);
        assert!(r.std_final_value > 0.0);
    }

    #[test]
    fn test_seeded_runs_repeat() {
        let engine = StressEngine::new(AnalyticsConfig {
            seed: Some(7),
            ..AnalyticsConfig::default()
        });
        let a = engine.monte_carlo_simulation(&history(), &[0.5, 0.5], 200, 10, 100.0).unwrap();
        let b = engine.monte_carlo_simulation(&history(), &[0.5, 0.5], 200, 10, 100.0).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_constant_returns_are_deterministic() {
        let engine = StressEngine::default();
        let flat = vec![vec![0.01; 5]];
        let r = engine.monte_carlo_simulation(&flat, &[1.0], 50, 3, 100.0).unwrap();
        let expected = 100.0 * 1.01_f64.powi(3);
        assert!((r.mean_final_value - expected).abs() < 1e-9);
        assert!(r.std_final_value < 1e-9);
        assert_eq!(r.prob_loss, 0.0);
    }

    #[test]
    fn test_rejects_bad_shapes() {
        let engine = StressEngine::default();
        assert!(engine.monte_carlo_simulation(&history(), &[1.0], 10, 5, 100.0).is_err());
        assert!(engine.monte_carlo_simulation(&[], &[], 10, 5, 100.0).is_err());
        let ragged = vec![vec![0.01, 0.02, 0.03], vec![0.01, 0.02]];
        assert!(engine.monte_carlo_simulation(&ragged, &[0.5, 0.5], 10, 5, 100.0).is_err());
        assert!(engine.monte_carlo_simulation(&history(), &[0.5, 0.5], 0, 5, 100.0).is_err());
        assert!(engine.monte_carlo_simulation(&history(), &[0.5, 0.5], 10, 0, 100.0).is_err());
        assert!(matches!(
            engine.monte_carlo_simulation(&[vec![0.01]], &[1.0], 10, 5, 100.0),
            Err(AnalyticsError::InsufficientData(_))
        ));
    }
}
