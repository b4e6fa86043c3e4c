use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::{debug, warn};

use crate::config::AnalyticsConfig;
use crate::error::AnalyticsError;
use crate::linalg::{quad_form, validate_covariance_matrix, vec_dot};
use crate::types::Rate;
use crate::AnalyticsResult;

use super::constraints::OptimizationConstraints;
use super::solver::{AugmentedLagrangian, NlpProblem, NonlinearSolver, SolverOutcome};

/// Weights below this magnitude do not count as a held position.
const HOLDING_THRESHOLD: f64 = 1e-4;
/// Floor applied to names forced in by `min_positions`.
const MIN_HELD_WEIGHT: f64 = 1e-3;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// What the optimizer maximizes or minimizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OptimizationObjective {
    MaxSharpe,
    MinVariance,
    MaxReturn,
    /// Equalize risk contributions. Solved by `risk_parity_optimize`.
    RiskParity,
    /// Minimum variance at a pinned expected return.
    TargetReturn,
    /// Minimum variance at a pinned volatility.
    TargetVolatility,
}

impl FromStr for OptimizationObjective {
    type Err = AnalyticsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "max_sharpe" | "maximize_sharpe_ratio" => Ok(OptimizationObjective::MaxSharpe),
            "min_variance" | "minimize_variance" => Ok(OptimizationObjective::MinVariance),
            "max_return" | "maximize_return" => Ok(OptimizationObjective::MaxReturn),
            "risk_parity" => Ok(OptimizationObjective::RiskParity),
            "target_return" => Ok(OptimizationObjective::TargetReturn),
            "target_volatility" => Ok(OptimizationObjective::TargetVolatility),
            other => Err(AnalyticsError::invalid(
                "objective",
                format!("Unsupported objective: {other}"),
            )),
        }
    }
}

impl fmt::Display for OptimizationObjective {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            OptimizationObjective::MaxSharpe => "max_sharpe",
            OptimizationObjective::MinVariance => "min_variance",
            OptimizationObjective::MaxReturn => "max_return",
            OptimizationObjective::RiskParity => "risk_parity",
            OptimizationObjective::TargetReturn => "target_return",
            OptimizationObjective::TargetVolatility => "target_volatility",
        };
        f.write_str(name)
    }
}

/// A single asset weight.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetWeight {
    pub symbol: String,
    pub weight: f64,
}

/// Output of any portfolio optimization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimizationResult {
    /// Weights in input asset order.
    pub weights: Vec<AssetWeight>,
    pub expected_return: Rate,
    pub expected_volatility: Rate,
    pub sharpe_ratio: f64,
    pub success: bool,
    pub message: String,
    pub iterations: u32,
}

impl OptimizationResult {
    pub fn weight_vector(&self) -> Vec<f64> {
        self.weights.iter().map(|w| w.weight).collect()
    }

    pub fn weight_of(&self, symbol: &str) -> Option<f64> {
        self.weights
            .iter()
            .find(|w| w.symbol == symbol)
            .map(|w| w.weight)
    }

    pub(crate) fn failed(symbols: &[String], outcome: &SolverOutcome) -> Self {
        let n = symbols.len();
        OptimizationResult {
            weights: label(symbols, &vec![1.0 / n as f64; n]),
            expected_return: 0.0,
            expected_volatility: 0.0,
            sharpe_ratio: 0.0,
            success: false,
            message: outcome.message.clone(),
            iterations: outcome.iterations,
        }
    }
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

/// Portfolio construction over expected returns and an annualized
/// covariance matrix.
///
/// The nonlinear solver is pluggable; [`AugmentedLagrangian`] is the default.
#[derive(Debug, Clone)]
pub struct OptimizationEngine<S = AugmentedLagrangian> {
    pub(crate) config: AnalyticsConfig,
    pub(crate) solver: S,
}

impl OptimizationEngine<AugmentedLagrangian> {
    pub fn new(config: AnalyticsConfig) -> Self {
        let solver = AugmentedLagrangian::new(config.solver.clone());
        OptimizationEngine { config, solver }
    }
}

impl Default for OptimizationEngine<AugmentedLagrangian> {
    fn default() -> Self {
        OptimizationEngine::new(AnalyticsConfig::default())
    }
}

impl<S: NonlinearSolver> OptimizationEngine<S> {
    pub fn with_solver(config: AnalyticsConfig, solver: S) -> Self {
        OptimizationEngine { config, solver }
    }

    pub fn config(&self) -> &AnalyticsConfig {
        &self.config
    }

    /// Mean-variance optimization with full investment (Σw = 1).
    ///
    /// Non-convergence is reported through `success = false` with equal
    /// weights, never as an error.
    pub fn mean_variance_optimize(
        &self,
        symbols: &[String],
        expected_returns: &[Rate],
        covariance: &[Vec<f64>],
        objective: OptimizationObjective,
        constraints: &OptimizationConstraints,
    ) -> AnalyticsResult<OptimizationResult> {
        let n = symbols.len();
        validate_universe(symbols, Some(expected_returns), covariance)?;
        constraints.validate(n)?;
        if objective == OptimizationObjective::RiskParity {
            return Err(AnalyticsError::invalid(
                "objective",
                "risk_parity is solved by risk_parity_optimize, not mean-variance",
            ));
        }

        let mut bounds = constraints.bounds(n);
        let x0 = vec![1.0 / n as f64; n];
        let mut outcome = self.solve_mean_variance(expected_returns, covariance, objective, constraints, &bounds, &x0);
        let mut iterations = outcome.iterations;

        if outcome.converged {
            if let Some(pinned) = cardinality_bounds(&outcome.x, expected_returns, &bounds, constraints) {
                debug!(objective = %objective, "re-solving with cardinality limits");
                bounds = pinned;
                let start: Vec<f64> = outcome
                    .x
                    .iter()
                    .zip(&bounds)
                    .map(|(w, (lo, hi))| w.clamp(*lo, *hi))
                    .collect();
                outcome = self.solve_mean_variance(expected_returns, covariance, objective, constraints, &bounds, &start);
                iterations += outcome.iterations;
            }
        }

        if !outcome.converged {
            warn!(objective = %objective, message = %outcome.message, "mean-variance optimization did not converge");
            let mut failed = OptimizationResult::failed(symbols, &outcome);
            failed.iterations = iterations;
            return Ok(failed);
        }

        let (expected_return, expected_volatility, sharpe_ratio) =
            self.portfolio_stats(&outcome.x, expected_returns, covariance);
        Ok(OptimizationResult {
            weights: label(symbols, &outcome.x),
            expected_return,
            expected_volatility,
            sharpe_ratio,
            success: true,
            message: "Optimization successful".into(),
            iterations,
        })
    }

    fn solve_mean_variance(
        &self,
        mu: &[Rate],
        cov: &[Vec<f64>],
        objective: OptimizationObjective,
        constraints: &OptimizationConstraints,
        bounds: &[(f64, f64)],
        x0: &[f64],
    ) -> SolverOutcome {
        let rf = self.config.risk_free_rate;
        let variance = move |w: &[f64]| quad_form(w, cov);
        let mut problem = match objective {
            OptimizationObjective::MaxSharpe => NlpProblem::new(
                move |w: &[f64]| {
                    let vol = quad_form(w, cov).max(0.0).sqrt();
                    if vol == 0.0 {
                        0.0
                    } else {
                        -(vec_dot(w, mu) - rf) / vol
                    }
                },
                bounds.to_vec(),
            ),
            OptimizationObjective::MaxReturn => {
                NlpProblem::new(move |w: &[f64]| -vec_dot(w, mu), bounds.to_vec())
            }
            _ => NlpProblem::new(variance, bounds.to_vec()),
        }
        .equality(|w: &[f64]| w.iter().sum::<f64>() - 1.0);

        match (objective, constraints.target_return, constraints.target_volatility) {
            (OptimizationObjective::TargetReturn, Some(target), _) => {
                problem = problem.equality(move |w: &[f64]| vec_dot(w, mu) - target);
            }
            (OptimizationObjective::TargetVolatility, _, Some(target)) => {
                problem = problem
                    .equality(move |w: &[f64]| quad_form(w, cov).max(0.0).sqrt() - target);
            }
            _ => {}
        }

        let problem = constraints.apply_side_constraints(problem);
        self.solver.minimize(&problem, x0)
    }

    /// Expected return, volatility and Sharpe ratio of a weight vector.
    pub fn portfolio_stats(&self, weights: &[f64], expected_returns: &[Rate], covariance: &[Vec<f64>]) -> (Rate, Rate, f64) {
        let ret = vec_dot(weights, expected_returns);
        let vol = quad_form(weights, covariance).max(0.0).sqrt();
        let sharpe = if vol == 0.0 {
            0.0
        } else {
            (ret - self.config.risk_free_rate) / vol
        };
        (ret, vol, sharpe)
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

pub(crate) fn label(symbols: &[String], weights: &[f64]) -> Vec<AssetWeight> {
    symbols
        .iter()
        .zip(weights)
        .map(|(s, w)| AssetWeight {
            symbol: s.clone(),
            weight: *w,
        })
        .collect()
}

/// Shape checks shared by every optimizer entry point.
pub(crate) fn validate_universe(
    symbols: &[String],
    expected_returns: Option<&[Rate]>,
    covariance: &[Vec<f64>],
) -> AnalyticsResult<()> {
    let n = symbols.len();
    if n == 0 {
        return Err(AnalyticsError::invalid("symbols", "At least one asset required"));
    }
    if let Some(mu) = expected_returns {
        if mu.len() != n {
            return Err(AnalyticsError::invalid(
                "expected_returns",
                format!("expected {n} entries, got {}", mu.len()),
            ));
        }
        if mu.iter().any(|r| !r.is_finite()) {
            return Err(AnalyticsError::invalid("expected_returns", "entries must be finite"));
        }
    }
    validate_covariance_matrix(covariance, n)
}

/// Bounds for the cardinality re-solve, or `None` when the first solution
/// already satisfies `min_positions` / `max_positions`.
fn cardinality_bounds(
    weights: &[f64],
    expected_returns: &[Rate],
    bounds: &[(f64, f64)],
    constraints: &OptimizationConstraints,
) -> Option<Vec<(f64, f64)>> {
    let held = weights.iter().filter(|w| w.abs() > HOLDING_THRESHOLD).count();

    // Rank by |weight| descending, ties broken by expected return
    let mut ranked: Vec<usize> = (0..weights.len()).collect();
    ranked.sort_by(|&a, &b| {
        weights[b]
            .abs()
            .total_cmp(&weights[a].abs())
            .then(expected_returns[b].total_cmp(&expected_returns[a]))
    });

    if let Some(max_positions) = constraints.max_positions {
        if held > max_positions {
            let mut pinned = bounds.to_vec();
            for &i in &ranked[max_positions..] {
                pinned[i] = (0.0, 0.0);
            }
            return Some(pinned);
        }
    }
    if let Some(min_positions) = constraints.min_positions {
        if held < min_positions {
            let floor = constraints.min_weight.max(MIN_HELD_WEIGHT);
            let mut pinned = bounds.to_vec();
            for &i in ranked.iter().take(min_positions) {
                pinned[i].0 = pinned[i].0.max(floor).min(pinned[i].1);
            }
            return Some(pinned);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn symbols() -> Vec<String> {
        vec!["AAA".into(), "BBB".into(), "CCC".into()]
    }

    fn mu() -> Vec<f64> {
        vec![0.10, 0.12, 0.08]
    }

    fn cov() -> Vec<Vec<f64>> {
        vec![
            vec![0.040, 0.006, 0.004],
            vec![0.006, 0.090, 0.010],
            vec![0.004, 0.010, 0.020],
        ]
    }

    fn engine() -> OptimizationEngine {
        OptimizationEngine::new(AnalyticsConfig::with_risk_free_rate(0.02))
    }

    fn total(r: &OptimizationResult) -> f64 {
        r.weight_vector().iter().sum()
    }

    #[test]
    fn test_objective_names() {
        assert_eq!(
            "maximize_sharpe_ratio".parse::<OptimizationObjective>().unwrap(),
            OptimizationObjective::MaxSharpe
        );
        assert_eq!(
            "min-variance".parse::<OptimizationObjective>().unwrap(),
            OptimizationObjective::MinVariance
        );
        assert!("max_sortino".parse::<OptimizationObjective>().is_err());
    }

    #[test]
    fn test_max_sharpe_fully_invested() {
        let r = engine()
            .mean_variance_optimize(&symbols(), &mu(), &cov(), OptimizationObjective::MaxSharpe, &Default::default())
            .unwrap();
        assert!(r.success, "{}", r.message);
        assert_relative_eq!(total(&r), 1.0, epsilon = 0.01);
        assert!(r.weight_vector().iter().all(|w| *w >= -1e-9));

        let equal = engine().portfolio_stats(&[1.0 / 3.0; 3], &mu(), &cov());
        assert!(r.sharpe_ratio >= equal.2 - 1e-6);
    }

    #[test]
    fn test_min_variance_beats_every_single_asset() {
        let r = engine()
            .mean_variance_optimize(&symbols(), &mu(), &cov(), OptimizationObjective::MinVariance, &Default::default())
            .unwrap();
        assert!(r.success, "{}", r.message);
        assert_relative_eq!(total(&r), 1.0, epsilon = 0.01);
        let min_single = cov().iter().enumerate().map(|(i, row)| row[i]).fold(f64::INFINITY, f64::min);
        assert!(r.expected_volatility.powi(2) <= min_single + 1e-9);
    }

    #[test]
    fn test_max_return_picks_best_asset() {
        let r = engine()
            .mean_variance_optimize(&symbols(), &mu(), &cov(), OptimizationObjective::MaxReturn, &Default::default())
            .unwrap();
        assert!(r.success, "{}", r.message);
        assert!(r.weight_of("BBB").unwrap() > 0.99);
        assert_relative_eq!(r.expected_return, 0.12, epsilon = 1e-3);
    }

    #[test]
    fn test_max_weight_respected() {
        let c = OptimizationConstraints {
            max_weight: 0.4,
            ..Default::default()
        };
        let r = engine()
            .mean_variance_optimize(&symbols(), &mu(), &cov(), OptimizationObjective::MaxReturn, &c)
            .unwrap();
        assert!(r.success, "{}", r.message);
        assert!(r.weight_vector().iter().all(|w| *w <= 0.4 + 1e-9));
        assert_relative_eq!(total(&r), 1.0, epsilon = 0.01);
    }

    #[test]
    fn test_target_return_pins_return() {
        let c = OptimizationConstraints {
            target_return: Some(0.10),
            ..Default::default()
        };
        let r = engine()
            .mean_variance_optimize(&symbols(), &mu(), &cov(), OptimizationObjective::TargetReturn, &c)
            .unwrap();
        assert!(r.success, "{}", r.message);
        assert_relative_eq!(r.expected_return, 0.10, epsilon = 1e-4);
    }

    #[test]
    fn test_target_volatility_pins_volatility() {
        let c = OptimizationConstraints {
            target_volatility: Some(0.18),
            ..Default::default()
        };
        let r = engine()
            .mean_variance_optimize(&symbols(), &mu(), &cov(), OptimizationObjective::TargetVolatility, &c)
            .unwrap();
        assert!(r.success, "{}", r.message);
        assert_relative_eq!(r.expected_volatility, 0.18, epsilon = 1e-4);
    }

    #[test]
    fn test_sector_cap() {
        let c = OptimizationConstraints {
            max_sector_weight: Some(0.5),
            sectors: Some(vec!["Tech".into(), "Tech".into(), "Utilities".into()]),
            ..Default::default()
        };
        let r = engine()
            .mean_variance_optimize(&symbols(), &mu(), &cov(), OptimizationObjective::MaxReturn, &c)
            .unwrap();
        assert!(r.success, "{}", r.message);
        let w = r.weight_vector();
        assert!(w[0] + w[1] <= 0.5 + 1e-5);
    }

    #[test]
    fn test_turnover_limit() {
        // Fully in AAA today; only 0.2 of weight may move into BBB
        let c = OptimizationConstraints {
            max_turnover: Some(0.4),
            current_weights: Some(vec![1.0, 0.0, 0.0]),
            ..Default::default()
        };
        let r = engine()
            .mean_variance_optimize(&symbols(), &mu(), &cov(), OptimizationObjective::MaxReturn, &c)
            .unwrap();
        assert!(r.success, "{}", r.message);
        let w = r.weight_vector();
        let turnover: f64 = w.iter().zip([1.0, 0.0, 0.0]).map(|(a, b)| (a - b).abs()).sum();
        assert!(turnover <= 0.4 + 1e-4, "turnover {turnover}");
        assert_relative_eq!(w[1], 0.2, epsilon = 1e-3);
    }

    #[test]
    fn test_max_positions() {
        let c = OptimizationConstraints {
            max_positions: Some(2),
            ..Default::default()
        };
        let r = engine()
            .mean_variance_optimize(&symbols(), &mu(), &cov(), OptimizationObjective::MinVariance, &c)
            .unwrap();
        assert!(r.success, "{}", r.message);
        let held = r.weight_vector().iter().filter(|w| w.abs() > HOLDING_THRESHOLD).count();
        assert!(held <= 2);
        assert_relative_eq!(total(&r), 1.0, epsilon = 0.01);
    }

    #[test]
    fn test_min_positions() {
        let c = OptimizationConstraints {
            min_positions: Some(3),
            ..Default::default()
        };
        let r = engine()
            .mean_variance_optimize(&symbols(), &mu(), &cov(), OptimizationObjective::MaxReturn, &c)
            .unwrap();
        assert!(r.success, "{}", r.message);
        assert!(r.weight_vector().iter().all(|w| *w >= MIN_HELD_WEIGHT - 1e-9));
    }

    #[test]
    fn test_risk_parity_objective_rejected() {
        let err = engine()
            .mean_variance_optimize(&symbols(), &mu(), &cov(), OptimizationObjective::RiskParity, &Default::default())
            .unwrap_err();
        assert!(matches!(err, AnalyticsError::InvalidInput { .. }));
    }

    #[test]
    fn test_infeasible_bounds_fail_softly() {
        let c = OptimizationConstraints {
            max_weight: 0.2,
            ..Default::default()
        };
        let r = engine()
            .mean_variance_optimize(&symbols(), &mu(), &cov(), OptimizationObjective::MinVariance, &c)
            .unwrap();
        assert!(!r.success);
        assert_eq!(r.expected_return, 0.0);
        for w in r.weight_vector() {
            assert_relative_eq!(w, 1.0 / 3.0, epsilon = 1e-15);
        }
    }

    #[test]
    fn test_shape_mismatch_is_an_error() {
        let err = engine()
            .mean_variance_optimize(&symbols(), &[0.1, 0.2], &cov(), OptimizationObjective::MaxSharpe, &Default::default())
            .unwrap_err();
        assert!(matches!(err, AnalyticsError::InvalidInput { .. }));
    }

    #[test]
    fn test_portfolio_stats() {
        let (ret, vol, sharpe) = engine().portfolio_stats(&[1.0, 0.0, 0.0], &mu(), &cov());
        assert_relative_eq!(ret, 0.10);
        assert_relative_eq!(vol, 0.2, epsilon = 1e-12);
        assert_relative_eq!(sharpe, 0.4, epsilon = 1e-12);
    }
}
