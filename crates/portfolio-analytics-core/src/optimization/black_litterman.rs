use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::AnalyticsError;
use crate::linalg::{
    mat_add, mat_inverse, mat_multiply, mat_scale, mat_transpose, mat_vec_multiply,
    validate_covariance_matrix, Matrix,
};
use crate::types::Rate;
use crate::AnalyticsResult;

use super::constraints::OptimizationConstraints;
use super::mean_variance::{validate_universe, OptimizationEngine, OptimizationObjective, OptimizationResult};
use super::solver::NonlinearSolver;

pub const DEFAULT_TAU: f64 = 0.05;
pub const DEFAULT_RISK_AVERSION: f64 = 2.5;

/// An absolute view on a single asset's expected return.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlView {
    pub asset_index: usize,
    pub view_return: Rate,
    /// Higher confidence shrinks view uncertainty: Ω_ii = τ Σ_ii / confidence.
    pub confidence: f64,
}

impl<S: NonlinearSolver> OptimizationEngine<S> {
    /// Posterior expected returns blending equilibrium `π = δΣw_mkt` with
    /// investor views. Without views the posterior is π.
    pub fn black_litterman_returns(
        &self,
        market_cap_weights: &[f64],
        covariance: &[Vec<f64>],
        views: &[BlView],
        tau: f64,
        risk_aversion: f64,
    ) -> AnalyticsResult<Vec<Rate>> {
        let n = market_cap_weights.len();
        validate_covariance_matrix(covariance, n)?;
        if !(tau > 0.0 && tau.is_finite()) {
            return Err(AnalyticsError::invalid("tau", "must be positive and finite"));
        }
        if !risk_aversion.is_finite() {
            return Err(AnalyticsError::invalid("risk_aversion", "must be finite"));
        }

        let pi: Vec<f64> = mat_vec_multiply(covariance, market_cap_weights)
            .into_iter()
            .map(|x| risk_aversion * x)
            .collect();
        if views.is_empty() {
            return Ok(pi);
        }

        let k = views.len();
        let mut pick: Matrix = vec![vec![0.0; n]; k];
        let mut q = vec![0.0; k];
        let mut omega_inv: Matrix = vec![vec![0.0; k]; k];
        for (v, view) in views.iter().enumerate() {
            if view.asset_index >= n {
                return Err(AnalyticsError::invalid(
                    "views.asset_index",
                    format!("index {} out of range for {n} assets", view.asset_index),
                ));
            }
            if !(view.confidence > 0.0 && view.confidence.is_finite()) {
                return Err(AnalyticsError::invalid(
                    "views.confidence",
                    format!("confidence must be positive, got {}", view.confidence),
                ));
            }
            let omega = tau * covariance[view.asset_index][view.asset_index] / view.confidence;
            if omega <= 0.0 {
                return Err(AnalyticsError::SingularMatrix(format!(
                    "view uncertainty for asset {} is zero",
                    view.asset_index
                )));
            }
            pick[v][view.asset_index] = 1.0;
            q[v] = view.view_return;
            omega_inv[v][v] = 1.0 / omega;
        }

        let tau_cov_inv = mat_inverse(&mat_scale(covariance, tau))?;
        let pick_t = mat_transpose(&pick);
        let pt_omega_inv = mat_multiply(&pick_t, &omega_inv);
        let precision = mat_add(&tau_cov_inv, &mat_multiply(&pt_omega_inv, &pick));
        let posterior_cov = mat_inverse(&precision)?;

        let prior_term = mat_vec_multiply(&tau_cov_inv, &pi);
        let view_term = mat_vec_multiply(&pt_omega_inv, &q);
        let rhs: Vec<f64> = prior_term.iter().zip(&view_term).map(|(a, b)| a + b).collect();
        let posterior = mat_vec_multiply(&posterior_cov, &rhs);
        debug!(views = k, "black-litterman posterior computed");
        Ok(posterior)
    }

    /// Max-Sharpe portfolio on Black-Litterman posterior returns with
    /// default constraints.
    pub fn black_litterman(
        &self,
        symbols: &[String],
        market_cap_weights: &[f64],
        covariance: &[Vec<f64>],
        views: &[BlView],
        tau: f64,
        risk_aversion: f64,
    ) -> AnalyticsResult<OptimizationResult> {
        validate_universe(symbols, Some(market_cap_weights), covariance)?;
        let posterior = self.black_litterman_returns(market_cap_weights, covariance, views, tau, risk_aversion)?;
        self.mean_variance_optimize(
            symbols,
            &posterior,
            covariance,
            OptimizationObjective::MaxSharpe,
            &OptimizationConstraints::default(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AnalyticsConfig;
    use approx::assert_relative_eq;

    fn cov() -> Vec<Vec<f64>> {
        vec![
            vec![0.040, 0.012, 0.006],
            vec![0.012, 0.060, 0.010],
            vec![0.006, 0.010, 0.030],
        ]
    }

    fn market() -> Vec<f64> {
        vec![0.5, 0.3, 0.2]
    }

    fn engine() -> OptimizationEngine {
        OptimizationEngine::new(AnalyticsConfig::with_risk_free_rate(0.02))
    }

    #[test]
    fn test_no_views_returns_equilibrium() {
        let post = engine()
            .black_litterman_returns(&market(), &cov(), &[], DEFAULT_TAU, DEFAULT_RISK_AVERSION)
            .unwrap();
        // π_0 = 2.5 * (0.02 + 0.0036 + 0.0012)
        assert_relative_eq!(post[0], 2.5 * 0.0248, epsilon = 1e-12);
    }

    #[test]
    fn test_view_pulls_posterior() {
        let pi = engine()
            .black_litterman_returns(&market(), &cov(), &[], DEFAULT_TAU, DEFAULT_RISK_AVERSION)
            .unwrap();
        let view = BlView {
            asset_index: 0,
            view_return: 0.15,
            confidence: 1.0,
        };
        let post = engine()
            .black_litterman_returns(&market(), &cov(), &[view.clone()], DEFAULT_TAU, DEFAULT_RISK_AVERSION)
            .unwrap();
        assert!(post[0] > pi[0] && post[0] < 0.15);

        let confident = BlView {
            confidence: 1000.0,
            ..view
        };
        let tight = engine()
            .black_litterman_returns(&market(), &cov(), &[confident], DEFAULT_TAU, DEFAULT_RISK_AVERSION)
            .unwrap();
        assert!((tight[0] - 0.15).abs() < (post[0] - 0.15).abs());
    }

    #[test]
    fn test_invalid_views() {
        let bad_index = BlView {
            asset_index: 3,
            view_return: 0.1,
            confidence: 0.5,
        };
        assert!(matches!(
            engine().black_litterman_returns(&market(), &cov(), &[bad_index], 0.05, 2.5),
            Err(AnalyticsError::InvalidInput { .. })
        ));
        let bad_conf = BlView {
            asset_index: 0,
            view_return: 0.1,
            confidence: 0.0,
        };
        assert!(engine()
            .black_litterman_returns(&market(), &cov(), &[bad_conf], 0.05, 2.5)
            .is_err());
    }

    #[test]
    fn test_singular_covariance() {
        let singular = vec![vec![0.04, 0.04], vec![0.04, 0.04]];
        let view = BlView {
            asset_index: 0,
            view_return: 0.1,
            confidence: 0.5,
        };
        assert!(matches!(
            engine().black_litterman_returns(&[0.5, 0.5], &singular, &[view], 0.05, 2.5),
            Err(AnalyticsError::SingularMatrix(_))
        ));
    }

    #[test]
    fn test_black_litterman_portfolio() {
        let symbols: Vec<String> = vec!["A".into(), "B".into(), "C".into()];
        let view = BlView {
            asset_index: 2,
            view_return: 0.12,
            confidence: 0.8,
        };
        let r = engine()
            .black_litterman(&symbols, &market(), &cov(), &[view], DEFAULT_TAU, DEFAULT_RISK_AVERSION)
            .unwrap();
        assert!(r.success, "{}", r.message);
        assert_relative_eq!(r.weight_vector().iter().sum::<f64>(), 1.0, epsilon = 0.01);
    }
}
