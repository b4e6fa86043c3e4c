use tracing::warn;

use crate::error::AnalyticsError;
use crate::linalg::quad_form;
use crate::AnalyticsResult;

use super::contribution::contributions;
use super::mean_variance::{label, validate_universe, OptimizationEngine, OptimizationResult};
use super::solver::{NlpProblem, NonlinearSolver};

const RISK_PARITY_MIN_WEIGHT: f64 = 0.01;

impl<S: NonlinearSolver> OptimizationEngine<S> {
    /// Weights whose percentage risk contributions match `risk_budget`
    /// (equal budget when `None`).
    ///
    /// Weights are bounded to `[0.01, 1]` and fully invested. Expected
    /// return and Sharpe are reported as 0 since returns play no part.
    pub fn risk_parity_optimize(
        &self,
        symbols: &[String],
        covariance: &[Vec<f64>],
        risk_budget: Option<&[f64]>,
    ) -> AnalyticsResult<OptimizationResult> {
        validate_universe(symbols, None, covariance)?;
        let n = symbols.len();
        let budget = match risk_budget {
            Some(b) => {
                if b.len() != n {
                    return Err(AnalyticsError::invalid(
                        "risk_budget",
                        format!("expected {n} entries, got {}", b.len()),
                    ));
                }
                if b.iter().any(|x| !x.is_finite() || *x < 0.0) {
                    return Err(AnalyticsError::invalid(
                        "risk_budget",
                        "entries must be finite and non-negative",
                    ));
                }
                b.to_vec()
            }
            None => vec![1.0 / n as f64; n],
        };

        let objective = |w: &[f64]| {
            let rc = contributions(w, covariance);
            if rc.absolute.iter().sum::<f64>() == 0.0 {
                return 0.0;
            }
            rc.percentage
                .iter()
                .zip(&budget)
                .map(|(p, b)| (p - b).powi(2))
                .sum()
        };
        let problem = NlpProblem::new(objective, vec![(RISK_PARITY_MIN_WEIGHT, 1.0); n])
            .equality(|w: &[f64]| w.iter().sum::<f64>() - 1.0);

        let outcome = self.solver.minimize(&problem, &vec![1.0 / n as f64; n]);
        if !outcome.converged {
            warn!(message = %outcome.message, "risk parity optimization did not converge");
            return Ok(OptimizationResult::failed(symbols, &outcome));
        }

        Ok(OptimizationResult {
            weights: label(symbols, &outcome.x),
            expected_return: 0.0,
            expected_volatility: quad_form(&outcome.x, covariance).max(0.0).sqrt(),
            sharpe_ratio: 0.0,
            success: true,
            message: "Risk parity optimization successful".into(),
            iterations: outcome.iterations,
        })
    }
}
