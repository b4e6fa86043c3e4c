use tracing::{debug, warn};

use crate::types::Rate;
use crate::AnalyticsResult;

use super::constraints::OptimizationConstraints;
use super::mean_variance::{OptimizationEngine, OptimizationObjective, OptimizationResult};
use super::solver::NonlinearSolver;

impl<S: NonlinearSolver> OptimizationEngine<S> {
    /// Trace the efficient frontier between the minimum-variance and
    /// maximum-return portfolios.
    ///
    /// Each of the `n_points` evenly spaced target returns is solved as a
    /// target-return problem carrying only the weight box of `constraints`.
    /// Failed solves are dropped, so fewer than `n_points` may come back.
    /// Points are ordered by non-decreasing expected return. When the two
    /// endpoints' returns agree to within the solver's feasibility slack the
    /// frontier is the single minimum-variance point.
    pub fn efficient_frontier(
        &self,
        symbols: &[String],
        expected_returns: &[Rate],
        covariance: &[Vec<f64>],
        n_points: usize,
        constraints: &OptimizationConstraints,
    ) -> AnalyticsResult<Vec<OptimizationResult>> {
        let min_var = self.mean_variance_optimize(
            symbols,
            expected_returns,
            covariance,
            OptimizationObjective::MinVariance,
            constraints,
        )?;
        let max_ret = self.mean_variance_optimize(
            symbols,
            expected_returns,
            covariance,
            OptimizationObjective::MaxReturn,
            constraints,
        )?;

        if !(min_var.success && max_ret.success) {
            warn!(
                min_variance = min_var.success,
                max_return = max_ret.success,
                "frontier endpoint failed to solve"
            );
            return Ok([min_var, max_ret].into_iter().filter(|r| r.success).take(1).collect());
        }

        let (lo, hi) = (min_var.expected_return, max_ret.expected_return);
        let scale = expected_returns.iter().map(|r| r.abs()).fold(1.0, f64::max);
        if lo >= hi - self.config.solver.feasibility_tolerance * scale {
            debug!(lo, hi, "frontier endpoints coincide");
            return Ok(vec![min_var]);
        }

        let box_only = constraints.weight_limits_only();
        let mut frontier = Vec::with_capacity(n_points);
        for target in linspace(lo, hi, n_points) {
            let point_constraints = OptimizationConstraints {
                target_return: Some(target),
                ..box_only.clone()
            };
            let point = self.mean_variance_optimize(
                symbols,
                expected_returns,
                covariance,
                OptimizationObjective::TargetReturn,
                &point_constraints,
            )?;
            if point.success {
                frontier.push(point);
            }
        }
        frontier.sort_by(|a, b| a.expected_return.total_cmp(&b.expected_return));
        Ok(frontier)
    }
}

fn linspace(start: f64, end: f64, n: usize) -> Vec<f64> {
    match n {
        0 => Vec::new(),
        1 => vec![start],
        _ => {
            let step = (end - start) / (n - 1) as f64;
            (0..n)
                .map(|i| if i == n - 1 { end } else { start + step * i as f64 })
                .collect()
        }
    }
}
