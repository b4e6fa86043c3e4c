//! Bound-constrained nonlinear programming.
//!
//! Problems are expressed as closures over the decision vector so the
//! optimizers in this module tree can describe objectives and side
//! constraints without knowing how they are solved.

use tracing::debug;

use crate::config::SolverConfig;

type ScalarFn<'a> = Box<dyn Fn(&[f64]) -> f64 + 'a>;

/// A nonlinear program: minimize `objective(x)` subject to
/// `lower <= x <= upper`, `h(x) = 0` for every equality and `g(x) >= 0` for
/// every inequality.
pub struct NlpProblem<'a> {
    objective: ScalarFn<'a>,
    lower: Vec<f64>,
    upper: Vec<f64>,
    equalities: Vec<ScalarFn<'a>>,
    inequalities: Vec<ScalarFn<'a>>,
}

impl<'a> NlpProblem<'a> {
    pub fn new(objective: impl Fn(&[f64]) -> f64 + 'a, bounds: Vec<(f64, f64)>) -> Self {
        let (lower, upper) = bounds.into_iter().unzip();
        NlpProblem {
            objective: Box::new(objective),
            lower,
            upper,
            equalities: Vec::new(),
            inequalities: Vec::new(),
        }
    }

    /// Add an equality constraint `h(x) = 0`.
    pub fn equality(mut self, h: impl Fn(&[f64]) -> f64 + 'a) -> Self {
        self.equalities.push(Box::new(h));
        self
    }

    /// Add an inequality constraint `g(x) >= 0`.
    pub fn inequality(mut self, g: impl Fn(&[f64]) -> f64 + 'a) -> Self {
        self.inequalities.push(Box::new(g));
        self
    }

    pub fn dimension(&self) -> usize {
        self.lower.len()
    }

    pub fn objective(&self, x: &[f64]) -> f64 {
        (self.objective)(x)
    }

    /// Box bounds as `(lower, upper)` per coordinate.
    pub fn bounds(&self) -> Vec<(f64, f64)> {
        self.lower.iter().copied().zip(self.upper.iter().copied()).collect()
    }

    /// `h(x)` for every equality, in insertion order.
    pub fn equality_values(&self, x: &[f64]) -> Vec<f64> {
        self.equalities.iter().map(|h| h(x)).collect()
    }

    /// `g(x)` for every inequality, in insertion order.
    pub fn inequality_values(&self, x: &[f64]) -> Vec<f64> {
        self.inequalities.iter().map(|g| g(x)).collect()
    }

    /// Largest violation over bounds and constraints.
    pub fn violation(&self, x: &[f64]) -> f64 {
        let eq = self.equalities.iter().map(|h| h(x).abs());
        let ineq = self.inequalities.iter().map(|g| (-g(x)).max(0.0));
        let bounds = x
            .iter()
            .zip(self.lower.iter().zip(self.upper.iter()))
            .map(|(v, (lo, hi))| (lo - v).max(v - hi).max(0.0));
        eq.chain(ineq).chain(bounds).fold(0.0, f64::max)
    }

    /// Clamp `x` into the box bounds.
    pub fn project(&self, x: &mut [f64]) {
        for (v, (lo, hi)) in x.iter_mut().zip(self.lower.iter().zip(self.upper.iter())) {
            *v = v.clamp(*lo, *hi);
        }
    }
}

/// Result of a solver run.
#[derive(Debug, Clone, PartialEq)]
pub struct SolverOutcome {
    pub x: Vec<f64>,
    pub objective: f64,
    pub iterations: u32,
    pub converged: bool,
    pub message: String,
}

/// A constrained minimizer.
pub trait NonlinearSolver {
    fn minimize(&self, problem: &NlpProblem<'_>, x0: &[f64]) -> SolverOutcome;
}

// ---------------------------------------------------------------------------
// Augmented Lagrangian
// ---------------------------------------------------------------------------

const INNER_MAX_ITERATIONS: usize = 500;
const INITIAL_PENALTY: f64 = 10.0;
const MAX_PENALTY: f64 = 1e10;
const PENALTY_GROWTH: f64 = 10.0;
const REQUIRED_VIOLATION_DECREASE: f64 = 0.25;
const ARMIJO: f64 = 1e-4;
const MIN_STEP: f64 = 1e-10;
const MAX_STEP: f64 = 1e10;

/// Augmented Lagrangian method with a projected Barzilai-Borwein inner
/// solver over the box bounds.
///
/// Equalities and inequalities are priced into the inner objective with
/// multiplier estimates and a quadratic penalty; bounds are handled by
/// projection. Gradients are central finite differences.
#[derive(Debug, Clone, Default)]
pub struct AugmentedLagrangian {
    config: SolverConfig,
}

impl AugmentedLagrangian {
    pub fn new(config: SolverConfig) -> Self {
        AugmentedLagrangian { config }
    }

    fn lagrangian(
        problem: &NlpProblem<'_>,
        x: &[f64],
        lambda: &[f64],
        mu: &[f64],
        rho: f64,
    ) -> f64 {
        let mut value = problem.objective(x);
        for (h, l) in problem.equalities.iter().zip(lambda) {
            let hv = h(x);
            value += l * hv + 0.5 * rho * hv * hv;
        }
        for (g, m) in problem.inequalities.iter().zip(mu) {
            let shifted = (m - rho * g(x)).max(0.0);
            value += (shifted * shifted - m * m) / (2.0 * rho);
        }
        value
    }

    fn inner_minimize(&self, problem: &NlpProblem<'_>, f: &dyn Fn(&[f64]) -> f64, start: &[f64]) -> Vec<f64> {
        let mut x = start.to_vec();
        problem.project(&mut x);
        let mut fx = f(&x);
        let mut grad = gradient(f, &x);
        let mut step = 1.0 / inf_norm(&grad).max(1.0);

        for _ in 0..INNER_MAX_ITERATIONS {
            if projected_gradient_norm(problem, &x, &grad) <= 1e-10 {
                break;
            }

            // Armijo backtracking along the projected path
            let mut candidate;
            let mut f_candidate;
            let mut trial = step;
            loop {
                candidate = x.iter().zip(&grad).map(|(xi, gi)| xi - trial * gi).collect::<Vec<_>>();
                problem.project(&mut candidate);
                f_candidate = f(&candidate);
                let descent: f64 = grad
                    .iter()
                    .zip(candidate.iter().zip(&x))
                    .map(|(g, (c, xi))| g * (c - xi))
                    .sum();
                if f_candidate <= fx + ARMIJO * descent || trial < MIN_STEP * 1e-6 {
                    break;
                }
                trial *= 0.5;
            }

            let s: Vec<f64> = candidate.iter().zip(&x).map(|(c, xi)| c - xi).collect();
            if inf_norm(&s) <= 1e-14 {
                break;
            }
            let new_grad = gradient(f, &candidate);
            let y: Vec<f64> = new_grad.iter().zip(&grad).map(|(a, b)| a - b).collect();
            let sy: f64 = s.iter().zip(&y).map(|(a, b)| a * b).sum();
            let ss: f64 = s.iter().map(|a| a * a).sum();
            step = if sy > 0.0 { (ss / sy).clamp(MIN_STEP, MAX_STEP) } else { MAX_STEP.min(trial * 2.0) };

            let improvement = fx - f_candidate;
            x = candidate;
            fx = f_candidate;
            grad = new_grad;
            if improvement.abs() <= 1e-16 * (1.0 + fx.abs()) {
                break;
            }
        }
        x
    }
}

impl NonlinearSolver for AugmentedLagrangian {
    fn minimize(&self, problem: &NlpProblem<'_>, x0: &[f64]) -> SolverOutcome {
        let mut x = x0.to_vec();
        problem.project(&mut x);
        let mut lambda = vec![0.0; problem.equalities.len()];
        let mut mu = vec![0.0; problem.inequalities.len()];
        let mut rho = INITIAL_PENALTY;
        let mut previous_violation = f64::INFINITY;
        let mut previous_objective = f64::INFINITY;

        for iteration in 1..=self.config.max_iterations {
            let augmented = |z: &[f64]| Self::lagrangian(problem, z, &lambda, &mu, rho);
            x = self.inner_minimize(problem, &augmented, &x);

            let objective = problem.objective(&x);
            let violation = problem.violation(&x);
            debug!(iteration, objective, violation, rho, "augmented lagrangian step");

            if !objective.is_finite() {
                return SolverOutcome {
                    x,
                    objective,
                    iterations: iteration,
                    converged: false,
                    message: "Objective became non-finite".into(),
                };
            }

            let settled = (objective - previous_objective).abs()
                <= self.config.tolerance * (1.0 + objective.abs());
            if violation <= self.config.feasibility_tolerance && settled {
                return SolverOutcome {
                    x,
                    objective,
                    iterations: iteration,
                    converged: true,
                    message: "Optimization terminated successfully".into(),
                };
            }

            for (l, h) in lambda.iter_mut().zip(&problem.equalities) {
                *l += rho * h(&x);
            }
            for (m, g) in mu.iter_mut().zip(&problem.inequalities) {
                *m = (*m - rho * g(&x)).max(0.0);
            }
            if violation > REQUIRED_VIOLATION_DECREASE * previous_violation {
                rho = (rho * PENALTY_GROWTH).min(MAX_PENALTY);
            }
            previous_violation = violation;
            previous_objective = objective;
        }

        let objective = problem.objective(&x);
        let violation = problem.violation(&x);
        let message = if violation > self.config.feasibility_tolerance {
            format!(
                "Iteration limit reached; constraint violation {violation:.3e} exceeds tolerance"
            )
        } else {
            "Iteration limit reached".to_string()
        };
        SolverOutcome {
            x,
            objective,
            iterations: self.config.max_iterations,
            converged: false,
            message,
        }
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Central finite-difference gradient.
fn gradient(f: &dyn Fn(&[f64]) -> f64, x: &[f64]) -> Vec<f64> {
    let mut shifted = x.to_vec();
    (0..x.len())
        .map(|i| {
            let h = 1e-7 * x[i].abs().max(1.0);
            shifted[i] = x[i] + h;
            let up = f(&shifted);
            shifted[i] = x[i] - h;
            let down = f(&shifted);
            shifted[i] = x[i];
            (up - down) / (2.0 * h)
        })
        .collect()
}

fn projected_gradient_norm(problem: &NlpProblem<'_>, x: &[f64], grad: &[f64]) -> f64 {
    let mut moved: Vec<f64> = x.iter().zip(grad).map(|(xi, gi)| xi - gi).collect();
    problem.project(&mut moved);
    moved
        .iter()
        .zip(x)
        .map(|(m, xi)| (m - xi).abs())
        .fold(0.0, f64::max)
}

fn inf_norm(v: &[f64]) -> f64 {
    v.iter().map(|a| a.abs()).fold(0.0, f64::max)
}
