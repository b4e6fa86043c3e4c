pub mod black_litterman;
pub mod constraints;
pub mod contribution;
pub mod frontier;
pub mod mean_variance;
pub mod risk_parity;
pub mod solver;

pub use black_litterman::{BlView, DEFAULT_RISK_AVERSION, DEFAULT_TAU};
pub use constraints::OptimizationConstraints;
pub use contribution::{marginal_risk_contribution, risk_contribution, RiskContribution};
pub use mean_variance::{AssetWeight, OptimizationEngine, OptimizationObjective, OptimizationResult};
pub use solver::{AugmentedLagrangian, NlpProblem, NonlinearSolver, SolverOutcome};
