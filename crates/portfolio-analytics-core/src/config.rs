use serde::{Deserialize, Serialize};

use crate::error::AnalyticsError;
use crate::types::Rate;
use crate::AnalyticsResult;

/// Engine-wide settings shared by every analytics component.
///
/// Every field has a default, so a partial document (or an empty one)
/// deserializes into a usable configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyticsConfig {
    /// Annual risk-free rate used for excess returns and Sharpe ratios.
    #[serde(default = "default_risk_free_rate")]
    pub risk_free_rate: Rate,
    /// Observation periods per year used for annualization.
    #[serde(default = "default_trading_days")]
    pub trading_days_per_year: u32,
    /// Number of normal draws for Monte Carlo VaR.
    #[serde(default = "default_var_simulations")]
    pub var_simulations: usize,
    /// Seed for every stochastic computation. `None` draws from OS entropy.
    #[serde(default = "default_seed")]
    pub seed: Option<u64>,
    /// Nonlinear solver limits.
    #[serde(default)]
    pub solver: SolverConfig,
}

/// Iteration and tolerance limits for the constrained optimizer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SolverConfig {
    /// Outer-loop iteration cap.
    #[serde(default = "default_max_iterations")]
    pub max_iterations: u32,
    /// Convergence tolerance on the objective change between outer iterations.
    #[serde(default = "default_tolerance")]
    pub tolerance: f64,
    /// Maximum constraint violation accepted as feasible.
    #[serde(default = "default_feasibility_tolerance")]
    pub feasibility_tolerance: f64,
}

fn default_risk_free_rate() -> Rate {
    0.05
}

fn default_trading_days() -> u32 {
    252
}

fn default_var_simulations() -> usize {
    10_000
}

fn default_seed() -> Option<u64> {
    Some(42)
}

fn default_max_iterations() -> u32 {
    1000
}

fn default_tolerance() -> f64 {
    1e-9
}

fn default_feasibility_tolerance() -> f64 {
    1e-6
}

impl Default for SolverConfig {
    fn default() -> Self {
        SolverConfig {
            max_iterations: default_max_iterations(),
            tolerance: default_tolerance(),
            feasibility_tolerance: default_feasibility_tolerance(),
        }
    }
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        AnalyticsConfig {
            risk_free_rate: default_risk_free_rate(),
            trading_days_per_year: default_trading_days(),
            var_simulations: default_var_simulations(),
            seed: default_seed(),
            solver: SolverConfig::default(),
        }
    }
}

impl AnalyticsConfig {
    /// Same defaults with a different risk-free rate.
    pub fn with_risk_free_rate(risk_free_rate: Rate) -> Self {
        AnalyticsConfig {
            risk_free_rate,
            ..AnalyticsConfig::default()
        }
    }

    pub fn periods_per_year(&self) -> f64 {
        self.trading_days_per_year as f64
    }

    /// Risk-free rate per observation period.
    pub fn periodic_risk_free(&self) -> f64 {
        self.risk_free_rate / self.periods_per_year()
    }

    pub fn validate(&self) -> AnalyticsResult<()> {
        if self.trading_days_per_year == 0 {
            return Err(AnalyticsError::invalid(
                "trading_days_per_year",
                "must be positive",
            ));
        }
        if !self.risk_free_rate.is_finite() {
            return Err(AnalyticsError::invalid("risk_free_rate", "must be finite"));
        }
        if self.var_simulations == 0 {
            return Err(AnalyticsError::invalid("var_simulations", "must be positive"));
        }
        if self.solver.max_iterations == 0 {
            return Err(AnalyticsError::invalid(
                "solver.max_iterations",
                "must be positive",
            ));
        }
        if self.solver.tolerance <= 0.0 || self.solver.feasibility_tolerance <= 0.0 {
            return Err(AnalyticsError::invalid(
                "solver",
                "tolerances must be strictly positive",
            ));
        }
        Ok(())
    }
}
