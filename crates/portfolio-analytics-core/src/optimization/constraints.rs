use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::error::AnalyticsError;
use crate::linalg::vec_dot;
use crate::types::Rate;
use crate::AnalyticsResult;

use super::solver::NlpProblem;

/// Portfolio construction constraints.
///
/// Options that refer to side data (`max_sector_weight` needs `sectors`,
/// `max_factor_exposure` needs `factor_loadings`, `max_turnover` needs
/// `current_weights`) are ignored when that data is absent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimizationConstraints {
    #[serde(default)]
    pub min_weight: f64,
    #[serde(default = "default_max_weight")]
    pub max_weight: f64,
    /// Cap on the summed weight of any one sector.
    #[serde(default)]
    pub max_sector_weight: Option<f64>,
    /// Factor name -> limit on |portfolio exposure|.
    #[serde(default)]
    pub max_factor_exposure: Option<BTreeMap<String, f64>>,
    #[serde(default)]
    pub target_return: Option<Rate>,
    #[serde(default)]
    pub target_volatility: Option<Rate>,
    #[serde(default = "default_long_only")]
    pub long_only: bool,
    /// Cap on Σ|w - w_current|.
    #[serde(default)]
    pub max_turnover: Option<f64>,
    #[serde(default)]
    pub min_positions: Option<usize>,
    #[serde(default)]
    pub max_positions: Option<usize>,
    /// Sector label per asset, aligned with the asset order.
    #[serde(default)]
    pub sectors: Option<Vec<String>>,
    /// Factor name -> loading per asset.
    #[serde(default)]
    pub factor_loadings: Option<BTreeMap<String, Vec<f64>>>,
    /// Weights currently held, for turnover.
    #[serde(default)]
    pub current_weights: Option<Vec<f64>>,
}

fn default_max_weight() -> f64 {
    1.0
}

fn default_long_only() -> bool {
    true
}

impl Default for OptimizationConstraints {
    fn default() -> Self {
        OptimizationConstraints {
            min_weight: 0.0,
            max_weight: default_max_weight(),
            max_sector_weight: None,
            max_factor_exposure: None,
            target_return: None,
            target_volatility: None,
            long_only: default_long_only(),
            max_turnover: None,
            min_positions: None,
            max_positions: None,
            sectors: None,
            factor_loadings: None,
            current_weights: None,
        }
    }
}

impl OptimizationConstraints {
    /// Per-asset weight bounds. Long-only portfolios floor the lower bound at 0.
    pub fn bounds(&self, n: usize) -> Vec<(f64, f64)> {
        let lower = if self.long_only {
            self.min_weight.max(0.0)
        } else {
            self.min_weight
        };
        vec![(lower, self.max_weight); n]
    }

    /// Keep only the settings that describe a plain weight box.
    pub fn weight_limits_only(&self) -> Self {
        OptimizationConstraints {
            min_weight: self.min_weight,
            max_weight: self.max_weight,
            long_only: self.long_only,
            ..OptimizationConstraints::default()
        }
    }

    pub fn validate(&self, n: usize) -> AnalyticsResult<()> {
        if !(self.min_weight.is_finite() && self.max_weight.is_finite()) {
            return Err(AnalyticsError::invalid("constraints", "weight bounds must be finite"));
        }
        if self.min_weight > self.max_weight {
            return Err(AnalyticsError::invalid(
                "constraints.min_weight",
                format!(
                    "min_weight {} exceeds max_weight {}",
                    self.min_weight, self.max_weight
                ),
            ));
        }
        if let Some(sectors) = &self.sectors {
            check_len("constraints.sectors", sectors.len(), n)?;
        }
        if let Some(loadings) = &self.factor_loadings {
            for (factor, values) in loadings {
                check_len(&format!("constraints.factor_loadings.{factor}"), values.len(), n)?;
            }
        }
        if let Some(current) = &self.current_weights {
            check_len("constraints.current_weights", current.len(), n)?;
        }
        if let (Some(lo), Some(hi)) = (self.min_positions, self.max_positions) {
            if lo > hi {
                return Err(AnalyticsError::invalid(
                    "constraints.min_positions",
                    "min_positions exceeds max_positions",
                ));
            }
        }
        Ok(())
    }

    /// Add sector, factor and turnover rows as `g(w) >= 0` inequalities.
    pub(crate) fn apply_side_constraints<'a>(&'a self, mut problem: NlpProblem<'a>) -> NlpProblem<'a> {
        if let (Some(cap), Some(sectors)) = (self.max_sector_weight, &self.sectors) {
            let names: BTreeSet<&String> = sectors.iter().collect();
            for name in names {
                let members: Vec<usize> = sectors
                    .iter()
                    .enumerate()
                    .filter(|(_, s)| *s == name)
                    .map(|(i, _)| i)
                    .collect();
                problem = problem.inequality(move |w: &[f64]| {
                    cap - members.iter().map(|&i| w[i]).sum::<f64>()
                });
            }
        }

        if let (Some(limits), Some(loadings)) = (&self.max_factor_exposure, &self.factor_loadings) {
            for (factor, limit) in limits {
                let Some(beta) = loadings.get(factor) else {
                    continue;
                };
                let limit = *limit;
                problem = problem
                    .inequality(move |w: &[f64]| limit - vec_dot(beta, w))
                    .inequality(move |w: &[f64]| limit + vec_dot(beta, w));
            }
        }

        if let (Some(max_turnover), Some(current)) = (self.max_turnover, &self.current_weights) {
            problem = problem.inequality(move |w: &[f64]| {
                max_turnover
                    - w.iter()
                        .zip(current.iter())
                        .map(|(a, b)| (a - b).abs())
                        .sum::<f64>()
            });
        }

        problem
    }
}

fn check_len(field: &str, got: usize, expected: usize) -> AnalyticsResult<()> {
    if got != expected {
        return Err(AnalyticsError::invalid(
            field,
            format!("expected {expected} entries, got {got}"),
        ));
    }
    Ok(())
}
