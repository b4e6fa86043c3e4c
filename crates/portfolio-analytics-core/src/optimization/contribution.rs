use serde::{Deserialize, Serialize};

use crate::error::AnalyticsError;
use crate::linalg::{mat_vec_multiply, quad_form, validate_covariance_matrix};
use crate::AnalyticsResult;

/// Per-asset share of portfolio volatility.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskContribution {
    /// `w_i * MCR_i`; sums to portfolio volatility.
    pub absolute: Vec<f64>,
    /// `absolute / Σ absolute`; sums to 1 when the portfolio has risk.
    pub percentage: Vec<f64>,
}

/// Marginal contribution to risk `(Σw)_i / σ_p`. Zero vector for a
/// riskless portfolio.
pub fn marginal_risk_contribution(weights: &[f64], covariance: &[Vec<f64>]) -> AnalyticsResult<Vec<f64>> {
    check_shapes(weights, covariance)?;
    Ok(marginal(weights, covariance))
}

pub fn risk_contribution(weights: &[f64], covariance: &[Vec<f64>]) -> AnalyticsResult<RiskContribution> {
    check_shapes(weights, covariance)?;
    Ok(contributions(weights, covariance))
}

pub(crate) fn marginal(weights: &[f64], covariance: &[Vec<f64>]) -> Vec<f64> {
    let vol = quad_form(weights, covariance).max(0.0).sqrt();
    if vol == 0.0 {
        return vec![0.0; weights.len()];
    }
    mat_vec_multiply(covariance, weights)
        .into_iter()
        .map(|x| x / vol)
        .collect()
}

pub(crate) fn contributions(weights: &[f64], covariance: &[Vec<f64>]) -> RiskContribution {
    let absolute: Vec<f64> = weights
        .iter()
        .zip(marginal(weights, covariance))
        .map(|(w, m)| w * m)
        .collect();
    let total: f64 = absolute.iter().sum();
    let percentage = if total == 0.0 {
        vec![0.0; weights.len()]
    } else {
        absolute.iter().map(|a| a / total).collect()
    };
    RiskContribution { absolute, percentage }
}

fn check_shapes(weights: &[f64], covariance: &[Vec<f64>]) -> AnalyticsResult<()> {
    if weights.is_empty() {
        return Err(AnalyticsError::invalid("weights", "At least one weight required"));
    }
    validate_covariance_matrix(covariance, weights.len())
}
