use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::AnalyticsError;
use crate::stats;
use crate::types::Rate;
use crate::AnalyticsResult;

/// Contribution of one factor to portfolio return.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FactorAttribution {
    pub factor: String,
    pub factor_exposure: f64,
    /// Mean factor return over the overlapping window.
    pub factor_return: Rate,
    pub contribution: Rate,
}

/// Exposure-weighted mean factor returns.
///
/// Only factors present in both `exposures` and `factor_returns` are
/// attributed. Each factor series is truncated to the portfolio series
/// length before averaging.
pub fn factor_attribution(
    portfolio_returns: &[Rate],
    exposures: &BTreeMap<String, f64>,
    factor_returns: &BTreeMap<String, Vec<Rate>>,
) -> AnalyticsResult<Vec<FactorAttribution>> {
    exposures
        .iter()
        .filter_map(|(factor, exposure)| factor_returns.get(factor).map(|s| (factor, *exposure, s)))
        .map(|(factor, exposure, series)| {
            let window = series.len().min(portfolio_returns.len());
            if window == 0 {
                return Err(AnalyticsError::InsufficientData(format!(
                    "factor '{factor}' has no observations overlapping the portfolio series"
                )));
            }
            let factor_return = stats::mean(&series[..window]);
            Ok(FactorAttribution {
                factor: factor.clone(),
                factor_exposure: exposure,
                factor_return,
                contribution: exposure * factor_return,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_contribution_uses_truncated_mean() {
        let portfolio = vec![0.01, 0.02];
        let exposures: BTreeMap<String, f64> =
            [("MKT".to_string(), 1.1), ("SMB".to_string(), -0.3)].into_iter().collect();
        let factors: BTreeMap<String, Vec<f64>> = [
            ("MKT".to_string(), vec![0.010, 0.020, 0.900]),
            ("SMB".to_string(), vec![0.004]),
        ]
        .into_iter()
        .collect();

        let attr = factor_attribution(&portfolio, &exposures, &factors).unwrap();
        assert_eq!(attr.len(), 2);
        assert_eq!(attr[0].factor, "MKT");
        assert_relative_eq!(attr[0].factor_return, 0.015, epsilon = 1e-15);
        assert_relative_eq!(attr[0].contribution, 1.1 * 0.015, epsilon = 1e-15);
        assert_relative_eq!(attr[1].contribution, -0.3 * 0.004, epsilon = 1e-15);
    }

    #[test]
    fn test_factor_without_series_is_skipped() {
        let exposures: BTreeMap<String, f64> = [("HML".to_string(), 0.5)].into_iter().collect();
        let attr = factor_attribution(&[0.01], &exposures, &BTreeMap::new()).unwrap();
        assert!(attr.is_empty());
    }

    #[test]
    fn test_no_overlap_is_an_error() {
        let exposures: BTreeMap<String, f64> = [("MKT".to_string(), 1.0)].into_iter().collect();
        let factors: BTreeMap<String, Vec<f64>> =
            [("MKT".to_string(), vec![0.01])].into_iter().collect();
        assert!(matches!(
            factor_attribution(&[], &exposures, &factors),
            Err(AnalyticsError::InsufficientData(_))
        ));
    }
}
