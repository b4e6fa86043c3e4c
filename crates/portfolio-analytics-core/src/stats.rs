//! Descriptive statistics over `f64` samples.
//!
//! Helpers here follow the sample conventions used throughout the crate:
//! variances and covariances divide by `n - 1`, percentiles interpolate
//! linearly between order statistics. Callers are responsible for length
//! checks; empty input yields `NaN` for moments.

#[cfg(feature = "monte_carlo")]
use statrs::distribution::{ContinuousCDF, Normal};

use crate::error::AnalyticsError;
use crate::AnalyticsResult;

pub fn mean(xs: &[f64]) -> f64 {
    if xs.is_empty() {
        return f64::NAN;
    }
    xs.iter().sum::<f64>() / xs.len() as f64
}

/// Sample variance (Bessel-corrected). Zero for fewer than two observations.
pub fn sample_variance(xs: &[f64]) -> f64 {
    if xs.len() < 2 {
        return 0.0;
    }
    let m = mean(xs);
    xs.iter().map(|x| (x - m) * (x - m)).sum::<f64>() / (xs.len() - 1) as f64
}

pub fn sample_std(xs: &[f64]) -> f64 {
    sample_variance(xs).sqrt()
}

/// Population standard deviation (divide by n).
pub fn population_std(xs: &[f64]) -> f64 {
    if xs.is_empty() {
        return 0.0;
    }
    let m = mean(xs);
    (xs.iter().map(|x| (x - m) * (x - m)).sum::<f64>() / xs.len() as f64).sqrt()
}

/// Sample covariance of two equally long series.
pub fn sample_covariance(a: &[f64], b: &[f64]) -> f64 {
    let n = a.len().min(b.len());
    if n < 2 {
        return 0.0;
    }
    let ma = mean(&a[..n]);
    let mb = mean(&b[..n]);
    a[..n]
        .iter()
        .zip(&b[..n])
        .map(|(x, y)| (x - ma) * (y - mb))
        .sum::<f64>()
        / (n - 1) as f64
}

/// Truncate two series to their common (shorter) length.
pub fn truncate_pair<'a>(a: &'a [f64], b: &'a [f64]) -> (&'a [f64], &'a [f64]) {
    let n = a.len().min(b.len());
    (&a[..n], &b[..n])
}

/// Adjusted Fisher-Pearson sample skewness. Zero below three observations
/// or without dispersion.
pub fn sample_skewness(xs: &[f64]) -> f64 {
    let n = xs.len();
    let sd = sample_std(xs);
    if n < 3 || sd == 0.0 {
        return 0.0;
    }
    let m = mean(xs);
    let m3: f64 = xs.iter().map(|x| (x - m).powi(3)).sum();
    let nf = n as f64;
    nf / ((nf - 1.0) * (nf - 2.0)) * m3 / sd.powi(3)
}

/// Sample excess kurtosis (bias-corrected). Zero below four observations
/// or without dispersion.
pub fn sample_excess_kurtosis(xs: &[f64]) -> f64 {
    let n = xs.len();
    let var = sample_variance(xs);
    if n < 4 || var == 0.0 {
        return 0.0;
    }
    let m = mean(xs);
    let m4: f64 = xs.iter().map(|x| (x - m).powi(4)).sum();
    let nf = n as f64;
    let factor1 = nf * (nf + 1.0) / ((nf - 1.0) * (nf - 2.0) * (nf - 3.0));
    let factor2 = 3.0 * (nf - 1.0).powi(2) / ((nf - 2.0) * (nf - 3.0));
    factor1 * m4 / (var * var) - factor2
}

/// Percentile (0..=100) of an unsorted sample, linear interpolation.
pub fn percentile(xs: &[f64], p: f64) -> f64 {
    let mut sorted = xs.to_vec();
    sort_ascending(&mut sorted);
    percentile_sorted(&sorted, p)
}

/// Compute the percentile value from a **sorted** slice using linear interpolation.
pub fn percentile_sorted(sorted: &[f64], p: f64) -> f64 {
    if sorted.is_empty() {
        return f64::NAN;
    }
    if sorted.len() == 1 {
        return sorted[0];
    }
    let rank = (p / 100.0).clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lower = rank.floor() as usize;
    let upper = rank.ceil() as usize;
    if lower == upper {
        sorted[lower]
    } else {
        let frac = rank - lower as f64;
        sorted[lower] * (1.0 - frac) + sorted[upper] * frac
    }
}

pub fn sort_ascending(xs: &mut [f64]) {
    xs.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
}

/// Standard normal quantile function Φ⁻¹(p).
#[cfg(feature = "monte_carlo")]
pub fn normal_quantile(p: f64) -> AnalyticsResult<f64> {
    if !(p > 0.0 && p < 1.0) {
        return Err(AnalyticsError::invalid(
            "probability",
            format!("quantile probability must lie in (0, 1), got {p}"),
        ));
    }
    let n = Normal::new(0.0, 1.0).map_err(|e| AnalyticsError::invalid("distribution", e.to_string()))?;
    Ok(n.inverse_cdf(p))
}

/// Sample covariance matrix of a set of equally long series (one row per asset).
pub fn covariance_matrix(series: &[Vec<f64>]) -> Vec<Vec<f64>> {
    let n = series.len();
    let mut cov = vec![vec![0.0; n]; n];
    for i in 0..n {
        for j in i..n {
            let c = sample_covariance(&series[i], &series[j]);
            cov[i][j] = c;
            cov[j][i] = c;
        }
    }
    cov
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_sample_moments() {
        let xs = [1.0, 2.0, 3.0, 4.0];
        assert_relative_eq!(mean(&xs), 2.5);
        assert_relative_eq!(sample_variance(&xs), 5.0 / 3.0, epsilon = 1e-12);
        assert_relative_eq!(population_std(&xs), 1.25_f64.sqrt(), epsilon = 1e-12);
    }

    #[test]
    fn test_short_samples() {
        assert!(mean(&[]).is_nan());
        assert_eq!(sample_variance(&[1.0]), 0.0);
        assert_eq!(sample_covariance(&[1.0], &[2.0]), 0.0);
    }

    #[test]
    fn test_covariance_of_identical_series_is_variance() {
        let xs = [0.01, -0.02, 0.03, 0.005];
        assert_relative_eq!(sample_covariance(&xs, &xs), sample_variance(&xs), epsilon = 1e-15);
    }

    #[test]
    fn test_percentile_interpolation() {
        let xs = [5.0, 1.0, 3.0, 2.0, 4.0];
        assert_relative_eq!(percentile(&xs, 0.0), 1.0);
        assert_relative_eq!(percentile(&xs, 50.0), 3.0);
        assert_relative_eq!(percentile(&xs, 100.0), 5.0);
        // rank = 0.1 * 4 = 0.4 between 1 and 2
        assert_relative_eq!(percentile(&xs, 10.0), 1.4, epsilon = 1e-12);
    }

    #[cfg(feature = "monte_carlo")]
    #[test]
    fn test_normal_quantile() {
        assert_relative_eq!(normal_quantile(0.5).unwrap(), 0.0, epsilon = 1e-9);
        assert_relative_eq!(normal_quantile(0.05).unwrap(), -1.6448536, epsilon = 1e-6);
        assert!(normal_quantile(0.0).is_err());
        assert!(normal_quantile(1.0).is_err());
    }

    #[test]
    fn test_shape_statistics() {
        let symmetric = [-2.0, -1.0, 0.0, 1.0, 2.0];
        assert_relative_eq!(sample_skewness(&symmetric), 0.0, epsilon = 1e-12);
        let right_tail = [0.0, 0.0, 0.0, 0.0, 10.0];
        assert!(sample_skewness(&right_tail) > 0.0);
        assert!(sample_excess_kurtosis(&right_tail) > 0.0);
        assert_eq!(sample_excess_kurtosis(&[1.0, 2.0, 3.0]), 0.0);
    }

    #[test]
    fn test_truncate_pair() {
        let a = [1.0, 2.0, 3.0];
        let b = [4.0, 5.0];
        let (ta, tb) = truncate_pair(&a, &b);
        assert_eq!(ta, &[1.0, 2.0]);
        assert_eq!(tb, &[4.0, 5.0]);
    }
}
