#[cfg(feature = "monte_carlo")]
use rand::rngs::StdRng;
#[cfg(feature = "monte_carlo")]
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
#[cfg(feature = "monte_carlo")]
use statrs::distribution::Normal;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::config::AnalyticsConfig;
use crate::error::AnalyticsError;
use crate::stats;
use crate::types::{Money, Rate, ReturnMethod};
use crate::AnalyticsResult;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Value-at-Risk estimation method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VarMethod {
    /// Empirical quantile of the observed returns.
    Historical,
    /// Normal quantile with the sample mean and standard deviation.
    Parametric,
    /// Empirical quantile of simulated normal draws.
    MonteCarlo,
}

impl FromStr for VarMethod {
    type Err = AnalyticsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "historical" => Ok(VarMethod::Historical),
            "parametric" => Ok(VarMethod::Parametric),
            "monte_carlo" => Ok(VarMethod::MonteCarlo),
            other => Err(AnalyticsError::invalid(
                "method",
                format!("Unknown VaR method: {other}"),
            )),
        }
    }
}

impl fmt::Display for VarMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            VarMethod::Historical => "historical",
            VarMethod::Parametric => "parametric",
            VarMethod::MonteCarlo => "monte_carlo",
        };
        f.write_str(name)
    }
}

/// Maximum drawdown together with the peak and trough that produced it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DrawdownResult {
    /// Largest peak-to-trough decline as a (non-positive) fraction.
    pub max_drawdown: Rate,
    /// Index of the running peak preceding the trough.
    pub peak_index: usize,
    /// Index of the trough.
    pub trough_index: usize,
}

/// Upside / downside capture relative to a benchmark.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CaptureRatios {
    pub upside: f64,
    pub downside: f64,
}

/// Pearson correlation matrix keyed by asset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorrelationMatrix {
    pub symbols: Vec<String>,
    pub matrix: Vec<Vec<f64>>,
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

/// Risk statistics over return and price series.
///
/// Every method is a pure function of its arguments and the engine config.
/// Degenerate inputs resolve to documented sentinels; empty input where a
/// statistic is undefined is reported as [`AnalyticsError::InsufficientData`].
#[derive(Debug, Clone, Default)]
pub struct RiskEngine {
    config: AnalyticsConfig,
}

/// Convert a price series into periodic returns.
///
/// Fewer than two prices produce an empty series.
pub fn calculate_returns(prices: &[f64], method: ReturnMethod) -> Vec<Rate> {
    prices
        .windows(2)
        .map(|w| match method {
            ReturnMethod::Simple => w[1] / w[0] - 1.0,
            ReturnMethod::Log => w[1].ln() - w[0].ln(),
        })
        .collect()
}

impl RiskEngine {
    pub fn new(config: AnalyticsConfig) -> Self {
        RiskEngine { config }
    }

    pub fn config(&self) -> &AnalyticsConfig {
        &self.config
    }

    fn annualization(&self) -> f64 {
        self.config.periods_per_year()
    }

    /// Sample volatility (n-1), optionally annualized by √252.
    pub fn volatility(&self, returns: &[Rate], annualize: bool) -> AnalyticsResult<f64> {
        require_len(returns, 2, "returns")?;
        let vol = stats::sample_std(returns);
        Ok(if annualize {
            vol * self.annualization().sqrt()
        } else {
            vol
        })
    }

    /// Value at Risk as a loss magnitude scaled by `portfolio_value`.
    ///
    /// Positive values are losses. A sample whose `1 - confidence` quantile
    /// is itself a gain yields a negative figure.
    pub fn value_at_risk(
        &self,
        returns: &[Rate],
        confidence: f64,
        method: VarMethod,
        portfolio_value: Money,
    ) -> AnalyticsResult<f64> {
        validate_confidence(confidence)?;
        let tail_pct = (1.0 - confidence) * 100.0;
        let var = match method {
            VarMethod::Historical => {
                require_len(returns, 1, "returns")?;
                -stats::percentile(returns, tail_pct)
            }
            #[cfg(feature = "monte_carlo")]
            VarMethod::Parametric => {
                require_len(returns, 2, "returns")?;
                let mu = stats::mean(returns);
                let sigma = stats::sample_std(returns);
                let z = stats::normal_quantile(1.0 - confidence)?;
                -(mu + z * sigma)
            }
            #[cfg(feature = "monte_carlo")]
            VarMethod::MonteCarlo => {
                require_len(returns, 2, "returns")?;
                let mu = stats::mean(returns);
                let sigma = stats::sample_std(returns);
                let simulated = self.simulate_normal(mu, sigma)?;
                -stats::percentile(&simulated, tail_pct)
            }
            #[cfg(not(feature = "monte_carlo"))]
            VarMethod::Parametric | VarMethod::MonteCarlo => {
                return Err(AnalyticsError::invalid(
                    "method",
                    format!("{method} VaR needs the monte_carlo feature"),
                ));
            }
        };
        Ok(var * portfolio_value)
    }

    #[cfg(feature = "monte_carlo")]
    fn simulate_normal(&self, mu: f64, sigma: f64) -> AnalyticsResult<Vec<f64>> {
        let mut rng = match self.config.seed {
            Some(s) => StdRng::seed_from_u64(s),
            None => StdRng::from_entropy(),
        };
        let standard = Normal::new(0.0, 1.0)
            .map_err(|e| AnalyticsError::invalid("distribution", e.to_string()))?;
        Ok((0..self.config.var_simulations)
            .map(|_| mu + sigma * rng.sample(standard))
            .collect())
    }

    /// Conditional VaR (expected shortfall): mean loss of observations at or
    /// below the historical VaR threshold. Falls back to VaR on an empty tail.
    pub fn conditional_var(
        &self,
        returns: &[Rate],
        confidence: f64,
        portfolio_value: Money,
    ) -> AnalyticsResult<f64> {
        validate_confidence(confidence)?;
        require_len(returns, 1, "returns")?;
        let threshold = stats::percentile(returns, (1.0 - confidence) * 100.0);
        let tail: Vec<f64> = returns.iter().copied().filter(|r| *r <= threshold).collect();
        if tail.is_empty() {
            return self.value_at_risk(returns, confidence, VarMethod::Historical, portfolio_value);
        }
        Ok(-stats::mean(&tail) * portfolio_value)
    }

    /// Regression beta `cov(r, b) / var(b)` over the common prefix of both
    /// series. Zero when the benchmark has no variance.
    pub fn beta(&self, returns: &[Rate], benchmark: &[Rate]) -> f64 {
        let (r, b) = stats::truncate_pair(returns, benchmark);
        let benchmark_variance = stats::sample_variance(b);
        if benchmark_variance == 0.0 {
            return 0.0;
        }
        stats::sample_covariance(r, b) / benchmark_variance
    }

    /// Annualized Jensen's alpha. Computes beta when not supplied.
    pub fn alpha(
        &self,
        returns: &[Rate],
        benchmark: &[Rate],
        beta: Option<f64>,
    ) -> AnalyticsResult<f64> {
        let (r, b) = stats::truncate_pair(returns, benchmark);
        require_len(r, 1, "returns")?;
        let beta = beta.unwrap_or_else(|| self.beta(r, b));
        Ok(jensen_alpha(r, b, beta, &self.config))
    }

    /// Annualized Sharpe ratio of excess returns. Zero when excess returns
    /// have no dispersion.
    pub fn sharpe_ratio(&self, returns: &[Rate]) -> AnalyticsResult<f64> {
        require_len(returns, 1, "returns")?;
        let excess = self.excess_returns(returns);
        let std_excess = stats::sample_std(&excess);
        if std_excess == 0.0 {
            return Ok(0.0);
        }
        Ok(stats::mean(&excess) / std_excess * self.annualization().sqrt())
    }

    /// Annualized Sortino ratio against a downside `target` on excess returns.
    ///
    /// With no downside observations (or zero downside deviation) the ratio
    /// is `f64::INFINITY` when mean excess return is positive, else 0.
    pub fn sortino_ratio(&self, returns: &[Rate], target: Rate) -> AnalyticsResult<f64> {
        require_len(returns, 1, "returns")?;
        let excess = self.excess_returns(returns);
        let mean_excess = stats::mean(&excess);
        let downside: Vec<f64> = excess.iter().copied().filter(|r| *r < target).collect();
        let unbounded = if mean_excess > 0.0 { f64::INFINITY } else { 0.0 };
        if downside.is_empty() {
            return Ok(unbounded);
        }
        let downside_dev = (downside.iter().map(|d| d * d).sum::<f64>() / downside.len() as f64).sqrt();
        if downside_dev == 0.0 {
            return Ok(unbounded);
        }
        Ok(mean_excess / downside_dev * self.annualization().sqrt())
    }

    /// Maximum drawdown of a price or portfolio-value path.
    pub fn max_drawdown(&self, prices: &[f64]) -> AnalyticsResult<DrawdownResult> {
        require_len(prices, 1, "prices")?;
        if let Some(bad) = prices.iter().position(|p| !(p.is_finite() && *p > 0.0)) {
            return Err(AnalyticsError::invalid(
                "prices",
                format!("price at index {bad} must be positive and finite"),
            ));
        }

        let mut running_max = f64::NEG_INFINITY;
        let mut max_dd = f64::INFINITY;
        let mut trough_index = 0;
        for (i, p) in prices.iter().enumerate() {
            running_max = running_max.max(*p);
            let dd = (p - running_max) / running_max;
            if dd < max_dd {
                max_dd = dd;
                trough_index = i;
            }
        }

        let mut peak_index = 0;
        for (i, p) in prices[..=trough_index].iter().enumerate() {
            if *p > prices[peak_index] {
                peak_index = i;
            }
        }

        Ok(DrawdownResult {
            max_drawdown: max_dd,
            peak_index,
            trough_index,
        })
    }

    /// Annualized mean return over absolute max drawdown.
    ///
    /// A path without drawdown yields `f64::INFINITY` for positive return,
    /// else 0.
    pub fn calmar_ratio(&self, returns: &[Rate], prices: &[f64]) -> AnalyticsResult<f64> {
        require_len(returns, 1, "returns")?;
        let annual_return = stats::mean(returns) * self.annualization();
        let dd = self.max_drawdown(prices)?;
        if dd.max_drawdown == 0.0 {
            return Ok(if annual_return > 0.0 { f64::INFINITY } else { 0.0 });
        }
        Ok(annual_return / dd.max_drawdown.abs())
    }

    /// Annualized standard deviation of active returns.
    pub fn tracking_error(&self, returns: &[Rate], benchmark: &[Rate]) -> AnalyticsResult<f64> {
        let active = active_returns(returns, benchmark);
        require_len(&active, 2, "returns")?;
        Ok(stats::sample_std(&active) * self.annualization().sqrt())
    }

    /// Annualized information ratio.
    ///
    /// Zero tracking error yields `f64::INFINITY` for positive mean active
    /// return, else 0.
    pub fn information_ratio(&self, returns: &[Rate], benchmark: &[Rate]) -> AnalyticsResult<f64> {
        let active = active_returns(returns, benchmark);
        require_len(&active, 1, "returns")?;
        let mean_active = stats::mean(&active);
        let te = stats::sample_std(&active);
        if te == 0.0 {
            return Ok(if mean_active > 0.0 { f64::INFINITY } else { 0.0 });
        }
        Ok(mean_active / te * self.annualization().sqrt())
    }

    /// Upside and downside capture ratios. An empty up or down subset
    /// defaults that ratio to 1.0.
    pub fn capture_ratios(&self, returns: &[Rate], benchmark: &[Rate]) -> CaptureRatios {
        let (r, b) = stats::truncate_pair(returns, benchmark);
        let capture = |keep: fn(f64) -> bool| -> f64 {
            let (pr, br): (Vec<f64>, Vec<f64>) = r
                .iter()
                .zip(b.iter())
                .filter(|(_, bb)| keep(**bb))
                .map(|(rr, bb)| (*rr, *bb))
                .unzip();
            if br.is_empty() {
                1.0
            } else {
                (1.0 + stats::mean(&pr)) / (1.0 + stats::mean(&br))
            }
        };
        CaptureRatios {
            upside: capture(|x| x > 0.0),
            downside: capture(|x| x < 0.0),
        }
    }

    /// Annualized sample deviation of negative returns; 0 with fewer than
    /// two losing periods.
    pub fn downside_deviation(&self, returns: &[Rate]) -> f64 {
        let losses: Vec<f64> = returns.iter().copied().filter(|r| *r < 0.0).collect();
        if losses.len() < 2 {
            return 0.0;
        }
        stats::sample_std(&losses) * self.annualization().sqrt()
    }

    /// Pearson correlation matrix after truncating every series to the
    /// shortest one.
    ///
    /// The diagonal is exactly 1. A constant series has no defined
    /// correlation with anything else, so its off-diagonal entries are NaN.
    pub fn correlation_matrix(
        &self,
        series_by_asset: &BTreeMap<String, Vec<Rate>>,
    ) -> AnalyticsResult<CorrelationMatrix> {
        if series_by_asset.is_empty() {
            return Err(AnalyticsError::InsufficientData(
                "At least one return series required".into(),
            ));
        }
        let min_len = series_by_asset.values().map(Vec::len).min().unwrap_or(0);
        if min_len < 2 {
            return Err(AnalyticsError::InsufficientData(
                "Correlation requires at least 2 overlapping observations".into(),
            ));
        }

        let symbols: Vec<String> = series_by_asset.keys().cloned().collect();
        let rows: Vec<Vec<f64>> = series_by_asset
            .values()
            .map(|s| s[..min_len].to_vec())
            .collect();
        let cov = stats::covariance_matrix(&rows);
        let n = rows.len();
        let mut matrix = vec![vec![0.0; n]; n];
        for i in 0..n {
            for j in 0..n {
                matrix[i][j] = if i == j {
                    1.0
                } else {
                    let denom = (cov[i][i] * cov[j][j]).sqrt();
                    if denom == 0.0 {
                        f64::NAN
                    } else {
                        (cov[i][j] / denom).clamp(-1.0, 1.0)
                    }
                };
            }
        }
        Ok(CorrelationMatrix { symbols, matrix })
    }

    pub(crate) fn excess_returns(&self, returns: &[Rate]) -> Vec<f64> {
        let rf = self.config.periodic_risk_free();
        returns.iter().map(|r| r - rf).collect()
    }
}

// ---------------------------------------------------------------------------
// Shared helpers
// ---------------------------------------------------------------------------

/// Jensen's alpha on already-aligned series, annualized.
pub(crate) fn jensen_alpha(returns: &[Rate], benchmark: &[Rate], beta: f64, config: &AnalyticsConfig) -> f64 {
    let rf = config.periodic_risk_free();
    let portfolio_excess = stats::mean(returns) - rf;
    let benchmark_excess = stats::mean(benchmark) - rf;
    (portfolio_excess - beta * benchmark_excess) * config.periods_per_year()
}

fn active_returns(returns: &[Rate], benchmark: &[Rate]) -> Vec<f64> {
    let (r, b) = stats::truncate_pair(returns, benchmark);
    r.iter().zip(b.iter()).map(|(x, y)| x - y).collect()
}

pub(crate) fn validate_confidence(confidence: f64) -> AnalyticsResult<()> {
    if !(confidence > 0.0 && confidence < 1.0) {
        return Err(AnalyticsError::invalid(
            "confidence",
            "Confidence level must be between 0 and 1 (exclusive)",
        ));
    }
    Ok(())
}

pub(crate) fn require_len(xs: &[f64], min: usize, field: &str) -> AnalyticsResult<()> {
    if xs.len() < min {
        return Err(AnalyticsError::InsufficientData(format!(
            "{field}: at least {min} observation(s) required, got {}",
            xs.len()
        )));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
