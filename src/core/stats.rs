//! Monte Carlo result statistics
//!
//! Holds the discounted price estimate, its standard error and optional
//! simulation Greeks, plus the sample-statistics helpers shared by the
//! pricers (moments, confidence intervals, pooling of independent runs).

use serde::{Deserialize, Serialize};

/// Result of a Monte Carlo pricing run.
///
/// `price` is the discounted sample mean of the (possibly variance-reduced)
/// payoffs and `std_error` its standard error; both are always finite and
/// `std_error >= 0`. Greek fields are populated only when the pricer was
/// asked to compute them.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct McResult {
    /// Discounted price estimate
    pub price: f64,
    /// Standard error of the price estimate
    pub std_error: f64,
    /// Pathwise delta estimate
    pub delta: Option<f64>,
    /// Standard error of the delta estimate
    pub delta_se: Option<f64>,
    /// Likelihood-ratio vega estimate
    pub vega: Option<f64>,
    /// Standard error of the vega estimate
    pub vega_se: Option<f64>,
    /// Number of simulated paths
    pub num_paths: usize,
    /// Number of time steps per path (1 for terminal-only schemes)
    pub num_steps: usize,
    /// Seed the run was keyed on
    pub seed: u64,
}

impl McResult {
    /// Confidence interval for the price estimate under the normal
    /// approximation. Supported levels: 0.90, 0.95 (default z), 0.99.
    pub fn confidence_interval(&self, confidence_level: f64) -> (f64, f64) {
        let z_score = if confidence_level >= 0.99 {
            2.576
        } else if confidence_level <= 0.90 {
            1.645
        } else {
            1.96
        };
        let margin = z_score * self.std_error;
        (self.price - margin, self.price + margin)
    }

    /// Is the price estimate statistically distinguishable from zero?
    pub fn is_significant(&self, significance_level: f64) -> bool {
        if self.std_error <= 0.0 {
            return false;
        }
        let t_stat = (self.price / self.std_error).abs();
        let critical = if significance_level <= 0.01 { 2.576 } else { 1.96 };
        t_stat > critical
    }
}

/// Sample mean
pub fn mean(x: &[f64]) -> f64 {
    if x.is_empty() {
        return 0.0;
    }
    x.iter().sum::<f64>() / x.len() as f64
}

/// Sample variance with Bessel's correction
pub fn variance(x: &[f64]) -> f64 {
    if x.len() < 2 {
        return 0.0;
    }
    let m = mean(x);
    let ss: f64 = x.iter().map(|v| (v - m) * (v - m)).sum();
    ss / (x.len() - 1) as f64
}

/// Sample standard deviation
pub fn standard_deviation(x: &[f64]) -> f64 {
    variance(x).sqrt()
}

/// Standard error of the sample mean
pub fn standard_error(x: &[f64]) -> f64 {
    if x.len() < 2 {
        return 0.0;
    }
    standard_deviation(x) / (x.len() as f64).sqrt()
}

/// Sample covariance (vectors must have equal length)
pub fn covariance(x: &[f64], y: &[f64]) -> f64 {
    if x.len() != y.len() || x.len() < 2 {
        return 0.0;
    }
    let mx = mean(x);
    let my = mean(y);
    let sum: f64 = x.iter().zip(y).map(|(a, b)| (a - mx) * (b - my)).sum();
    sum / (x.len() - 1) as f64
}

/// Pearson correlation coefficient
pub fn correlation(x: &[f64], y: &[f64]) -> f64 {
    let sx = standard_deviation(x);
    let sy = standard_deviation(y);
    if sx <= 0.0 || sy <= 0.0 {
        return 0.0;
    }
    covariance(x, y) / (sx * sy)
}

/// Pool independent Monte Carlo estimates, weighting each run by its path
/// count and propagating the per-run standard errors.
pub fn combine_results(results: &[McResult]) -> McResult {
    let mut combined = McResult::default();
    let mut total_weight = 0.0;
    let mut weighted_price = 0.0;
    let mut variance_sum = 0.0;

    for r in results {
        if r.num_paths == 0 {
            continue;
        }
        let w = r.num_paths as f64;
        total_weight += w;
        weighted_price += w * r.price;
        variance_sum += w * w * r.std_error * r.std_error;
    }

    if total_weight > 0.0 {
        combined.price = weighted_price / total_weight;
        combined.std_error = variance_sum.sqrt() / total_weight;
        combined.num_paths = total_weight as usize;
    }
    combined
}
