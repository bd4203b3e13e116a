//! Descriptive statistics shared by the estimators and validators.
//!
//! Percentiles use linear interpolation between closest ranks, so results line
//! up with the conventional `(n − 1)·p` definition used by most array libraries.
//! Standard deviations come in two flavours: `sample_std` (n − 1) for scatter
//! estimates and `population_std` (n) for summarising simulated distributions.

use serde::{Deserialize, Serialize};
use statrs::distribution::{ContinuousCDF, Normal};

pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Standard deviation with Bessel's correction. NaN for fewer than two values.
pub fn sample_std(values: &[f64]) -> f64 {
    let n = values.len();
    if n < 2 {
        return f64::NAN;
    }
    let m = mean(values);
    let ss = values.iter().map(|&x| (x - m).powi(2)).sum::<f64>();
    (ss / (n - 1) as f64).sqrt()
}

/// Standard deviation over the whole population. NaN for an empty slice.
pub fn population_std(values: &[f64]) -> f64 {
    let n = values.len();
    if n == 0 {
        return f64::NAN;
    }
    let m = mean(values);
    let ss = values.iter().map(|&x| (x - m).powi(2)).sum::<f64>();
    (ss / n as f64).sqrt()
}

/// Percentile of a sorted slice using linear interpolation, `p` in [0, 100].
pub fn percentile_sorted(sorted: &[f64], p: f64) -> f64 {
    let n = sorted.len();
    if n == 0 {
        return f64::NAN;
    }
    if n == 1 {
        return sorted[0];
    }
    let rank = (p / 100.0).clamp(0.0, 1.0) * (n - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = (lo + 1).min(n - 1);
    let frac = rank - lo as f64;
    sorted[lo] * (1.0 - frac) + sorted[hi] * frac
}

/// Sorted copy of the input, NaNs ordered as equal.
pub fn sorted_copy(values: &[f64]) -> Vec<f64> {
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    sorted
}

/// Percentile of an unsorted slice, `p` in [0, 100].
pub fn percentile(values: &[f64], p: f64) -> f64 {
    percentile_sorted(&sorted_copy(values), p)
}

pub fn median(values: &[f64]) -> f64 {
    percentile(values, 50.0)
}

/// Quantile of the standard normal distribution, Φ⁻¹(p).
///
/// Returns NaN outside [0, 1]; ±∞ at the endpoints.
pub fn standard_normal_quantile(p: f64) -> f64 {
    if !(0.0..=1.0).contains(&p) {
        return f64::NAN;
    }
    match Normal::new(0.0, 1.0) {
        Ok(normal) => normal.inverse_cdf(p),
        Err(_) => f64::NAN,
    }
}

// ─── Summary ─────────────────────────────────────────────────────────

/// Summary of a simulated or scanned distribution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DistributionSummary {
    pub count: usize,
    pub mean: f64,
    /// Population standard deviation.
    pub std: f64,
    pub median: f64,
    pub min: f64,
    pub max: f64,
    pub p25: f64,
    pub p75: f64,
    pub p95: f64,
    /// p75 − p25.
    pub iqr: f64,
}

impl DistributionSummary {
    pub fn from_values(values: &[f64]) -> Self {
        let sorted = sorted_copy(values);
        let p25 = percentile_sorted(&sorted, 25.0);
        let p75 = percentile_sorted(&sorted, 75.0);
        Self {
            count: values.len(),
            mean: mean(values),
            std: population_std(values),
            median: percentile_sorted(&sorted, 50.0),
            min: sorted.first().copied().unwrap_or(f64::NAN),
            max: sorted.last().copied().unwrap_or(f64::NAN),
            p25,
            p75,
            p95: percentile_sorted(&sorted, 95.0),
            iqr: p75 - p25,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn percentile_interpolates_linearly() {
        let v = [1.0, 2.0, 3.0, 4.0, 5.0];
        assert_eq!(percentile(&v, 0.0), 1.0);
        assert_eq!(percentile(&v, 50.0), 3.0);
        assert_eq!(percentile(&v, 100.0), 5.0);
        assert!((percentile(&v, 84.0) - 4.36).abs() < 1e-12);
        assert!((percentile(&v, 16.0) - 1.64).abs() < 1e-12);
    }

    #[test]
    fn median_of_even_count_is_midpoint() {
        assert_eq!(median(&[4.0, 1.0, 3.0, 2.0]), 2.5);
    }

    #[test]
    fn std_flavours() {
        let v = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        assert!((population_std(&v) - 2.0).abs() < 1e-12);
        assert!((sample_std(&v) - 2.138_089_935_299_395).abs() < 1e-12);
        assert!(sample_std(&[1.0]).is_nan());
        assert!(mean(&[]).is_nan());
    }

    #[test]
    fn normal_quantile_known_points() {
        assert!(standard_normal_quantile(0.5).abs() < 1e-12);
        assert!((standard_normal_quantile(0.975) - 1.959_963_984_540_054).abs() < 1e-8);
        assert!(standard_normal_quantile(1.5).is_nan());
    }

    #[test]
    fn summary_of_small_sample() {
        let s = DistributionSummary::from_values(&[3.0, 1.0, 2.0, 5.0, 4.0]);
        assert_eq!(s.count, 5);
        assert_eq!(s.median, 3.0);
        assert_eq!(s.min, 1.0);
        assert_eq!(s.max, 5.0);
        assert_eq!(s.p25, 2.0);
        assert_eq!(s.p75, 4.0);
        assert_eq!(s.iqr, 2.0);
        assert!((s.p95 - 4.8).abs() < 1e-12);
    }
}
