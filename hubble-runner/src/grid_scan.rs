//! Grid-scan validator — sweep the two penalty parameters over their bounds.
//!
//! Corrections are held at the published baseline; only `d` and `f` vary, on an
//! evenly spaced `n × n` lattice (17 × 17 by default, bounds inclusive). The
//! gate asks that the median reference tension over the surface lie in a closed
//! interval. No randomness is involved; the seed is carried only so every
//! validator record has the same shape.

use hubble_core::stats::DistributionSummary;
use hubble_core::{concordance, PenaltyParams};
use serde::{Deserialize, Serialize};

use crate::config::Baseline;
use crate::error::ValidationError;
use crate::gate::Gate;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridScanConfig {
    pub distance_bounds: [f64; 2],
    pub attribution_bounds: [f64; 2],
    pub points_per_axis: usize,
    /// Gate: median reference tension must lie in this closed interval (σ).
    pub median_range: [f64; 2],
    pub seed: u64,
}

impl Default for GridScanConfig {
    fn default() -> Self {
        Self {
            distance_bounds: [1.0, 1.8],
            attribution_bounds: [0.3, 0.7],
            points_per_axis: 17,
            median_range: [0.9, 1.1],
            seed: 172_901,
        }
    }
}

/// One evaluated point of the surface.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SurfacePoint {
    pub distance: f64,
    pub attribution: f64,
    pub merged_mean: f64,
    pub merged_sigma: f64,
    pub penalty: f64,
    pub tension_reference: f64,
    pub tension_corrected: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridScanResult {
    pub points_per_axis: usize,
    pub seed: u64,
    /// Row-major: distance outer, attribution inner.
    pub surface: Vec<SurfacePoint>,
    pub tension: DistributionSummary,
    pub gate: Gate,
    pub passed: bool,
}

/// `n` evenly spaced values from `lo` to `hi` inclusive. A single point sits at `lo`.
pub fn linspace(lo: f64, hi: f64, n: usize) -> Vec<f64> {
    match n {
        0 => Vec::new(),
        1 => vec![lo],
        _ => (0..n)
            .map(|i| lo + (hi - lo) * i as f64 / (n - 1) as f64)
            .collect(),
    }
}

pub fn run_grid_scan(
    baseline: &Baseline,
    config: &GridScanConfig,
) -> Result<GridScanResult, ValidationError> {
    baseline.reference.validate()?;
    baseline.corrected_candidate.validate()?;

    let n = config.points_per_axis;
    let [d_lo, d_hi] = config.distance_bounds;
    let [f_lo, f_hi] = config.attribution_bounds;

    let mut surface = Vec::with_capacity(n * n);
    for &distance in &linspace(d_lo, d_hi, n) {
        for &attribution in &linspace(f_lo, f_hi, n) {
            let r = concordance(
                baseline.reference,
                baseline.corrected_candidate,
                baseline.original_candidate.mean,
                PenaltyParams::new(distance, attribution),
            );
            surface.push(SurfacePoint {
                distance,
                attribution,
                merged_mean: r.merged_mean,
                merged_sigma: r.merged_sigma,
                penalty: r.penalty,
                tension_reference: r.tension_reference,
                tension_corrected: r.tension_corrected,
            });
        }
    }

    let tensions: Vec<f64> = surface.iter().map(|p| p.tension_reference).collect();
    let tension = DistributionSummary::from_values(&tensions);
    let [lo, hi] = config.median_range;
    let gate = Gate::within("grid_median", "median reference tension", tension.median, lo, hi);
    let passed = gate.passed;

    Ok(GridScanResult {
        points_per_axis: n,
        seed: config.seed,
        surface,
        tension,
        gate,
        passed,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn linspace_includes_both_bounds() {
        let v = linspace(1.0, 1.8, 17);
        assert_eq!(v.len(), 17);
        assert_eq!(v[0], 1.0);
        assert!((v[16] - 1.8).abs() < 1e-12);
        assert!((v[8] - 1.4).abs() < 1e-12);
        assert_eq!(linspace(0.3, 0.7, 1), vec![0.3]);
        assert!(linspace(0.0, 1.0, 0).is_empty());
    }

    #[test]
    fn baseline_surface_passes() {
        let r = run_grid_scan(&Baseline::default(), &GridScanConfig::default()).unwrap();
        assert_eq!(r.surface.len(), 289);
        assert!((r.tension.median - 0.9491).abs() < 1e-3, "median {}", r.tension.median);
        assert!((r.tension.min - 0.8255).abs() < 1e-3);
        assert!((r.tension.max - 0.9661).abs() < 1e-3);
        assert!(r.passed);
    }

    #[test]
    fn nominal_point_matches_direct_concordance() {
        // 17 points over [1.0, 1.8] do not hit 1.36 exactly; use a lattice that does.
        let config = GridScanConfig {
            distance_bounds: [1.36, 1.36],
            attribution_bounds: [0.5, 0.5],
            points_per_axis: 1,
            ..GridScanConfig::default()
        };
        let r = run_grid_scan(&Baseline::default(), &config).unwrap();
        assert_eq!(r.surface.len(), 1);
        assert!((r.surface[0].tension_reference - 0.96581).abs() < 1e-4);
    }

    #[test]
    fn row_major_distance_outer() {
        let r = run_grid_scan(&Baseline::default(), &GridScanConfig::default()).unwrap();
        assert_eq!(r.surface[0].distance, r.surface[16].distance);
        assert_ne!(r.surface[0].attribution, r.surface[16].attribution);
        assert_eq!(r.surface[17].attribution, r.surface[0].attribution);
    }

    #[test]
    fn penalty_grows_along_distance_axis() {
        let r = run_grid_scan(&Baseline::default(), &GridScanConfig::default()).unwrap();
        for j in 0..17 {
            for i in 1..17 {
                assert!(r.surface[i * 17 + j].penalty >= r.surface[(i - 1) * 17 + j].penalty);
            }
        }
    }

    #[test]
    fn narrow_band_fails() {
        let config = GridScanConfig {
            median_range: [1.0, 1.1],
            ..GridScanConfig::default()
        };
        let r = run_grid_scan(&Baseline::default(), &config).unwrap();
        assert!(!r.passed);
    }
}
