//! Bootstrap validator — resample the raw grid, re-derive corrections, re-merge.
//!
//! Each iteration draws `n` row indices with replacement, re-estimates the
//! corrections in baseline mode from the resample, builds a candidate from the
//! resample's own raw mean and spread, and merges it with the reference. The
//! gate is on the 95th percentile of the reference tension.
//!
//! Key design choices:
//! - Sequential runs draw everything from one `StdRng` seeded once, so a given
//!   seed and table always replay the same resamples.
//! - Parallel runs seed each iteration from a BLAKE3 sub-seed instead. The
//!   sequence differs from the sequential one but is itself reproducible and
//!   independent of thread count.
//! - A resample missing one of the single-anchor populations cannot be
//!   corrected in baseline mode; it falls back to the published corrections
//!   and is counted in `fallback_iterations`. Any other estimation failure
//!   aborts the run with the iteration number.

use hubble_core::stats::{mean, sample_std, DistributionSummary};
use hubble_core::{
    concordance, estimate_baseline, CorrectionError, GridTable, Measurement, PenaltyParams, RngHierarchy,
    Stream,
};
use rand::Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::config::Baseline;
use crate::error::ValidationError;
use crate::gate::Gate;
use crate::progress::{tick_interval, ValidationProgress};

const STREAM: Stream = Stream::Bootstrap;

// ─── Configuration ───────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BootstrapConfig {
    /// Number of resamples (default 10 000).
    pub iterations: usize,
    /// RNG seed for reproducibility.
    pub seed: u64,
    /// Gate: p95 of the reference tension must not exceed this (σ).
    pub p95_threshold: f64,
    pub tolerance: f64,
    pub parallel: bool,
}

impl Default for BootstrapConfig {
    fn default() -> Self {
        Self {
            iterations: 10_000,
            seed: 172_901,
            p95_threshold: 1.2,
            tolerance: crate::gate::DEFAULT_TOLERANCE,
            parallel: false,
        }
    }
}

// ─── Result types ────────────────────────────────────────────────────

/// Outcome of one resample.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BootstrapIteration {
    pub tension_reference: f64,
    pub merged_mean: f64,
    pub anchor_correction: f64,
    pub relation_correction: f64,
    /// Published corrections were used because the resample lacked an anchor group.
    pub fallback: bool,
}

/// Raw per-iteration distributions, in iteration order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BootstrapSamples {
    pub tension_reference: Vec<f64>,
    pub merged_mean: Vec<f64>,
    pub anchor_correction: Vec<f64>,
    pub relation_correction: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BootstrapResult {
    pub iterations: usize,
    pub seed: u64,
    pub parallel: bool,
    /// Rows per resample.
    pub sample_size: usize,
    pub fallback_iterations: usize,
    pub tension: DistributionSummary,
    pub merged_mean: DistributionSummary,
    pub anchor_correction: DistributionSummary,
    pub relation_correction: DistributionSummary,
    pub gate: Gate,
    pub passed: bool,
    pub samples: BootstrapSamples,
}

// ─── Driver ──────────────────────────────────────────────────────────

/// Draw one resample from `rng` and evaluate it.
pub fn resample_once<R: Rng>(
    table: &GridTable,
    baseline: &Baseline,
    params: PenaltyParams,
    rng: &mut R,
    iteration: usize,
) -> Result<BootstrapIteration, ValidationError> {
    let n = table.len();
    let indices: Vec<usize> = (0..n).map(|_| rng.gen_range(0..n)).collect();
    let rows = table.pick(&indices)?;

    let (anchor_correction, relation_correction, fallback) = match estimate_baseline(&rows) {
        Ok(est) => (est.anchor_correction, est.relation_correction, false),
        Err(CorrectionError::MissingAnchorGroup { .. }) => {
            (baseline.anchor_correction, baseline.relation_correction, true)
        }
        Err(source) => return Err(ValidationError::Resample { iteration, source }),
    };

    let values: Vec<f64> = rows.iter().map(|r| r.value).collect();
    let sigma = sample_std(&values);
    if !sigma.is_finite() || sigma <= 0.0 {
        return Err(ValidationError::DegenerateResample { iteration });
    }
    let candidate = Measurement {
        mean: mean(&values) + anchor_correction + relation_correction,
        sigma,
    };

    let r = concordance(baseline.reference, candidate, mean(&values), params);
    Ok(BootstrapIteration {
        tension_reference: r.tension_reference,
        merged_mean: r.merged_mean,
        anchor_correction,
        relation_correction,
        fallback,
    })
}

pub fn run_bootstrap(
    table: &GridTable,
    baseline: &Baseline,
    params: PenaltyParams,
    config: &BootstrapConfig,
    progress: Option<&dyn ValidationProgress>,
) -> Result<BootstrapResult, ValidationError> {
    baseline.reference.validate()?;
    let total = config.iterations;
    let hierarchy = RngHierarchy::new(config.seed);

    if let Some(p) = progress {
        p.on_start(STREAM.as_str(), total);
    }

    let records: Vec<BootstrapIteration> = if config.parallel {
        (0..total)
            .into_par_iter()
            .map(|i| {
                let mut rng = hierarchy.rng_for(STREAM, i as u64);
                resample_once(table, baseline, params, &mut rng, i)
            })
            .collect::<Result<_, _>>()?
    } else {
        let mut rng = hierarchy.master_rng();
        let every = tick_interval(total);
        let mut out = Vec::with_capacity(total);
        for i in 0..total {
            out.push(resample_once(table, baseline, params, &mut rng, i)?);
            if let Some(p) = progress {
                if (i + 1) % every == 0 {
                    p.on_tick(STREAM.as_str(), i + 1, total);
                }
            }
        }
        out
    };

    let samples = BootstrapSamples {
        tension_reference: records.iter().map(|r| r.tension_reference).collect(),
        merged_mean: records.iter().map(|r| r.merged_mean).collect(),
        anchor_correction: records.iter().map(|r| r.anchor_correction).collect(),
        relation_correction: records.iter().map(|r| r.relation_correction).collect(),
    };
    let tension = DistributionSummary::from_values(&samples.tension_reference);
    let gate = Gate::at_most(
        "bootstrap_p95",
        "p95 reference tension",
        tension.p95,
        config.p95_threshold,
        config.tolerance,
    );
    let passed = gate.passed;

    if let Some(p) = progress {
        p.on_finish(STREAM.as_str(), passed);
    }

    Ok(BootstrapResult {
        iterations: total,
        seed: config.seed,
        parallel: config.parallel,
        sample_size: table.len(),
        fallback_iterations: records.iter().filter(|r| r.fallback).count(),
        merged_mean: DistributionSummary::from_values(&samples.merged_mean),
        anchor_correction: DistributionSummary::from_values(&samples.anchor_correction),
        relation_correction: DistributionSummary::from_values(&samples.relation_correction),
        tension,
        gate,
        passed,
        samples,
    })
}
