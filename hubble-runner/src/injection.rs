//! Injection/recovery validator — plant a truth, bias it, correct it, merge.
//!
//! Per trial:
//!
//! ```text
//! truth     ~ U[truth_lo, truth_hi]
//! observed  = truth + anchor_bias + relation_bias + N(0, noise_sigma · noise_scale)
//! corrected = observed − (anchor_bias + relation_bias)
//! merged    = concordance(reference = (truth, reference_sigma),
//!                         candidate = (corrected, candidate_sigma))
//! bias      = merged − truth
//! ```
//!
//! Gates: median |bias| and median reference tension must each stay under
//! their thresholds. Draw order within a trial is truth first, then noise.

use hubble_core::stats::DistributionSummary;
use hubble_core::{concordance, Measurement, MeasurementError, PenaltyParams, RngHierarchy, Stream};
use rand::Rng;
use rand_distr::StandardNormal;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::config::ConfigError;
use crate::error::ValidationError;
use crate::gate::Gate;
use crate::progress::{tick_interval, ValidationProgress};

const STREAM: Stream = Stream::Injection;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InjectionConfig {
    pub trials: usize,
    pub seed: u64,
    pub truth_range: [f64; 2],
    pub anchor_bias: f64,
    pub relation_bias: f64,
    /// σ of the simulated measurement noise (the original candidate's σ).
    pub noise_sigma: f64,
    /// Multiplier on `noise_sigma`; 0 turns the noise off.
    pub noise_scale: f64,
    pub reference_sigma: f64,
    pub candidate_sigma: f64,
    pub bias_threshold: f64,
    pub tension_threshold: f64,
    pub tolerance: f64,
    pub parallel: bool,
}

impl Default for InjectionConfig {
    fn default() -> Self {
        Self {
            trials: 2_000,
            seed: 172_901,
            truth_range: [67.3, 67.5],
            anchor_bias: 1.92,
            relation_bias: 0.22,
            noise_sigma: 1.56,
            noise_scale: 1.0,
            reference_sigma: 0.60,
            candidate_sigma: 1.89,
            bias_threshold: 0.3,
            tension_threshold: 1.0,
            tolerance: crate::gate::DEFAULT_TOLERANCE,
            parallel: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct InjectionTrial {
    pub truth: f64,
    pub observed: f64,
    pub corrected: f64,
    pub recovered: f64,
    /// recovered − truth
    pub bias: f64,
    pub tension_reference: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InjectionResult {
    pub trials: usize,
    pub seed: u64,
    pub parallel: bool,
    pub abs_bias: DistributionSummary,
    pub signed_bias: DistributionSummary,
    pub tension: DistributionSummary,
    pub gate_bias: Gate,
    pub gate_tension: Gate,
    pub passed: bool,
    pub records: Vec<InjectionTrial>,
}

/// Run one trial, drawing truth then noise from `rng`.
///
/// The correction removes the same `planted` sum that was added, so a
/// noiseless trial recovers the truth up to floating-point rounding (a few
/// ulps of the truth), not bit-exactly.
pub fn inject_once<R: Rng>(config: &InjectionConfig, params: PenaltyParams, rng: &mut R) -> InjectionTrial {
    let [lo, hi] = config.truth_range;
    let truth = rng.gen_range(lo..=hi);
    let z: f64 = rng.sample(StandardNormal);
    let noise = z * config.noise_sigma * config.noise_scale;

    let planted = config.anchor_bias + config.relation_bias;
    let observed = truth + planted + noise;
    let corrected = observed - planted;

    let reference = Measurement {
        mean: truth,
        sigma: config.reference_sigma,
    };
    let candidate = Measurement {
        mean: corrected,
        sigma: config.candidate_sigma,
    };
    let r = concordance(reference, candidate, observed, params);

    InjectionTrial {
        truth,
        observed,
        corrected,
        recovered: r.merged_mean,
        bias: r.merged_mean - truth,
        tension_reference: r.tension_reference,
    }
}

pub fn run_injection(
    params: PenaltyParams,
    config: &InjectionConfig,
    progress: Option<&dyn ValidationProgress>,
) -> Result<InjectionResult, ValidationError> {
    for sigma in [config.reference_sigma, config.candidate_sigma] {
        if !sigma.is_finite() || sigma <= 0.0 {
            return Err(MeasurementError::NonPositiveSigma { sigma }.into());
        }
    }
    let [lo, hi] = config.truth_range;
    if !(lo.is_finite() && hi.is_finite() && lo <= hi) {
        return Err(ConfigError::Invalid {
            field: "injection.truth_range",
            reason: format!("expected low <= high, got [{lo}, {hi}]"),
        }
        .into());
    }

    let total = config.trials;
    let hierarchy = RngHierarchy::new(config.seed);
    if let Some(p) = progress {
        p.on_start(STREAM.as_str(), total);
    }

    let records: Vec<InjectionTrial> = if config.parallel {
        (0..total)
            .into_par_iter()
            .map(|i| inject_once(config, params, &mut hierarchy.rng_for(STREAM, i as u64)))
            .collect()
    } else {
        let mut rng = hierarchy.master_rng();
        let every = tick_interval(total);
        (0..total)
            .map(|i| {
                let trial = inject_once(config, params, &mut rng);
                if let Some(p) = progress {
                    if (i + 1) % every == 0 {
                        p.on_tick(STREAM.as_str(), i + 1, total);
                    }
                }
                trial
            })
            .collect()
    };

    let abs: Vec<f64> = records.iter().map(|t| t.bias.abs()).collect();
    let signed: Vec<f64> = records.iter().map(|t| t.bias).collect();
    let tensions: Vec<f64> = records.iter().map(|t| t.tension_reference).collect();

    let abs_bias = DistributionSummary::from_values(&abs);
    let tension = DistributionSummary::from_values(&tensions);
    let gate_bias = Gate::at_most(
        "injection_bias",
        "median |bias|",
        abs_bias.median,
        config.bias_threshold,
        config.tolerance,
    );
    let gate_tension = Gate::at_most(
        "injection_tension",
        "median reference tension",
        tension.median,
        config.tension_threshold,
        config.tolerance,
    );
    let passed = gate_bias.passed && gate_tension.passed;

    if let Some(p) = progress {
        p.on_finish(STREAM.as_str(), passed);
    }

    Ok(InjectionResult {
        trials: total,
        seed: config.seed,
        parallel: config.parallel,
        abs_bias,
        signed_bias: DistributionSummary::from_values(&signed),
        tension,
        gate_bias,
        gate_tension,
        passed,
        records,
    })
}
