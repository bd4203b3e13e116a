//! Concordance engine — epistemic penalty plus inverse-variance merge.
//!
//! Given a reference measurement and a (bias-corrected) candidate measurement,
//! the engine inflates both uncertainties in quadrature by a penalty that scales
//! with their disagreement, merges them by inverse-variance weighting and reports
//! the tension of the merged value against three comparators.
//!
//! ```text
//! disagreement = |candidate − reference|
//! penalty      = 0.5 · disagreement · d · (1 − f)
//! σ_eff(x)     = sqrt(σ_x² + penalty²)
//! w_x          = 1 / σ_eff(x)²
//! merged       = Σ w_x·μ_x / Σ w_x,   σ_merged = 1 / sqrt(Σ w_x)
//! tension(x)   = |merged − x| / σ_merged
//! ```
//!
//! The engine is pure and infallible. Sigmas are caller-validated: a zero
//! uncertainty combined with zero disagreement yields infinite weights, which
//! is a contract violation rather than something this module defends against.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::measurement::Measurement;

// ─── Parameters ──────────────────────────────────────────────────────

/// The two free parameters of the epistemic penalty.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PenaltyParams {
    /// Epistemic distance multiplier `d` (nominal 1.36).
    pub distance: f64,
    /// Fraction `f` of the disagreement already attributed to known systematics (nominal 0.50).
    pub attribution: f64,
}

impl PenaltyParams {
    pub const NOMINAL: PenaltyParams = PenaltyParams {
        distance: 1.36,
        attribution: 0.50,
    };

    pub fn new(distance: f64, attribution: f64) -> Self {
        Self {
            distance,
            attribution,
        }
    }
}

impl Default for PenaltyParams {
    fn default() -> Self {
        Self::NOMINAL
    }
}

/// Epistemic penalty for a given absolute disagreement.
pub fn epistemic_penalty(disagreement: f64, params: PenaltyParams) -> f64 {
    0.5 * disagreement * params.distance * (1.0 - params.attribution)
}

/// Raw uncertainty inflated in quadrature by the penalty.
pub fn effective_uncertainty(sigma: f64, penalty: f64) -> f64 {
    (sigma * sigma + penalty * penalty).sqrt()
}

// ─── Result ──────────────────────────────────────────────────────────

/// Inputs echoed into every result so a record is self-describing.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConcordanceInputs {
    pub reference: Measurement,
    pub candidate: Measurement,
    /// Uncorrected candidate mean, used only as a tension comparator.
    pub original_candidate_mean: f64,
    pub params: PenaltyParams,
}

/// Output of one concordance computation. Built fresh per call, never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConcordanceResult {
    pub merged_mean: f64,
    pub merged_sigma: f64,
    pub disagreement: f64,
    pub penalty: f64,
    pub reference_sigma_eff: f64,
    pub candidate_sigma_eff: f64,
    pub reference_weight: f64,
    pub candidate_weight: f64,
    pub reference_weight_frac: f64,
    pub candidate_weight_frac: f64,
    /// Merged vs reference.
    pub tension_reference: f64,
    /// Merged vs the uncorrected candidate.
    pub tension_original: f64,
    /// Merged vs the corrected candidate.
    pub tension_corrected: f64,
    pub inputs: ConcordanceInputs,
}

impl ConcordanceResult {
    /// Flat name → value view of the numeric outputs.
    pub fn fields(&self) -> BTreeMap<&'static str, f64> {
        BTreeMap::from([
            ("merged_mean", self.merged_mean),
            ("merged_sigma", self.merged_sigma),
            ("disagreement", self.disagreement),
            ("penalty", self.penalty),
            ("reference_sigma_eff", self.reference_sigma_eff),
            ("candidate_sigma_eff", self.candidate_sigma_eff),
            ("reference_weight", self.reference_weight),
            ("candidate_weight", self.candidate_weight),
            ("reference_weight_frac", self.reference_weight_frac),
            ("candidate_weight_frac", self.candidate_weight_frac),
            ("tension_reference", self.tension_reference),
            ("tension_original", self.tension_original),
            ("tension_corrected", self.tension_corrected),
        ])
    }
}

// ─── Engine ──────────────────────────────────────────────────────────

/// Merge a reference and a candidate measurement under the epistemic penalty.
pub fn concordance(
    reference: Measurement,
    candidate: Measurement,
    original_candidate_mean: f64,
    params: PenaltyParams,
) -> ConcordanceResult {
    let disagreement = (candidate.mean - reference.mean).abs();
    let penalty = epistemic_penalty(disagreement, params);

    let reference_sigma_eff = effective_uncertainty(reference.sigma, penalty);
    let candidate_sigma_eff = effective_uncertainty(candidate.sigma, penalty);

    let reference_weight = 1.0 / (reference_sigma_eff * reference_sigma_eff);
    let candidate_weight = 1.0 / (candidate_sigma_eff * candidate_sigma_eff);
    let total_weight = reference_weight + candidate_weight;

    let merged_mean =
        (reference_weight * reference.mean + candidate_weight * candidate.mean) / total_weight;
    let merged_sigma = 1.0 / total_weight.sqrt();

    ConcordanceResult {
        merged_mean,
        merged_sigma,
        disagreement,
        penalty,
        reference_sigma_eff,
        candidate_sigma_eff,
        reference_weight,
        candidate_weight,
        reference_weight_frac: reference_weight / total_weight,
        candidate_weight_frac: candidate_weight / total_weight,
        tension_reference: (merged_mean - reference.mean).abs() / merged_sigma,
        tension_original: (merged_mean - original_candidate_mean).abs() / merged_sigma,
        tension_corrected: (merged_mean - candidate.mean).abs() / merged_sigma,
        inputs: ConcordanceInputs {
            reference,
            candidate,
            original_candidate_mean,
            params,
        },
    }
}
