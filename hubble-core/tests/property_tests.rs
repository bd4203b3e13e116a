//! Property tests for concordance engine invariants.
//!
//! Uses proptest to verify:
//! 1. Penalty never reduces uncertainty — σ_eff ≥ σ on both sides
//! 2. Merged sigma is exactly the inverse-variance combination of the σ_eff
//! 3. Idempotence — identical inputs give bit-identical outputs
//! 4. Zero disagreement means zero penalty, whatever d and f
//! 5. Penalty is monotone in disagreement, in d, and in (1 − f)

use hubble_core::concordance::{concordance, effective_uncertainty, epistemic_penalty};
use hubble_core::{Measurement, PenaltyParams};
use proptest::prelude::*;

// ── Strategies (proptest) ────────────────────────────────────────────

fn arb_measurement() -> impl Strategy<Value = Measurement> {
    (50.0..90.0_f64, 0.05..5.0_f64).prop_map(|(mean, sigma)| Measurement { mean, sigma })
}

fn arb_params() -> impl Strategy<Value = PenaltyParams> {
    (0.0..2.0_f64, 0.0..=1.0_f64).prop_map(|(d, f)| PenaltyParams::new(d, f))
}

// ── 1. σ_eff ≥ σ ─────────────────────────────────────────────────────

proptest! {
    #[test]
    fn penalty_never_shrinks_uncertainty(
        reference in arb_measurement(),
        candidate in arb_measurement(),
        params in arb_params(),
    ) {
        let r = concordance(reference, candidate, candidate.mean, params);
        prop_assert!(r.reference_sigma_eff >= reference.sigma);
        prop_assert!(r.candidate_sigma_eff >= candidate.sigma);
        prop_assert!(r.penalty >= 0.0);
    }
}

// ── 2. Inverse-variance identity ─────────────────────────────────────

proptest! {
    #[test]
    fn merged_sigma_is_inverse_variance_combination(
        reference in arb_measurement(),
        candidate in arb_measurement(),
        params in arb_params(),
    ) {
        let r = concordance(reference, candidate, candidate.mean, params);
        let expected = 1.0
            / (1.0 / r.reference_sigma_eff.powi(2) + 1.0 / r.candidate_sigma_eff.powi(2)).sqrt();
        prop_assert!((r.merged_sigma - expected).abs() <= 1e-12 * expected.max(1.0));
    }
}

// ── 3. Idempotence ───────────────────────────────────────────────────

proptest! {
    #[test]
    fn identical_inputs_identical_outputs(
        reference in arb_measurement(),
        candidate in arb_measurement(),
        params in arb_params(),
        original in 60.0..80.0_f64,
    ) {
        let a = concordance(reference, candidate, original, params);
        let b = concordance(reference, candidate, original, params);
        prop_assert_eq!(a.merged_mean.to_bits(), b.merged_mean.to_bits());
        prop_assert_eq!(a.merged_sigma.to_bits(), b.merged_sigma.to_bits());
        prop_assert_eq!(a.tension_reference.to_bits(), b.tension_reference.to_bits());
        prop_assert_eq!(a, b);
    }
}

// ── 4. Zero disagreement ─────────────────────────────────────────────

proptest! {
    #[test]
    fn penalty_vanishes_without_disagreement(params in arb_params()) {
        prop_assert_eq!(epistemic_penalty(0.0, params), 0.0);
    }

    #[test]
    fn merged_mean_lies_between_inputs(
        reference in arb_measurement(),
        candidate in arb_measurement(),
        params in arb_params(),
    ) {
        let r = concordance(reference, candidate, candidate.mean, params);
        let lo = reference.mean.min(candidate.mean) - 1e-9;
        let hi = reference.mean.max(candidate.mean) + 1e-9;
        prop_assert!(r.merged_mean >= lo && r.merged_mean <= hi);
    }
}

// ── 5. Monotonicity ──────────────────────────────────────────────────

proptest! {
    #[test]
    fn penalty_monotone_in_each_argument(
        delta in 0.0..10.0_f64,
        extra in 0.0..5.0_f64,
        d in 0.0..2.0_f64,
        f in 0.0..=1.0_f64,
        f_drop in 0.0..=1.0_f64,
    ) {
        let params = PenaltyParams::new(d, f);
        let base = epistemic_penalty(delta, params);

        prop_assert!(epistemic_penalty(delta + extra, params) >= base);
        prop_assert!(epistemic_penalty(delta, PenaltyParams::new(d + extra, f)) >= base);

        let lower_f = (f - f_drop).max(0.0);
        prop_assert!(epistemic_penalty(delta, PenaltyParams::new(d, lower_f)) >= base);
    }

    #[test]
    fn effective_uncertainty_is_quadrature(sigma in 0.01..5.0_f64, penalty in 0.0..5.0_f64) {
        let eff = effective_uncertainty(sigma, penalty);
        prop_assert!(eff >= sigma && eff >= penalty);
        prop_assert!((eff * eff - (sigma * sigma + penalty * penalty)).abs() < 1e-9);
    }
}
