//! Property tests for gates and the acceptability policy.

use hubble_runner::gate::{sidak_alpha, DEFAULT_TOLERANCE};
use hubble_runner::policy::decide;
use hubble_runner::{sidak_threshold, Action, ExecutionMode, Gate, IssueKind};
use proptest::prelude::*;

proptest! {
    #[test]
    fn sidak_level_is_below_family_level(alpha in 0.001f64..0.5, k in 1usize..50) {
        let a = sidak_alpha(alpha, k);
        prop_assert!(a > 0.0);
        prop_assert!(a <= alpha + 1e-15);
        // Recombining K independent comparisons recovers the family level.
        let family = 1.0 - (1.0 - a).powi(k as i32);
        prop_assert!((family - alpha).abs() < 1e-12);
    }

    #[test]
    fn sidak_threshold_tightens_with_smaller_alpha(k in 1usize..20, alpha in 0.01f64..0.2) {
        prop_assert!(sidak_threshold(alpha / 2.0, k) > sidak_threshold(alpha, k));
    }

    #[test]
    fn at_most_agrees_with_comparison(observed in 0.0f64..5.0, threshold in 0.0f64..5.0) {
        let gate = Gate::at_most("g", "z", observed, threshold, DEFAULT_TOLERANCE);
        prop_assert_eq!(gate.passed, observed <= threshold + DEFAULT_TOLERANCE);
    }

    #[test]
    fn within_agrees_with_interval(observed in -2.0f64..3.0, low in 0.0f64..1.0, width in 0.0f64..1.0) {
        let high = low + width;
        let gate = Gate::within("g", "median", observed, low, high);
        prop_assert_eq!(gate.passed, observed >= low && observed <= high);
    }
}

#[test]
fn security_flags_abort_in_every_mode() {
    for mode in [
        ExecutionMode::Strict,
        ExecutionMode::Audit,
        ExecutionMode::DryRun,
        ExecutionMode::Auto,
    ] {
        assert_eq!(decide(IssueKind::SecurityFlag, mode).resolve(), Action::Abort);
    }
}
