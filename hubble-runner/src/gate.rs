//! Acceptance gates — pre-registered thresholds with a pass/fail verdict.
//!
//! A failing gate is a finding about the data, not a software error, so gates
//! are plain values carried inside result records.

use hubble_core::stats::standard_normal_quantile;
use serde::{Deserialize, Serialize};

/// Comparison tolerance for boundary cases.
pub const DEFAULT_TOLERANCE: f64 = 1e-9;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum GateRule {
    /// observed ≤ threshold (+ tolerance)
    AtMost { threshold: f64 },
    /// low ≤ observed ≤ high, closed interval
    Within { low: f64, high: f64 },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Gate {
    pub name: String,
    /// What `observed` is, e.g. "max scenario tension".
    pub statistic: String,
    pub observed: f64,
    pub rule: GateRule,
    pub tolerance: f64,
    pub passed: bool,
}

impl Gate {
    pub fn at_most(name: &str, statistic: &str, observed: f64, threshold: f64, tolerance: f64) -> Self {
        let rule = GateRule::AtMost { threshold };
        Self::evaluate(name, statistic, observed, rule, tolerance)
    }

    pub fn within(name: &str, statistic: &str, observed: f64, low: f64, high: f64) -> Self {
        let rule = GateRule::Within { low, high };
        Self::evaluate(name, statistic, observed, rule, 0.0)
    }

    fn evaluate(name: &str, statistic: &str, observed: f64, rule: GateRule, tolerance: f64) -> Self {
        // NaN never passes.
        let passed = match rule {
            GateRule::AtMost { threshold } => observed <= threshold + tolerance,
            GateRule::Within { low, high } => observed >= low - tolerance && observed <= high + tolerance,
        };
        Self {
            name: name.to_string(),
            statistic: statistic.to_string(),
            observed,
            rule,
            tolerance,
            passed,
        }
    }

    /// One-line human summary, e.g. `PASS  gate_a  max tension 1.1636 <= 1.5000`.
    pub fn summary(&self) -> String {
        let verdict = if self.passed { "PASS" } else { "FAIL" };
        match self.rule {
            GateRule::AtMost { threshold } => format!(
                "{verdict}  {}  {} {:.4} <= {:.4}",
                self.name, self.statistic, self.observed, threshold
            ),
            GateRule::Within { low, high } => format!(
                "{verdict}  {}  {} {:.4} in [{:.4}, {:.4}]",
                self.name, self.statistic, self.observed, low, high
            ),
        }
    }
}

// ─── Šidák ───────────────────────────────────────────────────────────

/// Per-comparison significance level keeping the family-wise rate at `alpha`
/// over `k` independent comparisons: `1 − (1 − α)^(1/k)`.
pub fn sidak_alpha(alpha: f64, k: usize) -> f64 {
    if k == 0 {
        return f64::NAN;
    }
    1.0 - (1.0 - alpha).powf(1.0 / k as f64)
}

/// One-sided z threshold for the Šidák-corrected level: `Φ⁻¹(1 − sidak_alpha)`.
///
/// NaN when `k == 0`.
pub fn sidak_threshold(alpha: f64, k: usize) -> f64 {
    standard_normal_quantile(1.0 - sidak_alpha(alpha, k))
}
