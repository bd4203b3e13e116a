//! Leave-one-group-out validator with absolute and Šidák gates.
//!
//! Each scenario drops one calibration anchor, re-estimates the corrections
//! from the rows that remain, corrects the candidate and merges it with the
//! reference. The largest reference tension across evaluated scenarios is then
//! gated twice:
//!
//! - **Gate A**: `max_tension ≤ absolute_threshold` (1.5σ)
//! - **Gate B**: `max_tension ≤ Φ⁻¹((1 − α)^(1/K))`, K = evaluated scenarios
//!
//! Two correction strategies share this one driver. `ScenarioLocal` derives
//! anchor, relation and scatter terms from the retained rows only. `Global`
//! keeps the relation correction at its baseline value and uses the raw scatter
//! of the retained rows, reproducing the earlier diagnostic.
//!
//! A scenario whose anchor filter leaves no rows is recorded as degenerate with
//! zero corrections and no tension; it is excluded from the maximum and from K.

use hubble_core::corrections::{AnchorRule, ScatterSource, SpanMethod};
use hubble_core::{
    concordance, estimate_for_anchors, Anchor, AnchorSet, ConcordanceResult, CorrectionEstimate,
    CorrectionScope, GridTable, Measurement, PenaltyParams, ScenarioEstimate,
};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::gate::{sidak_alpha, sidak_threshold, Gate};

// ─── Configuration ───────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogoStrategy {
    #[default]
    ScenarioLocal,
    Global,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScenarioSetKind {
    /// baseline + one drop per anchor.
    #[default]
    Standard,
    /// Standard plus `external_only`, as in the earlier global diagnostic.
    Historical,
}

/// A named anchor selection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scenario {
    pub name: String,
    pub excluded: Option<Anchor>,
    pub keep: AnchorSet,
}

impl Scenario {
    pub fn baseline() -> Self {
        Self {
            name: "baseline".to_string(),
            excluded: None,
            keep: AnchorSet::ALL,
        }
    }

    pub fn without(anchor: Anchor) -> Self {
        Self {
            name: format!("drop_{}", anchor.name()),
            excluded: Some(anchor),
            keep: AnchorSet::ALL.without(anchor),
        }
    }
}

impl ScenarioSetKind {
    pub fn scenarios(self) -> Vec<Scenario> {
        let mut set = vec![Scenario::baseline()];
        set.extend(Anchor::ALL.into_iter().map(Scenario::without));
        if self == ScenarioSetKind::Historical {
            set.push(Scenario {
                name: "external_only".to_string(),
                excluded: Some(Anchor::MilkyWay),
                keep: AnchorSet::ALL.without(Anchor::MilkyWay),
            });
        }
        set
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogoConfig {
    pub strategy: LogoStrategy,
    pub scenarios: ScenarioSetKind,
    /// Gate A threshold, in σ.
    pub absolute_threshold: f64,
    /// Family-wise significance level for Gate B.
    pub alpha: f64,
    pub tolerance: f64,
    /// Relation correction held fixed under the global strategy.
    pub global_relation_correction: f64,
}

impl Default for LogoConfig {
    fn default() -> Self {
        Self {
            strategy: LogoStrategy::ScenarioLocal,
            scenarios: ScenarioSetKind::Standard,
            absolute_threshold: 1.5,
            alpha: 0.05,
            tolerance: crate::gate::DEFAULT_TOLERANCE,
            global_relation_correction: -0.22,
        }
    }
}

// ─── Result types ────────────────────────────────────────────────────

/// Outcome of a single scenario.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioResult {
    pub name: String,
    pub excluded: Option<String>,
    pub strategy: LogoStrategy,
    /// No rows survived the anchor filter; corrections are zero and no tension exists.
    pub degenerate: bool,
    pub rows: usize,
    pub anchor_correction: f64,
    pub anchor_rule: Option<AnchorRule>,
    pub relation_correction: f64,
    pub span_method: Option<SpanMethod>,
    pub scatter: Option<f64>,
    pub scatter_source: Option<ScatterSource>,
    pub uncorrected_mean: Option<f64>,
    pub corrected_mean: Option<f64>,
    pub merged_mean: Option<f64>,
    pub merged_sigma: Option<f64>,
    pub tension_reference: Option<f64>,
    pub tension_corrected: Option<f64>,
    pub concordance: Option<ConcordanceResult>,
}

impl ScenarioResult {
    fn degenerate(scenario: &Scenario, strategy: LogoStrategy) -> Self {
        Self {
            name: scenario.name.clone(),
            excluded: scenario.excluded.map(|a| a.name().to_string()),
            strategy,
            degenerate: true,
            rows: 0,
            anchor_correction: 0.0,
            anchor_rule: None,
            relation_correction: 0.0,
            span_method: None,
            scatter: None,
            scatter_source: None,
            uncorrected_mean: None,
            corrected_mean: None,
            merged_mean: None,
            merged_sigma: None,
            tension_reference: None,
            tension_corrected: None,
            concordance: None,
        }
    }

    fn evaluated(
        scenario: &Scenario,
        strategy: LogoStrategy,
        est: &CorrectionEstimate,
        conc: ConcordanceResult,
    ) -> Self {
        Self {
            name: scenario.name.clone(),
            excluded: scenario.excluded.map(|a| a.name().to_string()),
            strategy,
            degenerate: false,
            rows: est.rows,
            anchor_correction: est.anchor_correction,
            anchor_rule: Some(est.anchor_rule),
            relation_correction: est.relation_correction,
            span_method: Some(est.span_method),
            scatter: Some(est.scatter),
            scatter_source: Some(est.scatter_source),
            uncorrected_mean: Some(est.uncorrected_mean),
            corrected_mean: Some(est.corrected_mean()),
            merged_mean: Some(conc.merged_mean),
            merged_sigma: Some(conc.merged_sigma),
            tension_reference: Some(conc.tension_reference),
            tension_corrected: Some(conc.tension_corrected),
            concordance: Some(conc),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogoResult {
    pub strategy: LogoStrategy,
    pub scenario_set: ScenarioSetKind,
    pub scenarios: Vec<ScenarioResult>,
    /// K: scenarios that produced a tension.
    pub evaluated: usize,
    pub degenerate: usize,
    pub max_tension: f64,
    pub worst_scenario: String,
    pub sidak_alpha: f64,
    pub sidak_threshold: f64,
    pub gate_absolute: Gate,
    pub gate_family_wise: Gate,
    pub passed: bool,
}

// ─── Driver ──────────────────────────────────────────────────────────

/// Evaluate one scenario.
pub fn evaluate_scenario(
    table: &GridTable,
    scenario: &Scenario,
    reference: Measurement,
    params: PenaltyParams,
    config: &LogoConfig,
) -> Result<ScenarioResult, ValidationError> {
    let scope = match config.strategy {
        LogoStrategy::ScenarioLocal => CorrectionScope::ScenarioLocal,
        LogoStrategy::Global => CorrectionScope::Global {
            relation_correction: config.global_relation_correction,
        },
    };

    let estimate = estimate_for_anchors(&table.view(), scenario.keep, scope).map_err(|source| {
        ValidationError::Scenario {
            scenario: scenario.name.clone(),
            source,
        }
    })?;

    match estimate {
        ScenarioEstimate::Degenerate => Ok(ScenarioResult::degenerate(scenario, config.strategy)),
        ScenarioEstimate::Estimated(est) => {
            let conc = concordance(reference, est.corrected_candidate(), est.uncorrected_mean, params);
            Ok(ScenarioResult::evaluated(scenario, config.strategy, &est, conc))
        }
    }
}

/// Run every scenario of the configured set and apply both gates.
pub fn run_logo(
    table: &GridTable,
    reference: Measurement,
    params: PenaltyParams,
    config: &LogoConfig,
) -> Result<LogoResult, ValidationError> {
    reference.validate()?;

    let scenarios = config
        .scenarios
        .scenarios()
        .iter()
        .map(|s| evaluate_scenario(table, s, reference, params, config))
        .collect::<Result<Vec<_>, _>>()?;

    let worst = scenarios
        .iter()
        .filter_map(|s| s.tension_reference.map(|z| (s, z)))
        .max_by(|a, b| a.1.total_cmp(&b.1));
    let Some((worst, max_tension)) = worst else {
        return Err(ValidationError::NoScenarios);
    };
    let worst_scenario = worst.name.clone();

    let evaluated = scenarios.iter().filter(|s| !s.degenerate).count();
    let degenerate = scenarios.len() - evaluated;

    let threshold = sidak_threshold(config.alpha, evaluated);
    let gate_absolute = Gate::at_most(
        "logo_absolute",
        "max scenario tension",
        max_tension,
        config.absolute_threshold,
        config.tolerance,
    );
    let gate_family_wise = Gate::at_most(
        "logo_sidak",
        "max scenario tension",
        max_tension,
        threshold,
        config.tolerance,
    );
    let passed = gate_absolute.passed && gate_family_wise.passed;

    Ok(LogoResult {
        strategy: config.strategy,
        scenario_set: config.scenarios,
        scenarios,
        evaluated,
        degenerate,
        max_tension,
        worst_scenario,
        sidak_alpha: sidak_alpha(config.alpha, evaluated),
        sidak_threshold: threshold,
        gate_absolute,
        gate_family_wise,
        passed,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use hubble_core::GridRow;

    fn planck() -> Measurement {
        Measurement {
            mean: 67.27,
            sigma: 0.60,
        }
    }

    fn small_table() -> GridTable {
        let mut rows = Vec::new();
        for (code, base) in [("M", 75.0), ("L", 72.0), ("N", 72.5), ("NL", 72.2), ("All", 73.0)] {
            for (k, pl) in ["A", "B", "C"].iter().enumerate() {
                let v = base + 0.4 * (k as f64 - 1.0) + 0.1 * (code.len() as f64);
                rows.push(GridRow::new(v, code, Some(pl)).unwrap());
            }
        }
        GridTable::new(rows).unwrap()
    }

    #[test]
    fn standard_set_has_four_scenarios() {
        let names: Vec<String> = ScenarioSetKind::Standard
            .scenarios()
            .into_iter()
            .map(|s| s.name)
            .collect();
        assert_eq!(names, ["baseline", "drop_MW", "drop_LMC", "drop_NGC4258"]);
        assert_eq!(ScenarioSetKind::Historical.scenarios().len(), 5);
    }

    #[test]
    fn external_only_matches_drop_primary() {
        let set = ScenarioSetKind::Historical.scenarios();
        assert_eq!(set[1].keep, set[4].keep);
        assert_eq!(set[4].name, "external_only");
    }

    #[test]
    fn k_counts_evaluated_scenarios() {
        let r = run_logo(&small_table(), planck(), PenaltyParams::NOMINAL, &LogoConfig::default())
            .unwrap();
        assert_eq!(r.evaluated, 4);
        assert_eq!(r.degenerate, 0);
        assert!((r.sidak_threshold - 2.2340).abs() < 5e-5);
        assert!(r.max_tension >= 0.0);
        let max = r
            .scenarios
            .iter()
            .filter_map(|s| s.tension_reference)
            .fold(f64::NEG_INFINITY, f64::max);
        assert_eq!(r.max_tension, max);
    }

    #[test]
    fn drop_primary_has_zero_anchor_correction() {
        let r = run_logo(&small_table(), planck(), PenaltyParams::NOMINAL, &LogoConfig::default())
            .unwrap();
        let drop_mw = r.scenarios.iter().find(|s| s.name == "drop_MW").unwrap();
        assert_eq!(drop_mw.anchor_correction, 0.0);
        assert_eq!(drop_mw.anchor_rule, Some(AnchorRule::NoPrimary));
        assert_eq!(drop_mw.strategy, LogoStrategy::ScenarioLocal);
    }

    #[test]
    fn degenerate_scenario_is_flagged_and_excluded() {
        // Only combined codes: dropping any anchor leaves nothing.
        let rows = vec![
            GridRow::new(73.0, "All", Some("A")).unwrap(),
            GridRow::new(72.0, "All", Some("B")).unwrap(),
            GridRow::new(72.6, "NML", Some("A")).unwrap(),
        ];
        let table = GridTable::new(rows).unwrap();
        let r = run_logo(&table, planck(), PenaltyParams::NOMINAL, &LogoConfig::default()).unwrap();
        assert_eq!(r.evaluated, 1);
        assert_eq!(r.degenerate, 3);
        let d = r.scenarios.iter().find(|s| s.name == "drop_LMC").unwrap();
        assert!(d.degenerate);
        assert_eq!(d.anchor_correction, 0.0);
        assert_eq!(d.relation_correction, 0.0);
        assert!(d.tension_reference.is_none());
        // K = 1 → plain one-sided 95% threshold.
        assert!((r.sidak_threshold - 1.6449).abs() < 1e-4);
        assert_eq!(r.worst_scenario, "baseline");
    }

    #[test]
    fn global_strategy_fixes_relation() {
        let config = LogoConfig {
            strategy: LogoStrategy::Global,
            ..LogoConfig::default()
        };
        let r = run_logo(&small_table(), planck(), PenaltyParams::NOMINAL, &config).unwrap();
        for s in &r.scenarios {
            assert_eq!(s.relation_correction, -0.22);
            assert_eq!(s.span_method, Some(SpanMethod::Fixed));
            assert_eq!(s.strategy, LogoStrategy::Global);
        }
    }

    #[test]
    fn tight_absolute_threshold_fails_gate_a_only() {
        let config = LogoConfig {
            absolute_threshold: 0.0,
            ..LogoConfig::default()
        };
        let r = run_logo(&small_table(), planck(), PenaltyParams::NOMINAL, &config).unwrap();
        assert!(!r.gate_absolute.passed);
        assert!(!r.passed);
    }

    #[test]
    fn invalid_reference_is_rejected() {
        let bad = Measurement {
            mean: 67.27,
            sigma: 0.0,
        };
        assert!(matches!(
            run_logo(&small_table(), bad, PenaltyParams::NOMINAL, &LogoConfig::default()),
            Err(ValidationError::Measurement(_))
        ));
    }
}
