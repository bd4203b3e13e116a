//! Correction estimator — anchor and P-L bias corrections from the raw grid.
//!
//! Two additive corrections are derived for the candidate mean:
//!
//! - **anchor**: `−0.5 · (μ_M − μ_ext)`, half the offset between the primary
//!   (Milky Way) anchor population and the external anchors. In baseline mode
//!   `μ_ext = 0.5 · (μ_L + μ_N)`.
//! - **relation**: `−0.5 · span`, where span is the max − min of the per-variant
//!   means of the anchor-demeaned values, or the q84 − q16 spread of those
//!   values when fewer than two variants exist. A zero (or non-finite) span
//!   is recomputed the same way from the raw values and flagged as a fallback.
//!
//! The corrected scatter is the sample standard deviation of the
//! anchor-demeaned values, falling back to the raw standard deviation when
//! the demeaned series is degenerate.
//!
//! Scenario-local mode restricts every statistic to the rows retained by a
//! scenario's anchor set. The anchor rule then depends on which anchors remain:
//!
//! | retained      | anchor correction              |
//! |---------------|--------------------------------|
//! | M, L, N       | `−0.5 · (μ_M − ½(μ_L + μ_N))`  |
//! | M, N          | `−0.5 · (μ_M − μ_N)`           |
//! | M, L          | `−0.5 · (μ_M − μ_L)`           |
//! | no M          | `0` (no primary/external split)|
//!
//! A single-anchor population missing from the retained rows makes the anchor
//! correction unavailable; it is then zero and the rule says so.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::grid::{Anchor, AnchorSet, GridRow};
use crate::measurement::Measurement;
use crate::stats::{mean, percentile_sorted, sample_std, sorted_copy};

// ─── Types ───────────────────────────────────────────────────────────

/// How the anchor correction was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "rule", rename_all = "snake_case")]
pub enum AnchorRule {
    /// Primary against the mean of both external anchors.
    PrimaryVsExternalMean,
    /// Primary against the single remaining external anchor.
    PrimaryVsRemaining { remaining: Anchor },
    /// The primary anchor is excluded; correction defined as zero.
    NoPrimary,
    /// A required single-anchor population had no rows; correction set to zero.
    Unavailable { missing: Anchor },
}

/// How the relation span was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "snake_case")]
pub enum SpanMethod {
    /// Max − min of per-variant means of anchor-demeaned values.
    VariantMeans { variants: usize },
    /// q84 − q16 of anchor-demeaned values (fewer than two variants).
    QuantileSpread,
    /// The demeaned span was zero or non-finite; the same statistic was taken
    /// over the raw values (variant means when `variants >= 2`, else q84 − q16).
    RawFallback { variants: usize },
    /// Relation correction supplied from outside (global strategy).
    Fixed,
}

/// Where the candidate scatter came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScatterSource {
    /// Sample std of anchor-demeaned values.
    AnchorDemeaned,
    /// Demeaned series was degenerate; raw sample std used instead.
    RawFallback,
    /// Raw sample std by construction (global strategy).
    Raw,
}

/// Which correction terms a scenario re-derives from its own rows.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "scope", rename_all = "snake_case")]
pub enum CorrectionScope {
    /// Anchor, relation and scatter all come from the retained rows only.
    ScenarioLocal,
    /// Anchor correction from retained rows; the relation correction is the
    /// supplied global value and the scatter is the raw spread of retained rows.
    Global { relation_correction: f64 },
}

/// Corrections and candidate statistics derived from a set of grid rows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorrectionEstimate {
    pub rows: usize,
    pub anchor_correction: f64,
    pub anchor_rule: AnchorRule,
    pub relation_correction: f64,
    pub span: f64,
    pub span_method: SpanMethod,
    pub scatter: f64,
    pub scatter_source: ScatterSource,
    /// Mean of the raw values.
    pub uncorrected_mean: f64,
    /// Sample std of the raw values.
    pub raw_std: f64,
}

impl CorrectionEstimate {
    pub fn total_correction(&self) -> f64 {
        self.anchor_correction + self.relation_correction
    }

    pub fn corrected_mean(&self) -> f64 {
        self.uncorrected_mean + self.anchor_correction + self.relation_correction
    }

    /// Corrected candidate measurement: corrected mean with the scatter as sigma.
    pub fn corrected_candidate(&self) -> Measurement {
        Measurement {
            mean: self.corrected_mean(),
            sigma: self.scatter,
        }
    }
}

/// Outcome of a scenario-local estimate.
#[derive(Debug, Clone, PartialEq)]
pub enum ScenarioEstimate {
    Estimated(CorrectionEstimate),
    /// No rows survived the anchor filter.
    Degenerate,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum CorrectionError {
    #[error("no rows to estimate corrections from")]
    NoRows,
    #[error("baseline mode requires rows for anchor {anchor} (group code '{}')", anchor.code())]
    MissingAnchorGroup { anchor: Anchor },
    #[error("scatter is undefined for {rows} row(s): both demeaned and raw spreads are degenerate")]
    DegenerateScatter { rows: usize },
}

// ─── Estimators ──────────────────────────────────────────────────────

/// Baseline-mode estimate over every supplied row.
///
/// All three single-anchor populations must be present.
pub fn estimate_baseline(rows: &[&GridRow]) -> Result<CorrectionEstimate, CorrectionError> {
    if rows.is_empty() {
        return Err(CorrectionError::NoRows);
    }
    let means = single_anchor_means(rows);
    for anchor in Anchor::ALL {
        if !means.contains_key(&anchor) {
            return Err(CorrectionError::MissingAnchorGroup { anchor });
        }
    }
    let (anchor_correction, anchor_rule) = anchor_correction(&means, AnchorSet::ALL);
    estimate_with(rows, anchor_correction, anchor_rule, CorrectionScope::ScenarioLocal)
}

/// Estimate restricted to rows whose anchors all lie in `keep`.
pub fn estimate_for_anchors(
    rows: &[&GridRow],
    keep: AnchorSet,
    scope: CorrectionScope,
) -> Result<ScenarioEstimate, CorrectionError> {
    let retained: Vec<&GridRow> = rows
        .iter()
        .copied()
        .filter(|r| r.group.anchors().is_subset_of(keep))
        .collect();
    if retained.is_empty() {
        return Ok(ScenarioEstimate::Degenerate);
    }

    let means = single_anchor_means(&retained);
    let (anchor_correction, anchor_rule) = anchor_correction(&means, keep);
    estimate_with(&retained, anchor_correction, anchor_rule, scope).map(ScenarioEstimate::Estimated)
}

fn estimate_with(
    rows: &[&GridRow],
    anchor_correction: f64,
    anchor_rule: AnchorRule,
    scope: CorrectionScope,
) -> Result<CorrectionEstimate, CorrectionError> {
    let values: Vec<f64> = rows.iter().map(|r| r.value).collect();
    let uncorrected_mean = mean(&values);
    let raw_std = sample_std(&values);

    let (relation_correction, span, span_method, scatter, scatter_source) = match scope {
        CorrectionScope::ScenarioLocal => {
            let demeaned = anchor_demean(rows);
            let (span, span_method) = relation_span(rows, &demeaned);
            let (scatter, scatter_source) = corrected_scatter(&demeaned, raw_std);
            // `+ 0.0` keeps a zero span from serialising as -0.0.
            (-0.5 * span + 0.0, span, span_method, scatter, scatter_source)
        }
        CorrectionScope::Global {
            relation_correction,
        } => (
            relation_correction,
            -2.0 * relation_correction,
            SpanMethod::Fixed,
            raw_std,
            ScatterSource::Raw,
        ),
    };

    if !scatter.is_finite() || scatter <= 0.0 {
        return Err(CorrectionError::DegenerateScatter { rows: rows.len() });
    }

    Ok(CorrectionEstimate {
        rows: rows.len(),
        anchor_correction,
        anchor_rule,
        relation_correction,
        span,
        span_method,
        scatter,
        scatter_source,
        uncorrected_mean,
        raw_std,
    })
}

// ─── Building blocks ─────────────────────────────────────────────────

/// Mean value of each single-anchor population present in `rows`.
pub fn single_anchor_means(rows: &[&GridRow]) -> BTreeMap<Anchor, f64> {
    let mut acc: BTreeMap<Anchor, (f64, usize)> = BTreeMap::new();
    for r in rows {
        if let Some(anchor) = r.group.single_anchor() {
            let e = acc.entry(anchor).or_insert((0.0, 0));
            e.0 += r.value;
            e.1 += 1;
        }
    }
    acc.into_iter()
        .map(|(a, (sum, n))| (a, sum / n as f64))
        .collect()
}

/// Anchor correction and the rule that produced it, given the anchors kept.
pub fn anchor_correction(means: &BTreeMap<Anchor, f64>, keep: AnchorSet) -> (f64, AnchorRule) {
    if !keep.contains(Anchor::MilkyWay) {
        return (0.0, AnchorRule::NoPrimary);
    }
    let need = |a: Anchor| means.get(&a).copied().ok_or(a);

    let result = match (keep.contains(Anchor::Lmc), keep.contains(Anchor::Ngc4258)) {
        (true, true) => need(Anchor::MilkyWay).and_then(|m| {
            let l = need(Anchor::Lmc)?;
            let n = need(Anchor::Ngc4258)?;
            Ok((-0.5 * (m - 0.5 * (l + n)), AnchorRule::PrimaryVsExternalMean))
        }),
        (false, true) => remaining_split(need, Anchor::Ngc4258),
        (true, false) => remaining_split(need, Anchor::Lmc),
        // Only the primary is left: nothing external to compare against.
        (false, false) => Ok((0.0, AnchorRule::NoPrimary)),
    };

    result.unwrap_or_else(|missing| (0.0, AnchorRule::Unavailable { missing }))
}

fn remaining_split(
    need: impl Fn(Anchor) -> Result<f64, Anchor>,
    remaining: Anchor,
) -> Result<(f64, AnchorRule), Anchor> {
    let m = need(Anchor::MilkyWay)?;
    let other = need(remaining)?;
    Ok((-0.5 * (m - other), AnchorRule::PrimaryVsRemaining { remaining }))
}

/// Each value minus the mean of its own group code.
pub fn anchor_demean(rows: &[&GridRow]) -> Vec<f64> {
    let mut acc: HashMap<&str, (f64, usize)> = HashMap::new();
    for r in rows {
        let e = acc.entry(r.group.label()).or_insert((0.0, 0));
        e.0 += r.value;
        e.1 += 1;
    }
    rows.iter()
        .map(|r| {
            let (sum, n) = acc[r.group.label()];
            r.value - sum / n as f64
        })
        .collect()
}

/// Relation span over anchor-demeaned values, by variant means or quantile spread.
///
/// Falls back to the raw values when the demeaned span is zero or non-finite.
pub fn relation_span(rows: &[&GridRow], demeaned: &[f64]) -> (f64, SpanMethod) {
    let (span, variants) = span_over(rows, demeaned);
    if span.is_finite() && span > 0.0 {
        let method = if variants >= 2 {
            SpanMethod::VariantMeans { variants }
        } else {
            SpanMethod::QuantileSpread
        };
        return (span, method);
    }

    let raw: Vec<f64> = rows.iter().map(|r| r.value).collect();
    let (span, variants) = span_over(rows, &raw);
    (span, SpanMethod::RawFallback { variants })
}

/// Span of `values` and the number of relation variants seen.
fn span_over(rows: &[&GridRow], values: &[f64]) -> (f64, usize) {
    let mut by_variant: BTreeMap<&str, (f64, usize)> = BTreeMap::new();
    for (r, &v) in rows.iter().zip(values) {
        if let Some(variant) = r.relation.as_deref() {
            let e = by_variant.entry(variant).or_insert((0.0, 0));
            e.0 += v;
            e.1 += 1;
        }
    }

    if by_variant.len() >= 2 {
        let means = by_variant.values().map(|&(sum, n)| sum / n as f64);
        let (lo, hi) = means.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), m| {
            (lo.min(m), hi.max(m))
        });
        return (hi - lo, by_variant.len());
    }

    let sorted = sorted_copy(values);
    let span = percentile_sorted(&sorted, 84.0) - percentile_sorted(&sorted, 16.0);
    (span, by_variant.len())
}

/// Scatter of demeaned values, or the raw spread when that is degenerate.
pub fn corrected_scatter(demeaned: &[f64], raw_std: f64) -> (f64, ScatterSource) {
    let sigma = sample_std(demeaned);
    if sigma.is_finite() && sigma > 0.0 {
        (sigma, ScatterSource::AnchorDemeaned)
    } else {
        (raw_std, ScatterSource::RawFallback)
    }
}
