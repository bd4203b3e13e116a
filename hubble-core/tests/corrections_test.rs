//! Correction estimator against the 210-row fixture grid.
//!
//! Expected values were computed independently from the same CSV.

use hubble_core::corrections::{AnchorRule, ScatterSource, SpanMethod};
use hubble_core::{
    concordance, estimate_baseline, estimate_for_anchors, Anchor, AnchorSet, CorrectionScope,
    GridRow, GridTable, Measurement, PenaltyParams, ScenarioEstimate,
};

fn fixture() -> GridTable {
    let path = concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures/grid_210.csv");
    let mut reader = csv::Reader::from_path(path).unwrap();
    let rows = reader
        .records()
        .map(|rec| {
            let rec = rec.unwrap();
            GridRow::new(rec[0].parse().unwrap(), &rec[1], rec.get(2)).unwrap()
        })
        .collect();
    GridTable::new(rows).unwrap()
}

fn planck() -> Measurement {
    Measurement {
        mean: 67.27,
        sigma: 0.60,
    }
}

fn local(table: &GridTable, keep: AnchorSet) -> hubble_core::CorrectionEstimate {
    match estimate_for_anchors(&table.view(), keep, CorrectionScope::ScenarioLocal).unwrap() {
        ScenarioEstimate::Estimated(est) => est,
        ScenarioEstimate::Degenerate => panic!("fixture scenario should not be degenerate"),
    }
}

#[test]
fn fixture_has_expected_shape() {
    let table = fixture();
    assert_eq!(table.len(), 210);
}

#[test]
fn baseline_corrections_on_fixture() {
    let table = fixture();
    let est = estimate_baseline(&table.view()).unwrap();
    assert_eq!(est.rows, 210);
    assert!((est.anchor_correction - (-1.567_95)).abs() < 1e-9);
    assert!((est.relation_correction - (-0.207_614_285_714)).abs() < 1e-9);
    assert!((est.scatter - 1.908_369_371_535).abs() < 1e-9);
    assert!((est.uncorrected_mean - 73.4307).abs() < 1e-9);
    assert!((est.raw_std - 2.185_777_065_134_7).abs() < 1e-9);
    assert_eq!(est.span_method, SpanMethod::VariantMeans { variants: 3 });
    assert_eq!(est.scatter_source, ScatterSource::AnchorDemeaned);
}

#[test]
fn scenario_local_matches_baseline_when_nothing_dropped() {
    let table = fixture();
    let base = estimate_baseline(&table.view()).unwrap();
    let all = local(&table, AnchorSet::ALL);
    assert_eq!(base, all);
}

#[test]
fn drop_primary_scenario() {
    let table = fixture();
    let est = local(&table, AnchorSet::ALL.without(Anchor::MilkyWay));
    assert_eq!(est.rows, 84);
    assert_eq!(est.anchor_correction, 0.0);
    assert_eq!(est.anchor_rule, AnchorRule::NoPrimary);
    assert!((est.relation_correction - (-0.152_018)).abs() < 1e-5);
    assert!((est.scatter - 1.910_016).abs() < 1e-5);
}

#[test]
fn drop_external_scenarios() {
    let table = fixture();

    let drop_lmc = local(&table, AnchorSet::ALL.without(Anchor::Lmc));
    assert_eq!(drop_lmc.rows, 84);
    assert!((drop_lmc.anchor_correction - (-1.699_533)).abs() < 1e-5);
    assert_eq!(
        drop_lmc.anchor_rule,
        AnchorRule::PrimaryVsRemaining {
            remaining: Anchor::Ngc4258
        }
    );

    let drop_n = local(&table, AnchorSet::ALL.without(Anchor::Ngc4258));
    assert_eq!(drop_n.rows, 84);
    assert!((drop_n.anchor_correction - (-1.436_367)).abs() < 1e-5);
    assert!((drop_n.relation_correction - (-0.213_482)).abs() < 1e-5);
}

#[test]
fn scenario_local_tensions_on_fixture() {
    let table = fixture();
    let cases = [
        (AnchorSet::ALL, 1.001_250),
        (AnchorSet::ALL.without(Anchor::MilkyWay), 1.127_648),
        (AnchorSet::ALL.without(Anchor::Lmc), 1.035_248),
        (AnchorSet::ALL.without(Anchor::Ngc4258), 1.163_576),
    ];
    for (keep, expected) in cases {
        let est = local(&table, keep);
        let r = concordance(
            planck(),
            est.corrected_candidate(),
            est.uncorrected_mean,
            PenaltyParams::NOMINAL,
        );
        assert!(
            (r.tension_reference - expected).abs() < 1e-5,
            "keep {:?}: z {} vs {}",
            keep,
            r.tension_reference,
            expected
        );
    }
}

#[test]
fn global_scope_tensions_on_fixture() {
    let table = fixture();
    let scope = CorrectionScope::Global {
        relation_correction: -0.22,
    };
    let cases = [
        (AnchorSet::ALL, 0.857_797),
        (AnchorSet::ALL.without(Anchor::MilkyWay), 1.107_244),
        (AnchorSet::ALL.without(Anchor::Lmc), 0.817_226),
        (AnchorSet::ALL.without(Anchor::Ngc4258), 0.981_355),
    ];
    for (keep, expected) in cases {
        let ScenarioEstimate::Estimated(est) =
            estimate_for_anchors(&table.view(), keep, scope).unwrap()
        else {
            panic!("fixture scenario should not be degenerate");
        };
        let r = concordance(
            planck(),
            est.corrected_candidate(),
            est.uncorrected_mean,
            PenaltyParams::NOMINAL,
        );
        assert!((r.tension_reference - expected).abs() < 1e-5);
    }
}
