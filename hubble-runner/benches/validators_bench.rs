//! Criterion benchmarks for the validator hot loops.
//!
//! Run with: `cargo bench -p hubble-runner`
//!
//! - Single concordance evaluation
//! - Baseline correction estimate on the fixture grid
//! - Bootstrap at several iteration counts, sequential and parallel
//! - Full 17×17 grid scan

use std::path::PathBuf;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use hubble_core::{concordance, estimate_baseline, GridTable, Measurement, PenaltyParams};
use hubble_runner::bootstrap::{run_bootstrap, BootstrapConfig};
use hubble_runner::config::Baseline;
use hubble_runner::data_loader::load_grid_csv;
use hubble_runner::grid_scan::{run_grid_scan, GridScanConfig};

fn fixture() -> GridTable {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .parent()
        .map(|p| p.join("hubble-core/tests/fixtures/grid_210.csv"))
        .unwrap_or_default();
    load_grid_csv(&path).unwrap()
}

fn bench_concordance(c: &mut Criterion) {
    let reference = Measurement { mean: 67.27, sigma: 0.60 };
    let candidate = Measurement { mean: 71.45, sigma: 1.89 };
    c.bench_function("concordance", |b| {
        b.iter(|| {
            concordance(
                black_box(reference),
                black_box(candidate),
                73.59,
                PenaltyParams::NOMINAL,
            )
        });
    });
}

fn bench_estimate_baseline(c: &mut Criterion) {
    let table = fixture();
    c.bench_function("estimate_baseline_210", |b| {
        b.iter(|| estimate_baseline(black_box(&table.view())));
    });
}

fn bench_bootstrap(c: &mut Criterion) {
    let table = fixture();
    let baseline = Baseline::default();
    let mut group = c.benchmark_group("bootstrap");
    group.sample_size(10);

    for iterations in [100, 1_000].iter() {
        for parallel in [false, true] {
            let config = BootstrapConfig {
                iterations: *iterations,
                parallel,
                ..BootstrapConfig::default()
            };
            let label = if parallel { "parallel" } else { "sequential" };
            group.bench_with_input(BenchmarkId::new(label, iterations), iterations, |b, _| {
                b.iter(|| run_bootstrap(&table, &baseline, PenaltyParams::NOMINAL, &config, None));
            });
        }
    }
    group.finish();
}

fn bench_grid_scan(c: &mut Criterion) {
    let baseline = Baseline::default();
    let config = GridScanConfig::default();
    c.bench_function("grid_scan_17x17", |b| {
        b.iter(|| run_grid_scan(black_box(&baseline), &config));
    });
}

criterion_group!(
    benches,
    bench_concordance,
    bench_estimate_baseline,
    bench_bootstrap,
    bench_grid_scan,
);
criterion_main!(benches);
