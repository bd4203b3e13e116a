//! Hubble CLI — concordance, validator and full-pipeline commands.
//!
//! Commands:
//! - `concordance` — single merge of the baseline measurements
//! - `logo` — leave-one-group-out validation on a grid CSV
//! - `bootstrap` — bootstrap resampling of a grid CSV
//! - `scan` — penalty-parameter grid scan
//! - `inject` — synthetic injection/recovery
//! - `run` — everything above, with artifacts written to an output directory
//! - `config` — print the effective configuration as TOML
//!
//! Issues met while loading data are routed through the acceptability policy
//! selected by `--mode`; every decision is appended to the decision log.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use hubble_core::GridTable;
use hubble_runner::bootstrap::run_bootstrap;
use hubble_runner::data_loader::{load_grid_csv, LoadError};
use hubble_runner::export::{append_decisions, export_json, save_artifacts};
use hubble_runner::grid_scan::run_grid_scan;
use hubble_runner::injection::run_injection;
use hubble_runner::logo::{run_logo, LogoResult, LogoStrategy, ScenarioSetKind};
use hubble_runner::pipeline::{baseline_concordance, run_pipeline, RunManifest};
use hubble_runner::{
    profiling, Action, DecisionLog, ExecutionMode, Gate, IssueKind, PipelineConfig, StdoutProgress,
    ValidationProgress,
};

#[derive(Parser)]
#[command(
    name = "hubble",
    about = "Hubble CLI — epistemic-penalty concordance and adversarial validation"
)]
struct Cli {
    /// Pipeline configuration (TOML). Defaults to the published baseline.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Acceptability policy: strict, audit, dry-run, auto.
    #[arg(long, global = true, default_value = "audit")]
    mode: ExecutionMode,

    /// Append policy decisions to this JSONL file.
    #[arg(long, global = true)]
    decision_log: Option<PathBuf>,

    /// Print per-iteration progress for long validators.
    #[arg(long, global = true, default_value_t = false)]
    progress: bool,

    /// Write the result as pretty JSON to stdout instead of a summary.
    #[arg(long, global = true, default_value_t = false)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Merge the baseline reference and corrected candidate.
    Concordance {
        /// Override the distance multiplier d.
        #[arg(long)]
        distance: Option<f64>,

        /// Override the attribution fraction f.
        #[arg(long)]
        attribution: Option<f64>,
    },
    /// Leave-one-group-out validation.
    Logo {
        /// Raw grid CSV (columns H0, Anc, PL).
        #[arg(long)]
        grid: PathBuf,

        /// scenario_local (default) or global.
        #[arg(long)]
        strategy: Option<String>,

        /// Use the five-scenario historical set.
        #[arg(long, default_value_t = false)]
        historical: bool,
    },
    /// Bootstrap resampling of the raw grid.
    Bootstrap {
        #[arg(long)]
        grid: PathBuf,

        #[arg(long)]
        iterations: Option<usize>,

        /// Run iterations on the rayon pool (different, reproducible draw sequence).
        #[arg(long, default_value_t = false)]
        parallel: bool,
    },
    /// Sweep d and f over their bounds.
    Scan,
    /// Synthetic injection/recovery.
    Inject {
        #[arg(long)]
        trials: Option<usize>,

        /// Multiplier on the simulated noise (0 disables it).
        #[arg(long)]
        noise_scale: Option<f64>,

        #[arg(long, default_value_t = false)]
        parallel: bool,
    },
    /// Run the full pipeline and write artifacts.
    Run {
        #[arg(long)]
        grid: PathBuf,

        /// Output directory for result files.
        #[arg(long, default_value = "results")]
        out: PathBuf,
    },
    /// Print the effective configuration as TOML.
    Config,
}

fn main() -> ExitCode {
    let profile = profiling::init();
    let cli = Cli::parse();
    let code = match run(cli) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::FAILURE
        }
    };
    if profile {
        for (stage, t) in profiling::report() {
            eprintln!(
                "[profile] {stage:<12} {:>4} call(s) {:>10.3} ms",
                t.calls,
                t.total.as_secs_f64() * 1000.0
            );
        }
    }
    code
}

fn run(cli: Cli) -> Result<ExitCode> {
    let mut config = match &cli.config {
        Some(path) => PipelineConfig::from_file(path)?,
        None => PipelineConfig::default(),
    };
    let mut session = Session {
        mode: cli.mode,
        log: DecisionLog::new(),
        json: cli.json,
        progress: cli.progress.then_some(StdoutProgress),
    };

    let outcome = execute(cli.command, &mut config, &mut session);

    // The log is written even when the command aborted.
    if let Some(path) = &cli.decision_log {
        if !session.log.is_empty() {
            append_decisions(path, session.log.decisions())
                .with_context(|| format!("failed to append decisions to {}", path.display()))?;
        }
    }

    // Gate failures are findings; only strict mode turns them into a failing exit.
    Ok(match outcome? {
        Some(false) if session.mode == ExecutionMode::Strict => ExitCode::FAILURE,
        _ => ExitCode::SUCCESS,
    })
}

/// Run one command. `Ok(None)` means the policy skipped it; otherwise the
/// overall gate verdict.
fn execute(
    command: Commands,
    config: &mut PipelineConfig,
    session: &mut Session,
) -> Result<Option<bool>> {
    let passed = match command {
        Commands::Concordance {
            distance,
            attribution,
        } => {
            if let Some(d) = distance {
                config.penalty.distance = d;
            }
            if let Some(f) = attribution {
                config.penalty.attribution = f;
            }
            config.validate()?;
            let r = baseline_concordance(config)?;
            if session.json {
                println!("{}", export_json(&r)?);
            } else {
                for (name, value) in r.fields() {
                    println!("{name:<24} {value:.6}");
                }
            }
            Some(true)
        }
        Commands::Logo {
            grid,
            strategy,
            historical,
        } => {
            if let Some(s) = strategy {
                config.logo.strategy = parse_strategy(&s)?;
            }
            if historical {
                config.logo.scenarios = ScenarioSetKind::Historical;
            }
            config.validate()?;
            match session.load_grid(&grid)? {
                Some(table) => {
                    let r = run_logo(
                        &table,
                        config.baseline.reference,
                        config.penalty_params(),
                        &config.logo_config(),
                    )?;
                    session.report(&r, print_logo)?;
                    Some(r.passed)
                }
                None => None,
            }
        }
        Commands::Bootstrap {
            grid,
            iterations,
            parallel,
        } => {
            if let Some(n) = iterations {
                config.bootstrap.iterations = n;
            }
            config.bootstrap.parallel |= parallel;
            config.validate()?;
            match session.load_grid(&grid)? {
                Some(table) => {
                    let r = run_bootstrap(
                        &table,
                        &config.baseline,
                        config.penalty_params(),
                        &config.bootstrap_config(),
                        session.progress(),
                    )?;
                    session.report(&r, |r| {
                        println!(
                            "bootstrap: {} iterations (seed {}, {} fallbacks)",
                            r.iterations, r.seed, r.fallback_iterations
                        );
                        println!(
                            "  tension median {:.4}  mean {:.4}  std {:.4}  p95 {:.4}",
                            r.tension.median, r.tension.mean, r.tension.std, r.tension.p95
                        );
                        print_gate(&r.gate);
                    })?;
                    Some(r.passed)
                }
                None => None,
            }
        }
        Commands::Scan => {
            config.validate()?;
            let r = run_grid_scan(&config.baseline, &config.grid_scan_config())?;
            session.report(&r, |r| {
                println!(
                    "grid scan: {}x{} points",
                    r.points_per_axis, r.points_per_axis
                );
                println!(
                    "  tension median {:.4}  mean {:.4}  min {:.4}  max {:.4}  iqr {:.4}",
                    r.tension.median, r.tension.mean, r.tension.min, r.tension.max, r.tension.iqr
                );
                print_gate(&r.gate);
            })?;
            Some(r.passed)
        }
        Commands::Inject {
            trials,
            noise_scale,
            parallel,
        } => {
            if let Some(n) = trials {
                config.injection.trials = n;
            }
            if let Some(s) = noise_scale {
                config.injection.noise_scale = s;
            }
            config.injection.parallel |= parallel;
            config.validate()?;
            let r = run_injection(config.penalty_params(), &config.injection_config(), session.progress())?;
            session.report(&r, |r| {
                println!("injection: {} trials (seed {})", r.trials, r.seed);
                println!(
                    "  |bias| median {:.4}  tension median {:.4}",
                    r.abs_bias.median, r.tension.median
                );
                print_gate(&r.gate_bias);
                print_gate(&r.gate_tension);
            })?;
            Some(r.passed)
        }
        Commands::Run { grid, out } => {
            config.validate()?;
            match session.load_grid(&grid)? {
                Some(table) => {
                    let report = run_pipeline(&table, config, session.progress())?;
                    let manifest = RunManifest::new(&table, config, &report)?;
                    let path = save_artifacts(&report, &manifest, &out)?;
                    session.report(&report, |r| {
                        print_logo(&r.logo);
                        print_gate(&r.bootstrap.gate);
                        print_gate(&r.grid_scan.gate);
                        print_gate(&r.injection.gate_bias);
                        print_gate(&r.injection.gate_tension);
                        println!("overall: {}", verdict(r.passed));
                    })?;
                    if !session.json {
                        println!("Artifacts saved to: {}", path.display());
                    }
                    Some(report.passed)
                }
                None => None,
            }
        }
        Commands::Config => {
            print!("{}", config.to_toml()?);
            Some(true)
        }
    };
    Ok(passed)
}

/// Per-invocation state: policy mode, decision log, output style.
struct Session {
    mode: ExecutionMode,
    log: DecisionLog,
    json: bool,
    progress: Option<StdoutProgress>,
}

impl Session {
    fn progress(&self) -> Option<&dyn ValidationProgress> {
        self.progress.as_ref().map(|p| p as &dyn ValidationProgress)
    }

    /// Load the grid, routing failures through the acceptability policy.
    ///
    /// `Ok(None)` means the policy chose to skip the computation.
    fn load_grid(&mut self, path: &Path) -> Result<Option<GridTable>> {
        let err = match load_grid_csv(path) {
            Ok(table) => return Ok(Some(table)),
            Err(e) => e,
        };
        let issue = match &err {
            LoadError::NotFound { .. } => IssueKind::DataMissing,
            _ => IssueKind::LogicError,
        };
        match self.log.handle(issue, self.mode, err.to_string()) {
            Action::Skip | Action::Continue => {
                eprintln!("WARNING: {err}; skipping ({issue} under {:?} policy)", self.mode);
                Ok(None)
            }
            Action::Fetch => bail!(
                "{err}; no fetch source is configured, place the grid at {} and rerun",
                path.display()
            ),
            Action::Retry => match load_grid_csv(path) {
                Ok(table) => Ok(Some(table)),
                Err(e) => bail!("{e} (after retry)"),
            },
            Action::Abort => bail!("{err}"),
        }
    }

    fn report<T: serde::Serialize>(&self, value: &T, summary: impl FnOnce(&T)) -> Result<()> {
        if self.json {
            println!("{}", export_json(value)?);
        } else {
            summary(value);
        }
        Ok(())
    }
}

fn parse_strategy(s: &str) -> Result<LogoStrategy> {
    match s {
        "scenario_local" | "scenario-local" => Ok(LogoStrategy::ScenarioLocal),
        "global" => Ok(LogoStrategy::Global),
        _ => bail!("unknown strategy '{s}'. Valid: scenario_local, global"),
    }
}

fn verdict(passed: bool) -> &'static str {
    if passed {
        "PASS"
    } else {
        "FAIL"
    }
}

fn print_gate(gate: &Gate) {
    println!("  {}", gate.summary());
}

fn print_logo(r: &LogoResult) {
    println!(
        "LOGO ({:?}, {} scenarios evaluated, {} degenerate)",
        r.strategy, r.evaluated, r.degenerate
    );
    println!(
        "  {:<14} {:>5} {:>9} {:>9} {:>9} {:>8}",
        "scenario", "rows", "anchor", "relation", "merged", "z_ref"
    );
    for s in &r.scenarios {
        match (s.merged_mean, s.tension_reference) {
            (Some(merged), Some(z)) => println!(
                "  {:<14} {:>5} {:>9.4} {:>9.4} {:>9.4} {:>8.4}",
                s.name, s.rows, s.anchor_correction, s.relation_correction, merged, z
            ),
            _ => println!("  {:<14} {:>5} degenerate (no retained rows)", s.name, s.rows),
        }
    }
    println!(
        "  max tension {:.4} ({}), Šidák threshold {:.4} (K={})",
        r.max_tension, r.worst_scenario, r.sidak_threshold, r.evaluated
    );
    print_gate(&r.gate_absolute);
    print_gate(&r.gate_family_wise);
}
