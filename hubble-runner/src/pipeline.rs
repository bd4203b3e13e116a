//! Full pipeline — baseline concordance plus the four validators.
//!
//! The LOGO run uses the configured strategy and scenario set. When that is
//! the scenario-local strategy, the historical global-corrections variant is
//! also run as a diagnostic; it is reported but never affects the verdict.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use hubble_core::{concordance, ConcordanceResult, GridTable};
use serde::{Deserialize, Serialize};

use crate::bootstrap::{run_bootstrap, BootstrapResult};
use crate::config::PipelineConfig;
use crate::error::ValidationError;
use crate::grid_scan::{run_grid_scan, GridScanResult};
use crate::injection::{run_injection, InjectionResult};
use crate::logo::{run_logo, LogoConfig, LogoResult, LogoStrategy, ScenarioSetKind};
use crate::profiling::ProfileScope;
use crate::progress::ValidationProgress;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineReport {
    pub baseline: ConcordanceResult,
    pub logo: LogoResult,
    /// Global-corrections LOGO over the historical set; informational only.
    pub logo_diagnostic: Option<LogoResult>,
    pub bootstrap: BootstrapResult,
    pub grid_scan: GridScanResult,
    pub injection: InjectionResult,
    pub passed: bool,
}

impl PipelineReport {
    /// Validator name → overall pass flag.
    pub fn verdicts(&self) -> BTreeMap<String, bool> {
        BTreeMap::from([
            ("logo".to_string(), self.logo.passed),
            ("bootstrap".to_string(), self.bootstrap.passed),
            ("grid_scan".to_string(), self.grid_scan.passed),
            ("injection".to_string(), self.injection.passed),
        ])
    }
}

/// Reproducibility record written alongside the per-validator results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunManifest {
    pub crate_version: String,
    pub created_at: DateTime<Utc>,
    pub master_seed: u64,
    /// BLAKE3 of the loaded grid table.
    pub dataset_hash: String,
    pub dataset_rows: usize,
    /// BLAKE3 of the configuration's JSON form.
    pub config_hash: String,
    pub config: PipelineConfig,
    pub verdicts: BTreeMap<String, bool>,
    pub passed: bool,
}

impl RunManifest {
    pub fn new(
        table: &GridTable,
        config: &PipelineConfig,
        report: &PipelineReport,
    ) -> Result<Self, serde_json::Error> {
        Ok(Self {
            crate_version: env!("CARGO_PKG_VERSION").to_string(),
            created_at: Utc::now(),
            master_seed: config.seeds.master,
            dataset_hash: table.content_hash(),
            dataset_rows: table.len(),
            config_hash: config.config_hash()?,
            config: config.clone(),
            verdicts: report.verdicts(),
            passed: report.passed,
        })
    }
}

/// Baseline concordance from the published constants.
pub fn baseline_concordance(config: &PipelineConfig) -> Result<ConcordanceResult, ValidationError> {
    let b = &config.baseline;
    b.reference.validate()?;
    b.corrected_candidate.validate()?;
    Ok(concordance(
        b.reference,
        b.corrected_candidate,
        b.original_candidate.mean,
        config.penalty_params(),
    ))
}

pub fn run_pipeline(
    table: &GridTable,
    config: &PipelineConfig,
    progress: Option<&dyn ValidationProgress>,
) -> Result<PipelineReport, ValidationError> {
    config.validate()?;
    let _scope = ProfileScope::new("pipeline");
    let params = config.penalty_params();
    let reference = config.baseline.reference;

    let baseline = baseline_concordance(config)?;

    let logo_config = config.logo_config();
    let logo = {
        let _s = ProfileScope::new("logo");
        run_logo(table, reference, params, &logo_config)?
    };
    let logo_diagnostic = match logo_config.strategy {
        LogoStrategy::ScenarioLocal => {
            let diag = LogoConfig {
                strategy: LogoStrategy::Global,
                scenarios: ScenarioSetKind::Historical,
                ..logo_config.clone()
            };
            Some(run_logo(table, reference, params, &diag)?)
        }
        LogoStrategy::Global => None,
    };

    let bootstrap = {
        let _s = ProfileScope::new("bootstrap");
        run_bootstrap(table, &config.baseline, params, &config.bootstrap_config(), progress)?
    };
    let grid_scan = {
        let _s = ProfileScope::new("grid_scan");
        run_grid_scan(&config.baseline, &config.grid_scan_config())?
    };
    let injection = {
        let _s = ProfileScope::new("injection");
        run_injection(params, &config.injection_config(), progress)?
    };

    let passed = logo.passed && bootstrap.passed && grid_scan.passed && injection.passed;
    Ok(PipelineReport {
        baseline,
        logo,
        logo_diagnostic,
        bootstrap,
        grid_scan,
        injection,
        passed,
    })
}
