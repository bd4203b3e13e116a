//! Pipeline configuration — TOML file with one section per concern.
//!
//! Every field defaults to the published baseline constants, so an empty file
//! (or no file at all) reproduces the reference run and a partial file
//! overrides only what it names:
//!
//! ```toml
//! [seeds]
//! master = 7
//!
//! [bootstrap]
//! iterations = 2000
//! ```

use std::path::{Path, PathBuf};

use hubble_core::{Measurement, PenaltyParams};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::bootstrap::BootstrapConfig;
use crate::grid_scan::GridScanConfig;
use crate::injection::InjectionConfig;
use crate::logo::{LogoConfig, LogoStrategy, ScenarioSetKind};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("cannot serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("{field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

fn invalid(field: &'static str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid {
        field,
        reason: reason.into(),
    }
}

// ─── Sections ────────────────────────────────────────────────────────

/// Published measurements and the baseline corrections derived from them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Baseline {
    pub reference: Measurement,
    pub original_candidate: Measurement,
    pub anchor_correction: f64,
    pub relation_correction: f64,
    pub corrected_candidate: Measurement,
}

impl Default for Baseline {
    fn default() -> Self {
        Self {
            reference: Measurement {
                mean: 67.27,
                sigma: 0.60,
            },
            original_candidate: Measurement {
                mean: 73.59,
                sigma: 1.56,
            },
            anchor_correction: -1.92,
            relation_correction: -0.22,
            corrected_candidate: Measurement {
                mean: 71.45,
                sigma: 1.89,
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PenaltySection {
    pub distance: f64,
    pub attribution: f64,
    pub distance_bounds: [f64; 2],
    pub attribution_bounds: [f64; 2],
    pub grid_points: usize,
}

impl Default for PenaltySection {
    fn default() -> Self {
        Self {
            distance: PenaltyParams::NOMINAL.distance,
            attribution: PenaltyParams::NOMINAL.attribution,
            distance_bounds: [1.0, 1.8],
            attribution_bounds: [0.3, 0.7],
            grid_points: 17,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GateSection {
    pub logo_absolute: f64,
    pub logo_alpha: f64,
    pub tolerance: f64,
    pub bootstrap_p95_max: f64,
    pub grid_median_range: [f64; 2],
    pub injection_bias_max: f64,
    pub injection_tension_max: f64,
}

impl Default for GateSection {
    fn default() -> Self {
        Self {
            logo_absolute: 1.5,
            logo_alpha: 0.05,
            tolerance: crate::gate::DEFAULT_TOLERANCE,
            bootstrap_p95_max: 1.2,
            grid_median_range: [0.9, 1.1],
            injection_bias_max: 0.3,
            injection_tension_max: 1.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SeedSection {
    pub master: u64,
}

impl Default for SeedSection {
    fn default() -> Self {
        Self { master: 172_901 }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BootstrapSection {
    pub iterations: usize,
    pub parallel: bool,
}

impl Default for BootstrapSection {
    fn default() -> Self {
        Self {
            iterations: 10_000,
            parallel: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InjectionSection {
    pub trials: usize,
    pub truth_range: [f64; 2],
    pub anchor_bias: f64,
    pub relation_bias: f64,
    /// Multiplier on the simulated noise; 0 disables it.
    pub noise_scale: f64,
    pub parallel: bool,
}

impl Default for InjectionSection {
    fn default() -> Self {
        Self {
            trials: 2_000,
            truth_range: [67.3, 67.5],
            anchor_bias: 1.92,
            relation_bias: 0.22,
            noise_scale: 1.0,
            parallel: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LogoSection {
    pub strategy: LogoStrategy,
    pub scenarios: ScenarioSetKind,
}

// ─── Pipeline ────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub baseline: Baseline,
    pub penalty: PenaltySection,
    pub gates: GateSection,
    pub seeds: SeedSection,
    pub bootstrap: BootstrapSection,
    pub injection: InjectionSection,
    pub logo: LogoSection,
}

impl PipelineConfig {
    /// Load and validate a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }

    /// Parse and validate a TOML string.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let b = &self.baseline;
        for (field, m) in [
            ("baseline.reference", b.reference),
            ("baseline.original_candidate", b.original_candidate),
            ("baseline.corrected_candidate", b.corrected_candidate),
        ] {
            m.validate().map_err(|e| invalid(field, e.to_string()))?;
        }
        if !b.anchor_correction.is_finite() || !b.relation_correction.is_finite() {
            return Err(invalid("baseline", "corrections must be finite"));
        }

        let p = &self.penalty;
        if !(p.distance.is_finite() && p.distance >= 0.0) {
            return Err(invalid("penalty.distance", format!("must be >= 0, got {}", p.distance)));
        }
        check_fraction("penalty.attribution", p.attribution)?;
        check_bounds("penalty.distance_bounds", p.distance_bounds)?;
        check_bounds("penalty.attribution_bounds", p.attribution_bounds)?;
        check_fraction("penalty.attribution_bounds", p.attribution_bounds[0])?;
        check_fraction("penalty.attribution_bounds", p.attribution_bounds[1])?;
        if p.grid_points == 0 {
            return Err(invalid("penalty.grid_points", "must be at least 1"));
        }

        let g = &self.gates;
        if !(g.logo_alpha > 0.0 && g.logo_alpha < 1.0) {
            return Err(invalid("gates.logo_alpha", format!("must be in (0, 1), got {}", g.logo_alpha)));
        }
        if !(g.tolerance.is_finite() && g.tolerance >= 0.0) {
            return Err(invalid("gates.tolerance", "must be >= 0"));
        }
        check_bounds("gates.grid_median_range", g.grid_median_range)?;

        if self.bootstrap.iterations == 0 {
            return Err(invalid("bootstrap.iterations", "must be at least 1"));
        }

        let i = &self.injection;
        if i.trials == 0 {
            return Err(invalid("injection.trials", "must be at least 1"));
        }
        check_bounds("injection.truth_range", i.truth_range)?;
        if !(i.noise_scale.is_finite() && i.noise_scale >= 0.0) {
            return Err(invalid("injection.noise_scale", "must be >= 0"));
        }
        Ok(())
    }

    pub fn penalty_params(&self) -> PenaltyParams {
        PenaltyParams::new(self.penalty.distance, self.penalty.attribution)
    }

    pub fn logo_config(&self) -> LogoConfig {
        LogoConfig {
            strategy: self.logo.strategy,
            scenarios: self.logo.scenarios,
            absolute_threshold: self.gates.logo_absolute,
            alpha: self.gates.logo_alpha,
            tolerance: self.gates.tolerance,
            global_relation_correction: self.baseline.relation_correction,
        }
    }

    pub fn bootstrap_config(&self) -> BootstrapConfig {
        BootstrapConfig {
            iterations: self.bootstrap.iterations,
            seed: self.seeds.master,
            p95_threshold: self.gates.bootstrap_p95_max,
            tolerance: self.gates.tolerance,
            parallel: self.bootstrap.parallel,
        }
    }

    pub fn grid_scan_config(&self) -> GridScanConfig {
        GridScanConfig {
            distance_bounds: self.penalty.distance_bounds,
            attribution_bounds: self.penalty.attribution_bounds,
            points_per_axis: self.penalty.grid_points,
            median_range: self.gates.grid_median_range,
            seed: self.seeds.master,
        }
    }

    pub fn injection_config(&self) -> InjectionConfig {
        let i = &self.injection;
        InjectionConfig {
            trials: i.trials,
            seed: self.seeds.master,
            truth_range: i.truth_range,
            anchor_bias: i.anchor_bias,
            relation_bias: i.relation_bias,
            noise_sigma: self.baseline.original_candidate.sigma,
            noise_scale: i.noise_scale,
            reference_sigma: self.baseline.reference.sigma,
            candidate_sigma: self.baseline.corrected_candidate.sigma,
            bias_threshold: self.gates.injection_bias_max,
            tension_threshold: self.gates.injection_tension_max,
            tolerance: self.gates.tolerance,
            parallel: i.parallel,
        }
    }

    /// Content hash of the configuration (BLAKE3 over its JSON form).
    pub fn config_hash(&self) -> Result<String, serde_json::Error> {
        let json = serde_json::to_string(self)?;
        Ok(blake3::hash(json.as_bytes()).to_hex().to_string())
    }
}

fn check_fraction(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(invalid(field, format!("must be in [0, 1], got {value}")))
    }
}

fn check_bounds(field: &'static str, [lo, hi]: [f64; 2]) -> Result<(), ConfigError> {
    if lo.is_finite() && hi.is_finite() && lo <= hi {
        Ok(())
    } else {
        Err(invalid(field, format!("expected low <= high, got [{lo}, {hi}]")))
    }
}
