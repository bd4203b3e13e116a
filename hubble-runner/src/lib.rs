//! Hubble Runner — validators, gates, configuration, loading and export.
//!
//! This crate builds on `hubble-core` to provide:
//! - Leave-one-group-out validation with absolute and Šidák gates
//! - Bootstrap resampling of the raw grid
//! - Penalty-parameter grid scan
//! - Synthetic injection/recovery
//! - TOML pipeline configuration and CSV grid loading
//! - Acceptability policy with an explicit decision log
//! - JSON / CSV / JSONL export and the run manifest

pub mod bootstrap;
pub mod config;
pub mod data_loader;
pub mod error;
pub mod export;
pub mod gate;
pub mod grid_scan;
pub mod injection;
pub mod logo;
pub mod pipeline;
pub mod policy;
pub mod profiling;
pub mod progress;

pub use bootstrap::{run_bootstrap, BootstrapConfig, BootstrapResult};
pub use config::{Baseline, ConfigError, PipelineConfig};
pub use data_loader::{load_grid_csv, LoadError};
pub use error::ValidationError;
pub use gate::{sidak_threshold, Gate};
pub use grid_scan::{run_grid_scan, GridScanConfig, GridScanResult};
pub use injection::{run_injection, InjectionConfig, InjectionResult};
pub use logo::{run_logo, LogoConfig, LogoResult, LogoStrategy, ScenarioResult, ScenarioSetKind};
pub use pipeline::{run_pipeline, PipelineReport, RunManifest};
pub use policy::{decide, Action, DecisionLog, ExecutionMode, IssueKind, PolicyAction};
pub use progress::{StdoutProgress, ValidationProgress};

#[cfg(test)]
mod send_sync_checks {
    use super::*;

    fn assert_send<T: Send>() {}
    fn assert_sync<T: Sync>() {}

    #[test]
    fn validator_results_are_send_sync() {
        assert_send::<LogoResult>();
        assert_sync::<LogoResult>();
        assert_send::<BootstrapResult>();
        assert_sync::<BootstrapResult>();
        assert_send::<GridScanResult>();
        assert_sync::<GridScanResult>();
        assert_send::<InjectionResult>();
        assert_sync::<InjectionResult>();
        assert_send::<PipelineReport>();
        assert_sync::<PipelineReport>();
    }

    #[test]
    fn config_types_are_send_sync() {
        assert_send::<PipelineConfig>();
        assert_sync::<PipelineConfig>();
        assert_send::<LogoConfig>();
        assert_sync::<LogoConfig>();
        assert_send::<BootstrapConfig>();
        assert_sync::<BootstrapConfig>();
        assert_send::<InjectionConfig>();
        assert_sync::<InjectionConfig>();
    }

    #[test]
    fn policy_types_are_send_sync() {
        assert_send::<DecisionLog>();
        assert_sync::<DecisionLog>();
    }

    #[test]
    fn errors_are_send_sync() {
        assert_send::<ValidationError>();
        assert_sync::<ValidationError>();
        assert_send::<LoadError>();
        assert_sync::<LoadError>();
    }
}
