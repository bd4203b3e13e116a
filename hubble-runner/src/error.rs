//! Errors raised while running a validator.

use hubble_core::{CorrectionError, GridError, MeasurementError};
use thiserror::Error;

use crate::config::ConfigError;

#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("invalid measurement: {0}")]
    Measurement(#[from] MeasurementError),

    #[error("invalid grid: {0}")]
    Grid(#[from] GridError),

    #[error("scenario '{scenario}': {source}")]
    Scenario {
        scenario: String,
        #[source]
        source: CorrectionError,
    },

    #[error("every LOGO scenario was degenerate; no tension to gate")]
    NoScenarios,

    #[error("bootstrap resample {iteration}: {source}")]
    Resample {
        iteration: usize,
        #[source]
        source: CorrectionError,
    },

    #[error("bootstrap resample {iteration} has no usable scatter")]
    DegenerateResample { iteration: usize },
}
