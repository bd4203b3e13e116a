//! Hubble Core — measurements, concordance engine, grid table, correction estimator.
//!
//! This crate holds the pure computation every validator builds on:
//! - Measurement type with checked construction
//! - Epistemic penalty and inverse-variance concordance merge
//! - Raw systematic grid with anchor-code parsing
//! - Anchor / relation correction estimator (baseline and scenario-local)
//! - Descriptive statistics and the inverse normal quantile
//! - Deterministic RNG hierarchy
//!
//! Nothing here performs I/O.

pub mod concordance;
pub mod corrections;
pub mod grid;
pub mod measurement;
pub mod rng;
pub mod stats;

pub use concordance::{concordance, ConcordanceResult, PenaltyParams};
pub use corrections::{
    estimate_baseline, estimate_for_anchors, CorrectionError, CorrectionEstimate, CorrectionScope,
    ScenarioEstimate,
};
pub use grid::{Anchor, AnchorSet, GridError, GridRow, GridTable};
pub use measurement::{Measurement, MeasurementError};
pub use rng::{RngHierarchy, Stream};
