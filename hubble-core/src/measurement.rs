//! Measurement — a scalar mean with its one-sigma uncertainty.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A mean and a standard deviation in the same physical unit (km/s/Mpc for H0).
///
/// Fields are public so callers can build measurements from already-validated
/// constants; [`Measurement::new`] is the checked constructor.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Measurement {
    pub mean: f64,
    pub sigma: f64,
}

/// Precondition violations on a measurement.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum MeasurementError {
    #[error("mean must be finite, got {mean}")]
    NonFiniteMean { mean: f64 },
    #[error("uncertainty must be finite and > 0, got {sigma}")]
    NonPositiveSigma { sigma: f64 },
}

impl Measurement {
    /// Build a measurement, rejecting non-finite means and non-positive sigmas.
    pub fn new(mean: f64, sigma: f64) -> Result<Self, MeasurementError> {
        let m = Self { mean, sigma };
        m.validate()?;
        Ok(m)
    }

    pub fn validate(&self) -> Result<(), MeasurementError> {
        if !self.mean.is_finite() {
            return Err(MeasurementError::NonFiniteMean { mean: self.mean });
        }
        if !self.sigma.is_finite() || self.sigma <= 0.0 {
            return Err(MeasurementError::NonPositiveSigma { sigma: self.sigma });
        }
        Ok(())
    }

    /// Same uncertainty, mean shifted by an additive correction.
    pub fn shifted(&self, correction: f64) -> Self {
        Self {
            mean: self.mean + correction,
            sigma: self.sigma,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_positive_sigma() {
        let m = Measurement::new(67.27, 0.60).unwrap();
        assert_eq!(m.mean, 67.27);
        assert_eq!(m.sigma, 0.60);
    }

    #[test]
    fn rejects_zero_sigma() {
        assert_eq!(
            Measurement::new(67.27, 0.0),
            Err(MeasurementError::NonPositiveSigma { sigma: 0.0 })
        );
    }

    #[test]
    fn rejects_nan_sigma_and_mean() {
        assert!(Measurement::new(67.27, f64::NAN).is_err());
        assert!(Measurement::new(f64::INFINITY, 1.0).is_err());
    }

    #[test]
    fn shift_leaves_sigma_untouched() {
        let m = Measurement::new(73.59, 1.56).unwrap().shifted(-1.92 - 0.22);
        assert!((m.mean - 71.45).abs() < 1e-9);
        assert_eq!(m.sigma, 1.56);
    }
}
