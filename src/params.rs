//! Filter parameters
//!
//! Numerical policy knobs for the Kalman update step

use serde::{Deserialize, Serialize};

use crate::error::KalmanError;

/// Covariance update formula applied at the end of every update
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CovarianceUpdate {
    /// `P = (I - K H) P`
    ///
    /// Cheap, but rounding can leave `P` asymmetric or indefinite when the
    /// gain is large.
    #[default]
    Simplified,
    /// `P = (I - K H) P (I - K H)^T + K R K^T`
    ///
    /// Keeps `P` symmetric positive semi-definite for any gain, at roughly
    /// twice the cost.
    Joseph,
}

/// Parameters for the Kalman filter
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterParams {
    /// Covariance update formula
    pub covariance_update: CovarianceUpdate,
    /// Smallest accepted reciprocal condition estimate of the innovation
    /// covariance, `1 / (|S'|_F |S'^-1|_F)` with `S' = D^-1/2 S D^-1/2` and
    /// `D = diag(S)`, before `S` is treated as singular. Lies in `(0, 1/U]`;
    /// 0 only rejects exact singularity.
    pub singularity_threshold: f64,
}

impl FilterParams {
    /// Create new filter parameters
    pub fn new(covariance_update: CovarianceUpdate, singularity_threshold: f64) -> Self {
        Self {
            covariance_update,
            singularity_threshold,
        }
    }

    /// Default parameters with the Joseph-form covariance update
    pub fn joseph() -> Self {
        Self {
            covariance_update: CovarianceUpdate::Joseph,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<(), KalmanError> {
        if !self.singularity_threshold.is_finite() {
            return Err(KalmanError::InvalidConfig(
                "singularity_threshold must be finite".to_string(),
            ));
        }

        if !(0.0..1.0).contains(&self.singularity_threshold) {
            return Err(KalmanError::InvalidConfig(
                "singularity_threshold must be in [0, 1)".to_string(),
            ));
        }

        Ok(())
    }
}

impl Default for FilterParams {
    fn default() -> Self {
        Self {
            covariance_update: CovarianceUpdate::Simplified,
            singularity_threshold: 1e-12,
        }
    }
}
