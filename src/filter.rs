//! Linear Kalman filter
//!
//! Predict/update recursion over a state of compile-time dimension `N` with a
//! control input of dimension `M`. Observations may have any dimension `U`,
//! chosen per update call.

use std::fmt;

use log::{debug, trace, warn};
use nalgebra::{RowSVector, SMatrix, SVector};

use crate::clock::Clock;
use crate::error::KalmanError;
use crate::model::{constant_control, constant_transition, ControlFn, TransitionFn};
use crate::params::{CovarianceUpdate, FilterParams};

/// Diagnostics of a single accepted update
#[derive(Debug, Clone, PartialEq)]
pub struct Innovation<const N: usize, const U: usize> {
    /// `y = z - H x`, evaluated before the update
    pub residual: SVector<f64, U>,
    /// `S = H P H^T + R`
    pub covariance: SMatrix<f64, U, U>,
    /// Kalman gain `K = P H^T S^-1`
    pub gain: SMatrix<f64, N, U>,
    nis: f64,
}

impl<const N: usize, const U: usize> Innovation<N, U> {
    /// Normalized innovation squared, `y^T S^-1 y`
    ///
    /// Chi-squared with `U` degrees of freedom when the filter is consistent.
    pub fn nis(&self) -> f64 {
        self.nis
    }
}

/// Linear Kalman filter
///
/// `N` - state dimension
/// `M` - control input dimension
///
/// The filter keeps one belief (`x`, `P`) and the timestamp of the last
/// predict. It does no locking; a single caller is expected to drive it.
pub struct KalmanFilter<const N: usize, const M: usize> {
    transition: TransitionFn<N>,
    control: ControlFn<N, M>,
    /// Process noise covariance, fixed for the lifetime of the filter
    q: SMatrix<f64, N, N>,
    /// Current state estimate
    x: SVector<f64, N>,
    /// Current error covariance
    p: SMatrix<f64, N, N>,
    /// Time of the last predict
    last_timestamp: f64,
    params: FilterParams,
}

impl<const N: usize, const M: usize> KalmanFilter<N, M> {
    /// Create a filter with time-invariant transition and control matrices
    ///
    /// # Arguments
    /// * `a` - State transition matrix
    /// * `b` - Control input matrix
    /// * `q` - Process noise covariance
    /// * `x0` - Initial state estimate
    /// * `p0` - Initial error covariance
    /// * `t0` - Initial timestamp
    pub fn new(
        a: SMatrix<f64, N, N>,
        b: SMatrix<f64, N, M>,
        q: SMatrix<f64, N, N>,
        x0: SVector<f64, N>,
        p0: SMatrix<f64, N, N>,
        t0: f64,
    ) -> Self {
        Self::with_models(constant_transition(a), constant_control(b), q, x0, p0, t0)
    }

    /// Create a filter whose transition and control matrices depend on the
    /// elapsed time between predicts
    pub fn with_models(
        transition: TransitionFn<N>,
        control: ControlFn<N, M>,
        q: SMatrix<f64, N, N>,
        x0: SVector<f64, N>,
        p0: SMatrix<f64, N, N>,
        t0: f64,
    ) -> Self {
        debug!("kalman filter created: n={N} m={M} t0={t0}");
        Self {
            transition,
            control,
            q,
            x: x0,
            p: p0,
            last_timestamp: t0,
            params: FilterParams::default(),
        }
    }

    /// Replace the filter parameters, consuming the filter
    pub fn with_params(mut self, params: FilterParams) -> Result<Self, KalmanError> {
        self.set_params(params)?;
        Ok(self)
    }

    /// Advance the belief to time `t` with no control input
    pub fn predict(&mut self, t: f64) {
        self.predict_with_control(&SVector::zeros(), t);
    }

    /// Advance the belief to time `t` under control input `u`
    ///
    /// `dt` is not checked: a zero or negative step is propagated exactly
    /// like a positive one, through whatever the models return for it.
    pub fn predict_with_control(&mut self, u: &SVector<f64, M>, t: f64) {
        let dt = t - self.last_timestamp;
        self.last_timestamp = t;

        let a = (self.transition)(dt);
        let b = (self.control)(dt);

        self.x = a * self.x + b * u;
        self.p = a * self.p * a.transpose() + self.q;

        trace!("predict: t={t} dt={dt}");
    }

    /// Advance the belief to the current time of `clock`
    pub fn predict_now<C: Clock + ?Sized>(&mut self, clock: &C) {
        self.predict(clock.now());
    }

    /// Incorporate an observation `z = H x + v`, `v ~ N(0, R)`
    ///
    /// The observation is taken to be at the time of the last predict; the
    /// timestamp is neither read nor advanced here. On error the belief is
    /// left untouched.
    ///
    /// # Arguments
    /// * `z` - Observation, U x 1
    /// * `h` - Observation model, U x N
    /// * `r` - Observation noise covariance, U x U
    pub fn update<const U: usize>(
        &mut self,
        z: &SVector<f64, U>,
        h: &SMatrix<f64, U, N>,
        r: &SMatrix<f64, U, U>,
    ) -> Result<Innovation<N, U>, KalmanError> {
        let y = z - h * self.x;
        let s = h * self.p * h.transpose() + r;

        let s_inv = match self.invert_innovation(s) {
            Ok(s_inv) => s_inv,
            Err(err) => {
                warn!("update rejected: {err}");
                return Err(err);
            }
        };

        let k = self.p * h.transpose() * s_inv;
        self.x += k * y;

        let i_kh = SMatrix::<f64, N, N>::identity() - k * h;
        self.p = match self.params.covariance_update {
            CovarianceUpdate::Simplified => i_kh * self.p,
            CovarianceUpdate::Joseph => i_kh * self.p * i_kh.transpose() + k * r * k.transpose(),
        };

        let nis = y.dot(&(s_inv * y));
        trace!("update: u={U} nis={nis}");

        Ok(Innovation {
            residual: y,
            covariance: s,
            gain: k,
            nis,
        })
    }

    /// Incorporate a scalar observation
    ///
    /// Same as [`update`](Self::update) with `z` and `r` as 1 x 1 matrices.
    pub fn update_scalar(
        &mut self,
        z: f64,
        h: &RowSVector<f64, N>,
        r: f64,
    ) -> Result<Innovation<N, 1>, KalmanError> {
        self.update(&SVector::<f64, 1>::new(z), h, &SMatrix::<f64, 1, 1>::new(r))
    }

    fn invert_innovation<const U: usize>(
        &self,
        s: SMatrix<f64, U, U>,
    ) -> Result<SMatrix<f64, U, U>, KalmanError> {
        if s.iter().any(|v| !v.is_finite()) {
            return Err(KalmanError::NonFiniteInnovation);
        }

        let s_inv = s
            .try_inverse()
            .ok_or(KalmanError::SingularInnovation { dim: U })?;
        if s_inv.iter().any(|v| !v.is_finite()) {
            return Err(KalmanError::SingularInnovation { dim: U });
        }

        // Equilibrate with D = diag(S) first: S' = D^-1/2 S D^-1/2 and
        // S'^-1 = D^1/2 S^-1 D^1/2, so units and axis scaling do not count
        let d = SVector::<f64, U>::from_fn(|i, _| {
            let scale = s[(i, i)].abs().sqrt();
            if scale > 0.0 {
                scale
            } else {
                1.0
            }
        });
        let dd = d * d.transpose();
        let scaled = s.component_div(&dd);
        let scaled_inv = s_inv.component_mul(&dd);

        // 1 / (|S'|_F |S'^-1|_F) bounds the reciprocal 2-norm condition of S' from below
        let rcond = 1.0 / (scaled.norm() * scaled_inv.norm());
        if rcond.is_nan() || rcond <= self.params.singularity_threshold {
            return Err(KalmanError::SingularInnovation { dim: U });
        }

        Ok(s_inv)
    }

    /// Current state estimate
    pub fn state_estimate(&self) -> SVector<f64, N> {
        self.x
    }

    /// Current error covariance
    pub fn error_covariance(&self) -> SMatrix<f64, N, N> {
        self.p
    }

    /// Process noise covariance
    pub fn process_noise(&self) -> SMatrix<f64, N, N> {
        self.q
    }

    /// Timestamp of the last predict (or `t0` if none yet)
    pub fn last_timestamp(&self) -> f64 {
        self.last_timestamp
    }

    pub fn params(&self) -> FilterParams {
        self.params
    }

    /// Replace the filter parameters; invalid parameters leave the current
    /// ones in place
    pub fn set_params(&mut self, params: FilterParams) -> Result<(), KalmanError> {
        params.validate()?;
        debug!("filter params set: {params:?}");
        self.params = params;
        Ok(())
    }

    /// Overwrite the state estimate, e.g. to reinitialize after divergence
    ///
    /// The last timestamp is left as is.
    pub fn set_state_estimate(&mut self, x: SVector<f64, N>) {
        debug!("state estimate overwritten");
        self.x = x;
    }

    /// Overwrite the error covariance
    ///
    /// The matrix is not checked; callers must supply a symmetric positive
    /// semi-definite `P`. The last timestamp is left as is.
    pub fn set_error_covariance(&mut self, p: SMatrix<f64, N, N>) {
        debug!("error covariance overwritten");
        self.p = p;
    }
}

impl<const N: usize, const M: usize> fmt::Debug for KalmanFilter<N, M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KalmanFilter")
            .field("x", &self.x)
            .field("p", &self.p)
            .field("q", &self.q)
            .field("last_timestamp", &self.last_timestamp)
            .field("params", &self.params)
            .finish_non_exhaustive()
    }
}
