//! Simulation harness
//!
//! Tracks a 1-D target with a known commanded acceleration plus random
//! acceleration noise, sampled at jittered intervals, and compares the Kalman
//! estimate with the raw position measurements.

use nalgebra::{Matrix2, Matrix2x1, RowVector2, Vector1, Vector2};
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Normal};

use crate::error::KalmanError;
use crate::filter::KalmanFilter;
use crate::params::FilterParams;

/// True target state
#[derive(Debug, Clone)]
pub struct TrueState {
    pub position: f64,
    pub velocity: f64,
}

impl TrueState {
    pub fn new(position: f64, velocity: f64) -> Self {
        Self { position, velocity }
    }

    fn step(&mut self, accel: f64, dt: f64) {
        self.position += self.velocity * dt + 0.5 * accel * dt * dt;
        self.velocity += accel * dt;
    }
}

/// Simulation configuration
#[derive(Debug, Clone)]
pub struct SimConfig {
    /// Nominal sample period [s]
    pub dt: f64,
    /// Sample period jitter as a fraction of `dt`, in [0, 1)
    pub jitter: f64,
    pub steps: usize,
    /// Position measurement noise std
    pub sigma_position: f64,
    /// Unmodelled acceleration std
    pub sigma_accel: f64,
    /// Known commanded acceleration, fed to the filter as control input
    pub command_accel: f64,
    pub seed: u64,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            dt: 0.1,
            jitter: 0.2,
            steps: 500,
            sigma_position: 0.5,
            sigma_accel: 0.2,
            command_accel: 0.05,
            seed: 42,
        }
    }
}

impl SimConfig {
    pub fn validate(&self) -> Result<(), KalmanError> {
        if !(self.dt.is_finite() && self.dt > 0.0) {
            return Err(KalmanError::InvalidConfig("dt must be > 0".to_string()));
        }
        if !(0.0..1.0).contains(&self.jitter) {
            return Err(KalmanError::InvalidConfig(
                "jitter must be in [0, 1)".to_string(),
            ));
        }
        if self.steps == 0 {
            return Err(KalmanError::InvalidConfig("steps must be > 0".to_string()));
        }
        if !(self.sigma_position.is_finite() && self.sigma_position > 0.0) {
            return Err(KalmanError::InvalidConfig(
                "sigma_position must be > 0".to_string(),
            ));
        }
        if !(self.sigma_accel.is_finite() && self.sigma_accel >= 0.0) {
            return Err(KalmanError::InvalidConfig(
                "sigma_accel must be >= 0".to_string(),
            ));
        }
        Ok(())
    }

    /// Discrete white-noise acceleration covariance at the nominal period
    fn process_noise(&self) -> Matrix2<f64> {
        let dt = self.dt;
        let var = self.sigma_accel * self.sigma_accel;
        Matrix2::new(
            0.25 * dt.powi(4),
            0.5 * dt.powi(3),
            0.5 * dt.powi(3),
            dt.powi(2),
        ) * var
    }
}

/// Simulation results for one time step
#[derive(Debug, Clone)]
pub struct SimStep {
    pub t: f64,
    pub position_true: f64,
    pub velocity_true: f64,
    pub measurement: f64,
    pub position_estimate: f64,
    pub velocity_estimate: f64,
    pub position_variance: f64,
    pub err_measurement: f64,
    pub err_estimate: f64,
    pub nis: f64,
}

/// Run the tracking simulation
pub fn run_simulation(config: SimConfig, params: FilterParams) -> Result<Vec<SimStep>, KalmanError> {
    config.validate()?;

    let mut rng = rand::rngs::StdRng::seed_from_u64(config.seed);
    let noise_dist = Normal::new(0.0, config.sigma_position)
        .map_err(|e| KalmanError::InvalidConfig(e.to_string()))?;
    let accel_dist = Normal::new(0.0, config.sigma_accel)
        .map_err(|e| KalmanError::InvalidConfig(e.to_string()))?;

    let mut true_state = TrueState::new(0.0, 1.0);

    let mut filter: KalmanFilter<2, 1> = KalmanFilter::with_models(
        Box::new(|dt: f64| Matrix2::new(1.0, dt, 0.0, 1.0)),
        Box::new(|dt: f64| Matrix2x1::new(0.5 * dt * dt, dt)),
        config.process_noise(),
        Vector2::zeros(),
        Matrix2::identity() * 10.0,
        0.0,
    )
    .with_params(params)?;

    let h = RowVector2::new(1.0, 0.0);
    let r = config.sigma_position * config.sigma_position;
    let u = Vector1::new(config.command_accel);

    let mut results = Vec::with_capacity(config.steps);
    let mut t = 0.0;

    for _ in 0..config.steps {
        let step_dt = config.dt * (1.0 + config.jitter * rng.gen_range(-1.0_f64..=1.0));
        t += step_dt;

        let accel = config.command_accel + accel_dist.sample(&mut rng);
        true_state.step(accel, step_dt);

        let measurement = true_state.position + noise_dist.sample(&mut rng);

        filter.predict_with_control(&u, t);
        let innovation = filter.update_scalar(measurement, &h, r)?;

        let x = filter.state_estimate();
        results.push(SimStep {
            t,
            position_true: true_state.position,
            velocity_true: true_state.velocity,
            measurement,
            position_estimate: x[0],
            velocity_estimate: x[1],
            position_variance: filter.error_covariance()[(0, 0)],
            err_measurement: (measurement - true_state.position).abs(),
            err_estimate: (x[0] - true_state.position).abs(),
            nis: innovation.nis(),
        });
    }

    Ok(results)
}

/// Calculate RMS error (0 for an empty slice)
pub fn rms_error(errors: &[f64]) -> f64 {
    if errors.is_empty() {
        return 0.0;
    }
    let sum_sq: f64 = errors.iter().map(|&e| e * e).sum();
    (sum_sq / errors.len() as f64).sqrt()
}

/// Arithmetic mean (0 for an empty slice)
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::CovarianceUpdate;

    #[test]
    fn test_simulation_runs() {
        let config = SimConfig {
            steps: 100,
            ..Default::default()
        };
        let results = run_simulation(config, FilterParams::default()).unwrap();
        assert_eq!(results.len(), 100);
        assert!(results.windows(2).all(|w| w[1].t > w[0].t));
    }

    #[test]
    fn test_filter_beats_raw_measurements() {
        let results = run_simulation(SimConfig::default(), FilterParams::default()).unwrap();
        let settled = &results[50..];

        let errors_meas: Vec<f64> = settled.iter().map(|s| s.err_measurement).collect();
        let errors_kf: Vec<f64> = settled.iter().map(|s| s.err_estimate).collect();
        assert!(rms_error(&errors_kf) < rms_error(&errors_meas));

        let nis: Vec<f64> = settled.iter().map(|s| s.nis).collect();
        let mean_nis = mean(&nis);
        assert!(mean_nis > 0.3 && mean_nis < 3.0, "mean nis {mean_nis}");
    }

    #[test]
    fn test_joseph_policy_runs() {
        let params = FilterParams::new(CovarianceUpdate::Joseph, 1e-12);
        let results = run_simulation(SimConfig::default(), params).unwrap();
        assert!(results.iter().all(|s| s.position_variance > 0.0));
    }

    #[test]
    fn test_invalid_config() {
        let config = SimConfig {
            dt: 0.0,
            ..Default::default()
        };
        assert!(matches!(
            run_simulation(config, FilterParams::default()),
            Err(KalmanError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_empty_metrics() {
        assert_eq!(rms_error(&[]), 0.0);
        assert_eq!(mean(&[]), 0.0);
        assert!((mean(&[1.0, 2.0, 6.0]) - 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_invalid_filter_params() {
        let params = FilterParams::new(CovarianceUpdate::Simplified, f64::NAN);
        assert!(matches!(
            run_simulation(SimConfig::default(), params),
            Err(KalmanError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_rms_error() {
        let errors = vec![0.1, 0.2, 0.3];
        let rms = rms_error(&errors);
        let expected = ((0.01_f64 + 0.04 + 0.09) / 3.0).sqrt();
        assert!((rms - expected).abs() < 1e-10);
    }
}
