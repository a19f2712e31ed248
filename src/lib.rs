//! Discrete-time linear Kalman filter
//!
//! Maintains a Gaussian belief (state estimate and error covariance) over a
//! linear system and refines it from noisy, irregularly timed observations.
//! State, control and observation dimensions are const generics, so shape
//! errors are caught at compile time.

pub mod clock;
pub mod config;
pub mod error;
pub mod filter;
pub mod model;
pub mod params;
pub mod sim;

// Re-export main types
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::ModelConfig;
pub use error::KalmanError;
pub use filter::{Innovation, KalmanFilter};
pub use model::{ControlFn, TransitionFn};
pub use params::{CovarianceUpdate, FilterParams};
