//! Error types for the filter and its configuration

use thiserror::Error;

#[derive(Debug, Error)]
pub enum KalmanError {
    #[error("innovation covariance ({dim}x{dim}) is singular or near-singular")]
    SingularInnovation { dim: usize },
    #[error("innovation covariance contains non-finite values")]
    NonFiniteInnovation,
    #[error("{name} shape mismatch: expected {}x{}, got {}x{}", .expected.0, .expected.1, .got.0, .got.1)]
    ShapeMismatch {
        name: &'static str,
        expected: (usize, usize),
        got: (usize, usize),
    },
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("toml error: {0}")]
    Toml(#[from] toml::de::Error),
}
