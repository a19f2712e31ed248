//! Model configuration
//!
//! Loads a filter model from TOML and builds a shape-checked filter

use std::fs;
use std::path::Path;

use nalgebra::{SMatrix, SVector};
use serde::{Deserialize, Serialize};

use crate::error::KalmanError;
use crate::filter::KalmanFilter;
use crate::params::FilterParams;

/// Filter model description as loaded from TOML
///
/// Matrices are row-major arrays of rows, vectors are flat arrays. The
/// dimensions are only checked when the filter is built, against the `N` and
/// `M` the caller asks for.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelConfig {
    #[serde(default)]
    pub t0: f64,
    pub a: Vec<Vec<f64>>,
    /// Control input matrix; a system without inputs may leave it out
    #[serde(default)]
    pub b: Option<Vec<Vec<f64>>>,
    pub q: Vec<Vec<f64>>,
    pub x0: Vec<f64>,
    pub p0: Vec<Vec<f64>>,
    #[serde(default)]
    pub filter: FilterParams,
}

impl ModelConfig {
    pub fn from_toml_str(raw: &str) -> Result<Self, KalmanError> {
        let cfg: ModelConfig = toml::from_str(raw)?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn from_toml_file(path: &Path) -> Result<Self, KalmanError> {
        let raw = fs::read_to_string(path)?;
        Self::from_toml_str(&raw)
    }

    pub fn validate(&self) -> Result<(), KalmanError> {
        if !self.t0.is_finite() {
            return Err(KalmanError::InvalidConfig("t0 must be finite".to_string()));
        }

        let matrices = [
            ("a", Some(&self.a)),
            ("b", self.b.as_ref()),
            ("q", Some(&self.q)),
            ("p0", Some(&self.p0)),
        ];
        for (name, rows) in matrices {
            let finite = rows.map_or(true, |rows| rows.iter().flatten().all(|v| v.is_finite()));
            if !finite {
                return Err(KalmanError::InvalidConfig(format!(
                    "{name} contains non-finite entries"
                )));
            }
        }

        if self.x0.iter().any(|v| !v.is_finite()) {
            return Err(KalmanError::InvalidConfig(
                "x0 contains non-finite entries".to_string(),
            ));
        }

        self.filter.validate()
    }

    /// Build a filter with state dimension `N` and control dimension `M`
    pub fn build<const N: usize, const M: usize>(&self) -> Result<KalmanFilter<N, M>, KalmanError> {
        self.validate()?;

        let a = matrix::<N, N>("a", &self.a)?;
        let b = match &self.b {
            Some(rows) => matrix::<N, M>("b", rows)?,
            None => SMatrix::zeros(),
        };
        let q = matrix::<N, N>("q", &self.q)?;
        let x0 = vector::<N>("x0", &self.x0)?;
        let p0 = matrix::<N, N>("p0", &self.p0)?;

        KalmanFilter::new(a, b, q, x0, p0, self.t0).with_params(self.filter)
    }
}

fn matrix<const R: usize, const C: usize>(
    name: &'static str,
    rows: &[Vec<f64>],
) -> Result<SMatrix<f64, R, C>, KalmanError> {
    let cols = rows.first().map_or(0, Vec::len);
    if rows.len() != R {
        return Err(KalmanError::ShapeMismatch {
            name,
            expected: (R, C),
            got: (rows.len(), cols),
        });
    }

    if let Some(row) = rows.iter().find(|row| row.len() != C) {
        return Err(KalmanError::ShapeMismatch {
            name,
            expected: (R, C),
            got: (rows.len(), row.len()),
        });
    }

    Ok(SMatrix::from_fn(|i, j| rows[i][j]))
}

fn vector<const R: usize>(
    name: &'static str,
    values: &[f64],
) -> Result<SVector<f64, R>, KalmanError> {
    if values.len() != R {
        return Err(KalmanError::ShapeMismatch {
            name,
            expected: (R, 1),
            got: (values.len(), 1),
        });
    }

    Ok(SVector::from_column_slice(values))
}
