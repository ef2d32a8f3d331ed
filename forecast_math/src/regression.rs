//! Penalized least squares regression
//!
//! Solves `min ||y - X b||^2 + sum_j penalty_j * b_j^2` through the normal
//! equations. A zero penalty leaves a coefficient unregularized (intercepts).

use crate::matrix::{cholesky_solve, Matrix};
use crate::{MathError, Result};

/// Ridge regression with one penalty per design column
#[derive(Debug, Clone)]
pub struct RidgeRegression {
    penalties: Vec<f64>,
}

impl RidgeRegression {
    /// Create a new ridge regression with per-column penalties
    pub fn new(penalties: Vec<f64>) -> Result<Self> {
        if let Some(bad) = penalties.iter().find(|p| !p.is_finite() || **p < 0.0) {
            return Err(MathError::InvalidInput(format!(
                "Penalties must be finite and non-negative, got {}",
                bad
            )));
        }
        Ok(Self { penalties })
    }

    /// Penalty for a Gaussian prior with standard deviation `prior_scale`,
    /// relative to an observation noise of standard deviation `noise_scale`
    pub fn prior_penalty(noise_scale: f64, prior_scale: f64) -> Result<f64> {
        if prior_scale <= 0.0 || !prior_scale.is_finite() {
            return Err(MathError::InvalidInput(format!(
                "Prior scale must be positive, got {}",
                prior_scale
            )));
        }
        Ok((noise_scale / prior_scale).powi(2))
    }

    /// Per-column penalties
    pub fn penalties(&self) -> &[f64] {
        &self.penalties
    }

    /// Fit coefficients for design `x` and target `y`
    pub fn fit(&self, x: &Matrix, y: &[f64]) -> Result<Vec<f64>> {
        if x.cols() != self.penalties.len() {
            return Err(MathError::DimensionMismatch {
                expected: self.penalties.len(),
                actual: x.cols(),
            });
        }
        if x.rows() != y.len() {
            return Err(MathError::DimensionMismatch {
                expected: x.rows(),
                actual: y.len(),
            });
        }
        if x.rows() == 0 {
            return Err(MathError::InsufficientData(
                "Cannot fit a regression without observations".to_string(),
            ));
        }
        if x.cols() == 0 {
            return Ok(Vec::new());
        }
        if y.iter().any(|v| !v.is_finite()) {
            return Err(MathError::InvalidInput(
                "Regression target contains non-finite values".to_string(),
            ));
        }

        let mut normal = x.gram();
        for (j, penalty) in self.penalties.iter().enumerate() {
            normal.set(j, j, normal.get(j, j) + penalty);
        }
        let rhs = x.transpose_mul_vec(y)?;
        let beta = cholesky_solve(&normal, &rhs)?;

        if beta.iter().any(|b| !b.is_finite()) {
            return Err(MathError::CalculationError(
                "Regression produced non-finite coefficients".to_string(),
            ));
        }
        Ok(beta)
    }
}
