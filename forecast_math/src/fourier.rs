//! Fourier series features for periodic components

use crate::matrix::Matrix;
use crate::{MathError, Result};
use std::f64::consts::PI;

/// Build Fourier features for the given times (in days).
///
/// Columns are ordered `sin(1), cos(1), sin(2), cos(2), ...` so the output has
/// `2 * order` columns and one row per time value.
pub fn fourier_features(days: &[f64], period: f64, order: usize) -> Result<Matrix> {
    if period <= 0.0 || !period.is_finite() {
        return Err(MathError::InvalidInput(format!(
            "Period must be positive, got {}",
            period
        )));
    }
    if order == 0 {
        return Err(MathError::InvalidInput(
            "Fourier order must be at least 1".to_string(),
        ));
    }

    let cols = 2 * order;
    let mut data = Vec::with_capacity(days.len() * cols);
    for &t in days {
        for n in 1..=order {
            let angle = 2.0 * PI * n as f64 * t / period;
            data.push(angle.sin());
            data.push(angle.cos());
        }
    }
    Matrix::from_vec(days.len(), cols, data)
}
