//! # Forecast Math
//!
//! Numerical building blocks for additive time series regression.
//! This crate provides the dense linear algebra, Fourier seasonality terms,
//! piecewise trends and summary statistics used by the forecasting engine.

use thiserror::Error;

pub mod fourier;
pub mod matrix;
pub mod regression;
pub mod statistics;
pub mod trend;

pub use matrix::Matrix;
pub use regression::RidgeRegression;

/// Errors that can occur in numerical calculations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MathError {
    #[error("Insufficient data for calculation: {0}")]
    InsufficientData(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Calculation error: {0}")]
    CalculationError(String),
}

/// Result type for numerical operations
pub type Result<T> = std::result::Result<T, MathError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = MathError::DimensionMismatch {
            expected: 3,
            actual: 2,
        };
        assert_eq!(err.to_string(), "Dimension mismatch: expected 3, got 2");
    }
}
