//! Error types for the stock_forecast crate

use polars::prelude::PolarsError;
use thiserror::Error;

/// Custom error types for the stock_forecast crate
#[derive(Debug, Error)]
pub enum ForecastError {
    /// User input outside its declared domain
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// The market data provider has no series for the request
    #[error("Not found: {0}")]
    NotFoundError(String),

    /// The series is too short to be forecast
    #[error("Insufficient data: {0}")]
    InsufficientDataError(String),

    /// Model fitting failed or did not converge
    #[error("Fit error: {0}")]
    FitError(String),

    /// A pipeline stage ran before the stages it depends on
    #[error("Sequence error: {0}")]
    SequenceError(String),

    /// Error related to data validation or processing
    #[error("Data error: {0}")]
    DataError(String),

    /// Error raised while producing predictions from a fitted model
    #[error("Forecasting error: {0}")]
    ForecastingError(String),

    /// Error reported by an external collaborator (HTTP, remote API)
    #[error("Provider error: {0}")]
    ProviderError(String),

    /// Error loading settings
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Error from numerical routines
    #[error("Math error: {0}")]
    MathError(#[from] forecast_math::MathError),

    /// Error from IO operations
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// Error from Polars operations
    #[error("Polars error: {0}")]
    PolarsError(String),
}

/// Result type with our custom error
pub type Result<T> = std::result::Result<T, ForecastError>;

/// Coarse classification used to decide how an interaction reacts to an error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Bad user input, prompt again
    Validation,
    /// No usable series for the ticker and period
    DataUnavailable,
    /// The model could not be fitted or evaluated
    Model,
    /// External systems or local files failed
    Environment,
    /// Stages were wired in the wrong order
    Defect,
}

impl ForecastError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ForecastError::ValidationError(_) | ForecastError::ConfigError(_) => {
                ErrorKind::Validation
            }
            ForecastError::NotFoundError(_) | ForecastError::InsufficientDataError(_) => {
                ErrorKind::DataUnavailable
            }
            ForecastError::FitError(_)
            | ForecastError::ForecastingError(_)
            | ForecastError::MathError(_) => ErrorKind::Model,
            ForecastError::DataError(_)
            | ForecastError::ProviderError(_)
            | ForecastError::IoError(_)
            | ForecastError::PolarsError(_) => ErrorKind::Environment,
            ForecastError::SequenceError(_) => ErrorKind::Defect,
        }
    }

    /// Whether the interaction can continue after showing a warning.
    ///
    /// Sequence errors are wiring defects, everything else degrades to an idle state.
    pub fn is_recoverable(&self) -> bool {
        self.kind() != ErrorKind::Defect
    }

    /// Whether the error means no usable series exists for the request
    pub fn is_data_unavailable(&self) -> bool {
        self.kind() == ErrorKind::DataUnavailable
    }
}

impl From<PolarsError> for ForecastError {
    fn from(err: PolarsError) -> Self {
        ForecastError::PolarsError(err.to_string())
    }
}

impl From<csv::Error> for ForecastError {
    fn from(err: csv::Error) -> Self {
        ForecastError::DataError(format!("CSV error: {}", err))
    }
}

impl From<serde_json::Error> for ForecastError {
    fn from(err: serde_json::Error) -> Self {
        ForecastError::DataError(format!("JSON error: {}", err))
    }
}

impl From<reqwest::Error> for ForecastError {
    fn from(err: reqwest::Error) -> Self {
        ForecastError::ProviderError(err.to_string())
    }
}
