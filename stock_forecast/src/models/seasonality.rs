//! Periodic components expressed as truncated Fourier series

use crate::error::{ForecastError, Result};
use crate::utils::epoch_days;
use chrono::NaiveDate;
use forecast_math::fourier::fourier_features;
use forecast_math::Matrix;
use serde::Serialize;

/// Period of the weekly component in days
pub const WEEKLY_PERIOD: f64 = 7.0;
/// Period of the yearly component in days
pub const YEARLY_PERIOD: f64 = 365.25;
/// Period of the daily component in days
pub const DAILY_PERIOD: f64 = 1.0;

/// A named periodic component
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Seasonality {
    name: String,
    period: f64,
    fourier_order: usize,
}

impl Seasonality {
    /// Create a component with `fourier_order` sine/cosine pairs
    pub fn new(name: &str, period: f64, fourier_order: usize) -> Result<Self> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ForecastError::ValidationError(
                "Seasonality name cannot be empty".to_string(),
            ));
        }
        if !(period > 0.0 && period.is_finite()) {
            return Err(ForecastError::ValidationError(format!(
                "Seasonality period must be positive, got {}",
                period
            )));
        }
        if fourier_order == 0 {
            return Err(ForecastError::ValidationError(
                "Fourier order must be at least 1".to_string(),
            ));
        }
        Ok(Self {
            name: name.to_string(),
            period,
            fourier_order,
        })
    }

    pub fn weekly() -> Self {
        Self::builtin("weekly", WEEKLY_PERIOD, 3)
    }

    pub fn yearly() -> Self {
        Self::builtin("yearly", YEARLY_PERIOD, 10)
    }

    pub fn daily() -> Self {
        Self::builtin("daily", DAILY_PERIOD, 4)
    }

    fn builtin(name: &str, period: f64, fourier_order: usize) -> Self {
        Self {
            name: name.to_string(),
            period,
            fourier_order,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Period in days
    pub fn period(&self) -> f64 {
        self.period
    }

    pub fn fourier_order(&self) -> usize {
        self.fourier_order
    }

    /// Number of design columns
    pub fn width(&self) -> usize {
        2 * self.fourier_order
    }

    /// Fourier design over calendar days since the Unix epoch
    pub fn features(&self, dates: &[NaiveDate]) -> Result<Matrix> {
        let days: Vec<f64> = dates.iter().map(|d| epoch_days(*d) as f64).collect();
        Ok(fourier_features(&days, self.period, self.fourier_order)?)
    }
}
