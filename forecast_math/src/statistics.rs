//! Summary statistics over plain slices

use crate::{MathError, Result};

/// Arithmetic mean
pub fn mean(values: &[f64]) -> Result<f64> {
    if values.is_empty() {
        return Err(MathError::InsufficientData(
            "Cannot take the mean of an empty slice".to_string(),
        ));
    }
    Ok(values.iter().sum::<f64>() / values.len() as f64)
}

/// Population standard deviation
pub fn std_dev(values: &[f64]) -> Result<f64> {
    let mu = mean(values)?;
    let variance = values.iter().map(|v| (v - mu).powi(2)).sum::<f64>() / values.len() as f64;
    Ok(variance.sqrt())
}

/// Largest absolute value, used to scale a series into `[-1, 1]`
pub fn abs_max(values: &[f64]) -> Result<f64> {
    values
        .iter()
        .map(|v| v.abs())
        .fold(None, |acc: Option<f64>, v| Some(acc.map_or(v, |a| a.max(v))))
        .ok_or_else(|| MathError::InsufficientData("Cannot scale an empty slice".to_string()))
}
