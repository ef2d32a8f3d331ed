//! Forecast projector: extends a fitted model's timeline and predicts over it

use crate::error::{ForecastError, Result};
use crate::forecast::Forecast;
use crate::models::TrainedForecastModel;
use tracing::info;

/// Fourth pipeline stage
#[derive(Debug, Clone, Copy, Default)]
pub struct ForecastProjector;

impl ForecastProjector {
    /// Predict every historical row plus `horizon_days` calendar days past the last
    /// observed date. Under logistic growth `capacity` is attached to every row.
    pub fn project<T>(model: &T, horizon_days: usize, capacity: Option<f64>) -> Result<Forecast>
    where
        T: TrainedForecastModel + ?Sized,
    {
        let timeline = model.make_future_timeline(horizon_days)?;
        let timeline = match capacity {
            Some(cap) => timeline.with_capacity(cap),
            None => timeline,
        };

        let forecast = model.predict(&timeline)?;
        if forecast.len() != timeline.len() {
            return Err(ForecastError::ForecastingError(format!(
                "Model returned {} rows for a timeline of {}",
                forecast.len(),
                timeline.len()
            )));
        }

        info!(
            model = model.name(),
            rows = forecast.len(),
            horizon_days = horizon_days,
            "Forecast projected"
        );
        Ok(forecast)
    }
}
