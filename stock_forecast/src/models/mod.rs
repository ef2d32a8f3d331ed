//! Forecasting models for prepared price series
//!
//! A [`ModelSpec`] is the configuration surface of a model: growth, seasonality
//! mode, periodic components and holiday regressors. A [`ForecastModel`] trains on
//! a [`PreparedSeries`] and yields a [`TrainedForecastModel`] that can extend the
//! timeline and predict over it.

use crate::config::{GrowthKind, SeasonalityMode};
use crate::data::PreparedSeries;
use crate::error::{ForecastError, Result};
use crate::forecast::Forecast;
use crate::utils::future_dates;
use chrono::NaiveDate;
use std::fmt::Debug;

pub mod additive;
pub mod holidays;
pub mod seasonality;
mod uncertainty;

pub use additive::{AdditiveModel, TrainedAdditiveModel};
pub use holidays::Holiday;
pub use seasonality::Seasonality;

/// Configuration surface of a forecasting model
#[derive(Debug, Clone, PartialEq)]
pub struct ModelSpec {
    growth: GrowthKind,
    seasonality_mode: SeasonalityMode,
    seasonalities: Vec<Seasonality>,
    holidays: Vec<Holiday>,
    holiday_country: Option<String>,
}

impl ModelSpec {
    /// A model with only a trend
    pub fn new(growth: GrowthKind, seasonality_mode: SeasonalityMode) -> Self {
        Self {
            growth,
            seasonality_mode,
            seasonalities: Vec::new(),
            holidays: Vec::new(),
            holiday_country: None,
        }
    }

    /// Enable or disable the built-in weekly component
    pub fn with_weekly_seasonality(self, enabled: bool) -> Result<Self> {
        self.toggle(Seasonality::weekly(), enabled)
    }

    /// Enable or disable the built-in yearly component
    pub fn with_yearly_seasonality(self, enabled: bool) -> Result<Self> {
        self.toggle(Seasonality::yearly(), enabled)
    }

    /// Enable or disable the built-in daily component
    pub fn with_daily_seasonality(self, enabled: bool) -> Result<Self> {
        self.toggle(Seasonality::daily(), enabled)
    }

    /// Add a custom periodic component
    pub fn add_seasonality(mut self, name: &str, period: f64, fourier_order: usize) -> Result<Self> {
        let seasonality = Seasonality::new(name, period, fourier_order)?;
        if self.seasonalities.iter().any(|s| s.name() == seasonality.name()) {
            return Err(ForecastError::ValidationError(format!(
                "Seasonality '{}' is already configured",
                name
            )));
        }
        if seasonality.name() == holidays::HOLIDAYS_COMPONENT || seasonality.name() == "trend" {
            return Err(ForecastError::ValidationError(format!(
                "Name '{}' is reserved",
                name
            )));
        }
        self.seasonalities.push(seasonality);
        Ok(self)
    }

    /// Add one regressor per holiday of a country's calendar
    pub fn add_country_holidays(mut self, country: &str, holidays: Vec<Holiday>) -> Result<Self> {
        if self.holiday_country.is_some() {
            return Err(ForecastError::ValidationError(
                "Country holidays can only be added once".to_string(),
            ));
        }
        self.holiday_country = Some(country.to_string());
        self.holidays = holidays;
        Ok(self)
    }

    fn toggle(mut self, builtin: Seasonality, enabled: bool) -> Result<Self> {
        self.seasonalities.retain(|s| s.name() != builtin.name());
        if enabled {
            self.seasonalities.push(builtin);
        }
        Ok(self)
    }

    pub fn growth(&self) -> GrowthKind {
        self.growth
    }

    pub fn seasonality_mode(&self) -> SeasonalityMode {
        self.seasonality_mode
    }

    pub fn seasonalities(&self) -> &[Seasonality] {
        &self.seasonalities
    }

    /// Look up a configured periodic component
    pub fn seasonality(&self, name: &str) -> Option<&Seasonality> {
        self.seasonalities.iter().find(|s| s.name() == name)
    }

    pub fn holidays(&self) -> &[Holiday] {
        &self.holidays
    }

    pub fn holiday_country(&self) -> Option<&str> {
        self.holiday_country.as_deref()
    }
}

/// Timestamps to predict over, with an optional capacity per row
#[derive(Debug, Clone, PartialEq)]
pub struct Timeline {
    timestamps: Vec<NaiveDate>,
    capacity: Option<Vec<f64>>,
    history_len: usize,
}

impl Timeline {
    /// History followed by `horizon` daily timestamps past its last date
    pub fn extend(history: &[NaiveDate], horizon: usize) -> Result<Self> {
        let last = history.last().copied().ok_or_else(|| {
            ForecastError::SequenceError("Cannot extend an empty history".to_string())
        })?;
        let mut timestamps = history.to_vec();
        timestamps.extend(future_dates(last, horizon)?);
        Ok(Self {
            timestamps,
            capacity: None,
            history_len: history.len(),
        })
    }

    /// Set the same capacity on every row, historical and future
    pub fn with_capacity(mut self, capacity: f64) -> Self {
        self.capacity = Some(vec![capacity; self.timestamps.len()]);
        self
    }

    pub fn timestamps(&self) -> &[NaiveDate] {
        &self.timestamps
    }

    pub fn capacity(&self) -> Option<&[f64]> {
        self.capacity.as_deref()
    }

    /// Number of rows taken from the training history
    pub fn history_len(&self) -> usize {
        self.history_len
    }

    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }
}

/// Trained forecast model
pub trait TrainedForecastModel: Debug {
    /// Timestamps the model was trained on
    fn history_timestamps(&self) -> &[NaiveDate];

    /// Extend the training history by `horizon` calendar days
    fn make_future_timeline(&self, horizon: usize) -> Result<Timeline> {
        Timeline::extend(self.history_timestamps(), horizon)
    }

    /// Point estimates and uncertainty bounds for every row of `timeline`
    fn predict(&self, timeline: &Timeline) -> Result<Forecast>;

    /// Name of the model
    fn name(&self) -> &str;
}

/// Forecast model that can be trained on a prepared series
pub trait ForecastModel: Debug {
    /// The type of trained model produced
    type Trained: TrainedForecastModel;

    /// Train the model on a prepared series
    fn train(&self, data: &PreparedSeries) -> Result<Self::Trained>;

    /// Configuration the model was built with
    fn spec(&self) -> &ModelSpec;

    /// Get the name of the model
    fn name(&self) -> &str;
}
