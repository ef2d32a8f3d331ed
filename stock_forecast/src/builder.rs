//! Model builder: maps a forecast configuration onto a model and fits it
//!
//! | Config field       | Model effect                                              |
//! |--------------------|-----------------------------------------------------------|
//! | growth             | linear trend, or logistic trend saturating at the capacity |
//! | seasonality mode   | additive or multiplicative combination with the trend     |
//! | weekly, yearly     | built-in periodic components                              |
//! | monthly            | custom component, period 30.5 days, 5 harmonics           |
//! | holiday country    | one regressor per holiday of that country                 |
//!
//! Daily seasonality is always disabled.

use crate::config::{ForecastConfig, GrowthKind};
use crate::data::PreparedSeries;
use crate::error::{ForecastError, Result};
use crate::models::{AdditiveModel, ForecastModel, ModelSpec};
use crate::providers::HolidayCalendar;
use crate::settings::EngineSettings;
use chrono::{Datelike, Duration};
use tracing::{debug, info};

/// Name of the custom monthly component
pub const MONTHLY_COMPONENT: &str = "monthly";
/// Period of the monthly component in days
pub const MONTHLY_PERIOD: f64 = 30.5;
/// Harmonics of the monthly component
pub const MONTHLY_FOURIER_ORDER: usize = 5;

/// Creates untrained models from a model configuration
pub trait ModelFactory {
    type Model: ForecastModel;

    fn create(&self, spec: ModelSpec) -> Result<Self::Model>;
}

/// Trained model type produced by a factory
pub type TrainedModel<F> = <<F as ModelFactory>::Model as ForecastModel>::Trained;

/// Factory for [`AdditiveModel`]s sharing one set of engine settings
#[derive(Debug, Clone, Default)]
pub struct AdditiveModelFactory {
    settings: EngineSettings,
}

impl AdditiveModelFactory {
    pub fn new(settings: EngineSettings) -> Self {
        Self { settings }
    }
}

impl ModelFactory for AdditiveModelFactory {
    type Model = AdditiveModel;

    fn create(&self, spec: ModelSpec) -> Result<AdditiveModel> {
        AdditiveModel::new(spec, self.settings.clone())
    }
}

/// Third pipeline stage
#[derive(Debug, Clone, Copy, Default)]
pub struct ModelBuilder;

impl ModelBuilder {
    /// Model configuration for `config`, with holidays covering the history and horizon
    pub fn spec<C>(series: &PreparedSeries, config: &ForecastConfig, calendar: &C) -> Result<ModelSpec>
    where
        C: HolidayCalendar + ?Sized,
    {
        let growth = config.growth().kind();
        match (growth, series.capacity()) {
            (GrowthKind::Logistic, None) => {
                return Err(ForecastError::SequenceError(
                    "Logistic growth needs the capacity attached before fitting".to_string(),
                ))
            }
            (GrowthKind::Linear, Some(_)) => {
                return Err(ForecastError::SequenceError(
                    "Series was prepared with a capacity but growth is linear".to_string(),
                ))
            }
            _ => {}
        }

        let mut spec = ModelSpec::new(growth, config.seasonality_mode())
            .with_daily_seasonality(false)?
            .with_weekly_seasonality(config.weekly())?
            .with_yearly_seasonality(config.yearly())?;
        if config.monthly() {
            spec = spec.add_seasonality(MONTHLY_COMPONENT, MONTHLY_PERIOD, MONTHLY_FOURIER_ORDER)?;
        }

        if let Some(country) = config.holiday_country() {
            let (first, last) = match (series.timestamps().first(), series.last_timestamp()) {
                (Some(first), Some(last)) => (*first, last),
                _ => {
                    return Err(ForecastError::FitError(
                        "Cannot fit an empty series".to_string(),
                    ))
                }
            };
            let horizon_end = last + Duration::days(config.horizon_days() as i64);
            let holidays = calendar.holidays(country, first.year(), horizon_end.year())?;
            debug!(
                country = %country,
                holidays = holidays.len(),
                "Holiday regressors selected"
            );
            spec = spec.add_country_holidays(country.as_str(), holidays)?;
        }

        Ok(spec)
    }

    /// Build the model for `config` and fit it on the historical rows
    pub fn fit<F, C>(
        series: &PreparedSeries,
        config: &ForecastConfig,
        calendar: &C,
        factory: &F,
    ) -> Result<TrainedModel<F>>
    where
        F: ModelFactory + ?Sized,
        C: HolidayCalendar + ?Sized,
    {
        let spec = Self::spec(series, config, calendar)?;
        let model = factory.create(spec)?;
        let trained = model.train(series)?;
        info!(
            ticker = config.ticker(),
            model = model.name(),
            observations = series.len(),
            "Model fitted"
        );
        Ok(trained)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ConfigCollector, ConfigInput, CountryCode};
    use crate::models::Holiday;
    use chrono::NaiveDate;

    struct OneHoliday;

    impl HolidayCalendar for OneHoliday {
        fn countries(&self) -> Vec<CountryCode> {
            vec![CountryCode::new("US").unwrap()]
        }

        fn holidays(&self, _country: &CountryCode, first: i32, last: i32) -> Result<Vec<Holiday>> {
            Ok((first..=last)
                .map(|y| Holiday::new(NaiveDate::from_ymd_opt(y, 7, 4).unwrap(), "Independence Day"))
                .collect())
        }
    }

    fn config(input: ConfigInput) -> ForecastConfig {
        ConfigCollector::new(["AAPL"], OneHoliday.countries())
            .collect(&input)
            .unwrap()
    }

    fn series(capacity: Option<f64>) -> PreparedSeries {
        let start = NaiveDate::from_ymd_opt(2023, 11, 1).unwrap();
        let dates: Vec<NaiveDate> = (0..60).map(|i| start + Duration::days(i)).collect();
        let values = vec![100.0; 60];
        PreparedSeries::from_parts(dates, values, capacity.map(|c| vec![c; 60])).unwrap()
    }

    #[test]
    fn test_component_mapping() {
        let cfg = config(ConfigInput {
            weekly: true,
            monthly: true,
            yearly: false,
            ..ConfigInput::default()
        });
        let spec = ModelBuilder::spec(&series(None), &cfg, &OneHoliday).unwrap();
        assert!(spec.seasonality("weekly").is_some());
        assert!(spec.seasonality("yearly").is_none());
        assert!(spec.seasonality("daily").is_none());
        assert_eq!(spec.seasonality(MONTHLY_COMPONENT).unwrap().period(), MONTHLY_PERIOD);
        assert!(spec.holidays().is_empty());
    }

    #[test]
    fn test_holidays_cover_horizon() {
        let cfg = config(ConfigInput {
            holiday_country: "US".to_string(),
            horizon_days: 365,
            ..ConfigInput::default()
        });
        let spec = ModelBuilder::spec(&series(None), &cfg, &OneHoliday).unwrap();
        assert_eq!(spec.holiday_country(), Some("US"));
        // History in 2023, horizon reaching into 2024
        assert_eq!(spec.holidays().len(), 2);
    }

    #[test]
    fn test_logistic_without_capacity_is_sequence_error() {
        let cfg = config(ConfigInput {
            growth: "logistic".to_string(),
            capacity_multiplier: Some(1.2),
            ..ConfigInput::default()
        });
        assert!(matches!(
            ModelBuilder::spec(&series(None), &cfg, &OneHoliday),
            Err(ForecastError::SequenceError(_))
        ));
        assert!(ModelBuilder::spec(&series(Some(120.0)), &cfg, &OneHoliday).is_ok());
    }
}
