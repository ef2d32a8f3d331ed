mod common;

use approx::assert_relative_eq;
use chrono::NaiveDate;
use common::{fast_settings, trading_days, two_year_history};
use stock_forecast::models::seasonality::{WEEKLY_PERIOD, YEARLY_PERIOD};
use stock_forecast::{
    AdditiveModel, AdditiveModelFactory, BuiltinCalendar, ConfigCollector, ConfigInput,
    CountryCode, Forecast, ForecastConfig, ForecastError, ForecastModel, ForecastProjector, GrowthKind,
    ModelBuilder, ModelSpec, PreparedSeries, SeasonalityMode, SeriesPreparer, Timeline,
    TrainedForecastModel,
};

fn config(input: ConfigInput) -> ForecastConfig {
    ConfigCollector::new(["AAPL"], vec![CountryCode::new("US").unwrap()])
        .collect(&input)
        .unwrap()
}

fn prepared(input: &ConfigInput) -> (PreparedSeries, ForecastConfig) {
    let config = config(input.clone());
    let prepared = SeriesPreparer::prepare(&two_year_history(150.0), &config).unwrap();
    (prepared, config)
}

fn factory() -> AdditiveModelFactory {
    AdditiveModelFactory::new(fast_settings().engine)
}

#[test]
fn test_spec_maps_configuration() {
    let input = ConfigInput {
        growth: "logistic".to_string(),
        seasonality_mode: "multiplicative".to_string(),
        weekly: true,
        monthly: true,
        yearly: false,
        holiday_country: "US".to_string(),
        ..ConfigInput::default()
    };
    let (prepared, config) = prepared(&input);
    let spec = ModelBuilder::spec(&prepared, &config, &BuiltinCalendar).unwrap();

    assert_eq!(spec.growth(), GrowthKind::Logistic);
    assert_eq!(spec.seasonality_mode(), SeasonalityMode::Multiplicative);
    assert_eq!(spec.seasonality("weekly").unwrap().period(), WEEKLY_PERIOD);
    assert!(spec.seasonality("yearly").is_none());
    assert!(spec.seasonality("daily").is_none());
    assert_eq!(spec.seasonality("monthly").unwrap().period(), 30.5);
    assert_eq!(spec.seasonality("monthly").unwrap().fourier_order(), 5);
    assert_eq!(spec.holiday_country(), Some("US"));

    // Holidays cover the history through the end of the horizon
    let last = spec.holidays().iter().map(|h| h.date).max().unwrap();
    assert!(last >= NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());
}

#[test]
fn test_capacity_mismatch_is_a_sequence_error() {
    let (linear_series, _) = prepared(&ConfigInput::default());
    let logistic = config(ConfigInput {
        growth: "logistic".to_string(),
        ..ConfigInput::default()
    });

    match ModelBuilder::spec(&linear_series, &logistic, &BuiltinCalendar) {
        Err(ForecastError::SequenceError(_)) => assert!(true),
        other => panic!("Expected SequenceError, got {:?}", other),
    }

    let (logistic_series, _) = prepared(&ConfigInput {
        growth: "logistic".to_string(),
        ..ConfigInput::default()
    });
    let linear = config(ConfigInput::default());
    assert!(matches!(
        ModelBuilder::spec(&logistic_series, &linear, &BuiltinCalendar),
        Err(ForecastError::SequenceError(_))
    ));
}

#[test]
fn test_fit_and_project() {
    let input = ConfigInput {
        horizon_days: 90,
        ..ConfigInput::default()
    };
    let (prepared, config) = prepared(&input);
    let model = ModelBuilder::fit(&prepared, &config, &BuiltinCalendar, &factory()).unwrap();

    assert_eq!(model.history_timestamps(), prepared.timestamps());
    assert!(model.residual_scale() > 0.0);

    let forecast = ForecastProjector::project(&model, 90, None).unwrap();
    assert_eq!(forecast.len(), prepared.len() + 90);
    assert_eq!(forecast.history_len(), prepared.len());

    // In-sample estimates should track a smooth series closely
    let history_rows = &forecast.rows()[..prepared.len()];
    let mean_error: f64 = history_rows
        .iter()
        .zip(prepared.values())
        .map(|(row, y)| (row.estimate - y).abs())
        .sum::<f64>()
        / prepared.len() as f64;
    assert!(mean_error < 2.0, "mean absolute error {}", mean_error);

    // The series rises steadily, so the trend keeps rising past the history
    let future = forecast.future_rows();
    assert!(future.last().unwrap().trend > future.first().unwrap().trend);
}

#[test]
fn test_logistic_projection_is_bounded() {
    let input = ConfigInput {
        growth: "logistic".to_string(),
        capacity_multiplier: Some(1.1),
        horizon_days: 365,
        ..ConfigInput::default()
    };
    let (prepared, config) = prepared(&input);
    let cap = prepared.capacity_value().unwrap();
    assert_relative_eq!(cap, 165.0, epsilon = 1e-9);

    let model = ModelBuilder::fit(&prepared, &config, &BuiltinCalendar, &factory()).unwrap();
    let forecast = ForecastProjector::project(&model, 365, Some(cap)).unwrap();

    for row in forecast.rows() {
        assert!(row.trend > 0.0 && row.trend < cap);
        assert_eq!(row.capacity, Some(cap));
    }
}

#[test]
fn test_logistic_prediction_needs_capacity() {
    let input = ConfigInput {
        growth: "logistic".to_string(),
        ..ConfigInput::default()
    };
    let (prepared, config) = prepared(&input);
    let model = ModelBuilder::fit(&prepared, &config, &BuiltinCalendar, &factory()).unwrap();

    let timeline = Timeline::extend(prepared.timestamps(), 10).unwrap();
    match model.predict(&timeline) {
        Err(ForecastError::ForecastingError(_)) => assert!(true),
        other => panic!("Expected ForecastingError, got {:?}", other.map(|f| f.len())),
    }
}

#[test]
fn test_future_timeline_is_daily() {
    let (prepared, config) = prepared(&ConfigInput::default());
    let model = ModelBuilder::fit(&prepared, &config, &BuiltinCalendar, &factory()).unwrap();

    let timeline = model.make_future_timeline(7).unwrap();
    assert_eq!(timeline.len(), prepared.len() + 7);
    assert_eq!(timeline.history_len(), prepared.len());

    let future = &timeline.timestamps()[prepared.len()..];
    let last = prepared.last_timestamp().unwrap();
    for (i, date) in future.iter().enumerate() {
        assert_eq!((*date - last).num_days(), i as i64 + 1);
    }
}

#[test]
fn test_training_needs_two_observations() {
    let spec = ModelSpec::new(GrowthKind::Linear, SeasonalityMode::Additive);
    let model = AdditiveModel::new(spec, fast_settings().engine).unwrap();
    let series = PreparedSeries::from_parts(
        vec![NaiveDate::from_ymd_opt(2024, 1, 2).unwrap()],
        vec![100.0],
        None,
    )
    .unwrap();

    match model.train(&series) {
        Err(ForecastError::FitError(_)) => assert!(true),
        other => panic!("Expected FitError, got {:?}", other.map(|m| m.residual_scale())),
    }
}

#[test]
fn test_yearly_component_period() {
    let (prepared, config) = prepared(&ConfigInput::default());
    let model = ModelBuilder::fit(&prepared, &config, &BuiltinCalendar, &factory()).unwrap();
    let forecast = ForecastProjector::project(&model, 30, None).unwrap();

    let yearly = forecast.component("yearly").unwrap();
    assert_eq!(yearly.period_days(), Some(YEARLY_PERIOD));
    assert_eq!(yearly.values().len(), forecast.len());
}

fn declining_fit(input: &ConfigInput, horizon: usize) -> (PreparedSeries, Forecast) {
    let config = config(input.clone());
    let history = trading_days(NaiveDate::from_ymd_opt(2022, 1, 3).unwrap(), 500, 300.0, 150.0);
    let prepared = SeriesPreparer::prepare(&history, &config).unwrap();
    let model = ModelBuilder::fit(&prepared, &config, &BuiltinCalendar, &factory()).unwrap();
    let forecast = ForecastProjector::project(&model, horizon, prepared.capacity_value()).unwrap();
    (prepared, forecast)
}

fn rmse_below(prepared: &PreparedSeries, forecast: &Forecast, limit: f64) -> f64 {
    let errors: Vec<f64> = forecast.rows()[..prepared.len()]
        .iter()
        .zip(prepared.values())
        .filter(|(_, y)| **y < limit)
        .map(|(row, y)| (row.estimate - y).powi(2))
        .collect();
    (errors.iter().sum::<f64>() / errors.len() as f64).sqrt()
}

#[test]
fn test_logistic_tracks_history_above_capacity() {
    // 300 -> 150 with a 1.2 multiplier puts most of the history above the 180 cap
    let base = ConfigInput {
        weekly: false,
        monthly: false,
        yearly: false,
        horizon_days: 90,
        ..ConfigInput::default()
    };
    let logistic_input = ConfigInput {
        growth: "logistic".to_string(),
        capacity_multiplier: Some(1.2),
        ..base.clone()
    };

    let (prepared, linear) = declining_fit(&base, 90);
    let (capped, logistic) = declining_fit(&logistic_input, 90);
    assert_relative_eq!(capped.capacity_value().unwrap(), 180.0, epsilon = 1e-9);

    let last = prepared.len() - 1;
    let fit_last = logistic.rows()[last].estimate;
    assert!((fit_last - 150.0).abs() < 10.0, "last fitted value {}", fit_last);
    assert!((linear.rows()[last].estimate - 150.0).abs() < 2.0);

    let linear_rmse = rmse_below(&prepared, &linear, 180.0);
    let logistic_rmse = rmse_below(&prepared, &logistic, 180.0);
    assert!(linear_rmse < 2.0, "linear rmse {}", linear_rmse);
    assert!(logistic_rmse < 10.0, "logistic rmse {}", logistic_rmse);

    for row in logistic.rows() {
        assert!(row.estimate >= 0.0, "{:?}", row);
        assert!(row.trend <= 180.0 + 1e-6);
    }
}

#[test]
fn test_logistic_with_holidays_stays_non_negative() {
    let input = ConfigInput {
        growth: "logistic".to_string(),
        capacity_multiplier: Some(1.2),
        weekly: false,
        monthly: false,
        yearly: false,
        holiday_country: "US".to_string(),
        horizon_days: 365,
        ..ConfigInput::default()
    };
    let (prepared, forecast) = declining_fit(&input, 365);

    assert_eq!(forecast.len(), prepared.len() + 365);
    for row in forecast.rows() {
        assert!(row.estimate >= 0.0, "{:?}", row);
        assert!(row.trend > 0.0);
    }
}
