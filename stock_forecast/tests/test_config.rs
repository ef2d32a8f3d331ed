use pretty_assertions::assert_eq;
use rstest::rstest;
use stock_forecast::{
    ConfigCollector, ConfigInput, CountryCode, ForecastError, Growth, Period, SeasonalityMode,
};

fn collector() -> ConfigCollector {
    ConfigCollector::new(
        ["AAPL", "MSFT", "GOOG"],
        vec![CountryCode::new("US").unwrap(), CountryCode::new("GB").unwrap()],
    )
}

fn expect_validation(input: ConfigInput) {
    match collector().collect(&input) {
        Err(ForecastError::ValidationError(_)) => assert!(true),
        other => panic!("Expected ValidationError, got {:?}", other),
    }
}

#[test]
fn test_full_configuration() {
    let config = collector()
        .collect(&ConfigInput {
            ticker: " msft ".to_string(),
            period: "5y".to_string(),
            horizon_days: 180,
            growth: "logistic".to_string(),
            capacity_multiplier: Some(1.5),
            seasonality_mode: "multiplicative".to_string(),
            weekly: false,
            monthly: true,
            yearly: false,
            holiday_country: "gb".to_string(),
        })
        .unwrap();

    assert_eq!(config.ticker(), "MSFT");
    assert_eq!(config.period(), Period::FiveYears);
    assert_eq!(config.horizon_days(), 180);
    assert_eq!(
        config.growth(),
        Growth::Logistic {
            capacity_multiplier: 1.5
        }
    );
    assert_eq!(config.seasonality_mode(), SeasonalityMode::Multiplicative);
    assert!(!config.weekly());
    assert!(config.monthly());
    assert!(!config.yearly());
    assert_eq!(config.holiday_country().map(|c| c.as_str()), Some("GB"));
}

#[rstest]
#[case(1)]
#[case(365)]
fn test_horizon_bounds_accepted(#[case] horizon_days: i64) {
    let config = collector()
        .collect(&ConfigInput {
            horizon_days,
            ..ConfigInput::default()
        })
        .unwrap();
    assert_eq!(config.horizon_days(), horizon_days as usize);
}

#[rstest]
#[case(0)]
#[case(366)]
fn test_horizon_bounds_rejected(#[case] horizon_days: i64) {
    expect_validation(ConfigInput {
        horizon_days,
        ..ConfigInput::default()
    });
}

#[rstest]
#[case(0.99)]
#[case(2.01)]
#[case(f64::NAN)]
fn test_capacity_multiplier_out_of_range(#[case] multiplier: f64) {
    expect_validation(ConfigInput {
        growth: "logistic".to_string(),
        capacity_multiplier: Some(multiplier),
        ..ConfigInput::default()
    });
}

#[test]
fn test_logistic_requires_multiplier() {
    expect_validation(ConfigInput {
        growth: "logistic".to_string(),
        capacity_multiplier: None,
        ..ConfigInput::default()
    });
}

#[rstest]
#[case("ticker", "")]
#[case("ticker", "TSLA")]
#[case("period", "3y")]
#[case("growth", "exponential")]
#[case("mode", "additive-ish")]
#[case("country", "JP")]
fn test_invalid_choices(#[case] field: &str, #[case] value: &str) {
    let mut input = ConfigInput::default();
    match field {
        "ticker" => input.ticker = value.to_string(),
        "period" => input.period = value.to_string(),
        "growth" => input.growth = value.to_string(),
        "mode" => input.seasonality_mode = value.to_string(),
        "country" => input.holiday_country = value.to_string(),
        _ => unreachable!(),
    }
    expect_validation(input);
}

#[rstest]
#[case("6mo", Period::SixMonths)]
#[case("1y", Period::OneYear)]
#[case("2y", Period::TwoYears)]
#[case("10y", Period::TenYears)]
#[case("max", Period::Max)]
fn test_every_period_accepted(#[case] raw: &str, #[case] expected: Period) {
    let config = collector()
        .collect(&ConfigInput {
            period: raw.to_string(),
            ..ConfigInput::default()
        })
        .unwrap();
    assert_eq!(config.period(), expected);
    assert_eq!(expected.to_string(), raw);
}

#[test]
fn test_none_disables_holidays() {
    for raw in ["None", "none", ""] {
        let config = collector()
            .collect(&ConfigInput {
                holiday_country: raw.to_string(),
                ..ConfigInput::default()
            })
            .unwrap();
        assert!(config.holiday_country().is_none());
    }
}

#[test]
fn test_config_input_from_partial_json() {
    let input: ConfigInput = serde_json::from_str(r#"{"ticker": "GOOG", "horizon_days": 30}"#).unwrap();
    assert_eq!(input.ticker, "GOOG");
    assert_eq!(input.horizon_days, 30);
    assert_eq!(input.period, "2y");
    assert!(input.weekly && input.monthly && input.yearly);
}
