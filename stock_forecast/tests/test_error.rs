use forecast_math::MathError;
use std::io;
use stock_forecast::{ErrorKind, ForecastError};

#[test]
fn test_error_display() {
    let err = ForecastError::ValidationError("Horizon must be between 1 and 365 days".to_string());
    assert!(err.to_string().contains("Validation error"));
    assert!(err.to_string().contains("Horizon"));

    let err = ForecastError::NotFoundError("No data for 'ZZZZ'".to_string());
    assert!(err.to_string().contains("Not found"));

    let err = ForecastError::InsufficientDataError("1 row".to_string());
    assert!(err.to_string().contains("Insufficient data"));

    let err = ForecastError::FitError("singular system".to_string());
    assert!(err.to_string().contains("Fit error"));

    let err = ForecastError::SequenceError("fit called before prepare".to_string());
    assert!(err.to_string().contains("Sequence error"));
}

#[test]
fn test_error_conversion() {
    let io_error = io::Error::new(io::ErrorKind::NotFound, "file not found");
    let err: ForecastError = io_error.into();
    match err {
        ForecastError::IoError(_) => assert!(true),
        _ => panic!("Expected IoError"),
    }

    let math_error = MathError::InsufficientData("empty".to_string());
    let err: ForecastError = math_error.into();
    match err {
        ForecastError::MathError(_) => assert!(true),
        _ => panic!("Expected MathError"),
    }

    let json_error = serde_json::from_str::<Vec<String>>("not json").unwrap_err();
    let err: ForecastError = json_error.into();
    match err {
        ForecastError::DataError(msg) => assert!(msg.contains("JSON")),
        _ => panic!("Expected DataError"),
    }
}

#[test]
fn test_error_kinds() {
    let cases = [
        (ForecastError::ValidationError(String::new()), ErrorKind::Validation),
        (ForecastError::ConfigError(String::new()), ErrorKind::Validation),
        (ForecastError::NotFoundError(String::new()), ErrorKind::DataUnavailable),
        (ForecastError::InsufficientDataError(String::new()), ErrorKind::DataUnavailable),
        (ForecastError::FitError(String::new()), ErrorKind::Model),
        (ForecastError::ForecastingError(String::new()), ErrorKind::Model),
        (ForecastError::ProviderError(String::new()), ErrorKind::Environment),
        (ForecastError::DataError(String::new()), ErrorKind::Environment),
        (ForecastError::SequenceError(String::new()), ErrorKind::Defect),
    ];
    for (err, kind) in cases {
        assert_eq!(err.kind(), kind, "{:?}", err);
    }
}

#[test]
fn test_only_sequence_errors_are_unrecoverable() {
    assert!(!ForecastError::SequenceError("project called before fit".to_string()).is_recoverable());
    assert!(ForecastError::FitError("diverged".to_string()).is_recoverable());
    assert!(ForecastError::NotFoundError("ZZZZ".to_string()).is_data_unavailable());
    assert!(!ForecastError::ValidationError("bad".to_string()).is_data_unavailable());
}
