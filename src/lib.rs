//! # Stock Forecast Workspace
//!
//! Umbrella crate re-exporting the forecasting pipeline and its numerical core.
//!
//! ## Example
//!
//! ```
//! use stock_forecast_workspace::pipeline::{ConfigCollector, ConfigInput, CountryCode};
//!
//! let collector = ConfigCollector::new(["AAPL"], vec![CountryCode::new("US").unwrap()]);
//! let config = collector.collect(&ConfigInput::default()).unwrap();
//! assert_eq!(config.ticker(), "AAPL");
//! assert_eq!(config.horizon_days(), 90);
//! ```

/// The four-stage forecasting pipeline and its collaborators
pub use stock_forecast as pipeline;

/// Matrices, ridge regression, Fourier terms and trend curves
pub use forecast_math as math;

/// Pipeline crate name and version
pub fn pipeline_version() -> String {
    format!("{} {}", stock_forecast::NAME, stock_forecast::VERSION)
}
