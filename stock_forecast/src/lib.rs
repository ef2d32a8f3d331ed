//! # Stock Forecast
//!
//! Configure, fit and project additive regression forecasts for daily stock prices.
//!
//! ## Pipeline
//!
//! 1. **Configuration Collector** ([`ConfigCollector`]): validates raw input into a
//!    [`ForecastConfig`]
//! 2. **Series Preparer** ([`SeriesPreparer`]): reshapes closing prices into the
//!    `(ds, y[, cap])` schema, attaching the logistic capacity
//! 3. **Model Builder** ([`ModelBuilder`]): maps growth, seasonality mode, periodic
//!    components and holiday regressors onto a model and fits it
//! 4. **Forecast Projector** ([`ForecastProjector`]): extends the timeline by the
//!    horizon and predicts point estimates with uncertainty bounds
//!
//! Market data, the ticker universe and holiday calendars sit behind the
//! [`MarketDataProvider`], [`TickerUniverse`] and [`HolidayCalendar`] traits.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use stock_forecast::{
//!     AdditiveModelFactory, BuiltinCalendar, CachedMarketData, ConfigInput, DumbStockApi,
//!     ForecastPipeline, Settings, YahooFinance,
//! };
//!
//! # fn main() -> stock_forecast::Result<()> {
//! let settings = Settings::load(None)?;
//! let pipeline = ForecastPipeline::new(
//!     CachedMarketData::new(YahooFinance::new(&settings.providers)?),
//!     DumbStockApi::new(&settings.providers)?,
//!     BuiltinCalendar,
//!     AdditiveModelFactory::new(settings.engine.clone()),
//!     settings,
//! );
//!
//! let config = pipeline.collect(&ConfigInput {
//!     ticker: "AAPL".to_string(),
//!     horizon_days: 90,
//!     ..ConfigInput::default()
//! })?;
//! let report = pipeline.run(config)?;
//! for row in report.forecast.future_rows().iter().take(5) {
//!     println!("{} {:.2} [{:.2}, {:.2}]", row.timestamp, row.estimate, row.lower, row.upper);
//! }
//! # Ok(())
//! # }
//! ```

pub mod builder;
pub mod cache;
pub mod config;
pub mod data;
pub mod error;
pub mod forecast;
pub mod models;
pub mod pipeline;
pub mod projector;
pub mod providers;
pub mod settings;
pub mod utils;

// Re-export commonly used types
pub use crate::builder::{AdditiveModelFactory, ModelBuilder, ModelFactory};
pub use crate::cache::{CachedMarketData, CachedUniverse, FitCache};
pub use crate::config::{
    ConfigCollector, ConfigInput, CountryCode, ForecastConfig, Growth, GrowthKind, Period,
    SeasonalityMode,
};
pub use crate::data::{DataLoader, PreparedSeries, PriceBar, PriceSeries, SeriesPreparer};
pub use crate::error::{ErrorKind, ForecastError, Result};
pub use crate::forecast::{Forecast, ForecastComponent, ForecastRow};
pub use crate::models::{AdditiveModel, ForecastModel, ModelSpec, Timeline, TrainedForecastModel};
pub use crate::pipeline::{ForecastPipeline, ForecastReport, ForecastRun};
pub use crate::projector::ForecastProjector;
pub use crate::providers::{
    BuiltinCalendar, CsvMarketData, DumbStockApi, HolidayCalendar, MarketDataProvider,
    StaticUniverse, TickerMetadata, TickerUniverse, YahooFinance,
};
pub use crate::settings::Settings;

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");
