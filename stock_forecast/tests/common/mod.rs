#![allow(dead_code)]

use chrono::{Duration, NaiveDate};
use std::cell::Cell;
use std::collections::HashMap;
use stock_forecast::error::{ForecastError, Result};
use stock_forecast::settings::EngineSettings;
use stock_forecast::{
    AdditiveModelFactory, BuiltinCalendar, ForecastPipeline, MarketDataProvider, Period,
    PriceBar, PriceSeries, Settings, StaticUniverse, TickerMetadata, TickerUniverse,
};

/// Daily bars, weekends skipped, with a gentle trend and a weekly ripple
pub fn trading_days(start: NaiveDate, count: usize, first_close: f64, last_close: f64) -> PriceSeries {
    let mut bars = Vec::with_capacity(count);
    let mut date = start;
    let step = if count > 1 {
        (last_close - first_close) / (count - 1) as f64
    } else {
        0.0
    };
    while bars.len() < count {
        use chrono::Datelike;
        if date.weekday().number_from_monday() <= 5 {
            let i = bars.len();
            let close = if i + 1 == count {
                last_close
            } else {
                first_close + step * i as f64 + (i % 5) as f64 * 0.3
            };
            bars.push(PriceBar {
                date,
                open: close - 0.5,
                high: close + 1.0,
                low: close - 1.0,
                close,
                volume: 1_000_000 + i as u64,
            });
        }
        date += Duration::days(1);
    }
    PriceSeries::new(bars).unwrap()
}

pub fn two_year_history(last_close: f64) -> PriceSeries {
    trading_days(NaiveDate::from_ymd_opt(2022, 1, 3).unwrap(), 500, 120.0, last_close)
}

/// In-memory market data counting its fetches
#[derive(Default)]
pub struct FakeMarket {
    series: HashMap<String, PriceSeries>,
    pub fetches: Cell<usize>,
}

impl FakeMarket {
    pub fn with(mut self, ticker: &str, series: PriceSeries) -> Self {
        self.series.insert(ticker.to_string(), series);
        self
    }
}

impl MarketDataProvider for FakeMarket {
    fn price_history(&self, ticker: &str, period: Period) -> Result<PriceSeries> {
        self.fetches.set(self.fetches.get() + 1);
        self.series
            .get(ticker)
            .map(|s| s.trim_to_period(period))
            .ok_or_else(|| ForecastError::NotFoundError(format!("No data for '{}'", ticker)))
    }

    fn metadata(&self, ticker: &str) -> Result<TickerMetadata> {
        if self.series.contains_key(ticker) {
            Ok(TickerMetadata::new(
                Some(format!("{} Corp.", ticker)),
                None,
            ))
        } else {
            Err(ForecastError::ProviderError("metadata service down".to_string()))
        }
    }

    fn name(&self) -> &str {
        "fake"
    }
}

/// Universe that always fails
pub struct FailingUniverse;

impl TickerUniverse for FailingUniverse {
    fn tickers(&self) -> Result<Vec<String>> {
        Err(ForecastError::ProviderError("connection refused".to_string()))
    }
}

/// Fixed universe counting its fetches
pub struct CountingUniverse {
    tickers: Vec<String>,
    pub fetches: Cell<usize>,
}

impl CountingUniverse {
    pub fn new(tickers: &[&str]) -> Self {
        Self {
            tickers: tickers.iter().map(|t| t.to_string()).collect(),
            fetches: Cell::new(0),
        }
    }
}

impl TickerUniverse for CountingUniverse {
    fn tickers(&self) -> Result<Vec<String>> {
        self.fetches.set(self.fetches.get() + 1);
        Ok(self.tickers.clone())
    }
}

pub fn fast_settings() -> Settings {
    Settings {
        engine: EngineSettings {
            uncertainty_samples: 100,
            ..EngineSettings::default()
        },
        ..Settings::default()
    }
}

pub type TestPipeline = ForecastPipeline<FakeMarket, StaticUniverse, BuiltinCalendar, AdditiveModelFactory>;

pub fn pipeline(market: FakeMarket, universe: &[&str]) -> TestPipeline {
    let settings = fast_settings();
    ForecastPipeline::new(
        market,
        StaticUniverse::new(universe.iter().copied()),
        BuiltinCalendar,
        AdditiveModelFactory::new(settings.engine.clone()),
        settings,
    )
}
