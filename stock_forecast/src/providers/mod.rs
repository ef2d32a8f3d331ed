//! External collaborators: market data, ticker universe and holiday calendars
//!
//! Each collaborator sits behind a narrow trait so the pipeline can run against
//! live services, local files or deterministic fakes.

use crate::config::{CountryCode, Period};
use crate::data::PriceSeries;
use crate::error::Result;
use crate::models::Holiday;
use serde::{Deserialize, Serialize};

pub mod calendar;
pub mod local;
pub mod universe;
pub mod yahoo;

pub use calendar::BuiltinCalendar;
pub use local::CsvMarketData;
pub use universe::{DumbStockApi, StaticUniverse};
pub use yahoo::YahooFinance;

/// Company name shown when the provider has none
pub const UNKNOWN_COMPANY: &str = "Unknown Company";
/// Summary shown when the provider has none
pub const NO_SUMMARY: &str = "No summary available.";

/// Descriptive information about a ticker
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TickerMetadata {
    pub name: String,
    pub summary: String,
}

impl TickerMetadata {
    /// Build metadata, substituting placeholders for missing or blank fields
    pub fn new(name: Option<String>, summary: Option<String>) -> Self {
        let non_blank = |s: Option<String>| s.filter(|v| !v.trim().is_empty());
        Self {
            name: non_blank(name).unwrap_or_else(|| UNKNOWN_COMPANY.to_string()),
            summary: non_blank(summary).unwrap_or_else(|| NO_SUMMARY.to_string()),
        }
    }
}

impl Default for TickerMetadata {
    fn default() -> Self {
        Self::new(None, None)
    }
}

/// Source of daily price history
pub trait MarketDataProvider {
    /// Daily bars for `ticker` over `period`, ascending by date.
    ///
    /// Fails with `NotFoundError` when the provider has no rows for the ticker.
    fn price_history(&self, ticker: &str, period: Period) -> Result<PriceSeries>;

    /// Company name and summary. Missing fields degrade to placeholders.
    fn metadata(&self, ticker: &str) -> Result<TickerMetadata>;

    /// Name of the provider
    fn name(&self) -> &str;
}

/// Source of selectable ticker symbols
pub trait TickerUniverse {
    fn tickers(&self) -> Result<Vec<String>>;
}

/// Source of national holiday calendars
pub trait HolidayCalendar {
    /// Countries with a calendar
    fn countries(&self) -> Vec<CountryCode>;

    /// Holidays of `country` falling in the inclusive year range
    fn holidays(&self, country: &CountryCode, first_year: i32, last_year: i32) -> Result<Vec<Holiday>>;
}

impl<T: MarketDataProvider + ?Sized> MarketDataProvider for Box<T> {
    fn price_history(&self, ticker: &str, period: Period) -> Result<PriceSeries> {
        (**self).price_history(ticker, period)
    }

    fn metadata(&self, ticker: &str) -> Result<TickerMetadata> {
        (**self).metadata(ticker)
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

impl<T: TickerUniverse + ?Sized> TickerUniverse for Box<T> {
    fn tickers(&self) -> Result<Vec<String>> {
        (**self).tickers()
    }
}
