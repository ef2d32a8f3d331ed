//! Offline market data stored as one CSV file per ticker
//!
//! Prices live in `<dir>/<TICKER>.csv` with a date column and OHLCV columns,
//! detected by name. Optional metadata lives in `<dir>/<TICKER>.json` as
//! `{"name": ..., "summary": ...}`.

use super::{MarketDataProvider, TickerMetadata};
use crate::config::Period;
use crate::data::{DataLoader, PriceSeries};
use crate::error::{ForecastError, Result};
use serde::Deserialize;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

#[derive(Debug, Default, Deserialize)]
struct MetadataFile {
    name: Option<String>,
    summary: Option<String>,
}

/// Market data read from a directory of CSV files
#[derive(Debug, Clone)]
pub struct CsvMarketData {
    dir: PathBuf,
}

impl CsvMarketData {
    pub fn new<P: AsRef<Path>>(dir: P) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    fn prices_path(&self, ticker: &str) -> PathBuf {
        self.dir.join(format!("{}.csv", ticker.to_uppercase()))
    }

    fn metadata_path(&self, ticker: &str) -> PathBuf {
        self.dir.join(format!("{}.json", ticker.to_uppercase()))
    }

    /// Tickers with a price file in the directory, sorted
    pub fn available_tickers(&self) -> Result<Vec<String>> {
        let mut tickers: Vec<String> = fs::read_dir(&self.dir)?
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| path.extension().map_or(false, |ext| ext == "csv"))
            .filter_map(|path| path.file_stem().map(|s| s.to_string_lossy().to_uppercase()))
            .collect();
        tickers.sort();
        Ok(tickers)
    }

    /// Write `series` to `<dir>/<TICKER>.csv` with a `Date,Open,High,Low,Close,Volume` header
    pub fn store(&self, ticker: &str, series: &PriceSeries) -> Result<PathBuf> {
        fs::create_dir_all(&self.dir)?;
        let path = self.prices_path(ticker);
        let mut wtr = csv::Writer::from_writer(File::create(&path)?);
        wtr.write_record(["Date", "Open", "High", "Low", "Close", "Volume"])?;
        for bar in series.bars() {
            wtr.write_record([
                bar.date.format("%Y-%m-%d").to_string(),
                bar.open.to_string(),
                bar.high.to_string(),
                bar.low.to_string(),
                bar.close.to_string(),
                bar.volume.to_string(),
            ])?;
        }
        wtr.flush()?;
        info!(ticker = ticker, path = %path.display(), rows = series.len(), "Stored price history");
        Ok(path)
    }
}

impl MarketDataProvider for CsvMarketData {
    fn price_history(&self, ticker: &str, period: Period) -> Result<PriceSeries> {
        let path = self.prices_path(ticker);
        if !path.is_file() {
            return Err(ForecastError::NotFoundError(format!(
                "No price file for '{}' at {}",
                ticker,
                path.display()
            )));
        }
        let series = DataLoader::from_csv(&path)?.trim_to_period(period);
        if series.is_empty() {
            return Err(ForecastError::NotFoundError(format!(
                "Price file for '{}' has no rows",
                ticker
            )));
        }
        debug!(ticker = ticker, period = %period, rows = series.len(), "Loaded price file");
        Ok(series)
    }

    fn metadata(&self, ticker: &str) -> Result<TickerMetadata> {
        let path = self.metadata_path(ticker);
        if !path.is_file() {
            return Ok(TickerMetadata::default());
        }
        let file: MetadataFile = serde_json::from_str(&fs::read_to_string(path)?)?;
        Ok(TickerMetadata::new(file.name, file.summary))
    }

    fn name(&self) -> &str {
        "Local CSV files"
    }
}
