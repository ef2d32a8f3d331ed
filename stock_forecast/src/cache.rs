//! Read-through memoization of the ticker universe, price fetches and model fits
//!
//! Entries are keyed by the exact inputs that produced them and are never
//! invalidated. Failures are not cached.

use crate::config::{ForecastConfig, GrowthKind, Period, SeasonalityMode};
use crate::data::{PreparedSeries, PriceSeries};
use crate::error::Result;
use crate::providers::{MarketDataProvider, TickerMetadata, TickerUniverse};
use dashmap::DashMap;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::{Arc, OnceLock};
use tracing::debug;

/// Market data provider that remembers every successful response
#[derive(Debug)]
pub struct CachedMarketData<P> {
    inner: P,
    prices: DashMap<(String, Period), PriceSeries>,
    metadata: DashMap<String, TickerMetadata>,
}

impl<P: MarketDataProvider> CachedMarketData<P> {
    pub fn new(inner: P) -> Self {
        Self {
            inner,
            prices: DashMap::new(),
            metadata: DashMap::new(),
        }
    }

    pub fn inner(&self) -> &P {
        &self.inner
    }

    /// Number of cached price series
    pub fn cached_series(&self) -> usize {
        self.prices.len()
    }
}

impl<P: MarketDataProvider> MarketDataProvider for CachedMarketData<P> {
    fn price_history(&self, ticker: &str, period: Period) -> Result<PriceSeries> {
        let key = (ticker.to_string(), period);
        if let Some(series) = self.prices.get(&key) {
            debug!(ticker = ticker, period = %period, "Price history cache hit");
            return Ok(series.clone());
        }
        let series = self.inner.price_history(ticker, period)?;
        self.prices.entry(key).or_insert_with(|| series.clone());
        Ok(series)
    }

    fn metadata(&self, ticker: &str) -> Result<TickerMetadata> {
        if let Some(metadata) = self.metadata.get(ticker) {
            return Ok(metadata.clone());
        }
        let metadata = self.inner.metadata(ticker)?;
        self.metadata
            .entry(ticker.to_string())
            .or_insert_with(|| metadata.clone());
        Ok(metadata)
    }

    fn name(&self) -> &str {
        self.inner.name()
    }
}

/// Ticker universe fetched at most once
///
/// Only a successful, non-empty list is kept, so a failed fetch is retried on
/// the next call.
#[derive(Debug)]
pub struct CachedUniverse<U> {
    inner: U,
    tickers: OnceLock<Vec<String>>,
}

impl<U: TickerUniverse> CachedUniverse<U> {
    pub fn new(inner: U) -> Self {
        Self {
            inner,
            tickers: OnceLock::new(),
        }
    }

    pub fn inner(&self) -> &U {
        &self.inner
    }

    pub fn is_cached(&self) -> bool {
        self.tickers.get().is_some()
    }
}

impl<U: TickerUniverse> TickerUniverse for CachedUniverse<U> {
    fn tickers(&self) -> Result<Vec<String>> {
        if let Some(tickers) = self.tickers.get() {
            debug!(count = tickers.len(), "Ticker universe cache hit");
            return Ok(tickers.clone());
        }
        let tickers = self.inner.tickers()?;
        if !tickers.is_empty() {
            let _ = self.tickers.set(tickers.clone());
        }
        Ok(tickers)
    }
}

/// Everything a fit depends on
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FitKey {
    ticker: String,
    period: Period,
    horizon_days: usize,
    growth: GrowthKind,
    capacity_bits: Option<u64>,
    seasonality_mode: SeasonalityMode,
    weekly: bool,
    monthly: bool,
    yearly: bool,
    holiday_country: Option<String>,
    series_fingerprint: u64,
}

impl FitKey {
    pub fn new(config: &ForecastConfig, series: &PreparedSeries) -> Self {
        Self {
            ticker: config.ticker().to_string(),
            period: config.period(),
            // Holiday regressors extend through the horizon
            horizon_days: config.horizon_days(),
            growth: config.growth().kind(),
            capacity_bits: series.capacity_value().map(f64::to_bits),
            seasonality_mode: config.seasonality_mode(),
            weekly: config.weekly(),
            monthly: config.monthly(),
            yearly: config.yearly(),
            holiday_country: config.holiday_country().map(|c| c.to_string()),
            series_fingerprint: fingerprint(series),
        }
    }
}

/// Hash of the timestamps, values and capacities of a prepared series
fn fingerprint(series: &PreparedSeries) -> u64 {
    let mut hasher = DefaultHasher::new();
    series.timestamps().hash(&mut hasher);
    for value in series.values() {
        value.to_bits().hash(&mut hasher);
    }
    if let Some(cap) = series.capacity() {
        for value in cap {
            value.to_bits().hash(&mut hasher);
        }
    }
    hasher.finish()
}

/// Fitted models shared by fit configuration
#[derive(Debug)]
pub struct FitCache<M> {
    models: DashMap<FitKey, Arc<M>>,
}

impl<M> Default for FitCache<M> {
    fn default() -> Self {
        Self {
            models: DashMap::new(),
        }
    }
}

impl<M> FitCache<M> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached model for `key`, or the result of `fit` stored under it
    pub fn get_or_fit<F>(&self, key: FitKey, fit: F) -> Result<Arc<M>>
    where
        F: FnOnce() -> Result<M>,
    {
        if let Some(model) = self.models.get(&key) {
            debug!(ticker = %key.ticker, "Fitted model cache hit");
            return Ok(Arc::clone(model.value()));
        }
        let model = Arc::new(fit()?);
        Ok(Arc::clone(
            self.models.entry(key).or_insert(model).value(),
        ))
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }
}
