//! The forecasting pipeline
//!
//! Configuration Collector -> Series Preparer -> Model Builder -> Forecast Projector.
//!
//! [`ForecastPipeline`] owns the collaborators and the fit cache. Each interaction
//! is a [`ForecastRun`] whose stages must run in order: calling a stage before
//! the stages it depends on fails with `SequenceError`.

use crate::builder::{ModelBuilder, ModelFactory, TrainedModel};
use crate::cache::{FitCache, FitKey};
use crate::config::{ConfigCollector, ConfigInput, ForecastConfig, Growth};
use crate::data::{PreparedSeries, PriceSeries, SeriesPreparer};
use crate::error::{ForecastError, Result};
use crate::forecast::Forecast;
use crate::projector::ForecastProjector;
use crate::providers::{HolidayCalendar, MarketDataProvider, TickerMetadata, TickerUniverse};
use crate::settings::Settings;
use serde::Serialize;
use std::sync::Arc;
use tracing::{error, info, warn};

fn out_of_order(stage: &str, requires: &str) -> ForecastError {
    ForecastError::SequenceError(format!("{} called before {}", stage, requires))
}

/// Everything produced by one successful interaction
#[derive(Debug, Clone, Serialize)]
pub struct ForecastReport {
    pub config: ForecastConfig,
    pub metadata: TickerMetadata,
    pub history: PriceSeries,
    pub prepared: PreparedSeries,
    pub forecast: Forecast,
}

/// Collaborators, settings and caches shared by every interaction
pub struct ForecastPipeline<M, U, C, F>
where
    F: ModelFactory,
{
    market: M,
    universe: U,
    calendar: C,
    factory: F,
    settings: Settings,
    fits: Option<FitCache<TrainedModel<F>>>,
}

impl<M, U, C, F> ForecastPipeline<M, U, C, F>
where
    M: MarketDataProvider,
    U: TickerUniverse,
    C: HolidayCalendar,
    F: ModelFactory,
{
    pub fn new(market: M, universe: U, calendar: C, factory: F, settings: Settings) -> Self {
        let fits = settings.cache.fitted_models.then(FitCache::new);
        Self {
            market,
            universe,
            calendar,
            factory,
            settings,
            fits,
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn market(&self) -> &M {
        &self.market
    }

    pub fn universe(&self) -> &U {
        &self.universe
    }

    pub fn calendar(&self) -> &C {
        &self.calendar
    }

    /// Selectable tickers. A failing or empty universe falls back to the configured list.
    pub fn tickers(&self) -> Vec<String> {
        let fallback = || self.settings.providers.fallback_universe.clone();
        match self.universe.tickers() {
            Ok(tickers) if !tickers.is_empty() => tickers,
            Ok(_) => {
                warn!("Ticker universe is empty, using fallback list");
                fallback()
            }
            Err(e) => {
                error!(error = %e, "Error fetching ticker list, using fallback list");
                fallback()
            }
        }
    }

    /// Collector over the current universe and the calendar's countries
    pub fn collector(&self) -> ConfigCollector {
        ConfigCollector::new(self.tickers(), self.calendar.countries())
    }

    /// First stage: validate raw input
    pub fn collect(&self, input: &ConfigInput) -> Result<ForecastConfig> {
        self.collector().collect(input)
    }

    /// Company name and summary, degrading to placeholders on failure
    pub fn metadata(&self, ticker: &str) -> TickerMetadata {
        match self.market.metadata(ticker) {
            Ok(metadata) => metadata,
            Err(e) => {
                warn!(ticker = ticker, error = %e, "Ticker metadata unavailable");
                TickerMetadata::default()
            }
        }
    }

    /// Begin an interaction for a validated configuration
    pub fn start(&self, config: ForecastConfig) -> ForecastRun<'_, M, U, C, F> {
        ForecastRun {
            pipeline: self,
            config,
            history: None,
            prepared: None,
            model: None,
            forecast: None,
        }
    }

    /// Run every stage after collection
    pub fn run(&self, config: ForecastConfig) -> Result<ForecastReport> {
        let mut run = self.start(config);
        run.load()?;
        run.prepare()?;
        run.fit()?;
        run.project()?;
        run.finish()
    }

    /// Number of fitted models held by the cache
    pub fn cached_fits(&self) -> usize {
        self.fits.as_ref().map_or(0, FitCache::len)
    }

    fn fit_model(
        &self,
        prepared: &PreparedSeries,
        config: &ForecastConfig,
    ) -> Result<Arc<TrainedModel<F>>> {
        let fit = || ModelBuilder::fit(prepared, config, &self.calendar, &self.factory);
        match &self.fits {
            Some(cache) => cache.get_or_fit(FitKey::new(config, prepared), fit),
            None => fit().map(Arc::new),
        }
    }
}

/// One interaction: the stages after collection, run in order
pub struct ForecastRun<'p, M, U, C, F>
where
    F: ModelFactory,
{
    pipeline: &'p ForecastPipeline<M, U, C, F>,
    config: ForecastConfig,
    history: Option<PriceSeries>,
    prepared: Option<PreparedSeries>,
    model: Option<Arc<TrainedModel<F>>>,
    forecast: Option<Forecast>,
}

impl<'p, M, U, C, F> ForecastRun<'p, M, U, C, F>
where
    M: MarketDataProvider,
    U: TickerUniverse,
    C: HolidayCalendar,
    F: ModelFactory,
{
    pub fn config(&self) -> &ForecastConfig {
        &self.config
    }

    pub fn history(&self) -> Option<&PriceSeries> {
        self.history.as_ref()
    }

    pub fn prepared(&self) -> Option<&PreparedSeries> {
        self.prepared.as_ref()
    }

    pub fn forecast(&self) -> Option<&Forecast> {
        self.forecast.as_ref()
    }

    /// Fetch the price history. Downstream results are discarded.
    pub fn load(&mut self) -> Result<&PriceSeries> {
        self.prepared = None;
        self.model = None;
        self.forecast = None;

        let ticker = self.config.ticker();
        let period = self.config.period();
        let series = self.pipeline.market.price_history(ticker, period)?;
        if series.is_empty() {
            return Err(ForecastError::NotFoundError(format!(
                "No price history for '{}' over {}",
                ticker, period
            )));
        }
        info!(
            ticker = ticker,
            period = %period,
            rows = series.len(),
            "Price history loaded"
        );
        Ok(self.history.insert(series))
    }

    /// Second stage: reshape the history into the engine schema
    pub fn prepare(&mut self) -> Result<&PreparedSeries> {
        let history = self
            .history
            .as_ref()
            .ok_or_else(|| out_of_order("prepare", "load"))?;
        let prepared = SeriesPreparer::prepare(history, &self.config)?;
        self.model = None;
        self.forecast = None;
        Ok(self.prepared.insert(prepared))
    }

    /// Third stage: build and fit the model
    pub fn fit(&mut self) -> Result<()> {
        let prepared = self
            .prepared
            .as_ref()
            .ok_or_else(|| out_of_order("fit", "prepare"))?;
        let model = self.pipeline.fit_model(prepared, &self.config)?;
        self.model = Some(model);
        self.forecast = None;
        Ok(())
    }

    /// Fourth stage: extend the timeline and predict
    pub fn project(&mut self) -> Result<&Forecast> {
        let model = self
            .model
            .as_ref()
            .ok_or_else(|| out_of_order("project", "fit"))?;
        let prepared = self
            .prepared
            .as_ref()
            .ok_or_else(|| out_of_order("project", "prepare"))?;
        let capacity = match self.config.growth() {
            Growth::Linear => None,
            Growth::Logistic { .. } => Some(prepared.capacity_value().ok_or_else(|| {
                ForecastError::SequenceError(
                    "Logistic growth needs a uniform capacity from the preparer".to_string(),
                )
            })?),
        };
        let forecast =
            ForecastProjector::project(model.as_ref(), self.config.horizon_days(), capacity)?;
        Ok(self.forecast.insert(forecast))
    }

    /// Assemble the report once every stage has run
    pub fn finish(self) -> Result<ForecastReport> {
        let history = self.history.ok_or_else(|| out_of_order("finish", "load"))?;
        let prepared = self.prepared.ok_or_else(|| out_of_order("finish", "prepare"))?;
        let forecast = self.forecast.ok_or_else(|| out_of_order("finish", "project"))?;
        let metadata = self.pipeline.metadata(self.config.ticker());
        Ok(ForecastReport {
            config: self.config,
            metadata,
            history,
            prepared,
            forecast,
        })
    }
}
