//! Runtime settings: widget defaults, engine hyper-parameters and provider endpoints
//!
//! Settings are read from a JSON file and then overridden from the environment:
//!
//! - `STOCK_FORECAST_CONFIG`: path of the settings file when none is given explicitly
//! - `STOCK_FORECAST_SEED`: sampler seed for uncertainty intervals
//! - `STOCK_FORECAST_UNCERTAINTY_SAMPLES`: number of simulated paths
//! - `STOCK_FORECAST_TICKER_LIST_URL`: ticker universe endpoint

use crate::config::ConfigInput;
use crate::error::{ForecastError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::{debug, info};

pub const CONFIG_PATH_ENV: &str = "STOCK_FORECAST_CONFIG";
pub const SEED_ENV: &str = "STOCK_FORECAST_SEED";
pub const UNCERTAINTY_SAMPLES_ENV: &str = "STOCK_FORECAST_UNCERTAINTY_SAMPLES";
pub const TICKER_LIST_URL_ENV: &str = "STOCK_FORECAST_TICKER_LIST_URL";

/// Top-level settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Initial values of the input widgets
    pub defaults: ConfigInput,
    /// Hyper-parameters of the additive regression engine
    pub engine: EngineSettings,
    /// External endpoints
    pub providers: ProviderSettings,
    /// Memoization toggles
    pub cache: CacheSettings,
}

/// Hyper-parameters of the additive regression engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineSettings {
    /// Number of potential trend changepoints
    pub n_changepoints: usize,
    /// Share of the history in which changepoints are placed
    pub changepoint_range: f64,
    /// Prior scale of trend rate changes
    pub changepoint_prior_scale: f64,
    /// Prior scale of seasonal Fourier coefficients
    pub seasonality_prior_scale: f64,
    /// Prior scale of holiday effects
    pub holidays_prior_scale: f64,
    /// Width of the uncertainty interval
    pub interval_width: f64,
    /// Simulated paths used for the interval, 0 for a Gaussian approximation
    pub uncertainty_samples: usize,
    /// Seed of the uncertainty sampler
    pub seed: u64,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            n_changepoints: 25,
            changepoint_range: 0.8,
            changepoint_prior_scale: 0.05,
            seasonality_prior_scale: 10.0,
            holidays_prior_scale: 10.0,
            interval_width: 0.8,
            uncertainty_samples: 1000,
            seed: 0,
        }
    }
}

impl EngineSettings {
    /// Check parameter domains
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.changepoint_range) {
            return Err(ForecastError::ConfigError(format!(
                "changepoint_range must be within [0, 1], got {}",
                self.changepoint_range
            )));
        }
        if !(self.interval_width > 0.0 && self.interval_width < 1.0) {
            return Err(ForecastError::ConfigError(format!(
                "interval_width must be within (0, 1), got {}",
                self.interval_width
            )));
        }
        for (name, scale) in [
            ("changepoint_prior_scale", self.changepoint_prior_scale),
            ("seasonality_prior_scale", self.seasonality_prior_scale),
            ("holidays_prior_scale", self.holidays_prior_scale),
        ] {
            if !(scale > 0.0 && scale.is_finite()) {
                return Err(ForecastError::ConfigError(format!(
                    "{} must be positive, got {}",
                    name, scale
                )));
            }
        }
        Ok(())
    }
}

/// External endpoints and HTTP behaviour
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderSettings {
    /// Yahoo chart endpoint, the symbol is appended as a path segment
    pub chart_url: String,
    /// Yahoo quote summary endpoint, the symbol is appended as a path segment
    pub quote_summary_url: String,
    /// Ticker universe endpoint returning a JSON array of symbols
    pub ticker_list_url: String,
    pub user_agent: String,
    pub timeout_secs: u64,
    /// Universe used when the ticker list cannot be fetched
    pub fallback_universe: Vec<String>,
}

impl Default for ProviderSettings {
    fn default() -> Self {
        Self {
            chart_url: "https://query1.finance.yahoo.com/v8/finance/chart".to_string(),
            quote_summary_url: "https://query2.finance.yahoo.com/v10/finance/quoteSummary"
                .to_string(),
            ticker_list_url: "https://dumbstockapi.com/stock?format=tickers-only&countries=US"
                .to_string(),
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36"
                .to_string(),
            timeout_secs: 30,
            fallback_universe: vec!["AAPL".to_string()],
        }
    }
}

/// Memoization toggles
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheSettings {
    /// Memoize the ticker universe after the first successful fetch
    pub ticker_universe: bool,
    /// Memoize price history per ticker and period
    pub price_history: bool,
    /// Memoize fitted models per fit configuration
    pub fitted_models: bool,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            ticker_universe: true,
            price_history: true,
            fitted_models: true,
        }
    }
}

impl Settings {
    /// Read settings from a JSON file. Missing keys keep their defaults.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)?;
        let settings: Settings = serde_json::from_str(&contents).map_err(|e| {
            ForecastError::ConfigError(format!("Invalid settings file {}: {}", path.display(), e))
        })?;
        settings.engine.validate()?;
        info!(path = %path.display(), "Loaded settings file");
        Ok(settings)
    }

    /// Load settings from `path`, or from `STOCK_FORECAST_CONFIG`, or defaults,
    /// then apply environment overrides
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut settings = match path {
            Some(p) => Self::from_file(p)?,
            None => match std::env::var(CONFIG_PATH_ENV) {
                Ok(p) => Self::from_file(p)?,
                Err(_) => Self::default(),
            },
        };
        settings.apply_env_overrides(|key| std::env::var(key).ok())?;
        Ok(settings)
    }

    /// Apply overrides looked up through `lookup`
    pub fn apply_env_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(seed) = lookup(SEED_ENV) {
            self.engine.seed = seed.trim().parse().map_err(|_| {
                ForecastError::ConfigError(format!("{} must be an integer, got '{}'", SEED_ENV, seed))
            })?;
            debug!(seed = self.engine.seed, "Seed overridden from environment");
        }
        if let Some(samples) = lookup(UNCERTAINTY_SAMPLES_ENV) {
            self.engine.uncertainty_samples = samples.trim().parse().map_err(|_| {
                ForecastError::ConfigError(format!(
                    "{} must be an integer, got '{}'",
                    UNCERTAINTY_SAMPLES_ENV, samples
                ))
            })?;
        }
        if let Some(url) = lookup(TICKER_LIST_URL_ENV) {
            self.providers.ticker_list_url = url;
        }
        Ok(())
    }
}
