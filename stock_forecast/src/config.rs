//! Forecast configuration and the collector that validates raw user input

use crate::error::{ForecastError, Result};
use chrono::{Months, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;
use tracing::debug;

/// Shortest forecast horizon in days
pub const MIN_HORIZON_DAYS: i64 = 1;
/// Longest forecast horizon in days
pub const MAX_HORIZON_DAYS: i64 = 365;
/// Lower bound of the logistic capacity multiplier
pub const MIN_CAPACITY_MULTIPLIER: f64 = 1.0;
/// Upper bound of the logistic capacity multiplier
pub const MAX_CAPACITY_MULTIPLIER: f64 = 2.0;
/// Spelling used by the input layer for "no holiday calendar"
pub const NO_HOLIDAY_COUNTRY: &str = "None";

/// Lookback window for historical prices
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Period {
    #[serde(rename = "6mo")]
    SixMonths,
    #[serde(rename = "1y")]
    OneYear,
    #[serde(rename = "2y")]
    TwoYears,
    #[serde(rename = "5y")]
    FiveYears,
    #[serde(rename = "10y")]
    TenYears,
    #[serde(rename = "max")]
    Max,
}

impl Period {
    /// Every supported period, shortest first
    pub const ALL: [Period; 6] = [
        Period::SixMonths,
        Period::OneYear,
        Period::TwoYears,
        Period::FiveYears,
        Period::TenYears,
        Period::Max,
    ];

    /// Provider spelling of the period
    pub fn as_str(&self) -> &'static str {
        match self {
            Period::SixMonths => "6mo",
            Period::OneYear => "1y",
            Period::TwoYears => "2y",
            Period::FiveYears => "5y",
            Period::TenYears => "10y",
            Period::Max => "max",
        }
    }

    /// Length of the window in months, `None` for the full history
    pub fn months(&self) -> Option<u32> {
        match self {
            Period::SixMonths => Some(6),
            Period::OneYear => Some(12),
            Period::TwoYears => Some(24),
            Period::FiveYears => Some(60),
            Period::TenYears => Some(120),
            Period::Max => None,
        }
    }

    /// First date included when the window ends at `last`
    pub fn window_start(&self, last: NaiveDate) -> Option<NaiveDate> {
        self.months()
            .and_then(|m| last.checked_sub_months(Months::new(m)))
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Period {
    type Err = ForecastError;

    fn from_str(s: &str) -> Result<Self> {
        Period::ALL
            .into_iter()
            .find(|p| p.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| {
                ForecastError::ValidationError(format!(
                    "Invalid period '{}'. Valid options: 6mo, 1y, 2y, 5y, 10y, max",
                    s
                ))
            })
    }
}

/// Trend shape without its parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GrowthKind {
    Linear,
    Logistic,
}

impl GrowthKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            GrowthKind::Linear => "linear",
            GrowthKind::Logistic => "logistic",
        }
    }
}

impl fmt::Display for GrowthKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GrowthKind {
    type Err = ForecastError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "linear" => Ok(GrowthKind::Linear),
            "logistic" => Ok(GrowthKind::Logistic),
            _ => Err(ForecastError::ValidationError(format!(
                "Invalid growth '{}'. Valid options: linear, logistic",
                s
            ))),
        }
    }
}

/// Trend assumption. Logistic growth carries the multiplier applied to the last close.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Growth {
    Linear,
    Logistic { capacity_multiplier: f64 },
}

impl Growth {
    pub fn kind(&self) -> GrowthKind {
        match self {
            Growth::Linear => GrowthKind::Linear,
            Growth::Logistic { .. } => GrowthKind::Logistic,
        }
    }

    pub fn capacity_multiplier(&self) -> Option<f64> {
        match self {
            Growth::Linear => None,
            Growth::Logistic {
                capacity_multiplier,
            } => Some(*capacity_multiplier),
        }
    }
}

/// How seasonal terms combine with the trend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SeasonalityMode {
    Additive,
    Multiplicative,
}

impl SeasonalityMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            SeasonalityMode::Additive => "additive",
            SeasonalityMode::Multiplicative => "multiplicative",
        }
    }
}

impl fmt::Display for SeasonalityMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SeasonalityMode {
    type Err = ForecastError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "additive" => Ok(SeasonalityMode::Additive),
            "multiplicative" => Ok(SeasonalityMode::Multiplicative),
            _ => Err(ForecastError::ValidationError(format!(
                "Invalid seasonality mode '{}'. Valid options: additive, multiplicative",
                s
            ))),
        }
    }
}

/// ISO country code understood by the holiday calendar
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CountryCode(String);

impl CountryCode {
    /// Create a country code from two or three ASCII letters
    pub fn new(code: &str) -> Result<Self> {
        let code = code.trim();
        if !(2..=3).contains(&code.len()) || !code.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(ForecastError::ValidationError(format!(
                "Invalid country code '{}'",
                code
            )));
        }
        Ok(Self(code.to_ascii_uppercase()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CountryCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Validated, immutable configuration of one forecasting interaction
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ForecastConfig {
    ticker: String,
    period: Period,
    horizon_days: usize,
    growth: Growth,
    seasonality_mode: SeasonalityMode,
    weekly: bool,
    monthly: bool,
    yearly: bool,
    holiday_country: Option<CountryCode>,
}

impl ForecastConfig {
    pub fn ticker(&self) -> &str {
        &self.ticker
    }

    pub fn period(&self) -> Period {
        self.period
    }

    pub fn horizon_days(&self) -> usize {
        self.horizon_days
    }

    pub fn growth(&self) -> Growth {
        self.growth
    }

    pub fn seasonality_mode(&self) -> SeasonalityMode {
        self.seasonality_mode
    }

    pub fn weekly(&self) -> bool {
        self.weekly
    }

    pub fn monthly(&self) -> bool {
        self.monthly
    }

    pub fn yearly(&self) -> bool {
        self.yearly
    }

    /// Holiday calendar to use, `None` when holiday effects are disabled
    pub fn holiday_country(&self) -> Option<&CountryCode> {
        self.holiday_country.as_ref()
    }
}

/// Raw input values as the widgets deliver them
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfigInput {
    pub ticker: String,
    pub period: String,
    pub horizon_days: i64,
    pub growth: String,
    pub capacity_multiplier: Option<f64>,
    pub seasonality_mode: String,
    pub weekly: bool,
    pub monthly: bool,
    pub yearly: bool,
    pub holiday_country: String,
}

impl Default for ConfigInput {
    fn default() -> Self {
        Self {
            ticker: "AAPL".to_string(),
            period: Period::TwoYears.as_str().to_string(),
            horizon_days: 90,
            growth: GrowthKind::Linear.as_str().to_string(),
            capacity_multiplier: Some(1.2),
            seasonality_mode: SeasonalityMode::Additive.as_str().to_string(),
            weekly: true,
            monthly: true,
            yearly: true,
            holiday_country: NO_HOLIDAY_COUNTRY.to_string(),
        }
    }
}

/// Validates raw input against the ticker universe and the supported calendars
#[derive(Debug, Clone)]
pub struct ConfigCollector {
    universe: HashSet<String>,
    countries: Vec<CountryCode>,
}

impl ConfigCollector {
    /// Create a collector for a known ticker universe and holiday countries
    pub fn new<I, S>(universe: I, countries: Vec<CountryCode>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            universe: universe.into_iter().map(Into::into).collect(),
            countries,
        }
    }

    /// Holiday countries accepted by this collector
    pub fn countries(&self) -> &[CountryCode] {
        &self.countries
    }

    /// Ticker universe, sorted for display
    pub fn sorted_universe(&self) -> Vec<String> {
        let mut tickers: Vec<String> = self.universe.iter().cloned().collect();
        tickers.sort();
        tickers
    }

    /// Validate `input` and build the configuration for one interaction
    pub fn collect(&self, input: &ConfigInput) -> Result<ForecastConfig> {
        let ticker = input.ticker.trim().to_uppercase();
        if ticker.is_empty() {
            return Err(ForecastError::ValidationError(
                "Ticker must not be empty".to_string(),
            ));
        }
        if !self.universe.contains(&ticker) {
            return Err(ForecastError::ValidationError(format!(
                "Ticker '{}' is not in the known ticker universe",
                ticker
            )));
        }

        let period: Period = input.period.parse()?;

        if !(MIN_HORIZON_DAYS..=MAX_HORIZON_DAYS).contains(&input.horizon_days) {
            return Err(ForecastError::ValidationError(format!(
                "Horizon must be between {} and {} days, got {}",
                MIN_HORIZON_DAYS, MAX_HORIZON_DAYS, input.horizon_days
            )));
        }

        let growth = match input.growth.parse::<GrowthKind>()? {
            GrowthKind::Linear => Growth::Linear,
            GrowthKind::Logistic => {
                let multiplier = input.capacity_multiplier.ok_or_else(|| {
                    ForecastError::ValidationError(
                        "Logistic growth requires a capacity multiplier".to_string(),
                    )
                })?;
                if !multiplier.is_finite()
                    || !(MIN_CAPACITY_MULTIPLIER..=MAX_CAPACITY_MULTIPLIER).contains(&multiplier)
                {
                    return Err(ForecastError::ValidationError(format!(
                        "Capacity multiplier must be between {} and {}, got {}",
                        MIN_CAPACITY_MULTIPLIER, MAX_CAPACITY_MULTIPLIER, multiplier
                    )));
                }
                Growth::Logistic {
                    capacity_multiplier: multiplier,
                }
            }
        };

        let seasonality_mode: SeasonalityMode = input.seasonality_mode.parse()?;
        let holiday_country = self.parse_country(&input.holiday_country)?;

        let config = ForecastConfig {
            ticker,
            period,
            horizon_days: input.horizon_days as usize,
            growth,
            seasonality_mode,
            weekly: input.weekly,
            monthly: input.monthly,
            yearly: input.yearly,
            holiday_country,
        };
        debug!(config = ?config, "Collected forecast configuration");
        Ok(config)
    }

    fn parse_country(&self, raw: &str) -> Result<Option<CountryCode>> {
        let raw = raw.trim();
        if raw.is_empty() || raw.eq_ignore_ascii_case(NO_HOLIDAY_COUNTRY) {
            return Ok(None);
        }
        let code = CountryCode::new(raw)?;
        if !self.countries.contains(&code) {
            return Err(ForecastError::ValidationError(format!(
                "Holiday country '{}' is not supported by the calendar",
                code
            )));
        }
        Ok(Some(code))
    }
}
