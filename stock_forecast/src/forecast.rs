//! Forecast tables produced by trained models
//!
//! A [`Forecast`] holds one row per timestamp of the prediction timeline, history
//! first, plus a decomposition into named components. It exports to a polars
//! `DataFrame`, CSV and JSON using the engine column names.

use crate::config::SeasonalityMode;
use crate::data::{CAPACITY_COLUMN, TIMESTAMP_COLUMN};
use crate::error::{ForecastError, Result};
use crate::utils::epoch_days;
use chrono::NaiveDate;
use polars::prelude::*;
use serde::Serialize;
use std::io::Write;

pub const ESTIMATE_COLUMN: &str = "yhat";
pub const LOWER_COLUMN: &str = "yhat_lower";
pub const UPPER_COLUMN: &str = "yhat_upper";
pub const TREND_COLUMN: &str = "trend";

/// One predicted timestamp
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ForecastRow {
    pub timestamp: NaiveDate,
    pub estimate: f64,
    pub lower: f64,
    pub upper: f64,
    /// Trend contribution in price units
    pub trend: f64,
    /// Saturation level under logistic growth
    #[serde(skip_serializing_if = "Option::is_none")]
    pub capacity: Option<f64>,
}

/// A named term of the decomposition, one value per forecast row
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ForecastComponent {
    name: String,
    period_days: Option<f64>,
    mode: SeasonalityMode,
    values: Vec<f64>,
}

impl ForecastComponent {
    pub fn new(name: &str, period_days: Option<f64>, mode: SeasonalityMode, values: Vec<f64>) -> Self {
        Self {
            name: name.to_string(),
            period_days,
            mode,
            values,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Period in days, `None` for holiday effects
    pub fn period_days(&self) -> Option<f64> {
        self.period_days
    }

    /// Additive terms are in price units, multiplicative terms are fractions of the trend
    pub fn mode(&self) -> SeasonalityMode {
        self.mode
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }
}

/// Point estimates and bounds over history and horizon
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Forecast {
    rows: Vec<ForecastRow>,
    components: Vec<ForecastComponent>,
    history_len: usize,
}

impl Forecast {
    /// Assemble a forecast. Rows must be strictly ascending and every component
    /// must have one value per row.
    pub fn new(
        rows: Vec<ForecastRow>,
        components: Vec<ForecastComponent>,
        history_len: usize,
    ) -> Result<Self> {
        if rows.windows(2).any(|w| w[0].timestamp >= w[1].timestamp) {
            return Err(ForecastError::ForecastingError(
                "Forecast timestamps must be strictly ascending".to_string(),
            ));
        }
        if history_len > rows.len() {
            return Err(ForecastError::ForecastingError(format!(
                "History length {} exceeds {} forecast rows",
                history_len,
                rows.len()
            )));
        }
        if let Some(bad) = components.iter().find(|c| c.values.len() != rows.len()) {
            return Err(ForecastError::ForecastingError(format!(
                "Component '{}' has {} values for {} rows",
                bad.name,
                bad.values.len(),
                rows.len()
            )));
        }
        Ok(Self {
            rows,
            components,
            history_len,
        })
    }

    pub fn rows(&self) -> &[ForecastRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Number of rows covering the training history
    pub fn history_len(&self) -> usize {
        self.history_len
    }

    /// Rows past the last observed date
    pub fn future_rows(&self) -> &[ForecastRow] {
        &self.rows[self.history_len..]
    }

    pub fn components(&self) -> &[ForecastComponent] {
        &self.components
    }

    pub fn component(&self, name: &str) -> Option<&ForecastComponent> {
        self.components.iter().find(|c| c.name == name)
    }

    /// Whether every row carries a capacity
    pub fn has_capacity(&self) -> bool {
        !self.rows.is_empty() && self.rows.iter().all(|r| r.capacity.is_some())
    }

    /// Column names of the tabular export, in order
    pub fn column_names(&self) -> Vec<String> {
        let mut names: Vec<String> = [
            TIMESTAMP_COLUMN,
            ESTIMATE_COLUMN,
            LOWER_COLUMN,
            UPPER_COLUMN,
            TREND_COLUMN,
        ]
        .iter()
        .map(|s| s.to_string())
        .collect();
        if self.has_capacity() {
            names.push(CAPACITY_COLUMN.to_string());
        }
        names.extend(self.components.iter().map(|c| c.name.clone()));
        names
    }

    /// Tabular view: `ds, yhat, yhat_lower, yhat_upper, trend[, cap]` then one column per component
    pub fn to_dataframe(&self) -> Result<DataFrame> {
        let days: Vec<i32> = self.rows.iter().map(|r| epoch_days(r.timestamp)).collect();
        let mut columns = vec![
            Series::new(TIMESTAMP_COLUMN, days).cast(&DataType::Date)?,
            Series::new(ESTIMATE_COLUMN, self.rows.iter().map(|r| r.estimate).collect::<Vec<f64>>()),
            Series::new(LOWER_COLUMN, self.rows.iter().map(|r| r.lower).collect::<Vec<f64>>()),
            Series::new(UPPER_COLUMN, self.rows.iter().map(|r| r.upper).collect::<Vec<f64>>()),
            Series::new(TREND_COLUMN, self.rows.iter().map(|r| r.trend).collect::<Vec<f64>>()),
        ];
        if self.has_capacity() {
            let cap: Vec<f64> = self.rows.iter().filter_map(|r| r.capacity).collect();
            columns.push(Series::new(CAPACITY_COLUMN, cap));
        }
        for component in &self.components {
            columns.push(Series::new(&component.name, component.values.clone()));
        }
        Ok(DataFrame::new(columns)?)
    }

    /// Write the tabular view as CSV with a header row
    pub fn write_csv<W: Write>(&self, writer: W) -> Result<()> {
        let mut wtr = csv::Writer::from_writer(writer);
        wtr.write_record(self.column_names())?;

        let has_capacity = self.has_capacity();
        for (i, row) in self.rows.iter().enumerate() {
            let mut record = vec![
                row.timestamp.format("%Y-%m-%d").to_string(),
                row.estimate.to_string(),
                row.lower.to_string(),
                row.upper.to_string(),
                row.trend.to_string(),
            ];
            if has_capacity {
                record.push(row.capacity.map(|c| c.to_string()).unwrap_or_default());
            }
            record.extend(self.components.iter().map(|c| c.values[i].to_string()));
            wtr.write_record(&record)?;
        }
        wtr.flush()?;
        Ok(())
    }

    /// Pretty-printed JSON of rows and components
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
