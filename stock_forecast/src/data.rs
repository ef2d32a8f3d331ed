//! Price series handling and preparation for the forecasting engine

use crate::config::{ForecastConfig, Growth, Period};
use crate::error::{ForecastError, Result};
use crate::utils::{date_parser, epoch_days, from_epoch_days};
use chrono::NaiveDate;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::path::Path;
use tracing::debug;

/// Timestamp column expected by the forecasting engine
pub const TIMESTAMP_COLUMN: &str = "ds";
/// Value column expected by the forecasting engine
pub const VALUE_COLUMN: &str = "y";
/// Capacity column used by logistic growth
pub const CAPACITY_COLUMN: &str = "cap";

/// One trading day of prices
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceBar {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: u64,
}

/// Daily prices, ascending by date with no duplicate dates
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct PriceSeries {
    bars: Vec<PriceBar>,
}

impl PriceSeries {
    /// Create a series from bars that are already ascending and unique by date
    pub fn new(bars: Vec<PriceBar>) -> Result<Self> {
        if let Some(pair) = bars.windows(2).find(|w| w[0].date >= w[1].date) {
            return Err(ForecastError::DataError(format!(
                "Price bars must be strictly ascending by date ({} followed by {})",
                pair[0].date, pair[1].date
            )));
        }
        if let Some(bar) = bars.iter().find(|b| !b.close.is_finite()) {
            return Err(ForecastError::DataError(format!(
                "Close price on {} is not a finite number",
                bar.date
            )));
        }
        Ok(Self { bars })
    }

    /// Sort bars by date and keep the last bar seen for each date
    pub fn from_unsorted(mut bars: Vec<PriceBar>) -> Result<Self> {
        bars.sort_by_key(|b| b.date);
        let mut unique: Vec<PriceBar> = Vec::with_capacity(bars.len());
        for bar in bars {
            match unique.last_mut() {
                Some(last) if last.date == bar.date => *last = bar,
                _ => unique.push(bar),
            }
        }
        Self::new(unique)
    }

    pub fn bars(&self) -> &[PriceBar] {
        &self.bars
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn dates(&self) -> Vec<NaiveDate> {
        self.bars.iter().map(|b| b.date).collect()
    }

    pub fn close_prices(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.close).collect()
    }

    /// Most recent bar by date
    pub fn last(&self) -> Option<&PriceBar> {
        self.bars.last()
    }

    /// Keep only the bars inside `period`, measured back from the last bar
    pub fn trim_to_period(&self, period: Period) -> Self {
        let start = match self.last().and_then(|b| period.window_start(b.date)) {
            Some(start) => start,
            None => return self.clone(),
        };
        Self {
            bars: self
                .bars
                .iter()
                .filter(|b| b.date >= start)
                .copied()
                .collect(),
        }
    }

    /// Tabular view with provider column names
    pub fn to_dataframe(&self) -> Result<DataFrame> {
        let days: Vec<i32> = self.bars.iter().map(|b| epoch_days(b.date)).collect();
        let date = Series::new("Date", days).cast(&DataType::Date)?;

        let df = DataFrame::new(vec![
            date,
            Series::new("Open", self.bars.iter().map(|b| b.open).collect::<Vec<f64>>()),
            Series::new("High", self.bars.iter().map(|b| b.high).collect::<Vec<f64>>()),
            Series::new("Low", self.bars.iter().map(|b| b.low).collect::<Vec<f64>>()),
            Series::new("Close", self.close_prices()),
            Series::new("Volume", self.bars.iter().map(|b| b.volume).collect::<Vec<u64>>()),
        ])?;
        Ok(df)
    }
}

/// A series in the engine schema: `(ds, y)` with an optional `cap` column
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PreparedSeries {
    timestamps: Vec<NaiveDate>,
    values: Vec<f64>,
    capacity: Option<Vec<f64>>,
}

impl PreparedSeries {
    /// Assemble a prepared series from its columns.
    ///
    /// Columns must have equal length, timestamps must be strictly ascending and
    /// capacities must be positive.
    pub fn from_parts(
        timestamps: Vec<NaiveDate>,
        values: Vec<f64>,
        capacity: Option<Vec<f64>>,
    ) -> Result<Self> {
        if timestamps.len() != values.len() {
            return Err(ForecastError::DataError(format!(
                "Timestamp column has {} rows but value column has {}",
                timestamps.len(),
                values.len()
            )));
        }
        if timestamps.windows(2).any(|w| w[0] >= w[1]) {
            return Err(ForecastError::DataError(
                "Timestamps must be strictly ascending".to_string(),
            ));
        }
        if values.iter().any(|v| !v.is_finite()) {
            return Err(ForecastError::DataError(
                "Values must be finite numbers".to_string(),
            ));
        }
        if let Some(cap) = &capacity {
            if cap.len() != values.len() {
                return Err(ForecastError::DataError(format!(
                    "Capacity column has {} rows but value column has {}",
                    cap.len(),
                    values.len()
                )));
            }
            if cap.iter().any(|c| !(c.is_finite() && *c > 0.0)) {
                return Err(ForecastError::DataError(
                    "Capacities must be positive finite numbers".to_string(),
                ));
            }
        }
        Ok(Self {
            timestamps,
            values,
            capacity,
        })
    }

    pub fn timestamps(&self) -> &[NaiveDate] {
        &self.timestamps
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Capacity column, present only under logistic growth
    pub fn capacity(&self) -> Option<&[f64]> {
        self.capacity.as_deref()
    }

    /// The capacity shared by every row, when the column is uniform
    pub fn capacity_value(&self) -> Option<f64> {
        let cap = self.capacity.as_ref()?;
        let first = *cap.first()?;
        cap.iter().all(|c| *c == first).then_some(first)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn last_timestamp(&self) -> Option<NaiveDate> {
        self.timestamps.last().copied()
    }

    /// Tabular view in the engine schema
    pub fn to_dataframe(&self) -> Result<DataFrame> {
        let days: Vec<i32> = self.timestamps.iter().map(|d| epoch_days(*d)).collect();
        let mut columns = vec![
            Series::new(TIMESTAMP_COLUMN, days).cast(&DataType::Date)?,
            Series::new(VALUE_COLUMN, self.values.clone()),
        ];
        if let Some(cap) = &self.capacity {
            columns.push(Series::new(CAPACITY_COLUMN, cap.clone()));
        }
        Ok(DataFrame::new(columns)?)
    }
}

/// Reshapes fetched prices into the engine schema
#[derive(Debug, Clone, Copy, Default)]
pub struct SeriesPreparer;

impl SeriesPreparer {
    /// Minimum number of observations needed to fit a trend
    pub const MIN_OBSERVATIONS: usize = 2;

    /// Map `(date, close)` to `(ds, y)` and attach the capacity under logistic growth
    pub fn prepare(series: &PriceSeries, config: &ForecastConfig) -> Result<PreparedSeries> {
        if series.len() < Self::MIN_OBSERVATIONS {
            return Err(ForecastError::InsufficientDataError(format!(
                "Forecasting '{}' needs at least {} observations, got {}",
                config.ticker(),
                Self::MIN_OBSERVATIONS,
                series.len()
            )));
        }

        let timestamps = series.dates();
        let values = series.close_prices();
        let capacity = match config.growth() {
            Growth::Linear => None,
            Growth::Logistic {
                capacity_multiplier,
            } => {
                let cap = Self::capacity_value(series, capacity_multiplier)?;
                Some(vec![cap; values.len()])
            }
        };

        let prepared = PreparedSeries::from_parts(timestamps, values, capacity)?;
        debug!(
            rows = prepared.len(),
            capacity = ?prepared.capacity_value(),
            "Prepared series"
        );
        Ok(prepared)
    }

    /// Saturation level: the multiplier applied to the most recent close
    pub fn capacity_value(series: &PriceSeries, multiplier: f64) -> Result<f64> {
        let last = series.last().ok_or_else(|| {
            ForecastError::InsufficientDataError("Cannot derive a capacity from an empty series".to_string())
        })?;
        let cap = multiplier * last.close;
        if !(cap.is_finite() && cap > 0.0) {
            return Err(ForecastError::DataError(format!(
                "Capacity {} derived from close {} is not positive",
                cap, last.close
            )));
        }
        Ok(cap)
    }
}

/// Data loader for price files
#[derive(Debug)]
pub struct DataLoader;

impl DataLoader {
    /// Load a price series from a CSV file
    pub fn from_csv<P: AsRef<Path>>(path: P) -> Result<PriceSeries> {
        let file = File::open(path)?;
        let df = CsvReader::new(file)
            .infer_schema(None)
            .has_header(true)
            .finish()?;

        Self::from_dataframe(&df)
    }

    /// Detect date, price and volume columns in a DataFrame and build a series
    pub fn from_dataframe(df: &DataFrame) -> Result<PriceSeries> {
        let date_column = Self::detect_column(df, &["date", "time", "timestamp", "ds"])
            .ok_or_else(|| ForecastError::DataError("No date column found in data".to_string()))?;
        let close_column = Self::detect_column(df, &["close", "price", "y"])
            .ok_or_else(|| ForecastError::DataError("No close column found in data".to_string()))?;

        let dates = Self::column_as_dates(df, &date_column)?;
        let closes = Self::column_as_f64(df, &close_column)?;
        let opens = Self::optional_f64(df, "open")?.unwrap_or_else(|| closes.clone());
        let highs = Self::optional_f64(df, "high")?.unwrap_or_else(|| closes.clone());
        let lows = Self::optional_f64(df, "low")?.unwrap_or_else(|| closes.clone());
        let volumes = Self::optional_f64(df, "volume")?.unwrap_or_else(|| vec![0.0; dates.len()]);

        let bars = (0..dates.len())
            .map(|i| PriceBar {
                date: dates[i],
                open: opens[i],
                high: highs[i],
                low: lows[i],
                close: closes[i],
                volume: volumes[i].max(0.0).round() as u64,
            })
            .collect();

        PriceSeries::from_unsorted(bars)
    }

    /// First column whose lower-cased name contains one of `candidates`, tried in order
    fn detect_column(df: &DataFrame, candidates: &[&str]) -> Option<String> {
        let names = df.get_column_names();
        candidates.iter().find_map(|candidate| {
            names
                .iter()
                .find(|name| {
                    let lower = name.to_lowercase();
                    if candidate.len() <= 2 {
                        lower == *candidate
                    } else {
                        lower.contains(candidate)
                    }
                })
                .map(|name| name.to_string())
        })
    }

    fn optional_f64(df: &DataFrame, candidate: &str) -> Result<Option<Vec<f64>>> {
        match Self::detect_column(df, &[candidate]) {
            Some(name) => Ok(Some(Self::column_as_f64(df, &name)?)),
            None => Ok(None),
        }
    }

    /// Column values as `f64`; nulls are rejected
    fn column_as_f64(df: &DataFrame, column_name: &str) -> Result<Vec<f64>> {
        let col = df.column(column_name).map_err(|e| {
            ForecastError::DataError(format!("Column '{}' not found: {}", column_name, e))
        })?;
        if !col.dtype().is_numeric() {
            return Err(ForecastError::DataError(format!(
                "Column '{}' cannot be converted to f64",
                column_name
            )));
        }

        let values = col.cast(&DataType::Float64)?;
        let values = values
            .f64()?
            .into_iter()
            .enumerate()
            .map(|(row, v)| {
                v.ok_or_else(|| {
                    ForecastError::DataError(format!(
                        "Column '{}' has a missing value in row {}",
                        column_name, row
                    ))
                })
            })
            .collect::<Result<Vec<f64>>>()?;
        Ok(values)
    }

    /// Column values as dates, from text, date or datetime columns
    fn column_as_dates(df: &DataFrame, column_name: &str) -> Result<Vec<NaiveDate>> {
        let col = df.column(column_name)?;
        match col.dtype() {
            DataType::Utf8 => col
                .utf8()?
                .into_iter()
                .map(|v| {
                    v.ok_or_else(|| {
                        ForecastError::DataError(format!("Column '{}' has a missing date", column_name))
                    })
                    .and_then(date_parser::parse_date)
                })
                .collect(),
            DataType::Date | DataType::Datetime(_, _) => {
                let days = col.cast(&DataType::Date)?.cast(&DataType::Int32)?;
                let dates = days
                    .i32()?
                    .into_iter()
                    .map(|v| {
                        v.ok_or_else(|| {
                            ForecastError::DataError(format!(
                                "Column '{}' has a missing date",
                                column_name
                            ))
                        })
                        .and_then(from_epoch_days)
                    })
                    .collect::<Result<Vec<NaiveDate>>>()?;
                Ok(dates)
            }
            other => Err(ForecastError::DataError(format!(
                "Column '{}' of type {} cannot be read as dates",
                column_name, other
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bar(day: u32, close: f64) -> PriceBar {
        PriceBar {
            date: NaiveDate::from_ymd_opt(2024, 1, day).unwrap(),
            open: close,
            high: close,
            low: close,
            close,
            volume: 100,
        }
    }

    #[test]
    fn test_series_rejects_duplicates() {
        let result = PriceSeries::new(vec![bar(2, 1.0), bar(2, 2.0)]);
        assert!(matches!(result, Err(ForecastError::DataError(_))));
    }

    #[test]
    fn test_from_unsorted_sorts_and_dedups() {
        let series = PriceSeries::from_unsorted(vec![bar(3, 3.0), bar(2, 2.0), bar(3, 4.0)]).unwrap();
        assert_eq!(series.len(), 2);
        assert_eq!(series.close_prices(), vec![2.0, 4.0]);
    }

    #[test]
    fn test_capacity_value_uses_last_close() {
        let series = PriceSeries::new(vec![bar(2, 200.0), bar(3, 150.0)]).unwrap();
        let cap = SeriesPreparer::capacity_value(&series, 1.2).unwrap();
        assert!((cap - 180.0).abs() < 1e-9);
    }

    #[test]
    fn test_prepared_series_validation() {
        let d = |day| NaiveDate::from_ymd_opt(2024, 1, day).unwrap();
        assert!(PreparedSeries::from_parts(vec![d(1)], vec![1.0, 2.0], None).is_err());
        assert!(PreparedSeries::from_parts(vec![d(2), d(1)], vec![1.0, 2.0], None).is_err());
        assert!(PreparedSeries::from_parts(vec![d(1), d(2)], vec![1.0, 2.0], Some(vec![1.0])).is_err());
        assert!(
            PreparedSeries::from_parts(vec![d(1), d(2)], vec![1.0, 2.0], Some(vec![0.0, 1.0]))
                .is_err()
        );

        let ok = PreparedSeries::from_parts(vec![d(1), d(2)], vec![1.0, 2.0], Some(vec![3.0, 3.0]))
            .unwrap();
        assert_eq!(ok.capacity_value(), Some(3.0));
    }

    #[test]
    fn test_dataframe_schema() {
        let series = PriceSeries::new(vec![bar(2, 1.0), bar(3, 2.0)]).unwrap();
        let df = series.to_dataframe().unwrap();
        assert_eq!(
            df.get_column_names(),
            vec!["Date", "Open", "High", "Low", "Close", "Volume"]
        );
        assert_eq!(df.height(), 2);
    }
}
