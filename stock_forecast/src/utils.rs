//! Utility functions for the stock_forecast crate

use crate::error::{ForecastError, Result};
use chrono::{Datelike, Duration, NaiveDate};

/// `num_days_from_ce` of 1970-01-01
const UNIX_EPOCH_DAYS_FROM_CE: i32 = 719_163;

/// Days elapsed since 1970-01-01
pub fn epoch_days(date: NaiveDate) -> i32 {
    date.num_days_from_ce() - UNIX_EPOCH_DAYS_FROM_CE
}

/// Inverse of [`epoch_days`]
pub fn from_epoch_days(days: i32) -> Result<NaiveDate> {
    NaiveDate::from_num_days_from_ce_opt(days + UNIX_EPOCH_DAYS_FROM_CE).ok_or_else(|| {
        ForecastError::DataError(format!("Day offset {} is outside the supported range", days))
    })
}

/// Create `horizon` consecutive calendar days following `last`
pub fn future_dates(last: NaiveDate, horizon: usize) -> Result<Vec<NaiveDate>> {
    let mut dates = Vec::with_capacity(horizon);
    let mut current = last;
    for _ in 0..horizon {
        current = current
            .checked_add_signed(Duration::days(1))
            .ok_or_else(|| {
                ForecastError::DataError(format!("Cannot extend timeline past {}", current))
            })?;
        dates.push(current);
    }
    Ok(dates)
}

/// Date parsing helpers
pub mod date_parser {
    use super::*;
    use chrono::{DateTime, NaiveDateTime};

    /// Parse a date from `YYYY-MM-DD`, `YYYY/MM/DD`, `YYYY-MM-DD HH:MM:SS` or RFC 3339
    pub fn parse_date(s: &str) -> Result<NaiveDate> {
        let s = s.trim();
        for format in ["%Y-%m-%d", "%Y/%m/%d"] {
            if let Ok(date) = NaiveDate::parse_from_str(s, format) {
                return Ok(date);
            }
        }
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
            return Ok(dt.date());
        }
        if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
            return Ok(dt.date_naive());
        }
        Err(ForecastError::DataError(format!("Unrecognized date '{}'", s)))
    }
}
