//! Holiday regressors
//!
//! Every distinct holiday name becomes one indicator column that is 1.0 on the
//! dates carrying that name. Recurring holidays therefore share one effect.

use crate::error::Result;
use chrono::NaiveDate;
use forecast_math::Matrix;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Name of the aggregated holiday component in a decomposition
pub const HOLIDAYS_COMPONENT: &str = "holidays";

/// A named calendar date
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Holiday {
    pub date: NaiveDate,
    pub name: String,
}

impl Holiday {
    pub fn new(date: NaiveDate, name: impl Into<String>) -> Self {
        Self {
            date,
            name: name.into(),
        }
    }
}

/// Indicator design for a holiday list
#[derive(Debug, Clone, PartialEq)]
pub struct HolidayFeatures {
    by_name: BTreeMap<String, BTreeSet<NaiveDate>>,
}

impl HolidayFeatures {
    pub fn new(holidays: &[Holiday]) -> Self {
        let mut by_name: BTreeMap<String, BTreeSet<NaiveDate>> = BTreeMap::new();
        for holiday in holidays {
            by_name
                .entry(holiday.name.clone())
                .or_default()
                .insert(holiday.date);
        }
        Self { by_name }
    }

    /// Distinct holiday names in column order
    pub fn names(&self) -> Vec<&str> {
        self.by_name.keys().map(String::as_str).collect()
    }

    /// Number of design columns
    pub fn width(&self) -> usize {
        self.by_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }

    /// One row per date, one column per holiday name
    pub fn features(&self, dates: &[NaiveDate]) -> Result<Matrix> {
        let mut design = Matrix::zeros(dates.len(), self.width());
        for (c, days) in self.by_name.values().enumerate() {
            for (r, date) in dates.iter().enumerate() {
                if days.contains(date) {
                    design.set(r, c, 1.0);
                }
            }
        }
        Ok(design)
    }
}
