//! Rule-based national holiday calendars
//!
//! Each country is a table of rules: fixed dates, n-th or last weekday of a month,
//! the weekday preceding a date, and offsets from Western Easter. Holidays that
//! fall on a weekend may produce an extra "(Observed)" date, either on the
//! nearest weekday (US federal rule) or on the next free weekday (substitute days).

use super::HolidayCalendar;
use crate::config::CountryCode;
use crate::error::{ForecastError, Result};
use crate::models::Holiday;
use chrono::{Datelike, Duration, NaiveDate, Weekday};
use std::collections::BTreeSet;
use tracing::debug;

/// Countries with a built-in calendar
pub const SUPPORTED_COUNTRIES: [&str; 7] = ["AU", "CA", "DE", "FR", "GB", "IT", "US"];

/// Widest year range served in one request
const MAX_YEARS: i32 = 200;

#[derive(Debug, Clone, Copy)]
enum DateRule {
    /// Month and day
    Fixed(u32, u32),
    /// n-th weekday of a month, 1-based
    Nth(u32, Weekday, u8),
    /// Last weekday of a month
    Last(u32, Weekday),
    /// Last weekday strictly before a month and day
    Before(u32, u32, Weekday),
    /// Days after Easter Sunday
    Easter(i64),
}

impl DateRule {
    fn resolve(&self, year: i32) -> Option<NaiveDate> {
        match *self {
            DateRule::Fixed(month, day) => NaiveDate::from_ymd_opt(year, month, day),
            DateRule::Nth(month, weekday, n) => {
                NaiveDate::from_weekday_of_month_opt(year, month, weekday, n)
            }
            DateRule::Last(month, weekday) => {
                let last_day = last_day_of_month(year, month)?;
                let back = (7 + last_day.weekday().num_days_from_monday()
                    - weekday.num_days_from_monday())
                    % 7;
                Some(last_day - Duration::days(back as i64))
            }
            DateRule::Before(month, day, weekday) => {
                let anchor = NaiveDate::from_ymd_opt(year, month, day)?;
                let back = (7 + anchor.weekday().num_days_from_monday()
                    - weekday.num_days_from_monday())
                    % 7;
                let back = if back == 0 { 7 } else { back };
                Some(anchor - Duration::days(back as i64))
            }
            DateRule::Easter(offset) => {
                easter_sunday(year).map(|easter| easter + Duration::days(offset))
            }
        }
    }
}

/// How a weekend holiday is observed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Observance {
    None,
    /// Saturday moves to Friday, Sunday to Monday
    NearestWeekday,
    /// Moves to the next weekday that is not already a holiday
    NextFreeWeekday,
}

#[derive(Debug, Clone, Copy)]
struct HolidayRule {
    name: &'static str,
    date: DateRule,
    observance: Observance,
    since: i32,
}

impl HolidayRule {
    const fn new(name: &'static str, date: DateRule) -> Self {
        Self {
            name,
            date,
            observance: Observance::None,
            since: i32::MIN,
        }
    }

    const fn observed(self, observance: Observance) -> Self {
        Self { observance, ..self }
    }

    const fn since(self, year: i32) -> Self {
        Self { since: year, ..self }
    }
}

use DateRule::{Before, Easter, Fixed, Last, Nth};
use Observance::{NearestWeekday, NextFreeWeekday};

const US: &[HolidayRule] = &[
    HolidayRule::new("New Year's Day", Fixed(1, 1)).observed(NearestWeekday),
    HolidayRule::new("Martin Luther King Jr. Day", Nth(1, Weekday::Mon, 3)).since(1986),
    HolidayRule::new("Washington's Birthday", Nth(2, Weekday::Mon, 3)),
    HolidayRule::new("Memorial Day", Last(5, Weekday::Mon)),
    HolidayRule::new("Juneteenth National Independence Day", Fixed(6, 19))
        .observed(NearestWeekday)
        .since(2021),
    HolidayRule::new("Independence Day", Fixed(7, 4)).observed(NearestWeekday),
    HolidayRule::new("Labor Day", Nth(9, Weekday::Mon, 1)),
    HolidayRule::new("Columbus Day", Nth(10, Weekday::Mon, 2)),
    HolidayRule::new("Veterans Day", Fixed(11, 11)).observed(NearestWeekday),
    HolidayRule::new("Thanksgiving", Nth(11, Weekday::Thu, 4)),
    HolidayRule::new("Christmas Day", Fixed(12, 25)).observed(NearestWeekday),
];

const GB: &[HolidayRule] = &[
    HolidayRule::new("New Year's Day", Fixed(1, 1)).observed(NextFreeWeekday),
    HolidayRule::new("Good Friday", Easter(-2)),
    HolidayRule::new("Easter Monday", Easter(1)),
    HolidayRule::new("May Day", Nth(5, Weekday::Mon, 1)),
    HolidayRule::new("Spring Bank Holiday", Last(5, Weekday::Mon)),
    HolidayRule::new("Late Summer Bank Holiday", Last(8, Weekday::Mon)),
    HolidayRule::new("Christmas Day", Fixed(12, 25)).observed(NextFreeWeekday),
    HolidayRule::new("Boxing Day", Fixed(12, 26)).observed(NextFreeWeekday),
];

const AU: &[HolidayRule] = &[
    HolidayRule::new("New Year's Day", Fixed(1, 1)).observed(NextFreeWeekday),
    HolidayRule::new("Australia Day", Fixed(1, 26)).observed(NextFreeWeekday),
    HolidayRule::new("Good Friday", Easter(-2)),
    HolidayRule::new("Easter Saturday", Easter(-1)),
    HolidayRule::new("Easter Monday", Easter(1)),
    HolidayRule::new("ANZAC Day", Fixed(4, 25)),
    HolidayRule::new("Christmas Day", Fixed(12, 25)).observed(NextFreeWeekday),
    HolidayRule::new("Boxing Day", Fixed(12, 26)).observed(NextFreeWeekday),
];

const CA: &[HolidayRule] = &[
    HolidayRule::new("New Year's Day", Fixed(1, 1)).observed(NextFreeWeekday),
    HolidayRule::new("Good Friday", Easter(-2)),
    HolidayRule::new("Victoria Day", Before(5, 25, Weekday::Mon)),
    HolidayRule::new("Canada Day", Fixed(7, 1)).observed(NextFreeWeekday),
    HolidayRule::new("Labour Day", Nth(9, Weekday::Mon, 1)),
    HolidayRule::new("Thanksgiving", Nth(10, Weekday::Mon, 2)),
    HolidayRule::new("Christmas Day", Fixed(12, 25)).observed(NextFreeWeekday),
    HolidayRule::new("Boxing Day", Fixed(12, 26)).observed(NextFreeWeekday),
];

const DE: &[HolidayRule] = &[
    HolidayRule::new("New Year's Day", Fixed(1, 1)),
    HolidayRule::new("Good Friday", Easter(-2)),
    HolidayRule::new("Easter Monday", Easter(1)),
    HolidayRule::new("Labour Day", Fixed(5, 1)),
    HolidayRule::new("Ascension Day", Easter(39)),
    HolidayRule::new("Whit Monday", Easter(50)),
    HolidayRule::new("German Unity Day", Fixed(10, 3)).since(1990),
    HolidayRule::new("Christmas Day", Fixed(12, 25)),
    HolidayRule::new("Second Day of Christmas", Fixed(12, 26)),
];

const FR: &[HolidayRule] = &[
    HolidayRule::new("New Year's Day", Fixed(1, 1)),
    HolidayRule::new("Easter Monday", Easter(1)),
    HolidayRule::new("Labour Day", Fixed(5, 1)),
    HolidayRule::new("Victory in Europe Day", Fixed(5, 8)),
    HolidayRule::new("Ascension Day", Easter(39)),
    HolidayRule::new("Whit Monday", Easter(50)),
    HolidayRule::new("National Day", Fixed(7, 14)),
    HolidayRule::new("Assumption Day", Fixed(8, 15)),
    HolidayRule::new("All Saints' Day", Fixed(11, 1)),
    HolidayRule::new("Armistice Day", Fixed(11, 11)),
    HolidayRule::new("Christmas Day", Fixed(12, 25)),
];

const IT: &[HolidayRule] = &[
    HolidayRule::new("New Year's Day", Fixed(1, 1)),
    HolidayRule::new("Epiphany", Fixed(1, 6)),
    HolidayRule::new("Easter Sunday", Easter(0)),
    HolidayRule::new("Easter Monday", Easter(1)),
    HolidayRule::new("Liberation Day", Fixed(4, 25)),
    HolidayRule::new("Labour Day", Fixed(5, 1)),
    HolidayRule::new("Republic Day", Fixed(6, 2)),
    HolidayRule::new("Assumption Day", Fixed(8, 15)),
    HolidayRule::new("All Saints' Day", Fixed(11, 1)),
    HolidayRule::new("Immaculate Conception", Fixed(12, 8)),
    HolidayRule::new("Christmas Day", Fixed(12, 25)),
    HolidayRule::new("Saint Stephen's Day", Fixed(12, 26)),
];

fn rules_for(country: &str) -> Option<&'static [HolidayRule]> {
    match country {
        "AU" => Some(AU),
        "CA" => Some(CA),
        "DE" => Some(DE),
        "FR" => Some(FR),
        "GB" => Some(GB),
        "IT" => Some(IT),
        "US" => Some(US),
        _ => None,
    }
}

/// Western Easter Sunday (anonymous Gregorian algorithm)
pub fn easter_sunday(year: i32) -> Option<NaiveDate> {
    let a = year % 19;
    let b = year / 100;
    let c = year % 100;
    let d = b / 4;
    let e = b % 4;
    let f = (b + 8) / 25;
    let g = (b - f + 1) / 3;
    let h = (19 * a + b - d - g + 15) % 30;
    let i = c / 4;
    let k = c % 4;
    let l = (32 + 2 * e + 2 * i - h - k) % 7;
    let m = (a + 11 * h + 22 * l) / 451;
    let month = (h + l - 7 * m + 114) / 31;
    let day = (h + l - 7 * m + 114) % 31 + 1;
    NaiveDate::from_ymd_opt(year, month as u32, day as u32)
}

fn last_day_of_month(year: i32, month: u32) -> Option<NaiveDate> {
    let (next_year, next_month) = if month == 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    };
    NaiveDate::from_ymd_opt(next_year, next_month, 1)?.pred_opt()
}

fn is_weekend(date: NaiveDate) -> bool {
    matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}

fn next_free_weekday(date: NaiveDate, taken: &BTreeSet<NaiveDate>) -> Option<NaiveDate> {
    let mut candidate = date.succ_opt()?;
    while is_weekend(candidate) || taken.contains(&candidate) {
        candidate = candidate.succ_opt()?;
    }
    Some(candidate)
}

fn holidays_in_year(rules: &[HolidayRule], year: i32) -> Vec<Holiday> {
    let mut actual: Vec<(NaiveDate, &HolidayRule)> = rules
        .iter()
        .filter(|rule| year >= rule.since)
        .filter_map(|rule| rule.date.resolve(year).map(|date| (date, rule)))
        .collect();
    actual.sort_by_key(|(date, _)| *date);

    let mut taken: BTreeSet<NaiveDate> = actual.iter().map(|(date, _)| *date).collect();
    let mut holidays: Vec<Holiday> = actual
        .iter()
        .map(|(date, rule)| Holiday::new(*date, rule.name))
        .collect();

    for (date, rule) in &actual {
        if !is_weekend(*date) {
            continue;
        }
        let observed = match rule.observance {
            Observance::None => None,
            Observance::NearestWeekday => match date.weekday() {
                Weekday::Sat => date.pred_opt(),
                _ => date.succ_opt(),
            },
            Observance::NextFreeWeekday => next_free_weekday(*date, &taken),
        };
        if let Some(observed) = observed {
            taken.insert(observed);
            holidays.push(Holiday::new(observed, format!("{} (Observed)", rule.name)));
        }
    }
    holidays
}

/// Built-in calendars for a fixed set of countries
#[derive(Debug, Clone, Copy, Default)]
pub struct BuiltinCalendar;

impl HolidayCalendar for BuiltinCalendar {
    fn countries(&self) -> Vec<CountryCode> {
        SUPPORTED_COUNTRIES
            .iter()
            .filter_map(|code| CountryCode::new(code).ok())
            .collect()
    }

    fn holidays(&self, country: &CountryCode, first_year: i32, last_year: i32) -> Result<Vec<Holiday>> {
        let rules = rules_for(country.as_str()).ok_or_else(|| {
            ForecastError::ValidationError(format!(
                "No holiday calendar for country '{}'",
                country
            ))
        })?;
        if first_year > last_year || last_year - first_year > MAX_YEARS {
            return Err(ForecastError::ValidationError(format!(
                "Invalid holiday year range {}..={}",
                first_year, last_year
            )));
        }

        let mut holidays: Vec<Holiday> = (first_year - 1..=last_year + 1)
            .flat_map(|year| holidays_in_year(rules, year))
            .filter(|h| (first_year..=last_year).contains(&h.date.year()))
            .collect();
        holidays.sort();
        holidays.dedup();
        debug!(
            country = %country,
            first_year = first_year,
            last_year = last_year,
            count = holidays.len(),
            "Generated holiday calendar"
        );
        Ok(holidays)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_easter() {
        assert_eq!(easter_sunday(2023), Some(date(2023, 4, 9)));
        assert_eq!(easter_sunday(2024), Some(date(2024, 3, 31)));
        assert_eq!(easter_sunday(2025), Some(date(2025, 4, 20)));
    }

    #[test]
    fn test_rules_resolve() {
        assert_eq!(Last(5, Weekday::Mon).resolve(2024), Some(date(2024, 5, 27)));
        assert_eq!(Nth(11, Weekday::Thu, 4).resolve(2024), Some(date(2024, 11, 28)));
        assert_eq!(Before(5, 25, Weekday::Mon).resolve(2024), Some(date(2024, 5, 20)));
        // May 25, 2026 is itself a Monday
        assert_eq!(Before(5, 25, Weekday::Mon).resolve(2026), Some(date(2026, 5, 18)));
    }

    #[test]
    fn test_substitute_days_do_not_collide() {
        // Christmas 2021 fell on a Saturday and Boxing Day on a Sunday
        let holidays = holidays_in_year(GB, 2021);
        let observed: Vec<NaiveDate> = holidays
            .iter()
            .filter(|h| h.name.ends_with("(Observed)"))
            .map(|h| h.date)
            .collect();
        assert!(observed.contains(&date(2021, 12, 27)));
        assert!(observed.contains(&date(2021, 12, 28)));
    }
}
