use chrono::{Datelike, NaiveDate, Weekday};
use rstest::rstest;
use stock_forecast::models::Holiday;
use stock_forecast::providers::calendar::easter_sunday;
use stock_forecast::{BuiltinCalendar, CountryCode, ForecastError, HolidayCalendar};

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn holidays(country: &str, first: i32, last: i32) -> Vec<Holiday> {
    BuiltinCalendar
        .holidays(&CountryCode::new(country).unwrap(), first, last)
        .unwrap()
}

fn find<'a>(holidays: &'a [Holiday], name: &str) -> Vec<&'a Holiday> {
    holidays.iter().filter(|h| h.name == name).collect()
}

#[test]
fn test_supported_countries() {
    let countries: Vec<String> = BuiltinCalendar
        .countries()
        .iter()
        .map(|c| c.to_string())
        .collect();
    assert!(countries.contains(&"US".to_string()));
    assert!(countries.contains(&"GB".to_string()));
    assert!(countries.contains(&"DE".to_string()));
}

#[test]
fn test_us_holidays_2024() {
    let us = holidays("US", 2024, 2024);

    assert_eq!(find(&us, "Thanksgiving")[0].date, date(2024, 11, 28));
    assert_eq!(find(&us, "Memorial Day")[0].date, date(2024, 5, 27));
    assert_eq!(find(&us, "Labor Day")[0].date, date(2024, 9, 2));
    assert!(us.iter().all(|h| h.date.year() == 2024));
    assert!(us.windows(2).all(|w| w[0].date <= w[1].date));
}

#[test]
fn test_weekend_holiday_is_observed() {
    // July 4, 2021 was a Sunday
    let us = holidays("US", 2021, 2021);
    let observed = find(&us, "Independence Day (Observed)");
    assert_eq!(observed.len(), 1);
    assert_eq!(observed[0].date, date(2021, 7, 5));
    assert_eq!(observed[0].date.weekday(), Weekday::Mon);
}

#[test]
fn test_juneteenth_starts_in_2021() {
    assert!(find(&holidays("US", 2020, 2020), "Juneteenth National Independence Day").is_empty());
    assert_eq!(
        find(&holidays("US", 2022, 2022), "Juneteenth National Independence Day").len(),
        1
    );
}

#[rstest]
#[case(2019, date(2019, 4, 21))]
#[case(2024, date(2024, 3, 31))]
#[case(2038, date(2038, 4, 25))]
fn test_easter_sunday(#[case] year: i32, #[case] expected: NaiveDate) {
    assert_eq!(easter_sunday(year), Some(expected));
}

#[test]
fn test_easter_holidays_follow_easter() {
    let gb = holidays("GB", 2024, 2024);
    assert_eq!(find(&gb, "Good Friday")[0].date, date(2024, 3, 29));
    assert_eq!(find(&gb, "Easter Monday")[0].date, date(2024, 4, 1));
}

#[test]
fn test_multi_year_range() {
    let us = holidays("US", 2022, 2024);
    assert_eq!(find(&us, "Thanksgiving").len(), 3);
}

#[test]
fn test_unsupported_country() {
    let result = BuiltinCalendar.holidays(&CountryCode::new("JP").unwrap(), 2024, 2024);
    match result {
        Err(ForecastError::ValidationError(_)) => assert!(true),
        other => panic!("Expected ValidationError, got {:?}", other),
    }
}

#[test]
fn test_reversed_range() {
    let result = BuiltinCalendar.holidays(&CountryCode::new("US").unwrap(), 2025, 2024);
    assert!(matches!(result, Err(ForecastError::ValidationError(_))));
}
