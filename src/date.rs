use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;
use time::{Date, Month, OffsetDateTime};

static TEXT_DATE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"([0-9]{1,2})/([0-9]{1,2})/([0-9]{2,4})").expect("date pattern is valid")
});
static NAME_DATE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[0-9]{6}").expect("file name date pattern is valid"));

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DateSource {
    Text,
    FileName,
    None,
}

pub fn detect_date(text: &str, file_name: &str) -> (Option<Date>, DateSource) {
    if let Some(d) = date_from_text(text) {
        return (Some(d), DateSource::Text);
    }
    if let Some(d) = date_from_file_name(file_name) {
        return (Some(d), DateSource::FileName);
    }
    (None, DateSource::None)
}

pub fn date_from_text(text: &str) -> Option<Date> {
    let caps = TEXT_DATE_RE.captures(text)?;
    let a: u8 = caps[1].parse().ok()?;
    let b: u8 = caps[2].parse().ok()?;
    let year = expand_year(&caps[3])?;
    ymd(year, b, a).or_else(|| ymd(year, a, b))
}

pub fn date_from_file_name(file_name: &str) -> Option<Date> {
    let m = NAME_DATE_RE.find(file_name)?;
    let digits = m.as_str();
    let yy: i32 = digits[0..2].parse().ok()?;
    let mm: u8 = digits[2..4].parse().ok()?;
    let dd: u8 = digits[4..6].parse().ok()?;
    ymd(2000 + yy, mm, dd)
}

fn expand_year(raw: &str) -> Option<i32> {
    let y: i32 = raw.parse().ok()?;
    match raw.len() {
        2 => Some(pivot_two_digit_year(y, OffsetDateTime::now_utc().year())),
        4 => Some(y),
        _ => None,
    }
}

/// Two-digit years land within 50 years of `current_year`.
pub fn pivot_two_digit_year(yy: i32, current_year: i32) -> i32 {
    let year = current_year - current_year.rem_euclid(100) + yy;
    if year >= current_year + 50 {
        year - 100
    } else if year < current_year - 50 {
        year + 100
    } else {
        year
    }
}

fn ymd(year: i32, month: u8, day: u8) -> Option<Date> {
    let month = Month::try_from(month).ok()?;
    Date::from_calendar_date(year, month, day).ok()
}
