// src/normalize/date.rs

use chrono::{Datelike, NaiveDate};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::DateError;
use crate::model::YearMonth;
use crate::text::normalize_text;

/// Two-digit years below this pivot are 20xx, the rest 19xx.
pub const DEFAULT_YEAR_PIVOT: u8 = 90;

const MONTHS: [&str; 12] = [
    "januari",
    "februari",
    "mars",
    "april",
    "maj",
    "juni",
    "juli",
    "augusti",
    "september",
    "oktober",
    "november",
    "december",
];

static ISO_DATE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d{4})-(\d{1,2})-(\d{1,2})(?:[T ].*)?$").expect("iso date regex"));
static LONG_DATE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d{1,2})\s+(\p{L}+)\.?\s+(\d{4})$").expect("long date regex"));
static SHORT_YMD_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d{2})-(\d{2})-(\d{2})$").expect("short ymd regex"));
static SHORT_DMY_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d{1,2})[/.](\d{1,2})[/.](\d{2})$").expect("short dmy regex"));
static DOTTED_DMY_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d{1,2})[/.](\d{1,2})[/.](\d{4})$").expect("dotted dmy regex"));

static COMPACT_MONTH_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d{4})-?(\d{2})$").expect("compact month regex"));
static NAMED_MONTH_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\p{L}+)\.?(?:\s+(\d{4}))?$").expect("named month regex"));

/// Month number for a Swedish month name or its three/four letter abbreviation.
pub fn month_from_name(name: &str) -> Option<u32> {
    let name = name.to_lowercase();
    let name = name.trim_end_matches('.');
    if name.chars().count() < 3 {
        return None;
    }
    MONTHS
        .iter()
        .position(|full| *full == name || (name.chars().count() <= 4 && full.starts_with(name)))
        .map(|i| i as u32 + 1)
}

/// Expand a two-digit year around `pivot`.
pub fn expand_two_digit_year(yy: u32, pivot: u8) -> i32 {
    let yy = yy as i32 % 100;
    if yy < pivot as i32 {
        2000 + yy
    } else {
        1900 + yy
    }
}

/// Most recent occurrence of `month` that is not after `now`.
pub fn infer_year(month: u32, now: NaiveDate) -> i32 {
    if month > now.month() {
        now.year() - 1
    } else {
        now.year()
    }
}

fn num(s: &str) -> u32 {
    // regex guarantees ascii digits of bounded length
    s.parse().unwrap_or(0)
}

fn ymd(text: &str, year: i32, month: u32, day: u32) -> Result<NaiveDate, DateError> {
    NaiveDate::from_ymd_opt(year, month, day).ok_or_else(|| DateError::OutOfRange(text.to_string()))
}

/// Parse an effective date.
///
/// Accepts `2024-03-15`, `15 mars 2024`, `15.03.2024`, and two-digit-year
/// forms `24-03-15` (YY-MM-DD) and `15/03/24` (DD/MM/YY).
pub fn parse_date(raw: &str, pivot: u8) -> Result<NaiveDate, DateError> {
    let text = normalize_text(raw);

    if let Some(c) = ISO_DATE_RE.captures(&text) {
        return ymd(&text, num(&c[1]) as i32, num(&c[2]), num(&c[3]));
    }
    if let Some(c) = LONG_DATE_RE.captures(&text) {
        let month = month_from_name(&c[2]).ok_or_else(|| DateError::Unrecognized(text.clone()))?;
        return ymd(&text, num(&c[3]) as i32, month, num(&c[1]));
    }
    if let Some(c) = DOTTED_DMY_RE.captures(&text) {
        return ymd(&text, num(&c[3]) as i32, num(&c[2]), num(&c[1]));
    }
    if let Some(c) = SHORT_YMD_RE.captures(&text) {
        let year = expand_two_digit_year(num(&c[1]), pivot);
        return ymd(&text, year, num(&c[2]), num(&c[3]));
    }
    if let Some(c) = SHORT_DMY_RE.captures(&text) {
        let year = expand_two_digit_year(num(&c[3]), pivot);
        return ymd(&text, year, num(&c[2]), num(&c[1]));
    }
    Err(DateError::Unrecognized(text))
}

/// Parse a reference month.
///
/// Accepts `202403`, `2024-03`, `mars 2024`, `mar 2024` and a bare month
/// name, whose year is the latest one not in the future relative to `now`.
pub fn parse_month(raw: &str, now: NaiveDate) -> Result<YearMonth, DateError> {
    let text = normalize_text(raw);

    let (year, month) = if let Some(c) = COMPACT_MONTH_RE.captures(&text) {
        (num(&c[1]) as i32, num(&c[2]))
    } else if let Some(c) = NAMED_MONTH_RE.captures(&text) {
        let month = month_from_name(&c[1]).ok_or_else(|| DateError::Unrecognized(text.clone()))?;
        let year = match c.get(2) {
            Some(y) => num(y.as_str()) as i32,
            None => infer_year(month, now),
        };
        (year, month)
    } else {
        return Err(DateError::Unrecognized(text));
    };

    YearMonth::new(year, month).ok_or(DateError::OutOfRange(text))
}
