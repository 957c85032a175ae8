// src/normalize/rate.rs

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::RateError;
use crate::text::normalize_text;

/// Digits with an optional comma or period decimal part.
static RATE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d{1,3})(?:[.,](\d+))?$").expect("rate regex"));

/// Cell contents meaning "nothing published here".
const NO_DATA: &[&str] = &["-", "--", "–", "—", "−", "n/a", "na", "*", "saknas", "ej aktuell"];

/// Parse a percentage such as `3,45 %`, `3.45%` or `3,45` into `3.45`.
///
/// Empty cells, dash placeholders, digit-free text and non-positive values
/// are [`RateError::NoData`]; anything else that fails to parse is
/// [`RateError::Malformed`].
pub fn parse_rate(raw: &str) -> Result<f64, RateError> {
    let text = normalize_text(raw);
    let lowered = text.to_lowercase();
    if lowered.is_empty() || NO_DATA.contains(&lowered.as_str()) {
        return Err(RateError::NoData(text));
    }
    if !lowered.chars().any(|c| c.is_ascii_digit()) {
        return Err(RateError::NoData(text));
    }

    // spaces may sit anywhere, e.g. "3 ,45 %"; footnote stars trail the value
    let compact: String = lowered.chars().filter(|c| *c != ' ').collect();
    let compact = compact.trim_end_matches('*');
    let compact = compact.strip_suffix('%').unwrap_or(compact);

    let caps = RATE_RE
        .captures(compact)
        .ok_or_else(|| RateError::Malformed(text.clone()))?;
    let number = match caps.get(2) {
        Some(frac) => format!("{}.{}", &caps[1], frac.as_str()),
        None => caps[1].to_string(),
    };
    let value: f64 = number
        .parse()
        .map_err(|_| RateError::Malformed(text.clone()))?;

    if value <= 0.0 {
        return Err(RateError::NoData(text));
    }
    Ok(value)
}
