// src/normalize/term.rs

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::TermError;
use crate::model::Term;
use crate::text::normalize_text;

/// `<count> <unit>` with optional trailing words, e.g. `3 mån bunden`,
/// `5 års`, `1-år`, `ett år`, `10y`.
static TERM_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^(?P<n>\d{1,3}|en|ett|två|tre|fyra|fem|sex|sju|åtta|nio|tio)\s*-?\s*(?P<unit>månader|månad|mån|mnd|m|år|års|y)\.?(?:[\s(,].*)?$",
    )
    .expect("term regex")
});

/// Column headings that show up where a term label would be.
const HEADER_LABELS: &[&str] = &[
    "bindningstid",
    "bindningsperiod",
    "räntebindningstid",
    "räntebindning",
    "löptid",
    "period",
    "månad",
    "genomsnitt",
    "snitt",
    "snittränta",
    "genomsnittlig ränta",
    "term",
    "binding period",
    "average",
];

/// Labels for a variable rate, which resets every three months.
const VARIABLE: &[&str] = &["rörlig", "rörligt", "rörlig ränta"];

fn spelled(n: &str) -> Option<u32> {
    Some(match n {
        "en" | "ett" => 1,
        "två" => 2,
        "tre" => 3,
        "fyra" => 4,
        "fem" => 5,
        "sex" => 6,
        "sju" => 7,
        "åtta" => 8,
        "nio" => 9,
        "tio" => 10,
        digits => digits.parse().ok()?,
    })
}

/// Map a duration label to its [`Term`].
///
/// Known column headings return [`TermError::HeaderRow`] so callers can skip
/// them quietly; everything else that is not a supported duration is
/// [`TermError::Unrecognized`].
pub fn parse_term(raw: &str) -> Result<Term, TermError> {
    let text = normalize_text(raw);
    let label = text
        .to_lowercase()
        .trim_end_matches(['*', ':', '.'])
        .trim()
        .to_string();

    if HEADER_LABELS.contains(&label.as_str()) {
        return Err(TermError::HeaderRow(text));
    }
    if VARIABLE.contains(&label.as_str()) {
        return Ok(Term::ThreeMonths);
    }

    let caps = TERM_RE
        .captures(&label)
        .ok_or_else(|| TermError::Unrecognized(text.clone()))?;
    let n = spelled(&caps["n"]).ok_or_else(|| TermError::Unrecognized(text.clone()))?;

    let term = match &caps["unit"] {
        "år" | "års" | "y" => Term::from_years(n),
        _ if n == 3 => Some(Term::ThreeMonths),
        _ if n % 12 == 0 => Term::from_years(n / 12),
        _ => None,
    };
    term.ok_or(TermError::Unrecognized(text))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_forms_round_trip() {
        for term in Term::ALL {
            assert_eq!(parse_term(&term.to_string()), Ok(term), "{term}");
        }
    }

    #[test]
    fn localized_variants() {
        let cases = [
            ("3 mån", Term::ThreeMonths),
            ("3 mån.", Term::ThreeMonths),
            ("3\u{00A0}månader", Term::ThreeMonths),
            ("3 mån bunden", Term::ThreeMonths),
            ("Rörlig", Term::ThreeMonths),
            ("tre månader", Term::ThreeMonths),
            ("1 år", Term::OneYear),
            ("Ett år", Term::OneYear),
            ("1-år", Term::OneYear),
            ("5 års", Term::FiveYears),
            ("5 år (bunden)", Term::FiveYears),
            ("tio år", Term::TenYears),
            ("24 mån", Term::TwoYears),
            ("3m", Term::ThreeMonths),
            ("10y", Term::TenYears),
        ];
        for (raw, want) in cases {
            assert_eq!(parse_term(raw), Ok(want), "{raw:?}");
        }
    }

    #[test]
    fn header_labels_are_sentinels() {
        fn title_case(s: &str) -> String {
            let mut chars = s.chars();
            chars
                .next()
                .map(|c| c.to_uppercase().chain(chars).collect())
                .unwrap_or_default()
        }

        for label in HEADER_LABELS {
            for raw in [
                label.to_string(),
                title_case(label),
                label.to_uppercase(),
                format!("{}:", title_case(label)),
            ] {
                assert!(matches!(parse_term(&raw), Err(TermError::HeaderRow(_))), "{raw:?}");
            }
        }
    }

    #[test]
    fn unsupported_durations_are_rejected() {
        for raw in ["6 mån", "11 år", "0 år", "15 år", "", "Ränta", "3"] {
            assert!(matches!(parse_term(raw), Err(TermError::Unrecognized(_))), "{raw:?}");
        }
    }
}
