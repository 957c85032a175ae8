// src/model.rs

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::RecordError;

/// What a published rate represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Kind {
    ListRate,
    AverageRate,
    RatioDiscounted,
    UnionDiscounted,
}

/// Fixed-rate commitment duration. Anything else is rejected by the term parser.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Term {
    #[serde(rename = "3m")]
    ThreeMonths,
    #[serde(rename = "1y")]
    OneYear,
    #[serde(rename = "2y")]
    TwoYears,
    #[serde(rename = "3y")]
    ThreeYears,
    #[serde(rename = "4y")]
    FourYears,
    #[serde(rename = "5y")]
    FiveYears,
    #[serde(rename = "6y")]
    SixYears,
    #[serde(rename = "7y")]
    SevenYears,
    #[serde(rename = "8y")]
    EightYears,
    #[serde(rename = "9y")]
    NineYears,
    #[serde(rename = "10y")]
    TenYears,
}

impl Term {
    pub const ALL: [Term; 11] = [
        Term::ThreeMonths,
        Term::OneYear,
        Term::TwoYears,
        Term::ThreeYears,
        Term::FourYears,
        Term::FiveYears,
        Term::SixYears,
        Term::SevenYears,
        Term::EightYears,
        Term::NineYears,
        Term::TenYears,
    ];

    /// Length of the commitment in months.
    pub fn months(self) -> u32 {
        match self {
            Term::ThreeMonths => 3,
            Term::OneYear => 12,
            Term::TwoYears => 24,
            Term::ThreeYears => 36,
            Term::FourYears => 48,
            Term::FiveYears => 60,
            Term::SixYears => 72,
            Term::SevenYears => 84,
            Term::EightYears => 96,
            Term::NineYears => 108,
            Term::TenYears => 120,
        }
    }

    pub fn from_years(years: u32) -> Option<Term> {
        Term::ALL
            .into_iter()
            .find(|t| *t != Term::ThreeMonths && t.months() == years * 12)
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Term::ThreeMonths => write!(f, "3 mån"),
            other => write!(f, "{} år", other.months() / 12),
        }
    }
}

/// A calendar month, ordered chronologically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct YearMonth {
    year: i32,
    month: u32,
}

impl YearMonth {
    pub fn new(year: i32, month: u32) -> Option<Self> {
        (1..=12).contains(&month).then_some(Self { year, month })
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn month(&self) -> u32 {
        self.month
    }
}

impl fmt::Display for YearMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

/// Loan-to-value range (percent) a discount tier applies to.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RatioBounds {
    pub min: f64,
    pub max: f64,
}

/// Identity of a record for upsert purposes.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NaturalKey {
    pub source: String,
    pub kind: Kind,
    pub term: Term,
    /// Only set for `Kind::AverageRate`.
    pub reference_month: Option<YearMonth>,
}

/// One normalized observation. Construct through [`CanonicalRecord::builder`],
/// which enforces the per-kind field rules.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CanonicalRecord {
    source: String,
    kind: Kind,
    term: Term,
    value: f64,
    changed_on: Option<NaiveDate>,
    reference_month: Option<YearMonth>,
    ratio_bounds: Option<RatioBounds>,
    has_group_discount: bool,
    observed_at: DateTime<Utc>,
}

impl CanonicalRecord {
    pub fn builder(
        source: impl Into<String>,
        kind: Kind,
        term: Term,
        value: f64,
        observed_at: DateTime<Utc>,
    ) -> RecordBuilder {
        RecordBuilder {
            record: CanonicalRecord {
                source: source.into(),
                kind,
                term,
                value,
                changed_on: None,
                reference_month: None,
                ratio_bounds: None,
                has_group_discount: false,
                observed_at,
            },
        }
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn kind(&self) -> Kind {
        self.kind
    }

    pub fn term(&self) -> Term {
        self.term
    }

    pub fn value(&self) -> f64 {
        self.value
    }

    pub fn changed_on(&self) -> Option<NaiveDate> {
        self.changed_on
    }

    pub fn reference_month(&self) -> Option<YearMonth> {
        self.reference_month
    }

    pub fn ratio_bounds(&self) -> Option<RatioBounds> {
        self.ratio_bounds
    }

    pub fn has_group_discount(&self) -> bool {
        self.has_group_discount
    }

    pub fn observed_at(&self) -> DateTime<Utc> {
        self.observed_at
    }

    pub fn natural_key(&self) -> NaturalKey {
        NaturalKey {
            source: self.source.clone(),
            kind: self.kind,
            term: self.term,
            reference_month: match self.kind {
                Kind::AverageRate => self.reference_month,
                _ => None,
            },
        }
    }

    /// Cheap key comparison without allocating a `NaturalKey`.
    pub fn same_key(&self, other: &CanonicalRecord) -> bool {
        self.source == other.source
            && self.kind == other.kind
            && self.term == other.term
            && (self.kind != Kind::AverageRate || self.reference_month == other.reference_month)
    }
}

pub struct RecordBuilder {
    record: CanonicalRecord,
}

impl RecordBuilder {
    pub fn changed_on(mut self, date: NaiveDate) -> Self {
        self.record.changed_on = Some(date);
        self
    }

    pub fn reference_month(mut self, month: YearMonth) -> Self {
        self.record.reference_month = Some(month);
        self
    }

    pub fn ratio_bounds(mut self, min: f64, max: f64) -> Self {
        self.record.ratio_bounds = Some(RatioBounds { min, max });
        self
    }

    pub fn group_discount(mut self, has_group_discount: bool) -> Self {
        self.record.has_group_discount = has_group_discount;
        self
    }

    pub fn build(self) -> Result<CanonicalRecord, RecordError> {
        let r = self.record;
        if r.source.trim().is_empty() {
            return Err(RecordError::EmptySource);
        }
        if !(r.value > 0.0) || !r.value.is_finite() {
            return Err(RecordError::NonPositiveValue(r.value));
        }
        match (r.kind, r.reference_month) {
            (Kind::AverageRate, None) => return Err(RecordError::MissingReferenceMonth),
            (Kind::AverageRate, Some(_)) | (_, None) => {}
            (_, Some(_)) => return Err(RecordError::UnexpectedReferenceMonth),
        }
        if let Some(RatioBounds { min, max }) = r.ratio_bounds {
            if r.kind != Kind::RatioDiscounted {
                return Err(RecordError::UnexpectedRatioBounds);
            }
            if !(0.0..=100.0).contains(&min) || !(0.0..=100.0).contains(&max) || min >= max {
                return Err(RecordError::InvalidRatioBounds { min, max });
            }
        }
        if r.has_group_discount && r.kind != Kind::UnionDiscounted {
            return Err(RecordError::UnexpectedGroupDiscount);
        }
        Ok(r)
    }
}
