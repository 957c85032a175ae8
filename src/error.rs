// src/error.rs
//
// Named failure conditions. Callers match on these to decide between
// "skip this cell", "try another anchor" and "this document yields nothing".

use thiserror::Error;

/// The table locator could not position a cursor.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LocateError {
    #[error("anchor text {anchor:?} not found")]
    AnchorNotFound { anchor: String },
    #[error("table #{index} after anchor {anchor:?} not found")]
    TableNotFound { anchor: String, index: usize },
    #[error("no table caption contains {caption:?}")]
    CaptionNotMatched { caption: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RateError {
    /// The cell explicitly carries no value (empty, dash, "n/a", ...).
    #[error("no rate published in {0:?}")]
    NoData(String),
    #[error("malformed rate {0:?}")]
    Malformed(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TermError {
    /// The label is a known column heading, not a duration. Not a real failure.
    #[error("{0:?} is a header label")]
    HeaderRow(String),
    #[error("unrecognized term {0:?}")]
    Unrecognized(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DateError {
    #[error("unrecognized date {0:?}")]
    Unrecognized(String),
    #[error("date {0:?} is out of range")]
    OutOfRange(String),
}

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("building http client: {0}")]
    Client(#[source] reqwest::Error),
    #[error("invalid url {url:?}: {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },
    #[error("invalid header {name:?}")]
    InvalidHeader { name: String },
    #[error("request to {url} failed: {source}")]
    Network {
        url: String,
        #[source]
        source: reqwest::Error,
    },
}

/// Raised when a record would violate the canonical schema.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RecordError {
    #[error("source must not be empty")]
    EmptySource,
    #[error("rate must be positive, got {0}")]
    NonPositiveValue(f64),
    #[error("average-rate records need a reference month")]
    MissingReferenceMonth,
    #[error("reference month is only valid on average-rate records")]
    UnexpectedReferenceMonth,
    #[error("ratio bounds are only valid on ratio-discounted records")]
    UnexpectedRatioBounds,
    #[error("invalid ratio bounds {min}..{max}")]
    InvalidRatioBounds { min: f64, max: f64 },
    #[error("group discount is only valid on union-discounted records")]
    UnexpectedGroupDiscount,
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store lock poisoned")]
    Poisoned,
}

/// Document-level failure: the whole document contributes zero records.
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error(transparent)]
    Locate(#[from] LocateError),
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error("{url} answered with redirect {status}")]
    UnwantedRedirect { url: String, status: u16 },
    #[error("{url} answered with status {status}")]
    BadStatus { url: String, status: u16 },
    #[error("table at {url} has no rows")]
    EmptyTable { url: String },
}
