// src/lib.rs
//
// Extraction engine for published mortgage-rate tables.

pub mod adapter;
pub mod config;
pub mod crawl;
pub mod error;
pub mod fetch;
pub mod model;
pub mod normalize;
pub mod store;
pub mod table;
pub mod text;

#[cfg(test)]
mod testing;

pub use adapter::{SourceConfig, TableAdapter};
pub use config::Config;
pub use crawl::{Adapter, CrawlReport, Crawler, Sink};
pub use model::{CanonicalRecord, Kind, Term, YearMonth};
pub use store::{MemoryStore, Store, UpsertOutcome};
