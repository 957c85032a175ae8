// src/normalize/mod.rs
//
// Cell-level parsers. These know nothing about document structure; they
// turn one cell's text into a canonical value or a named failure.

pub mod date;
pub mod rate;
pub mod term;

pub use date::{infer_year, parse_date, parse_month, DEFAULT_YEAR_PIVOT};
pub use rate::parse_rate;
pub use term::parse_term;
