// src/table/mod.rs
//
// Locating and reading HTML tables by streaming over tokens. Nothing here
// builds a DOM; source documents are too often malformed for that.

pub mod locate;
pub mod parse;
pub mod token;

pub use locate::{table_after_anchor, table_with_caption};
pub use parse::{parse_table, ParsedTable};
pub use token::{Cursor, Token, TokenStream};
