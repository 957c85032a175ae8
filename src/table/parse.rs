// src/table/parse.rs

use tracing::{debug, trace};

use super::token::{Cursor, Token};
use crate::text::normalize_text;

/// Rows read from one `<table>`. The first row read is the header, whatever
/// element kind its cells used.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedTable {
    header: Option<Vec<String>>,
    rows: Vec<Vec<String>>,
}

impl ParsedTable {
    /// Header cells, empty when no row was seen.
    pub fn header(&self) -> &[String] {
        self.header.as_deref().unwrap_or(&[])
    }

    pub fn has_header(&self) -> bool {
        self.header.is_some()
    }

    /// Data rows, header excluded.
    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    /// True when not even a header row was found.
    pub fn is_empty(&self) -> bool {
        self.header.is_none()
    }

    fn push_row(&mut self, row: Vec<String>) {
        if row.is_empty() {
            return;
        }
        if self.header.is_none() {
            self.header = Some(row);
        } else {
            self.rows.push(row);
        }
    }
}

/// Builder state while walking the token stream.
#[derive(Default)]
struct RowState {
    row: Option<Vec<String>>,
    cell: Option<String>,
}

impl RowState {
    fn close_cell(&mut self) {
        if let Some(raw) = self.cell.take() {
            self.row.get_or_insert_with(Vec::new).push(normalize_text(&raw));
        }
    }

    fn open_cell(&mut self) {
        self.close_cell();
        self.row.get_or_insert_with(Vec::new);
        self.cell = Some(String::new());
    }

    fn finish_row(&mut self, table: &mut ParsedTable) {
        self.close_cell();
        if let Some(row) = self.row.take() {
            table.push_row(row);
        }
    }
}

/// Read rows from a cursor positioned inside a table until its `</table>`.
///
/// `<th>` and `<td>` are treated alike. Inline elements are dissolved and
/// `<br>` joins adjacent text without a separator. If the document ends
/// before `</table>`, the rows read so far are returned. The row in progress
/// is kept when at least one of its cells was closed.
pub fn parse_table(cursor: Cursor<'_>) -> ParsedTable {
    let mut table = ParsedTable::default();
    let mut state = RowState::default();
    // nested tables are flattened into the enclosing cell's text
    let mut depth = 0usize;

    for tok in cursor {
        match tok {
            Token::Text(t) => {
                if let Some(cell) = state.cell.as_mut() {
                    cell.push_str(t);
                }
            }
            Token::Start { name, .. } if name == "table" => depth += 1,
            Token::End { name } if name == "table" => {
                if depth == 0 {
                    state.finish_row(&mut table);
                    debug!(rows = table.rows.len(), "table parsed");
                    return table;
                }
                depth -= 1;
            }
            _ if depth > 0 => {}
            Token::Start { name, .. } => match name.as_str() {
                "tr" | "thead" | "tbody" | "tfoot" => {
                    state.finish_row(&mut table);
                    if name == "tr" {
                        state.row = Some(Vec::new());
                    }
                }
                "td" | "th" => state.open_cell(),
                _ => {}
            },
            Token::End { name } => match name.as_str() {
                "td" | "th" => state.close_cell(),
                "tr" | "thead" | "tbody" | "tfoot" => state.finish_row(&mut table),
                _ => {}
            },
        }
    }

    let keep_partial = state.row.as_ref().is_some_and(|row| !row.is_empty());
    if keep_partial {
        state.finish_row(&mut table);
    }
    trace!(
        rows = table.rows.len(),
        kept_partial_row = keep_partial,
        "document ended inside table"
    );
    table
}
