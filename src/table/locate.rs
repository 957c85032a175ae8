// src/table/locate.rs

use tracing::trace;

use super::token::{Cursor, Token, TokenStream};
use crate::error::LocateError;
use crate::text::normalize_text;

/// How far past a `<table>` we look for its `<caption>`.
const CAPTION_LOOKAHEAD: usize = 16;

/// Tags that mean the table body has started, so no caption will follow.
const TABLE_CONTENT: &[&str] = &["tr", "thead", "tbody", "tfoot", "td", "th"];

/// Find the first text node containing `anchor`, then return a cursor just
/// after the `skip`-th (0-based) `<table>` that follows it.
pub fn table_after_anchor<'a>(
    doc: &'a TokenStream,
    anchor: &str,
    skip: usize,
) -> Result<Cursor<'a>, LocateError> {
    let wanted = normalize_text(anchor);
    let mut cursor = doc.cursor();

    let found = cursor
        .by_ref()
        .any(|tok| matches!(tok, Token::Text(t) if normalize_text(t).contains(&wanted)));
    if !found {
        return Err(LocateError::AnchorNotFound {
            anchor: anchor.to_string(),
        });
    }
    trace!(anchor, offset = cursor.position(), "anchor found");

    let mut seen = 0;
    while let Some(tok) = cursor.next() {
        if tok.is_start("table") {
            if seen == skip {
                return Ok(cursor);
            }
            seen += 1;
        }
    }
    Err(LocateError::TableNotFound {
        anchor: anchor.to_string(),
        index: skip,
    })
}

/// Return a cursor inside the first table whose `<caption>` text contains
/// `caption`. The cursor sits after the caption, before the first row.
pub fn table_with_caption<'a>(
    doc: &'a TokenStream,
    caption: &str,
) -> Result<Cursor<'a>, LocateError> {
    let wanted = normalize_text(caption);
    let mut cursor = doc.cursor();

    while let Some(tok) = cursor.next() {
        if !tok.is_start("table") {
            continue;
        }
        let mut ahead = cursor.clone();
        if caption_matches(&mut ahead, &wanted) {
            trace!(caption, offset = ahead.position(), "caption matched");
            return Ok(ahead);
        }
    }
    Err(LocateError::CaptionNotMatched {
        caption: caption.to_string(),
    })
}

/// Look at the tokens right after a `<table>` for a matching caption.
/// On success `ahead` is left just past `</caption>`.
fn caption_matches(ahead: &mut Cursor<'_>, wanted: &str) -> bool {
    for _ in 0..CAPTION_LOOKAHEAD {
        match ahead.next() {
            None => return false,
            Some(Token::Start { name, .. }) if name == "caption" => {
                let text = caption_text(ahead);
                return normalize_text(&text).contains(wanted);
            }
            Some(Token::Start { name, .. }) if TABLE_CONTENT.contains(&name.as_str()) => {
                return false;
            }
            // a nested table before any caption belongs to somebody else
            Some(tok) if tok.is_start("table") || tok.is_end("table") => return false,
            Some(_) => {}
        }
    }
    false
}

/// All text inside a caption, including text of nested inline elements.
fn caption_text(cursor: &mut Cursor<'_>) -> String {
    let mut text = String::new();
    for tok in cursor.by_ref() {
        match tok {
            Token::Text(t) => text.push_str(t),
            Token::End { name } if name == "caption" => break,
            Token::Start { name, .. } if TABLE_CONTENT.contains(&name.as_str()) => break,
            _ => {}
        }
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::parse_table;

    const DOC: &str = r#"
        <h2>Listräntor</h2>
        <table id="first"><tr><td>A</td></tr></table>
        <p>Snitträntor</p>
        <div><table id="second"><tr><td>B</td></tr></table></div>
        <table id="third"><caption>Genomsnittlig <b>ränta</b> per månad</caption>
            <tr><td>C</td></tr></table>
    "#;

    fn doc() -> TokenStream {
        TokenStream::parse(DOC)
    }

    fn first_cell(cursor: Cursor<'_>) -> String {
        parse_table(cursor).header().first().cloned().unwrap_or_default()
    }

    #[test]
    fn anchor_then_first_table() {
        let doc = doc();
        let cur = table_after_anchor(&doc, "Snitträntor", 0).unwrap();
        assert_eq!(first_cell(cur), "B");
    }

    #[test]
    fn anchor_then_nth_table() {
        let doc = doc();
        let cur = table_after_anchor(&doc, "Listräntor", 2).unwrap();
        assert_eq!(first_cell(cur), "C");
    }

    #[test]
    fn anchor_text_is_whitespace_normalized() {
        let html = "<p>Current\u{00A0}\n mortgage   rates</p><table><tr><td>X</td></tr></table>";
        let doc = TokenStream::parse(html);
        let cur = table_after_anchor(&doc, "Current mortgage rates", 0).unwrap();
        assert_eq!(first_cell(cur), "X");
    }

    #[test]
    fn missing_anchor_and_missing_table_are_distinct() {
        assert_eq!(
            table_after_anchor(&doc(), "Bolåneräntor", 0).unwrap_err(),
            LocateError::AnchorNotFound {
                anchor: "Bolåneräntor".into()
            }
        );
        assert_eq!(
            table_after_anchor(&doc(), "Snitträntor", 5).unwrap_err(),
            LocateError::TableNotFound {
                anchor: "Snitträntor".into(),
                index: 5
            }
        );
    }

    #[test]
    fn caption_search_spans_inline_markup() {
        let doc = doc();
        let cur = table_with_caption(&doc, "Genomsnittlig ränta").unwrap();
        assert_eq!(first_cell(cur), "C");
    }

    #[test]
    fn caption_not_matched() {
        let err = table_with_caption(&doc(), "Listpriser").unwrap_err();
        assert!(matches!(err, LocateError::CaptionNotMatched { .. }));
    }
}
