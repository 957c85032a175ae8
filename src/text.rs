// src/text.rs

/// True for every code point we fold into a plain ASCII space.
///
/// `char::is_whitespace` misses the zero-width space and the BOM, both of
/// which show up in published rate tables pasted from office documents.
fn is_space_like(c: char) -> bool {
    c.is_whitespace()
        || matches!(
            c,
            '\u{00A0}' // no-break space
                | '\u{2000}'..='\u{200B}' // en quad .. zero-width space
                | '\u{202F}' // narrow no-break space
                | '\u{205F}' // medium mathematical space
                | '\u{2060}' // word joiner
                | '\u{3000}' // ideographic space
                | '\u{FEFF}' // byte-order mark
                | '\t'
                | '\n'
                | '\r'
                | '\u{0B}'
                | '\u{0C}'
        )
}

/// Collapse all whitespace-like code points into single ASCII spaces and trim
/// both ends.
pub fn normalize_text(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut pending_space = false;
    for ch in s.chars() {
        if is_space_like(ch) {
            pending_space = !out.is_empty();
            continue;
        }
        if pending_space {
            out.push(' ');
            pending_space = false;
        }
        out.push(ch);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collapses_unicode_spaces() {
        let raw = "\u{FEFF}  3\u{00A0}mån\t\n\u{200B} bunden\u{202F} ";
        assert_eq!(normalize_text(raw), "3 mån bunden");
    }

    #[test]
    fn empty_and_blank_inputs() {
        assert_eq!(normalize_text(""), "");
        assert_eq!(normalize_text(" \u{00A0}\u{2009}\r\n"), "");
    }

    #[test]
    fn leaves_plain_text_alone() {
        assert_eq!(normalize_text("Current mortgage rates"), "Current mortgage rates");
    }
}
