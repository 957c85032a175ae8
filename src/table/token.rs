// src/table/token.rs
//
// Flat token stream over an HTML document, produced by html5ever's tokenizer
// without a tree builder. Malformed markup degrades the way browsers degrade
// it; nothing here fails.

use html5ever::tendril::StrTendril;
use html5ever::tokenizer::{
    self as h5, states::RawKind, BufferQueue, Tag, TagKind, TokenSink, TokenSinkResult, Tokenizer,
    TokenizerOpts,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    /// Opening tag, name lowercased.
    Start { name: String, self_closing: bool },
    /// Closing tag, name lowercased.
    End { name: String },
    /// Run of text with character references decoded. Whitespace is preserved.
    Text(String),
}

impl Token {
    pub fn is_start(&self, tag: &str) -> bool {
        matches!(self, Token::Start { name, .. } if name == tag)
    }

    pub fn is_end(&self, tag: &str) -> bool {
        matches!(self, Token::End { name } if name == tag)
    }
}

/// Tokenizer state an element's content is read in, if not plain data.
fn raw_kind(name: &str) -> Option<RawKind> {
    match name {
        "script" => Some(RawKind::ScriptData),
        "style" | "noscript" | "xmp" | "iframe" | "noembed" | "noframes" => Some(RawKind::Rawtext),
        "title" | "textarea" => Some(RawKind::Rcdata),
        _ => None,
    }
}

/// Raw-text elements whose content is dropped entirely.
fn is_hidden(name: &str) -> bool {
    matches!(name, "script" | "style" | "noscript")
}

/// Collects html5ever tokens into [`Token`]s. Adjacent character tokens are
/// merged so one text node is one `Token::Text`.
#[derive(Default)]
struct Collector {
    tokens: Vec<Token>,
    text: String,
    /// Inside a hidden raw-text element.
    hidden: bool,
    /// Nesting depth of `<template>`, whose content is inert.
    template_depth: usize,
}

impl Collector {
    fn flush_text(&mut self) {
        if !self.text.is_empty() {
            self.tokens.push(Token::Text(std::mem::take(&mut self.text)));
        }
    }

    fn tag(&mut self, tag: Tag) -> TokenSinkResult<()> {
        let name = tag.name.to_string();
        if self.hidden {
            // a raw-text state only ever ends on its own end tag
            self.hidden = false;
            return TokenSinkResult::Continue;
        }
        if name == "template" {
            self.flush_text();
            match tag.kind {
                TagKind::StartTag => self.template_depth += 1,
                TagKind::EndTag => self.template_depth = self.template_depth.saturating_sub(1),
            }
            return TokenSinkResult::Continue;
        }
        if self.template_depth > 0 {
            return TokenSinkResult::Continue;
        }

        self.flush_text();
        match tag.kind {
            TagKind::StartTag => {
                let kind = raw_kind(&name);
                if is_hidden(&name) {
                    self.hidden = true;
                } else {
                    self.tokens.push(Token::Start {
                        name,
                        self_closing: tag.self_closing,
                    });
                }
                if let Some(kind) = kind {
                    return TokenSinkResult::RawData(kind);
                }
            }
            TagKind::EndTag => self.tokens.push(Token::End { name }),
        }
        TokenSinkResult::Continue
    }
}

impl TokenSink for Collector {
    type Handle = ();

    fn process_token(&mut self, token: h5::Token, _line_number: u64) -> TokenSinkResult<()> {
        match token {
            h5::Token::TagToken(tag) => return self.tag(tag),
            h5::Token::CharacterTokens(text) => {
                if !self.hidden && self.template_depth == 0 {
                    self.text.push_str(&text);
                }
            }
            h5::Token::EOFToken => self.flush_text(),
            // comments, doctypes, NULs and parse errors carry no table data
            _ => {}
        }
        TokenSinkResult::Continue
    }
}

/// A tokenized document. Cursors borrow from it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TokenStream {
    tokens: Vec<Token>,
}

impl TokenStream {
    pub fn parse(html: &str) -> Self {
        let mut input = BufferQueue::new();
        input.push_back(StrTendril::from_slice(html));

        let mut tokenizer = Tokenizer::new(Collector::default(), TokenizerOpts::default());
        // no script handles are ever returned, so one feed consumes everything
        let _ = tokenizer.feed(&mut input);
        tokenizer.end();

        let mut collector = tokenizer.sink;
        collector.flush_text();
        Self {
            tokens: collector.tokens,
        }
    }

    pub fn cursor(&self) -> Cursor<'_> {
        Cursor {
            tokens: &self.tokens,
            pos: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

/// A position in a [`TokenStream`]. Cloning is cheap and gives an
/// independent look-ahead cursor.
#[derive(Debug, Clone)]
pub struct Cursor<'a> {
    tokens: &'a [Token],
    pos: usize,
}

impl<'a> Cursor<'a> {
    /// Index of the next unread token.
    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn at_end(&self) -> bool {
        self.pos >= self.tokens.len()
    }
}

impl<'a> Iterator for Cursor<'a> {
    type Item = &'a Token;

    fn next(&mut self) -> Option<&'a Token> {
        let tok = self.tokens.get(self.pos)?;
        self.pos += 1;
        Some(tok)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(html: &str) -> Vec<Token> {
        TokenStream::parse(html).cursor().cloned().collect()
    }

    fn start(name: &str) -> Token {
        Token::Start {
            name: name.to_string(),
            self_closing: false,
        }
    }

    fn end(name: &str) -> Token {
        Token::End {
            name: name.to_string(),
        }
    }

    fn text(s: &str) -> Token {
        Token::Text(s.to_string())
    }

    #[test]
    fn tags_and_text() {
        let toks = tokens(r#"<TD class="a>b">3,45&nbsp;%</td>"#);
        assert_eq!(toks, vec![start("td"), text("3,45\u{00A0}%"), end("td")]);
    }

    #[test]
    fn skips_comments_doctype_and_scripts() {
        let toks = tokens(
            "<!DOCTYPE html><!-- <table> --><script>if (a < b) { x = '</td>'; }</script>\
             <STYLE>td { color: red }</style><p>x</p>",
        );
        assert_eq!(toks, vec![start("p"), text("x"), end("p")]);
    }

    #[test]
    fn template_content_is_inert() {
        let toks = tokens("<template><table><tr><td>t</td></tr></table></template><p>y</p>");
        assert_eq!(toks, vec![start("p"), text("y"), end("p")]);
    }

    #[test]
    fn self_closing_and_stray_angle() {
        let toks = tokens("a < b<br/>c");
        assert_eq!(
            toks,
            vec![
                text("a < b"),
                Token::Start {
                    name: "br".into(),
                    self_closing: true
                },
                text("c"),
            ]
        );
    }

    #[test]
    fn tag_cut_off_by_end_of_document_is_dropped() {
        let toks = tokens("<td>1<tr class=\"x");
        assert_eq!(toks, vec![start("td"), text("1")]);
    }

    #[test]
    fn character_references() {
        assert_eq!(tokens("R&auml;nta &amp; m&aring;n"), vec![text("Ränta & mån")]);
        assert_eq!(tokens("&#8722;&#x25;"), vec![text("−%")]);
        assert_eq!(tokens("&euro; &hellip; &thinsp;"), vec![text("€ … \u{2009}")]);
        // legacy references decode without the semicolon
        assert_eq!(tokens("3,45&nbsp%"), vec![text("3,45\u{00A0}%")]);
        assert_eq!(tokens("AT&T &bogus; &"), vec![text("AT&T &bogus; &")]);
    }

    #[test]
    fn title_text_is_kept_verbatim() {
        let toks = tokens("<title>a <b> c</title>");
        assert_eq!(toks, vec![start("title"), text("a <b> c"), end("title")]);
    }

    #[test]
    fn cursor_clones_are_independent() {
        let stream = TokenStream::parse("<p>a</p>");
        let mut cursor = stream.cursor();
        cursor.next();
        let mut ahead = cursor.clone();
        assert_eq!(ahead.next(), Some(&text("a")));
        assert_eq!(cursor.position(), 1);
        assert_eq!(ahead.position(), 2);
        assert!(!ahead.at_end());
    }
}
