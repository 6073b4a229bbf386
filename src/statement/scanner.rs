//! Single-pass SQL scanner.
//!
//! Walks the input once, tracking whether the current character is plain SQL,
//! inside a quoted literal, or inside a comment. Emits one [`Segment`] per
//! top-level `;`, each carrying its comment-free text and the positions of its
//! `?` markers.

use std::ops::Range;

use crate::error::{WireError, WireResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScanState {
    Normal,
    SingleQuote,
    DoubleQuote,
    LineComment,
    BlockComment,
}

/// One `;`-delimited piece of the input.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Segment {
    /// Byte range in the scanned input, separator excluded.
    pub span: Range<usize>,
    /// Text with comments removed. Not trimmed.
    pub clean: String,
    /// Char offsets of `?` markers in `clean`.
    pub markers: Vec<usize>,
}

impl Segment {
    fn new(start: usize) -> Self {
        Self {
            span: start..start,
            clean: String::new(),
            markers: Vec::new(),
        }
    }

    /// Only comments and whitespace.
    pub fn is_blank(&self) -> bool {
        self.clean.trim().is_empty()
    }
}

/// Accumulates the clean text of the current segment while keeping a char count.
struct Builder {
    segment: Segment,
    chars: usize,
}

impl Builder {
    fn new(start: usize) -> Self {
        Self {
            segment: Segment::new(start),
            chars: 0,
        }
    }

    fn push(&mut self, c: char) {
        self.segment.clean.push(c);
        self.chars += 1;
    }

    fn marker(&mut self) {
        self.segment.markers.push(self.chars);
        self.push('?');
    }

    fn finish(mut self, end: usize) -> Segment {
        self.segment.span.end = end;
        self.segment
    }
}

/// Scan `sql`, splitting on `;` outside literals and comments.
///
/// Always returns at least one segment. An unterminated literal or quoted
/// identifier is a syntax error at the byte where it opened; an unterminated
/// block comment simply runs to the end of the input.
pub(crate) fn scan(sql: &str) -> WireResult<Vec<Segment>> {
    let mut segments = Vec::new();
    let mut state = ScanState::Normal;
    let mut current = Builder::new(0);
    let mut quote_start = 0;
    let mut chars = sql.char_indices().peekable();

    while let Some((i, c)) = chars.next() {
        let next = chars.peek().map(|&(_, n)| n);
        match state {
            ScanState::Normal => match c {
                '\'' => {
                    quote_start = i;
                    state = ScanState::SingleQuote;
                    current.push(c);
                }
                '"' => {
                    quote_start = i;
                    state = ScanState::DoubleQuote;
                    current.push(c);
                }
                '-' if next == Some('-') => {
                    chars.next();
                    state = ScanState::LineComment;
                }
                '/' if next == Some('*') => {
                    chars.next();
                    state = ScanState::BlockComment;
                    // keeps `a/**/b` from fusing into `ab`
                    current.push(' ');
                }
                '?' => current.marker(),
                ';' => {
                    segments.push(current.finish(i));
                    current = Builder::new(i + 1);
                }
                _ => current.push(c),
            },
            ScanState::SingleQuote => {
                current.push(c);
                match c {
                    '\\' => {
                        if let Some((_, escaped)) = chars.next() {
                            current.push(escaped);
                        }
                    }
                    '\'' if next == Some('\'') => {
                        chars.next();
                        current.push('\'');
                    }
                    '\'' => state = ScanState::Normal,
                    _ => {}
                }
            }
            ScanState::DoubleQuote => {
                current.push(c);
                if c == '"' {
                    if next == Some('"') {
                        chars.next();
                        current.push('"');
                    } else {
                        state = ScanState::Normal;
                    }
                }
            }
            ScanState::LineComment => {
                if c == '\n' {
                    current.push('\n');
                    state = ScanState::Normal;
                }
            }
            ScanState::BlockComment => {
                if c == '*' && next == Some('/') {
                    chars.next();
                    state = ScanState::Normal;
                }
            }
        }
    }

    match state {
        ScanState::SingleQuote => {
            return Err(WireError::syntax(quote_start, "unterminated string literal"));
        }
        ScanState::DoubleQuote => {
            return Err(WireError::syntax(quote_start, "unterminated quoted identifier"));
        }
        _ => {}
    }

    segments.push(current.finish(sql.len()));
    Ok(segments)
}

/// Find the first case-insensitive occurrence of `keyword` as a whole word
/// outside quotes in comment-free text. Returns the byte offset just past it.
pub(crate) fn find_keyword(clean: &str, keyword: &str) -> Option<usize> {
    let bytes = clean.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            quote @ (b'\'' | b'"') => {
                i = skip_quoted(bytes, i, quote);
            }
            b if is_word_byte(b) => {
                let start = i;
                while i < bytes.len() && is_word_byte(bytes[i]) {
                    i += 1;
                }
                if clean[start..i].eq_ignore_ascii_case(keyword) {
                    return Some(i);
                }
            }
            _ => i += 1,
        }
    }
    None
}

/// Index just past the literal opened at `start`.
fn skip_quoted(bytes: &[u8], start: usize, quote: u8) -> usize {
    let mut i = start + 1;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' if quote == b'\'' => i += 2,
            b if b == quote => {
                if bytes.get(i + 1) == Some(&quote) {
                    i += 2;
                } else {
                    return i + 1;
                }
            }
            _ => i += 1,
        }
    }
    bytes.len()
}

pub(crate) fn is_word_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_' || b == b'$' || b >= 0x80
}
