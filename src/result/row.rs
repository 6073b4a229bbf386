//! Tab-separated row lines.

use crate::error::{WireError, WireResult};
use crate::types::unescape_char;

/// Cell text that stands for SQL NULL.
pub const NULL_SENTINEL: &str = "\\N";

/// One row of raw cells, `None` for null. Always as wide as the header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WireRow {
    cells: Vec<Option<String>>,
}

impl WireRow {
    /// Split `line` (without its newline) on raw tabs and unescape each cell.
    pub fn parse(line: &str, width: usize) -> WireResult<Self> {
        let cells: Vec<Option<String>> = line.split('\t').map(parse_cell).collect();
        if cells.len() != width {
            return Err(WireError::malformed(format!(
                "row has {} cells but the header declares {width} columns",
                cells.len()
            )));
        }
        Ok(Self { cells })
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Raw unescaped cell; `None` for null or past the row width.
    pub fn get(&self, idx: usize) -> Option<&str> {
        self.cells.get(idx).and_then(Option::as_deref)
    }

    pub fn cells(&self) -> &[Option<String>] {
        &self.cells
    }
}

fn parse_cell(raw: &str) -> Option<String> {
    if raw == NULL_SENTINEL {
        None
    } else {
        Some(unescape(raw))
    }
}

/// Undo the backslash escaping of a cell or header field.
pub fn unescape(raw: &str) -> String {
    if !raw.contains('\\') {
        return raw.to_string();
    }
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            match chars.next() {
                Some(escaped) => out.push(unescape_char(escaped)),
                None => out.push('\\'),
            }
        } else {
            out.push(c);
        }
    }
    out
}
