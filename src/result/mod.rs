//! Streaming result materialization.
//!
//! A response body is a names line, a types line, then one tab-separated row
//! per line:
//!
//! ```text
//! id\tvalue
//! integer\tjson
//! 1\tnull
//! 2\t\N
//! ```
//!
//! [`ResultCursor`] reads it forward only, keeps only the current row, and
//! decodes cells on access.
//!
//! ```
//! use boltwire::result::ResultCursor;
//!
//! let body = "id\tname\nInt32\tNullable(String)\n1\talice\n2\t\\N\n";
//! let mut cursor = ResultCursor::open(body.as_bytes()).unwrap();
//! let mut names = Vec::new();
//! while cursor.next().unwrap() {
//!     names.push(cursor.get_str_by_name("name").unwrap());
//! }
//! assert_eq!(names, vec![Some("alice".to_string()), None]);
//! ```

mod row;

use std::collections::HashMap;
use std::io::{BufRead, BufReader, Read};

use chrono::{NaiveDate, NaiveDateTime};
use tracing::{debug, trace};

pub use row::{unescape, WireRow, NULL_SENTINEL};

use crate::codec::FrameReader;
use crate::error::{WireError, WireResult};
use crate::types::{decode, ColumnKind, Decimal, TypedValue, WireColumn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    BeforeFirst,
    OnRow,
    Exhausted,
    Closed,
}

/// Forward-only cursor over a text result.
pub struct ResultCursor<R> {
    reader: Option<BufReader<R>>,
    columns: Vec<WireColumn>,
    by_name: HashMap<String, usize>,
    row: Option<WireRow>,
    state: State,
    rows_read: u64,
    line: Vec<u8>,
}

/// Open a cursor over a block-compressed response.
pub fn open_compressed<R: Read>(
    source: R,
    max_block_size: usize,
) -> WireResult<ResultCursor<FrameReader<R>>> {
    ResultCursor::open(FrameReader::with_max_block_size(source, max_block_size))
}

impl<R: Read> ResultCursor<R> {
    /// Read the names and types lines from `source`.
    ///
    /// An empty source is a result with no columns and no rows.
    pub fn open(source: R) -> WireResult<Self> {
        let mut cursor = Self {
            reader: Some(BufReader::new(source)),
            columns: Vec::new(),
            by_name: HashMap::new(),
            row: None,
            state: State::BeforeFirst,
            rows_read: 0,
            line: Vec::new(),
        };

        match cursor.read_header() {
            Ok(()) => Ok(cursor),
            Err(err) => {
                cursor.fail(&err);
                Err(err)
            }
        }
    }

    fn read_header(&mut self) -> WireResult<()> {
        let Some(names) = self.read_line()? else {
            debug!("empty result body");
            self.state = State::Exhausted;
            return Ok(());
        };
        let names: Vec<String> = names.split('\t').map(unescape).collect();

        let types = self
            .read_line()?
            .ok_or_else(|| WireError::malformed("missing the column types line"))?;
        let types: Vec<&str> = types.split('\t').collect();

        if names.len() != types.len() {
            return Err(WireError::malformed(format!(
                "{} column names but {} column types",
                names.len(),
                types.len()
            )));
        }

        self.columns = names
            .into_iter()
            .zip(types)
            .map(|(name, raw_type)| WireColumn::parse(name, unescape(raw_type)))
            .collect();
        for (idx, column) in self.columns.iter().enumerate() {
            self.by_name.entry(column.name.clone()).or_insert(idx);
        }

        debug!(columns = self.columns.len(), "parsed result header");
        Ok(())
    }

    /// Next line without its line ending, `None` at end of input.
    fn read_line(&mut self) -> WireResult<Option<String>> {
        let reader = self
            .reader
            .as_mut()
            .ok_or_else(|| WireError::cursor("cursor is closed"))?;

        self.line.clear();
        let n = reader
            .read_until(b'\n', &mut self.line)
            .map_err(WireError::from_io)?;
        if n == 0 {
            return Ok(None);
        }
        if self.line.last() == Some(&b'\n') {
            self.line.pop();
            if self.line.last() == Some(&b'\r') {
                self.line.pop();
            }
        }

        let line = std::str::from_utf8(&self.line)
            .map_err(|e| WireError::malformed(format!("line is not valid UTF-8: {e}")))?;
        Ok(Some(line.to_string()))
    }

    /// Advance to the next row. `Ok(false)` once the rows run out.
    ///
    /// Any failure closes the cursor and releases the source.
    pub fn next(&mut self) -> WireResult<bool> {
        match self.state {
            State::Closed => return Err(WireError::cursor("cursor is closed")),
            State::Exhausted => return Ok(false),
            State::BeforeFirst | State::OnRow => {}
        }

        let line = match self.read_line() {
            Ok(Some(line)) => line,
            Ok(None) => {
                trace!(rows = self.rows_read, "result exhausted");
                self.row = None;
                self.state = State::Exhausted;
                return Ok(false);
            }
            Err(err) => {
                self.fail(&err);
                return Err(err);
            }
        };

        match WireRow::parse(&line, self.columns.len()) {
            Ok(row) => {
                self.row = Some(row);
                self.state = State::OnRow;
                self.rows_read += 1;
                Ok(true)
            }
            Err(err) => {
                self.fail(&err);
                Err(err)
            }
        }
    }

    fn fail(&mut self, err: &WireError) {
        debug!(error = %err, rows = self.rows_read, "result cursor failed");
        self.close();
    }
}

impl<R> ResultCursor<R> {
    /// Release the source. Safe to call any number of times.
    pub fn close(&mut self) {
        if self.state != State::Closed {
            debug!(rows = self.rows_read, "result cursor closed");
        }
        self.reader = None;
        self.row = None;
        self.state = State::Closed;
    }

    pub fn is_closed(&self) -> bool {
        self.state == State::Closed
    }

    pub fn columns(&self) -> &[WireColumn] {
        &self.columns
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    /// Rows read so far.
    pub fn row_count(&self) -> u64 {
        self.rows_read
    }

    /// Index of the column called `name`. Exact match first, then ASCII
    /// case-insensitive; duplicates resolve to the first.
    pub fn column_index(&self, name: &str) -> WireResult<usize> {
        if let Some(&idx) = self.by_name.get(name) {
            return Ok(idx);
        }
        self.columns
            .iter()
            .position(|c| c.name.eq_ignore_ascii_case(name))
            .ok_or_else(|| WireError::cursor(format!("unknown column '{name}'")))
    }

    /// The row the cursor is on.
    pub fn current_row(&self) -> WireResult<&WireRow> {
        match (self.state, &self.row) {
            (State::OnRow, Some(row)) => Ok(row),
            (State::BeforeFirst, _) => Err(WireError::cursor("no current row: call next() first")),
            (State::Exhausted, _) => Err(WireError::cursor("no current row: result set exhausted")),
            (State::Closed, _) => Err(WireError::cursor("cursor is closed")),
            (State::OnRow, None) => Err(WireError::cursor("no current row")),
        }
    }

    fn raw(&self, idx: usize) -> WireResult<Option<&str>> {
        let row = self.current_row()?;
        if idx >= row.len() {
            return Err(WireError::cursor(format!(
                "column index {idx} out of range for {} columns",
                row.len()
            )));
        }
        Ok(row.get(idx))
    }

    fn get_as(&self, idx: usize, kind: ColumnKind) -> WireResult<Option<TypedValue>> {
        match self.raw(idx)? {
            None => Ok(None),
            Some(text) => decode(Some(text), &WireColumn::of(kind)).map(Some),
        }
    }

    /// Whole current row decoded under the declared columns.
    pub fn values(&self) -> WireResult<Vec<TypedValue>> {
        let row = self.current_row()?;
        self.columns
            .iter()
            .enumerate()
            .map(|(idx, column)| decode(row.get(idx), column))
            .collect()
    }

    /// Cell decoded under its declared column type.
    pub fn get_value(&self, idx: usize) -> WireResult<Option<TypedValue>> {
        let raw = self.raw(idx)?;
        match decode(raw, &self.columns[idx])? {
            TypedValue::Null => Ok(None),
            value => Ok(Some(value)),
        }
    }

    pub fn is_null(&self, idx: usize) -> WireResult<bool> {
        Ok(self.raw(idx)?.is_none())
    }

    /// The unescaped cell text, whatever the column type.
    pub fn get_str(&self, idx: usize) -> WireResult<Option<String>> {
        Ok(self.raw(idx)?.map(str::to_string))
    }

    pub fn get_i16(&self, idx: usize) -> WireResult<Option<i16>> {
        Ok(match self.get_as(idx, ColumnKind::SmallInt)? {
            Some(TypedValue::SmallInt(v)) => Some(v),
            _ => None,
        })
    }

    pub fn get_i32(&self, idx: usize) -> WireResult<Option<i32>> {
        Ok(match self.get_as(idx, ColumnKind::Integer)? {
            Some(TypedValue::Int(v)) => Some(v),
            _ => None,
        })
    }

    pub fn get_i64(&self, idx: usize) -> WireResult<Option<i64>> {
        Ok(match self.get_as(idx, ColumnKind::BigInt)? {
            Some(TypedValue::BigInt(v)) => Some(v),
            _ => None,
        })
    }

    pub fn get_f32(&self, idx: usize) -> WireResult<Option<f32>> {
        Ok(match self.get_as(idx, ColumnKind::Real)? {
            Some(TypedValue::Real(v)) => Some(v),
            _ => None,
        })
    }

    /// Accepts `nan`, `inf` and `-inf` in any case.
    pub fn get_f64(&self, idx: usize) -> WireResult<Option<f64>> {
        Ok(match self.get_as(idx, ColumnKind::Double)? {
            Some(TypedValue::Double(v)) => Some(v),
            _ => None,
        })
    }

    /// Lenient: `1/0`, `true/false`, `t/f`, `yes/no`, `y/n`, `on/off`.
    pub fn get_bool(&self, idx: usize) -> WireResult<Option<bool>> {
        Ok(match self.get_as(idx, ColumnKind::Boolean)? {
            Some(TypedValue::Bool(v)) => Some(v),
            _ => None,
        })
    }

    pub fn get_decimal(&self, idx: usize) -> WireResult<Option<Decimal>> {
        Ok(match self.get_as(idx, ColumnKind::Decimal)? {
            Some(TypedValue::Decimal(v)) => Some(v),
            _ => None,
        })
    }

    pub fn get_date(&self, idx: usize) -> WireResult<Option<NaiveDate>> {
        Ok(match self.get_as(idx, ColumnKind::Date)? {
            Some(TypedValue::Date(v)) => Some(v),
            _ => None,
        })
    }

    pub fn get_timestamp(&self, idx: usize) -> WireResult<Option<NaiveDateTime>> {
        Ok(match self.get_as(idx, ColumnKind::Timestamp)? {
            Some(TypedValue::Timestamp(v)) => Some(v),
            _ => None,
        })
    }

    /// Elements of an array column, decoded to the declared depth.
    pub fn get_array(&self, idx: usize) -> WireResult<Option<Vec<TypedValue>>> {
        let column = self
            .columns
            .get(idx)
            .ok_or_else(|| WireError::cursor(format!("column index {idx} out of range")))?;
        let raw = self.raw(idx)?;
        if column.kind != ColumnKind::Array {
            return Err(WireError::coercion(
                raw.unwrap_or(NULL_SENTINEL),
                "ARRAY",
                format!("column '{}' is {}", column.name, column.type_name()),
            ));
        }
        match decode(raw, column)? {
            TypedValue::Array(items) => Ok(Some(items)),
            _ => Ok(None),
        }
    }
}

macro_rules! by_name {
    ($($name:ident => $by_index:ident -> $ty:ty;)*) => {
        impl<R> ResultCursor<R> {
            $(
                #[doc = concat!("[`", stringify!($by_index), "`](Self::", stringify!($by_index), ") by column name.")]
                pub fn $name(&self, column: &str) -> WireResult<$ty> {
                    self.$by_index(self.column_index(column)?)
                }
            )*
        }
    };
}

by_name! {
    get_value_by_name => get_value -> Option<TypedValue>;
    is_null_by_name => is_null -> bool;
    get_str_by_name => get_str -> Option<String>;
    get_i16_by_name => get_i16 -> Option<i16>;
    get_i32_by_name => get_i32 -> Option<i32>;
    get_i64_by_name => get_i64 -> Option<i64>;
    get_f32_by_name => get_f32 -> Option<f32>;
    get_f64_by_name => get_f64 -> Option<f64>;
    get_bool_by_name => get_bool -> Option<bool>;
    get_decimal_by_name => get_decimal -> Option<Decimal>;
    get_date_by_name => get_date -> Option<NaiveDate>;
    get_timestamp_by_name => get_timestamp -> Option<NaiveDateTime>;
    get_array_by_name => get_array -> Option<Vec<TypedValue>>;
}
