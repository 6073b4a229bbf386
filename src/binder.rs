//! Parameter binding.
//!
//! Bound values are rendered to literal text through a closed table and
//! spliced into a statement's clean SQL at its `?` markers:
//!
//! | value     | literal                                   |
//! |-----------|-------------------------------------------|
//! | null      | `\N`                                      |
//! | boolean   | `1` / `0`                                 |
//! | number    | plain decimal text                        |
//! | decimal   | exact, scale preserved                    |
//! | string    | `'...'` with `\0`, `\\` and `\'` escaped  |
//! | date      | `'YYYY-MM-DD'`                            |
//! | timestamp | `'YYYY-MM-DD HH:MM:SS[.nnnnnnnnn]'`       |
//! | array     | `[a,b,...]`                               |

use std::collections::HashMap;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use tracing::trace;

use crate::error::{WireError, WireResult};
use crate::statement::{ParamMarker, RawStatement};
use crate::types::{
    decode, parse_bool, parse_f64, temporal, unescape_char, ColumnKind, Decimal, TypedValue,
    WireColumn,
};

/// A value bound to a `?` marker.
#[derive(Debug, Clone, PartialEq)]
pub enum ParamValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Decimal(Decimal),
    Text(String),
    Date(NaiveDate),
    Timestamp(NaiveDateTime),
    Array(Vec<ParamValue>),
}

impl ParamValue {
    pub fn is_null(&self) -> bool {
        matches!(self, ParamValue::Null)
    }

    /// The SQL literal for this value.
    pub fn render(&self) -> String {
        match self {
            ParamValue::Null => "\\N".to_string(),
            ParamValue::Bool(true) => "1".to_string(),
            ParamValue::Bool(false) => "0".to_string(),
            ParamValue::Int(n) => n.to_string(),
            ParamValue::Float(n) => render_float(*n),
            ParamValue::Decimal(d) => d.to_string(),
            ParamValue::Text(s) => quote(s),
            ParamValue::Date(d) => format!("'{}'", temporal::format_date(d)),
            ParamValue::Timestamp(ts) => format!("'{}'", temporal::format_timestamp(ts)),
            ParamValue::Array(items) => {
                let rendered: Vec<String> = items.iter().map(ParamValue::render).collect();
                format!("[{}]", rendered.join(","))
            }
        }
    }

    /// Unquoted text form, used when a value is coerced to a text column.
    fn plain_text(&self) -> Option<String> {
        match self {
            ParamValue::Bool(b) => Some(b.to_string()),
            ParamValue::Int(n) => Some(n.to_string()),
            ParamValue::Float(n) => Some(render_float(*n)),
            ParamValue::Decimal(d) => Some(d.to_string()),
            ParamValue::Text(s) => Some(s.clone()),
            ParamValue::Date(d) => Some(temporal::format_date(d)),
            ParamValue::Timestamp(ts) => Some(temporal::format_timestamp(ts)),
            ParamValue::Null | ParamValue::Array(_) => None,
        }
    }
}

fn render_float(n: f64) -> String {
    if n.is_nan() {
        "nan".to_string()
    } else if n == f64::INFINITY {
        "inf".to_string()
    } else if n == f64::NEG_INFINITY {
        "-inf".to_string()
    } else {
        n.to_string()
    }
}

fn quote(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('\'');
    for c in s.chars() {
        match c {
            '\0' => out.push_str("\\0"),
            '\\' => out.push_str("\\\\"),
            '\'' => out.push_str("\\'"),
            c => out.push(c),
        }
    }
    out.push('\'');
    out
}

/// Substitute `literals` (marker id to literal text) into `clean_sql`.
///
/// Every marker needs exactly one binding, and every marker offset must point
/// at a `?` in `clean_sql`.
pub fn bind(
    clean_sql: &str,
    markers: &[ParamMarker],
    literals: &HashMap<usize, String>,
) -> WireResult<String> {
    if literals.len() != markers.len() {
        return Err(WireError::binding(format!(
            "statement has {} parameter markers but {} bindings were given",
            markers.len(),
            literals.len()
        )));
    }

    let chars: Vec<char> = clean_sql.chars().collect();
    let mut out = String::with_capacity(clean_sql.len() + literals.values().map(String::len).sum::<usize>());
    let mut cursor = 0;

    for marker in markers {
        if marker.offset >= chars.len() {
            return Err(WireError::binding(format!(
                "parameter {} at offset {} is past the end of the statement ({} chars)",
                marker.id,
                marker.offset,
                chars.len()
            )));
        }
        if chars[marker.offset] != '?' || marker.offset < cursor {
            return Err(WireError::binding(format!(
                "no parameter marker at offset {} for parameter {}",
                marker.offset, marker.id
            )));
        }
        let literal = literals
            .get(&marker.id)
            .ok_or_else(|| WireError::binding(format!("missing binding for parameter {}", marker.id)))?;

        out.extend(&chars[cursor..marker.offset]);
        out.push_str(literal);
        cursor = marker.offset + 1;
    }
    out.extend(&chars[cursor..]);

    trace!(markers = markers.len(), "bound statement");
    Ok(out)
}

/// Render `values` positionally (first value to marker 1) and bind them.
pub fn bind_values(statement: &RawStatement, values: &[ParamValue]) -> WireResult<String> {
    if values.len() != statement.param_count() {
        return Err(WireError::binding(format!(
            "statement has {} parameter markers but {} values were given",
            statement.param_count(),
            values.len()
        )));
    }
    let literals: HashMap<usize, String> = values
        .iter()
        .enumerate()
        .map(|(i, value)| (i + 1, value.render()))
        .collect();
    statement.bind(&literals)
}

/// Convert a bound value to what a column of `target` kind accepts.
///
/// Boolean columns take booleans and boolean words but never numbers, not even
/// `0` or `1`.
pub fn coerce(value: &ParamValue, target: ColumnKind) -> WireResult<ParamValue> {
    let reject = |reason: &str| {
        WireError::coercion(
            value.plain_text().unwrap_or_else(|| value.render()),
            target.sql_name(),
            reason,
        )
    };

    if value.is_null() {
        return Ok(ParamValue::Null);
    }

    match (target, value) {
        (ColumnKind::Boolean, ParamValue::Bool(b)) => Ok(ParamValue::Bool(*b)),
        (ColumnKind::Boolean, ParamValue::Text(s)) => parse_bool(s)
            .map(ParamValue::Bool)
            .ok_or_else(|| reject("not a boolean")),
        (ColumnKind::Boolean, ParamValue::Int(_) | ParamValue::Float(_) | ParamValue::Decimal(_)) => {
            Err(reject("numeric values cannot be bound to a boolean"))
        }

        (ColumnKind::SmallInt | ColumnKind::Integer | ColumnKind::BigInt, ParamValue::Int(n)) => {
            check_int_range(*n, target).map(ParamValue::Int).ok_or_else(|| reject("out of range"))
        }
        (ColumnKind::SmallInt | ColumnKind::Integer | ColumnKind::BigInt, ParamValue::Decimal(d)) => {
            if !d.is_integral() {
                return Err(reject("has a fractional part"));
            }
            d.trunc_i64()
                .and_then(|n| check_int_range(n, target))
                .map(ParamValue::Int)
                .ok_or_else(|| reject("out of range"))
        }
        (ColumnKind::SmallInt | ColumnKind::Integer | ColumnKind::BigInt, ParamValue::Text(s)) => {
            let n: i64 = s.trim().parse().map_err(|_| reject("not an integer"))?;
            check_int_range(n, target).map(ParamValue::Int).ok_or_else(|| reject("out of range"))
        }

        (ColumnKind::Real | ColumnKind::Double, ParamValue::Int(n)) => Ok(ParamValue::Float(*n as f64)),
        (ColumnKind::Real | ColumnKind::Double, ParamValue::Float(n)) => Ok(ParamValue::Float(*n)),
        (ColumnKind::Real | ColumnKind::Double, ParamValue::Decimal(d)) => Ok(ParamValue::Float(d.to_f64())),
        (ColumnKind::Real | ColumnKind::Double, ParamValue::Text(s)) => parse_f64(s)
            .map(ParamValue::Float)
            .ok_or_else(|| reject("not a number")),

        (ColumnKind::Decimal, ParamValue::Int(n)) => Ok(ParamValue::Decimal(Decimal::from(*n))),
        (ColumnKind::Decimal, ParamValue::Decimal(d)) => Ok(ParamValue::Decimal(d.clone())),
        (ColumnKind::Decimal, ParamValue::Text(s)) => Ok(ParamValue::Decimal(s.parse()?)),

        (ColumnKind::Text | ColumnKind::Json | ColumnKind::Unknown, scalar) => scalar
            .plain_text()
            .map(ParamValue::Text)
            .ok_or_else(|| reject("not a scalar")),

        (ColumnKind::Date, ParamValue::Date(d)) => Ok(ParamValue::Date(*d)),
        (ColumnKind::Date, ParamValue::Text(s)) => Ok(ParamValue::Date(temporal::parse_date(s)?)),

        (ColumnKind::Timestamp, ParamValue::Timestamp(ts)) => Ok(ParamValue::Timestamp(*ts)),
        (ColumnKind::Timestamp, ParamValue::Date(d)) => {
            Ok(ParamValue::Timestamp(d.and_time(NaiveTime::MIN)))
        }
        (ColumnKind::Timestamp, ParamValue::Text(s)) => {
            Ok(ParamValue::Timestamp(temporal::parse_timestamp(s)?))
        }

        (ColumnKind::Array, ParamValue::Array(items)) => Ok(ParamValue::Array(items.clone())),

        _ => Err(reject("unsupported conversion")),
    }
}

fn check_int_range(n: i64, target: ColumnKind) -> Option<i64> {
    let fits = match target {
        ColumnKind::SmallInt => i16::try_from(n).is_ok(),
        ColumnKind::Integer => i32::try_from(n).is_ok(),
        _ => true,
    };
    fits.then_some(n)
}

/// Read a rendered literal back under `column`.
///
/// `\N` is null, a single-quoted literal is unquoted and unescaped, and what
/// remains is decoded the same way a result cell would be.
pub fn parse_literal(literal: &str, column: &WireColumn) -> WireResult<TypedValue> {
    let literal = literal.trim();
    if literal == "\\N" {
        return Ok(TypedValue::Null);
    }
    match literal.strip_prefix('\'').and_then(|s| s.strip_suffix('\'')) {
        Some(inner) if literal.len() >= 2 => decode(Some(&unquote(inner)), column),
        _ => decode(Some(literal), column),
    }
}

fn unquote(inner: &str) -> String {
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '\\' => {
                if let Some(escaped) = chars.next() {
                    out.push(unescape_char(escaped));
                }
            }
            '\'' if chars.peek() == Some(&'\'') => {
                chars.next();
                out.push('\'');
            }
            c => out.push(c),
        }
    }
    out
}

impl From<bool> for ParamValue {
    fn from(b: bool) -> Self {
        ParamValue::Bool(b)
    }
}

macro_rules! impl_from_int {
    ($($t:ty),*) => {
        $(
            impl From<$t> for ParamValue {
                fn from(n: $t) -> Self {
                    ParamValue::Int(i64::from(n))
                }
            }
        )*
    };
}

impl_from_int!(i8, i16, i32, i64, u8, u16, u32);

impl From<f32> for ParamValue {
    fn from(n: f32) -> Self {
        ParamValue::Float(f64::from(n))
    }
}

impl From<f64> for ParamValue {
    fn from(n: f64) -> Self {
        ParamValue::Float(n)
    }
}

impl From<&str> for ParamValue {
    fn from(s: &str) -> Self {
        ParamValue::Text(s.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(s: String) -> Self {
        ParamValue::Text(s)
    }
}

impl From<Decimal> for ParamValue {
    fn from(d: Decimal) -> Self {
        ParamValue::Decimal(d)
    }
}

impl From<NaiveDate> for ParamValue {
    fn from(d: NaiveDate) -> Self {
        ParamValue::Date(d)
    }
}

impl From<NaiveDateTime> for ParamValue {
    fn from(ts: NaiveDateTime) -> Self {
        ParamValue::Timestamp(ts)
    }
}

impl<T: Into<ParamValue>> From<Vec<T>> for ParamValue {
    fn from(items: Vec<T>) -> Self {
        ParamValue::Array(items.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<ParamValue>> From<Option<T>> for ParamValue {
    fn from(opt: Option<T>) -> Self {
        match opt {
            Some(v) => v.into(),
            None => ParamValue::Null,
        }
    }
}
