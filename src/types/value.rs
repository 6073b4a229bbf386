//! Typed cell values and the per-kind decode table.

use std::fmt;

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime};

use super::literal::{self, Node};
use super::temporal;
use super::{ColumnKind, Decimal, WireColumn};
use crate::error::{WireError, WireResult};

/// A decoded cell.
#[derive(Debug, Clone, PartialEq)]
pub enum TypedValue {
    Null,
    Bool(bool),
    SmallInt(i16),
    Int(i32),
    BigInt(i64),
    Real(f32),
    Double(f64),
    Decimal(Decimal),
    Text(String),
    Bytes(Vec<u8>),
    Date(NaiveDate),
    Timestamp(NaiveDateTime),
    TimestampTz(DateTime<FixedOffset>),
    Array(Vec<TypedValue>),
    Tuple(Vec<TypedValue>),
    /// JSON document, passed through as text without parsing.
    Json(String),
}

/// Lenient boolean text: `1 true t yes y on` and `0 false f no n off`, any case.
pub fn parse_bool(text: &str) -> Option<bool> {
    match text.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "t" | "yes" | "y" | "on" => Some(true),
        "0" | "false" | "f" | "no" | "n" | "off" => Some(false),
        _ => None,
    }
}

/// Decode one raw cell under `column`. `None` is the null sentinel and is
/// null whatever the declared kind.
pub fn decode(raw: Option<&str>, column: &WireColumn) -> WireResult<TypedValue> {
    match raw {
        None => Ok(TypedValue::Null),
        Some(text) => decode_text(text, column),
    }
}

fn decode_text(text: &str, column: &WireColumn) -> WireResult<TypedValue> {
    let target = || column.type_name();
    let parse_err = |e: &dyn fmt::Display| WireError::coercion(text, target(), e.to_string());

    let value = match column.kind {
        ColumnKind::Boolean => TypedValue::Bool(
            parse_bool(text)
                .ok_or_else(|| WireError::coercion(text, target(), "not a boolean"))?,
        ),
        ColumnKind::SmallInt => TypedValue::SmallInt(text.trim().parse().map_err(|e| parse_err(&e))?),
        ColumnKind::Integer => TypedValue::Int(text.trim().parse().map_err(|e| parse_err(&e))?),
        ColumnKind::BigInt => TypedValue::BigInt(text.trim().parse().map_err(|e| parse_err(&e))?),
        ColumnKind::Real => TypedValue::Real(parse_f64(text).ok_or_else(|| {
            WireError::coercion(text, target(), "not a number")
        })? as f32),
        ColumnKind::Double => TypedValue::Double(
            parse_f64(text).ok_or_else(|| WireError::coercion(text, target(), "not a number"))?,
        ),
        ColumnKind::Decimal => TypedValue::Decimal(text.parse()?),
        ColumnKind::Text | ColumnKind::Unknown => TypedValue::Text(text.to_string()),
        ColumnKind::Json => TypedValue::Json(text.to_string()),
        ColumnKind::Bytea => TypedValue::Bytes(decode_bytea(text)?),
        ColumnKind::Date => TypedValue::Date(temporal::parse_date(text)?),
        ColumnKind::Timestamp => TypedValue::Timestamp(temporal::parse_timestamp(text)?),
        ColumnKind::TimestampTz => TypedValue::TimestampTz(temporal::parse_timestamptz(text)?),
        ColumnKind::Array | ColumnKind::Tuple => {
            let node = literal::parse(text).map_err(|reason| WireError::coercion(text, target(), reason))?;
            decode_node(&node, column)?
        }
        ColumnKind::Nothing => TypedValue::Null,
    };
    Ok(value)
}

fn decode_node(node: &Node, column: &WireColumn) -> WireResult<TypedValue> {
    if node.is_null() {
        return Ok(TypedValue::Null);
    }

    match (column.kind, node) {
        (ColumnKind::Array, Node::List(items)) => {
            let unknown = WireColumn::of(ColumnKind::Unknown);
            let element = column.element.as_deref().unwrap_or(&unknown);
            let values = items
                .iter()
                .map(|item| decode_node(item, element))
                .collect::<WireResult<Vec<_>>>()?;
            Ok(TypedValue::Array(values))
        }
        (ColumnKind::Tuple, Node::Group(items)) => {
            if items.len() != column.fields.len() {
                return Err(WireError::coercion(
                    format!("{node:?}"),
                    column.type_name(),
                    format!("expected {} fields, found {}", column.fields.len(), items.len()),
                ));
            }
            let values = items
                .iter()
                .zip(&column.fields)
                .map(|(item, field)| decode_node(item, field))
                .collect::<WireResult<Vec<_>>>()?;
            Ok(TypedValue::Tuple(values))
        }
        (_, Node::Bare(text) | Node::Quoted(text)) => {
            if matches!(column.kind, ColumnKind::Array | ColumnKind::Tuple) {
                return Err(WireError::coercion(
                    text.as_str(),
                    column.type_name(),
                    "expected a bracketed literal",
                ));
            }
            decode_text(text, column)
        }
        (_, Node::List(_) | Node::Group(_)) => Err(WireError::coercion(
            format!("{node:?}"),
            column.type_name(),
            "unexpected nested literal",
        )),
    }
}

/// Floats with the server's spellings of NaN and the infinities.
pub(crate) fn parse_f64(text: &str) -> Option<f64> {
    let text = text.trim();
    match text.to_ascii_lowercase().as_str() {
        "nan" | "+nan" | "-nan" => Some(f64::NAN),
        "inf" | "+inf" | "infinity" | "+infinity" => Some(f64::INFINITY),
        "-inf" | "-infinity" => Some(f64::NEG_INFINITY),
        _ => text.parse().ok(),
    }
}

/// `\x` followed by hex digits; anything else is taken as raw bytes.
fn decode_bytea(text: &str) -> WireResult<Vec<u8>> {
    let Some(hex) = text.strip_prefix("\\x") else {
        return Ok(text.as_bytes().to_vec());
    };
    if !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(WireError::coercion(text, "BYTEA", "invalid hex digit"));
    }
    if hex.len() % 2 != 0 {
        return Err(WireError::coercion(text, "BYTEA", "odd number of hex digits"));
    }
    Ok(hex
        .as_bytes()
        .chunks(2)
        .map(|pair| (hex_value(pair[0]) << 4) | hex_value(pair[1]))
        .collect())
}

/// Value of an ASCII hex digit, already validated.
fn hex_value(b: u8) -> u8 {
    match b {
        b'0'..=b'9' => b - b'0',
        b'a'..=b'f' => b - b'a' + 10,
        _ => b - b'A' + 10,
    }
}

fn encode_bytea(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(2 + bytes.len() * 2);
    out.push_str("\\x");
    for b in bytes {
        out.push_str(&format!("{b:02x}"));
    }
    out
}

impl TypedValue {
    pub fn is_null(&self) -> bool {
        matches!(self, TypedValue::Null)
    }

    /// JSON rendering for display. Exact decimals and non-finite floats become
    /// strings; JSON cells stay the text they arrived as.
    pub fn to_json(&self) -> serde_json::Value {
        use serde_json::Value;

        let float = |v: f64| {
            serde_json::Number::from_f64(v)
                .map(Value::Number)
                .unwrap_or_else(|| Value::String(v.to_string()))
        };

        match self {
            TypedValue::Null => Value::Null,
            TypedValue::Bool(v) => Value::Bool(*v),
            TypedValue::SmallInt(v) => Value::from(*v),
            TypedValue::Int(v) => Value::from(*v),
            TypedValue::BigInt(v) => Value::from(*v),
            TypedValue::Real(v) => float(*v as f64),
            TypedValue::Double(v) => float(*v),
            TypedValue::Array(items) | TypedValue::Tuple(items) => {
                Value::Array(items.iter().map(TypedValue::to_json).collect())
            }
            other => Value::String(other.to_string()),
        }
    }
}

impl fmt::Display for TypedValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypedValue::Null => f.write_str("NULL"),
            TypedValue::Bool(v) => write!(f, "{v}"),
            TypedValue::SmallInt(v) => write!(f, "{v}"),
            TypedValue::Int(v) => write!(f, "{v}"),
            TypedValue::BigInt(v) => write!(f, "{v}"),
            TypedValue::Real(v) => write!(f, "{v}"),
            TypedValue::Double(v) => write!(f, "{v}"),
            TypedValue::Decimal(v) => write!(f, "{v}"),
            TypedValue::Text(v) | TypedValue::Json(v) => f.write_str(v),
            TypedValue::Bytes(v) => f.write_str(&encode_bytea(v)),
            TypedValue::Date(v) => f.write_str(&temporal::format_date(v)),
            TypedValue::Timestamp(v) => f.write_str(&temporal::format_timestamp(v)),
            TypedValue::TimestampTz(v) => f.write_str(&temporal::format_timestamptz(v)),
            TypedValue::Array(items) => write_items(f, "[", items, "]"),
            TypedValue::Tuple(items) => write_items(f, "(", items, ")"),
        }
    }
}

fn write_items(f: &mut fmt::Formatter<'_>, open: &str, items: &[TypedValue], close: &str) -> fmt::Result {
    f.write_str(open)?;
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            f.write_str(",")?;
        }
        write!(f, "{item}")?;
    }
    f.write_str(close)
}
