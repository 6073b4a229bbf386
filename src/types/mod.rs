//! The closed type system of result columns.
//!
//! Every wire type name resolves to a [`ColumnKind`] through a fixed alias
//! table, with `Nullable(...)`, `Array(...)`, `Tuple(...)` and `Decimal(p,s)`
//! unwrapped into a [`WireColumn`]. Decoding a cell is a `match` on the kind;
//! see [`value::decode`].

pub mod decimal;
mod literal;
mod parse;
pub mod temporal;
pub mod value;

use std::fmt;

pub use decimal::Decimal;
pub use value::{decode, parse_bool, TypedValue};
pub(crate) use literal::unescape_char;
pub(crate) use value::parse_f64;

/// Logical value category of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColumnKind {
    Boolean,
    SmallInt,
    Integer,
    BigInt,
    Real,
    Double,
    Decimal,
    Text,
    Bytea,
    Date,
    Timestamp,
    TimestampTz,
    Array,
    Tuple,
    Json,
    /// The type of a bare `NULL`; every cell is null.
    Nothing,
    /// Anything the alias table does not know. Decoded as text.
    Unknown,
}

/// Wire type names, matched case-insensitively.
const ALIASES: &[(&str, ColumnKind)] = &[
    ("boolean", ColumnKind::Boolean),
    ("bool", ColumnKind::Boolean),
    ("int8", ColumnKind::SmallInt),
    ("uint8", ColumnKind::SmallInt),
    ("int16", ColumnKind::SmallInt),
    ("smallint", ColumnKind::SmallInt),
    ("int2", ColumnKind::SmallInt),
    ("tinyint", ColumnKind::SmallInt),
    ("int32", ColumnKind::Integer),
    ("uint16", ColumnKind::Integer),
    ("integer", ColumnKind::Integer),
    ("int", ColumnKind::Integer),
    ("int4", ColumnKind::Integer),
    ("int64", ColumnKind::BigInt),
    ("uint32", ColumnKind::BigInt),
    ("uint64", ColumnKind::BigInt),
    ("bigint", ColumnKind::BigInt),
    ("long", ColumnKind::BigInt),
    ("float32", ColumnKind::Real),
    ("real", ColumnKind::Real),
    ("float4", ColumnKind::Real),
    ("float", ColumnKind::Real),
    ("float64", ColumnKind::Double),
    ("double", ColumnKind::Double),
    ("double precision", ColumnKind::Double),
    ("float8", ColumnKind::Double),
    ("decimal", ColumnKind::Decimal),
    ("numeric", ColumnKind::Decimal),
    ("string", ColumnKind::Text),
    ("text", ColumnKind::Text),
    ("varchar", ColumnKind::Text),
    ("bytea", ColumnKind::Bytea),
    ("date", ColumnKind::Date),
    ("date32", ColumnKind::Date),
    ("pgdate", ColumnKind::Date),
    ("datetime", ColumnKind::Timestamp),
    ("datetime64", ColumnKind::Timestamp),
    ("timestamp", ColumnKind::Timestamp),
    ("timestampntz", ColumnKind::Timestamp),
    ("timestamp_ext", ColumnKind::Timestamp),
    ("timestamptz", ColumnKind::TimestampTz),
    ("timestamp with time zone", ColumnKind::TimestampTz),
    ("json", ColumnKind::Json),
    ("nothing", ColumnKind::Nothing),
    ("null", ColumnKind::Nothing),
];

/// Defaults for a bare `DECIMAL`/`NUMERIC`.
pub const DEFAULT_DECIMAL_PRECISION: u32 = 38;
pub const DEFAULT_DECIMAL_SCALE: u32 = 0;

impl ColumnKind {
    /// Resolve a scalar wire type name.
    pub fn from_alias(name: &str) -> Option<Self> {
        ALIASES
            .iter()
            .find(|(alias, _)| alias.eq_ignore_ascii_case(name))
            .map(|(_, kind)| *kind)
    }

    /// SQL-style name used in diagnostics.
    pub fn sql_name(&self) -> &'static str {
        match self {
            ColumnKind::Boolean => "BOOLEAN",
            ColumnKind::SmallInt => "SMALLINT",
            ColumnKind::Integer => "INTEGER",
            ColumnKind::BigInt => "BIGINT",
            ColumnKind::Real => "REAL",
            ColumnKind::Double => "DOUBLE PRECISION",
            ColumnKind::Decimal => "DECIMAL",
            ColumnKind::Text => "TEXT",
            ColumnKind::Bytea => "BYTEA",
            ColumnKind::Date => "DATE",
            ColumnKind::Timestamp => "TIMESTAMP",
            ColumnKind::TimestampTz => "TIMESTAMPTZ",
            ColumnKind::Array => "ARRAY",
            ColumnKind::Tuple => "TUPLE",
            ColumnKind::Json => "JSON",
            ColumnKind::Nothing => "NOTHING",
            ColumnKind::Unknown => "UNKNOWN",
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            ColumnKind::SmallInt
                | ColumnKind::Integer
                | ColumnKind::BigInt
                | ColumnKind::Real
                | ColumnKind::Double
                | ColumnKind::Decimal
        )
    }
}

impl fmt::Display for ColumnKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.sql_name())
    }
}

/// One result column as declared by the response header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WireColumn {
    pub name: String,
    /// The type exactly as the server sent it.
    pub raw_type: String,
    pub kind: ColumnKind,
    pub nullable: bool,
    pub precision: Option<u32>,
    /// Decimal scale, or sub-second digits for `DateTime64(p)`.
    pub scale: Option<u32>,
    /// Element type of an array.
    pub element: Option<Box<WireColumn>>,
    /// Field types of a tuple, in order.
    pub fields: Vec<WireColumn>,
}

impl WireColumn {
    /// Resolve `raw_type` into a column. Names that do not parse resolve to
    /// [`ColumnKind::Unknown`]; this never fails.
    pub fn parse(name: impl Into<String>, raw_type: impl Into<String>) -> Self {
        let raw_type = raw_type.into();
        let mut column = parse::parse_type(&raw_type).unwrap_or_else(|| Self::of(ColumnKind::Unknown));
        column.name = name.into();
        column.raw_type = raw_type;
        column
    }

    /// A nameless, non-nullable column of `kind`.
    pub fn of(kind: ColumnKind) -> Self {
        Self {
            name: String::new(),
            raw_type: String::new(),
            kind,
            nullable: false,
            precision: None,
            scale: None,
            element: None,
            fields: Vec::new(),
        }
    }

    pub fn array_of(element: WireColumn) -> Self {
        Self {
            element: Some(Box::new(element)),
            ..Self::of(ColumnKind::Array)
        }
    }

    pub fn tuple_of(fields: Vec<WireColumn>) -> Self {
        Self {
            fields,
            ..Self::of(ColumnKind::Tuple)
        }
    }

    pub fn decimal(precision: u32, scale: u32) -> Self {
        Self {
            precision: Some(precision),
            scale: Some(scale),
            ..Self::of(ColumnKind::Decimal)
        }
    }

    /// Number of nested `Array` levels; 0 for scalars.
    pub fn array_depth(&self) -> usize {
        match &self.element {
            Some(element) if self.kind == ColumnKind::Array => 1 + element.array_depth(),
            _ => 0,
        }
    }

    /// Kind of the innermost array element, or the column's own kind.
    pub fn base_kind(&self) -> ColumnKind {
        match &self.element {
            Some(element) if self.kind == ColumnKind::Array => element.base_kind(),
            _ => self.kind,
        }
    }

    /// Compact recursive type name, e.g. `ARRAY(ARRAY(INTEGER))`.
    pub fn type_name(&self) -> String {
        match self.kind {
            ColumnKind::Array => match &self.element {
                Some(element) => format!("ARRAY({})", element.type_name()),
                None => "ARRAY".to_string(),
            },
            ColumnKind::Tuple => {
                let fields: Vec<String> = self.fields.iter().map(WireColumn::type_name).collect();
                format!("TUPLE({})", fields.join(", "))
            }
            ColumnKind::Decimal => match (self.precision, self.scale) {
                (Some(p), Some(s)) => format!("DECIMAL({p},{s})"),
                _ => "DECIMAL".to_string(),
            },
            kind => kind.sql_name().to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_alias_lookup_is_case_insensitive() {
        assert_eq!(ColumnKind::from_alias("INTEGER"), Some(ColumnKind::Integer));
        assert_eq!(ColumnKind::from_alias("Int32"), Some(ColumnKind::Integer));
        assert_eq!(ColumnKind::from_alias("int"), Some(ColumnKind::Integer));
        assert_eq!(ColumnKind::from_alias("Float64"), Some(ColumnKind::Double));
        assert_eq!(
            ColumnKind::from_alias("DOUBLE PRECISION"),
            Some(ColumnKind::Double)
        );
        assert_eq!(ColumnKind::from_alias("BOOL"), Some(ColumnKind::Boolean));
        assert_eq!(ColumnKind::from_alias("JSON"), Some(ColumnKind::Json));
        assert_eq!(ColumnKind::from_alias("geography"), None);
    }

    #[test]
    fn test_type_names() {
        let nested = WireColumn::array_of(WireColumn::array_of(WireColumn::of(ColumnKind::Integer)));
        assert_eq!(nested.type_name(), "ARRAY(ARRAY(INTEGER))");
        assert_eq!(nested.array_depth(), 2);
        assert_eq!(nested.base_kind(), ColumnKind::Integer);
        assert_eq!(WireColumn::decimal(38, 9).type_name(), "DECIMAL(38,9)");
        let tuple = WireColumn::tuple_of(vec![
            WireColumn::of(ColumnKind::Integer),
            WireColumn::of(ColumnKind::Text),
        ]);
        assert_eq!(tuple.type_name(), "TUPLE(INTEGER, TEXT)");
    }

    #[test]
    fn test_numeric_kinds() {
        for kind in [ColumnKind::SmallInt, ColumnKind::BigInt, ColumnKind::Double, ColumnKind::Decimal] {
            assert!(kind.is_numeric(), "{kind}");
        }
        for kind in [ColumnKind::Boolean, ColumnKind::Text, ColumnKind::Date, ColumnKind::Array] {
            assert!(!kind.is_numeric(), "{kind}");
        }
    }

    #[test]
    fn test_unparsable_type_is_unknown() {
        let column = WireColumn::parse("c", "Array(");
        assert_eq!(column.kind, ColumnKind::Unknown);
        assert_eq!(column.raw_type, "Array(");
        assert_eq!(column.name, "c");
    }
}
