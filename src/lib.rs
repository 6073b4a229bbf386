//! # boltwire
//!
//! The client-side engine of a columnar database wire client.
//!
//! Before a request, SQL is analysed and split into statements and `?`
//! markers are bound to literals. While consuming a response, checksummed
//! LZ4 blocks are decoded and the tab-separated body is read into typed rows.
//! No I/O happens here beyond the `Read`/`Write` values you pass in.
//!
//! ## Quick Example
//!
//! ```
//! use boltwire::prelude::*;
//!
//! let statement = boltwire::analyze("SELECT * FROM db.events WHERE id IN (?, ?)").unwrap();
//! assert_eq!(statement.table(), Some("events"));
//!
//! let sql = bind_values(&statement, &[ParamValue::from(5), ParamValue::from(7)]).unwrap();
//! assert_eq!(sql, "SELECT * FROM db.events WHERE id IN (5, 7)");
//!
//! let body = "id\tpayload\nInt32\tJSON\n1\t{\"ok\":true}\n";
//! let mut cursor = ResultCursor::open(body.as_bytes()).unwrap();
//! assert!(cursor.next().unwrap());
//! assert_eq!(cursor.get_i32(0).unwrap(), Some(1));
//! ```
//!
//! ## Modules
//!
//! | Module        | Role                                             |
//! |---------------|--------------------------------------------------|
//! | [`statement`] | classify, clean and split SQL, find `?` markers  |
//! | [`binder`]    | render values to literals and substitute them    |
//! | [`codec`]     | CityHash128-checksummed LZ4 block framing        |
//! | [`result`]    | forward-only typed cursor over response bodies   |
//! | [`types`]     | the closed column type system and cell decoding  |

pub mod binder;
pub mod codec;
pub mod config;
pub mod error;
pub mod result;
pub mod statement;
pub mod types;

pub mod prelude {
    pub use crate::binder::{bind_values, coerce, parse_literal, ParamValue};
    pub use crate::codec::{encode_block, hash128, FrameReader, FrameWriter};
    pub use crate::config::BoltConfig;
    pub use crate::error::*;
    pub use crate::result::{open_compressed, ResultCursor, WireRow};
    pub use crate::statement::{
        ParamMarker, RawStatement, StatementBatch, StatementKind, StatementType,
    };
    pub use crate::types::{ColumnKind, Decimal, TypedValue, WireColumn};
}

/// Analyse SQL holding a single statement.
///
/// # Example
///
/// ```
/// use boltwire::analyze;
///
/// let statement = analyze("SET time_zone = 'UTC'").unwrap();
/// assert_eq!(statement.set_param(), Some(("time_zone", "UTC")));
/// ```
pub fn analyze(sql: &str) -> error::WireResult<statement::RawStatement> {
    statement::analyze(sql)
}

/// Split a script on top-level `;` into a [`statement::StatementBatch`].
pub fn split(sql: &str) -> error::WireResult<statement::StatementBatch> {
    statement::split(sql)
}
