//! SQL statement analysis.
//!
//! Turns raw SQL text into [`RawStatement`]s: classified, comment-free, with the
//! position of every `?` marker. Multi-statement scripts become a
//! [`StatementBatch`].
//!
//! ```
//! use boltwire::statement::{split, StatementKind};
//!
//! let batch = split("SET time_zone = 'UTC'; SELECT * FROM db.users WHERE id = ?").unwrap();
//! assert_eq!(batch.len(), 2);
//! assert_eq!(batch[0].set_param(), Some(("time_zone", "UTC")));
//! assert_eq!(batch[1].markers().len(), 1);
//! assert!(matches!(batch[1].kind(), StatementKind::Query { .. }));
//! ```

mod analyzer;
mod scanner;

use std::collections::HashMap;
use std::ops::{Index, Range};

pub use analyzer::{analyze, split};

use crate::error::{WireError, WireResult};

/// A `?` placeholder in a statement's clean SQL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParamMarker {
    /// 1-based ordinal within the statement.
    pub id: usize,
    /// Char offset of the `?` in the clean SQL.
    pub offset: usize,
}

/// Coarse statement category.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatementType {
    Query,
    NonQuery,
    ParamSetting,
}

/// What a statement is, with whatever was extracted for its category.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatementKind {
    /// Produces a result set. `db`/`table` come from the first `FROM` when found.
    Query {
        db: Option<String>,
        table: Option<String>,
    },
    NonQuery,
    /// `SET key = value`, handled client-side as a session parameter.
    SetParam { key: String, value: String },
}

impl StatementKind {
    pub fn statement_type(&self) -> StatementType {
        match self {
            StatementKind::Query { .. } => StatementType::Query,
            StatementKind::NonQuery => StatementType::NonQuery,
            StatementKind::SetParam { .. } => StatementType::ParamSetting,
        }
    }
}

/// One analysed SQL statement. Immutable once built.
#[derive(Debug, Clone, PartialEq)]
pub struct RawStatement {
    original_sql: String,
    clean_sql: String,
    span: Range<usize>,
    markers: Vec<ParamMarker>,
    kind: StatementKind,
}

impl RawStatement {
    pub(crate) fn new(
        original_sql: String,
        clean_sql: String,
        span: Range<usize>,
        markers: Vec<ParamMarker>,
        kind: StatementKind,
    ) -> Self {
        Self {
            original_sql,
            clean_sql,
            span,
            markers,
            kind,
        }
    }

    /// The statement exactly as it appeared in the input, comments included.
    pub fn original_sql(&self) -> &str {
        &self.original_sql
    }

    /// Comment-free, trimmed SQL. Marker offsets index into this.
    pub fn clean_sql(&self) -> &str {
        &self.clean_sql
    }

    /// Byte range of [`original_sql`](Self::original_sql) in the analysed input.
    pub fn span(&self) -> Range<usize> {
        self.span.clone()
    }

    pub fn markers(&self) -> &[ParamMarker] {
        &self.markers
    }

    pub fn param_count(&self) -> usize {
        self.markers.len()
    }

    pub fn kind(&self) -> &StatementKind {
        &self.kind
    }

    pub fn statement_type(&self) -> StatementType {
        self.kind.statement_type()
    }

    pub fn is_query(&self) -> bool {
        matches!(self.kind, StatementKind::Query { .. })
    }

    /// `(key, value)` for a `SET` statement.
    pub fn set_param(&self) -> Option<(&str, &str)> {
        match &self.kind {
            StatementKind::SetParam { key, value } => Some((key, value)),
            _ => None,
        }
    }

    /// Database named in the first `FROM`, if any.
    pub fn database(&self) -> Option<&str> {
        match &self.kind {
            StatementKind::Query { db, .. } => db.as_deref(),
            _ => None,
        }
    }

    pub fn table(&self) -> Option<&str> {
        match &self.kind {
            StatementKind::Query { table, .. } => table.as_deref(),
            _ => None,
        }
    }

    /// Substitute literal texts keyed by marker id. See [`crate::binder::bind`].
    pub fn bind(&self, literals: &HashMap<usize, String>) -> WireResult<String> {
        crate::binder::bind(&self.clean_sql, &self.markers, literals)
    }
}

/// Statements of a script in order of appearance.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StatementBatch {
    statements: Vec<RawStatement>,
    total_markers: usize,
}

impl StatementBatch {
    pub(crate) fn new(statements: Vec<RawStatement>) -> Self {
        let total_markers = statements.iter().map(RawStatement::param_count).sum();
        Self {
            statements,
            total_markers,
        }
    }

    pub fn len(&self) -> usize {
        self.statements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.statements.is_empty()
    }

    /// Markers across all statements.
    pub fn total_markers(&self) -> usize {
        self.total_markers
    }

    pub fn iter(&self) -> std::slice::Iter<'_, RawStatement> {
        self.statements.iter()
    }

    pub fn statements(&self) -> &[RawStatement] {
        &self.statements
    }

    pub fn into_statements(self) -> Vec<RawStatement> {
        self.statements
    }

    /// Bind a script-wide literal map, where ids run `1..=total_markers`
    /// across statements in order, and return one SQL string per statement.
    pub fn bind_all(&self, literals: &HashMap<usize, String>) -> WireResult<Vec<String>> {
        if literals.len() != self.total_markers {
            return Err(WireError::binding(format!(
                "expected {} bindings for the batch, got {}",
                self.total_markers,
                literals.len()
            )));
        }

        let mut base = 0;
        let mut out = Vec::with_capacity(self.statements.len());
        for statement in &self.statements {
            let mut local = HashMap::with_capacity(statement.param_count());
            for marker in statement.markers() {
                let global = base + marker.id;
                let literal = literals.get(&global).ok_or_else(|| {
                    WireError::binding(format!("missing binding for parameter {global}"))
                })?;
                local.insert(marker.id, literal.clone());
            }
            out.push(statement.bind(&local)?);
            base += statement.param_count();
        }
        Ok(out)
    }
}

impl Index<usize> for StatementBatch {
    type Output = RawStatement;

    fn index(&self, index: usize) -> &Self::Output {
        &self.statements[index]
    }
}

impl<'a> IntoIterator for &'a StatementBatch {
    type Item = &'a RawStatement;
    type IntoIter = std::slice::Iter<'a, RawStatement>;

    fn into_iter(self) -> Self::IntoIter {
        self.statements.iter()
    }
}

impl IntoIterator for StatementBatch {
    type Item = RawStatement;
    type IntoIter = std::vec::IntoIter<RawStatement>;

    fn into_iter(self) -> Self::IntoIter {
        self.statements.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn literals(pairs: &[(usize, &str)]) -> HashMap<usize, String> {
        pairs.iter().map(|(k, v)| (*k, v.to_string())).collect()
    }

    #[test]
    fn test_statement_type_tags() {
        let batch = split("SELECT 1; INSERT INTO t VALUES (1); SET a=b").unwrap();
        let types: Vec<_> = batch.iter().map(RawStatement::statement_type).collect();
        assert_eq!(
            types,
            vec![
                StatementType::Query,
                StatementType::NonQuery,
                StatementType::ParamSetting
            ]
        );
    }

    #[test]
    fn test_total_markers() {
        let batch = split("SELECT ?; SELECT ?, ?").unwrap();
        assert_eq!(batch.total_markers(), 3);
        assert_eq!(batch[1].markers()[1].id, 2);
    }

    #[test]
    fn test_bind_all_remaps_ids() {
        let batch = split("SELECT ?; SELECT ?, ?").unwrap();
        let sql = batch
            .bind_all(&literals(&[(1, "1"), (2, "'a'"), (3, "3")]))
            .unwrap();
        assert_eq!(sql, vec!["SELECT 1", "SELECT 'a', 3"]);
    }

    #[test]
    fn test_bind_all_count_mismatch() {
        let batch = split("SELECT ?; SELECT ?").unwrap();
        let err = batch.bind_all(&literals(&[(1, "1")])).unwrap_err();
        assert!(matches!(err, WireError::Binding(_)));
    }

    #[test]
    fn test_bind_all_missing_id() {
        let batch = split("SELECT ?; SELECT ?").unwrap();
        let err = batch.bind_all(&literals(&[(1, "1"), (7, "2")])).unwrap_err();
        assert!(matches!(err, WireError::Binding(_)));
    }
}
