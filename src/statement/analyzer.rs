//! Statement classification and extraction.

use tracing::{debug, trace};

use super::scanner::{self, Segment};
use super::{ParamMarker, RawStatement, StatementBatch, StatementKind};
use crate::error::{WireError, WireResult};

const QUERY_KEYWORDS: [&str; 7] = [
    "select", "show", "describe", "exists", "explain", "with", "call",
];

/// Split a script into statements on top-level `;`.
///
/// Blank segments between separators are dropped. A blank tail (comments or
/// whitespace after the last statement) is folded into the previous
/// statement's original text.
pub fn split(sql: &str) -> WireResult<StatementBatch> {
    let segments = scanner::scan(sql)?;
    let mut statements: Vec<RawStatement> = Vec::with_capacity(segments.len());
    let mut pending_tail: Option<usize> = None;

    for segment in &segments {
        if segment.is_blank() {
            pending_tail = Some(segment.span.end);
            continue;
        }
        pending_tail = None;
        statements.push(build(sql, segment)?);
    }

    if let (Some(end), Some(last)) = (pending_tail, statements.last_mut()) {
        let start = last.span.start;
        last.span = start..end;
        last.original_sql = sql[start..end].to_string();
    }

    debug!(
        statements = statements.len(),
        "split script into statements"
    );
    Ok(StatementBatch::new(statements))
}

/// Analyse text expected to hold a single statement.
///
/// A lone trailing `;` is fine. Input that is nothing but comments yields an
/// empty non-query statement.
pub fn analyze(sql: &str) -> WireResult<RawStatement> {
    let batch = split(sql)?;
    match batch.len() {
        0 => Ok(RawStatement::new(
            sql.to_string(),
            String::new(),
            0..sql.len(),
            Vec::new(),
            StatementKind::NonQuery,
        )),
        1 => Ok(batch.into_statements().remove(0)),
        n => Err(WireError::syntax(
            batch[1].span().start,
            format!("expected a single statement, found {n}"),
        )),
    }
}

fn build(sql: &str, segment: &Segment) -> WireResult<RawStatement> {
    let leading = segment
        .clean
        .chars()
        .take_while(|c| c.is_whitespace())
        .count();
    let clean = segment.clean.trim().to_string();
    let markers: Vec<ParamMarker> = segment
        .markers
        .iter()
        .enumerate()
        .map(|(i, &offset)| ParamMarker {
            id: i + 1,
            offset: offset - leading,
        })
        .collect();

    let kind = classify(&clean, segment.span.start)?;
    trace!(?kind, markers = markers.len(), "analysed statement");

    Ok(RawStatement::new(
        sql[segment.span.clone()].to_string(),
        clean,
        segment.span.clone(),
        markers,
        kind,
    ))
}

/// Classify comment-free, trimmed SQL. `position` is only used for errors.
fn classify(clean: &str, position: usize) -> WireResult<StatementKind> {
    if is_set(clean) {
        let (key, value) = parse_set(clean, position)?;
        return Ok(StatementKind::SetParam { key, value });
    }

    let Some(keyword) = QUERY_KEYWORDS
        .iter()
        .find(|keyword| starts_with_word(clean, keyword))
    else {
        return Ok(StatementKind::NonQuery);
    };

    let (db, table) = match *keyword {
        "describe" => (None, Some("tables".to_string())),
        "show" => (None, None),
        _ => query_target(clean),
    };
    Ok(StatementKind::Query { db, table })
}

fn starts_with_word(text: &str, word: &str) -> bool {
    text.len() >= word.len()
        && text.as_bytes()[..word.len()].eq_ignore_ascii_case(word.as_bytes())
        && text
            .as_bytes()
            .get(word.len())
            .is_none_or(|&b| !scanner::is_word_byte(b))
}

fn is_set(clean: &str) -> bool {
    clean.len() > 3
        && clean.as_bytes()[..3].eq_ignore_ascii_case(b"set")
        && clean.as_bytes()[3].is_ascii_whitespace()
}

/// `SET key = value` split on the first `=`.
fn parse_set(clean: &str, position: usize) -> WireResult<(String, String)> {
    let body = &clean[3..];
    let Some((key, value)) = body.split_once('=') else {
        return Err(WireError::syntax(
            position,
            "SET statement must have the form SET <key>=<value>",
        ));
    };
    let key = key.trim();
    let value = value.trim();
    if key.is_empty() || value.is_empty() {
        return Err(WireError::syntax(
            position,
            "SET statement needs both a key and a value",
        ));
    }

    let value = value
        .strip_prefix('\'')
        .and_then(|v| v.strip_suffix('\''))
        .unwrap_or(value);
    Ok((key.to_string(), value.to_string()))
}

/// Best effort `(db, table)` from the identifier following the first `FROM`.
fn query_target(clean: &str) -> (Option<String>, Option<String>) {
    let Some(after) = scanner::find_keyword(clean, "from") else {
        return (None, None);
    };
    let mut parts = identifier_parts(clean[after..].trim_start()).into_iter();
    match (parts.next(), parts.next()) {
        (Some(db), Some(table)) => (Some(db), Some(table)),
        (Some(table), None) => (None, Some(table)),
        _ => (None, None),
    }
}

/// Dot-separated segments of the identifier at the start of `text`, unquoted.
fn identifier_parts(text: &str) -> Vec<String> {
    let mut parts = Vec::new();
    let mut chars = text.chars().peekable();

    loop {
        let mut part = String::new();
        if chars.peek() == Some(&'"') {
            chars.next();
            while let Some(c) = chars.next() {
                if c == '"' {
                    if chars.peek() == Some(&'"') {
                        chars.next();
                        part.push('"');
                    } else {
                        break;
                    }
                } else {
                    part.push(c);
                }
            }
        } else {
            while let Some(&c) = chars.peek() {
                if c.is_alphanumeric() || c == '_' || c == '$' {
                    part.push(c);
                    chars.next();
                } else {
                    break;
                }
            }
        }

        if part.is_empty() {
            break;
        }
        parts.push(part);

        if chars.peek() == Some(&'.') {
            chars.next();
        } else {
            break;
        }
    }
    parts
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::statement::StatementType;

    #[test]
    fn test_classify_queries() {
        for sql in [
            "SELECT 1",
            "select 1",
            "  show tables",
            "DESCRIBE t",
            "EXISTS (select 1)",
            "explain select 1",
            "WITH x AS (SELECT 1) SELECT * FROM x",
            "CALL proc()",
            "/* hint */ SELECT 1",
            "-- note\nSELECT 1",
        ] {
            let statement = analyze(sql).unwrap();
            assert_eq!(statement.statement_type(), StatementType::Query, "{sql}");
        }
    }

    #[test]
    fn test_classify_non_queries() {
        for sql in ["INSERT INTO t VALUES (1)", "DROP TABLE t", "selection", "settle"] {
            let statement = analyze(sql).unwrap();
            assert_eq!(statement.statement_type(), StatementType::NonQuery, "{sql}");
        }
    }

    #[test]
    fn test_set_extraction() {
        let statement = analyze("SET  max_result_rows = 10").unwrap();
        assert_eq!(statement.set_param(), Some(("max_result_rows", "10")));

        let statement = analyze("set\ttime_zone='Europe/Berlin';").unwrap();
        assert_eq!(statement.set_param(), Some(("time_zone", "Europe/Berlin")));
    }

    #[test]
    fn test_set_splits_on_first_equals() {
        let statement = analyze("SET x='a=b'").unwrap();
        assert_eq!(statement.set_param(), Some(("x", "a=b")));
    }

    #[test]
    fn test_set_without_equals_is_syntax_error() {
        let err = analyze("SET something").unwrap_err();
        assert!(matches!(err, WireError::Syntax { .. }));

        let err = analyze("SET a =").unwrap_err();
        assert!(matches!(err, WireError::Syntax { .. }));
    }

    #[test]
    fn test_from_extraction() {
        let statement = analyze("SELECT * FROM db1.employees WHERE id = 1").unwrap();
        assert_eq!(statement.database(), Some("db1"));
        assert_eq!(statement.table(), Some("employees"));

        let statement = analyze("SELECT * FROM employees").unwrap();
        assert_eq!(statement.database(), None);
        assert_eq!(statement.table(), Some("employees"));

        let statement = analyze("select * from \"My Db\".\"T\".extra").unwrap();
        assert_eq!(statement.database(), Some("My Db"));
        assert_eq!(statement.table(), Some("T"));
    }

    #[test]
    fn test_from_in_comment_or_string_is_ignored() {
        let statement = analyze("SELECT 'from x' /* from y */ FROM z").unwrap();
        assert_eq!(statement.table(), Some("z"));

        let statement = analyze("SELECT 1").unwrap();
        assert_eq!(statement.table(), None);
    }

    #[test]
    fn test_describe_and_show() {
        let statement = analyze("DESCRIBE employees").unwrap();
        assert_eq!(statement.table(), Some("tables"));
        assert_eq!(statement.database(), None);

        let statement = analyze("SHOW databases").unwrap();
        assert_eq!(statement.table(), None);
        assert_eq!(statement.database(), None);
    }

    #[test]
    fn test_split_trailing_comment() {
        let batch = split("SELECT 1; SELECT 2 -- trailing").unwrap();
        assert_eq!(batch.len(), 2);
        assert!(batch[1].original_sql().contains("-- trailing"));
        assert_eq!(batch[1].clean_sql(), "SELECT 2");
    }

    #[test]
    fn test_blank_tail_folds_into_previous() {
        let sql = "SELECT 1; SELECT 2; -- the end\n";
        let batch = split(sql).unwrap();
        assert_eq!(batch.len(), 2);
        assert_eq!(batch[1].original_sql(), " SELECT 2; -- the end\n");
        assert_eq!(&sql[batch[1].span()], batch[1].original_sql());
    }

    #[test]
    fn test_empty_middle_segments_skipped() {
        let batch = split("SELECT 1;;  ; SELECT 2").unwrap();
        assert_eq!(batch.len(), 2);
    }

    #[test]
    fn test_marker_offsets_in_trimmed_clean_sql() {
        let statement = analyze("  /* c */  SELECT ? , ?").unwrap();
        assert_eq!(statement.clean_sql(), "SELECT ? , ?");
        let offsets: Vec<_> = statement.markers().iter().map(|m| m.offset).collect();
        assert_eq!(offsets, vec![7, 11]);
    }

    #[test]
    fn test_analyze_rejects_scripts() {
        let err = analyze("SELECT 1; SELECT 2").unwrap_err();
        assert!(matches!(err, WireError::Syntax { position: 9, .. }));
    }

    #[test]
    fn test_analyze_comment_only() {
        let statement = analyze("-- nothing here").unwrap();
        assert_eq!(statement.clean_sql(), "");
        assert_eq!(statement.statement_type(), StatementType::NonQuery);
    }
}
