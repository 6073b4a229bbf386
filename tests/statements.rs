use std::collections::HashMap;

use boltwire::prelude::*;
use pretty_assertions::assert_eq;
use rand::rngs::StdRng;
use rand::seq::IndexedRandom;
use rand::{Rng, SeedableRng};

/// Fragments that hide `?` and `;` from the scanner.
const INERT: &[&str] = &[
    "'a?b'",
    "'it''s ?'",
    "'esc\\'?;'",
    "-- note ? ; \n",
    "/* ? ; */",
    "\"col?\"",
    "'multi\nline ?'",
];

const PLAIN: &[&str] = &["x", "1", ",", "(", ")", "=", "name", "+", "FROM t", "'ok'"];

fn generate(rng: &mut StdRng) -> (String, usize) {
    let mut sql = String::from("SELECT");
    let mut markers = 0;
    for _ in 0..rng.random_range(0..40) {
        sql.push(' ');
        let fragment = match rng.random_range(0..3) {
            0 => {
                markers += 1;
                Some(&"?")
            }
            1 => INERT.choose(rng),
            _ => PLAIN.choose(rng),
        };
        sql.push_str(fragment.copied().unwrap_or_default());
    }
    (sql, markers)
}

#[test]
fn test_random_markers_never_inside_comments_or_strings() {
    let mut rng = StdRng::seed_from_u64(0x2545_f491_4f6c_dd1d);
    for round in 0..500 {
        let (sql, expected) = generate(&mut rng);
        let statement = boltwire::analyze(&sql).unwrap_or_else(|e| panic!("round {round}: {e}\n{sql}"));

        assert_eq!(statement.param_count(), expected, "round {round}: {sql}");

        let clean: Vec<char> = statement.clean_sql().chars().collect();
        let mut last_offset = None;
        for (i, marker) in statement.markers().iter().enumerate() {
            assert_eq!(marker.id, i + 1, "round {round}: {sql}");
            assert_eq!(clean[marker.offset], '?', "round {round}: {sql}");
            assert!(last_offset < Some(marker.offset), "round {round}: {sql}");
            last_offset = Some(marker.offset);
        }
    }
}

#[test]
fn test_random_statements_bind_every_marker() {
    let mut rng = StdRng::seed_from_u64(0x9e37_79b9_7f4a_7c15);
    for _ in 0..200 {
        let (sql, expected) = generate(&mut rng);
        let statement = boltwire::analyze(&sql).unwrap();
        let literals: HashMap<usize, String> =
            (1..=expected).map(|id| (id, format!("{}", id * 1000))).collect();
        let bound = statement.bind(&literals).unwrap();

        let rebound = boltwire::analyze(&bound).unwrap();
        assert_eq!(rebound.param_count(), 0, "{bound}");
    }
}

#[test]
fn test_split_trailing_comment_stays_with_last_statement() {
    let batch = boltwire::split("SELECT 1; SELECT 2 -- trailing").unwrap();
    assert_eq!(batch.len(), 2);
    assert_eq!(batch[0].original_sql(), "SELECT 1");
    assert_eq!(batch[1].original_sql(), " SELECT 2 -- trailing");
    assert_eq!(batch[1].clean_sql(), "SELECT 2");
}

#[test]
fn test_split_keeps_separators_inside_literals_and_comments() {
    let sql = "INSERT INTO t VALUES ('a;b'); /* ; */ SELECT \";\" FROM t -- ;\n; SET x = 1";
    let batch = boltwire::split(sql).unwrap();
    let types: Vec<StatementType> = batch.iter().map(RawStatement::statement_type).collect();
    assert_eq!(
        types,
        vec![
            StatementType::NonQuery,
            StatementType::Query,
            StatementType::ParamSetting
        ]
    );
    for statement in &batch {
        assert_eq!(&sql[statement.span()], statement.original_sql());
    }
}

#[test]
fn test_bind_in_list_example() {
    let statement = boltwire::analyze("SELECT * FROM EMPLOYEES WHERE id IN (?,?)").unwrap();
    let literals: HashMap<usize, String> =
        [(1, "5".to_string()), (2, "7".to_string())].into_iter().collect();
    assert_eq!(
        statement.bind(&literals).unwrap(),
        "SELECT * FROM EMPLOYEES WHERE id IN (5,7)"
    );
}

#[test]
fn test_set_is_rejected_before_sending() {
    for sql in ["SET", "SET =", "SET x", "SET = 1", "set x ="] {
        let result = boltwire::analyze(sql);
        if sql == "SET" {
            // no whitespace after the keyword, so not a SET statement at all
            assert!(result.is_ok());
            continue;
        }
        assert!(matches!(result, Err(WireError::Syntax { .. })), "{sql}");
    }
}

#[test]
fn test_unterminated_string_reports_its_start() {
    let err = boltwire::analyze("SELECT 1, 'oops").unwrap_err();
    assert!(matches!(err, WireError::Syntax { position: 10, .. }), "{err}");
}

#[test]
fn test_query_targets() {
    let cases = [
        ("SELECT * FROM sales.orders o", Some("sales"), Some("orders")),
        ("select a from orders where b = 'FROM x'", None, Some("orders")),
        ("WITH c AS (SELECT 1) SELECT * FROM c", None, Some("c")),
        ("DESCRIBE orders", None, Some("tables")),
        ("SHOW TABLES", None, None),
    ];
    for (sql, db, table) in cases {
        let statement = boltwire::analyze(sql).unwrap();
        assert_eq!((statement.database(), statement.table()), (db, table), "{sql}");
    }
}
