mod common;

use common::{pg, placeholder_indexes, sqlite, upsert};
use serde_json::{json, Value};
use sqlsieve_core::{QueryCompiler, RowSet, SqlValue};

fn records(n: usize) -> Value {
    Value::Array(
        (0..n)
            .map(|i| json!({"sku": format!("sku-{i}"), "qty": i}))
            .collect(),
    )
}

#[test]
fn large_inserts_are_split_into_thousand_row_statements() {
    let rows = RowSet::from_json(&records(2500)).unwrap();
    let plan = pg().insert("items", &rows).unwrap();
    assert_eq!(plan.rows, 2500);
    let sizes: Vec<usize> = plan.statements.iter().map(|s| s.params.len() / 2).collect();
    assert_eq!(sizes, vec![1000, 1000, 500]);
    for statement in &plan.statements {
        let expected: Vec<usize> = (1..=statement.params.len()).collect();
        assert_eq!(placeholder_indexes(&statement.sql), expected);
    }
}

#[test]
fn upsert_chunks_share_the_strategy() {
    let plan = upsert(&sqlite(), "items", records(1500), json!(["sku"]));
    assert_eq!(plan.statements.len(), 2);
    for statement in &plan.statements {
        assert!(statement
            .sql
            .contains(r#"ON CONFLICT ("sku") DO UPDATE SET "qty" = EXCLUDED."qty""#));
    }
}

#[test]
fn multi_constraint_batch_falls_back_to_first_constraint_on_postgres() {
    let plan = upsert(
        &pg(),
        "members",
        json!([
            {"org_id": 1, "user_id": 2, "email": "a@x.io", "role": "admin"},
            {"org_id": 1, "user_id": 3, "email": "b@x.io", "role": "viewer"}
        ]),
        json!([{"org_id": true, "user_id": true}, "email"]),
    );
    let sql = &plan.statements[0].sql;
    assert!(sql.contains(r#"ON CONFLICT ("org_id", "user_id") DO UPDATE SET "role" = EXCLUDED."role""#));
    assert!(!sql.contains("WITH source_data"));
}

#[test]
fn single_record_with_many_constraints_merges_on_postgres() {
    let plan = upsert(
        &pg(),
        "members",
        json!({"org_id": 1, "user_id": 2, "email": "a@x.io", "role": "admin"}),
        json!([["org_id", "user_id"], "email"]),
    );
    let sql = &plan.statements[0].sql;
    assert!(sql.starts_with("WITH source_data"));
    assert!(sql.contains(
        r#"WHERE (target."org_id" = source_data."org_id" AND target."user_id" = source_data."user_id") OR (target."email" = source_data."email")"#
    ));
    assert_eq!(
        plan.statements[0].params,
        vec![SqlValue::Text(String::from(
            r#"{"org_id":1,"user_id":2,"email":"a@x.io","role":"admin"}"#
        ))]
    );
}

#[test]
fn merged_null_column_takes_the_table_row_type() {
    let plan = upsert(
        &pg(),
        "n1",
        json!({"tenant_id": 1, "slug": "a", "email": "a@x", "age": null}),
        json!([["tenant_id", "slug"], "email"]),
    );
    let statement = &plan.statements[0];
    assert!(statement
        .sql
        .contains(r#"FROM json_populate_record(NULL::"n1", $1::json)"#));
    assert!(statement.sql.contains(r#"SET "age" = source_data."age""#));
    assert_eq!(placeholder_indexes(&statement.sql), vec![1]);
    assert_eq!(
        statement.params,
        vec![SqlValue::Text(String::from(
            r#"{"tenant_id":1,"slug":"a","email":"a@x","age":null}"#
        ))]
    );
}

#[test]
fn wide_records_shrink_chunks_below_the_parameter_ceiling() {
    let record: serde_json::Map<String, Value> =
        (0..100).map(|i| (format!("c{i}"), json!(i))).collect();
    let rows: Vec<Value> = (0..700).map(|_| Value::Object(record.clone())).collect();
    let rows = RowSet::from_json(&Value::Array(rows)).unwrap();
    let plan = sqlite().insert("wide", &rows).unwrap();
    // 32766 / 100 = 327 records per statement
    assert_eq!(plan.statements.len(), 3);
    assert!(plan.statements.iter().all(|s| s.params.len() <= 32766));
}

#[test]
fn normalization_applies_to_written_values() {
    let compiler: QueryCompiler = pg();
    let rows = RowSet::from_json(&json!({
        "account_id": 7.9,
        "mobile": "0612345678",
        "score": "3.5",
        "big": "99999999999999999999",
        "flag": "FALSE",
        "tags": "[\"a\",\"b\"]"
    }))
    .unwrap();
    let plan = compiler.insert("t", &rows).unwrap();
    let statement = &plan.statements[0];
    assert_eq!(
        statement.params,
        vec![
            SqlValue::Int(7),
            SqlValue::Text(String::from("0612345678")),
            SqlValue::Float(3.5),
            SqlValue::Text(String::from("99999999999999999999")),
            SqlValue::Bool(false),
            SqlValue::Text(String::from("[\"a\",\"b\"]")),
        ]
    );
    assert!(statement.sql.contains("$1::bigint"));
    assert!(statement.sql.contains("$5::boolean"));
    assert!(statement.sql.contains("$6::jsonb"));
}
