#![allow(dead_code)]

use serde_json::Value;
use sqlsieve_core::{
    ConstraintSpec, DialectKind, Filter, QueryCompiler, RowSet, Sort, Statement, WritePlan,
};

pub fn pg() -> QueryCompiler {
    QueryCompiler::new(DialectKind::Postgres)
}

pub fn sqlite() -> QueryCompiler {
    QueryCompiler::new(DialectKind::Sqlite)
}

pub fn filter(json: Value) -> Filter {
    Filter::from_json(&json).unwrap_or_else(|e| panic!("Failed to parse filter: {json}\nError: {e}"))
}

pub fn select(compiler: &QueryCompiler, table: &str, json: Value) -> Statement {
    compiler
        .select(table, &filter(json), &Sort::none(), None, None)
        .unwrap_or_else(|e| panic!("Failed to compile select on {table}: {e}"))
}

pub fn upsert(compiler: &QueryCompiler, table: &str, rows: Value, constraints: Value) -> WritePlan {
    let rows = RowSet::from_json(&rows).unwrap_or_else(|e| panic!("Bad rows: {e}"));
    let spec = ConstraintSpec::from_json(&constraints)
        .unwrap_or_else(|e| panic!("Bad constraints: {constraints}\nError: {e}"));
    compiler
        .upsert(table, &rows, &spec)
        .unwrap_or_else(|e| panic!("Failed to compile upsert on {table}: {e}"))
}

/// Placeholder numbers in order of appearance (`$3` or `?3` -> 3).
pub fn placeholder_indexes(sql: &str) -> Vec<usize> {
    let bytes = sql.as_bytes();
    let mut indexes = Vec::new();
    let mut i = 0;
    while i < bytes.len() {
        if (bytes[i] == b'$' || bytes[i] == b'?') && i + 1 < bytes.len() && bytes[i + 1].is_ascii_digit() {
            let start = i + 1;
            let mut end = start;
            while end < bytes.len() && bytes[end].is_ascii_digit() {
                end += 1;
            }
            indexes.push(sql[start..end].parse().unwrap());
            i = end;
        } else {
            i += 1;
        }
    }
    indexes
}
