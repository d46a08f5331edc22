//! Chunked multi-row INSERT statements.

use serde_json::Value;
use tracing::debug;

use super::{QueryCompiler, RowSet, Statement, WritePlan};
use crate::error::Result;
use crate::ident;
use crate::params::Params;
use crate::value::SqlValue;

impl QueryCompiler {
    /// Plain multi-row INSERT, one statement per chunk.
    ///
    /// There is no conflict clause: a record violating a unique constraint
    /// fails its statement.
    pub fn insert(&self, table: &str, rows: &RowSet) -> Result<WritePlan> {
        let dialect = self.dialect();
        let table = self.table(table)?;
        let columns = ident::quote_list(dialect, rows.columns())?;
        let statements = rows
            .rows()
            .chunks(self.chunk_size(rows.columns().len()))
            .map(|chunk| {
                let mut params = Params::new(dialect);
                let values = self.values_list(rows.columns(), chunk, &mut params);
                let sql = format!(
                    "INSERT INTO {table} ({columns}) VALUES {values}{}",
                    self.returning()
                );
                debug!(rows = chunk.len(), params = params.len(), "compiled insert chunk");
                self.write_statement(sql, params)
            })
            .collect();
        Ok(WritePlan {
            statements,
            rows: rows.len(),
        })
    }

    /// `(p1, p2), (p3, p4), ...` with normalized, optionally cast values.
    pub(super) fn values_list(
        &self,
        columns: &[String],
        chunk: &[Vec<Value>],
        params: &mut Params<'_>,
    ) -> String {
        let mut tuples = Vec::with_capacity(chunk.len());
        for row in chunk {
            let cells: Vec<String> = columns
                .iter()
                .zip(row)
                .map(|(column, value)| self.bind_cell(column, value, params))
                .collect();
            tuples.push(format!("({})", cells.join(", ")));
        }
        tuples.join(", ")
    }

    pub(super) fn bind_cell(&self, column: &str, value: &Value, params: &mut Params<'_>) -> String {
        let value = self.normalizer().normalize(column, value);
        if value.is_null() {
            // Inline so the target column decides the type.
            return String::from("NULL");
        }
        let cast = self.type_casts().cast_for(column, &value);
        params.push_cast(SqlValue::from(&value), cast)
    }

    pub(super) fn returning(&self) -> &'static str {
        if self.dialect().supports_returning() {
            " RETURNING *"
        } else {
            ""
        }
    }

    pub(super) fn write_statement(&self, sql: String, params: Params<'_>) -> Statement {
        if self.dialect().supports_returning() {
            Statement::query(sql, params.into_values())
        } else {
            Statement::execute(sql, params.into_values())
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::compiler::{CompilerOptions, QueryCompiler, RowSet};
    use crate::dialect::DialectKind;
    use crate::value::SqlValue;
    use serde_json::{json, Value};

    #[test]
    fn test_single_row_insert_with_casts() {
        let compiler = QueryCompiler::new(DialectKind::Postgres);
        let rows = RowSet::from_json(&json!({
            "user_id": "42",
            "active": "true",
            "meta": {"a": 1},
            "phone": 5551234
        }))
        .unwrap();
        let plan = compiler.insert("users", &rows).unwrap();
        assert_eq!(plan.rows, 1);
        let statement = &plan.statements[0];
        assert_eq!(
            statement.sql,
            r#"INSERT INTO "users" ("user_id", "active", "meta", "phone") VALUES ($1::bigint, $2::boolean, $3::jsonb, $4) RETURNING *"#
        );
        assert_eq!(
            statement.params,
            vec![
                SqlValue::Int(42),
                SqlValue::Bool(true),
                SqlValue::Text(String::from(r#"{"a":1}"#)),
                SqlValue::Text(String::from("5551234")),
            ]
        );
    }

    #[test]
    fn test_nulls_are_inlined() {
        let compiler = QueryCompiler::new(DialectKind::Postgres);
        let rows = RowSet::from_json(&json!([{"a": 1, "b": null}, {"a": 2}])).unwrap();
        let plan = compiler.insert("t", &rows).unwrap();
        assert_eq!(
            plan.statements[0].sql,
            r#"INSERT INTO "t" ("a", "b") VALUES ($1, NULL), ($2, NULL) RETURNING *"#
        );
        assert_eq!(plan.statements[0].params, vec![SqlValue::Int(1), SqlValue::Int(2)]);
    }

    #[test]
    fn test_sqlite_has_no_casts() {
        let compiler = QueryCompiler::new(DialectKind::Sqlite);
        let rows = RowSet::from_json(&json!([{"id": 1, "name": "a"}, {"id": 2, "name": "b"}])).unwrap();
        let plan = compiler.insert("t", &rows).unwrap();
        assert_eq!(
            plan.statements[0].sql,
            r#"INSERT INTO "t" ("id", "name") VALUES (?1, ?2), (?3, ?4) RETURNING *"#
        );
    }

    #[test]
    fn test_insert_has_no_conflict_clause() {
        let compiler = QueryCompiler::new(DialectKind::Sqlite);
        let rows = RowSet::from_json(&json!({"email": "a@b.c"})).unwrap();
        let plan = compiler.insert("t", &rows).unwrap();
        assert_eq!(
            plan.statements[0].sql,
            r#"INSERT INTO "t" ("email") VALUES (?1) RETURNING *"#
        );
    }

    #[test]
    fn test_chunking() {
        let compiler = QueryCompiler::new(DialectKind::Postgres)
            .with_options(CompilerOptions::new().batch_size(2));
        let records: Vec<Value> = (0..5).map(|i| json!({"n": i})).collect();
        let rows = RowSet::from_json(&Value::Array(records)).unwrap();
        let plan = compiler.insert("t", &rows).unwrap();
        assert_eq!(plan.rows, 5);
        let sizes: Vec<usize> = plan.statements.iter().map(|s| s.params.len()).collect();
        assert_eq!(sizes, vec![2, 2, 1]);
        // Placeholders restart in every statement.
        assert!(plan.statements[2].sql.contains("VALUES ($1)"));
    }
}
