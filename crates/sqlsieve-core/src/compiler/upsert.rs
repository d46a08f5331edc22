//! Constraint-aware upserts.
//!
//! The statement shape depends on how many unique constraints are declared
//! and on what the dialect can express:
//!
//! | constraints | records | dialect                    | shape                         |
//! |-------------|---------|----------------------------|-------------------------------|
//! | 0           | any     | any                        | plain INSERT                  |
//! | 1           | any     | any                        | `ON CONFLICT (c) DO UPDATE`   |
//! | 2+          | any     | chained conflict clauses   | one `ON CONFLICT` per group   |
//! | 2+          | 1       | writable CTEs              | UPDATE-then-INSERT merge      |
//! | 2+          | 2+      | writable CTEs              | first constraint only         |

use serde_json::{Map, Value};
use tracing::{debug, warn};

use super::{QueryCompiler, RowSet, WritePlan};
use crate::constraint::{ConstraintSpec, ParsedConstraints};
use crate::dialect::Dialect;
use crate::error::Result;
use crate::ident;
use crate::params::Params;
use crate::value::normalize::looks_like_json_document;
use crate::value::SqlValue;

/// How one chunk resolves conflicts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpsertStrategy {
    /// No constraints: plain INSERT.
    Plain,
    /// A single `ON CONFLICT (columns) DO UPDATE` target.
    OnConflict(Vec<String>),
    /// Writable-CTE merge that matches existing rows on any of the groups.
    Merge(Vec<Vec<String>>),
    /// One `ON CONFLICT (group) DO UPDATE` clause per group.
    ChainedConflict(Vec<Vec<String>>),
}

impl UpsertStrategy {
    /// Picks the strategy for a chunk of `rows` records with `columns`.
    #[must_use]
    pub fn select(
        dialect: &dyn Dialect,
        constraints: &ParsedConstraints,
        rows: usize,
        columns: &[String],
    ) -> Self {
        let Some(first) = constraints.first_target() else {
            return Self::Plain;
        };
        if constraints.total() == 1 {
            return Self::OnConflict(first);
        }
        if dialect.supports_chained_conflict_clauses() {
            return Self::ChainedConflict(constraints.groups());
        }
        if rows == 1 && dialect.supports_writable_cte() {
            let covered: Vec<Vec<String>> = constraints
                .groups()
                .into_iter()
                .filter(|group| group.iter().all(|column| columns.contains(column)))
                .collect();
            if !covered.is_empty() {
                return Self::Merge(covered);
            }
        }
        warn!(
            dialect = dialect.name(),
            rows,
            constraints = constraints.total(),
            conflict_target = ?first,
            "multi-constraint upsert falls back to the first constraint"
        );
        Self::OnConflict(first)
    }
}

impl QueryCompiler {
    /// Insert-or-update, one statement per chunk.
    ///
    /// On conflict every non-constraint column is overwritten with the
    /// incoming value. When every column is a constraint column, the first
    /// column is set to itself so the UPDATE clause stays valid.
    pub fn upsert(&self, table: &str, rows: &RowSet, constraints: &ConstraintSpec) -> Result<WritePlan> {
        let dialect = self.dialect();
        let table = self.table(table)?;
        let parsed = constraints.parse();
        let update_columns = update_columns(rows.columns(), &parsed);
        let statements = rows
            .rows()
            .chunks(self.chunk_size(rows.columns().len()))
            .map(|chunk| {
                let strategy = UpsertStrategy::select(dialect, &parsed, chunk.len(), rows.columns());
                let mut params = Params::new(dialect);
                let sql = match &strategy {
                    UpsertStrategy::Merge(groups) => {
                        self.merge_sql(&table, rows.columns(), chunk, groups, &update_columns, &mut params)?
                    }
                    _ => {
                        let columns = ident::quote_list(dialect, rows.columns())?;
                        let values = self.values_list(rows.columns(), chunk, &mut params);
                        let conflict = conflict_clauses(dialect, &strategy, &update_columns)?;
                        format!(
                            "INSERT INTO {table} ({columns}) VALUES {values}{conflict}{}",
                            self.returning()
                        )
                    }
                };
                debug!(
                    rows = chunk.len(),
                    params = params.len(),
                    strategy = ?strategy,
                    "compiled upsert chunk"
                );
                Ok(self.write_statement(sql, params))
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(WritePlan {
            statements,
            rows: rows.len(),
        })
    }

    /// Single-record merge over writable CTEs.
    ///
    /// Existing rows matching any constraint group are updated; when none
    /// matched, the record is inserted with the first group as a conflict
    /// target. `source_data` is populated from the record as one JSON
    /// parameter against the table's row type, so every column (NULLs
    /// included) carries the target column's type.
    fn merge_sql(
        &self,
        table: &str,
        columns: &[String],
        chunk: &[Vec<Value>],
        groups: &[Vec<String>],
        update_columns: &[String],
        params: &mut Params<'_>,
    ) -> Result<String> {
        let dialect = self.dialect();
        let column_list = ident::quote_list(dialect, columns)?;
        let record = chunk.first().map(|row| self.source_record(columns, row)).unwrap_or_default();
        let source = params.push_cast(SqlValue::Text(Value::Object(record).to_string()), Some("json"));
        let set_from_source = update_columns
            .iter()
            .map(|column| {
                let column = ident::quote(dialect, column)?;
                Ok(format!("{column} = source_data.{column}"))
            })
            .collect::<Result<Vec<_>>>()?
            .join(", ");
        let matches = groups
            .iter()
            .map(|group| {
                let terms = group
                    .iter()
                    .map(|column| {
                        let column = ident::quote(dialect, column)?;
                        Ok(format!("target.{column} = source_data.{column}"))
                    })
                    .collect::<Result<Vec<_>>>()?;
                Ok(format!("({})", terms.join(" AND ")))
            })
            .collect::<Result<Vec<_>>>()?
            .join(" OR ");
        let fallback = UpsertStrategy::OnConflict(groups.first().cloned().unwrap_or_default());
        let conflict = conflict_clauses(dialect, &fallback, update_columns)?;
        Ok(format!(
            "WITH source_data AS (SELECT {column_list} FROM json_populate_record(NULL::{table}, {source})), \
             updated AS (UPDATE {table} AS target SET {set_from_source} FROM source_data WHERE {matches} RETURNING target.*), \
             inserted AS (INSERT INTO {table} ({column_list}) SELECT {column_list} FROM source_data \
             WHERE NOT EXISTS (SELECT 1 FROM updated){conflict} RETURNING *) \
             SELECT * FROM updated UNION ALL SELECT * FROM inserted"
        ))
    }

    /// The normalized record as a JSON object keyed by column.
    ///
    /// JSON documents sent as text are embedded as documents so that
    /// `json`/`jsonb` columns receive the structure, not a string.
    fn source_record(&self, columns: &[String], row: &[Value]) -> Map<String, Value> {
        columns
            .iter()
            .zip(row)
            .map(|(column, value)| {
                let value = match self.normalizer().normalize(column, value) {
                    Value::String(s) if looks_like_json_document(&s) => {
                        serde_json::from_str(&s).unwrap_or(Value::String(s))
                    }
                    other => other,
                };
                (column.clone(), value)
            })
            .collect()
    }
}

/// Insert columns minus every constraint column, or the first column.
fn update_columns(columns: &[String], constraints: &ParsedConstraints) -> Vec<String> {
    let excluded = constraints.flatten();
    let remaining: Vec<String> = columns
        .iter()
        .filter(|column| !excluded.contains(column))
        .cloned()
        .collect();
    if remaining.is_empty() {
        columns.iter().take(1).cloned().collect()
    } else {
        remaining
    }
}

fn conflict_clauses(dialect: &dyn Dialect, strategy: &UpsertStrategy, update_columns: &[String]) -> Result<String> {
    let targets: &[Vec<String>] = match strategy {
        UpsertStrategy::Plain | UpsertStrategy::Merge(_) => return Ok(String::new()),
        UpsertStrategy::OnConflict(target) => std::slice::from_ref(target),
        UpsertStrategy::ChainedConflict(groups) => groups,
    };
    let set = update_columns
        .iter()
        .map(|column| {
            let column = ident::quote(dialect, column)?;
            Ok(format!("{column} = EXCLUDED.{column}"))
        })
        .collect::<Result<Vec<_>>>()?
        .join(", ");
    let mut sql = String::new();
    for target in targets {
        let target = ident::quote_list(dialect, target)?;
        sql.push_str(&format!(" ON CONFLICT ({target}) DO UPDATE SET {set}"));
    }
    Ok(sql)
}
