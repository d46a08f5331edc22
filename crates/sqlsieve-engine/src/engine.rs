//! The read/write/delete engine.

use futures::future::try_join_all;
use serde_json::Value;
use sqlsieve_core::{
    ConstraintSpec, Filter, Page, QueryCompiler, Result, RowSet, Sort, SqlValue, Statement,
    WritePlan,
};
use tracing::{debug, info, warn};

use crate::backend::{Backend, Row};
use crate::config::EngineConfig;
use crate::result::{decode_json_text, extract_id, ReadResult, RemoveResult, WriteResult};

/// Compiles requests with a [`QueryCompiler`] and runs them on a [`Backend`].
#[derive(Debug, Clone)]
pub struct Engine<B> {
    backend: B,
    compiler: QueryCompiler,
    config: EngineConfig,
}

impl<B: Backend> Engine<B> {
    /// Creates an engine compiling for the backend's dialect.
    pub fn new(backend: B, config: EngineConfig) -> Self {
        let compiler = QueryCompiler::new(backend.dialect()).with_options(config.compiler.clone());
        Self {
            backend,
            compiler,
            config,
        }
    }

    /// Replaces the compiler, e.g. to register extra type casts.
    #[must_use]
    pub fn with_compiler(mut self, compiler: QueryCompiler) -> Self {
        self.compiler = compiler;
        self
    }

    /// Returns the backend.
    pub const fn backend(&self) -> &B {
        &self.backend
    }

    /// Returns the compiler.
    pub const fn compiler(&self) -> &QueryCompiler {
        &self.compiler
    }

    /// Returns the configuration.
    pub const fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Every matching row, plus the total count from a separate COUNT.
    pub async fn get(
        &self,
        table: &str,
        filter: &Filter,
        sort: &Sort,
        soft_delete: Option<&str>,
    ) -> Result<ReadResult> {
        let statement = self.compiler.select(table, filter, sort, soft_delete, None)?;
        let data = self.read(&statement).await?;
        let count = self.count(table, filter, soft_delete).await?;
        Ok(ReadResult { data, count })
    }

    /// One page of matching rows, plus the total count over all pages.
    pub async fn list(
        &self,
        table: &str,
        filter: &Filter,
        sort: &Sort,
        soft_delete: Option<&str>,
        page: Page,
    ) -> Result<ReadResult> {
        let statement = self
            .compiler
            .select(table, filter, sort, soft_delete, Some(page))?;
        let data = self.read(&statement).await?;
        let count = self.count(table, filter, soft_delete).await?;
        Ok(ReadResult { data, count })
    }

    /// Number of matching rows.
    ///
    /// Invalid filters are errors; a failing or unreadable COUNT yields 0.
    pub async fn count(&self, table: &str, filter: &Filter, soft_delete: Option<&str>) -> Result<u64> {
        let statement = self.compiler.count(table, filter, soft_delete)?;
        match self.backend.query(&statement.sql, &statement.params).await {
            Ok(rows) => Ok(rows
                .first()
                .and_then(|row| row.get("number"))
                .and_then(count_value)
                .unwrap_or(0)),
            Err(err) => {
                warn!(table, error = %err, "count failed, reporting 0");
                Ok(0)
            }
        }
    }

    /// Deletes (or soft-deletes) matching rows. Refuses filters without
    /// bound values.
    pub async fn remove(&self, table: &str, filter: &Filter, soft_delete: Option<&str>) -> Result<RemoveResult> {
        let statement = self.compiler.delete(table, filter, soft_delete)?;
        let rows = self.backend.execute(&statement.sql, &statement.params).await?;
        info!(table, rows, soft = soft_delete.is_some(), "removed");
        Ok(RemoveResult::removed(table, rows))
    }

    /// Inserts one record or an array of records.
    ///
    /// Constraints are accepted for symmetry with [`Engine::upsert`] but do
    /// not change the statement: a duplicate fails with the database's
    /// unique-violation error.
    pub async fn insert(&self, table: &str, data: &Value, constraints: &ConstraintSpec) -> Result<WriteResult> {
        let rows = RowSet::from_json(data)?;
        if !constraints.is_empty() {
            debug!(table, "insert ignores constraints, use upsert to resolve conflicts");
        }
        let plan = self.compiler.insert(table, &rows)?;
        self.write(table, plan).await
    }

    /// Inserts or updates one record or an array of records.
    pub async fn upsert(&self, table: &str, data: &Value, constraints: &ConstraintSpec) -> Result<WriteResult> {
        let rows = RowSet::from_json(data)?;
        let plan = self.compiler.upsert(table, &rows, constraints)?;
        self.write(table, plan).await
    }

    /// Runs caller-supplied SQL with positional parameters.
    pub async fn query(&self, sql: &str, params: &[Value]) -> Result<Vec<Row>> {
        let statement = self
            .compiler
            .raw(sql, params.iter().map(SqlValue::from).collect());
        self.read(&statement).await
    }

    async fn read(&self, statement: &Statement) -> Result<Vec<Row>> {
        let mut rows = self.backend.query(&statement.sql, &statement.params).await?;
        debug!(rows = rows.len(), "fetched");
        if self.config.parse_json_text {
            decode_json_text(&mut rows);
        }
        Ok(rows)
    }

    async fn write(&self, table: &str, plan: WritePlan) -> Result<WriteResult> {
        let chunks = plan.statements.len();
        let results = if self.config.sequential_chunks {
            let mut results = Vec::with_capacity(chunks);
            for statement in &plan.statements {
                results.push(self.run_write(statement).await?);
            }
            results
        } else {
            try_join_all(plan.statements.iter().map(|statement| self.run_write(statement))).await?
        };
        let id = if plan.rows == 1 {
            let id = results
                .first()
                .and_then(|rows| rows.first())
                .and_then(extract_id);
            if id.is_none() {
                let returned: usize = results.iter().map(Vec::len).sum();
                debug!(table, returned, "single-record write reported no id");
            }
            id
        } else {
            None
        };
        info!(table, rows = plan.rows, chunks, "saved");
        Ok(WriteResult::saved(table, plan.rows, id))
    }

    async fn run_write(&self, statement: &Statement) -> Result<Vec<Row>> {
        if statement.returns_rows {
            self.backend.query(&statement.sql, &statement.params).await
        } else {
            self.backend
                .execute(&statement.sql, &statement.params)
                .await
                .map(|_| Vec::new())
        }
    }
}

fn count_value(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}
