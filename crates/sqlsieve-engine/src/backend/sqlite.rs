//! SQLite backend.

use std::str::FromStr;

use async_trait::async_trait;
use serde_json::{Map, Number, Value};
use sqlx::sqlite::{SqliteArguments, SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::{Column, Row as _, Sqlite, TypeInfo, ValueRef};
use sqlsieve_core::{DialectKind, QueryError, Result, SqlValue};
use tracing::debug;

use super::{Backend, Row};

/// [`Backend`] over a `sqlx` SQLite pool.
#[derive(Debug, Clone)]
pub struct SqliteBackend {
    pool: SqlitePool,
}

impl SqliteBackend {
    /// Wraps an existing pool.
    #[must_use]
    pub const fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Opens a pool, creating the database file if needed.
    ///
    /// In-memory databases get a single connection so every statement sees
    /// the same database.
    pub async fn connect(url: &str, max_connections: u32) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(url)
            .map_err(QueryError::engine)?
            .create_if_missing(true);
        let max_connections = if is_memory_url(url) { 1 } else { max_connections.max(1) };
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(options)
            .await
            .map_err(QueryError::engine)?;
        Ok(Self { pool })
    }

    /// Returns the underlying pool.
    #[must_use]
    pub const fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

#[async_trait]
impl Backend for SqliteBackend {
    fn dialect(&self) -> DialectKind {
        DialectKind::Sqlite
    }

    async fn query(&self, sql: &str, params: &[SqlValue]) -> Result<Vec<Row>> {
        let rows = bind_params(sqlx::query(sql), params)
            .fetch_all(&self.pool)
            .await
            .map_err(QueryError::engine)?;
        rows.iter().map(decode_row).collect()
    }

    async fn execute(&self, sql: &str, params: &[SqlValue]) -> Result<u64> {
        let result = bind_params(sqlx::query(sql), params)
            .execute(&self.pool)
            .await
            .map_err(QueryError::engine)?;
        Ok(result.rows_affected())
    }
}

fn is_memory_url(url: &str) -> bool {
    url.contains(":memory:") || url.contains("mode=memory")
}

fn bind_params<'q>(
    mut query: sqlx::query::Query<'q, Sqlite, SqliteArguments<'q>>,
    params: &'q [SqlValue],
) -> sqlx::query::Query<'q, Sqlite, SqliteArguments<'q>> {
    for value in params {
        query = match value {
            SqlValue::Null => query.bind(Option::<i64>::None),
            SqlValue::Bool(b) => query.bind(*b),
            SqlValue::Int(i) => query.bind(*i),
            SqlValue::Float(f) => query.bind(*f),
            SqlValue::Text(s) => query.bind(s.as_str()),
            SqlValue::Blob(b) => query.bind(b.as_slice()),
        };
    }
    query
}

/// Decodes by the storage class of each value, not the declared column type.
fn decode_row(row: &SqliteRow) -> Result<Row> {
    let mut decoded = Map::with_capacity(row.len());
    for column in row.columns() {
        let index = column.ordinal();
        let raw = row.try_get_raw(index).map_err(QueryError::engine)?;
        let value = if raw.is_null() {
            Value::Null
        } else {
            let storage = raw.type_info().name().to_owned();
            match storage.as_str() {
                "INTEGER" => Value::from(row.try_get_unchecked::<i64, _>(index).map_err(QueryError::engine)?),
                "REAL" => Number::from_f64(row.try_get_unchecked::<f64, _>(index).map_err(QueryError::engine)?)
                    .map_or(Value::Null, Value::Number),
                "TEXT" => Value::String(row.try_get_unchecked::<String, _>(index).map_err(QueryError::engine)?),
                "BLOB" => Value::from(row.try_get_unchecked::<Vec<u8>, _>(index).map_err(QueryError::engine)?),
                other => {
                    debug!(column = column.name(), storage = other, "undecodable value, returning null");
                    Value::Null
                }
            }
        };
        decoded.insert(column.name().to_owned(), value);
    }
    Ok(decoded)
}
