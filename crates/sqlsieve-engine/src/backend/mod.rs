//! Database backends.
//!
//! The engine only needs two primitives from a database: run a statement and
//! collect its rows, or run a statement and report how many rows it touched.
//! [`Backend`] is that seam; [`PgBackend`] and [`SqliteBackend`] implement it
//! over `sqlx` pools.

mod postgres;
mod sqlite;

use async_trait::async_trait;
use serde_json::{Map, Value};
use sqlsieve_core::{DialectKind, QueryError, Result, SqlValue};
use tracing::info;

pub use postgres::PgBackend;
pub use sqlite::SqliteBackend;

/// One result row, keyed by column name in select-list order.
pub type Row = Map<String, Value>;

/// An opaque statement executor.
#[async_trait]
pub trait Backend: Send + Sync {
    /// The dialect statements must be compiled for.
    fn dialect(&self) -> DialectKind;

    /// Runs a statement and returns its rows.
    async fn query(&self, sql: &str, params: &[SqlValue]) -> Result<Vec<Row>>;

    /// Runs a statement and returns the number of affected rows.
    async fn execute(&self, sql: &str, params: &[SqlValue]) -> Result<u64>;
}

/// A backend chosen at runtime from a connection URL.
#[derive(Debug, Clone)]
pub enum AnyBackend {
    /// PostgreSQL pool.
    Postgres(PgBackend),
    /// SQLite pool.
    Sqlite(SqliteBackend),
}

#[async_trait]
impl Backend for AnyBackend {
    fn dialect(&self) -> DialectKind {
        match self {
            Self::Postgres(backend) => backend.dialect(),
            Self::Sqlite(backend) => backend.dialect(),
        }
    }

    async fn query(&self, sql: &str, params: &[SqlValue]) -> Result<Vec<Row>> {
        match self {
            Self::Postgres(backend) => backend.query(sql, params).await,
            Self::Sqlite(backend) => backend.query(sql, params).await,
        }
    }

    async fn execute(&self, sql: &str, params: &[SqlValue]) -> Result<u64> {
        match self {
            Self::Postgres(backend) => backend.execute(sql, params).await,
            Self::Sqlite(backend) => backend.execute(sql, params).await,
        }
    }
}

/// Opens a pool for `postgres://`, `postgresql://` or `sqlite:` URLs.
pub async fn connect(url: &str, max_connections: u32) -> Result<AnyBackend> {
    let kind = DialectKind::from_url(url).ok_or_else(|| {
        QueryError::Config(format!(
            "unsupported database URL {:?}: expected postgres:// or sqlite:",
            redact(url)
        ))
    })?;
    info!(dialect = %kind, url = %redact(url), "connecting");
    match kind {
        DialectKind::Postgres => PgBackend::connect(url, max_connections)
            .await
            .map(AnyBackend::Postgres),
        DialectKind::Sqlite => SqliteBackend::connect(url, max_connections)
            .await
            .map(AnyBackend::Sqlite),
    }
}

/// Hides the password of a URL for logging.
fn redact(url: &str) -> String {
    let Some((scheme, rest)) = url.split_once("://") else {
        return url.to_owned();
    };
    match rest.split_once('@') {
        Some((credentials, host)) => {
            let user = credentials.split(':').next().unwrap_or_default();
            format!("{scheme}://{user}:***@{host}")
        }
        None => url.to_owned(),
    }
}
