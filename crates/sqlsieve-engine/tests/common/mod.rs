#![allow(dead_code)]

use std::io;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::{json, Value};
use sqlsieve_core::{DialectKind, QueryError, Result, SqlValue};
use sqlsieve_engine::{Backend, Engine, EngineConfig, Row, SqliteBackend};

/// Records every statement and answers with canned rows.
#[derive(Debug)]
pub struct RecordingBackend {
    pub dialect: DialectKind,
    pub statements: Mutex<Vec<(String, Vec<SqlValue>)>>,
    /// Returned by every `query`; one `{"id": n}` row per VALUES tuple when `None`.
    pub rows: Option<Vec<Row>>,
    /// Fail statements whose SQL contains this text.
    pub fail_on: Option<String>,
}

impl RecordingBackend {
    pub fn new(dialect: DialectKind) -> Self {
        Self {
            dialect,
            statements: Mutex::new(Vec::new()),
            rows: None,
            fail_on: None,
        }
    }

    pub fn returning(mut self, rows: Vec<Value>) -> Self {
        self.rows = Some(
            rows.into_iter()
                .map(|row| row.as_object().cloned().unwrap())
                .collect(),
        );
        self
    }

    pub fn failing_on(mut self, needle: &str) -> Self {
        self.fail_on = Some(needle.to_owned());
        self
    }

    pub fn statements(&self) -> Vec<(String, Vec<SqlValue>)> {
        self.statements.lock().unwrap().clone()
    }

    fn record(&self, sql: &str, params: &[SqlValue]) -> Result<()> {
        self.statements
            .lock()
            .unwrap()
            .push((sql.to_owned(), params.to_vec()));
        match &self.fail_on {
            Some(needle) if sql.contains(needle.as_str()) => {
                Err(QueryError::engine_message(format!("boom: {needle}")))
            }
            _ => Ok(()),
        }
    }
}

#[async_trait]
impl Backend for RecordingBackend {
    fn dialect(&self) -> DialectKind {
        self.dialect
    }

    async fn query(&self, sql: &str, params: &[SqlValue]) -> Result<Vec<Row>> {
        self.record(sql, params)?;
        if let Some(rows) = &self.rows {
            return Ok(rows.clone());
        }
        let tuples = sql.matches("), (").count() + 1;
        Ok((0..tuples)
            .map(|i| json!({"id": i + 1}).as_object().cloned().unwrap())
            .collect())
    }

    async fn execute(&self, sql: &str, params: &[SqlValue]) -> Result<u64> {
        self.record(sql, params)?;
        Ok(1)
    }
}

pub async fn sqlite_engine(schema: &str) -> Engine<SqliteBackend> {
    sqlite_engine_with(schema, EngineConfig::default()).await
}

pub async fn sqlite_engine_with(schema: &str, config: EngineConfig) -> Engine<SqliteBackend> {
    let backend = SqliteBackend::connect("sqlite::memory:", 1)
        .await
        .expect("Failed to create in-memory SQLite pool");
    for statement in schema.split(';').map(str::trim).filter(|s| !s.is_empty()) {
        sqlx::query(statement)
            .execute(backend.pool())
            .await
            .unwrap_or_else(|e| panic!("Failed to run {statement}: {e}"));
    }
    Engine::new(backend, config)
}

pub fn filter(json: Value) -> sqlsieve_core::Filter {
    sqlsieve_core::Filter::from_json(&json).unwrap()
}

pub fn constraints(json: Value) -> sqlsieve_core::ConstraintSpec {
    sqlsieve_core::ConstraintSpec::from_json(&json).unwrap()
}

/// Shared sink for formatted log lines.
#[derive(Debug, Clone, Default)]
pub struct LogBuffer(Arc<Mutex<Vec<u8>>>);

impl io::Write for LogBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Runs `f` with a debug-level subscriber and returns its output alongside
/// the captured logs.
pub fn with_captured_logs<T>(f: impl FnOnce() -> T) -> (T, String) {
    let logs = LogBuffer::default();
    let writer = logs.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_ansi(false)
        .with_writer(move || writer.clone())
        .finish();
    let output = tracing::subscriber::with_default(subscriber, f);
    let text = String::from_utf8(logs.0.lock().unwrap().clone()).unwrap();
    (output, text)
}
