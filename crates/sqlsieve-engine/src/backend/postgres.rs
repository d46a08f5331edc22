//! PostgreSQL backend.
//!
//! `sqlx` sends every parameter in binary format with a declared type, so a
//! string bound as `text` never reaches a `date`, `uuid` or `timestamp`
//! column. Before running a statement with text or NULL parameters, the
//! backend prepares it once with those parameters declared `unknown`, reads
//! the types the server inferred and casts the placeholders whose inferred
//! type is not textual. The text is then converted by the server.

use std::borrow::Cow;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use serde_json::{Map, Number, Value};
use sqlx::postgres::types::Oid;
use sqlx::postgres::{PgArguments, PgPool, PgPoolOptions, PgRow, PgTypeInfo};
use sqlx::{Column, Decode, Either, Executor as _, Postgres, Row as _, Statement as _, Type, TypeInfo};
use sqlsieve_core::{DialectKind, QueryError, Result, SqlValue};
use tracing::debug;

use super::{Backend, Row};

/// [`Backend`] over a `sqlx` PostgreSQL pool.
#[derive(Debug, Clone)]
pub struct PgBackend {
    pool: PgPool,
}

impl PgBackend {
    /// Wraps an existing pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Opens a pool.
    pub async fn connect(url: &str, max_connections: u32) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections.max(1))
            .connect(url)
            .await
            .map_err(QueryError::engine)?;
        Ok(Self { pool })
    }

    /// Returns the underlying pool.
    #[must_use]
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Returns `sql` with server-inferred casts on untyped placeholders.
    ///
    /// Falls back to `sql` unchanged when nothing needs a cast or the
    /// server cannot describe the statement; running it then reports the
    /// real error.
    async fn typed_sql<'s>(&self, sql: &'s str, params: &[SqlValue]) -> Cow<'s, str> {
        if !params.iter().any(is_untyped) {
            return Cow::Borrowed(sql);
        }
        let declared: Vec<PgTypeInfo> = params.iter().map(declared_type).collect();
        // The statement cache is keyed by SQL text alone, so the key carries
        // the declared types.
        let signature: Vec<&str> = declared.iter().map(TypeInfo::name).collect();
        let inference_sql = format!("{sql}\n/* sqlsieve: {} */", signature.join(","));
        let statement = match (&self.pool).prepare_with(&inference_sql, &declared).await {
            Ok(statement) => statement,
            Err(err) => {
                debug!(error = %err, "parameter types not inferred, binding as text");
                return Cow::Borrowed(sql);
            }
        };
        let Some(Either::Left(inferred)) = statement.parameters() else {
            return Cow::Borrowed(sql);
        };
        let casts: Vec<Option<String>> = params
            .iter()
            .zip(inferred)
            .map(|(value, ty)| if is_untyped(value) { cast_target(ty) } else { None })
            .collect();
        if casts.iter().all(Option::is_none) {
            return Cow::Borrowed(sql);
        }
        debug!(casts = ?casts, "casting untyped parameters");
        Cow::Owned(cast_placeholders(sql, &casts))
    }
}

#[async_trait]
impl Backend for PgBackend {
    fn dialect(&self) -> DialectKind {
        DialectKind::Postgres
    }

    async fn query(&self, sql: &str, params: &[SqlValue]) -> Result<Vec<Row>> {
        let sql = self.typed_sql(sql, params).await;
        let rows = bind_params(sqlx::query(&sql), params)
            .persistent(false)
            .fetch_all(&self.pool)
            .await
            .map_err(QueryError::engine)?;
        rows.iter().map(decode_row).collect()
    }

    async fn execute(&self, sql: &str, params: &[SqlValue]) -> Result<u64> {
        let sql = self.typed_sql(sql, params).await;
        let result = bind_params(sqlx::query(&sql), params)
            .persistent(false)
            .execute(&self.pool)
            .await
            .map_err(QueryError::engine)?;
        Ok(result.rows_affected())
    }
}

fn bind_params<'q>(
    mut query: sqlx::query::Query<'q, Postgres, PgArguments>,
    params: &'q [SqlValue],
) -> sqlx::query::Query<'q, Postgres, PgArguments> {
    for value in params {
        query = match value {
            // Text and NULL go out as `text`; `typed_sql` adds the casts.
            SqlValue::Null => query.bind(Option::<String>::None),
            SqlValue::Bool(b) => query.bind(*b),
            SqlValue::Int(i) => query.bind(*i),
            SqlValue::Float(f) => query.bind(*f),
            SqlValue::Text(s) => query.bind(s.as_str()),
            SqlValue::Blob(b) => query.bind(b.as_slice()),
        };
    }
    query
}

/// Values whose column type the server should decide.
const fn is_untyped(value: &SqlValue) -> bool {
    matches!(value, SqlValue::Null | SqlValue::Text(_))
}

fn declared_type(value: &SqlValue) -> PgTypeInfo {
    match value {
        SqlValue::Null | SqlValue::Text(_) => PgTypeInfo::with_name("unknown"),
        SqlValue::Bool(_) => <bool as Type<Postgres>>::type_info(),
        SqlValue::Int(_) => <i64 as Type<Postgres>>::type_info(),
        SqlValue::Float(_) => <f64 as Type<Postgres>>::type_info(),
        SqlValue::Blob(_) => <Vec<u8> as Type<Postgres>>::type_info(),
    }
}

/// First OID handed out to user-defined objects.
const FIRST_NORMAL_OID: u32 = 16_384;

/// The cast a text parameter needs to reach `ty`, or `None` for textual types.
fn cast_target(ty: &PgTypeInfo) -> Option<String> {
    let name = ty.name();
    if ["TEXT", "VARCHAR", "BPCHAR", "NAME", "UNKNOWN"]
        .iter()
        .any(|text| name.eq_ignore_ascii_case(text))
    {
        return None;
    }
    match ty.oid() {
        Some(Oid(oid)) if oid < FIRST_NORMAL_OID => Some(name.to_owned()),
        // Extension and user types keep their catalog spelling.
        _ => Some(format!("\"{}\"", name.replace('"', "\"\""))),
    }
}

/// Appends `::type` to each `$n` whose entry in `casts` is set.
///
/// Quoted literals and identifiers are copied verbatim, as are placeholders
/// that already carry a cast.
fn cast_placeholders(sql: &str, casts: &[Option<String>]) -> String {
    let mut out = String::with_capacity(sql.len() + casts.len() * 8);
    let mut chars = sql.char_indices().peekable();
    while let Some((start, c)) = chars.next() {
        match c {
            '\'' | '"' => {
                out.push(c);
                for (_, next) in chars.by_ref() {
                    out.push(next);
                    if next == c {
                        break;
                    }
                }
            }
            '$' if chars.peek().is_some_and(|(_, next)| next.is_ascii_digit()) => {
                let mut end = start + 1;
                while let Some((i, digit)) = chars.next_if(|(_, next)| next.is_ascii_digit()) {
                    end = i + digit.len_utf8();
                }
                let placeholder = &sql[start..end];
                out.push_str(placeholder);
                if sql[end..].starts_with("::") {
                    continue;
                }
                let cast = placeholder[1..]
                    .parse::<usize>()
                    .ok()
                    .and_then(|n| casts.get(n.checked_sub(1)?))
                    .and_then(Option::as_deref);
                if let Some(target) = cast {
                    out.push_str("::");
                    out.push_str(target);
                }
            }
            _ => out.push(c),
        }
    }
    out
}

fn get<'r, T>(row: &'r PgRow, index: usize) -> Result<Option<T>>
where
    T: Decode<'r, Postgres> + Type<Postgres>,
{
    row.try_get::<Option<T>, _>(index).map_err(QueryError::engine)
}

fn decode_row(row: &PgRow) -> Result<Row> {
    let mut decoded = Map::with_capacity(row.len());
    for column in row.columns() {
        let index = column.ordinal();
        let type_name = column.type_info().name();
        let value = match type_name {
            "BOOL" => get::<bool>(row, index)?.map(Value::Bool),
            "INT2" => get::<i16>(row, index)?.map(Value::from),
            "INT4" => get::<i32>(row, index)?.map(Value::from),
            "INT8" => get::<i64>(row, index)?.map(Value::from),
            "FLOAT4" => get::<f32>(row, index)?.and_then(|f| Number::from_f64(f64::from(f)).map(Value::Number)),
            "FLOAT8" => get::<f64>(row, index)?.and_then(|f| Number::from_f64(f).map(Value::Number)),
            "TEXT" | "VARCHAR" | "BPCHAR" | "NAME" => get::<String>(row, index)?.map(Value::String),
            "JSON" | "JSONB" => get::<Value>(row, index)?,
            "BYTEA" => get::<Vec<u8>>(row, index)?.map(Value::from),
            "TIMESTAMPTZ" => get::<DateTime<Utc>>(row, index)?.map(|t| Value::String(t.to_rfc3339())),
            "TIMESTAMP" => get::<NaiveDateTime>(row, index)?
                .map(|t| Value::String(t.format("%Y-%m-%dT%H:%M:%S%.f").to_string())),
            "DATE" => get::<NaiveDate>(row, index)?.map(|d| Value::String(d.to_string())),
            "TIME" => get::<NaiveTime>(row, index)?.map(|t| Value::String(t.to_string())),
            other => {
                debug!(column = column.name(), column_type = other, "undecodable column type, returning null");
                None
            }
        };
        decoded.insert(column.name().to_owned(), value.unwrap_or(Value::Null));
    }
    Ok(decoded)
}
