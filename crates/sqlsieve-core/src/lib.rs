//! # sqlsieve-core
//!
//! A dialect-aware compiler from data-driven filter, sort and write requests
//! to parameterized SQL.
//!
//! This crate provides:
//! - A filter model (OR of AND-groups) and its WHERE-clause compiler
//! - `field` / `-field` sort compilation
//! - Constraint-aware insert/upsert statements with chunking
//! - Column-aware normalization of loosely-typed JSON input
//! - Identifier quoting and positional parameter bookkeeping per dialect
//!
//! Nothing here performs I/O; `sqlsieve-engine` executes the statements.
//!
//! ## Filters
//!
//! ```rust
//! use serde_json::json;
//! use sqlsieve_core::{DialectKind, Filter, QueryCompiler, Sort};
//!
//! // (age > 18 AND status = 'active') OR role in ('admin', 'owner')
//! let filter = Filter::from_json(&json!([
//!     [["age", ">", 18], ["status", "=", "active"]],
//!     [["role", "in", ["admin", "owner"]]]
//! ]))
//! .unwrap();
//!
//! let compiler = QueryCompiler::new(DialectKind::Sqlite);
//! let statement = compiler
//!     .count("users", &filter, Some("deleted"))
//!     .unwrap();
//! assert_eq!(statement.params.len(), 6);
//! ```
//!
//! ## SQL Injection Prevention
//!
//! Table and column names are always quoted and values are always bound:
//!
//! ```rust
//! use serde_json::json;
//! use sqlsieve_core::{DialectKind, Filter, QueryCompiler, Sort, SqlValue};
//!
//! let compiler = QueryCompiler::new(DialectKind::Postgres);
//! let filter = Filter::from_json(&json!([[["name", "=", "'; DROP TABLE users; --"]]])).unwrap();
//! let statement = compiler
//!     .select("users", &filter, &Sort::none(), None, None)
//!     .unwrap();
//!
//! assert_eq!(statement.sql, r#"SELECT * FROM "users" WHERE (("name" = $1))"#);
//! assert_eq!(
//!     statement.params,
//!     vec![SqlValue::Text(String::from("'; DROP TABLE users; --"))]
//! );
//! ```

pub mod compiler;
pub mod constraint;
pub mod dialect;
pub mod error;
pub mod filter;
pub mod ident;
pub mod params;
pub mod sort;
pub mod value;

pub use compiler::{
    CompilerOptions, Page, QueryCompiler, RowSet, Statement, UpsertStrategy, WritePlan,
    DEFAULT_BATCH_SIZE,
};
pub use constraint::{Constraint, ConstraintSpec, ParsedConstraints};
pub use dialect::{Dialect, DialectKind, PostgresDialect, SqliteDialect};
pub use error::{QueryError, Result};
pub use filter::{Condition, Filter, FilterValue, Operator};
pub use sort::{OrderDirection, Sort, SortKey};
pub use value::{Normalizer, SqlValue, TypeCastRegistry, TypeCastRule, ValueKind};
