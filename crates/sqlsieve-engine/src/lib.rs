//! # sqlsieve-engine
//!
//! Executes statements compiled by `sqlsieve-core` on PostgreSQL or SQLite
//! through `sqlx`, and shapes the results:
//!
//! - `get` / `list` return `{data, count}`, the count coming from a separate
//!   `COUNT` so it ignores paging,
//! - `insert` / `upsert` return `{rows, message, type, id?}`,
//! - `remove` returns `{rows, message}` and refuses unfiltered deletes.
//!
//! ```no_run
//! use serde_json::json;
//! use sqlsieve_core::{ConstraintSpec, Filter, Page, Sort};
//! use sqlsieve_engine::{connect, Engine, EngineConfig};
//!
//! # async fn run() -> sqlsieve_core::Result<()> {
//! let config = EngineConfig::from_env()?;
//! let backend = connect("postgres://app@localhost/app", config.max_connections).await?;
//! let engine = Engine::new(backend, config);
//!
//! engine
//!     .upsert("user", &json!({"email": "a@x.io", "name": "A"}), &ConstraintSpec::from_json(&json!(["email"]))?)
//!     .await?;
//!
//! let page = engine
//!     .list("user", &Filter::all(), &Sort::parse(&["-created_at"]), Some("deleted"), Page::new(0, 30))
//!     .await?;
//! println!("{} of {}", page.data.len(), page.count);
//! # Ok(())
//! # }
//! ```

pub mod backend;
pub mod config;
pub mod engine;
pub mod result;

pub use backend::{connect, AnyBackend, Backend, PgBackend, Row, SqliteBackend};
pub use config::EngineConfig;
pub use engine::Engine;
pub use result::{ReadResult, RemoveResult, WriteResult, WriteStatus};
