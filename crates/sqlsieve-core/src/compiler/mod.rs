//! Statement assembly.
//!
//! [`QueryCompiler`] turns filters, sorts, records and constraint specs into
//! parameterized [`Statement`]s for one dialect. It performs no I/O.

mod delete;
mod insert;
mod rows;
mod select;
mod upsert;

use std::fmt;

use crate::dialect::{Dialect, DialectKind};
use crate::error::Result;
use crate::filter::{compile_where, Filter, PredicateOptions};
use crate::ident::TableName;
use crate::params::Params;
use crate::value::{Normalizer, SqlValue, TypeCastRegistry};

pub use rows::RowSet;
pub use upsert::UpsertStrategy;

/// Default number of records per INSERT statement.
pub const DEFAULT_BATCH_SIZE: usize = 1000;

/// Compiler configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompilerOptions {
    /// Schema applied to table names that carry none.
    pub schema: Option<String>,
    /// Wrap `like` / `not like` values as `%value%`.
    pub auto_wildcard: bool,
    /// Run filter values through the [`Normalizer`].
    pub normalize_filter_values: bool,
    /// Records per INSERT statement, before the dialect's parameter ceiling.
    pub batch_size: usize,
}

impl Default for CompilerOptions {
    fn default() -> Self {
        Self {
            schema: None,
            auto_wildcard: false,
            normalize_filter_values: false,
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }
}

impl CompilerOptions {
    /// Creates the default options.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the default schema.
    #[must_use]
    pub fn schema(mut self, schema: impl Into<String>) -> Self {
        self.schema = Some(schema.into());
        self
    }

    /// Enables or disables `like` wildcard wrapping.
    #[must_use]
    pub const fn auto_wildcard(mut self, enabled: bool) -> Self {
        self.auto_wildcard = enabled;
        self
    }

    /// Enables or disables filter value normalization.
    #[must_use]
    pub const fn normalize_filter_values(mut self, enabled: bool) -> Self {
        self.normalize_filter_values = enabled;
        self
    }

    /// Sets the batch size. Zero is treated as one.
    #[must_use]
    pub fn batch_size(mut self, size: usize) -> Self {
        self.batch_size = size.max(1);
        self
    }
}

/// Page selection for `list`. `page` is zero-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    /// Zero-based page number.
    pub page: u64,
    /// Rows per page.
    pub limit: u64,
}

impl Page {
    /// Default rows per page.
    pub const DEFAULT_LIMIT: u64 = 30;

    /// Creates a page selection.
    #[must_use]
    pub const fn new(page: u64, limit: u64) -> Self {
        Self { page, limit }
    }

    /// Rows skipped before this page.
    #[must_use]
    pub const fn offset(&self) -> u64 {
        self.page.saturating_mul(self.limit)
    }
}

impl Default for Page {
    fn default() -> Self {
        Self::new(0, Self::DEFAULT_LIMIT)
    }
}

/// A compiled statement and its bound values, in placeholder order.
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    /// SQL text.
    pub sql: String,
    /// Values for `$1..$n` / `?1..?n`.
    pub params: Vec<SqlValue>,
    /// Whether the statement produces a result set.
    pub returns_rows: bool,
}

impl Statement {
    /// A statement that yields rows.
    #[must_use]
    pub fn query(sql: impl Into<String>, params: Vec<SqlValue>) -> Self {
        Self {
            sql: sql.into(),
            params,
            returns_rows: true,
        }
    }

    /// A statement that only reports affected rows.
    #[must_use]
    pub fn execute(sql: impl Into<String>, params: Vec<SqlValue>) -> Self {
        Self {
            sql: sql.into(),
            params,
            returns_rows: false,
        }
    }
}

impl fmt::Display for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.sql)?;
        for (i, value) in self.params.iter().enumerate() {
            write!(f, "\n  -- {} = {}", i + 1, value.to_sql_inline())?;
        }
        Ok(())
    }
}

/// The statements of one insert/upsert call.
#[derive(Debug, Clone, PartialEq)]
pub struct WritePlan {
    /// One statement per chunk, in record order.
    pub statements: Vec<Statement>,
    /// Number of submitted records.
    pub rows: usize,
}

/// Compiles operations into statements for one dialect.
#[derive(Debug, Clone)]
pub struct QueryCompiler {
    kind: DialectKind,
    casts: TypeCastRegistry,
    normalizer: Normalizer,
    options: CompilerOptions,
}

impl QueryCompiler {
    /// Creates a compiler with the dialect's default type casts.
    #[must_use]
    pub fn new(kind: DialectKind) -> Self {
        let casts = if kind.dialect().supports_type_casts() {
            TypeCastRegistry::postgres()
        } else {
            TypeCastRegistry::empty()
        };
        Self {
            kind,
            casts,
            normalizer: Normalizer::default(),
            options: CompilerOptions::default(),
        }
    }

    /// Replaces the options.
    #[must_use]
    pub fn with_options(mut self, options: CompilerOptions) -> Self {
        self.options = options;
        self
    }

    /// Replaces the type-cast registry.
    #[must_use]
    pub fn with_type_casts(mut self, casts: TypeCastRegistry) -> Self {
        self.casts = casts;
        self
    }

    /// Replaces the value normalizer.
    #[must_use]
    pub fn with_normalizer(mut self, normalizer: Normalizer) -> Self {
        self.normalizer = normalizer;
        self
    }

    /// Returns the dialect kind.
    #[must_use]
    pub const fn kind(&self) -> DialectKind {
        self.kind
    }

    /// Returns the dialect.
    #[must_use]
    pub fn dialect(&self) -> &'static dyn Dialect {
        self.kind.dialect()
    }

    /// Returns the options.
    #[must_use]
    pub const fn options(&self) -> &CompilerOptions {
        &self.options
    }

    /// Returns the type-cast registry.
    #[must_use]
    pub const fn type_casts(&self) -> &TypeCastRegistry {
        &self.casts
    }

    /// Returns the value normalizer.
    #[must_use]
    pub const fn normalizer(&self) -> &Normalizer {
        &self.normalizer
    }

    /// Wraps caller-supplied SQL without touching it.
    #[must_use]
    #[allow(clippy::unused_self)]
    pub fn raw(&self, sql: impl Into<String>, params: Vec<SqlValue>) -> Statement {
        Statement::query(sql, params)
    }

    fn table(&self, table: &str) -> Result<String> {
        TableName::resolve(table, self.options.schema.as_deref())?.to_sql(self.dialect())
    }

    fn predicate_options(&self) -> PredicateOptions<'_> {
        PredicateOptions {
            auto_wildcard: self.options.auto_wildcard,
            normalizer: self
                .options
                .normalize_filter_values
                .then_some(&self.normalizer),
        }
    }

    fn where_clause(
        &self,
        filter: &Filter,
        soft_delete: Option<&str>,
        params: &mut Params<'_>,
    ) -> Result<Option<String>> {
        compile_where(filter, soft_delete, self.predicate_options(), params)
    }

    /// Records per statement for `columns` columns.
    fn chunk_size(&self, columns: usize) -> usize {
        let ceiling = self.dialect().max_parameters() / columns.max(1);
        self.options.batch_size.min(ceiling).max(1)
    }
}

/// Joins non-empty SQL fragments with single spaces.
fn join_clauses<'a>(parts: impl IntoIterator<Item = &'a str>) -> String {
    parts
        .into_iter()
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}
