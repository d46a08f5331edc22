//! SQLite dialect.

use super::Dialect;

/// SQLite dialect.
#[derive(Debug, Default, Clone, Copy)]
pub struct SqliteDialect;

impl SqliteDialect {
    /// Creates a new SQLite dialect.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Dialect for SqliteDialect {
    fn name(&self) -> &'static str {
        "sqlite"
    }

    fn identifier_quote(&self) -> char {
        '"' // SQLite also accepts backticks, but double quotes are standard
    }

    fn placeholder(&self, index: usize) -> String {
        format!("?{index}")
    }

    fn max_parameters(&self) -> usize {
        32_766 // SQLITE_MAX_VARIABLE_NUMBER since 3.32.0
    }

    fn supports_returning(&self) -> bool {
        true // SQLite 3.35.0+
    }

    fn supports_chained_conflict_clauses(&self) -> bool {
        true // SQLite 3.35.0+
    }
}
