//! SQL Dialect support.
//!
//! Different databases have slightly different SQL syntax. This module provides
//! a trait for the dialect-specific parts of statement compilation: identifier
//! quoting, positional placeholders, type-cast suffixes and the conflict
//! resolution features a database offers.

mod postgres;
mod sqlite;

use std::fmt;
use std::str::FromStr;

pub use postgres::PostgresDialect;
pub use sqlite::SqliteDialect;

/// Trait for SQL dialect-specific behavior.
pub trait Dialect: fmt::Debug + Send + Sync {
    /// Returns the name of the dialect.
    fn name(&self) -> &'static str;

    /// Returns the identifier quote character (e.g., `"` for standard SQL, `` ` `` for MySQL).
    fn identifier_quote(&self) -> char {
        '"'
    }

    /// Returns the positional placeholder for the 1-based parameter `index`.
    fn placeholder(&self, index: usize) -> String;

    /// Returns the maximum number of bound parameters in one statement.
    fn max_parameters(&self) -> usize;

    /// Returns whether the dialect supports RETURNING clause.
    fn supports_returning(&self) -> bool {
        false
    }

    /// Returns whether placeholders may carry an explicit type cast.
    fn supports_type_casts(&self) -> bool {
        false
    }

    /// Returns whether INSERT/UPDATE may appear inside a WITH clause.
    fn supports_writable_cte(&self) -> bool {
        false
    }

    /// Returns whether one INSERT may carry several ON CONFLICT clauses.
    fn supports_chained_conflict_clauses(&self) -> bool {
        false
    }

    /// Attaches a cast to `target` to a placeholder.
    ///
    /// Dialects without cast support return the placeholder unchanged.
    fn cast(&self, placeholder: &str, _target: &str) -> String {
        String::from(placeholder)
    }

    /// Quotes an identifier, doubling any embedded quote character.
    fn quote_identifier(&self, name: &str) -> String {
        let quote = self.identifier_quote();
        let mut escaped = String::with_capacity(name.len() + 2);
        escaped.push(quote);
        for c in name.chars() {
            if c == quote {
                escaped.push(quote);
            }
            escaped.push(c);
        }
        escaped.push(quote);
        escaped
    }
}

/// Runtime selection between the bundled dialects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DialectKind {
    /// PostgreSQL.
    #[default]
    Postgres,
    /// SQLite.
    Sqlite,
}

impl DialectKind {
    /// Returns the dialect implementation for this kind.
    #[must_use]
    pub fn dialect(self) -> &'static dyn Dialect {
        match self {
            Self::Postgres => &PostgresDialect,
            Self::Sqlite => &SqliteDialect,
        }
    }

    /// Guesses the dialect from a database URL.
    #[must_use]
    pub fn from_url(url: &str) -> Option<Self> {
        if url.starts_with("postgres://") || url.starts_with("postgresql://") {
            Some(Self::Postgres)
        } else if url.starts_with("sqlite:") {
            Some(Self::Sqlite)
        } else {
            None
        }
    }
}

impl fmt::Display for DialectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.dialect().name())
    }
}

impl FromStr for DialectKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "postgres" | "postgresql" | "pg" => Ok(Self::Postgres),
            "sqlite" => Ok(Self::Sqlite),
            other => Err(format!("unknown dialect: {other}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quote_identifier_doubles_quotes() {
        let dialect = PostgresDialect::new();
        assert_eq!(dialect.quote_identifier("users"), "\"users\"");
        assert_eq!(dialect.quote_identifier("we\"ird"), "\"we\"\"ird\"");
        assert_eq!(
            dialect.quote_identifier("name\"; DROP TABLE users; --"),
            "\"name\"\"; DROP TABLE users; --\""
        );
    }

    #[test]
    fn test_dialect_kind_from_url() {
        assert_eq!(
            DialectKind::from_url("postgres://localhost/app"),
            Some(DialectKind::Postgres)
        );
        assert_eq!(
            DialectKind::from_url("postgresql://localhost/app"),
            Some(DialectKind::Postgres)
        );
        assert_eq!(
            DialectKind::from_url("sqlite::memory:"),
            Some(DialectKind::Sqlite)
        );
        assert_eq!(DialectKind::from_url("mysql://localhost/app"), None);
    }

    #[test]
    fn test_dialect_kind_from_str() {
        assert_eq!("PostgreSQL".parse::<DialectKind>(), Ok(DialectKind::Postgres));
        assert_eq!("sqlite".parse::<DialectKind>(), Ok(DialectKind::Sqlite));
        assert!("oracle".parse::<DialectKind>().is_err());
        assert_eq!(DialectKind::Sqlite.to_string(), "sqlite");
    }
}
