//! PostgreSQL dialect.

use super::Dialect;

/// PostgreSQL dialect: `$n` placeholders, `::type` casts, data-modifying CTEs.
#[derive(Debug, Default, Clone, Copy)]
pub struct PostgresDialect;

impl PostgresDialect {
    /// Creates a new PostgreSQL dialect.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Dialect for PostgresDialect {
    fn name(&self) -> &'static str {
        "postgresql"
    }

    fn placeholder(&self, index: usize) -> String {
        format!("${index}")
    }

    fn max_parameters(&self) -> usize {
        65_535
    }

    fn supports_returning(&self) -> bool {
        true
    }

    fn supports_type_casts(&self) -> bool {
        true
    }

    fn supports_writable_cte(&self) -> bool {
        true
    }

    fn cast(&self, placeholder: &str, target: &str) -> String {
        format!("{placeholder}::{target}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_postgres_dialect() {
        let dialect = PostgresDialect::new();
        assert_eq!(dialect.name(), "postgresql");
        assert_eq!(dialect.identifier_quote(), '"');
        assert_eq!(dialect.placeholder(1), "$1");
        assert_eq!(dialect.placeholder(12), "$12");
        assert_eq!(dialect.cast("$3", "jsonb"), "$3::jsonb");
        assert!(dialect.supports_returning());
        assert!(dialect.supports_writable_cte());
        assert!(!dialect.supports_chained_conflict_clauses());
    }
}
