//! Positional parameter bookkeeping.

use crate::dialect::Dialect;
use crate::value::SqlValue;

/// Accumulates bound values for one statement and hands out placeholders.
///
/// Placeholder indexes are 1-based and strictly increasing in the order
/// values are pushed, so clauses must be pushed in the order they appear
/// in the SQL text.
#[derive(Debug)]
pub struct Params<'d> {
    dialect: &'d dyn Dialect,
    values: Vec<SqlValue>,
}

impl<'d> Params<'d> {
    /// Creates an empty parameter list for `dialect`.
    #[must_use]
    pub fn new(dialect: &'d dyn Dialect) -> Self {
        Self {
            dialect,
            values: Vec::new(),
        }
    }

    /// Binds a value and returns its placeholder.
    pub fn push(&mut self, value: SqlValue) -> String {
        self.values.push(value);
        self.dialect.placeholder(self.values.len())
    }

    /// Binds a value and returns its placeholder with an optional cast.
    pub fn push_cast(&mut self, value: SqlValue, cast: Option<&str>) -> String {
        let placeholder = self.push(value);
        match cast {
            Some(target) if self.dialect.supports_type_casts() => {
                self.dialect.cast(&placeholder, target)
            }
            _ => placeholder,
        }
    }

    /// Returns the number of bound values.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns true when nothing has been bound.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Returns the dialect placeholders are rendered for.
    #[must_use]
    pub fn dialect(&self) -> &'d dyn Dialect {
        self.dialect
    }

    /// Consumes the accumulator, returning the values in placeholder order.
    #[must_use]
    pub fn into_values(self) -> Vec<SqlValue> {
        self.values
    }
}
