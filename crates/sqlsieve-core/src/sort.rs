//! ORDER BY compilation from `field` / `-field` tokens.

use std::fmt;

use serde_json::Value;

use crate::dialect::Dialect;
use crate::error::{QueryError, Result};
use crate::ident;

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OrderDirection {
    /// Ascending order.
    #[default]
    Asc,
    /// Descending order.
    Desc,
}

impl fmt::Display for OrderDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Asc => f.write_str("ASC"),
            Self::Desc => f.write_str("DESC"),
        }
    }
}

/// One column of an ORDER BY clause.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortKey {
    /// Column to order by
    pub column: String,
    /// Order direction
    pub direction: OrderDirection,
}

impl SortKey {
    /// Creates an ascending key.
    #[must_use]
    pub fn asc(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            direction: OrderDirection::Asc,
        }
    }

    /// Creates a descending key.
    #[must_use]
    pub fn desc(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            direction: OrderDirection::Desc,
        }
    }

    /// Parses a token. Prefix with `-` for descending order.
    ///
    /// Example: `"-created_at"` for descending, `"name"` for ascending.
    #[must_use]
    pub fn parse(token: &str) -> Self {
        match token.strip_prefix('-') {
            Some(column) => Self::desc(column),
            None => Self::asc(token),
        }
    }

    /// Returns the SQL representation with the column quoted.
    pub fn to_sql(&self, dialect: &dyn Dialect) -> Result<String> {
        Ok(format!(
            "{} {}",
            ident::quote(dialect, &self.column)?,
            self.direction
        ))
    }
}

/// An ordered list of sort keys; earlier keys take precedence.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Sort {
    keys: Vec<SortKey>,
}

impl Sort {
    /// No ordering.
    #[must_use]
    pub fn none() -> Self {
        Self::default()
    }

    /// Parses tokens in tie-break order.
    #[must_use]
    pub fn parse<S: AsRef<str>>(tokens: &[S]) -> Self {
        Self {
            keys: tokens.iter().map(|t| SortKey::parse(t.as_ref())).collect(),
        }
    }

    /// Parses a JSON array of tokens. `null` means no ordering.
    pub fn from_json(value: &Value) -> Result<Self> {
        match value {
            Value::Null => Ok(Self::none()),
            Value::Array(tokens) => tokens
                .iter()
                .map(|token| {
                    token.as_str().map(SortKey::parse).ok_or_else(|| {
                        QueryError::InvalidFilter(format!(
                            "sort token must be a string, got {token}"
                        ))
                    })
                })
                .collect::<Result<Vec<_>>>()
                .map(|keys| Self { keys }),
            other => Err(QueryError::InvalidFilter(format!(
                "sort must be an array, got {other}"
            ))),
        }
    }

    /// Appends a key.
    #[must_use]
    pub fn then(mut self, key: SortKey) -> Self {
        self.keys.push(key);
        self
    }

    /// Returns the keys in order.
    #[must_use]
    pub fn keys(&self) -> &[SortKey] {
        &self.keys
    }

    /// Returns true when no ordering is requested.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

/// Compiles `sort` into `ORDER BY ...`, or an empty string for no ordering.
pub fn compile_order_by(dialect: &dyn Dialect, sort: &Sort) -> Result<String> {
    if sort.is_empty() {
        return Ok(String::new());
    }
    let keys = sort
        .keys()
        .iter()
        .map(|key| key.to_sql(dialect))
        .collect::<Result<Vec<_>>>()?;
    Ok(format!("ORDER BY {}", keys.join(", ")))
}
