//! Identifier quoting and table-name resolution.
//!
//! Every table and column name that ends up in SQL text goes through this
//! module. Values never do: they are bound as parameters.

use crate::dialect::Dialect;
use crate::error::{QueryError, Result};

/// Quotes `name` as an identifier for `dialect`.
///
/// Fails with [`QueryError::InvalidIdentifier`] for empty names and names
/// containing a NUL byte, which no supported database accepts.
pub fn quote(dialect: &dyn Dialect, name: &str) -> Result<String> {
    if name.is_empty() {
        return Err(QueryError::InvalidIdentifier(String::from(
            "identifier must not be empty",
        )));
    }
    if name.contains('\0') {
        return Err(QueryError::InvalidIdentifier(format!(
            "identifier contains a NUL byte: {name:?}"
        )));
    }
    Ok(dialect.quote_identifier(name))
}

/// Quotes every name in `names`, joined with `", "`.
pub fn quote_list(dialect: &dyn Dialect, names: &[String]) -> Result<String> {
    let quoted = names
        .iter()
        .map(|name| quote(dialect, name))
        .collect::<Result<Vec<_>>>()?;
    Ok(quoted.join(", "))
}

/// A table reference, optionally schema-qualified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableName {
    /// Schema, if one was given or configured.
    pub schema: Option<String>,
    /// Table name.
    pub name: String,
}

impl TableName {
    /// Parses `table` or `schema.table`.
    ///
    /// When `table` carries no schema, `default_schema` is used.
    pub fn resolve(table: &str, default_schema: Option<&str>) -> Result<Self> {
        let (schema, name) = match table.split_once('.') {
            Some((schema, name)) => (Some(schema), name),
            None => (default_schema, table),
        };
        if name.is_empty() || schema.is_some_and(str::is_empty) {
            return Err(QueryError::InvalidIdentifier(format!(
                "invalid table name: {table:?}"
            )));
        }
        Ok(Self {
            schema: schema.map(String::from),
            name: String::from(name),
        })
    }

    /// Returns the quoted, possibly schema-qualified, SQL form.
    pub fn to_sql(&self, dialect: &dyn Dialect) -> Result<String> {
        let table = quote(dialect, &self.name)?;
        match &self.schema {
            Some(schema) => Ok(format!("{}.{table}", quote(dialect, schema)?)),
            None => Ok(table),
        }
    }
}
