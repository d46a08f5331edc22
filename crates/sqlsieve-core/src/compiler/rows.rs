//! Rectangular record sets for INSERT statements.

use serde_json::{Map, Value};

use crate::error::{QueryError, Result};

/// Records sharing one column list.
///
/// The column list comes from the first record. Later records contribute
/// their values by column name; missing keys become NULL and extra keys are
/// ignored.
#[derive(Debug, Clone, PartialEq)]
pub struct RowSet {
    columns: Vec<String>,
    rows: Vec<Vec<Value>>,
}

impl RowSet {
    /// Builds a row set from a single record or an array of records.
    pub fn from_json(data: &Value) -> Result<Self> {
        match data {
            Value::Object(record) => Self::from_records(std::slice::from_ref(record)),
            Value::Array(items) => {
                let records = items
                    .iter()
                    .map(|item| {
                        item.as_object().cloned().ok_or_else(|| {
                            QueryError::InvalidRows(format!("record must be an object, got {item}"))
                        })
                    })
                    .collect::<Result<Vec<_>>>()?;
                Self::from_records(&records)
            }
            other => Err(QueryError::InvalidRows(format!(
                "expected an object or an array of objects, got {other}"
            ))),
        }
    }

    /// Builds a row set from records.
    pub fn from_records(records: &[Map<String, Value>]) -> Result<Self> {
        let first = records
            .first()
            .ok_or_else(|| QueryError::InvalidRows(String::from("no records to write")))?;
        if first.is_empty() {
            return Err(QueryError::InvalidRows(String::from(
                "the first record has no columns",
            )));
        }
        let columns: Vec<String> = first.keys().cloned().collect();
        let rows = records
            .iter()
            .map(|record| {
                columns
                    .iter()
                    .map(|column| record.get(column).cloned().unwrap_or(Value::Null))
                    .collect()
            })
            .collect();
        Ok(Self { columns, rows })
    }

    /// Returns the column list.
    #[must_use]
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Returns the rows, each aligned with [`RowSet::columns`].
    #[must_use]
    pub fn rows(&self) -> &[Vec<Value>] {
        &self.rows
    }

    /// Number of records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Always false for a constructed row set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}
