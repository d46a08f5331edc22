//! Result shapes returned by the engine.

use serde::Serialize;
use serde_json::Value;
use sqlsieve_core::value::normalize::looks_like_json_document;

use crate::backend::Row;

/// Rows of a read plus the total number of matching rows.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReadResult {
    /// Matching rows (one page for `list`).
    pub data: Vec<Row>,
    /// Total matching rows, independent of paging.
    pub count: u64,
}

/// Outcome tag of a write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum WriteStatus {
    /// Every chunk succeeded.
    Success,
}

/// Summary of an insert or upsert.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WriteResult {
    /// Number of submitted records.
    pub rows: usize,
    /// Human-readable summary, e.g. `"3 Users are saved"`.
    pub message: String,
    /// Always [`WriteStatus::Success`]; failures are errors.
    #[serde(rename = "type")]
    pub status: WriteStatus,
    /// Identifier of the written row when exactly one record was written.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<Value>,
}

impl WriteResult {
    pub(crate) fn saved(table: &str, rows: usize, id: Option<Value>) -> Self {
        let name = namify(table);
        let message = if rows == 1 {
            format!("1 {name} is saved")
        } else {
            format!("{rows} {name}s are saved")
        };
        Self {
            rows,
            message,
            status: WriteStatus::Success,
            id,
        }
    }
}

/// Summary of a delete or soft delete.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RemoveResult {
    /// Number of affected rows.
    pub rows: u64,
    /// Human-readable summary, e.g. `"2 users removed"`.
    pub message: String,
}

impl RemoveResult {
    pub(crate) fn removed(table: &str, rows: u64) -> Self {
        let plural = if rows > 1 { "s" } else { "" };
        Self {
            rows,
            message: format!("{rows} {table}{plural} removed"),
        }
    }
}

/// `user_account` -> `User Account`.
#[must_use]
pub fn namify(table: &str) -> String {
    table
        .split('_')
        .filter(|word| !word.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            chars.next().map_or_else(String::new, |first| {
                first.to_uppercase().chain(chars).collect()
            })
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Picks the identifier of a written row: `id`, else the first key that
/// ends with `_id` or contains `id`, else the first column.
#[must_use]
pub fn extract_id(row: &Row) -> Option<Value> {
    if let Some(id) = row.get("id") {
        return Some(id.clone());
    }
    row.iter()
        .find(|(key, _)| key.ends_with("_id"))
        .or_else(|| row.iter().find(|(key, _)| key.contains("id")))
        .or_else(|| row.iter().next())
        .map(|(_, value)| value.clone())
}

/// Replaces text cells holding a JSON object or array with the parsed value.
pub(crate) fn decode_json_text(rows: &mut [Row]) {
    for row in rows {
        for value in row.values_mut() {
            if let Value::String(text) = value {
                if looks_like_json_document(text) {
                    if let Ok(parsed) = serde_json::from_str(text) {
                        *value = parsed;
                    }
                }
            }
        }
    }
}
