//! Heuristic normalization of loosely-typed input values.
//!
//! Callers hand over JSON records without a schema. The normalizer adapts
//! stringified booleans, integers and decimals to native values using the
//! column name and the content of the value, so that a strongly typed
//! column store receives comparable types.

use serde_json::{Map, Number, Value};

/// Largest integer a double can represent exactly (2^53 - 1).
pub const MAX_SAFE_INTEGER: i64 = 9_007_199_254_740_991;

/// Column-name aware value normalizer.
#[derive(Debug, Clone)]
pub struct Normalizer {
    text_markers: Vec<String>,
}

impl Default for Normalizer {
    fn default() -> Self {
        Self {
            text_markers: vec![
                String::from("phone"),
                String::from("mobile"),
                String::from("account_number"),
            ],
        }
    }
}

impl Normalizer {
    /// Creates a normalizer with the default text-preserving markers.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a column-name fragment whose values always stay text.
    #[must_use]
    pub fn with_text_marker(mut self, marker: impl Into<String>) -> Self {
        self.text_markers.push(marker.into());
        self
    }

    /// Normalizes one value destined for `column`.
    #[must_use]
    pub fn normalize(&self, column: &str, value: &Value) -> Value {
        match value {
            Value::Null => Value::Null,
            Value::Array(items) => Value::Array(
                items
                    .iter()
                    .map(|item| self.normalize(column, item))
                    .collect(),
            ),
            Value::Object(fields) => Value::Object(self.normalize_row(fields)),
            Value::String(s) => self.normalize_text(column, s),
            Value::Number(n) => self.normalize_number(column, n),
            Value::Bool(b) => {
                if self.keeps_text(column) {
                    Value::String(b.to_string())
                } else {
                    Value::Bool(*b)
                }
            }
        }
    }

    /// Normalizes every field of a record, using each key as the column name.
    #[must_use]
    pub fn normalize_row(&self, row: &Map<String, Value>) -> Map<String, Value> {
        row.iter()
            .map(|(column, value)| (column.clone(), self.normalize(column, value)))
            .collect()
    }

    fn normalize_text(&self, column: &str, s: &str) -> Value {
        if s.eq_ignore_ascii_case("true") {
            return Value::Bool(true);
        }
        if s.eq_ignore_ascii_case("false") {
            return Value::Bool(false);
        }
        // JSON documents stay text: the column casts them.
        if looks_like_json_document(s) {
            return Value::String(String::from(s));
        }
        if is_id_column(column) && is_unsigned_digits(s) {
            return s
                .parse::<i64>()
                .map_or_else(|_| Value::String(String::from(s)), Value::from);
        }
        if self.keeps_text(column) {
            return Value::String(String::from(s));
        }
        if is_signed_digits(s) {
            return match s.parse::<i64>() {
                Ok(n) if (-MAX_SAFE_INTEGER..=MAX_SAFE_INTEGER).contains(&n) => Value::from(n),
                _ => Value::String(String::from(s)),
            };
        }
        if is_decimal(s) {
            if let Some(n) = s.parse::<f64>().ok().and_then(Number::from_f64) {
                return Value::Number(n);
            }
        }
        Value::String(String::from(s))
    }

    fn normalize_number(&self, column: &str, n: &Number) -> Value {
        if is_id_column(column) {
            if n.is_f64() {
                if let Some(floored) = n.as_f64().and_then(floor_to_i64) {
                    return Value::from(floored);
                }
            }
            return Value::Number(n.clone());
        }
        if self.keeps_text(column) {
            return Value::String(n.to_string());
        }
        Value::Number(n.clone())
    }

    fn keeps_text(&self, column: &str) -> bool {
        self.text_markers
            .iter()
            .any(|marker| column.contains(marker.as_str()))
    }
}

/// Returns true for `id` and `*_id` column names.
#[must_use]
pub fn is_id_column(column: &str) -> bool {
    column == "id" || column.ends_with("_id")
}

/// Returns true when `s` is syntactically a JSON object or array.
#[must_use]
pub fn looks_like_json_document(s: &str) -> bool {
    let trimmed = s.trim();
    let bracketed = (trimmed.starts_with('{') && trimmed.ends_with('}'))
        || (trimmed.starts_with('[') && trimmed.ends_with(']'));
    bracketed && serde_json::from_str::<Value>(trimmed).is_ok()
}

#[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
fn floor_to_i64(f: f64) -> Option<i64> {
    let floored = f.floor();
    (floored.is_finite() && floored >= i64::MIN as f64 && floored < i64::MAX as f64)
        .then_some(floored as i64)
}

fn is_unsigned_digits(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit())
}

fn is_signed_digits(s: &str) -> bool {
    is_unsigned_digits(s.strip_prefix('-').unwrap_or(s))
}

fn is_decimal(s: &str) -> bool {
    let unsigned = s.strip_prefix('-').unwrap_or(s);
    match unsigned.split_once('.') {
        Some((int, frac)) => is_unsigned_digits(int) && is_unsigned_digits(frac),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn norm(column: &str, value: Value) -> Value {
        Normalizer::new().normalize(column, &value)
    }

    #[test]
    fn test_null_passes_through() {
        assert_eq!(norm("name", json!(null)), json!(null));
    }

    #[test]
    fn test_boolean_strings() {
        assert_eq!(norm("active", json!("true")), json!(true));
        assert_eq!(norm("active", json!("FALSE")), json!(false));
        assert_eq!(norm("active", json!("True")), json!(true));
    }

    #[test]
    fn test_json_document_stays_text() {
        let doc = r#"{"city": "Oslo", "zip": "0150"}"#;
        assert_eq!(norm("profile", json!(doc)), json!(doc));
        assert_eq!(norm("tags", json!("[1, 2, 3]")), json!("[1, 2, 3]"));
    }

    #[test]
    fn test_broken_json_is_plain_text() {
        assert_eq!(norm("note", json!("{not json}")), json!("{not json}"));
    }

    #[test]
    fn test_id_columns_become_integers() {
        assert_eq!(norm("user_id", json!("123")), json!(123));
        assert_eq!(norm("id", json!("7")), json!(7));
        assert_eq!(norm("user_id", json!(12.9)), json!(12));
    }

    #[test]
    fn test_id_overflow_stays_text() {
        let big = "123456789012345678901234567890";
        assert_eq!(norm("order_id", json!(big)), json!(big));
    }

    #[test]
    fn test_phone_columns_stay_text() {
        assert_eq!(norm("phone_number", json!("+1-555-1234")), json!("+1-555-1234"));
        assert_eq!(norm("mobile", json!("0047123")), json!("0047123"));
        assert_eq!(norm("account_number", json!(1234)), json!("1234"));
    }

    #[test]
    fn test_generic_integers() {
        assert_eq!(norm("age", json!("42")), json!(42));
        assert_eq!(norm("delta", json!("-5")), json!(-5));
    }

    #[test]
    fn test_unsafe_integers_stay_text() {
        assert_eq!(norm("amount", json!("9007199254740993")), json!("9007199254740993"));
        assert_eq!(norm("amount", json!("9007199254740991")), json!(9_007_199_254_740_991_i64));
    }

    #[test]
    fn test_decimals() {
        assert_eq!(norm("price", json!("19.95")), json!(19.95));
        assert_eq!(norm("price", json!("-0.5")), json!(-0.5));
        assert_eq!(norm("version", json!("1.2.3")), json!("1.2.3"));
    }

    #[test]
    fn test_recurses_into_structures() {
        let value = json!({"user_id": "5", "tags": ["true", "x"], "phone": 555});
        assert_eq!(
            norm("payload", value),
            json!({"user_id": 5, "tags": [true, "x"], "phone": "555"})
        );
    }

    #[test]
    fn test_custom_text_marker() {
        let normalizer = Normalizer::new().with_text_marker("zip");
        assert_eq!(normalizer.normalize("zip_code", &json!("0150")), json!("0150"));
    }

    #[test]
    fn test_plain_text_untouched() {
        assert_eq!(norm("name", json!("Alice")), json!("Alice"));
        assert_eq!(norm("name", json!("")), json!(""));
    }
}
