//! JSON arguments.

use std::path::Path;

use anyhow::{Context, Result};
use serde_json::Value;

/// Parses a JSON argument. `@path` reads the document from a file.
pub fn json_arg(raw: &str) -> Result<Value> {
    match raw.strip_prefix('@') {
        Some(path) => {
            let text = std::fs::read_to_string(Path::new(path))
                .with_context(|| format!("failed to read {path}"))?;
            serde_json::from_str(&text).with_context(|| format!("{path} is not valid JSON"))
        }
        None => serde_json::from_str(raw).with_context(|| format!("not valid JSON: {raw}")),
    }
}

/// Parses an optional JSON argument, `null` when absent.
pub fn optional_json_arg(raw: Option<&str>) -> Result<Value> {
    raw.map_or(Ok(Value::Null), json_arg)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Write;

    #[test]
    fn test_inline_json() {
        assert_eq!(json_arg(r#"[[["id", "=", 1]]]"#).unwrap(), json!([[["id", "=", 1]]]));
        assert!(json_arg("[[").is_err());
    }

    #[test]
    fn test_file_json() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"name": "a"}}"#).unwrap();
        let arg = format!("@{}", file.path().display());
        assert_eq!(json_arg(&arg).unwrap(), json!({"name": "a"}));
        assert!(json_arg("@/definitely/not/here.json").is_err());
    }

    #[test]
    fn test_absent_is_null() {
        assert_eq!(optional_json_arg(None).unwrap(), Value::Null);
    }
}
