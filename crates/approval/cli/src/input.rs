//! Reading JSON arguments that may be inline or on disk

use anyhow::Context;
use serde_json::Value;
use std::path::Path;

/// Parse `arg` as JSON if it looks like a document, otherwise read it as a
/// file path
pub fn json_arg(arg: &str) -> anyhow::Result<Value> {
    let trimmed = arg.trim_start();
    if looks_inline(trimmed) {
        return serde_json::from_str(trimmed).context("invalid inline JSON");
    }
    read_json(Path::new(arg))
}

pub fn read_json(path: &Path) -> anyhow::Result<Value> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("cannot read {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("invalid JSON in {}", path.display()))
}

fn looks_inline(arg: &str) -> bool {
    arg.starts_with('{') || arg.starts_with('[') || arg == "null"
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_inline_documents() {
        assert_eq!(json_arg(r#"{"amount": 5}"#).unwrap(), json!({"amount": 5}));
        assert_eq!(json_arg("  []").unwrap(), json!([]));
        assert_eq!(json_arg("null").unwrap(), Value::Null);
    }

    #[test]
    fn test_missing_file() {
        let err = json_arg("/definitely/not/here.json").unwrap_err();
        assert!(err.to_string().contains("cannot read"));
    }

    #[test]
    fn test_bad_inline_json() {
        assert!(json_arg("{not json").is_err());
    }
}
