//! Value comparison semantics
//!
//! Stored rules were written against a dynamically typed host, so loose
//! comparison follows its conventions:
//!
//! - `null` and booleans compare by truthiness against anything,
//!   except `null` against a string, where `null` is the empty string
//! - numbers and numeric strings compare numerically
//! - a number against a non-numeric string compares as text
//! - two non-numeric strings compare bytewise
//!
//! Strict equality requires the same JSON type and value (`1` and `1.0` differ).

use serde_json::{Number, Value};
use std::cmp::Ordering;

/// Truthiness of a value
pub(crate) fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(false),
        Value::String(s) => !(s.is_empty() || s == "0"),
        Value::Array(items) => !items.is_empty(),
        Value::Object(_) => true,
    }
}

/// Parse a numeric string: optional surrounding whitespace, sign, digits,
/// decimal point and exponent. `inf`/`nan` spellings are not numeric.
pub(crate) fn numeric(s: &str) -> Option<f64> {
    let trimmed = s.trim();
    if trimmed.is_empty()
        || !trimmed
            .chars()
            .all(|c| c.is_ascii_digit() || matches!(c, '+' | '-' | '.' | 'e' | 'E'))
        || !trimmed.chars().any(|c| c.is_ascii_digit())
    {
        return None;
    }
    trimmed.parse::<f64>().ok()
}

fn number_text(n: &Number) -> String {
    match n.as_f64() {
        Some(f) if f.fract() == 0.0 && f.abs() < 1e15 => format!("{}", f as i64),
        _ => n.to_string(),
    }
}

fn cmp_f64(a: f64, b: f64) -> Option<Ordering> {
    a.partial_cmp(&b)
}

/// Loose three-way comparison. `None` when the operands are not comparable
/// (arrays or objects against scalars, or NaN).
pub fn loose_cmp(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Null, Value::String(s)) => Some("".cmp(s.as_str())),
        (Value::String(s), Value::Null) => Some(s.as_str().cmp("")),
        (Value::Null | Value::Bool(_), _) | (_, Value::Null | Value::Bool(_)) => {
            Some(truthy(a).cmp(&truthy(b)))
        }
        (Value::Number(x), Value::Number(y)) => cmp_f64(x.as_f64()?, y.as_f64()?),
        (Value::Number(x), Value::String(s)) => match numeric(s) {
            Some(y) => cmp_f64(x.as_f64()?, y),
            None => Some(number_text(x).as_str().cmp(s.as_str())),
        },
        (Value::String(s), Value::Number(y)) => match numeric(s) {
            Some(x) => cmp_f64(x, y.as_f64()?),
            None => Some(s.as_str().cmp(number_text(y).as_str())),
        },
        (Value::String(x), Value::String(y)) => match (numeric(x), numeric(y)) {
            (Some(fx), Some(fy)) => cmp_f64(fx, fy),
            _ => Some(x.cmp(y)),
        },
        (Value::Array(x), Value::Array(y)) => {
            if x.len() != y.len() {
                return Some(x.len().cmp(&y.len()));
            }
            for (l, r) in x.iter().zip(y) {
                match loose_cmp(l, r)? {
                    Ordering::Equal => continue,
                    other => return Some(other),
                }
            }
            Some(Ordering::Equal)
        }
        _ => None,
    }
}

/// Loose equality (`=`, `==`)
pub fn loose_eq(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Object(x), Value::Object(y)) => {
            x.len() == y.len()
                && x
                    .iter()
                    .all(|(k, v)| y.get(k).map(|w| loose_eq(v, w)).unwrap_or(false))
        }
        _ => loose_cmp(a, b) == Some(Ordering::Equal),
    }
}

/// Strict equality (`===`): same type and same value
pub fn strict_eq(a: &Value, b: &Value) -> bool {
    a == b
}

/// Coerce an expected value to a list for `in` / `not_in`
pub(crate) fn as_list(value: &Value) -> Vec<Value> {
    match value {
        Value::Array(items) => items.clone(),
        Value::Null => Vec::new(),
        other => vec![other.clone()],
    }
}

/// Coerce a scalar to text for substring tests. Arrays and objects have no
/// text form.
pub(crate) fn as_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => Some(String::new()),
        Value::Bool(true) => Some("1".to_string()),
        Value::Bool(false) => Some(String::new()),
        Value::Number(n) => Some(number_text(n)),
        Value::String(s) => Some(s.clone()),
        Value::Array(_) | Value::Object(_) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_numeric_strings() {
        assert_eq!(numeric("42"), Some(42.0));
        assert_eq!(numeric(" -3.5 "), Some(-3.5));
        assert_eq!(numeric("1e3"), Some(1000.0));
        assert_eq!(numeric("abc"), None);
        assert_eq!(numeric("inf"), None);
        assert_eq!(numeric("NaN"), None);
        assert_eq!(numeric(""), None);
        assert_eq!(numeric("-"), None);
        assert_eq!(numeric("12abc"), None);
    }

    #[test]
    fn test_loose_equality() {
        assert!(loose_eq(&json!(1), &json!("1")));
        assert!(loose_eq(&json!(1), &json!(1.0)));
        assert!(loose_eq(&json!("10"), &json!("1e1")));
        assert!(loose_eq(&json!(null), &json!(false)));
        assert!(loose_eq(&json!(null), &json!("")));
        assert!(loose_eq(&json!(null), &json!(0)));
        assert!(loose_eq(&json!(null), &json!([])));
        assert!(loose_eq(&json!(true), &json!("yes")));
        assert!(loose_eq(&json!(["1", 2]), &json!([1, "2"])));
        assert!(loose_eq(&json!({"a": 1}), &json!({"a": "1"})));

        assert!(!loose_eq(&json!(null), &json!("0")));
        assert!(!loose_eq(&json!("abc"), &json!("ABC")));
        assert!(!loose_eq(&json!(0), &json!("a")));
        assert!(!loose_eq(&json!([1]), &json!(1)));
    }

    #[test]
    fn test_strict_equality() {
        assert!(strict_eq(&json!("1"), &json!("1")));
        assert!(!strict_eq(&json!(1), &json!("1")));
        assert!(!strict_eq(&json!(1), &json!(1.0)));
        assert!(!strict_eq(&json!(null), &json!(false)));
    }

    #[test]
    fn test_ordering() {
        assert_eq!(loose_cmp(&json!(10), &json!(9)), Some(Ordering::Greater));
        assert_eq!(loose_cmp(&json!("10"), &json!("9")), Some(Ordering::Greater));
        assert_eq!(loose_cmp(&json!("b"), &json!("a")), Some(Ordering::Greater));
        assert_eq!(loose_cmp(&json!("10"), &json!("9a")), Some(Ordering::Less));
        assert_eq!(loose_cmp(&json!(null), &json!(5)), Some(Ordering::Less));
        assert_eq!(loose_cmp(&json!(null), &json!("a")), Some(Ordering::Less));
        assert_eq!(loose_cmp(&json!(5), &json!({"a": 1})), None);
    }

    #[test]
    fn test_coercions() {
        assert_eq!(as_list(&json!(["a", "b"])).len(), 2);
        assert_eq!(as_list(&json!("a")), vec![json!("a")]);
        assert!(as_list(&json!(null)).is_empty());

        assert_eq!(as_text(&json!(15)), Some("15".to_string()));
        assert_eq!(as_text(&json!(1.5)), Some("1.5".to_string()));
        assert_eq!(as_text(&json!(true)), Some("1".to_string()));
        assert_eq!(as_text(&json!(null)), Some(String::new()));
        assert_eq!(as_text(&json!([1])), None);
    }
}
