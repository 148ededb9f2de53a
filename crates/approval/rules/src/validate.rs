//! Structural validation of stored rules, for rule-builder UIs
//!
//! Evaluation never needs this: malformed nodes already fail closed. The
//! validator tells an author *where* a rule is broken before it is saved.

use crate::node::{kind_of, Comparison, LogicalOperator};
use serde::Serialize;
use serde_json::{Map, Value};

/// One problem found in a rule tree
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct RuleIssue {
    /// Pointer-style location, e.g. `/conditions/1/comparison`
    pub path: String,
    pub message: String,
}

impl RuleIssue {
    fn new(path: &str, message: impl Into<String>) -> Self {
        Self {
            path: if path.is_empty() { "/".into() } else { path.into() },
            message: message.into(),
        }
    }
}

impl std::fmt::Display for RuleIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.path, self.message)
    }
}

/// Collect every structural problem in `rule`. An empty result means every
/// node will be evaluated as written.
pub fn validate(rule: &Value) -> Vec<RuleIssue> {
    let mut issues = Vec::new();
    match rule {
        Value::Null => {}
        Value::Object(map) if map.is_empty() => {}
        Value::Array(items) if items.is_empty() => {}
        other => check_node(other, "", &mut issues),
    }
    issues
}

fn check_node(node: &Value, path: &str, issues: &mut Vec<RuleIssue>) {
    let Value::Object(map) = node else {
        issues.push(RuleIssue::new(
            path,
            format!("expected an object, found {}", kind_of(node)),
        ));
        return;
    };

    if map.contains_key("conditions") {
        check_group(map, path, issues);
    } else if map.contains_key("field") {
        check_condition(map, path, issues);
    } else {
        issues.push(RuleIssue::new(
            path,
            "node has neither 'conditions' nor 'field'",
        ));
    }
}

fn check_group(map: &Map<String, Value>, path: &str, issues: &mut Vec<RuleIssue>) {
    let operator_path = format!("{path}/operator");
    match map.get("operator") {
        Some(Value::String(token)) if LogicalOperator::from_token(token).is_some() => {}
        Some(Value::String(token)) => issues.push(RuleIssue::new(
            &operator_path,
            format!("unknown operator '{token}', expected AND or OR"),
        )),
        Some(_) => issues.push(RuleIssue::new(&operator_path, "operator must be a string")),
        None => issues.push(RuleIssue::new(&operator_path, "missing operator")),
    }

    let conditions_path = format!("{path}/conditions");
    match map.get("conditions") {
        Some(Value::Array(items)) => {
            for (i, child) in items.iter().enumerate() {
                check_node(child, &format!("{conditions_path}/{i}"), issues);
            }
        }
        _ => issues.push(RuleIssue::new(&conditions_path, "conditions must be an array")),
    }
}

fn check_condition(map: &Map<String, Value>, path: &str, issues: &mut Vec<RuleIssue>) {
    match map.get("field") {
        Some(Value::String(f)) if !f.is_empty() => {
            if f.matches('.').count() > 1 {
                issues.push(RuleIssue::new(
                    &format!("{path}/field"),
                    format!("'{f}' traverses more than one relation; only 'relation.column' is resolved"),
                ));
            }
        }
        _ => issues.push(RuleIssue::new(
            &format!("{path}/field"),
            "field must be a non-empty string",
        )),
    }

    let comparison_path = format!("{path}/comparison");
    let comparison = match map.get("comparison") {
        Some(Value::String(token)) => Comparison::from_token(token),
        Some(_) => {
            issues.push(RuleIssue::new(&comparison_path, "comparison must be a string"));
            return;
        }
        None => {
            issues.push(RuleIssue::new(&comparison_path, "missing comparison"));
            return;
        }
    };

    if let Comparison::Unknown(token) = &comparison {
        issues.push(RuleIssue::new(
            &comparison_path,
            format!("unknown comparison '{token}'"),
        ));
        return;
    }

    if comparison.needs_value() && !map.contains_key("value") {
        issues.push(RuleIssue::new(
            &format!("{path}/value"),
            format!("comparison '{}' requires a value", comparison.token()),
        ));
    }
}
