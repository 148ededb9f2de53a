//! Rule evaluation

use crate::compare::{as_list, as_text, loose_cmp, loose_eq, strict_eq};
use crate::node::{Comparison, LogicalOperator, RuleNode};
use crate::subject::{resolve_field, Subject};
use serde_json::Value;
use std::cmp::Ordering;
use tracing::debug;

/// Evaluates rule trees against subjects.
///
/// Stateless; evaluation reads subject fields and nothing else.
#[derive(Clone, Copy, Debug, Default)]
pub struct RuleEvaluator;

impl RuleEvaluator {
    pub fn new() -> Self {
        Self
    }

    /// Evaluate a rule in the wire format. `None` and empty rules pass.
    pub fn evaluate<S: Subject + ?Sized>(&self, rule: Option<&Value>, subject: &S) -> bool {
        match rule {
            None => true,
            Some(raw) => self.evaluate_node(&RuleNode::parse(raw), subject),
        }
    }

    /// Evaluate an already parsed rule tree
    pub fn evaluate_node<S: Subject + ?Sized>(&self, node: &RuleNode, subject: &S) -> bool {
        match node {
            RuleNode::Empty => true,
            RuleNode::Group {
                operator: LogicalOperator::And,
                conditions,
            } => conditions.iter().all(|c| self.evaluate_node(c, subject)),
            RuleNode::Group {
                operator: LogicalOperator::Or,
                conditions,
            } => conditions.iter().any(|c| self.evaluate_node(c, subject)),
            RuleNode::Condition {
                field,
                comparison,
                value,
            } => {
                let actual = resolve_field(subject, field);
                let expected = value.as_ref().unwrap_or(&Value::Null);
                let passed = compare(&actual, comparison, expected);
                debug!(
                    field = %field,
                    comparison = comparison.token(),
                    passed,
                    "Rule condition evaluated"
                );
                passed
            }
            RuleNode::Malformed { reason } => {
                debug!(reason = %reason, "Malformed rule node fails closed");
                false
            }
        }
    }
}

fn compare(actual: &Value, comparison: &Comparison, expected: &Value) -> bool {
    match comparison {
        Comparison::LooseEq => loose_eq(actual, expected),
        Comparison::StrictEq => strict_eq(actual, expected),
        Comparison::LooseNe => !loose_eq(actual, expected),
        Comparison::StrictNe => !strict_eq(actual, expected),
        Comparison::Gt => ordered(actual, expected, |o| o == Ordering::Greater),
        Comparison::Gte => ordered(actual, expected, |o| o != Ordering::Less),
        Comparison::Lt => ordered(actual, expected, |o| o == Ordering::Less),
        Comparison::Lte => ordered(actual, expected, |o| o != Ordering::Greater),
        Comparison::In => member(actual, expected),
        Comparison::NotIn => !member(actual, expected),
        Comparison::Contains => text_test(actual, expected, |a, e| a.contains(e)),
        Comparison::StartsWith => text_test(actual, expected, |a, e| a.starts_with(e)),
        Comparison::EndsWith => text_test(actual, expected, |a, e| a.ends_with(e)),
        Comparison::IsNull => actual.is_null(),
        Comparison::IsNotNull => !actual.is_null(),
        Comparison::Unknown(token) => {
            debug!(comparison = %token, "Unknown comparison fails closed");
            false
        }
    }
}

fn ordered(actual: &Value, expected: &Value, accept: impl Fn(Ordering) -> bool) -> bool {
    loose_cmp(actual, expected).map(accept).unwrap_or(false)
}

fn member(actual: &Value, expected: &Value) -> bool {
    as_list(expected).iter().any(|item| loose_eq(actual, item))
}

fn text_test(actual: &Value, expected: &Value, test: impl Fn(&str, &str) -> bool) -> bool {
    match (as_text(actual), as_text(expected)) {
        (Some(a), Some(e)) => test(&a, &e),
        _ => false,
    }
}
