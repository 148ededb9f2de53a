//! `approvalctl eval`

use super::print_json;
use crate::input::json_arg;
use approval_rules::{validate, RuleEvaluator, RuleIssue};
use serde::Serialize;
use serde_json::Value;

#[derive(Debug, Serialize)]
pub struct EvalReport {
    pub applies: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub issues: Vec<RuleIssue>,
}

pub fn evaluate(rule: &Value, subject: &Value) -> EvalReport {
    let applies = RuleEvaluator::new().evaluate(Some(rule), subject);
    let issues = validate(rule);
    if !issues.is_empty() {
        tracing::warn!(count = issues.len(), "Rule has malformed nodes; they evaluate to false");
    }
    EvalReport { applies, issues }
}

pub fn run(rule: &str, subject: &str) -> anyhow::Result<()> {
    let rule = json_arg(rule)?;
    let subject = json_arg(subject)?;
    print_json(&evaluate(&rule, &subject))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_applies() {
        let rule = json!({"field": "amount", "comparison": ">", "value": 1000});
        let report = evaluate(&rule, &json!({"amount": "2500"}));
        assert!(report.applies);
        assert!(report.issues.is_empty());
    }

    #[test]
    fn test_malformed_rule_reports_issue() {
        let rule = json!({
            "operator": "AND",
            "conditions": [
                {"field": "amount", "comparison": ">", "value": 1},
                {"field": "currency", "comparison": "resembles", "value": "CHF"}
            ]
        });
        let report = evaluate(&rule, &json!({"amount": 5, "currency": "CHF"}));
        assert!(!report.applies);
        assert_eq!(report.issues.len(), 1);
        assert_eq!(report.issues[0].path, "/conditions/1/comparison");
    }
}
