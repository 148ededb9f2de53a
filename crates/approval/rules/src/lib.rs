//! Conditional rule trees for approval steps
//!
//! A step may carry a rule tree deciding whether it applies to a given
//! approvable object. The persisted wire format is JSON and has two shapes:
//!
//! ```json
//! {"operator": "AND", "conditions": [ ... ]}
//! {"field": "department.code", "comparison": "in", "value": ["FIN", "OPS"]}
//! ```
//!
//! Evaluation is **total**: it never errors. A missing rule passes; a
//! malformed node, an unknown comparison or a field that cannot be resolved
//! fails closed at that node and propagates through its group normally.
//!
//! # Example
//!
//! ```rust
//! use approval_rules::RuleEvaluator;
//! use serde_json::json;
//!
//! let rule = json!({
//!     "operator": "OR",
//!     "conditions": [
//!         {"field": "amount", "comparison": ">=", "value": 10000},
//!         {"field": "vendor.country", "comparison": "!=", "value": "CH"}
//!     ]
//! });
//! let payment = json!({"amount": 2500, "vendor": {"country": "DE"}});
//!
//! assert!(RuleEvaluator::new().evaluate(Some(&rule), &payment));
//! assert!(!RuleEvaluator::new().evaluate(Some(&json!({"field": "amount"})), &payment));
//! ```

#![deny(unsafe_code)]

mod compare;
mod evaluator;
mod node;
mod subject;
mod validate;

pub use compare::{loose_eq, loose_cmp, strict_eq};
pub use evaluator::RuleEvaluator;
pub use node::{Comparison, LogicalOperator, RuleNode};
pub use subject::{resolve_field, Subject};
pub use validate::{validate, RuleIssue};
