//! Typed rule trees
//!
//! Parsing is tolerant: every JSON value maps to some [`RuleNode`], and shapes
//! that cannot be evaluated become [`RuleNode::Malformed`] instead of a parse
//! error, so a broken stored rule blocks its step without failing the caller.

use serde_json::{json, Map, Value};

/// Logical operator of a group node
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum LogicalOperator {
    And,
    Or,
}

impl LogicalOperator {
    /// Case-insensitive parse of `AND` / `OR`
    pub fn from_token(token: &str) -> Option<Self> {
        if token.eq_ignore_ascii_case("and") {
            Some(Self::And)
        } else if token.eq_ignore_ascii_case("or") {
            Some(Self::Or)
        } else {
            None
        }
    }

    pub fn token(&self) -> &'static str {
        match self {
            Self::And => "AND",
            Self::Or => "OR",
        }
    }
}

/// Comparison of a leaf node
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Comparison {
    /// `=` and `==`
    LooseEq,
    /// `===`
    StrictEq,
    /// `!=`
    LooseNe,
    /// `!==`
    StrictNe,
    Gt,
    Gte,
    Lt,
    Lte,
    In,
    NotIn,
    Contains,
    StartsWith,
    EndsWith,
    IsNull,
    IsNotNull,
    /// Anything else; always evaluates to `false`
    Unknown(String),
}

impl Comparison {
    pub fn from_token(token: &str) -> Self {
        match token {
            "=" | "==" => Self::LooseEq,
            "===" => Self::StrictEq,
            "!=" | "<>" => Self::LooseNe,
            "!==" => Self::StrictNe,
            ">" => Self::Gt,
            ">=" => Self::Gte,
            "<" => Self::Lt,
            "<=" => Self::Lte,
            "in" => Self::In,
            "not_in" => Self::NotIn,
            "contains" => Self::Contains,
            "starts_with" => Self::StartsWith,
            "ends_with" => Self::EndsWith,
            "is_null" => Self::IsNull,
            "is_not_null" => Self::IsNotNull,
            other => Self::Unknown(other.to_string()),
        }
    }

    pub fn token(&self) -> &str {
        match self {
            Self::LooseEq => "=",
            Self::StrictEq => "===",
            Self::LooseNe => "!=",
            Self::StrictNe => "!==",
            Self::Gt => ">",
            Self::Gte => ">=",
            Self::Lt => "<",
            Self::Lte => "<=",
            Self::In => "in",
            Self::NotIn => "not_in",
            Self::Contains => "contains",
            Self::StartsWith => "starts_with",
            Self::EndsWith => "ends_with",
            Self::IsNull => "is_null",
            Self::IsNotNull => "is_not_null",
            Self::Unknown(raw) => raw,
        }
    }

    /// Null checks ignore the `value` key
    pub fn needs_value(&self) -> bool {
        !matches!(self, Self::IsNull | Self::IsNotNull)
    }
}

/// One node of a rule tree
#[derive(Clone, Debug, PartialEq)]
pub enum RuleNode {
    /// No rule (`null`, `{}` or `[]`); always passes
    Empty,
    Group {
        operator: LogicalOperator,
        conditions: Vec<RuleNode>,
    },
    Condition {
        field: String,
        comparison: Comparison,
        value: Option<Value>,
    },
    /// A node missing required keys; always fails
    Malformed { reason: String },
}

impl RuleNode {
    /// Parse the wire format. Never fails.
    pub fn parse(raw: &Value) -> Self {
        match raw {
            Value::Null => Self::Empty,
            Value::Array(items) if items.is_empty() => Self::Empty,
            Value::Object(map) if map.is_empty() => Self::Empty,
            Value::Object(map) => Self::parse_object(map),
            other => Self::malformed(format!("expected an object, found {}", kind_of(other))),
        }
    }

    fn parse_object(map: &Map<String, Value>) -> Self {
        if let Some(conditions) = map.get("conditions") {
            let operator = match map.get("operator") {
                None => return Self::malformed("group has no operator"),
                Some(Value::String(token)) => match LogicalOperator::from_token(token) {
                    Some(op) => op,
                    None => return Self::malformed(format!("unknown operator '{token}'")),
                },
                Some(other) => {
                    return Self::malformed(format!(
                        "operator must be a string, found {}",
                        kind_of(other)
                    ))
                }
            };
            let Value::Array(items) = conditions else {
                return Self::malformed("conditions must be an array");
            };
            let conditions = items.iter().map(Self::parse_child).collect();
            return Self::Group {
                operator,
                conditions,
            };
        }

        let field = match map.get("field") {
            Some(Value::String(f)) if !f.is_empty() => f.clone(),
            Some(_) => return Self::malformed("field must be a non-empty string"),
            None => return Self::malformed("node has neither 'conditions' nor 'field'"),
        };
        let comparison = match map.get("comparison") {
            Some(Value::String(c)) => Comparison::from_token(c),
            Some(_) => return Self::malformed("comparison must be a string"),
            None => return Self::malformed(format!("condition on '{field}' has no comparison")),
        };
        let value = map.get("value").cloned();
        if comparison.needs_value() && value.is_none() {
            return Self::malformed(format!("condition on '{field}' has no value"));
        }

        Self::Condition {
            field,
            comparison,
            value,
        }
    }

    // An empty child inside a group is a shape error, not an absent rule.
    fn parse_child(raw: &Value) -> Self {
        match Self::parse(raw) {
            Self::Empty => Self::malformed("empty condition inside a group"),
            node => node,
        }
    }

    fn malformed(reason: impl Into<String>) -> Self {
        Self::Malformed {
            reason: reason.into(),
        }
    }

    /// Encode back into the wire format
    pub fn to_value(&self) -> Value {
        match self {
            Self::Empty => Value::Null,
            Self::Group {
                operator,
                conditions,
            } => json!({
                "operator": operator.token(),
                "conditions": conditions.iter().map(Self::to_value).collect::<Vec<_>>(),
            }),
            Self::Condition {
                field,
                comparison,
                value,
            } => {
                let mut map = Map::new();
                map.insert("field".into(), Value::String(field.clone()));
                map.insert("comparison".into(), Value::String(comparison.token().into()));
                if let Some(v) = value {
                    map.insert("value".into(), v.clone());
                }
                Value::Object(map)
            }
            Self::Malformed { .. } => Value::Object(Map::new()),
        }
    }

    pub fn is_malformed(&self) -> bool {
        matches!(self, Self::Malformed { .. })
    }

    // ── Builders ─────────────────────────────────────────────────────

    pub fn and(conditions: Vec<RuleNode>) -> Self {
        Self::Group {
            operator: LogicalOperator::And,
            conditions,
        }
    }

    pub fn or(conditions: Vec<RuleNode>) -> Self {
        Self::Group {
            operator: LogicalOperator::Or,
            conditions,
        }
    }

    pub fn condition(field: impl Into<String>, comparison: &str, value: Value) -> Self {
        Self::Condition {
            field: field.into(),
            comparison: Comparison::from_token(comparison),
            value: Some(value),
        }
    }

    pub fn is_null(field: impl Into<String>) -> Self {
        Self::Condition {
            field: field.into(),
            comparison: Comparison::IsNull,
            value: None,
        }
    }
}

pub(crate) fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
