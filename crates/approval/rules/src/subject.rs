//! Field resolution against the object a rule is evaluated for

use serde_json::{Map, Value};

/// Anything a rule can read fields from.
///
/// `attribute` reads a column of the object itself; `related` reads one
/// column of a directly associated object. Deeper traversal is not supported.
pub trait Subject {
    fn attribute(&self, name: &str) -> Option<Value>;

    fn related(&self, relation: &str, column: &str) -> Option<Value> {
        match self.attribute(relation)? {
            Value::Object(map) => map.get(column).cloned(),
            _ => None,
        }
    }
}

/// Resolve a field path (`column` or `relation.column`) to a value.
///
/// Anything that cannot be resolved is `Null`, never an error.
pub fn resolve_field<S: Subject + ?Sized>(subject: &S, path: &str) -> Value {
    let resolved = match path.split_once('.') {
        Some((relation, column)) => subject.related(relation, column),
        None => subject.attribute(path),
    };
    resolved.unwrap_or(Value::Null)
}

impl Subject for Map<String, Value> {
    fn attribute(&self, name: &str) -> Option<Value> {
        self.get(name).cloned()
    }
}

impl Subject for Value {
    fn attribute(&self, name: &str) -> Option<Value> {
        match self {
            Value::Object(map) => map.get(name).cloned(),
            _ => None,
        }
    }
}

impl<T: Subject + ?Sized> Subject for &T {
    fn attribute(&self, name: &str) -> Option<Value> {
        (**self).attribute(name)
    }

    fn related(&self, relation: &str, column: &str) -> Option<Value> {
        (**self).related(relation, column)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_resolve_plain_and_dotted() {
        let program = json!({
            "title": "River cleanup",
            "budget": 1200,
            "owner": {"department": "parks", "level": 3}
        });

        assert_eq!(resolve_field(&program, "budget"), json!(1200));
        assert_eq!(resolve_field(&program, "owner.department"), json!("parks"));
    }

    #[test]
    fn test_traversal_failures_resolve_to_null() {
        let program = json!({"title": "x", "owner": null, "tags": ["a"]});

        assert_eq!(resolve_field(&program, "missing"), Value::Null);
        assert_eq!(resolve_field(&program, "owner.department"), Value::Null);
        assert_eq!(resolve_field(&program, "nothere.department"), Value::Null);
        assert_eq!(resolve_field(&program, "tags.0"), Value::Null);
        assert_eq!(resolve_field(&program, "title.length"), Value::Null);
    }

    #[test]
    fn test_only_one_level_is_traversed() {
        let program = json!({"owner": {"manager": {"name": "Eve"}, "manager.name": "flat"}});
        // everything after the first dot is a single column name
        assert_eq!(resolve_field(&program, "owner.manager.name"), json!("flat"));
    }

    #[test]
    fn test_non_object_subject() {
        assert_eq!(resolve_field(&json!(42), "amount"), Value::Null);
    }
}
