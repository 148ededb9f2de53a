//! Identifiers for approval records
//!
//! All identifiers are opaque strings. Generated ones are UUID v4; callers
//! that already own an id (a database key, a user name) wrap it with `new`.

use serde::{Deserialize, Serialize};

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            pub fn generate() -> Self {
                Self(uuid::Uuid::new_v4().to_string())
            }

            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }

            pub fn short(&self) -> &str {
                self.0.get(..8).unwrap_or(&self.0)
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self(id.to_string())
            }
        }

        impl From<String> for $name {
            fn from(id: String) -> Self {
                Self(id)
            }
        }
    };
}

string_id!(
    /// Unique identifier for a workflow definition
    WorkflowId
);

string_id!(
    /// Unique identifier for a step within a workflow definition
    StepId
);

string_id!(
    /// Unique identifier for a workflow instance
    InstanceId
);

string_id!(
    /// Unique identifier for a recorded approval action
    ActionId
);

string_id!(
    /// Identity of a user in the external directory
    UserId
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_ids_are_unique() {
        let a = InstanceId::generate();
        let b = InstanceId::generate();
        assert_ne!(a, b);
        assert!(a.short().len() <= 8);
    }

    #[test]
    fn test_display_and_serde_are_transparent() {
        let id = StepId::new("manager-review");
        assert_eq!(id.to_string(), "manager-review");
        assert_eq!(
            serde_json::to_string(&id).unwrap(),
            "\"manager-review\"".to_string()
        );
        let back: StepId = serde_json::from_str("\"manager-review\"").unwrap();
        assert_eq!(back, id);
    }
}
