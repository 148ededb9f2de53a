//! A plain JSON-backed approvable object

use crate::traits::Approvable;
use approval_rules::Subject;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// An approvable object described by its type, id and attribute document.
///
/// Relations are nested objects in `attributes`, so `vendor.country` reads
/// `attributes["vendor"]["country"]`. Has no completion hook.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ApprovableRecord {
    #[serde(rename = "type")]
    pub approvable_type: String,
    pub id: String,
    #[serde(default)]
    pub attributes: Value,
}

impl ApprovableRecord {
    pub fn new(
        approvable_type: impl Into<String>,
        id: impl Into<String>,
        attributes: Value,
    ) -> Self {
        Self {
            approvable_type: approvable_type.into(),
            id: id.into(),
            attributes,
        }
    }
}

impl Subject for ApprovableRecord {
    fn attribute(&self, name: &str) -> Option<Value> {
        self.attributes.attribute(name)
    }
}

#[async_trait]
impl Approvable for ApprovableRecord {
    fn approvable_type(&self) -> &str {
        &self.approvable_type
    }

    fn approvable_id(&self) -> String {
        self.id.clone()
    }
}
