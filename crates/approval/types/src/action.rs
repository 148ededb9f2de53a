//! Approval actions: the immutable record of one decision

use crate::{ActionId, InstanceId, StepId, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The decision an approver takes on the current step
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionType {
    Approve,
    Reject,
    RequestChanges,
}

impl ActionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Approve => "approve",
            Self::Reject => "reject",
            Self::RequestChanges => "request_changes",
        }
    }
}

impl std::fmt::Display for ActionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One recorded decision. Never updated or deleted after creation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ApprovalAction {
    pub id: ActionId,
    pub instance_id: InstanceId,
    pub step_id: StepId,
    pub action_type: ActionType,
    pub actor_id: UserId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comments: Option<String>,
    #[serde(default)]
    pub metadata: Value,
    /// Submission round of the instance when the action was taken
    pub round: u32,
    pub created_at: DateTime<Utc>,
}

impl ApprovalAction {
    pub fn new(
        instance_id: InstanceId,
        step_id: StepId,
        action_type: ActionType,
        actor_id: UserId,
        round: u32,
    ) -> Self {
        Self {
            id: ActionId::generate(),
            instance_id,
            step_id,
            action_type,
            actor_id,
            comments: None,
            metadata: Value::Null,
            round,
            created_at: Utc::now(),
        }
    }

    pub fn with_comments(mut self, comments: Option<String>) -> Self {
        self.comments = comments;
        self
    }

    pub fn with_metadata(mut self, metadata: Option<Value>) -> Self {
        self.metadata = metadata.unwrap_or(Value::Null);
        self
    }

    pub fn is_approval(&self) -> bool {
        self.action_type == ActionType::Approve
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_action_serde() {
        let action = ApprovalAction::new(
            InstanceId::new("inst-1"),
            StepId::new("s1"),
            ActionType::RequestChanges,
            UserId::new("carol"),
            2,
        )
        .with_comments(Some("budget line 4 is missing".into()))
        .with_metadata(Some(json!({"ip": "10.0.0.8"})));

        let encoded = serde_json::to_value(&action).unwrap();
        assert_eq!(encoded["action_type"], json!("request_changes"));
        assert_eq!(encoded["round"], json!(2));

        let decoded: ApprovalAction = serde_json::from_value(encoded).unwrap();
        assert_eq!(decoded, action);
        assert!(!decoded.is_approval());
    }
}
