//! Scenario files for `approvalctl simulate`
//!
//! A scenario bundles everything the in-memory engine needs: one workflow
//! definition, the directory of identities, the object under approval, who
//! submits it and the ordered events to replay.

use approval_engine::ApprovableRecord;
use approval_types::{ActionType, Identity, StepId, UserId, WorkflowDefinition};
use serde::Deserialize;
use serde_json::Value;

#[derive(Debug, Deserialize)]
pub struct Scenario {
    pub workflow: WorkflowDefinition,
    #[serde(default)]
    pub identities: Vec<Identity>,
    pub subject: ApprovableRecord,
    pub submitter: UserId,
    #[serde(default)]
    pub events: Vec<ScenarioEvent>,
}

/// One replayed operation
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum ScenarioEvent {
    Submit,
    Resubmit,
    Approve(Decision),
    Reject(Decision),
    RequestChanges(Decision),
    Cancel { actor: UserId },
}

/// An approver's decision. Without `step` the instance's current step is used.
#[derive(Debug, Clone, Deserialize)]
pub struct Decision {
    pub actor: UserId,
    #[serde(default)]
    pub step: Option<StepId>,
    #[serde(default)]
    pub comments: Option<String>,
    #[serde(default)]
    pub metadata: Option<Value>,
}

impl ScenarioEvent {
    pub fn label(&self) -> String {
        match self {
            Self::Submit => "submit".into(),
            Self::Resubmit => "resubmit".into(),
            Self::Approve(d) => format!("approve by {}", d.actor),
            Self::Reject(d) => format!("reject by {}", d.actor),
            Self::RequestChanges(d) => format!("request_changes by {}", d.actor),
            Self::Cancel { actor } => format!("cancel by {actor}"),
        }
    }

    /// The decision carried by an approver event
    pub fn decision(&self) -> Option<(ActionType, &Decision)> {
        match self {
            Self::Approve(d) => Some((ActionType::Approve, d)),
            Self::Reject(d) => Some((ActionType::Reject, d)),
            Self::RequestChanges(d) => Some((ActionType::RequestChanges, d)),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_scenario() {
        let scenario: Scenario = serde_json::from_value(json!({
            "workflow": {
                "id": "wf-1",
                "name": "Purchase approval",
                "model_type": "purchase_order",
                "is_active": true,
                "steps": [
                    {"id": "review", "order": 1, "approver_type": "role", "approver_identifiers": ["reviewer"]}
                ]
            },
            "identities": [{"id": "rita", "name": "Rita", "roles": ["reviewer"]}],
            "subject": {"type": "purchase_order", "id": "po-7", "attributes": {"amount": 10}},
            "submitter": "alice",
            "events": [
                {"op": "submit"},
                {"op": "approve", "actor": "rita", "comments": "fine"},
                {"op": "cancel", "actor": "alice"}
            ]
        }))
        .unwrap();

        assert_eq!(scenario.workflow.steps.len(), 1);
        assert_eq!(scenario.events.len(), 3);
        let (kind, decision) = scenario.events[1].decision().unwrap();
        assert_eq!(kind, ActionType::Approve);
        assert_eq!(decision.actor, UserId::new("rita"));
        assert!(decision.step.is_none());
        assert_eq!(scenario.events[2].label(), "cancel by alice");
    }

    #[test]
    fn test_unknown_op_is_an_error() {
        let parsed: Result<ScenarioEvent, _> = serde_json::from_value(json!({"op": "escalate"}));
        assert!(parsed.is_err());
    }
}
