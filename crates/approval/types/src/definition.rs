//! Workflow definitions: the ordered steps an approvable object walks through
//!
//! Definitions are authored elsewhere and handed to the engine read-only.
//! The step `order` values define the sequence; they must be unique within a
//! definition but need not be contiguous.

use crate::{ApprovalError, ApprovalResult, StepId, WorkflowId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;

// ── Workflow Definition ──────────────────────────────────────────────

/// A workflow definition governing one kind of approvable object
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct WorkflowDefinition {
    /// Unique identifier
    pub id: WorkflowId,
    /// Human-readable name
    pub name: String,
    /// The kind of object this workflow governs (e.g. "budget_commitment")
    pub model_type: String,
    /// At most one definition is active per model type
    #[serde(default)]
    pub is_active: bool,
    /// Steps, in any order; use [`WorkflowDefinition::ordered_steps`]
    #[serde(default)]
    pub steps: Vec<Step>,
    /// When this definition was created
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
}

impl WorkflowDefinition {
    /// Create an inactive definition with no steps
    pub fn new(name: impl Into<String>, model_type: impl Into<String>) -> Self {
        Self {
            id: WorkflowId::generate(),
            name: name.into(),
            model_type: model_type.into(),
            is_active: false,
            steps: Vec::new(),
            created_at: Utc::now(),
        }
    }

    pub fn with_id(mut self, id: impl Into<WorkflowId>) -> Self {
        self.id = id.into();
        self
    }

    pub fn active(mut self) -> Self {
        self.is_active = true;
        self
    }

    /// Add a step, rejecting duplicate ids and duplicate order values
    pub fn add_step(&mut self, step: Step) -> ApprovalResult<()> {
        if self.steps.iter().any(|s| s.id == step.id) {
            return Err(ApprovalError::Validation(format!(
                "duplicate step id '{}'",
                step.id
            )));
        }
        if self.steps.iter().any(|s| s.order == step.order) {
            return Err(ApprovalError::Validation(format!(
                "duplicate step order {} (step '{}')",
                step.order, step.id
            )));
        }
        step.validate()?;
        self.steps.push(step);
        Ok(())
    }

    /// Builder-style [`WorkflowDefinition::add_step`]
    pub fn with_step(mut self, step: Step) -> ApprovalResult<Self> {
        self.add_step(step)?;
        Ok(self)
    }

    /// Validate the whole definition
    pub fn validate(&self) -> ApprovalResult<()> {
        if self.steps.is_empty() {
            return Err(ApprovalError::Validation(format!(
                "workflow '{}' has no steps",
                self.name
            )));
        }

        let mut ids = HashSet::new();
        let mut orders = HashSet::new();
        for step in &self.steps {
            if !ids.insert(&step.id) {
                return Err(ApprovalError::Validation(format!(
                    "duplicate step id '{}'",
                    step.id
                )));
            }
            if !orders.insert(step.order) {
                return Err(ApprovalError::Validation(format!(
                    "duplicate step order {}",
                    step.order
                )));
            }
            step.validate()?;
        }
        Ok(())
    }

    /// Steps sorted by ascending `order`
    pub fn ordered_steps(&self) -> Vec<Step> {
        let mut steps = self.steps.clone();
        steps.sort_by_key(|s| s.order);
        steps
    }

    /// Look up a step by id
    pub fn step(&self, id: &StepId) -> Option<&Step> {
        self.steps.iter().find(|s| &s.id == id)
    }

    /// The first step whose order is strictly greater than `order`
    pub fn step_after(&self, order: i32) -> Option<&Step> {
        self.steps
            .iter()
            .filter(|s| s.order > order)
            .min_by_key(|s| s.order)
    }

    pub fn step_count(&self) -> usize {
        self.steps.len()
    }
}

// ── Step ─────────────────────────────────────────────────────────────

/// One stage of a workflow definition
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Step {
    pub id: StepId,
    #[serde(default)]
    pub name: String,
    /// Position in the sequence; unique per workflow
    pub order: i32,
    #[serde(default)]
    pub purpose: StepPurpose,
    #[serde(rename = "type", default)]
    pub step_type: StepType,
    /// Quorum for parallel steps; sequential steps advance on the first approval
    #[serde(default = "default_required_approvals")]
    pub required_approval_count: u32,
    pub approver_type: ApproverType,
    /// User ids, role names or permission names, per `approver_type`
    #[serde(default)]
    pub approver_identifiers: Vec<String>,
    /// Applicability condition in the rule-tree wire format. Kept as raw JSON
    /// so stored configurations round-trip unchanged.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conditional_rules: Option<Value>,
}

fn default_required_approvals() -> u32 {
    1
}

impl Step {
    /// A sequential approval step with no approvers yet
    pub fn approval(id: impl Into<StepId>, order: i32, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            order,
            purpose: StepPurpose::Approval,
            step_type: StepType::Sequential,
            required_approval_count: 1,
            approver_type: ApproverType::Role,
            approver_identifiers: Vec::new(),
            conditional_rules: None,
        }
    }

    /// A step that is never auto-skipped for self-approval
    pub fn action(id: impl Into<StepId>, order: i32, name: impl Into<String>) -> Self {
        Self {
            purpose: StepPurpose::Action,
            ..Self::approval(id, order, name)
        }
    }

    /// Make this a parallel step requiring `required` distinct approvals
    pub fn parallel(mut self, required: u32) -> Self {
        self.step_type = StepType::Parallel;
        self.required_approval_count = required;
        self
    }

    pub fn approved_by_users<I, S>(mut self, users: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.approver_type = ApproverType::User;
        self.approver_identifiers = users.into_iter().map(Into::into).collect();
        self
    }

    pub fn approved_by_roles<I, S>(mut self, roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.approver_type = ApproverType::Role;
        self.approver_identifiers = roles.into_iter().map(Into::into).collect();
        self
    }

    pub fn approved_by_permissions<I, S>(mut self, permissions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.approver_type = ApproverType::Permission;
        self.approver_identifiers = permissions.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_rules(mut self, rules: Value) -> Self {
        self.conditional_rules = Some(rules);
        self
    }

    pub fn is_parallel(&self) -> bool {
        self.step_type == StepType::Parallel
    }

    /// Approvals needed before this step advances.
    ///
    /// Sequential steps always need exactly one, whatever is configured.
    pub fn approvals_needed(&self) -> u32 {
        match self.step_type {
            StepType::Sequential => 1,
            StepType::Parallel => self.required_approval_count.max(1),
        }
    }

    pub fn validate(&self) -> ApprovalResult<()> {
        if self.required_approval_count == 0 {
            return Err(ApprovalError::Validation(format!(
                "step '{}' requires at least one approval",
                self.id
            )));
        }
        Ok(())
    }

    /// Label used in logs and audit messages
    pub fn label(&self) -> String {
        if self.name.is_empty() {
            self.id.to_string()
        } else {
            format!("{} ({})", self.name, self.id)
        }
    }
}

/// Whether a step may be auto-skipped
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum StepPurpose {
    /// Subject to self-approval skipping
    #[default]
    Approval,
    /// Always executes
    Action,
}

/// Quorum mode of a step
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum StepType {
    /// One approval advances the step
    #[default]
    Sequential,
    /// `required_approval_count` distinct approvals advance the step
    Parallel,
}

/// How `approver_identifiers` are interpreted.
///
/// Persisted configurations can carry values this build does not know
/// (old or hand-edited data); those deserialize to `Unknown` and never
/// authorize anyone.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ApproverType {
    User,
    Role,
    Permission,
    Unknown(String),
}

impl ApproverType {
    pub fn as_str(&self) -> &str {
        match self {
            Self::User => "user",
            Self::Role => "role",
            Self::Permission => "permission",
            Self::Unknown(raw) => raw,
        }
    }
}

impl From<String> for ApproverType {
    fn from(raw: String) -> Self {
        match raw.to_ascii_lowercase().as_str() {
            "user" | "users" => Self::User,
            "role" | "roles" => Self::Role,
            "permission" | "permissions" => Self::Permission,
            _ => Self::Unknown(raw),
        }
    }
}

impl From<ApproverType> for String {
    fn from(kind: ApproverType) -> Self {
        kind.as_str().to_string()
    }
}

impl std::fmt::Display for ApproverType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn make_definition() -> WorkflowDefinition {
        WorkflowDefinition::new("Budget Commitment", "budget_commitment")
            .with_step(Step::approval("s2", 20, "Finance").approved_by_roles(["finance"]))
            .unwrap()
            .with_step(Step::approval("s1", 10, "Manager").approved_by_roles(["manager"]))
            .unwrap()
    }

    #[test]
    fn test_ordered_steps() {
        let def = make_definition();
        let ordered = def.ordered_steps();
        assert_eq!(ordered[0].id, StepId::new("s1"));
        assert_eq!(ordered[1].id, StepId::new("s2"));
    }

    #[test]
    fn test_step_after() {
        let def = make_definition();
        assert_eq!(def.step_after(i32::MIN).unwrap().id, StepId::new("s1"));
        assert_eq!(def.step_after(10).unwrap().id, StepId::new("s2"));
        assert_eq!(def.step_after(15).unwrap().id, StepId::new("s2"));
        assert!(def.step_after(20).is_none());
    }

    #[test]
    fn test_duplicate_order_rejected() {
        let mut def = make_definition();
        let result = def.add_step(Step::approval("s3", 10, "Dup"));
        assert!(matches!(result, Err(ApprovalError::Validation(_))));
    }

    #[test]
    fn test_duplicate_id_rejected() {
        let mut def = make_definition();
        let result = def.add_step(Step::approval("s1", 30, "Dup"));
        assert!(matches!(result, Err(ApprovalError::Validation(_))));
    }

    #[test]
    fn test_empty_definition_invalid() {
        let def = WorkflowDefinition::new("Empty", "payment");
        assert!(def.validate().is_err());
        assert!(make_definition().validate().is_ok());
    }

    #[test]
    fn test_zero_quorum_rejected() {
        let step = Step::approval("p", 1, "Panel").parallel(0);
        assert!(step.validate().is_err());
    }

    #[test]
    fn test_sequential_needs_one_approval_regardless_of_count() {
        let mut step = Step::approval("s", 1, "Seq");
        step.required_approval_count = 3;
        assert_eq!(step.approvals_needed(), 1);
        assert_eq!(step.parallel(3).approvals_needed(), 3);
    }

    #[test]
    fn test_unknown_approver_type_round_trips() {
        let raw = json!({
            "id": "legacy",
            "order": 1,
            "approver_type": "department_head",
            "approver_identifiers": ["42"]
        });
        let step: Step = serde_json::from_value(raw).unwrap();
        assert_eq!(
            step.approver_type,
            ApproverType::Unknown("department_head".into())
        );
        assert_eq!(step.step_type, StepType::Sequential);
        assert_eq!(step.required_approval_count, 1);

        let back = serde_json::to_value(&step).unwrap();
        assert_eq!(back["approver_type"], json!("department_head"));
    }

    #[test]
    fn test_conditional_rules_preserved_verbatim() {
        let rules = json!({"operator": "AND", "conditions": [
            {"field": "amount", "comparison": ">=", "value": 10000}
        ]});
        let step = Step::approval("s", 1, "Big").with_rules(rules.clone());
        let encoded = serde_json::to_value(&step).unwrap();
        assert_eq!(encoded["conditional_rules"], rules);
        assert_eq!(encoded["type"], json!("sequential"));
    }
}
