//! Notification events and audit entries
//!
//! [`ApprovalEvent`] is what the notifier receives; [`AuditEntry`] is what the
//! store records, in the same commit as the state change it describes.

use crate::{InstanceId, StepId, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Events emitted to the notifier
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalEvent {
    /// Approvers of the first step have work waiting
    Submitted,
    /// Approvers of a later step have work waiting
    StepAdvanced,
    Approved,
    Rejected,
    ChangesRequested,
    Cancelled,
}

impl ApprovalEvent {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Submitted => "submitted",
            Self::StepAdvanced => "step_advanced",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
            Self::ChangesRequested => "changes_requested",
            Self::Cancelled => "cancelled",
        }
    }
}

impl std::fmt::Display for ApprovalEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kinds of audit entries
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditKind {
    Initialized,
    Submitted,
    Resubmitted,
    StepSkipped,
    ActionRecorded,
    StepAdvanced,
    Approved,
    Rejected,
    ChangesRequested,
    Cancelled,
}

/// One audit trail entry
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AuditEntry {
    /// Assigned by the store, monotonically increasing per store
    #[serde(default)]
    pub sequence: u64,
    pub instance_id: InstanceId,
    pub kind: AuditKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub step_id: Option<StepId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actor_id: Option<UserId>,
    pub message: String,
    pub at: DateTime<Utc>,
}

impl AuditEntry {
    pub fn new(instance_id: InstanceId, kind: AuditKind, message: impl Into<String>) -> Self {
        Self {
            sequence: 0,
            instance_id,
            kind,
            step_id: None,
            actor_id: None,
            message: message.into(),
            at: Utc::now(),
        }
    }

    pub fn with_step(mut self, step_id: StepId) -> Self {
        self.step_id = Some(step_id);
        self
    }

    pub fn with_actor(mut self, actor_id: UserId) -> Self {
        self.actor_id = Some(actor_id);
        self
    }
}
