//! Approval instances: one run of a workflow against one approvable object
//!
//! The status machine:
//!
//! ```text
//! Pending ──submit──▶ InProgress ──▶ Approved | Rejected | Cancelled
//!    │                  │    ▲
//!    │                  ▼    │ resubmit
//!    │            ChangesRequested
//!    └──────────────▶ Cancelled
//! ```
//!
//! Cancellation is only possible from Pending and InProgress.
//!
//! Transition methods check the table before mutating, so an instance value
//! can never be driven into an invalid state.

use crate::{InstanceId, Rejection, StepId, UserId, WorkflowId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ── Instance Status ──────────────────────────────────────────────────

/// Lifecycle status of an approval instance
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum InstanceStatus {
    /// Created, not yet submitted
    #[default]
    Pending,
    /// Waiting on the approvers of the current step
    InProgress,
    /// Every applicable step approved
    Approved,
    /// Rejected at some step
    Rejected,
    /// Sent back to the submitter; may be resubmitted
    ChangesRequested,
    /// Withdrawn before completion
    Cancelled,
}

impl InstanceStatus {
    /// Approved, Rejected and Cancelled admit no further transition
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Approved | Self::Rejected | Self::Cancelled)
    }

    /// The full transition table
    pub fn can_transition_to(&self, next: InstanceStatus) -> bool {
        use InstanceStatus::*;
        matches!(
            (self, next),
            (Pending, InProgress)
                | (Pending, Cancelled)
                | (InProgress, InProgress)
                | (InProgress, Approved)
                | (InProgress, Rejected)
                | (InProgress, ChangesRequested)
                | (InProgress, Cancelled)
                | (ChangesRequested, InProgress)
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::InProgress => "in_progress",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
            Self::ChangesRequested => "changes_requested",
            Self::Cancelled => "cancelled",
        }
    }
}

impl std::fmt::Display for InstanceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── Approval Instance ────────────────────────────────────────────────

/// A run of a workflow against one approvable object
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ApprovalInstance {
    pub id: InstanceId,
    pub workflow_id: WorkflowId,
    /// Kind of the approvable object (matches the definition's model type)
    pub approvable_type: String,
    pub approvable_id: String,
    pub status: InstanceStatus,
    /// The user whose request this is; self-approval skipping is judged
    /// against this identity
    pub submitted_by: UserId,
    /// Set if and only if `status` is `InProgress`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_step_id: Option<StepId>,
    /// Submission round, incremented on every submit and resubmit.
    /// Quorum only counts approvals from the current round.
    #[serde(default)]
    pub round: u32,
    /// Optimistic concurrency version, assigned by the store
    #[serde(default)]
    pub version: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub submitted_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

impl ApprovalInstance {
    /// Create a pending instance
    pub fn new(
        workflow_id: WorkflowId,
        approvable_type: impl Into<String>,
        approvable_id: impl Into<String>,
        submitted_by: UserId,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: InstanceId::generate(),
            workflow_id,
            approvable_type: approvable_type.into(),
            approvable_id: approvable_id.into(),
            status: InstanceStatus::Pending,
            submitted_by,
            current_step_id: None,
            round: 0,
            version: 0,
            created_at: now,
            updated_at: now,
            submitted_at: None,
            completed_at: None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    pub fn is_in_progress(&self) -> bool {
        self.status == InstanceStatus::InProgress
    }

    /// `current_step_id` is set exactly when the instance is in progress
    pub fn step_invariant_holds(&self) -> bool {
        self.current_step_id.is_some() == self.is_in_progress()
    }

    fn transition(&mut self, next: InstanceStatus, now: DateTime<Utc>) -> Result<(), Rejection> {
        if !self.status.can_transition_to(next) {
            return Err(if self.status.is_terminal() {
                Rejection::AlreadyTerminal(self.status)
            } else {
                Rejection::InvalidTransition {
                    from: self.status,
                    to: next,
                }
            });
        }
        self.status = next;
        self.updated_at = now;
        Ok(())
    }

    /// Start a new submission round on `step` (submit and resubmit)
    pub fn begin_round(
        &mut self,
        step: StepId,
        submitter: UserId,
        now: DateTime<Utc>,
    ) -> Result<(), Rejection> {
        if self.is_in_progress() {
            return Err(Rejection::InvalidTransition {
                from: self.status,
                to: InstanceStatus::InProgress,
            });
        }
        self.transition(InstanceStatus::InProgress, now)?;
        self.current_step_id = Some(step);
        self.submitted_by = submitter;
        self.submitted_at = Some(now);
        self.completed_at = None;
        self.round += 1;
        Ok(())
    }

    /// Move to the next step within the current round
    pub fn advance_to(&mut self, step: StepId, now: DateTime<Utc>) -> Result<(), Rejection> {
        if !self.is_in_progress() {
            return Err(Rejection::NotInProgress(self.status));
        }
        self.transition(InstanceStatus::InProgress, now)?;
        self.current_step_id = Some(step);
        Ok(())
    }

    /// Finish as Approved, Rejected or Cancelled
    pub fn finish(&mut self, status: InstanceStatus, now: DateTime<Utc>) -> Result<(), Rejection> {
        if !status.is_terminal() {
            return Err(Rejection::InvalidTransition {
                from: self.status,
                to: status,
            });
        }
        self.transition(status, now)?;
        self.current_step_id = None;
        self.completed_at = Some(now);
        Ok(())
    }

    /// Send back to the submitter
    pub fn request_changes(&mut self, now: DateTime<Utc>) -> Result<(), Rejection> {
        self.transition(InstanceStatus::ChangesRequested, now)?;
        self.current_step_id = None;
        Ok(())
    }

    /// Seconds from submission to completion, if both are known
    pub fn turnaround_secs(&self) -> Option<i64> {
        match (self.submitted_at, self.completed_at) {
            (Some(start), Some(end)) => Some(end.signed_duration_since(start).num_seconds()),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_instance() -> ApprovalInstance {
        ApprovalInstance::new(
            WorkflowId::new("wf-1"),
            "payment",
            "pay-77",
            UserId::new("alice"),
        )
    }

    #[test]
    fn test_new_instance_is_pending() {
        let inst = make_instance();
        assert_eq!(inst.status, InstanceStatus::Pending);
        assert!(inst.current_step_id.is_none());
        assert!(inst.step_invariant_holds());
        assert_eq!(inst.round, 0);
    }

    #[test]
    fn test_full_lifecycle() {
        let mut inst = make_instance();
        let now = Utc::now();

        inst.begin_round(StepId::new("s1"), UserId::new("alice"), now)
            .unwrap();
        assert!(inst.is_in_progress());
        assert_eq!(inst.round, 1);
        assert!(inst.step_invariant_holds());

        inst.advance_to(StepId::new("s2"), now).unwrap();
        assert_eq!(inst.current_step_id, Some(StepId::new("s2")));

        inst.finish(InstanceStatus::Approved, now).unwrap();
        assert!(inst.is_terminal());
        assert!(inst.completed_at.is_some());
        assert!(inst.step_invariant_holds());
        assert_eq!(inst.turnaround_secs(), Some(0));
    }

    #[test]
    fn test_changes_requested_round_trip() {
        let mut inst = make_instance();
        let now = Utc::now();
        inst.begin_round(StepId::new("s1"), UserId::new("alice"), now)
            .unwrap();
        inst.request_changes(now).unwrap();
        assert_eq!(inst.status, InstanceStatus::ChangesRequested);
        assert!(inst.step_invariant_holds());

        inst.begin_round(StepId::new("s1"), UserId::new("alice"), now)
            .unwrap();
        assert_eq!(inst.round, 2);
        assert!(inst.is_in_progress());
    }

    #[test]
    fn test_terminal_states_reject_everything() {
        for terminal in [
            InstanceStatus::Approved,
            InstanceStatus::Rejected,
            InstanceStatus::Cancelled,
        ] {
            let mut inst = make_instance();
            let now = Utc::now();
            inst.begin_round(StepId::new("s1"), UserId::new("alice"), now)
                .unwrap();
            inst.finish(terminal, now).unwrap();

            let before = inst.clone();
            assert_eq!(
                inst.finish(InstanceStatus::Cancelled, now),
                Err(Rejection::AlreadyTerminal(terminal))
            );
            assert!(inst
                .begin_round(StepId::new("s1"), UserId::new("alice"), now)
                .is_err());
            assert!(inst.request_changes(now).is_err());
            assert_eq!(inst, before);
        }
    }

    #[test]
    fn test_cannot_advance_pending() {
        let mut inst = make_instance();
        assert_eq!(
            inst.advance_to(StepId::new("s1"), Utc::now()),
            Err(Rejection::NotInProgress(InstanceStatus::Pending))
        );
    }

    #[test]
    fn test_cancel_from_pending() {
        let mut inst = make_instance();
        inst.finish(InstanceStatus::Cancelled, Utc::now()).unwrap();
        assert_eq!(inst.status, InstanceStatus::Cancelled);
    }

    #[test]
    fn test_transition_table() {
        use InstanceStatus::*;
        assert!(Pending.can_transition_to(InProgress));
        assert!(!Pending.can_transition_to(Approved));
        assert!(!Pending.can_transition_to(ChangesRequested));
        assert!(ChangesRequested.can_transition_to(InProgress));
        assert!(!ChangesRequested.can_transition_to(Approved));
        assert!(!ChangesRequested.can_transition_to(Cancelled));
        for terminal in [Approved, Rejected, Cancelled] {
            for next in [
                Pending,
                InProgress,
                Approved,
                Rejected,
                ChangesRequested,
                Cancelled,
            ] {
                assert!(!terminal.can_transition_to(next));
            }
        }
    }

    #[test]
    fn test_status_serde() {
        assert_eq!(
            serde_json::to_string(&InstanceStatus::ChangesRequested).unwrap(),
            "\"changes_requested\""
        );
        assert_eq!(InstanceStatus::InProgress.to_string(), "in_progress");
    }
}
