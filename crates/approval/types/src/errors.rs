//! Error types for the approval layer
//!
//! A [`Rejection`] is an expected refusal (wrong status, stale step,
//! ineligible actor) and never comes with a state change. Every other
//! [`ApprovalError`] variant is a hard failure and the operation was not applied.

use crate::{InstanceId, InstanceStatus, StepId, UserId, WorkflowId};

/// Precondition failures. `Display` is the message shown to the person who
/// clicked Approve/Reject.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum Rejection {
    #[error("instance must be pending to submit (currently {0})")]
    NotPending(InstanceStatus),

    #[error("instance is not awaiting approval (currently {0})")]
    NotInProgress(InstanceStatus),

    #[error("instance is not awaiting changes (currently {0})")]
    NotAwaitingChanges(InstanceStatus),

    #[error("instance is already {0}")]
    AlreadyTerminal(InstanceStatus),

    #[error("step already advanced: '{given}' is not the current step")]
    StaleStep {
        given: StepId,
        current: Option<StepId>,
    },

    #[error("'{actor}' is not an eligible approver for step '{step}'")]
    NotEligible { actor: UserId, step: StepId },

    #[error("'{actor}' has already approved step '{step}'")]
    AlreadyApproved { actor: UserId, step: StepId },

    #[error("workflow has no applicable step to submit into")]
    NoApplicableStep,

    #[error("invalid transition: {from} -> {to}")]
    InvalidTransition {
        from: InstanceStatus,
        to: InstanceStatus,
    },
}

/// Storage-layer errors
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum StorageError {
    #[error("record not found: {0}")]
    NotFound(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("invariant violation: {0}")]
    InvariantViolation(String),

    #[error("backend error: {0}")]
    Backend(String),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Identity directory errors
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum DirectoryError {
    #[error("directory unavailable: {0}")]
    Unavailable(String),

    #[error("lock error")]
    LockError,
}

/// Result type for directory lookups
pub type DirectoryResult<T> = Result<T, DirectoryError>;

/// Errors that can occur in approval operations
#[derive(Debug, thiserror::Error)]
pub enum ApprovalError {
    #[error(transparent)]
    Rejected(#[from] Rejection),

    #[error("Workflow definition not found: {0}")]
    DefinitionNotFound(WorkflowId),

    #[error("Workflow instance not found: {0}")]
    InstanceNotFound(InstanceId),

    #[error("Step not found: {0}")]
    StepNotFound(StepId),

    #[error("Workflow validation error: {0}")]
    Validation(String),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Directory error: {0}")]
    Directory(#[from] DirectoryError),
}

impl ApprovalError {
    /// True for expected precondition refusals (no state was changed)
    pub fn is_rejection(&self) -> bool {
        matches!(self, Self::Rejected(_))
    }

    pub fn rejection(&self) -> Option<&Rejection> {
        match self {
            Self::Rejected(r) => Some(r),
            _ => None,
        }
    }
}

/// Result type alias for approval operations
pub type ApprovalResult<T> = Result<T, ApprovalError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejection_messages_are_specific() {
        let stale = Rejection::StaleStep {
            given: StepId::new("s1"),
            current: Some(StepId::new("s2")),
        };
        assert_eq!(
            stale.to_string(),
            "step already advanced: 's1' is not the current step"
        );

        let err: ApprovalError = Rejection::NotEligible {
            actor: UserId::new("bob"),
            step: StepId::new("s1"),
        }
        .into();
        assert!(err.is_rejection());
        assert_eq!(
            err.to_string(),
            "'bob' is not an eligible approver for step 's1'"
        );
    }

    #[test]
    fn test_storage_error_is_not_rejection() {
        let err: ApprovalError = StorageError::Conflict("version".into()).into();
        assert!(!err.is_rejection());
        assert!(err.rejection().is_none());
    }
}
