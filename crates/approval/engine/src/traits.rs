//! Collaborator interfaces
//!
//! The engine owns no persistence, identity data or delivery channel. Each
//! of those is injected behind one of these traits.

use approval_rules::Subject;
use approval_types::{
    ApprovalAction, ApprovalEvent, ApprovalInstance, AuditEntry, DirectoryResult, Identity,
    InstanceId, StepId, StorageResult, Step, UserId, WorkflowDefinition, WorkflowId,
};
use async_trait::async_trait;

/// Read access to workflow definitions
#[async_trait]
pub trait WorkflowRepository: Send + Sync {
    async fn get_workflow(&self, id: &WorkflowId) -> StorageResult<Option<WorkflowDefinition>>;

    /// Steps sorted by ascending order; empty for an unknown workflow
    async fn get_steps_ordered(&self, id: &WorkflowId) -> StorageResult<Vec<Step>> {
        Ok(self
            .get_workflow(id)
            .await?
            .map(|definition| definition.ordered_steps())
            .unwrap_or_default())
    }

    /// The first step whose order is strictly greater than `order`
    async fn get_step_after(&self, id: &WorkflowId, order: i32) -> StorageResult<Option<Step>> {
        Ok(self
            .get_steps_ordered(id)
            .await?
            .into_iter()
            .find(|step| step.order > order))
    }
}

/// Everything one engine operation writes, applied atomically.
///
/// `expected_version` is `None` for a new instance; otherwise the commit
/// fails with [`approval_types::StorageError::Conflict`] unless the stored
/// instance is still at that version.
#[derive(Clone, Debug)]
pub struct InstanceCommit {
    pub instance: ApprovalInstance,
    pub expected_version: Option<u64>,
    pub action: Option<ApprovalAction>,
    pub audit: Vec<AuditEntry>,
}

impl InstanceCommit {
    /// Insert a new instance
    pub fn create(instance: ApprovalInstance) -> Self {
        Self {
            instance,
            expected_version: None,
            action: None,
            audit: Vec::new(),
        }
    }

    /// Update an instance read at `version`
    pub fn update(instance: ApprovalInstance, version: u64) -> Self {
        Self {
            instance,
            expected_version: Some(version),
            action: None,
            audit: Vec::new(),
        }
    }

    pub fn with_action(mut self, action: ApprovalAction) -> Self {
        self.action = Some(action);
        self
    }

    pub fn with_audit(mut self, entries: Vec<AuditEntry>) -> Self {
        self.audit = entries;
        self
    }
}

/// Transactional storage for instances, actions and audit entries
#[async_trait]
pub trait InstanceStore: Send + Sync {
    async fn get_instance(&self, id: &InstanceId) -> StorageResult<Option<ApprovalInstance>>;

    /// Apply a commit atomically and return the stored instance with its
    /// new version. Nothing is written if any part fails.
    async fn commit(&self, commit: InstanceCommit) -> StorageResult<ApprovalInstance>;

    /// Actions recorded for an instance, oldest first
    async fn actions_for(&self, id: &InstanceId) -> StorageResult<Vec<ApprovalAction>>;

    /// `Approve` actions on `step` within submission `round`
    async fn count_approvals(
        &self,
        id: &InstanceId,
        step: &StepId,
        round: u32,
    ) -> StorageResult<u32>;

    /// Audit entries for an instance, in sequence order
    async fn audit_for(&self, id: &InstanceId) -> StorageResult<Vec<AuditEntry>>;

    /// Actors who approved `step` within `round`
    async fn approvers_of(
        &self,
        id: &InstanceId,
        step: &StepId,
        round: u32,
    ) -> StorageResult<Vec<UserId>> {
        Ok(self
            .actions_for(id)
            .await?
            .into_iter()
            .filter(|a| a.is_approval() && &a.step_id == step && a.round == round)
            .map(|a| a.actor_id)
            .collect())
    }
}

/// Read-only view of users, roles and permissions
#[async_trait]
pub trait IdentityDirectory: Send + Sync {
    async fn users_by_id(&self, ids: &[String]) -> DirectoryResult<Vec<Identity>>;

    async fn users_with_role(&self, roles: &[String]) -> DirectoryResult<Vec<Identity>>;

    async fn users_with_permission(&self, permissions: &[String])
        -> DirectoryResult<Vec<Identity>>;

    async fn has_any_role(&self, user: &UserId, roles: &[String]) -> DirectoryResult<bool>;

    async fn has_any_permission(
        &self,
        user: &UserId,
        permissions: &[String],
    ) -> DirectoryResult<bool>;
}

/// Notification delivery failure
#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("delivery failed: {0}")]
    Delivery(String),

    #[error("notifier unavailable: {0}")]
    Unavailable(String),
}

/// Receives engine events after they are committed
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(
        &self,
        recipients: &[Identity],
        event: ApprovalEvent,
        instance: &ApprovalInstance,
    ) -> Result<(), NotifyError>;
}

/// Completion hook failure
#[derive(Debug, thiserror::Error)]
#[error("completion hook failed: {0}")]
pub struct HookError(pub String);

/// A business object that can be taken through a workflow
#[async_trait]
pub trait Approvable: Subject + Send + Sync {
    /// Kind of object; must match the workflow's model type
    fn approvable_type(&self) -> &str;

    fn approvable_id(&self) -> String;

    /// Called once, after the instance is committed as Approved
    async fn on_approved(&self, _instance: &ApprovalInstance) -> Result<(), HookError> {
        Ok(())
    }
}
