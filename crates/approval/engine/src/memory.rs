//! In-memory reference implementations of the collaborator traits.
//!
//! Deterministic and test-friendly. The instance store keeps every table
//! under one lock so a commit is all-or-nothing.

use crate::traits::{IdentityDirectory, InstanceCommit, InstanceStore, WorkflowRepository};
use approval_types::{
    ApprovalAction, ApprovalError, ApprovalInstance, ApprovalResult, AuditEntry, DirectoryError,
    DirectoryResult, Identity, InstanceId, StepId, StorageError, StorageResult, UserId,
    WorkflowDefinition, WorkflowId,
};
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::sync::RwLock;

// ── Workflow Repository ──────────────────────────────────────────────

/// Definition registry; at most one active definition per model type
#[derive(Default)]
pub struct InMemoryWorkflowRepository {
    definitions: RwLock<HashMap<WorkflowId, WorkflowDefinition>>,
}

impl InMemoryWorkflowRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate and register a definition. Registering an active definition
    /// deactivates any other active one for the same model type.
    pub fn register(&self, definition: WorkflowDefinition) -> ApprovalResult<WorkflowId> {
        definition.validate()?;

        let mut guard = self.write()?;
        if guard.contains_key(&definition.id) {
            return Err(ApprovalError::Validation(format!(
                "workflow '{}' is already registered",
                definition.id
            )));
        }

        let id = definition.id.clone();
        if definition.is_active {
            deactivate_model_type(&mut guard, &definition.model_type);
        }
        tracing::info!(
            workflow_id = %id,
            model_type = %definition.model_type,
            active = definition.is_active,
            steps = definition.step_count(),
            "Workflow definition registered"
        );
        guard.insert(id.clone(), definition);
        Ok(id)
    }

    /// Make `id` the active definition for its model type
    pub fn activate(&self, id: &WorkflowId) -> ApprovalResult<()> {
        let mut guard = self.write()?;
        let model_type = guard
            .get(id)
            .map(|d| d.model_type.clone())
            .ok_or_else(|| ApprovalError::DefinitionNotFound(id.clone()))?;

        deactivate_model_type(&mut guard, &model_type);
        if let Some(definition) = guard.get_mut(id) {
            definition.is_active = true;
        }
        tracing::info!(workflow_id = %id, model_type = %model_type, "Workflow definition activated");
        Ok(())
    }

    pub fn deactivate(&self, id: &WorkflowId) -> ApprovalResult<()> {
        let mut guard = self.write()?;
        let definition = guard
            .get_mut(id)
            .ok_or_else(|| ApprovalError::DefinitionNotFound(id.clone()))?;
        definition.is_active = false;
        Ok(())
    }

    /// The active definition for a model type
    pub fn active_for(&self, model_type: &str) -> ApprovalResult<Option<WorkflowDefinition>> {
        let guard = self.read()?;
        Ok(guard
            .values()
            .find(|d| d.is_active && d.model_type == model_type)
            .cloned())
    }

    /// All definitions, sorted by name
    pub fn list(&self) -> ApprovalResult<Vec<WorkflowDefinition>> {
        let guard = self.read()?;
        let mut all: Vec<_> = guard.values().cloned().collect();
        all.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.id.cmp(&b.id)));
        Ok(all)
    }

    fn read(
        &self,
    ) -> StorageResult<std::sync::RwLockReadGuard<'_, HashMap<WorkflowId, WorkflowDefinition>>>
    {
        self.definitions
            .read()
            .map_err(|_| StorageError::Backend("definitions lock poisoned".to_string()))
    }

    fn write(
        &self,
    ) -> StorageResult<std::sync::RwLockWriteGuard<'_, HashMap<WorkflowId, WorkflowDefinition>>>
    {
        self.definitions
            .write()
            .map_err(|_| StorageError::Backend("definitions lock poisoned".to_string()))
    }
}

fn deactivate_model_type(definitions: &mut HashMap<WorkflowId, WorkflowDefinition>, model_type: &str) {
    for definition in definitions.values_mut() {
        if definition.model_type == model_type {
            definition.is_active = false;
        }
    }
}

#[async_trait]
impl WorkflowRepository for InMemoryWorkflowRepository {
    async fn get_workflow(&self, id: &WorkflowId) -> StorageResult<Option<WorkflowDefinition>> {
        Ok(self.read()?.get(id).cloned())
    }
}

// ── Instance Store ───────────────────────────────────────────────────

#[derive(Default)]
struct StoreState {
    instances: HashMap<InstanceId, ApprovalInstance>,
    actions: Vec<ApprovalAction>,
    audit: Vec<AuditEntry>,
    next_sequence: u64,
}

/// Instances, actions and audit entries with optimistic version checks
#[derive(Default)]
pub struct InMemoryInstanceStore {
    state: RwLock<StoreState>,
}

impl InMemoryInstanceStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored instances
    pub fn instance_count(&self) -> StorageResult<usize> {
        Ok(self.read()?.instances.len())
    }

    fn read(&self) -> StorageResult<std::sync::RwLockReadGuard<'_, StoreState>> {
        self.state
            .read()
            .map_err(|_| StorageError::Backend("instance store lock poisoned".to_string()))
    }

    fn write(&self) -> StorageResult<std::sync::RwLockWriteGuard<'_, StoreState>> {
        self.state
            .write()
            .map_err(|_| StorageError::Backend("instance store lock poisoned".to_string()))
    }
}

fn check_commit(state: &StoreState, commit: &InstanceCommit) -> StorageResult<u64> {
    let instance = &commit.instance;
    let stored = state.instances.get(&instance.id).map(|i| i.version);

    let next_version = match (commit.expected_version, stored) {
        (None, None) => 1,
        (None, Some(_)) => {
            return Err(StorageError::Conflict(format!(
                "instance {} already exists",
                instance.id
            )))
        }
        (Some(_), None) => {
            return Err(StorageError::NotFound(format!(
                "instance {} not found",
                instance.id
            )))
        }
        (Some(expected), Some(current)) if expected != current => {
            return Err(StorageError::Conflict(format!(
                "instance {} is at version {}, expected {}",
                instance.id, current, expected
            )))
        }
        (Some(_), Some(current)) => current + 1,
    };

    if !instance.step_invariant_holds() {
        return Err(StorageError::InvariantViolation(format!(
            "instance {} is {} with current step {:?}",
            instance.id, instance.status, instance.current_step_id
        )));
    }
    if let Some(action) = &commit.action {
        if action.instance_id != instance.id {
            return Err(StorageError::InvariantViolation(format!(
                "action {} belongs to instance {}, not {}",
                action.id, action.instance_id, instance.id
            )));
        }
        if state.actions.iter().any(|a| a.id == action.id) {
            return Err(StorageError::Conflict(format!(
                "action {} already recorded",
                action.id
            )));
        }
    }
    if let Some(entry) = commit.audit.iter().find(|e| e.instance_id != instance.id) {
        return Err(StorageError::InvariantViolation(format!(
            "audit entry for instance {} in commit for {}",
            entry.instance_id, instance.id
        )));
    }
    Ok(next_version)
}

#[async_trait]
impl InstanceStore for InMemoryInstanceStore {
    async fn get_instance(&self, id: &InstanceId) -> StorageResult<Option<ApprovalInstance>> {
        Ok(self.read()?.instances.get(id).cloned())
    }

    async fn commit(&self, commit: InstanceCommit) -> StorageResult<ApprovalInstance> {
        let mut state = self.write()?;
        let version = check_commit(&state, &commit)?;

        let InstanceCommit {
            mut instance,
            action,
            audit,
            ..
        } = commit;
        instance.version = version;

        if let Some(action) = action {
            state.actions.push(action);
        }
        for mut entry in audit {
            state.next_sequence += 1;
            entry.sequence = state.next_sequence;
            state.audit.push(entry);
        }
        state.instances.insert(instance.id.clone(), instance.clone());
        Ok(instance)
    }

    async fn actions_for(&self, id: &InstanceId) -> StorageResult<Vec<ApprovalAction>> {
        Ok(self
            .read()?
            .actions
            .iter()
            .filter(|a| &a.instance_id == id)
            .cloned()
            .collect())
    }

    async fn count_approvals(
        &self,
        id: &InstanceId,
        step: &StepId,
        round: u32,
    ) -> StorageResult<u32> {
        let count = self
            .read()?
            .actions
            .iter()
            .filter(|a| {
                &a.instance_id == id && &a.step_id == step && a.round == round && a.is_approval()
            })
            .count();
        Ok(count as u32)
    }

    async fn audit_for(&self, id: &InstanceId) -> StorageResult<Vec<AuditEntry>> {
        Ok(self
            .read()?
            .audit
            .iter()
            .filter(|e| &e.instance_id == id)
            .cloned()
            .collect())
    }
}

// ── Identity Directory ───────────────────────────────────────────────

/// Directory backed by a fixed set of identities
#[derive(Default)]
pub struct InMemoryDirectory {
    identities: RwLock<BTreeMap<UserId, Identity>>,
}

impl InMemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style [`InMemoryDirectory::insert`]
    pub fn with_identity(self, identity: Identity) -> Self {
        if let Ok(mut guard) = self.identities.write() {
            guard.insert(identity.id.clone(), identity);
        }
        self
    }

    pub fn insert(&self, identity: Identity) -> DirectoryResult<()> {
        let mut guard = self
            .identities
            .write()
            .map_err(|_| DirectoryError::LockError)?;
        guard.insert(identity.id.clone(), identity);
        Ok(())
    }

    fn matching(&self, predicate: impl Fn(&Identity) -> bool) -> DirectoryResult<Vec<Identity>> {
        let guard = self
            .identities
            .read()
            .map_err(|_| DirectoryError::LockError)?;
        Ok(guard.values().filter(|i| predicate(i)).cloned().collect())
    }

    fn lookup(&self, user: &UserId) -> DirectoryResult<Option<Identity>> {
        let guard = self
            .identities
            .read()
            .map_err(|_| DirectoryError::LockError)?;
        Ok(guard.get(user).cloned())
    }
}

#[async_trait]
impl IdentityDirectory for InMemoryDirectory {
    async fn users_by_id(&self, ids: &[String]) -> DirectoryResult<Vec<Identity>> {
        self.matching(|i| ids.iter().any(|id| id == i.id.as_str()))
    }

    async fn users_with_role(&self, roles: &[String]) -> DirectoryResult<Vec<Identity>> {
        self.matching(|i| i.has_any_role(roles))
    }

    async fn users_with_permission(
        &self,
        permissions: &[String],
    ) -> DirectoryResult<Vec<Identity>> {
        self.matching(|i| i.has_any_permission(permissions))
    }

    async fn has_any_role(&self, user: &UserId, roles: &[String]) -> DirectoryResult<bool> {
        Ok(self
            .lookup(user)?
            .map(|i| i.has_any_role(roles))
            .unwrap_or(false))
    }

    async fn has_any_permission(
        &self,
        user: &UserId,
        permissions: &[String],
    ) -> DirectoryResult<bool> {
        Ok(self
            .lookup(user)?
            .map(|i| i.has_any_permission(permissions))
            .unwrap_or(false))
    }
}
