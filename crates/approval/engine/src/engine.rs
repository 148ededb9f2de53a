//! The approval state machine
//!
//! Every operation follows the same shape:
//!
//! 1. load the instance and check preconditions (a failure is a
//!    [`Rejection`] and nothing is written)
//! 2. plan the transition: the action to record, the step to land on and
//!    the audit entries describing it
//! 3. commit all of it at once against the version that was read
//! 4. after the commit, run the completion hook and send notifications
//!
//! A version conflict at step 3 means someone else changed the instance
//! in between; the operation starts over from step 1, up to
//! `max_commit_attempts` times.

use crate::config::EngineConfig;
use crate::planner::{PlanStart, SkippedStep, StepPlanner, StepResolution};
use crate::resolver::ApproverResolver;
use crate::traits::{
    Approvable, IdentityDirectory, InstanceCommit, InstanceStore, Notifier, WorkflowRepository,
};
use approval_types::{
    ActionType, ApprovalAction, ApprovalError, ApprovalEvent, ApprovalInstance, ApprovalResult,
    AuditEntry, AuditKind, Identity, InstanceId, InstanceStatus, Rejection, Step, StepId,
    StorageError, UserId, WorkflowDefinition, WorkflowId,
};
use chrono::Utc;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

// ── Requests and Outcomes ────────────────────────────────────────────

/// An approver's decision on the current step
#[derive(Clone, Debug)]
pub struct ActionRequest {
    pub instance_id: InstanceId,
    pub step_id: StepId,
    pub action_type: ActionType,
    pub actor: UserId,
    pub comments: Option<String>,
    pub metadata: Option<Value>,
}

impl ActionRequest {
    pub fn new(
        instance_id: InstanceId,
        step_id: StepId,
        action_type: ActionType,
        actor: UserId,
    ) -> Self {
        Self {
            instance_id,
            step_id,
            action_type,
            actor,
            comments: None,
            metadata: None,
        }
    }

    pub fn approve(instance_id: InstanceId, step_id: StepId, actor: UserId) -> Self {
        Self::new(instance_id, step_id, ActionType::Approve, actor)
    }

    pub fn reject(instance_id: InstanceId, step_id: StepId, actor: UserId) -> Self {
        Self::new(instance_id, step_id, ActionType::Reject, actor)
    }

    pub fn request_changes(instance_id: InstanceId, step_id: StepId, actor: UserId) -> Self {
        Self::new(instance_id, step_id, ActionType::RequestChanges, actor)
    }

    pub fn with_comments(mut self, comments: impl Into<String>) -> Self {
        self.comments = Some(comments.into());
        self
    }

    pub fn with_metadata(mut self, metadata: Value) -> Self {
        self.metadata = Some(metadata);
        self
    }
}

/// What a successful operation did
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum OutcomeKind {
    Submitted { step: StepId },
    Resubmitted { step: StepId },
    /// Approval recorded; the parallel step still needs more
    PartialApproval {
        step: StepId,
        approvals: u32,
        required: u32,
    },
    Advanced { from: StepId, to: StepId },
    Approved,
    Rejected,
    ChangesRequested,
    Cancelled { step: Option<StepId> },
}

/// Result of a committed operation
#[derive(Clone, Debug, Serialize)]
pub struct TransitionOutcome {
    /// The instance as committed
    pub instance: ApprovalInstance,
    pub kind: OutcomeKind,
    /// The action recorded by this operation, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action: Option<ApprovalAction>,
    /// Steps passed over on the way to the landing step
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub skipped: Vec<SkippedStep>,
    /// Set when the completion hook failed; the approval stays committed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hook_error: Option<String>,
}

impl TransitionOutcome {
    fn new(instance: ApprovalInstance, kind: OutcomeKind) -> Self {
        Self {
            instance,
            kind,
            action: None,
            skipped: Vec::new(),
            hook_error: None,
        }
    }

    pub fn status(&self) -> InstanceStatus {
        self.instance.status
    }

    /// True if the instance moved off its step or finished
    pub fn advanced(&self) -> bool {
        !matches!(self.kind, OutcomeKind::PartialApproval { .. })
    }
}

/// A planned transition, ready to commit
struct Plan {
    commit: InstanceCommit,
    kind: OutcomeKind,
    skipped: Vec<SkippedStep>,
    /// Step whose approvers are told about the new state
    announce_step: Option<Step>,
}

/// A committed transition whose after-commit effects have not run yet
struct Committed {
    outcome: TransitionOutcome,
    announce_step: Option<Step>,
}

// ── Engine ───────────────────────────────────────────────────────────

/// Drives approval instances through their workflow
pub struct WorkflowEngine {
    repository: Arc<dyn WorkflowRepository>,
    store: Arc<dyn InstanceStore>,
    resolver: ApproverResolver,
    notifier: Arc<dyn Notifier>,
    config: EngineConfig,
}

impl WorkflowEngine {
    pub fn new(
        repository: Arc<dyn WorkflowRepository>,
        store: Arc<dyn InstanceStore>,
        directory: Arc<dyn IdentityDirectory>,
        notifier: Arc<dyn Notifier>,
        config: EngineConfig,
    ) -> Self {
        Self {
            repository,
            store,
            resolver: ApproverResolver::new(directory),
            notifier,
            config,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn resolver(&self) -> &ApproverResolver {
        &self.resolver
    }

    // ── Lifecycle Operations ─────────────────────────────────────────

    /// Create a pending instance of `workflow_id` for `subject`.
    ///
    /// Does not deduplicate: calling twice for one subject creates two
    /// instances.
    pub async fn initialize(
        &self,
        subject: &dyn Approvable,
        workflow_id: &WorkflowId,
        submitter: &UserId,
    ) -> ApprovalResult<ApprovalInstance> {
        let definition = self.definition(workflow_id).await?;
        if definition.model_type != subject.approvable_type() {
            return Err(ApprovalError::Validation(format!(
                "workflow '{}' governs '{}', not '{}'",
                definition.id,
                definition.model_type,
                subject.approvable_type()
            )));
        }

        let instance = ApprovalInstance::new(
            definition.id.clone(),
            subject.approvable_type(),
            subject.approvable_id(),
            submitter.clone(),
        );
        let audit = AuditEntry::new(
            instance.id.clone(),
            AuditKind::Initialized,
            format!("workflow '{}' initialized", definition.name),
        )
        .with_actor(submitter.clone());

        let stored = self
            .store
            .commit(InstanceCommit::create(instance).with_audit(vec![audit]))
            .await?;

        info!(
            instance_id = %stored.id,
            workflow_id = %workflow_id,
            approvable_type = %stored.approvable_type,
            approvable_id = %stored.approvable_id,
            "Approval instance initialized"
        );
        Ok(stored)
    }

    /// Submit a pending instance into its first applicable step
    pub async fn submit(
        &self,
        instance_id: &InstanceId,
        submitter: &UserId,
        subject: &dyn Approvable,
    ) -> ApprovalResult<TransitionOutcome> {
        let mut attempt = 1;
        loop {
            let committed = match self.plan_entry(instance_id, submitter, subject, false).await {
                Ok(plan) => self.commit(plan).await,
                Err(err) => Err(err),
            };
            match committed {
                Ok(committed) => return Ok(self.after_commit(committed, Some(subject), None).await),
                Err(err) if self.retry(&err, attempt, instance_id) => attempt += 1,
                Err(err) => return Err(err),
            }
        }
    }

    /// Resubmit an instance that was sent back for changes
    pub async fn resubmit(
        &self,
        instance_id: &InstanceId,
        submitter: &UserId,
        subject: &dyn Approvable,
    ) -> ApprovalResult<TransitionOutcome> {
        let mut attempt = 1;
        loop {
            let committed = match self.plan_entry(instance_id, submitter, subject, true).await {
                Ok(plan) => self.commit(plan).await,
                Err(err) => Err(err),
            };
            match committed {
                Ok(committed) => return Ok(self.after_commit(committed, Some(subject), None).await),
                Err(err) if self.retry(&err, attempt, instance_id) => attempt += 1,
                Err(err) => return Err(err),
            }
        }
    }

    /// Record an approver's decision on the current step and move the
    /// instance accordingly
    pub async fn process_action(
        &self,
        request: ActionRequest,
        subject: &dyn Approvable,
    ) -> ApprovalResult<TransitionOutcome> {
        let mut attempt = 1;
        loop {
            let committed = match self.plan_action(&request, subject).await {
                Ok(plan) => self.commit(plan).await,
                Err(err) => Err(err),
            };
            match committed {
                Ok(committed) => return Ok(self.after_commit(committed, Some(subject), None).await),
                Err(err) if self.retry(&err, attempt, &request.instance_id) => attempt += 1,
                Err(err) => return Err(err),
            }
        }
    }

    /// Withdraw a pending or in-progress instance
    pub async fn cancel(
        &self,
        instance_id: &InstanceId,
        actor: &UserId,
    ) -> ApprovalResult<TransitionOutcome> {
        let mut attempt = 1;
        loop {
            let committed = match self.plan_cancel(instance_id, actor).await {
                Ok(plan) => self.commit(plan).await,
                Err(err) => Err(err),
            };
            match committed {
                Ok(committed) => return Ok(self.after_commit(committed, None, Some(actor)).await),
                Err(err) if self.retry(&err, attempt, instance_id) => attempt += 1,
                Err(err) => return Err(err),
            }
        }
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub async fn instance(&self, instance_id: &InstanceId) -> ApprovalResult<ApprovalInstance> {
        self.load(instance_id).await
    }

    /// Recorded actions, oldest first
    pub async fn history(&self, instance_id: &InstanceId) -> ApprovalResult<Vec<ApprovalAction>> {
        self.load(instance_id).await?;
        let mut actions = self.store.actions_for(instance_id).await?;
        actions.sort_by_key(|a| a.created_at);
        Ok(actions)
    }

    pub async fn audit_trail(&self, instance_id: &InstanceId) -> ApprovalResult<Vec<AuditEntry>> {
        self.load(instance_id).await?;
        let mut entries = self.store.audit_for(instance_id).await?;
        entries.sort_by_key(|e| e.sequence);
        Ok(entries)
    }

    /// The step the instance is waiting on, if it is in progress
    pub async fn current_step(&self, instance_id: &InstanceId) -> ApprovalResult<Option<Step>> {
        let instance = self.load(instance_id).await?;
        match &instance.current_step_id {
            Some(step_id) => Ok(Some(self.step_of(&instance, step_id).await?)),
            None => Ok(None),
        }
    }

    /// Eligible approvers of the current step who have not yet approved it
    /// in this round
    pub async fn pending_approvers(&self, instance_id: &InstanceId) -> ApprovalResult<Vec<Identity>> {
        let instance = self.load(instance_id).await?;
        let Some(step_id) = instance.current_step_id.clone() else {
            return Ok(Vec::new());
        };
        let step = self.step_of(&instance, &step_id).await?;
        let done = self
            .store
            .approvers_of(&instance.id, &step_id, instance.round)
            .await?;

        let eligible = self.resolver.eligible_approvers(&step).await?;
        Ok(eligible
            .into_iter()
            .filter(|identity| !done.contains(&identity.id))
            .collect())
    }

    /// Whether `actor` could act on the instance right now
    pub async fn can_act(&self, actor: &UserId, instance_id: &InstanceId) -> ApprovalResult<bool> {
        let instance = self.load(instance_id).await?;
        let Some(step_id) = instance.current_step_id.clone() else {
            return Ok(false);
        };
        let step = self.step_of(&instance, &step_id).await?;
        if !self.resolver.can_act(actor, &step).await? {
            return Ok(false);
        }
        let done = self
            .store
            .approvers_of(&instance.id, &step_id, instance.round)
            .await?;
        Ok(!done.contains(actor))
    }

    // ── Planning ─────────────────────────────────────────────────────

    async fn plan_entry(
        &self,
        instance_id: &InstanceId,
        submitter: &UserId,
        subject: &dyn Approvable,
        resubmission: bool,
    ) -> ApprovalResult<Plan> {
        let instance = self.load(instance_id).await?;
        let expected = if resubmission {
            InstanceStatus::ChangesRequested
        } else {
            InstanceStatus::Pending
        };
        if instance.status != expected {
            return Err(match instance.status {
                status if status.is_terminal() => Rejection::AlreadyTerminal(status),
                status if resubmission => Rejection::NotAwaitingChanges(status),
                status => Rejection::NotPending(status),
            }
            .into());
        }

        let steps = self.repository.get_steps_ordered(&instance.workflow_id).await?;
        let StepResolution { target, skipped } = self
            .planner()
            .resolve(&steps, PlanStart::Entry, submitter, subject)
            .await?;
        let Some(target) = target else {
            debug!(instance_id = %instance.id, "No applicable step to submit into");
            return Err(Rejection::NoApplicableStep.into());
        };

        let version = instance.version;
        let mut next = instance;
        next.begin_round(target.id.clone(), submitter.clone(), Utc::now())?;

        let (kind, audit_kind, verb) = if resubmission {
            (
                OutcomeKind::Resubmitted {
                    step: target.id.clone(),
                },
                AuditKind::Resubmitted,
                "resubmitted",
            )
        } else {
            (
                OutcomeKind::Submitted {
                    step: target.id.clone(),
                },
                AuditKind::Submitted,
                "submitted",
            )
        };

        let mut audit = skip_entries(&next.id, &skipped);
        audit.push(
            AuditEntry::new(
                next.id.clone(),
                audit_kind,
                format!("{verb} (round {}) into {}", next.round, target.label()),
            )
            .with_step(target.id.clone())
            .with_actor(submitter.clone()),
        );

        Ok(Plan {
            commit: InstanceCommit::update(next, version).with_audit(audit),
            kind,
            skipped,
            announce_step: Some(target),
        })
    }

    async fn plan_action(
        &self,
        request: &ActionRequest,
        subject: &dyn Approvable,
    ) -> ApprovalResult<Plan> {
        let instance = self.load(&request.instance_id).await?;
        if instance.is_terminal() {
            return Err(Rejection::AlreadyTerminal(instance.status).into());
        }
        if !instance.is_in_progress() {
            return Err(Rejection::NotInProgress(instance.status).into());
        }
        if instance.current_step_id.as_ref() != Some(&request.step_id) {
            return Err(Rejection::StaleStep {
                given: request.step_id.clone(),
                current: instance.current_step_id.clone(),
            }
            .into());
        }

        let steps = self.repository.get_steps_ordered(&instance.workflow_id).await?;
        let step = steps
            .iter()
            .find(|s| s.id == request.step_id)
            .cloned()
            .ok_or_else(|| ApprovalError::StepNotFound(request.step_id.clone()))?;

        if !self.resolver.can_act(&request.actor, &step).await? {
            return Err(Rejection::NotEligible {
                actor: request.actor.clone(),
                step: step.id.clone(),
            }
            .into());
        }

        let action = ApprovalAction::new(
            instance.id.clone(),
            step.id.clone(),
            request.action_type,
            request.actor.clone(),
            instance.round,
        )
        .with_comments(request.comments.clone())
        .with_metadata(request.metadata.clone());

        let mut audit = vec![AuditEntry::new(
            instance.id.clone(),
            AuditKind::ActionRecorded,
            format!("{} on {}", request.action_type, step.label()),
        )
        .with_step(step.id.clone())
        .with_actor(request.actor.clone())];

        let version = instance.version;
        let mut next = instance;
        let now = Utc::now();
        let mut skipped = Vec::new();
        let mut announce_step = None;

        let kind = match request.action_type {
            ActionType::Approve => {
                let prior = self
                    .store
                    .approvers_of(&next.id, &step.id, next.round)
                    .await?;
                if prior.contains(&request.actor) {
                    return Err(Rejection::AlreadyApproved {
                        actor: request.actor.clone(),
                        step: step.id.clone(),
                    }
                    .into());
                }

                let approvals = self
                    .store
                    .count_approvals(&next.id, &step.id, next.round)
                    .await?
                    + 1;
                let required = step.approvals_needed();

                if approvals < required {
                    next.updated_at = now;
                    debug!(
                        instance_id = %next.id,
                        step = %step.id,
                        approvals,
                        required,
                        "Partial approval recorded"
                    );
                    OutcomeKind::PartialApproval {
                        step: step.id.clone(),
                        approvals,
                        required,
                    }
                } else {
                    let resolution = self
                        .planner()
                        .resolve(
                            &steps,
                            PlanStart::After(step.order),
                            &next.submitted_by,
                            subject,
                        )
                        .await?;
                    audit.extend(skip_entries(&next.id, &resolution.skipped));
                    skipped = resolution.skipped;

                    match resolution.target {
                        Some(target) => {
                            next.advance_to(target.id.clone(), now)?;
                            audit.push(
                                AuditEntry::new(
                                    next.id.clone(),
                                    AuditKind::StepAdvanced,
                                    format!("advanced to {}", target.label()),
                                )
                                .with_step(target.id.clone()),
                            );
                            let kind = OutcomeKind::Advanced {
                                from: step.id.clone(),
                                to: target.id.clone(),
                            };
                            announce_step = Some(target);
                            kind
                        }
                        None => {
                            next.finish(InstanceStatus::Approved, now)?;
                            audit.push(AuditEntry::new(
                                next.id.clone(),
                                AuditKind::Approved,
                                "all applicable steps approved",
                            ));
                            OutcomeKind::Approved
                        }
                    }
                }
            }
            ActionType::Reject => {
                next.finish(InstanceStatus::Rejected, now)?;
                audit.push(
                    AuditEntry::new(
                        next.id.clone(),
                        AuditKind::Rejected,
                        format!("rejected at {}", step.label()),
                    )
                    .with_step(step.id.clone())
                    .with_actor(request.actor.clone()),
                );
                OutcomeKind::Rejected
            }
            ActionType::RequestChanges => {
                next.request_changes(now)?;
                audit.push(
                    AuditEntry::new(
                        next.id.clone(),
                        AuditKind::ChangesRequested,
                        format!("changes requested at {}", step.label()),
                    )
                    .with_step(step.id.clone())
                    .with_actor(request.actor.clone()),
                );
                OutcomeKind::ChangesRequested
            }
        };

        Ok(Plan {
            commit: InstanceCommit::update(next, version)
                .with_action(action)
                .with_audit(audit),
            kind,
            skipped,
            announce_step,
        })
    }

    async fn plan_cancel(&self, instance_id: &InstanceId, actor: &UserId) -> ApprovalResult<Plan> {
        let instance = self.load(instance_id).await?;
        let active_step = match &instance.current_step_id {
            Some(step_id) => Some(self.step_of(&instance, step_id).await?),
            None => None,
        };

        let version = instance.version;
        let mut next = instance;
        next.finish(InstanceStatus::Cancelled, Utc::now())?;

        let mut entry = AuditEntry::new(next.id.clone(), AuditKind::Cancelled, "cancelled")
            .with_actor(actor.clone());
        if let Some(step) = &active_step {
            entry = entry.with_step(step.id.clone());
        }

        Ok(Plan {
            commit: InstanceCommit::update(next, version).with_audit(vec![entry]),
            kind: OutcomeKind::Cancelled {
                step: active_step.as_ref().map(|s| s.id.clone()),
            },
            skipped: Vec::new(),
            announce_step: active_step,
        })
    }

    // ── Applying ─────────────────────────────────────────────────────

    /// Write the plan. A version conflict here sends the caller back to
    /// planning.
    async fn commit(&self, plan: Plan) -> ApprovalResult<Committed> {
        let Plan {
            commit,
            kind,
            skipped,
            announce_step,
        } = plan;
        let action = commit.action.clone();
        let instance = self.store.commit(commit).await?;
        self.log_transition(&instance, &kind, &skipped);

        let mut outcome = TransitionOutcome::new(instance, kind);
        outcome.action = action;
        outcome.skipped = skipped;
        Ok(Committed {
            outcome,
            announce_step,
        })
    }

    /// Completion hook and notifications; neither can undo the commit
    async fn after_commit(
        &self,
        committed: Committed,
        subject: Option<&dyn Approvable>,
        actor: Option<&UserId>,
    ) -> TransitionOutcome {
        let Committed {
            mut outcome,
            announce_step,
        } = committed;

        match subject {
            Some(subject) if outcome.kind == OutcomeKind::Approved => {
                if let Err(err) = subject.on_approved(&outcome.instance).await {
                    error!(
                        instance_id = %outcome.instance.id,
                        error = %err,
                        "Completion hook failed; instance stays approved"
                    );
                    outcome.hook_error = Some(err.to_string());
                }
            }
            _ => {}
        }

        self.announce(&outcome, announce_step.as_ref(), actor).await;
        outcome
    }

    fn log_transition(&self, instance: &ApprovalInstance, kind: &OutcomeKind, skipped: &[SkippedStep]) {
        match kind {
            OutcomeKind::PartialApproval { .. } => {}
            OutcomeKind::Submitted { step } | OutcomeKind::Resubmitted { step } => info!(
                instance_id = %instance.id,
                step = %step,
                round = instance.round,
                skipped = skipped.len(),
                "Approval instance submitted"
            ),
            OutcomeKind::Advanced { from, to } => info!(
                instance_id = %instance.id,
                from = %from,
                to = %to,
                skipped = skipped.len(),
                "Approval instance advanced"
            ),
            other => info!(
                instance_id = %instance.id,
                status = %instance.status,
                outcome = ?other,
                "Approval instance finished"
            ),
        }
    }

    /// Best-effort notifications for a committed outcome. Failures are
    /// logged and never surface to the caller.
    async fn announce(
        &self,
        outcome: &TransitionOutcome,
        step: Option<&Step>,
        actor: Option<&UserId>,
    ) {
        let instance = &outcome.instance;
        let (event, to_submitter) = match &outcome.kind {
            OutcomeKind::PartialApproval { .. } => return,
            OutcomeKind::Submitted { .. } | OutcomeKind::Resubmitted { .. } => {
                (ApprovalEvent::Submitted, false)
            }
            OutcomeKind::Advanced { .. } => (ApprovalEvent::StepAdvanced, false),
            OutcomeKind::Approved => (ApprovalEvent::Approved, true),
            OutcomeKind::Rejected => (ApprovalEvent::Rejected, true),
            OutcomeKind::ChangesRequested => (ApprovalEvent::ChangesRequested, true),
            OutcomeKind::Cancelled { .. } => {
                (ApprovalEvent::Cancelled, actor != Some(&instance.submitted_by))
            }
        };

        let mut recipients = Vec::new();
        if to_submitter {
            match self.submitter_identity(instance).await {
                Ok(identity) => recipients.push(identity),
                Err(err) => warn!(instance_id = %instance.id, error = %err, "Submitter lookup failed"),
            }
        }
        let notify_step = !matches!(
            outcome.kind,
            OutcomeKind::Approved | OutcomeKind::Rejected | OutcomeKind::ChangesRequested
        );
        if let (true, Some(step)) = (notify_step, step) {
            match self.resolver.eligible_approvers(step).await {
                Ok(approvers) => {
                    for approver in approvers {
                        if !recipients.iter().any(|r: &Identity| r.id == approver.id) {
                            recipients.push(approver);
                        }
                    }
                }
                Err(err) => warn!(
                    instance_id = %instance.id,
                    step = %step.id,
                    error = %err,
                    "Approver lookup failed"
                ),
            }
        }

        if recipients.is_empty() {
            debug!(instance_id = %instance.id, event = %event, "No recipients to notify");
            return;
        }
        if let Err(err) = self.notifier.notify(&recipients, event, instance).await {
            warn!(
                instance_id = %instance.id,
                event = %event,
                error = %err,
                "Notification failed; transition stays committed"
            );
        }
    }

    async fn submitter_identity(&self, instance: &ApprovalInstance) -> ApprovalResult<Identity> {
        let submitter = &instance.submitted_by;
        let found = self
            .resolver
            .directory()
            .users_by_id(std::slice::from_ref(&submitter.0))
            .await?;
        Ok(found
            .into_iter()
            .next()
            .unwrap_or_else(|| Identity::new(submitter.clone(), submitter.as_str())))
    }

    // ── Helpers ──────────────────────────────────────────────────────

    fn planner(&self) -> StepPlanner<'_> {
        StepPlanner::new(&self.resolver, &self.config)
    }

    fn retry(&self, err: &ApprovalError, attempt: u32, instance_id: &InstanceId) -> bool {
        let ApprovalError::Storage(StorageError::Conflict(reason)) = err else {
            return false;
        };
        if attempt >= self.config.attempts() {
            warn!(
                instance_id = %instance_id,
                attempts = attempt,
                reason = %reason,
                "Giving up after repeated commit conflicts"
            );
            return false;
        }
        warn!(
            instance_id = %instance_id,
            attempt,
            reason = %reason,
            "Commit conflict; re-reading instance"
        );
        true
    }

    async fn load(&self, instance_id: &InstanceId) -> ApprovalResult<ApprovalInstance> {
        self.store
            .get_instance(instance_id)
            .await?
            .ok_or_else(|| ApprovalError::InstanceNotFound(instance_id.clone()))
    }

    async fn definition(&self, workflow_id: &WorkflowId) -> ApprovalResult<WorkflowDefinition> {
        self.repository
            .get_workflow(workflow_id)
            .await?
            .ok_or_else(|| ApprovalError::DefinitionNotFound(workflow_id.clone()))
    }

    async fn step_of(&self, instance: &ApprovalInstance, step_id: &StepId) -> ApprovalResult<Step> {
        self.repository
            .get_steps_ordered(&instance.workflow_id)
            .await?
            .into_iter()
            .find(|s| &s.id == step_id)
            .ok_or_else(|| ApprovalError::StepNotFound(step_id.clone()))
    }
}

fn skip_entries(instance_id: &InstanceId, skipped: &[SkippedStep]) -> Vec<AuditEntry> {
    skipped
        .iter()
        .map(|s| {
            AuditEntry::new(
                instance_id.clone(),
                AuditKind::StepSkipped,
                format!("skipped {}: {}", s.label, s.reason),
            )
            .with_step(s.step_id.clone())
        })
        .collect()
}
