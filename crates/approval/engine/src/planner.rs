//! Skip resolution: choosing the step an instance lands on
//!
//! The planner only reads. It walks the ordered steps after a given position
//! and returns the first step that is not skipped, together with every step
//! it passed over and why. The engine turns that into one commit.

use crate::config::EngineConfig;
use crate::resolver::ApproverResolver;
use crate::traits::Approvable;
use approval_rules::RuleEvaluator;
use approval_types::{ApprovalResult, Step, StepId, StepPurpose, UserId};
use serde::Serialize;
use tracing::debug;

/// Why a step was passed over
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// The submitter could approve it themselves
    SelfApproval,
    /// Its conditional rules evaluated false for the subject
    ConditionFailed,
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::SelfApproval => f.write_str("submitter is an eligible approver"),
            Self::ConditionFailed => f.write_str("conditional rules not met"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SkippedStep {
    pub step_id: StepId,
    pub label: String,
    pub reason: SkipReason,
}

/// Result of a walk: the landing step (if any) and the steps skipped to get there
#[derive(Clone, Debug, Default)]
pub struct StepResolution {
    pub target: Option<Step>,
    pub skipped: Vec<SkippedStep>,
}

/// Where the walk is started from
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PlanStart {
    /// Submit or resubmit: from the head of the list
    Entry,
    /// Approval completed the step with this order
    After(i32),
}

pub struct StepPlanner<'a> {
    resolver: &'a ApproverResolver,
    evaluator: RuleEvaluator,
    config: &'a EngineConfig,
}

impl<'a> StepPlanner<'a> {
    pub fn new(resolver: &'a ApproverResolver, config: &'a EngineConfig) -> Self {
        Self {
            resolver,
            evaluator: RuleEvaluator::new(),
            config,
        }
    }

    /// Walk `steps` (ascending order) from `start`.
    ///
    /// Each step is visited at most once, so the walk ends after at most
    /// `steps.len()` candidates whatever the order values are.
    pub async fn resolve(
        &self,
        steps: &[Step],
        start: PlanStart,
        submitter: &UserId,
        subject: &dyn Approvable,
    ) -> ApprovalResult<StepResolution> {
        let apply_rules = match start {
            PlanStart::Entry => self.config.apply_rules_on_submit,
            PlanStart::After(_) => true,
        };
        let candidates = steps.iter().filter(|step| match start {
            PlanStart::Entry => true,
            PlanStart::After(order) => step.order > order,
        });

        let mut resolution = StepResolution::default();
        for step in candidates.take(steps.len()) {
            if let Some(reason) = self
                .skip_reason(step, apply_rules, submitter, subject)
                .await?
            {
                debug!(step = %step.id, reason = %reason, "Step skipped");
                resolution.skipped.push(SkippedStep {
                    step_id: step.id.clone(),
                    label: step.label(),
                    reason,
                });
                continue;
            }
            resolution.target = Some(step.clone());
            break;
        }
        Ok(resolution)
    }

    async fn skip_reason(
        &self,
        step: &Step,
        apply_rules: bool,
        submitter: &UserId,
        subject: &dyn Approvable,
    ) -> ApprovalResult<Option<SkipReason>> {
        if apply_rules
            && !self
                .evaluator
                .evaluate(step.conditional_rules.as_ref(), subject)
        {
            return Ok(Some(SkipReason::ConditionFailed));
        }

        if step.purpose == StepPurpose::Action || !self.config.auto_skip_self_approval {
            return Ok(None);
        }

        if self.resolver.can_act(submitter, step).await? {
            return Ok(Some(SkipReason::SelfApproval));
        }
        Ok(None)
    }
}
