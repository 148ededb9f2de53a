//! `approvalctl simulate`

use super::print_json;
use crate::input::read_json;
use crate::scenario::{Scenario, ScenarioEvent};
use anyhow::Context;
use approval_engine::{
    ActionRequest, Delivery, EngineConfig, InMemoryDirectory, InMemoryInstanceStore,
    InMemoryWorkflowRepository, RecordingNotifier, TransitionOutcome, WorkflowEngine,
};
use approval_types::{ApprovalAction, ApprovalInstance, AuditEntry, InstanceId};
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;

/// What happened to one replayed event
#[derive(Debug, Serialize)]
pub struct EventReport {
    pub event: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outcome: Option<TransitionOutcome>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refused: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SimulationReport {
    pub events: Vec<EventReport>,
    pub instance: ApprovalInstance,
    pub history: Vec<ApprovalAction>,
    pub audit: Vec<AuditEntry>,
    pub notifications: Vec<Delivery>,
}

pub async fn run(path: &str, config: EngineConfig, strict: bool) -> anyhow::Result<()> {
    let scenario: Scenario = serde_json::from_value(read_json(Path::new(path))?)
        .with_context(|| format!("{path} is not a valid scenario"))?;
    let report = simulate(scenario, config, strict).await?;
    print_json(&report)
}

/// Replay `scenario` against fresh in-memory collaborators.
///
/// Refused events are recorded and the replay continues, unless `strict`.
/// Storage and directory failures always abort.
pub async fn simulate(
    scenario: Scenario,
    config: EngineConfig,
    strict: bool,
) -> anyhow::Result<SimulationReport> {
    let Scenario {
        workflow,
        identities,
        subject,
        submitter,
        events,
    } = scenario;

    let repository = Arc::new(InMemoryWorkflowRepository::new());
    let workflow_id = repository
        .register(workflow)
        .context("workflow definition rejected")?;
    let directory = identities
        .into_iter()
        .fold(InMemoryDirectory::new(), InMemoryDirectory::with_identity);
    let notifier = Arc::new(RecordingNotifier::new());
    let engine = WorkflowEngine::new(
        repository,
        Arc::new(InMemoryInstanceStore::new()),
        Arc::new(directory),
        notifier.clone(),
        config,
    );

    let instance = engine.initialize(&subject, &workflow_id, &submitter).await?;
    tracing::info!(instance_id = %instance.id, events = events.len(), "Replaying scenario");

    let mut reports = Vec::with_capacity(events.len());
    for event in &events {
        let result = match event {
            ScenarioEvent::Submit => engine.submit(&instance.id, &submitter, &subject).await,
            ScenarioEvent::Resubmit => engine.resubmit(&instance.id, &submitter, &subject).await,
            ScenarioEvent::Cancel { actor } => engine.cancel(&instance.id, actor).await,
            decision_event => match decision_request(&engine, &instance.id, decision_event).await? {
                Some(request) => engine.process_action(request, &subject).await,
                None => {
                    reports.push(refuse(event, "instance has no current step", strict)?);
                    continue;
                }
            },
        };

        match result {
            Ok(outcome) => reports.push(EventReport {
                event: event.label(),
                outcome: Some(outcome),
                refused: None,
            }),
            Err(err) if err.is_rejection() => reports.push(refuse(event, &err.to_string(), strict)?),
            Err(err) => return Err(err.into()),
        }
    }

    Ok(SimulationReport {
        events: reports,
        instance: engine.instance(&instance.id).await?,
        history: engine.history(&instance.id).await?,
        audit: engine.audit_trail(&instance.id).await?,
        notifications: notifier.deliveries(),
    })
}

fn refuse(event: &ScenarioEvent, reason: &str, strict: bool) -> anyhow::Result<EventReport> {
    if strict {
        anyhow::bail!("{} refused: {reason}", event.label());
    }
    tracing::info!(event = %event.label(), reason, "Event refused");
    Ok(EventReport {
        event: event.label(),
        outcome: None,
        refused: Some(reason.to_string()),
    })
}

/// Build the request for an approver event, targeting the current step when
/// the event names none. `None` when there is no step to target.
async fn decision_request(
    engine: &WorkflowEngine,
    instance_id: &InstanceId,
    event: &ScenarioEvent,
) -> anyhow::Result<Option<ActionRequest>> {
    let (action_type, decision) = event
        .decision()
        .with_context(|| format!("'{}' is not an approver decision", event.label()))?;

    let step_id = match &decision.step {
        Some(step) => step.clone(),
        None => match engine.current_step(instance_id).await? {
            Some(step) => step.id,
            None => return Ok(None),
        },
    };

    let mut request = ActionRequest::new(
        instance_id.clone(),
        step_id,
        action_type,
        decision.actor.clone(),
    );
    request.comments = decision.comments.clone();
    request.metadata = decision.metadata.clone();
    Ok(Some(request))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approval_engine::OutcomeKind;
    use approval_types::InstanceStatus;

    fn two_stage() -> Scenario {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("scenarios/two-stage.json");
        serde_json::from_value(read_json(&path).unwrap()).unwrap()
    }

    #[tokio::test]
    async fn test_two_stage_scenario() {
        let report = simulate(two_stage(), EngineConfig::default(), false)
            .await
            .unwrap();

        assert_eq!(report.instance.status, InstanceStatus::Approved);
        assert_eq!(report.history.len(), 3);
        assert_eq!(report.notifications.len(), 3);

        let kinds: Vec<_> = report
            .events
            .iter()
            .filter_map(|e| e.outcome.as_ref().map(|o| o.kind.clone()))
            .collect();
        assert!(matches!(kinds[0], OutcomeKind::Submitted { .. }));
        assert!(matches!(kinds[1], OutcomeKind::Advanced { .. }));
        assert!(matches!(kinds[2], OutcomeKind::PartialApproval { approvals: 1, required: 2, .. }));
        assert_eq!(kinds[3], OutcomeKind::Approved);
    }

    #[tokio::test]
    async fn test_refused_event_is_recorded() {
        let mut scenario = two_stage();
        // a panel approver acting after completion
        scenario.events.push(scenario.events[2].clone());
        let report = simulate(scenario, EngineConfig::default(), false)
            .await
            .unwrap();

        let last = report.events.last().unwrap();
        assert!(last.outcome.is_none());
        assert!(last.refused.is_some());
        assert_eq!(report.instance.status, InstanceStatus::Approved);
    }

    #[tokio::test]
    async fn test_strict_stops_at_refusal() {
        let mut scenario = two_stage();
        // the reviewer acting before submission
        scenario.events.insert(0, scenario.events[1].clone());
        let err = simulate(scenario, EngineConfig::default(), true)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("refused"));
    }
}
