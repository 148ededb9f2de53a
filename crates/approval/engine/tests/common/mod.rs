#![allow(dead_code)]

use approval_engine::{
    Approvable, EngineConfig, HookError, InMemoryDirectory, InMemoryInstanceStore,
    InMemoryWorkflowRepository, Notifier, RecordingNotifier, WorkflowEngine,
};
use approval_rules::Subject;
use approval_types::{ApprovalInstance, Identity, Step, UserId, WorkflowDefinition, WorkflowId};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

pub const MODEL: &str = "budget_commitment";

/// A budget commitment with a countable completion hook
pub struct Commitment {
    pub id: String,
    pub attributes: Value,
    pub hook_calls: AtomicU32,
    pub fail_hook: bool,
}

impl Commitment {
    pub fn new(amount: i64) -> Self {
        Self {
            id: "bc-1001".to_string(),
            attributes: json!({
                "amount": amount,
                "currency": "CHF",
                "department": {"code": "FIN"}
            }),
            hook_calls: AtomicU32::new(0),
            fail_hook: false,
        }
    }

    pub fn failing_hook(mut self) -> Self {
        self.fail_hook = true;
        self
    }

    pub fn hook_calls(&self) -> u32 {
        self.hook_calls.load(Ordering::SeqCst)
    }
}

impl Subject for Commitment {
    fn attribute(&self, name: &str) -> Option<Value> {
        self.attributes.attribute(name)
    }
}

#[async_trait]
impl Approvable for Commitment {
    fn approvable_type(&self) -> &str {
        MODEL
    }

    fn approvable_id(&self) -> String {
        self.id.clone()
    }

    async fn on_approved(&self, _instance: &ApprovalInstance) -> Result<(), HookError> {
        self.hook_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_hook {
            return Err(HookError("ledger period is closed".into()));
        }
        Ok(())
    }
}

/// alice submits; everyone else holds approval roles
pub fn directory() -> InMemoryDirectory {
    InMemoryDirectory::new()
        .with_identity(Identity::new("alice", "Alice").with_email("alice@example.org"))
        .with_identity(Identity::new("rita", "Rita").with_role("reviewer"))
        .with_identity(Identity::new("ravi", "Ravi").with_role("reviewer"))
        .with_identity(Identity::new("abe", "Abe").with_role("approver"))
        .with_identity(Identity::new("ada", "Ada").with_role("approver"))
        .with_identity(Identity::new("avi", "Avi").with_role("approver"))
        .with_identity(Identity::new("mia", "Mia").with_role("finance"))
        .with_identity(Identity::new("sam", "Sam").with_role("manager"))
        .with_identity(Identity::new("cfo", "Cleo").with_permission("budget.sign"))
}

pub fn user(id: &str) -> UserId {
    UserId::new(id)
}

pub struct Harness {
    pub engine: Arc<WorkflowEngine>,
    pub repository: Arc<InMemoryWorkflowRepository>,
    pub store: Arc<InMemoryInstanceStore>,
    pub notifier: Arc<RecordingNotifier>,
    pub directory: Arc<InMemoryDirectory>,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_config(EngineConfig::default())
    }

    pub fn with_config(config: EngineConfig) -> Self {
        let notifier = Arc::new(RecordingNotifier::new());
        Self::build(config, notifier.clone(), notifier)
    }

    /// Engine whose notifications go to `sink`; `notifier` stays empty
    pub fn with_notifier(sink: Arc<dyn Notifier>) -> Self {
        Self::build(EngineConfig::default(), sink, Arc::new(RecordingNotifier::new()))
    }

    fn build(
        config: EngineConfig,
        sink: Arc<dyn Notifier>,
        notifier: Arc<RecordingNotifier>,
    ) -> Self {
        let repository = Arc::new(InMemoryWorkflowRepository::new());
        let store = Arc::new(InMemoryInstanceStore::new());
        let directory = Arc::new(directory());
        let engine = WorkflowEngine::new(
            repository.clone(),
            store.clone(),
            directory.clone(),
            sink,
            config,
        );
        Self {
            engine: Arc::new(engine),
            repository,
            store,
            notifier,
            directory,
        }
    }

    pub fn register(&self, steps: Vec<Step>) -> WorkflowId {
        let mut definition = WorkflowDefinition::new("Budget commitment approval", MODEL).active();
        for step in steps {
            definition.add_step(step).unwrap();
        }
        self.repository.register(definition).unwrap()
    }
}

/// The two-stage workflow: one reviewer, then two of the approvers
pub fn review_then_panel() -> Vec<Step> {
    vec![
        Step::approval("review", 10, "Review").approved_by_roles(["reviewer"]),
        Step::approval("panel", 20, "Approval panel")
            .parallel(2)
            .approved_by_roles(["approver"]),
    ]
}
