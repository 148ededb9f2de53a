//! Approval workflow engine
//!
//! Walks approvable objects through the ordered steps of a
//! [`WorkflowDefinition`](approval_types::WorkflowDefinition):
//!
//! - [`ApproverResolver`] decides who may act on a step
//! - [`StepPlanner`] picks the step an instance lands on, skipping steps the
//!   submitter could approve themselves and steps whose rules do not hold
//! - [`WorkflowEngine`] owns the status machine, quorum counting, the
//!   completion hook and notifications
//!
//! Persistence, identities and delivery are injected through the traits in
//! [`traits`]; [`memory`] and [`notify`] provide in-process implementations.

#![deny(unsafe_code)]

mod config;
mod engine;
pub mod memory;
pub mod notify;
mod planner;
mod resolver;
mod subject;
pub mod traits;

pub use config::EngineConfig;
pub use engine::{ActionRequest, OutcomeKind, TransitionOutcome, WorkflowEngine};
pub use memory::{InMemoryDirectory, InMemoryInstanceStore, InMemoryWorkflowRepository};
pub use notify::{Delivery, RecordingNotifier, TracingNotifier};
pub use planner::{PlanStart, SkipReason, SkippedStep, StepPlanner, StepResolution};
pub use resolver::ApproverResolver;
pub use subject::ApprovableRecord;
pub use traits::{
    Approvable, HookError, IdentityDirectory, InstanceCommit, InstanceStore, Notifier,
    NotifyError, WorkflowRepository,
};
