//! Approval Workflow Domain Types
//!
//! An approval workflow walks a business object (a program, a budget
//! commitment, a payment, ...) through an ordered list of approval steps
//! until it is approved, rejected, cancelled, or sent back for changes.
//!
//! # Key Concepts
//!
//! - **WorkflowDefinition**: the ordered list of [`Step`]s governing one
//!   kind of approvable object. At most one definition is active per model type.
//! - **Step**: one stage of a definition, with its approver rule
//!   ([`ApproverType`] + identifiers), its quorum ([`StepType`]) and an
//!   optional applicability condition (a JSON rule tree).
//! - **ApprovalInstance**: one run of a workflow against one approvable object.
//!   Its [`InstanceStatus`] is a closed state machine.
//! - **ApprovalAction**: the immutable record of one decision. Actions are the
//!   source of truth for quorum counting and for history display.
//! - **AuditEntry**: what the engine did and why (submitted, skipped, advanced).
//!
//! # Design Principles
//!
//! 1. `current_step_id` is set if and only if the instance is in progress.
//! 2. Approved, Rejected and Cancelled are terminal.
//! 3. Actions are append-only; nothing updates or deletes them.

#![deny(unsafe_code)]

mod action;
mod definition;
mod errors;
mod event;
mod identity;
mod ids;
mod instance;

pub use action::*;
pub use definition::*;
pub use errors::*;
pub use event::*;
pub use identity::*;
pub use ids::*;
pub use instance::*;
