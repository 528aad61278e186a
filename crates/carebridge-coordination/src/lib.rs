//! Care-coordination services for CareBridge.
//!
//! This crate implements the state-sensitive heart of the platform over the
//! [`carebridge_storage::CareStore`] abstraction:
//!
//! - [`StatusTransitionCoordinator`]: the two-party consensus protocol
//!   gating closure of a care episode, plus the unilateral transitions.
//! - [`AssignmentRegistry`]: the read-only "is this doctor authorized for
//!   this patient" view.
//! - [`ChatRegistry`]: idempotent resolution of the single chat shared by
//!   a (clinic, doctor, patient) triple, behind the assignment gate.
//! - [`MessageService`]: atomic message+attachment appends, explicit
//!   history orderings with a pagination envelope, and best-effort
//!   publication to an injected [`carebridge_realtime::RealtimeBroadcaster`].
//! - [`PatientService`]: patient lifecycle and post-episode feedback.
//!
//! Every service is a stateless handle over `Arc`ed collaborators; all
//! shared mutable state lives in the store.

mod assignment;
mod chat;
mod error;
mod messages;
mod patients;
mod status;

pub use assignment::AssignmentRegistry;
pub use chat::{ChatRegistry, ChatWithContext, PatientSummary};
pub use error::{CoordinationError, Result};
pub use messages::{MessageHistory, MessageService, MAX_PAGE_LIMIT};
pub use patients::PatientService;
pub use status::{StatusChangeOutcome, StatusTransitionCoordinator};
