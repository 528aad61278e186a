//! Storage abstraction layer for CareBridge.
//!
//! This crate defines the contract every storage backend implements. The
//! central design rule: every multi-step invariant of the coordination core
//! (dual-consent resolution, idempotent chat find-or-create, atomic
//! message+attachment append) is a *single* trait operation, so each backend
//! implements it inside one transaction and the service layer cannot
//! express a racy read-then-write against shared state.
//!
//! Backends:
//! - `carebridge-db-postgres`: production backend over sqlx.
//! - `carebridge-db-memory`: in-memory backend for tests and development.

mod error;
mod traits;
mod types;

pub use error::{ErrorCategory, StorageError};
pub use traits::CareStore;
pub use types::{
    ChatSnapshot, CompletionConsent, MessagePage, NewAttachment, NewMessage, NewPatient,
};
