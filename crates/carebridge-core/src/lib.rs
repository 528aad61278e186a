//! Core domain types for the CareBridge care-coordination platform.
//!
//! This crate defines the entities shared by every other CareBridge crate:
//! patients and their care-episode status, the clinic/doctor `Party` union,
//! chats and messages, consent records for the episode-completion protocol,
//! and the pagination envelope used by windowed list results.
//!
//! It deliberately contains no I/O: storage backends live in
//! `carebridge-db-*`, the service layer in `carebridge-coordination`.

pub mod error;
pub mod id;
pub mod page;
pub mod party;

mod chat;
mod consent;
mod patient;

pub use chat::{Attachment, AttachmentKind, Chat, ChatParticipant, Message};
pub use consent::StatusChangeRequest;
pub use error::{CoreError, ErrorCategory, Result};
pub use id::{AttachmentId, ChatId, ClinicId, DoctorId, FeedbackId, MessageId, PatientId};
pub use page::{MessageOrder, PageMeta};
pub use party::{Party, PartyRole};
pub use patient::{Feedback, GeoPoint, Gender, Patient, PatientStatus};
