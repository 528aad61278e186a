//! The storage trait every CareBridge backend implements.

use async_trait::async_trait;

use carebridge_core::{
    Chat, ChatId, ChatParticipant, ClinicId, DoctorId, Feedback, Message, MessageId, MessageOrder,
    PartyRole, Patient, PatientId, PatientStatus, StatusChangeRequest,
};

use crate::error::StorageError;
use crate::types::{ChatSnapshot, CompletionConsent, MessagePage, NewMessage, NewPatient};

/// The storage contract for the care-coordination core.
///
/// Implementations must be thread-safe (`Send + Sync`). Operations that
/// touch more than one record (consent resolution, chat find-or-create,
/// message append) are atomic: a backend either commits every effect of
/// the operation or none of them.
///
/// # Example
///
/// ```ignore
/// use carebridge_storage::{CareStore, StorageError};
///
/// async fn close_unattended(store: &dyn CareStore, id: PatientId) -> Result<(), StorageError> {
///     match store.accept_completion(id, PartyRole::Clinic).await? {
///         CompletionConsent::Completed(_) => Ok(()),
///         other => panic!("unexpected: {other:?}"),
///     }
/// }
/// ```
#[async_trait]
pub trait CareStore: Send + Sync {
    // ==================== Patients ====================

    /// Creates a new patient owned by `new.clinic_id`, with status `Active`
    /// and no assigned doctors.
    async fn create_patient(&self, new: NewPatient) -> Result<Patient, StorageError>;

    /// Reads a patient by id, including its assigned-doctor set.
    ///
    /// Returns `None` if the patient does not exist.
    async fn patient(&self, id: PatientId) -> Result<Option<Patient>, StorageError>;

    /// Deletes a patient and cascades its feedback entries.
    ///
    /// Chats referencing the patient are retained as readable history.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the patient does not exist.
    async fn delete_patient(&self, id: PatientId) -> Result<(), StorageError>;

    /// Transfers a patient to another clinic. This is the only way the
    /// owning clinic changes after creation.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the patient does not exist.
    async fn transfer_patient(
        &self,
        id: PatientId,
        new_clinic_id: ClinicId,
    ) -> Result<Patient, StorageError>;

    // ==================== Assignments ====================

    /// Adds a doctor to the patient's assigned set. Idempotent: assigning
    /// an already-assigned doctor changes nothing.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the patient does not exist.
    async fn assign_doctor(
        &self,
        patient_id: PatientId,
        doctor_id: DoctorId,
    ) -> Result<Patient, StorageError>;

    /// Removes a doctor from the patient's assigned set. Idempotent.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the patient does not exist.
    async fn unassign_doctor(
        &self,
        patient_id: PatientId,
        doctor_id: DoctorId,
    ) -> Result<Patient, StorageError>;

    // ==================== Status & consent ====================

    /// Applies a status change directly, without consent mediation.
    ///
    /// Callers route the terminal `Completed` status through
    /// [`CareStore::accept_completion`]; this operation is for the
    /// unilateral transitions.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the patient does not exist.
    async fn update_patient_status(
        &self,
        patient_id: PatientId,
        status: PatientStatus,
    ) -> Result<Patient, StorageError>;

    /// Executes one acceptance step of the episode-completion protocol as
    /// a single transaction: load the patient (locked against concurrent
    /// acceptances), count assigned doctors, then
    ///
    /// - no assigned doctors → close the episode immediately, touching no
    ///   consent record;
    /// - no pending record → create one with the accepting role's flag set;
    /// - pending record, counterpart flag set → close the episode and
    ///   delete the record;
    /// - pending record, own flag already set → report
    ///   [`CompletionConsent::AlreadyAccepted`] and change nothing.
    ///
    /// An already-closed episode returns `Completed` without touching
    /// anything; the protocol's terminal state is absorbing.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the patient does not exist, and
    /// `StorageError::TransactionConflict` when a concurrent acceptance
    /// collides; the caller re-executes the whole step on conflict.
    async fn accept_completion(
        &self,
        patient_id: PatientId,
        role: PartyRole,
    ) -> Result<CompletionConsent, StorageError>;

    /// Reads the pending completion-consent record for a patient, if any.
    async fn pending_completion(
        &self,
        patient_id: PatientId,
    ) -> Result<Option<StatusChangeRequest>, StorageError>;

    // ==================== Chats ====================

    /// Returns the single chat for the (patient, clinic, doctor) triple,
    /// creating it with its two participants when absent, in one
    /// transaction, idempotent under concurrent first calls.
    ///
    /// Referential checks against the patient (ownership, assignment) are
    /// the service layer's concern; the store only guarantees uniqueness of
    /// the triple.
    async fn find_or_create_chat(
        &self,
        patient_id: PatientId,
        clinic_id: ClinicId,
        doctor_id: DoctorId,
    ) -> Result<ChatSnapshot, StorageError>;

    /// Reads a chat by id.
    ///
    /// Returns `None` if the chat does not exist.
    async fn chat(&self, id: ChatId) -> Result<Option<Chat>, StorageError>;

    /// Reads the participants of a chat.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the chat does not exist.
    async fn chat_participants(&self, id: ChatId) -> Result<Vec<ChatParticipant>, StorageError>;

    // ==================== Messages ====================

    /// Appends a message with its attachments to a chat: verifies the chat
    /// exists and the sender is one of its participants, inserts the
    /// message row together with all attachment rows, and bumps the chat's
    /// `last_message_at`, all as one atomic write. A failed attachment
    /// insert aborts the whole append.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` for a missing chat; a sender that
    /// is not a participant reports the same error so callers cannot
    /// distinguish the two cases.
    async fn append_message(&self, new: NewMessage) -> Result<Message, StorageError>;

    /// Reads one window of a chat's history together with the chat-wide
    /// message total.
    ///
    /// `order` decides which end of the history the window is cut from
    /// (see [`MessageOrder`]); the returned window itself always reads
    /// chronologically.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the chat does not exist.
    async fn messages_page(
        &self,
        chat_id: ChatId,
        offset: u64,
        limit: u32,
        order: MessageOrder,
    ) -> Result<MessagePage, StorageError>;

    /// Reads a message by id, with attachments.
    ///
    /// Returns `None` if the message does not exist.
    async fn message(&self, id: MessageId) -> Result<Option<Message>, StorageError>;

    // ==================== Feedback ====================

    /// Adds a feedback entry to a patient. The episode-status gate
    /// (feedback only after the episode is no longer active) is enforced
    /// inside the same transaction as the insert.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the patient does not exist and
    /// `StorageError::InvalidRecord` while the episode is still active.
    async fn add_feedback(
        &self,
        patient_id: PatientId,
        content: String,
    ) -> Result<Feedback, StorageError>;

    /// Reads a patient's feedback entries in creation order.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the patient does not exist.
    async fn feedback_for_patient(
        &self,
        patient_id: PatientId,
    ) -> Result<Vec<Feedback>, StorageError>;

    // ==================== Metadata ====================

    /// Returns the name of this storage backend for logging/debugging.
    fn backend_name(&self) -> &'static str;
}

#[cfg(test)]
mod tests {
    use super::*;

    // Compile-time test that CareStore is object-safe
    fn _assert_store_object_safe(_: &dyn CareStore) {}
}
