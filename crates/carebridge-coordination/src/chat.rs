//! Idempotent resolution of the chat shared by a clinic, doctor, and patient.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};

use carebridge_core::{
    Chat, ChatParticipant, ClinicId, DoctorId, PatientId, PatientStatus,
};
use carebridge_storage::CareStore;

use crate::assignment::AssignmentRegistry;
use crate::error::{CoordinationError, Result};

/// The slice of a patient callers need alongside a chat.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatientSummary {
    pub id: PatientId,
    pub name: String,
    pub status: PatientStatus,
}

/// A resolved chat with its participants and patient context.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatWithContext {
    pub chat: Chat,
    pub participants: Vec<ChatParticipant>,
    pub patient: PatientSummary,
    pub message_count: u64,
    /// `true` when this call created the chat.
    pub created: bool,
}

/// Creates and looks up the single chat per (clinic, doctor, patient)
/// triple, enforcing the domain authorization gate: the clinic must own the
/// patient and the doctor must be assigned to it per
/// [`AssignmentRegistry`].
#[derive(Clone)]
pub struct ChatRegistry {
    store: Arc<dyn CareStore>,
    assignments: AssignmentRegistry,
}

impl ChatRegistry {
    /// Creates a registry over the given store.
    #[must_use]
    pub fn new(store: Arc<dyn CareStore>) -> Self {
        let assignments = AssignmentRegistry::new(store.clone());
        Self { store, assignments }
    }

    /// Returns the chat for the triple, creating it when absent.
    ///
    /// Concurrent calls with the same triple converge on the same chat id;
    /// the store resolves the find-or-create in one transaction and this
    /// registry retries once when two first calls race.
    ///
    /// # Errors
    ///
    /// - `NotFound` when the patient does not exist.
    /// - `Validation` when the clinic does not own the patient or the
    ///   doctor is not assigned to it.
    #[instrument(skip(self), fields(patient_id = %patient_id, clinic_id = %clinic_id, doctor_id = %doctor_id))]
    pub async fn get_or_create_chat(
        &self,
        doctor_id: DoctorId,
        clinic_id: ClinicId,
        patient_id: PatientId,
    ) -> Result<ChatWithContext> {
        let patient = self
            .store
            .patient(patient_id)
            .await?
            .ok_or_else(|| CoordinationError::not_found("Patient", patient_id))?;

        if !patient.owned_by(clinic_id) {
            return Err(CoordinationError::validation(
                "patient is not owned by this clinic",
            ));
        }
        if !self.assignments.is_authorized(doctor_id, patient_id).await? {
            return Err(CoordinationError::validation(
                "doctor is not assigned to this patient",
            ));
        }

        let snapshot = match self
            .store
            .find_or_create_chat(patient_id, clinic_id, doctor_id)
            .await
        {
            Err(err) if err.is_retryable() => {
                // Two racing first calls: the loser re-reads the winner's chat.
                warn!(error = %err, "chat creation raced, retrying once");
                self.store
                    .find_or_create_chat(patient_id, clinic_id, doctor_id)
                    .await?
            }
            other => other?,
        };

        if snapshot.created {
            info!(chat_id = %snapshot.chat.id, "chat created");
        }

        Ok(ChatWithContext {
            chat: snapshot.chat,
            participants: snapshot.participants,
            patient: PatientSummary {
                id: patient.id,
                name: patient.name,
                status: patient.status,
            },
            message_count: snapshot.message_count,
            created: snapshot.created,
        })
    }
}
