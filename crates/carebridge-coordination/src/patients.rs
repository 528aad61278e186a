//! Patient lifecycle and post-episode feedback.

use std::sync::Arc;

use tracing::{info, instrument};

use carebridge_core::{ClinicId, DoctorId, Feedback, Patient, PatientId};
use carebridge_storage::{CareStore, NewPatient};

use crate::error::{CoordinationError, Result};

/// Manages patients on behalf of their owning clinic.
#[derive(Clone)]
pub struct PatientService {
    store: Arc<dyn CareStore>,
}

impl PatientService {
    /// Creates a service over the given store.
    #[must_use]
    pub fn new(store: Arc<dyn CareStore>) -> Self {
        Self { store }
    }

    /// Creates a patient owned by the given clinic, with an active episode.
    ///
    /// # Errors
    ///
    /// Returns `Validation` when name or phone is empty.
    #[instrument(skip(self, new), fields(clinic_id = %new.clinic_id))]
    pub async fn create_patient(&self, new: NewPatient) -> Result<Patient> {
        if new.name.trim().is_empty() {
            return Err(CoordinationError::validation("patient name is required"));
        }
        if new.phone.trim().is_empty() {
            return Err(CoordinationError::validation("patient phone is required"));
        }
        let patient = self.store.create_patient(new).await?;
        info!(patient_id = %patient.id, "patient created");
        Ok(patient)
    }

    /// Reads a patient by id.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` when the patient does not exist.
    pub async fn patient(&self, id: PatientId) -> Result<Patient> {
        self.store
            .patient(id)
            .await?
            .ok_or_else(|| CoordinationError::not_found("Patient", id))
    }

    /// Deletes a patient, cascading its feedback. Chats are retained.
    #[instrument(skip(self), fields(patient_id = %id))]
    pub async fn delete_patient(&self, id: PatientId) -> Result<()> {
        self.store.delete_patient(id).await?;
        info!("patient deleted");
        Ok(())
    }

    /// Transfers a patient to another clinic. This is the explicit
    /// re-assignment path; ownership is otherwise immutable.
    #[instrument(skip(self), fields(patient_id = %id, new_clinic_id = %new_clinic_id))]
    pub async fn transfer_patient(
        &self,
        id: PatientId,
        new_clinic_id: ClinicId,
    ) -> Result<Patient> {
        let patient = self.store.transfer_patient(id, new_clinic_id).await?;
        info!("patient transferred");
        Ok(patient)
    }

    /// Assigns a doctor to a patient. Idempotent.
    #[instrument(skip(self), fields(patient_id = %patient_id, doctor_id = %doctor_id))]
    pub async fn assign_doctor(
        &self,
        patient_id: PatientId,
        doctor_id: DoctorId,
    ) -> Result<Patient> {
        Ok(self.store.assign_doctor(patient_id, doctor_id).await?)
    }

    /// Removes a doctor from a patient's assigned set. Idempotent.
    #[instrument(skip(self), fields(patient_id = %patient_id, doctor_id = %doctor_id))]
    pub async fn unassign_doctor(
        &self,
        patient_id: PatientId,
        doctor_id: DoctorId,
    ) -> Result<Patient> {
        Ok(self.store.unassign_doctor(patient_id, doctor_id).await?)
    }

    /// Adds a post-episode feedback entry.
    ///
    /// # Errors
    ///
    /// - `Validation` when the content is empty or the episode is still
    ///   active (feedback is a post-episode artifact; the store enforces
    ///   the status gate inside the insert transaction).
    /// - `NotFound` when the patient does not exist.
    #[instrument(skip(self, content), fields(patient_id = %patient_id))]
    pub async fn add_feedback(&self, patient_id: PatientId, content: String) -> Result<Feedback> {
        if content.trim().is_empty() {
            return Err(CoordinationError::validation("feedback content is required"));
        }
        Ok(self.store.add_feedback(patient_id, content).await?)
    }

    /// Lists a patient's feedback in creation order.
    pub async fn feedback_for(&self, patient_id: PatientId) -> Result<Vec<Feedback>> {
        Ok(self.store.feedback_for_patient(patient_id).await?)
    }
}
