//! Read-only view over the patient↔doctor assignment relation.

use std::sync::Arc;

use carebridge_core::{DoctorId, PatientId};
use carebridge_storage::{CareStore, StorageError};

use crate::error::Result;

/// Answers "is doctor D authorized for patient P".
///
/// The assignment set is the authorization relation for the whole chat
/// subsystem; [`crate::ChatRegistry`] consults this view before resolving
/// a chat.
#[derive(Clone)]
pub struct AssignmentRegistry {
    store: Arc<dyn CareStore>,
}

impl AssignmentRegistry {
    /// Creates a registry over the given store.
    #[must_use]
    pub fn new(store: Arc<dyn CareStore>) -> Self {
        Self { store }
    }

    /// Returns `true` when the doctor is assigned to the patient.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` when the patient does not exist.
    pub async fn is_authorized(&self, doctor_id: DoctorId, patient_id: PatientId) -> Result<bool> {
        let patient = self
            .store
            .patient(patient_id)
            .await?
            .ok_or_else(|| StorageError::not_found("Patient", patient_id))
            .map_err(crate::CoordinationError::from)?;
        Ok(patient.is_assigned(doctor_id))
    }

    /// Returns the patient's assigned doctors.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` when the patient does not exist.
    pub async fn assigned_doctors(&self, patient_id: PatientId) -> Result<Vec<DoctorId>> {
        let patient = self
            .store
            .patient(patient_id)
            .await?
            .ok_or_else(|| StorageError::not_found("Patient", patient_id))
            .map_err(crate::CoordinationError::from)?;
        Ok(patient.doctor_ids)
    }
}
