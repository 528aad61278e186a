//! The dual-consent protocol for closing a care episode.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};

use carebridge_core::{PartyRole, Patient, PatientId, PatientStatus, StatusChangeRequest};
use carebridge_storage::{CareStore, CompletionConsent};

use crate::error::{CoordinationError, Result};

/// Result of a status-change request.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "camelCase")]
pub enum StatusChangeOutcome {
    /// The transition applied; here is the updated patient.
    #[serde(rename_all = "camelCase")]
    Applied { patient: Patient },
    /// The acceptance was recorded; the counterpart has not accepted yet.
    #[serde(rename_all = "camelCase")]
    AwaitingCounterpart { request: StatusChangeRequest },
}

/// Coordinates status transitions on a patient's care episode.
///
/// Only the terminal `Completed` transition is mediated: while at least one
/// doctor is assigned, the owning clinic and an assigned doctor must both
/// accept before the episode closes. Every other transition, including
/// reopening a completed episode, applies unilaterally from either party.
///
/// Per patient and terminal target the protocol is a three-state machine:
/// no pending record, pending with one flag set, done. The first acceptance
/// creates the record, the counterpart's acceptance consumes it and closes
/// the episode; both end states absorb further acceptances of the same
/// kind. Each acceptance executes as one store transaction, so of two
/// concurrent acceptances exactly one observes completion.
#[derive(Clone)]
pub struct StatusTransitionCoordinator {
    store: Arc<dyn CareStore>,
}

impl StatusTransitionCoordinator {
    /// Creates a coordinator over the given store.
    #[must_use]
    pub fn new(store: Arc<dyn CareStore>) -> Self {
        Self { store }
    }

    /// Requests a status change on behalf of one party.
    ///
    /// Target-status validation happens when the caller parses the status
    /// string into [`PatientStatus`]; by the time a value reaches this
    /// method it is a recognized status.
    ///
    /// # Errors
    ///
    /// - `NotFound` when the patient does not exist.
    /// - `Conflict` when the requesting party has already accepted the
    ///   pending completion; state is left unchanged.
    /// - `Internal` when the store keeps failing after the one-shot retry.
    #[instrument(skip(self), fields(patient_id = %patient_id, target = %target, role = %role))]
    pub async fn request_status_change(
        &self,
        patient_id: PatientId,
        target: PatientStatus,
        role: PartyRole,
    ) -> Result<StatusChangeOutcome> {
        if !target.is_terminal() {
            let patient = self.store.update_patient_status(patient_id, target).await?;
            info!(status = %patient.status, "status applied unilaterally");
            return Ok(StatusChangeOutcome::Applied { patient });
        }

        let consent = match self.store.accept_completion(patient_id, role).await {
            Err(err) if err.is_retryable() => {
                // Concurrent acceptances can collide on the consent record;
                // re-execute the whole read-modify-write once.
                warn!(error = %err, "completion acceptance conflicted, retrying once");
                self.store.accept_completion(patient_id, role).await?
            }
            other => other?,
        };

        match consent {
            CompletionConsent::Completed(patient) => {
                info!("care episode closed");
                Ok(StatusChangeOutcome::Applied { patient })
            }
            CompletionConsent::Pending(request) => {
                info!(counterpart = %role.counterpart(), "acceptance recorded, awaiting counterpart");
                Ok(StatusChangeOutcome::AwaitingCounterpart { request })
            }
            CompletionConsent::AlreadyAccepted(_) => Err(CoordinationError::conflict(format!(
                "completion already accepted by the {role}; awaiting the {}",
                role.counterpart()
            ))),
        }
    }

    /// Reads the pending completion-consent record for a patient, if any.
    pub async fn pending_request(
        &self,
        patient_id: PatientId,
    ) -> Result<Option<StatusChangeRequest>> {
        Ok(self.store.pending_completion(patient_id).await?)
    }
}
