//! The transient consent record behind the episode-completion protocol.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::id::PatientId;
use crate::party::PartyRole;
use crate::patient::PatientStatus;

/// In-flight consensus for one target status on one patient.
///
/// At most one such record exists per (patient, target status) at any time.
/// It is created on the first partial acceptance and deleted the instant
/// both flags become true; the record never outlives its own resolution.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusChangeRequest {
    pub id: Uuid,
    pub patient_id: PatientId,
    pub target_status: PatientStatus,
    pub doctor_accepted: bool,
    pub clinic_accepted: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl StatusChangeRequest {
    /// Returns `true` if the given role has already accepted.
    #[must_use]
    pub fn accepted_by(&self, role: PartyRole) -> bool {
        match role {
            PartyRole::Doctor => self.doctor_accepted,
            PartyRole::Clinic => self.clinic_accepted,
        }
    }

    /// Returns `true` once both parties have accepted.
    #[must_use]
    pub fn is_resolved(&self) -> bool {
        self.doctor_accepted && self.clinic_accepted
    }

    /// Records an acceptance by the given role.
    pub fn accept(&mut self, role: PartyRole) {
        match role {
            PartyRole::Doctor => self.doctor_accepted = true,
            PartyRole::Clinic => self.clinic_accepted = true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pending(role: PartyRole) -> StatusChangeRequest {
        let mut request = StatusChangeRequest {
            id: Uuid::new_v4(),
            patient_id: Uuid::new_v4(),
            target_status: PatientStatus::Completed,
            doctor_accepted: false,
            clinic_accepted: false,
            created_at: OffsetDateTime::now_utc(),
        };
        request.accept(role);
        request
    }

    #[test]
    fn test_single_acceptance_is_not_resolved() {
        let request = pending(PartyRole::Clinic);
        assert!(request.accepted_by(PartyRole::Clinic));
        assert!(!request.accepted_by(PartyRole::Doctor));
        assert!(!request.is_resolved());
    }

    #[test]
    fn test_counterpart_acceptance_resolves() {
        let mut request = pending(PartyRole::Doctor);
        request.accept(PartyRole::Clinic);
        assert!(request.is_resolved());
    }

    #[test]
    fn test_repeat_acceptance_is_observable() {
        let request = pending(PartyRole::Doctor);
        // The coordinator rejects a second acceptance from the same party;
        // the record itself only answers who has accepted so far.
        assert!(request.accepted_by(PartyRole::Doctor));
    }
}
