//! Patients and care-episode lifecycle.

use serde::{Deserialize, Serialize};
use time::{Date, OffsetDateTime};

use crate::id::{ClinicId, DoctorId, FeedbackId, PatientId};

/// Lifecycle status of a patient's care episode.
///
/// `Completed` is the terminal "episode closed" state; closing it while
/// doctors are assigned is gated by the dual-consent protocol in
/// `carebridge-coordination`. Every other transition applies unilaterally.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PatientStatus {
    Active,
    Completed,
}

impl PatientStatus {
    /// Returns `true` for the terminal episode-closed status.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed)
    }
}

impl std::fmt::Display for PatientStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Active => write!(f, "active"),
            Self::Completed => write!(f, "completed"),
        }
    }
}

impl std::str::FromStr for PatientStatus {
    type Err = crate::CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "active" => Ok(Self::Active),
            "completed" => Ok(Self::Completed),
            other => Err(crate::CoreError::InvalidStatus(other.to_string())),
        }
    }
}

/// Patient gender as recorded at intake.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Male,
    Female,
    Other,
}

impl std::fmt::Display for Gender {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Male => write!(f, "male"),
            Self::Female => write!(f, "female"),
            Self::Other => write!(f, "other"),
        }
    }
}

impl std::str::FromStr for Gender {
    type Err = crate::CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "male" => Ok(Self::Male),
            "female" => Ok(Self::Female),
            "other" => Ok(Self::Other),
            other => Err(crate::CoreError::InvalidGender(other.to_string())),
        }
    }
}

/// A geographic coordinate attached to a patient's address.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
}

/// The record a clinic and its assigned doctors collaborate around.
///
/// Owned by exactly one clinic; the owning clinic is immutable after
/// creation except through the explicit transfer operation. The
/// assigned-doctor set is the authorization relation for the whole chat
/// subsystem and for consent on episode completion.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Patient {
    pub id: PatientId,
    pub name: String,
    pub phone: String,
    pub gender: Gender,
    pub date_of_birth: Date,
    pub address: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<GeoPoint>,
    pub clinic_id: ClinicId,
    pub status: PatientStatus,
    /// Doctors currently assigned to this patient.
    #[serde(default)]
    pub doctor_ids: Vec<DoctorId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub procedure_note: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl Patient {
    /// Returns `true` if the given doctor is assigned to this patient.
    #[must_use]
    pub fn is_assigned(&self, doctor_id: DoctorId) -> bool {
        self.doctor_ids.contains(&doctor_id)
    }

    /// Returns `true` if the given clinic owns this patient.
    #[must_use]
    pub fn owned_by(&self, clinic_id: ClinicId) -> bool {
        self.clinic_id == clinic_id
    }

    /// Returns `true` if no doctors are assigned.
    #[must_use]
    pub fn has_no_doctors(&self) -> bool {
        self.doctor_ids.is_empty()
    }
}

/// A post-episode note left on a patient.
///
/// Feedback may only be created once the episode is no longer active.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Feedback {
    pub id: FeedbackId,
    pub patient_id: PatientId,
    pub content: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn sample_patient() -> Patient {
        Patient {
            id: Uuid::new_v4(),
            name: "Jordan Alvarez".into(),
            phone: "+31 6 1234 5678".into(),
            gender: Gender::Other,
            date_of_birth: Date::from_calendar_date(1987, time::Month::March, 14).unwrap(),
            address: "Keizersgracht 1, Amsterdam".into(),
            location: None,
            clinic_id: Uuid::new_v4(),
            status: PatientStatus::Active,
            doctor_ids: vec![],
            procedure_note: None,
            created_at: OffsetDateTime::now_utc(),
        }
    }

    #[test]
    fn test_status_parse_and_display() {
        assert_eq!(
            "active".parse::<PatientStatus>().unwrap(),
            PatientStatus::Active
        );
        assert_eq!(
            "Completed".parse::<PatientStatus>().unwrap(),
            PatientStatus::Completed
        );
        assert!("archived".parse::<PatientStatus>().is_err());
        assert_eq!(PatientStatus::Completed.to_string(), "completed");
    }

    #[test]
    fn test_terminal_status() {
        assert!(PatientStatus::Completed.is_terminal());
        assert!(!PatientStatus::Active.is_terminal());
    }

    #[test]
    fn test_assignment_helpers() {
        let mut patient = sample_patient();
        let doctor = Uuid::new_v4();

        assert!(patient.has_no_doctors());
        assert!(!patient.is_assigned(doctor));

        patient.doctor_ids.push(doctor);
        assert!(patient.is_assigned(doctor));
        assert!(!patient.has_no_doctors());
    }

    #[test]
    fn test_ownership() {
        let patient = sample_patient();
        assert!(patient.owned_by(patient.clinic_id));
        assert!(!patient.owned_by(Uuid::new_v4()));
    }

    #[test]
    fn test_patient_serde_round_trip() {
        let patient = sample_patient();
        let json = serde_json::to_string(&patient).unwrap();
        let back: Patient = serde_json::from_str(&json).unwrap();
        assert_eq!(back.id, patient.id);
        assert_eq!(back.status, patient.status);
        assert_eq!(back.date_of_birth, patient.date_of_birth);
    }
}
