//! The clinic/doctor party union.
//!
//! Chat participants and message senders are exactly one clinic or exactly
//! one doctor, never both and never neither. Modelling that as a tagged
//! union makes the invariant a compile-time property instead of a pair of
//! nullable foreign keys checked at runtime.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::id::{ClinicId, DoctorId};

/// One side of the care relationship: a clinic or a doctor, with its id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "id", rename_all = "lowercase")]
pub enum Party {
    Clinic(ClinicId),
    Doctor(DoctorId),
}

impl Party {
    /// Returns the role of this party.
    #[must_use]
    pub fn role(&self) -> PartyRole {
        match self {
            Self::Clinic(_) => PartyRole::Clinic,
            Self::Doctor(_) => PartyRole::Doctor,
        }
    }

    /// Returns the underlying identity, whichever side it belongs to.
    #[must_use]
    pub fn id(&self) -> Uuid {
        match self {
            Self::Clinic(id) | Self::Doctor(id) => *id,
        }
    }

    /// Returns the clinic id if this party is a clinic.
    #[must_use]
    pub fn as_clinic(&self) -> Option<ClinicId> {
        match self {
            Self::Clinic(id) => Some(*id),
            Self::Doctor(_) => None,
        }
    }

    /// Returns the doctor id if this party is a doctor.
    #[must_use]
    pub fn as_doctor(&self) -> Option<DoctorId> {
        match self {
            Self::Doctor(id) => Some(*id),
            Self::Clinic(_) => None,
        }
    }
}

impl std::fmt::Display for Party {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Clinic(id) => write!(f, "clinic/{id}"),
            Self::Doctor(id) => write!(f, "doctor/{id}"),
        }
    }
}

/// The role of a party, without its identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PartyRole {
    Clinic,
    Doctor,
}

impl PartyRole {
    /// The counterpart role in a two-party protocol.
    #[must_use]
    pub fn counterpart(&self) -> Self {
        match self {
            Self::Clinic => Self::Doctor,
            Self::Doctor => Self::Clinic,
        }
    }
}

impl std::fmt::Display for PartyRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Clinic => write!(f, "clinic"),
            Self::Doctor => write!(f, "doctor"),
        }
    }
}

impl std::str::FromStr for PartyRole {
    type Err = crate::CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "clinic" => Ok(Self::Clinic),
            "doctor" => Ok(Self::Doctor),
            other => Err(crate::CoreError::InvalidRole(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_party_accessors() {
        let clinic_id = Uuid::new_v4();
        let party = Party::Clinic(clinic_id);

        assert_eq!(party.role(), PartyRole::Clinic);
        assert_eq!(party.id(), clinic_id);
        assert_eq!(party.as_clinic(), Some(clinic_id));
        assert_eq!(party.as_doctor(), None);
    }

    #[test]
    fn test_party_serde_shape() {
        let id = Uuid::new_v4();
        let json = serde_json::to_value(Party::Doctor(id)).unwrap();
        assert_eq!(json["type"], "doctor");
        assert_eq!(json["id"], serde_json::json!(id));

        let back: Party = serde_json::from_value(json).unwrap();
        assert_eq!(back, Party::Doctor(id));
    }

    #[test]
    fn test_counterpart() {
        assert_eq!(PartyRole::Clinic.counterpart(), PartyRole::Doctor);
        assert_eq!(PartyRole::Doctor.counterpart(), PartyRole::Clinic);
    }

    #[test]
    fn test_role_parse() {
        assert_eq!("doctor".parse::<PartyRole>().unwrap(), PartyRole::Doctor);
        assert_eq!("CLINIC".parse::<PartyRole>().unwrap(), PartyRole::Clinic);
        assert!("patient".parse::<PartyRole>().is_err());
    }
}
