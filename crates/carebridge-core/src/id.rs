// Entity identifiers. Identity (clinic/doctor accounts) is verified by an
// external service; CareBridge only carries the ids around.
use uuid::Uuid;

pub type PatientId = Uuid;
pub type ClinicId = Uuid;
pub type DoctorId = Uuid;
pub type ChatId = Uuid;
pub type MessageId = Uuid;
pub type AttachmentId = Uuid;
pub type FeedbackId = Uuid;

/// Generates a fresh entity id.
pub fn generate_id() -> Uuid {
    Uuid::new_v4()
}
