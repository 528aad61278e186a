//! Value types exchanged with storage backends.

use serde::{Deserialize, Serialize};
use time::Date;

use carebridge_core::{
    Attachment, AttachmentKind, Chat, ChatId, ChatParticipant, ClinicId, GeoPoint, Gender, Message,
    Party, Patient, StatusChangeRequest,
};

/// Input for creating a patient. The store assigns id, status (`Active`),
/// and creation time.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewPatient {
    pub name: String,
    pub phone: String,
    pub gender: Gender,
    pub date_of_birth: Date,
    pub address: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<GeoPoint>,
    pub clinic_id: ClinicId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub procedure_note: Option<String>,
}

/// Input for appending a message to a chat.
///
/// The message row and all attachment rows commit together; the store also
/// bumps the chat's `last_message_at` in the same transaction.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewMessage {
    pub chat_id: ChatId,
    pub content: String,
    pub sender: Party,
    #[serde(default)]
    pub attachments: Vec<NewAttachment>,
}

/// Input for one attachment of a new message.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewAttachment {
    pub filename: String,
    pub url: String,
    pub kind: AttachmentKind,
}

impl NewAttachment {
    /// Materializes this input into a stored attachment of `message`.
    #[must_use]
    pub fn into_attachment(self, message_id: carebridge_core::MessageId) -> Attachment {
        Attachment {
            id: carebridge_core::id::generate_id(),
            message_id,
            filename: self.filename,
            url: self.url,
            kind: self.kind,
        }
    }
}

/// A chat together with its two participants, as returned by chat lookup
/// and find-or-create.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatSnapshot {
    pub chat: Chat,
    pub participants: Vec<ChatParticipant>,
    /// Number of messages in the chat at read time.
    pub message_count: u64,
    /// `true` when this call created the chat, `false` on the idempotent
    /// lookup path.
    pub created: bool,
}

/// Outcome of one acceptance step of the episode-completion protocol.
///
/// The whole step executes inside one store transaction, so exactly one
/// concurrent caller can ever observe `Completed` for a given episode.
#[derive(Debug, Clone)]
pub enum CompletionConsent {
    /// Both parties have now accepted (or no counterpart was required);
    /// the episode is closed and the consent record, if any, is deleted.
    Completed(Patient),
    /// The acceptance was recorded; the counterpart has not accepted yet.
    Pending(StatusChangeRequest),
    /// The requesting party had already accepted the pending record.
    /// State is unchanged.
    AlreadyAccepted(StatusChangeRequest),
}

/// One window of a chat's message history plus the chat-wide total.
#[derive(Debug, Clone, Default)]
pub struct MessagePage {
    /// Messages in chronological order within the window.
    pub messages: Vec<Message>,
    /// Total number of messages in the chat.
    pub total: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn test_attachment_materialization() {
        let message_id = Uuid::new_v4();
        let attachment = NewAttachment {
            filename: "scan.png".into(),
            url: "https://files.example/scan.png".into(),
            kind: AttachmentKind::Image,
        }
        .into_attachment(message_id);

        assert_eq!(attachment.message_id, message_id);
        assert_eq!(attachment.kind, AttachmentKind::Image);
    }

    #[test]
    fn test_new_message_serde_defaults() {
        let json = serde_json::json!({
            "chatId": Uuid::new_v4(),
            "content": "hello",
            "sender": {"type": "clinic", "id": Uuid::new_v4()},
        });
        let message: NewMessage = serde_json::from_value(json).unwrap();
        assert!(message.attachments.is_empty());
    }
}
