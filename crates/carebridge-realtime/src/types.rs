use serde::{Deserialize, Serialize};

use carebridge_core::Message;

/// An event published on a chat's channel.
///
/// The payload carries the fully populated message so subscribers never
/// have to read back from storage to render it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "camelCase")]
pub enum ChatEvent {
    #[serde(rename_all = "camelCase")]
    MessagePosted { message: Message },
}

#[cfg(test)]
mod tests {
    use super::*;
    use carebridge_core::Party;
    use time::OffsetDateTime;
    use uuid::Uuid;

    #[test]
    fn test_event_serde_tag() {
        let event = ChatEvent::MessagePosted {
            message: Message {
                id: Uuid::new_v4(),
                chat_id: Uuid::new_v4(),
                content: "ping".into(),
                sender: Party::Doctor(Uuid::new_v4()),
                attachments: vec![],
                created_at: OffsetDateTime::now_utc(),
            },
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["event"], "messagePosted");
        assert_eq!(json["message"]["content"], "ping");
    }
}
