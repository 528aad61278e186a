use async_trait::async_trait;
use dashmap::DashMap;
use tokio::sync::broadcast;

use carebridge_core::ChatId;

use crate::broadcaster::RealtimeBroadcaster;
use crate::error::BroadcastError;
use crate::types::ChatEvent;

const DEFAULT_CHANNEL_CAPACITY: usize = 256;

/// In-process fan-out over one tokio broadcast channel per chat.
///
/// Transports (e.g. a websocket handler) subscribe with the chat id their
/// client is watching; the coordination core publishes through the
/// [`RealtimeBroadcaster`] impl. Slow receivers lag and drop per tokio
/// broadcast semantics rather than blocking the publisher.
#[derive(Debug)]
pub struct ChannelBroadcaster {
    channels: DashMap<ChatId, broadcast::Sender<ChatEvent>>,
    capacity: usize,
}

impl ChannelBroadcaster {
    /// Creates a broadcaster with the default per-channel capacity.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CHANNEL_CAPACITY)
    }

    /// Creates a broadcaster with the given per-channel buffer capacity.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            channels: DashMap::new(),
            capacity,
        }
    }

    /// Subscribes to a chat's channel, creating the channel on first use.
    pub fn subscribe(&self, channel: ChatId) -> broadcast::Receiver<ChatEvent> {
        self.channels
            .entry(channel)
            .or_insert_with(|| broadcast::channel(self.capacity).0)
            .subscribe()
    }

    /// Number of live subscribers on a channel.
    #[must_use]
    pub fn subscriber_count(&self, channel: ChatId) -> usize {
        self.channels
            .get(&channel)
            .map_or(0, |sender| sender.receiver_count())
    }
}

impl Default for ChannelBroadcaster {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RealtimeBroadcaster for ChannelBroadcaster {
    async fn publish(&self, channel: ChatId, event: ChatEvent) -> Result<(), BroadcastError> {
        if let Some(sender) = self.channels.get(&channel) {
            // send() errs only when every receiver is gone; an empty
            // audience is fine.
            let _ = sender.send(event);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use carebridge_core::{Message, Party};
    use time::OffsetDateTime;
    use uuid::Uuid;

    fn sample_event(chat_id: ChatId) -> ChatEvent {
        ChatEvent::MessagePosted {
            message: Message {
                id: Uuid::new_v4(),
                chat_id,
                content: "checking in".into(),
                sender: Party::Clinic(Uuid::new_v4()),
                attachments: vec![],
                created_at: OffsetDateTime::now_utc(),
            },
        }
    }

    #[tokio::test]
    async fn subscriber_receives_published_event() {
        let broadcaster = ChannelBroadcaster::new();
        let chat_id = Uuid::new_v4();
        let mut rx = broadcaster.subscribe(chat_id);

        broadcaster
            .publish(chat_id, sample_event(chat_id))
            .await
            .unwrap();

        let ChatEvent::MessagePosted { message } = rx.recv().await.unwrap();
        assert_eq!(message.chat_id, chat_id);
    }

    #[tokio::test]
    async fn publish_without_subscribers_succeeds() {
        let broadcaster = ChannelBroadcaster::new();
        let chat_id = Uuid::new_v4();
        broadcaster
            .publish(chat_id, sample_event(chat_id))
            .await
            .unwrap();
        assert_eq!(broadcaster.subscriber_count(chat_id), 0);
    }

    #[tokio::test]
    async fn channels_are_isolated_per_chat() {
        let broadcaster = ChannelBroadcaster::new();
        let chat_a = Uuid::new_v4();
        let chat_b = Uuid::new_v4();
        let mut rx_b = broadcaster.subscribe(chat_b);

        broadcaster
            .publish(chat_a, sample_event(chat_a))
            .await
            .unwrap();

        assert!(matches!(
            rx_b.try_recv(),
            Err(broadcast::error::TryRecvError::Empty)
        ));
    }
}
