//! Message posting, history reads, and read-marking.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};

use carebridge_core::{ChatId, Message, MessageId, MessageOrder, PageMeta, Party};
use carebridge_realtime::{ChatEvent, RealtimeBroadcaster};
use carebridge_storage::{CareStore, NewAttachment, NewMessage};

use crate::error::{CoordinationError, Result};

/// Hard ceiling on the page size of history reads.
pub const MAX_PAGE_LIMIT: u32 = 100;

const DEFAULT_BROADCAST_TIMEOUT: Duration = Duration::from_secs(2);

/// One window of a chat's history with its pagination envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageHistory {
    pub messages: Vec<Message>,
    pub meta: PageMeta,
}

/// Posts and reads chat messages.
///
/// Persistence and broadcast are decoupled: the message+attachment write
/// commits first (atomically, in the store), then the event is published on
/// the chat's channel with a bounded timeout. A slow or unavailable
/// transport never fails a send; the failure is logged.
#[derive(Clone)]
pub struct MessageService {
    store: Arc<dyn CareStore>,
    broadcaster: Arc<dyn RealtimeBroadcaster>,
    broadcast_timeout: Duration,
}

impl MessageService {
    /// Creates a service over the given store and broadcaster.
    #[must_use]
    pub fn new(store: Arc<dyn CareStore>, broadcaster: Arc<dyn RealtimeBroadcaster>) -> Self {
        Self {
            store,
            broadcaster,
            broadcast_timeout: DEFAULT_BROADCAST_TIMEOUT,
        }
    }

    /// Overrides the bound on how long a publish may block a send.
    #[must_use]
    pub fn with_broadcast_timeout(mut self, timeout: Duration) -> Self {
        self.broadcast_timeout = timeout;
        self
    }

    /// Posts a message with its attachments into a chat.
    ///
    /// # Errors
    ///
    /// - `Validation` when the message has neither content nor attachments.
    /// - `NotFound` when the chat is missing or the sender is not one of
    ///   its participants; the two cases are deliberately indistinguishable
    ///   so callers cannot probe for chat existence.
    #[instrument(skip(self, content, attachments), fields(chat_id = %chat_id, sender = %sender))]
    pub async fn send_message(
        &self,
        chat_id: ChatId,
        content: String,
        sender: Party,
        attachments: Vec<NewAttachment>,
    ) -> Result<Message> {
        if content.trim().is_empty() && attachments.is_empty() {
            return Err(CoordinationError::validation(
                "message requires content or at least one attachment",
            ));
        }

        let message = self
            .store
            .append_message(NewMessage {
                chat_id,
                content,
                sender,
                attachments,
            })
            .await?;

        info!(message_id = %message.id, attachments = message.attachments.len(), "message persisted");

        // Best-effort fan-out; the write has already committed.
        let event = ChatEvent::MessagePosted {
            message: message.clone(),
        };
        match tokio::time::timeout(self.broadcast_timeout, self.broadcaster.publish(chat_id, event))
            .await
        {
            Ok(Ok(())) => {}
            Ok(Err(err)) => warn!(error = %err, "broadcast failed, message delivered on next read"),
            Err(_) => warn!(timeout_ms = %self.broadcast_timeout.as_millis(), "broadcast timed out"),
        }

        Ok(message)
    }

    /// Reads one page of a chat's history.
    ///
    /// `order` selects which end of the history the window is cut from:
    /// [`MessageOrder::ChronologicalAsc`] pages forward from the oldest
    /// message, [`MessageOrder::NewestFirst`] pages backward from the
    /// newest. Either way the returned window reads chronologically.
    ///
    /// # Errors
    ///
    /// - `Validation` when `page` or `limit` is zero.
    /// - `NotFound` when the chat does not exist.
    #[instrument(skip(self), fields(chat_id = %chat_id, page, limit, order = %order))]
    pub async fn get_messages(
        &self,
        chat_id: ChatId,
        page: u32,
        limit: u32,
        order: MessageOrder,
    ) -> Result<MessageHistory> {
        if page == 0 {
            return Err(CoordinationError::validation("page must be >= 1"));
        }
        if limit == 0 {
            return Err(CoordinationError::validation("limit must be >= 1"));
        }
        let limit = limit.min(MAX_PAGE_LIMIT);

        let offset = u64::from(page - 1) * u64::from(limit);
        let window = self
            .store
            .messages_page(chat_id, offset, limit, order)
            .await?;

        let meta = PageMeta::compute(page, limit, window.total)
            .map_err(|err| CoordinationError::validation(err.to_string()))?;

        Ok(MessageHistory {
            messages: window.messages,
            meta,
        })
    }

    /// Marks a message as read on behalf of a participant.
    ///
    /// Marking one's own message is a no-op success. Read-state is not yet
    /// persisted: this validates the reader and echoes the message back.
    /// The persisted shape is tracked as an open gap in DESIGN.md.
    ///
    /// # Errors
    ///
    /// `NotFound` when the message is missing or the reader is not a
    /// participant of its chat.
    #[instrument(skip(self), fields(message_id = %message_id, reader = %reader))]
    pub async fn mark_message_as_read(
        &self,
        message_id: MessageId,
        reader: Party,
    ) -> Result<Message> {
        let message = self
            .store
            .message(message_id)
            .await?
            .ok_or_else(|| CoordinationError::not_found("Message", message_id))?;

        let participants = self.store.chat_participants(message.chat_id).await?;
        if !participants.iter().any(|p| p.party == reader) {
            return Err(CoordinationError::not_found("Message", message_id));
        }

        if message.sender == reader {
            // Own messages are implicitly read.
            return Ok(message);
        }

        Ok(message)
    }
}
