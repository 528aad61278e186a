use carebridge_core::ChatId;
use thiserror::Error;

/// Errors reported by a realtime transport.
///
/// Broadcast is best-effort for the coordination core: callers log these
/// and carry on, they never fail a persisted write because of one.
#[derive(Debug, Error)]
pub enum BroadcastError {
    #[error("Channel closed: {channel}")]
    ChannelClosed { channel: ChatId },

    #[error("Transport error: {message}")]
    Transport { message: String },
}

impl BroadcastError {
    /// Creates a new transport error.
    #[must_use]
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
        }
    }
}
