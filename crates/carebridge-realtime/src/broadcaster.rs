use async_trait::async_trait;

use carebridge_core::ChatId;

use crate::error::BroadcastError;
use crate::types::ChatEvent;

/// The realtime transport interface consumed by the coordination core.
///
/// `publish` delivers the event to all parties currently subscribed to the
/// chat's channel; subscription and connection lifecycle are entirely the
/// transport's concern. Implementations must be thread-safe.
#[async_trait]
pub trait RealtimeBroadcaster: Send + Sync {
    /// Publishes an event on the given chat's channel.
    ///
    /// # Errors
    ///
    /// Returns a transport error when delivery could not even be attempted.
    /// Having zero subscribers is not an error.
    async fn publish(&self, channel: ChatId, event: ChatEvent) -> Result<(), BroadcastError>;
}

/// A broadcaster that discards every event.
///
/// Used by deployments without a realtime transport and as a default in
/// tests that don't observe fan-out.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopBroadcaster;

#[async_trait]
impl RealtimeBroadcaster for NoopBroadcaster {
    async fn publish(&self, _channel: ChatId, _event: ChatEvent) -> Result<(), BroadcastError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Compile-time test that RealtimeBroadcaster is object-safe
    fn _assert_broadcaster_object_safe(_: &dyn RealtimeBroadcaster) {}
}
