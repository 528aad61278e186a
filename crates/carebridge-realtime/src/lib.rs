//! Real-time broadcast layer for CareBridge.
//!
//! The coordination core publishes chat events to a channel per chat;
//! fan-out to connected clients (websocket, SSE, push) is the transport's
//! concern. This crate defines the [`RealtimeBroadcaster`] interface the
//! core is constructed with, plus two implementations: an in-process
//! [`ChannelBroadcaster`] for local fan-out and tests, and a
//! [`NoopBroadcaster`] for deployments without a realtime transport.
//!
//! The broadcaster is always injected; there is no process-global handle.

mod broadcaster;
mod channel;
mod error;
mod types;

pub use broadcaster::{NoopBroadcaster, RealtimeBroadcaster};
pub use channel::ChannelBroadcaster;
pub use error::BroadcastError;
pub use types::ChatEvent;
