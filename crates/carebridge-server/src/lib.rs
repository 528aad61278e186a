//! HTTP server for the CareBridge care-coordination platform.
//!
//! Wires the coordination services over a configured storage backend and
//! exposes them as a JSON API. Identity arrives pre-verified from the
//! outer gateway; request payloads carry the caller's id and role, and
//! this server enforces only the domain authorization the core defines.

pub mod config;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod observability;
pub mod server;
pub mod state;

pub use config::AppConfig;
pub use server::{build_app, CareBridgeServer, ServerBuilder};
pub use state::AppState;
