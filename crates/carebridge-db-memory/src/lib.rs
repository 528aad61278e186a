//! In-memory storage backend for CareBridge.
//!
//! Implements [`carebridge_storage::CareStore`] over plain maps behind one
//! `tokio::sync::RwLock`. Every composite operation takes the write lock
//! once, so the atomicity the trait demands holds trivially. Intended for
//! tests and local development; production deployments use
//! `carebridge-db-postgres`.

mod storage;

pub use storage::MemoryStore;
