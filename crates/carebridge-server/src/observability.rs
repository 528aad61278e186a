//! Tracing setup with a runtime-adjustable level filter.

use std::sync::OnceLock;

use tracing_subscriber::{fmt, prelude::*, reload, EnvFilter, Registry};

static FILTER_HANDLE: OnceLock<reload::Handle<EnvFilter, Registry>> = OnceLock::new();

/// Installs the global subscriber at the default `info` level.
pub fn init_tracing() {
    init_tracing_with_level("info");
}

/// Installs the global subscriber. An explicit `RUST_LOG` wins over the
/// configured level; the filter stays reloadable either way.
pub fn init_tracing_with_level(level: &str) {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(env_filter) => env_filter,
        Err(_) => EnvFilter::new(level),
    };

    let (filter, handle) = reload::Layer::new(filter);
    let _ = FILTER_HANDLE.set(handle);

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer())
        .try_init();
}

/// Swaps the active level filter, e.g. after the config file names one.
pub fn apply_logging_level(level: &str) {
    let Some(handle) = FILTER_HANDLE.get() else {
        return;
    };
    let _ = handle.modify(|filter| *filter = EnvFilter::new(level));
}
