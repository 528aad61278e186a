use std::{env, sync::Arc, time::Duration};

use carebridge_coordination::MessageService;
use carebridge_db_memory::MemoryStore;
use carebridge_db_postgres::{PostgresConfig, PostgresStore};
use carebridge_realtime::ChannelBroadcaster;
use carebridge_server::config::{load_config, StorageBackend};
use carebridge_server::{AppState, ServerBuilder};
use carebridge_storage::CareStore;

const DEFAULT_CONFIG_PATH: &str = "carebridge.toml";

/// Resolves the config file path: `--config PATH` beats `CAREBRIDGE_CONFIG`
/// beats the default. The second value labels the source for the startup log.
fn resolve_config_path() -> (String, &'static str) {
    let mut args = env::args().skip(1);
    while let Some(arg) = args.next() {
        if arg == "--config"
            && let Some(path) = args.next()
        {
            return (path, "--config flag");
        }
    }
    if let Ok(path) = env::var("CAREBRIDGE_CONFIG") {
        return (path, "CAREBRIDGE_CONFIG");
    }
    (DEFAULT_CONFIG_PATH.to_string(), "default")
}

fn fail_startup(message: &str, err: impl std::fmt::Display) -> ! {
    eprintln!("{message}: {err}");
    std::process::exit(2);
}

#[tokio::main]
async fn main() {
    // Pull in .env before anything inspects the environment; a missing
    // file is the normal case outside development.
    match dotenvy::dotenv() {
        Ok(_) => {}
        Err(err) if err.not_found() => {}
        Err(err) => eprintln!("Warning: could not load .env: {err}"),
    }

    carebridge_server::observability::init_tracing();

    let (config_path, source) = resolve_config_path();
    let cfg = load_config(Some(&config_path))
        .unwrap_or_else(|e| fail_startup("Configuration error", e));
    if let Err(e) = cfg.validate() {
        fail_startup("Configuration error", e);
    }
    tracing::info!(path = %config_path, source, "Configuration loaded");
    carebridge_server::observability::apply_logging_level(&cfg.logging.level);

    let store: Arc<dyn CareStore> = match cfg.storage.backend {
        StorageBackend::Postgres => {
            let pg_config = cfg
                .storage
                .postgres
                .clone()
                .unwrap_or_else(PostgresConfig::default);
            let store = PostgresStore::new(pg_config)
                .await
                .unwrap_or_else(|e| fail_startup("Storage initialization failed", e));
            Arc::new(store)
        }
        StorageBackend::Memory => Arc::new(MemoryStore::new()),
    };
    tracing::info!(backend = store.backend_name(), "Storage backend ready");

    let broadcaster = Arc::new(ChannelBroadcaster::with_capacity(
        cfg.realtime.channel_capacity,
    ));
    let messages = MessageService::new(store.clone(), broadcaster.clone())
        .with_broadcast_timeout(Duration::from_millis(cfg.realtime.broadcast_timeout_ms));
    let state = AppState::new(store, broadcaster).with_messages(messages);

    let server = ServerBuilder::new(cfg).build(state);
    if let Err(e) = server.run().await {
        eprintln!("Server error: {e}");
        std::process::exit(1);
    }
}
