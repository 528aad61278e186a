//! Server configuration: TOML file plus `CAREBRIDGE__*` environment
//! overrides.

use std::net::SocketAddr;

use serde::{Deserialize, Serialize};

use carebridge_db_postgres::PostgresConfig;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub realtime: RealtimeConfig,
}

impl AppConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.server.port == 0 {
            return Err("server.port must be > 0".into());
        }
        let lvl = self.logging.level.to_ascii_lowercase();
        let valid_levels = ["trace", "debug", "info", "warn", "error", "off"];
        if !valid_levels.contains(&lvl.as_str()) {
            return Err(format!("logging.level must be one of {valid_levels:?}"));
        }
        if self.realtime.broadcast_timeout_ms == 0 {
            return Err("realtime.broadcast_timeout_ms must be > 0".into());
        }
        if self.realtime.channel_capacity == 0 {
            return Err("realtime.channel_capacity must be > 0".into());
        }
        if self.storage.backend == StorageBackend::Postgres {
            match &self.storage.postgres {
                None => return Err("storage.postgres config is required for the postgres backend".into()),
                Some(pg) => {
                    if pg.url.is_empty() {
                        return Err("storage.postgres.url must not be empty".into());
                    }
                    if pg.pool_size == 0 {
                        return Err("storage.postgres.pool_size must be > 0".into());
                    }
                }
            }
        }
        Ok(())
    }

    pub fn addr(&self) -> SocketAddr {
        format!("{}:{}", self.server.host, self.server.port)
            .parse()
            .unwrap_or_else(|_| SocketAddr::from(([0, 0, 0, 0], self.server.port)))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub body_limit_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".into(),
            port: 8080,
            body_limit_bytes: 1024 * 1024,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct StorageConfig {
    #[serde(default)]
    pub backend: StorageBackend,
    #[serde(default)]
    pub postgres: Option<PostgresConfig>,
}

/// Which `CareStore` implementation backs the services.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    Postgres,
    /// In-memory backend; state dies with the process. Development only.
    Memory,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RealtimeConfig {
    /// Upper bound on how long a broadcast publish may delay a send.
    pub broadcast_timeout_ms: u64,
    /// Buffer capacity of each chat's broadcast channel.
    pub channel_capacity: usize,
}

impl Default for RealtimeConfig {
    fn default() -> Self {
        Self {
            broadcast_timeout_ms: 2000,
            channel_capacity: 256,
        }
    }
}

/// Loads configuration from an optional TOML file plus environment
/// overrides (`CAREBRIDGE__SERVER__PORT=9090` style).
pub fn load_config(path: Option<&str>) -> Result<AppConfig, config::ConfigError> {
    let mut builder = config::Config::builder();
    if let Some(path) = path {
        builder = builder.add_source(config::File::with_name(path).required(false));
    }
    builder = builder.add_source(
        config::Environment::with_prefix("CAREBRIDGE")
            .separator("__")
            .try_parsing(true),
    );
    builder.build()?.try_deserialize()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_validate() {
        let mut cfg = AppConfig::default();
        // Default backend is postgres and needs its section.
        assert!(cfg.validate().is_err());

        cfg.storage.postgres = Some(PostgresConfig::default());
        assert!(cfg.validate().is_ok());

        cfg.storage.backend = StorageBackend::Memory;
        cfg.storage.postgres = None;
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn test_rejects_bad_level() {
        let mut cfg = AppConfig::default();
        cfg.storage.backend = StorageBackend::Memory;
        cfg.logging.level = "loud".into();
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_addr() {
        let mut cfg = AppConfig::default();
        cfg.server.host = "127.0.0.1".into();
        cfg.server.port = 9090;
        assert_eq!(cfg.addr().to_string(), "127.0.0.1:9090");
    }
}
