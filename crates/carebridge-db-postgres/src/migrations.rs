//! Database migration management for the PostgreSQL storage backend.
//!
//! Migrations are embedded in the binary at compile time for single-binary
//! deployment: no CLI or filesystem access is required at runtime. Applied
//! migrations are tracked in the `_sqlx_migrations` table and executed in
//! version order on startup.

use std::borrow::Cow;

use sqlx_core::migrate::{Migration, MigrationType, Migrator};
use sqlx_postgres::PgPool;
use tracing::{info, instrument};

use crate::error::{PostgresError, Result};

/// Embedded migrations in chronological order.
///
/// To add a new migration: create the SQL file under `migrations/` and add
/// a `(version, description, sql)` entry here.
const EMBEDDED_MIGRATIONS: &[(i64, &str, &str)] = &[(
    20250801000001,
    "care_schema",
    include_str!("../migrations/20250801000001_care_schema.sql"),
)];

/// Builds a vector of Migration structs from the embedded migration data.
fn build_migrations() -> Vec<Migration> {
    EMBEDDED_MIGRATIONS
        .iter()
        .map(|(version, description, sql)| Migration {
            version: *version,
            description: Cow::Borrowed(description),
            migration_type: MigrationType::Simple,
            sql: Cow::Borrowed(sql),
            // Embedded migrations carry no checksum and run transactionally.
            checksum: Cow::Borrowed(&[]),
            no_tx: false,
        })
        .collect()
}

/// Runs all pending database migrations.
///
/// # Errors
///
/// Returns an error if a migration fails to execute.
#[instrument(skip(pool))]
pub async fn run(pool: &PgPool) -> Result<()> {
    let migrations = build_migrations();
    info!(count = migrations.len(), "Running embedded database migrations");

    let migrator = Migrator {
        migrations: Cow::Owned(migrations),
        ignore_missing: false,
        locking: true,
        no_tx: false,
    };

    migrator
        .run(pool)
        .await
        .map_err(|e| PostgresError::Migration(e.to_string()))?;

    info!("Database migrations complete");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_migrations_are_ordered() {
        let migrations = build_migrations();
        assert!(!migrations.is_empty());
        assert!(
            migrations.windows(2).all(|w| w[0].version < w[1].version),
            "migration versions must be strictly increasing"
        );
    }
}
