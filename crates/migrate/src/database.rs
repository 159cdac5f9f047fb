//! Store connection
//!
//! The pool returned here is owned by the caller, who passes it by reference
//! into the ledger, applier and runner and closes it when done.

use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::fs;
use std::path::Path;
use tracing::debug;

use crate::config::MigrationConfig;
use crate::error::{MigrationError, MigrationResult};

/// Migrations run one at a time, so a single connection is enough.
const MAX_CONNECTIONS: u32 = 1;

/// Open (creating if needed) the SQLite database at `path`
pub async fn connect(path: &Path) -> MigrationResult<SqlitePool> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            fs::create_dir_all(parent).map_err(|e| MigrationError::io(parent, e))?;
        }
    }

    let options = SqliteConnectOptions::new()
        .filename(path)
        .create_if_missing(true)
        .foreign_keys(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(MAX_CONNECTIONS)
        .connect_with(options)
        .await
        .map_err(|e| {
            MigrationError::Database(format!(
                "Failed to connect to database {}: {}",
                path.display(),
                e
            ))
        })?;

    debug!("Connected to database {}", path.display());
    Ok(pool)
}

/// Open the database named by `config`
pub async fn connect_config(config: &MigrationConfig) -> MigrationResult<SqlitePool> {
    connect(&config.database_path).await
}
