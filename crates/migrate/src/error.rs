//! Error types for the migration engine
//!
//! Every failure that aborts a run carries enough context to name the
//! migration (or file) responsible for it.

use std::path::PathBuf;
use thiserror::Error;

use crate::config::ConfigError;

/// Result type alias for migration operations
pub type MigrationResult<T> = Result<T, MigrationError>;

/// Error types for migration discovery, bookkeeping and execution
#[derive(Debug, Error)]
pub enum MigrationError {
    /// A file in the migrations directory does not follow the naming contract
    #[error("Invalid migration filename: {file}. Expected format: 001_migration_name.{extension}")]
    Discovery { file: String, extension: String },

    /// The ledger already holds an entry with this name
    #[error("Migration {name} is already recorded in the ledger")]
    DuplicateMigration { name: String },

    /// The migration script (or its commit) failed against the store
    #[error("Migration {name} failed: {message}")]
    Execution { name: String, message: String },

    /// Store failure not attributable to a single migration
    #[error("Database error: {0}")]
    Database(String),

    #[error("IO error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl MigrationError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        MigrationError::Io {
            path: path.into(),
            source,
        }
    }

    /// Name of the migration file this error is about, if any
    pub fn migration_name(&self) -> Option<&str> {
        match self {
            MigrationError::Discovery { file, .. } => Some(file),
            MigrationError::DuplicateMigration { name } | MigrationError::Execution { name, .. } => {
                Some(name)
            }
            _ => None,
        }
    }

    /// Whether this error was raised while listing migration files
    pub fn is_discovery(&self) -> bool {
        matches!(self, MigrationError::Discovery { .. })
    }
}

impl From<sqlx::Error> for MigrationError {
    fn from(err: sqlx::Error) -> Self {
        MigrationError::Database(err.to_string())
    }
}
