//! Configuration for the migration system
//!
//! Values come from defaults, then `MANDALA_*` environment variables; the
//! CLI layers its own flags on top before calling [`MigrationConfig::validate`].

use std::env;
use std::path::PathBuf;
use thiserror::Error;

pub const ENV_DATABASE_PATH: &str = "MANDALA_DATABASE_PATH";
pub const ENV_MIGRATIONS_DIR: &str = "MANDALA_MIGRATIONS_DIR";
pub const ENV_MIGRATIONS_TABLE: &str = "MANDALA_MIGRATIONS_TABLE";
pub const ENV_MIGRATION_EXTENSION: &str = "MANDALA_MIGRATION_EXTENSION";
pub const ENV_LOG_LEVEL: &str = "MANDALA_LOG_LEVEL";

const VALID_LOG_LEVELS: [&str; 5] = ["error", "warn", "info", "debug", "trace"];

/// Configuration error type
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid value for field '{field}': '{value}'. Expected: {expected}")]
    InvalidValue {
        field: String,
        value: String,
        expected: String,
    },

    #[error("Environment variable error: {message}")]
    EnvironmentError { message: String },
}

impl ConfigError {
    /// Create an invalid value error
    pub fn invalid_value(
        field: impl Into<String>,
        value: impl Into<String>,
        expected: impl Into<String>,
    ) -> Self {
        Self::InvalidValue {
            field: field.into(),
            value: value.into(),
            expected: expected.into(),
        }
    }
}

/// Configuration for the migration system
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationConfig {
    /// SQLite database file the migrations are applied to
    pub database_path: PathBuf,
    /// Directory where migration files are stored
    pub migrations_dir: PathBuf,
    /// Table name for the ledger of applied migrations
    pub migrations_table: String,
    /// File extension (without the dot) that marks a migration file
    pub extension: String,
    /// Default log level when `RUST_LOG` is not set
    pub log_level: String,
}

impl Default for MigrationConfig {
    fn default() -> Self {
        Self {
            database_path: PathBuf::from("data").join("mandala.db"),
            migrations_dir: PathBuf::from("migrations"),
            migrations_table: "migrations".to_string(),
            extension: "sql".to_string(),
            log_level: "info".to_string(),
        }
    }
}

impl MigrationConfig {
    /// Load configuration from environment variables, falling back to defaults
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(path) = read_env(ENV_DATABASE_PATH)? {
            config.database_path = PathBuf::from(path);
        }

        if let Some(dir) = read_env(ENV_MIGRATIONS_DIR)? {
            config.migrations_dir = PathBuf::from(dir);
        }

        if let Some(table) = read_env(ENV_MIGRATIONS_TABLE)? {
            config.migrations_table = table;
        }

        if let Some(extension) = read_env(ENV_MIGRATION_EXTENSION)? {
            config.extension = extension.trim_start_matches('.').to_string();
        }

        if let Some(level) = read_env(ENV_LOG_LEVEL)? {
            config.log_level = level.to_lowercase();
        }

        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        // The table name is interpolated into DDL, so only plain identifiers pass.
        if !is_identifier(&self.migrations_table) {
            return Err(ConfigError::invalid_value(
                "migrations_table",
                &self.migrations_table,
                "a SQL identifier (letters, digits and underscores, not starting with a digit)",
            ));
        }

        if self.extension.is_empty()
            || !self.extension.chars().all(|c| c.is_ascii_alphanumeric())
        {
            return Err(ConfigError::invalid_value(
                "extension",
                &self.extension,
                "a non-empty alphanumeric file extension such as 'sql'",
            ));
        }

        if self.migrations_dir.as_os_str().is_empty() {
            return Err(ConfigError::invalid_value(
                "migrations_dir",
                "",
                "a directory path",
            ));
        }

        if self.database_path.as_os_str().is_empty() {
            return Err(ConfigError::invalid_value(
                "database_path",
                "",
                "a database file path",
            ));
        }

        if !VALID_LOG_LEVELS.contains(&self.log_level.as_str()) {
            return Err(ConfigError::invalid_value(
                "log_level",
                &self.log_level,
                format!("one of: {}", VALID_LOG_LEVELS.join(", ")),
            ));
        }

        Ok(())
    }
}

fn read_env(key: &str) -> Result<Option<String>, ConfigError> {
    match env::var(key) {
        Ok(value) if value.trim().is_empty() => Ok(None),
        Ok(value) => Ok(Some(value)),
        Err(env::VarError::NotPresent) => Ok(None),
        Err(env::VarError::NotUnicode(_)) => Err(ConfigError::EnvironmentError {
            message: format!("{} is not valid unicode", key),
        }),
    }
}

pub(crate) fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        _ => false,
    }
}
