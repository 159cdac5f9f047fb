//! Migration Ledger - Persisted record of applied migrations
//!
//! One row per applied migration, keyed by a unique filename. Rows are
//! only ever inserted; nothing in this crate updates or deletes them.

use chrono::{DateTime, NaiveDateTime, Utc};
use sqlx::{Executor, Row, Sqlite, SqlitePool};
use std::collections::HashSet;
use tracing::debug;

use crate::config::{is_identifier, ConfigError, MigrationConfig};
use crate::definitions::LedgerEntry;
use crate::error::{MigrationError, MigrationResult};

/// Ledger table bound to a caller-owned pool
#[derive(Debug, Clone)]
pub struct MigrationLedger<'a> {
    pool: &'a SqlitePool,
    table: String,
}

impl<'a> MigrationLedger<'a> {
    pub fn new(pool: &'a SqlitePool, table: impl Into<String>) -> MigrationResult<Self> {
        let table = table.into();
        if !is_identifier(&table) {
            return Err(ConfigError::invalid_value(
                "migrations_table",
                table,
                "a SQL identifier (letters, digits and underscores, not starting with a digit)",
            )
            .into());
        }
        Ok(Self { pool, table })
    }

    pub fn from_config(pool: &'a SqlitePool, config: &MigrationConfig) -> MigrationResult<Self> {
        Self::new(pool, config.migrations_table.clone())
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    /// Create the ledger table if it does not exist yet
    pub async fn init(&self) -> MigrationResult<()> {
        sqlx::query(&self.create_table_sql())
            .execute(self.pool)
            .await
            .map_err(|e| {
                MigrationError::Database(format!("Failed to create migrations table: {}", e))
            })?;
        Ok(())
    }

    /// Whether the ledger table has been created
    pub async fn exists(&self) -> MigrationResult<bool> {
        let row = sqlx::query("SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?")
            .bind(self.table.as_str())
            .fetch_optional(self.pool)
            .await
            .map_err(|e| {
                MigrationError::Database(format!("Failed to look up migrations table: {}", e))
            })?;
        Ok(row.is_some())
    }

    /// Names of every applied migration.
    ///
    /// A ledger that was never initialised is read as empty rather than created.
    pub async fn applied_set(&self) -> MigrationResult<HashSet<String>> {
        if !self.exists().await? {
            return Ok(HashSet::new());
        }

        let rows = sqlx::query(&self.applied_names_sql())
            .fetch_all(self.pool)
            .await
            .map_err(|e| {
                MigrationError::Database(format!("Failed to query applied migrations: {}", e))
            })?;

        let mut names = HashSet::with_capacity(rows.len());
        for row in rows {
            let name: String = row.try_get("name").map_err(|e| {
                MigrationError::Database(format!("Failed to get migration name: {}", e))
            })?;
            names.insert(name);
        }

        debug!("{} migration(s) recorded in {}", names.len(), self.table);
        Ok(names)
    }

    /// All ledger rows in insertion order
    pub async fn entries(&self) -> MigrationResult<Vec<LedgerEntry>> {
        if !self.exists().await? {
            return Ok(Vec::new());
        }

        let rows = sqlx::query(&self.entries_sql())
            .fetch_all(self.pool)
            .await
            .map_err(|e| {
                MigrationError::Database(format!("Failed to query applied migrations: {}", e))
            })?;

        let mut entries = Vec::with_capacity(rows.len());
        for row in rows {
            let id: i64 = row
                .try_get("id")
                .map_err(|e| MigrationError::Database(format!("Failed to get migration id: {}", e)))?;
            let name: String = row.try_get("name").map_err(|e| {
                MigrationError::Database(format!("Failed to get migration name: {}", e))
            })?;
            let applied_at: NaiveDateTime = row
                .try_get("applied_at")
                .map_err(|e| MigrationError::Database(format!("Failed to get applied_at: {}", e)))?;

            entries.push(LedgerEntry {
                id,
                name,
                applied_at: DateTime::from_naive_utc_and_offset(applied_at, Utc),
            });
        }

        Ok(entries)
    }

    /// Insert one ledger row
    pub async fn record(&self, id: i64, name: &str) -> MigrationResult<()> {
        self.record_with(self.pool, id, name).await
    }

    /// Insert one ledger row through `executor`, typically an open transaction
    pub async fn record_with<'e, E>(&self, executor: E, id: i64, name: &str) -> MigrationResult<()>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query(&self.insert_sql())
            .bind(id)
            .bind(name)
            .execute(executor)
            .await
            .map_err(|e| insert_error(e, name))?;

        debug!("Recorded migration {} in {}", name, self.table);
        Ok(())
    }

    fn create_table_sql(&self) -> String {
        format!(
            "CREATE TABLE IF NOT EXISTS {} (\n    \
                id INTEGER NOT NULL,\n    \
                name TEXT NOT NULL UNIQUE,\n    \
                applied_at DATETIME NOT NULL DEFAULT CURRENT_TIMESTAMP\n\
            );",
            self.table
        )
    }

    fn applied_names_sql(&self) -> String {
        format!("SELECT name FROM {} ORDER BY id", self.table)
    }

    fn entries_sql(&self) -> String {
        format!("SELECT id, name, applied_at FROM {} ORDER BY rowid", self.table)
    }

    fn insert_sql(&self) -> String {
        format!("INSERT INTO {} (id, name) VALUES (?, ?)", self.table)
    }
}

fn insert_error(err: sqlx::Error, name: &str) -> MigrationError {
    match &err {
        sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
            MigrationError::DuplicateMigration {
                name: name.to_string(),
            }
        }
        _ => MigrationError::Database(format!("Failed to record migration {}: {}", name, err)),
    }
}
