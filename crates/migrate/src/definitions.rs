//! Migration Definitions - Core types shared across the migration system
//!
//! Defines the discovered [`Migration`], the persisted [`LedgerEntry`] and
//! the reports returned by the runner.

use chrono::{DateTime, Utc};
use serde::Serialize;

/// A migration discovered on disk
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Migration {
    /// Ordinal parsed from the leading digits of the filename
    pub id: i64,
    /// Full filename; the ledger key
    pub name: String,
    /// SQL executed verbatim when the migration is applied
    #[serde(skip_serializing)]
    pub script: String,
}

/// A row of the ledger table
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LedgerEntry {
    pub id: i64,
    pub name: String,
    /// Set by the store when the row is inserted
    pub applied_at: DateTime<Utc>,
}

/// Applied and pending migrations, both in discovery order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MigrationStatus {
    pub applied: Vec<Migration>,
    pub pending: Vec<Migration>,
}

impl MigrationStatus {
    pub fn applied_names(&self) -> Vec<&str> {
        self.applied.iter().map(|m| m.name.as_str()).collect()
    }

    pub fn pending_names(&self) -> Vec<&str> {
        self.pending.iter().map(|m| m.name.as_str()).collect()
    }

    /// True when every discovered migration has been applied
    pub fn is_up_to_date(&self) -> bool {
        self.pending.is_empty()
    }
}

/// Result of running migrations
#[derive(Debug, Clone, Default, Serialize)]
pub struct MigrationRunResult {
    /// Names of migrations applied by this run, in order
    pub applied_migrations: Vec<String>,
    /// Number of migrations that were skipped (already applied)
    pub skipped_count: usize,
    /// Total execution time in milliseconds
    pub execution_time_ms: u128,
}

impl MigrationRunResult {
    pub fn applied_count(&self) -> usize {
        self.applied_migrations.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn migration(id: i64, name: &str) -> Migration {
        Migration {
            id,
            name: name.to_string(),
            script: "SELECT 1;".to_string(),
        }
    }

    #[test]
    fn test_status_names_and_up_to_date() {
        let status = MigrationStatus {
            applied: vec![migration(1, "001_init.sql")],
            pending: vec![migration(2, "002_add_index.sql")],
        };
        assert_eq!(status.applied_names(), vec!["001_init.sql"]);
        assert_eq!(status.pending_names(), vec!["002_add_index.sql"]);
        assert!(!status.is_up_to_date());
        assert!(MigrationStatus::default().is_up_to_date());
    }

    #[test]
    fn test_migration_serialization_omits_script() {
        let json = serde_json::to_value(migration(1, "001_init.sql")).unwrap();
        assert_eq!(json, serde_json::json!({ "id": 1, "name": "001_init.sql" }));
    }
}
