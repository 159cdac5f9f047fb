//! Transactional Applier - Applies a single migration atomically
//!
//! The script and the ledger insert share one transaction: either both
//! are committed or the store is left exactly as it was.

use sqlx::{Executor, SqlitePool};
use tracing::{debug, warn};

use crate::definitions::Migration;
use crate::error::{MigrationError, MigrationResult};
use crate::ledger::MigrationLedger;

/// Executes migrations against the store
#[derive(Debug, Clone)]
pub struct TransactionalApplier<'a> {
    pool: &'a SqlitePool,
    ledger: MigrationLedger<'a>,
}

impl<'a> TransactionalApplier<'a> {
    pub fn new(pool: &'a SqlitePool, ledger: MigrationLedger<'a>) -> Self {
        Self { pool, ledger }
    }

    /// Apply one migration and record it, or roll everything back.
    ///
    /// Errors always name the migration. Retrying is left to the caller.
    pub async fn apply(&self, migration: &Migration) -> MigrationResult<()> {
        let mut transaction = self.pool.begin().await.map_err(|e| MigrationError::Execution {
            name: migration.name.clone(),
            message: format!("Failed to start transaction: {}", e),
        })?;

        let outcome = async {
            if !migration.script.trim().is_empty() {
                (&mut *transaction)
                    .execute(migration.script.as_str())
                    .await
                    .map_err(|e| MigrationError::Execution {
                        name: migration.name.clone(),
                        message: e.to_string(),
                    })?;
            }

            self.ledger
                .record_with(&mut *transaction, migration.id, &migration.name)
                .await
                .map_err(|e| match e {
                    MigrationError::Database(message) => MigrationError::Execution {
                        name: migration.name.clone(),
                        message,
                    },
                    other => other,
                })
        }
        .await;

        if let Err(err) = outcome {
            debug!("Rolling back migration {}", migration.name);
            if let Err(rollback_err) = transaction.rollback().await {
                warn!(
                    "Rollback of migration {} reported an error: {}",
                    migration.name, rollback_err
                );
            }
            return Err(err);
        }

        transaction.commit().await.map_err(|e| MigrationError::Execution {
            name: migration.name.clone(),
            message: format!("Failed to commit migration: {}", e),
        })?;

        Ok(())
    }
}
