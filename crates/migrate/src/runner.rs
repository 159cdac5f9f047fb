//! Migration Runner - Drives pending migrations against the database
//!
//! Computes the pending set once per run by diffing the source against the
//! ledger, then applies it strictly in order, stopping at the first failure.
//! Migrations committed before a failure stay committed, so running again
//! resumes from the migration that failed.

use sqlx::SqlitePool;
use std::collections::HashSet;
use std::time::Instant;
use tracing::{error, info};

use crate::applier::TransactionalApplier;
use crate::config::MigrationConfig;
use crate::definitions::{Migration, MigrationRunResult, MigrationStatus};
use crate::error::MigrationResult;
use crate::ledger::MigrationLedger;
use crate::source::MigrationSource;

/// Migration runner that executes migrations against a database
#[derive(Debug)]
pub struct MigrationRunner<'a> {
    source: MigrationSource,
    ledger: MigrationLedger<'a>,
    applier: TransactionalApplier<'a>,
}

impl<'a> MigrationRunner<'a> {
    pub fn new(
        source: MigrationSource,
        ledger: MigrationLedger<'a>,
        applier: TransactionalApplier<'a>,
    ) -> Self {
        Self {
            source,
            ledger,
            applier,
        }
    }

    /// Wire source, ledger and applier from configuration
    pub fn from_config(pool: &'a SqlitePool, config: &MigrationConfig) -> MigrationResult<Self> {
        let source = MigrationSource::from_config(config)?;
        let ledger = MigrationLedger::from_config(pool, config)?;
        let applier = TransactionalApplier::new(pool, ledger.clone());
        Ok(Self::new(source, ledger, applier))
    }

    pub fn source(&self) -> &MigrationSource {
        &self.source
    }

    pub fn ledger(&self) -> &MigrationLedger<'a> {
        &self.ledger
    }

    /// Run all pending migrations
    pub async fn run(&self) -> MigrationResult<MigrationRunResult> {
        let start_time = Instant::now();

        // Discovery happens first so a bad filename aborts before anything is touched.
        let migrations = self.source.list()?;

        self.ledger.init().await?;
        let applied = self.ledger.applied_set().await?;

        let (done, pending) = partition(migrations, &applied);

        info!("Found {} migration files", done.len() + pending.len());
        info!("{} migrations already applied", done.len());

        if pending.is_empty() {
            info!("No pending migrations");
            return Ok(MigrationRunResult {
                applied_migrations: Vec::new(),
                skipped_count: done.len(),
                execution_time_ms: start_time.elapsed().as_millis(),
            });
        }

        info!("Running {} pending migrations", pending.len());

        let mut applied_migrations = Vec::with_capacity(pending.len());
        for migration in &pending {
            info!("Running migration: {}", migration.name);

            if let Err(err) = self.applier.apply(migration).await {
                error!("Migration {} failed: {}", migration.name, err);
                return Err(err);
            }

            info!("Migration {} completed", migration.name);
            applied_migrations.push(migration.name.clone());
        }

        info!("All migrations completed successfully");
        Ok(MigrationRunResult {
            applied_migrations,
            skipped_count: done.len(),
            execution_time_ms: start_time.elapsed().as_millis(),
        })
    }

    /// Applied and pending migrations, without executing anything
    pub async fn status(&self) -> MigrationResult<MigrationStatus> {
        let migrations = self.source.list()?;
        let applied_names = self.ledger.applied_set().await?;

        let (applied, pending) = partition(migrations, &applied_names);
        Ok(MigrationStatus { applied, pending })
    }
}

/// Split into (applied, pending), both keeping the source order
fn partition(
    migrations: Vec<Migration>,
    applied: &HashSet<String>,
) -> (Vec<Migration>, Vec<Migration>) {
    migrations
        .into_iter()
        .partition(|migration| applied.contains(&migration.name))
}
