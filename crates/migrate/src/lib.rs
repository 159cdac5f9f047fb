//! # mandala-migrate
//!
//! Schema migrations for the mandala SQLite store.
//!
//! Migration files named `<digits>_<description>.sql` are discovered from a
//! directory, applied in filename order, and recorded in a ledger table.
//! Each migration runs in its own transaction together with its ledger row,
//! so a migration is either fully applied and recorded or not at all.
//!
//! ```no_run
//! use mandala_migrate::{database, MigrationConfig, MigrationRunner};
//!
//! # async fn example() -> mandala_migrate::MigrationResult<()> {
//! let config = MigrationConfig::from_env()?;
//! let pool = database::connect_config(&config).await?;
//! let runner = MigrationRunner::from_config(&pool, &config)?;
//! let result = runner.run().await;
//! pool.close().await;
//! println!("applied {} migrations", result?.applied_count());
//! # Ok(())
//! # }
//! ```
//!
//! Atomicity depends on the store treating DDL as transactional, which
//! SQLite does. Only one runner may work against a database at a time;
//! serialising concurrent deployments is up to the caller.

pub mod applier;
pub mod config;
pub mod database;
pub mod definitions;
pub mod error;
pub mod ledger;
pub mod runner;
pub mod source;

pub use applier::TransactionalApplier;
pub use config::{ConfigError, MigrationConfig};
pub use definitions::{LedgerEntry, Migration, MigrationRunResult, MigrationStatus};
pub use error::{MigrationError, MigrationResult};
pub use ledger::MigrationLedger;
pub use runner::MigrationRunner;
pub use source::MigrationSource;
