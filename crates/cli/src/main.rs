mod commands;
mod logging;

use clap::{Parser, Subcommand};
use commands::migrate;
use logging::{init_logging, LogFormat, LoggingConfig};
use mandala_migrate::{ConfigError, MigrationConfig};
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "mandala")]
#[command(about = "Database migration runner for the mandala store")]
#[command(version)]
struct Cli {
    /// SQLite database file (default: data/mandala.db)
    #[arg(long, global = true)]
    database: Option<PathBuf>,

    /// Directory holding migration files (default: migrations)
    #[arg(long, global = true)]
    migrations_dir: Option<PathBuf>,

    /// Ledger table name (default: migrations)
    #[arg(long, global = true)]
    table: Option<String>,

    /// Migration file extension (default: sql)
    #[arg(long, global = true)]
    extension: Option<String>,

    /// Enable debug logging
    #[arg(long, short, global = true)]
    verbose: bool,

    /// Log output format
    #[arg(long, value_enum, default_value = "text", global = true)]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show applied and pending migrations
    Status {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Apply all pending migrations
    Run,

    /// Create a new migration file
    Create {
        /// Short description, used in the filename
        description: String,
    },
}

impl Cli {
    fn migration_config(&self) -> Result<MigrationConfig, ConfigError> {
        let mut config = MigrationConfig::from_env()?;

        if let Some(database) = &self.database {
            config.database_path = database.clone();
        }
        if let Some(dir) = &self.migrations_dir {
            config.migrations_dir = dir.clone();
        }
        if let Some(table) = &self.table {
            config.migrations_table = table.clone();
        }
        if let Some(extension) = &self.extension {
            config.extension = extension.trim_start_matches('.').to_string();
        }

        config.validate()?;
        Ok(config)
    }

    fn logging_config(&self, config: Option<&MigrationConfig>) -> LoggingConfig {
        if self.verbose {
            return LoggingConfig::verbose(self.log_format);
        }
        let level = config.map_or("info", |c| c.log_level.as_str());
        LoggingConfig::new(level, self.log_format)
    }
}

const EXIT_OK: u8 = 0;
const EXIT_FAILED: u8 = 1;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = cli.migration_config();
    if let Err(e) = init_logging(&cli.logging_config(config.as_ref().ok())) {
        eprintln!("Failed to initialize logging: {}", e);
    }

    ExitCode::from(dispatch(cli.command, config).await)
}

/// Run `command` and map its outcome to a process exit status.
///
/// `status` only reports problems and always exits 0.
async fn dispatch(command: Commands, config: Result<MigrationConfig, ConfigError>) -> u8 {
    let config = match config {
        Ok(config) => config,
        Err(e) => {
            eprintln!("❌ {}", e);
            return match command {
                Commands::Status { .. } => EXIT_OK,
                _ => EXIT_FAILED,
            };
        }
    };

    match command {
        Commands::Status { json } => {
            if let Err(e) = migrate::status(&config, json).await {
                eprintln!("❌ Could not read migration status: {:#}", e);
            }
            EXIT_OK
        }
        Commands::Run => match migrate::run(&config).await {
            Ok(()) => EXIT_OK,
            Err(e) => {
                eprintln!("❌ Migration failed: {:#}", e);
                EXIT_FAILED
            }
        },
        Commands::Create { description } => match migrate::create(&config, &description) {
            Ok(()) => EXIT_OK,
            Err(e) => {
                eprintln!("❌ {:#}", e);
                EXIT_FAILED
            }
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use std::fs;
    use tempfile::TempDir;

    struct Workspace {
        dir: TempDir,
    }

    impl Workspace {
        fn new() -> Self {
            let dir = TempDir::new().unwrap();
            fs::create_dir_all(dir.path().join("migrations")).unwrap();
            Self { dir }
        }

        fn write(&self, filename: &str, script: &str) {
            fs::write(self.dir.path().join("migrations").join(filename), script).unwrap();
        }

        async fn dispatch(&self, args: &[&str]) -> u8 {
            let database = self.dir.path().join("data").join("cli.db");
            let migrations = self.dir.path().join("migrations");
            let mut argv = vec![
                "mandala".to_string(),
                "--database".to_string(),
                database.display().to_string(),
                "--migrations-dir".to_string(),
                migrations.display().to_string(),
            ];
            argv.extend(args.iter().map(|arg| arg.to_string()));

            let cli = Cli::try_parse_from(argv).unwrap();
            let config = cli.migration_config();
            dispatch(cli.command, config).await
        }
    }

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parses_global_options_after_subcommand() {
        let cli = Cli::try_parse_from([
            "mandala",
            "status",
            "--json",
            "--database",
            "/tmp/x.db",
            "--table",
            "schema_history",
        ])
        .unwrap();

        assert!(matches!(cli.command, Commands::Status { json: true }));
        assert_eq!(cli.database, Some(PathBuf::from("/tmp/x.db")));
        assert_eq!(cli.table.as_deref(), Some("schema_history"));
    }

    #[test]
    fn test_parses_create() {
        let cli = Cli::try_parse_from(["mandala", "create", "add users"]).unwrap();
        match cli.command {
            Commands::Create { description } => assert_eq!(description, "add users"),
            _ => panic!("expected create command"),
        }
    }

    #[test]
    fn test_verbose_logging_config() {
        let cli = Cli::try_parse_from(["mandala", "-v", "--log-format", "json", "run"]).unwrap();
        let logging = cli.logging_config(None);
        assert_eq!(logging.level, "debug");
        assert_eq!(logging.format, LogFormat::Json);
    }

    #[tokio::test]
    async fn test_run_with_failing_migration_exits_non_zero() {
        let workspace = Workspace::new();
        workspace.write("001_init.sql", "CREATE TABLE tasks (id INTEGER PRIMARY KEY);");
        workspace.write("002_bad.sql", "CREATE TABLE oops (;");

        assert_eq!(workspace.dispatch(&["run"]).await, EXIT_FAILED);
    }

    #[tokio::test]
    async fn test_run_success_exits_zero() {
        let workspace = Workspace::new();
        workspace.write("001_init.sql", "CREATE TABLE tasks (id INTEGER PRIMARY KEY);");

        assert_eq!(workspace.dispatch(&["run"]).await, EXIT_OK);
        assert_eq!(workspace.dispatch(&["run"]).await, EXIT_OK);
    }

    #[tokio::test]
    async fn test_status_with_malformed_filename_exits_zero() {
        let workspace = Workspace::new();
        workspace.write("abc_bad.sql", "");

        assert_eq!(workspace.dispatch(&["status"]).await, EXIT_OK);
        assert_eq!(workspace.dispatch(&["run"]).await, EXIT_FAILED);
    }

    #[tokio::test]
    async fn test_status_with_invalid_table_exits_zero() {
        let workspace = Workspace::new();

        assert_eq!(
            workspace.dispatch(&["status", "--table", "bad;x"]).await,
            EXIT_OK
        );
        assert_eq!(
            workspace.dispatch(&["run", "--table", "bad;x"]).await,
            EXIT_FAILED
        );
        assert_eq!(
            workspace.dispatch(&["create", "next", "--table", "bad;x"]).await,
            EXIT_FAILED
        );
    }
}
