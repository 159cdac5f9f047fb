use anyhow::Result;
use mandala_migrate::{
    database, Migration, MigrationConfig, MigrationRunResult, MigrationRunner, MigrationSource,
    MigrationStatus,
};
use sqlx::SqlitePool;
use tracing::debug;

pub fn create(config: &MigrationConfig, description: &str) -> Result<()> {
    let source = MigrationSource::from_config(config)?;
    let path = source.create(description)?;
    println!("Created migration: {}", path.display());
    Ok(())
}

pub async fn status(config: &MigrationConfig, json: bool) -> Result<()> {
    let pool = database::connect_config(config).await?;
    let result = status_with(&pool, config, json).await;
    pool.close().await;
    result
}

async fn status_with(pool: &SqlitePool, config: &MigrationConfig, json: bool) -> Result<()> {
    let runner = MigrationRunner::from_config(pool, config)?;
    let status = runner.status().await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&status)?);
    } else {
        print!("{}", render_status(&status));
    }
    Ok(())
}

pub async fn run(config: &MigrationConfig) -> Result<()> {
    let pool = database::connect_config(config).await?;
    let result = run_with(&pool, config).await;
    pool.close().await;
    result
}

async fn run_with(pool: &SqlitePool, config: &MigrationConfig) -> Result<()> {
    println!("🚀 Starting database migrations...");

    let runner = MigrationRunner::from_config(pool, config)?;
    let status = runner.status().await?;
    print!("{}", render_summary(&status));

    let result = runner.run().await?;
    debug!("Migration run finished in {} ms", result.execution_time_ms);

    print!("{}", render_completion(&result));
    Ok(())
}

/// Full applied/pending listing for `status`
pub fn render_status(status: &MigrationStatus) -> String {
    let mut lines = vec![
        "📊 Database Migration Status".to_string(),
        String::new(),
        format!("Applied Migrations ({}):", status.applied.len()),
    ];
    lines.extend(listing(&status.applied, "✅"));

    lines.push(String::new());
    lines.push(format!("Pending Migrations ({}):", status.pending.len()));
    lines.extend(listing(&status.pending, "⏳"));

    finish(lines)
}

/// Counts and pending list printed before `run` applies anything
pub fn render_summary(status: &MigrationStatus) -> String {
    let mut lines = vec![
        "📊 Migration Status:".to_string(),
        format!("   Applied: {}", status.applied.len()),
        format!("   Pending: {}", status.pending.len()),
    ];

    if !status.pending.is_empty() {
        lines.push(String::new());
        lines.push("📝 Pending migrations:".to_string());
        lines.extend(status.pending.iter().map(|m| format!("   - {}", m.name)));
    }

    finish(lines)
}

pub fn render_completion(result: &MigrationRunResult) -> String {
    let mut lines = Vec::with_capacity(result.applied_migrations.len() + 2);
    if result.applied_migrations.is_empty() {
        lines.push("No pending migrations".to_string());
    }
    lines.extend(result.applied_migrations.iter().map(|name| format!("   ✓ {}", name)));
    lines.push("✅ Database migrations completed!".to_string());
    finish(lines)
}

fn listing(migrations: &[Migration], marker: &str) -> Vec<String> {
    if migrations.is_empty() {
        return vec!["   None".to_string()];
    }
    migrations
        .iter()
        .map(|m| format!("   {} {}", marker, m.name))
        .collect()
}

fn finish(lines: Vec<String>) -> String {
    let mut out = lines.join("\n");
    out.push('\n');
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use mandala_migrate::MigrationError;
    use std::fs;
    use tempfile::TempDir;

    fn migration(id: i64, name: &str) -> Migration {
        Migration {
            id,
            name: name.to_string(),
            script: String::new(),
        }
    }

    #[test]
    fn test_render_status_with_both_lists() {
        let status = MigrationStatus {
            applied: vec![migration(1, "001_init.sql")],
            pending: vec![migration(2, "002_add_index.sql")],
        };
        let out = render_status(&status);
        assert!(out.contains("Applied Migrations (1):\n   ✅ 001_init.sql"));
        assert!(out.contains("Pending Migrations (1):\n   ⏳ 002_add_index.sql"));
    }

    #[test]
    fn test_render_status_empty() {
        let out = render_status(&MigrationStatus::default());
        assert!(out.contains("Applied Migrations (0):\n   None"));
        assert!(out.contains("Pending Migrations (0):\n   None"));
    }

    #[test]
    fn test_render_summary_lists_pending() {
        let status = MigrationStatus {
            applied: vec![migration(1, "001_init.sql")],
            pending: vec![migration(2, "002_add_index.sql"), migration(3, "003_seed.sql")],
        };
        let out = render_summary(&status);
        assert!(out.contains("   Applied: 1\n   Pending: 2"));
        assert!(out.contains("   - 002_add_index.sql\n   - 003_seed.sql"));

        let out = render_summary(&MigrationStatus::default());
        assert!(!out.contains("Pending migrations:"));
    }

    #[test]
    fn test_render_completion() {
        let result = MigrationRunResult {
            applied_migrations: vec!["001_init.sql".to_string()],
            skipped_count: 0,
            execution_time_ms: 3,
        };
        let out = render_completion(&result);
        assert!(out.contains("✓ 001_init.sql"));
        assert!(out.ends_with("✅ Database migrations completed!\n"));

        let out = render_completion(&MigrationRunResult::default());
        assert!(out.starts_with("No pending migrations"));
    }

    #[tokio::test]
    async fn test_run_then_status_commands() {
        let dir = TempDir::new().unwrap();
        let config = MigrationConfig {
            database_path: dir.path().join("data").join("cli.db"),
            migrations_dir: dir.path().join("migrations"),
            ..Default::default()
        };
        fs::create_dir_all(&config.migrations_dir).unwrap();
        fs::write(
            config.migrations_dir.join("001_init.sql"),
            "CREATE TABLE tasks (id INTEGER PRIMARY KEY, name TEXT NOT NULL);",
        )
        .unwrap();

        run(&config).await.unwrap();
        status(&config, true).await.unwrap();

        let pool = database::connect_config(&config).await.unwrap();
        let runner = MigrationRunner::from_config(&pool, &config).unwrap();
        assert!(runner.status().await.unwrap().is_up_to_date());
        pool.close().await;
    }

    #[tokio::test]
    async fn test_run_command_reports_failing_migration() {
        let dir = TempDir::new().unwrap();
        let config = MigrationConfig {
            database_path: dir.path().join("cli.db"),
            migrations_dir: dir.path().join("migrations"),
            ..Default::default()
        };
        fs::create_dir_all(&config.migrations_dir).unwrap();
        fs::write(config.migrations_dir.join("001_bad.sql"), "CREATE TABLE (;").unwrap();

        let err = run(&config).await.unwrap_err();
        let err = err.downcast_ref::<MigrationError>().unwrap();
        assert_eq!(err.migration_name(), Some("001_bad.sql"));
    }

    #[test]
    fn test_create_command_writes_file() {
        let dir = TempDir::new().unwrap();
        let config = MigrationConfig {
            migrations_dir: dir.path().join("migrations"),
            ..Default::default()
        };

        create(&config, "create tasks").unwrap();
        assert!(config.migrations_dir.join("001_create_tasks.sql").exists());
    }
}
