//! Migration Source - Discovers migration files on the filesystem
//!
//! Every call to [`MigrationSource::list`] reads the directory afresh and
//! either returns the complete ordered set of migrations or fails as a
//! whole; there is no partial listing.

use chrono::Utc;
use regex::Regex;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::config::{ConfigError, MigrationConfig};
use crate::definitions::Migration;
use crate::error::{MigrationError, MigrationResult};

/// Reads migration definitions from a directory
#[derive(Debug, Clone)]
pub struct MigrationSource {
    dir: PathBuf,
    extension: String,
    pattern: Regex,
}

impl MigrationSource {
    /// Create a source for `dir`, considering files ending in `.{extension}`
    pub fn new(dir: impl Into<PathBuf>, extension: &str) -> MigrationResult<Self> {
        let extension = extension.trim_start_matches('.').to_string();
        let pattern = Regex::new(&format!(r"^(\d+)_(.+)\.{}$", regex::escape(&extension)))
            .map_err(|e| {
                ConfigError::invalid_value("extension", &extension, format!("usable in a filename pattern ({})", e))
            })?;

        Ok(Self {
            dir: dir.into(),
            extension,
            pattern,
        })
    }

    pub fn from_config(config: &MigrationConfig) -> MigrationResult<Self> {
        Self::new(&config.migrations_dir, &config.extension)
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn extension(&self) -> &str {
        &self.extension
    }

    /// List all migrations, ordered by filename.
    ///
    /// The order is plain string order of the filenames, so ids that are not
    /// zero-padded sort lexicographically (`10_x.sql` before `2_x.sql`).
    pub fn list(&self) -> MigrationResult<Vec<Migration>> {
        if !self.dir.exists() {
            info!(
                "Migrations directory {} does not exist, creating it",
                self.dir.display()
            );
            fs::create_dir_all(&self.dir).map_err(|e| MigrationError::io(&self.dir, e))?;
            return Ok(Vec::new());
        }

        let entries = fs::read_dir(&self.dir).map_err(|e| MigrationError::io(&self.dir, e))?;

        let mut files = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| MigrationError::io(&self.dir, e))?;
            let path = entry.path();
            if !path.is_file() || path.extension().map_or(true, |ext| ext != self.extension.as_str()) {
                continue;
            }

            let filename = entry.file_name().into_string().map_err(|raw| MigrationError::Discovery {
                file: raw.to_string_lossy().into_owned(),
                extension: self.extension.clone(),
            })?;
            files.push((filename, path));
        }

        files.sort_by(|a, b| a.0.cmp(&b.0));

        let mut migrations = Vec::with_capacity(files.len());
        for (filename, path) in files {
            let id = self.parse_id(&filename)?;
            let script =
                fs::read_to_string(&path).map_err(|e| MigrationError::io(&path, e))?;
            migrations.push(Migration {
                id,
                name: filename,
                script,
            });
        }

        debug!(
            "Discovered {} migration file(s) in {}",
            migrations.len(),
            self.dir.display()
        );
        Ok(migrations)
    }

    /// Scaffold the next migration file and return its path.
    ///
    /// The new file takes `max(id) + 1`, zero-padded to three digits.
    pub fn create(&self, description: &str) -> MigrationResult<PathBuf> {
        let slug = slugify(description);
        if slug.is_empty() {
            return Err(ConfigError::invalid_value(
                "description",
                description,
                "at least one letter or digit",
            )
            .into());
        }

        let existing = self.list()?;
        let last_id = existing.iter().map(|m| m.id).max().unwrap_or(0);
        let next_id = last_id.checked_add(1).ok_or_else(|| {
            ConfigError::invalid_value(
                "migration id",
                last_id.to_string(),
                "room for a following id",
            )
        })?;
        let filename = format!("{:03}_{}.{}", next_id, slug, self.extension);
        let path = self.dir.join(&filename);

        let template = format!(
            "-- Migration: {}\n-- Created: {}\n\n",
            slug,
            Utc::now().format("%Y-%m-%d %H:%M:%S UTC")
        );

        let mut file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .map_err(|e| MigrationError::io(&path, e))?;
        file.write_all(template.as_bytes())
            .map_err(|e| MigrationError::io(&path, e))?;

        info!("Created migration {}", filename);
        Ok(path)
    }

    fn parse_id(&self, filename: &str) -> MigrationResult<i64> {
        let discovery_error = || MigrationError::Discovery {
            file: filename.to_string(),
            extension: self.extension.clone(),
        };

        let captures = self.pattern.captures(filename).ok_or_else(discovery_error)?;
        captures[1].parse::<i64>().map_err(|_| discovery_error())
    }
}

fn slugify(description: &str) -> String {
    let mut slug = String::with_capacity(description.len());
    for c in description.trim().chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
        } else if !slug.ends_with('_') {
            slug.push('_');
        }
    }
    slug.trim_matches('_').to_string()
}
