//! Migration file writer

use crate::error::MigrateError;
use chrono::{DateTime, Local, TimeZone};
use heck::ToSnakeCase;
use std::fmt::Display;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Creates new, empty migration files in a migrations directory
#[derive(Debug, Clone)]
pub struct MigrationWriter {
    dir: PathBuf,
}

impl MigrationWriter {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Get the migrations directory path
    pub fn migrations_dir(&self) -> &Path {
        &self.dir
    }

    /// Create a migration stamped with the current local time
    pub fn create(&self, name: &str) -> Result<PathBuf, MigrateError> {
        self.create_at(name, &Local::now())
    }

    /// Create `YYYYMMDD_HHMMSS_<name>.toml` stamped with `at`
    ///
    /// The record's timestamp is `at` in Unix seconds. Existing files are
    /// never overwritten.
    pub fn create_at<Tz>(&self, name: &str, at: &DateTime<Tz>) -> Result<PathBuf, MigrateError>
    where
        Tz: TimeZone,
        Tz::Offset: Display,
    {
        validate_name(name)?;

        let file_name = format!("{}_{}.toml", at.format("%Y%m%d_%H%M%S"), name.to_snake_case());
        let path = self.dir.join(file_name);

        fs::create_dir_all(&self.dir).map_err(|e| MigrateError::io(&self.dir, e))?;

        let mut file = fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .map_err(|e| MigrateError::io(&path, e))?;
        file.write_all(render_template(at.timestamp(), name).as_bytes())
            .map_err(|e| MigrateError::io(&path, e))?;

        tracing::info!(path = %path.display(), "created migration file");
        Ok(path)
    }
}

fn validate_name(name: &str) -> Result<(), MigrateError> {
    if name.is_empty() {
        return Err(MigrateError::parse("migration name", "name must not be empty"));
    }
    if let Some(c) = name
        .chars()
        .find(|c| !(c.is_ascii_alphanumeric() || *c == '_' || *c == '-'))
    {
        return Err(MigrateError::parse(
            "migration name",
            format!("invalid character {c:?} in '{name}' (use letters, digits, '_' or '-')"),
        ));
    }
    Ok(())
}

fn render_template(timestamp: i64, name: &str) -> String {
    format!(
        r#"[[migrations]]
timestamp = {timestamp}
name = "{name}"

# Actions run in the order they are listed.
#
# [[migrations.up]]
# endpoint = "/apisix/admin/routes/{name}"
# method = "PUT"
# body = {{ uri = "/{name}", upstream = {{ type = "roundrobin", nodes = {{ "backend:80" = 1 }} }} }}
#
# [[migrations.down]]
# endpoint = "/apisix/admin/routes/{name}"
# method = "DELETE"
"#
    )
}
