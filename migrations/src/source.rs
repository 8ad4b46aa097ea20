//! Migration sources
//!
//! A [`MigrationSource`] produces the full set of migration records for a run.
//! [`DirectorySource`] reads declarative `*.toml` / `*.json` files:
//!
//! ```toml
//! [[migrations]]
//! timestamp = 1718000000
//! name = "add_hello_route"
//!
//! [[migrations.up]]
//! endpoint = "/apisix/admin/routes/hello"
//! method = "PUT"
//! body = { uri = "/hello", upstream = { type = "roundrobin", nodes = { "httpbin:80" = 1 } } }
//!
//! [[migrations.down]]
//! endpoint = "/apisix/admin/routes/hello"
//! method = "DELETE"
//! ```

use crate::error::MigrateError;
use crate::migration::{Action, Migration, parse_method, sort_by_identifier};
use crate::version::{MIGRATION_EXTENSIONS, is_reserved_file};
use serde::Deserialize;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

/// Supplies the migration records for a run
pub trait MigrationSource {
    /// Load every migration, sorted ascending by timestamp
    fn load(&self) -> Result<Vec<Migration>, MigrateError>;
}

impl<S: MigrationSource + ?Sized> MigrationSource for &S {
    fn load(&self) -> Result<Vec<Migration>, MigrateError> {
        (**self).load()
    }
}

// ============================================================================
// In-memory source
// ============================================================================

/// Migrations held in memory (embedded definitions, tests)
#[derive(Debug, Clone, Default)]
pub struct InMemorySource {
    migrations: Vec<Migration>,
}

impl InMemorySource {
    pub fn new(migrations: impl IntoIterator<Item = Migration>) -> Self {
        Self {
            migrations: migrations.into_iter().collect(),
        }
    }
}

impl MigrationSource for InMemorySource {
    fn load(&self) -> Result<Vec<Migration>, MigrateError> {
        let mut migrations = self.migrations.clone();
        sort_by_identifier(&mut migrations);
        check_unique(migrations.iter().map(|m| (m.identifier, "<memory>")))?;
        Ok(migrations)
    }
}

// ============================================================================
// Directory source
// ============================================================================

/// Loads migration definition files from a directory (non-recursive)
#[derive(Debug, Clone)]
pub struct DirectorySource {
    dir: PathBuf,
}

impl DirectorySource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Migration files in the directory, sorted by file name
    pub fn files(&self) -> Result<Vec<PathBuf>, MigrateError> {
        if !self.dir.is_dir() {
            return Err(MigrateError::io(
                &self.dir,
                std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    "migrations directory does not exist",
                ),
            ));
        }

        let escaped = glob::Pattern::escape(&self.dir.to_string_lossy());
        let mut files = Vec::new();

        for ext in MIGRATION_EXTENSIONS {
            let pattern = format!("{escaped}/*.{ext}");
            let paths = glob::glob(&pattern)
                .map_err(|e| MigrateError::parse(&pattern, e))?;
            for entry in paths {
                let path = entry.map_err(|e| {
                    let path = e.path().to_path_buf();
                    MigrateError::io(&path, e.into_error())
                })?;
                let reserved = path
                    .file_name()
                    .map(|n| is_reserved_file(&n.to_string_lossy()))
                    .unwrap_or(false);
                if path.is_file() && !reserved {
                    files.push(path);
                }
            }
        }

        files.sort();
        Ok(files)
    }
}

impl MigrationSource for DirectorySource {
    fn load(&self) -> Result<Vec<Migration>, MigrateError> {
        tracing::debug!(path = %self.dir.display(), "loading migrations");

        let mut migrations = Vec::new();
        let mut origins = Vec::new();

        for file in self.files()? {
            tracing::debug!(file = %file.display(), "parsing migration file");
            let parsed = parse_file(&file).inspect_err(|e| {
                tracing::error!(file = %file.display(), error = %e, "failed to parse migration file");
            })?;
            origins.extend(parsed.iter().map(|m| (m.identifier, file.clone())));
            migrations.extend(parsed);
        }

        check_unique(origins.iter().map(|(id, file)| (*id, file.display())))?;
        sort_by_identifier(&mut migrations);

        tracing::debug!(count = migrations.len(), "loaded migrations");
        Ok(migrations)
    }
}

/// Reject two migrations sharing a timestamp; their relative order would be arbitrary
fn check_unique<D: std::fmt::Display>(
    entries: impl IntoIterator<Item = (i64, D)>,
) -> Result<(), MigrateError> {
    let mut seen: HashMap<i64, String> = HashMap::new();
    for (identifier, origin) in entries {
        let origin = origin.to_string();
        if let Some(first) = seen.get(&identifier) {
            return Err(MigrateError::parse(
                &origin,
                format!("duplicate migration timestamp {identifier} (also defined in {first})"),
            ));
        }
        seen.insert(identifier, origin);
    }
    Ok(())
}

// ============================================================================
// File format
// ============================================================================

#[derive(Debug, Deserialize)]
struct MigrationFile {
    #[serde(default)]
    migrations: Vec<RawMigration>,
}

#[derive(Debug, Deserialize)]
struct RawMigration {
    #[serde(alias = "identifier")]
    timestamp: i64,
    name: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    up: RawActions,
    #[serde(default, deserialize_with = "null_as_empty")]
    down: RawActions,
}

/// `"up": null` means no actions
fn null_as_empty<'de, D>(deserializer: D) -> Result<RawActions, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Option::<RawActions>::deserialize(deserializer).map(Option::unwrap_or_default)
}

/// Actions as an ordered list, or as an endpoint-keyed table
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawActions {
    Sequence(Vec<RawAction>),
    Mapping(BTreeMap<String, RawMappedAction>),
}

impl Default for RawActions {
    fn default() -> Self {
        Self::Sequence(Vec::new())
    }
}

#[derive(Debug, Deserialize)]
struct RawAction {
    endpoint: String,
    method: String,
    #[serde(default)]
    body: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct RawMappedAction {
    method: String,
    #[serde(default)]
    body: Option<Value>,
}

impl RawActions {
    /// Mapping entries come out sorted by endpoint so the order is repeatable
    fn into_actions(self, context: &str) -> Result<Vec<Action>, MigrateError> {
        let raw: Vec<(String, String, Option<Value>)> = match self {
            Self::Sequence(list) => list
                .into_iter()
                .map(|a| (a.endpoint, a.method, a.body))
                .collect(),
            Self::Mapping(map) => map
                .into_iter()
                .map(|(endpoint, a)| (endpoint, a.method, a.body))
                .collect(),
        };

        raw.into_iter()
            .map(|(endpoint, method, body)| {
                if endpoint.trim().is_empty() {
                    return Err(MigrateError::parse(context, "action with empty endpoint"));
                }
                let method = parse_method(&method).ok_or_else(|| {
                    MigrateError::parse(
                        context,
                        format!("missing or invalid method '{method}' for endpoint {endpoint}"),
                    )
                })?;
                Ok(Action {
                    endpoint,
                    method,
                    body,
                })
            })
            .collect()
    }
}

impl RawMigration {
    fn into_migration(self, file: &Path) -> Result<Migration, MigrateError> {
        let context = format!("{} (migration {})", file.display(), self.timestamp);
        if self.name.trim().is_empty() {
            return Err(MigrateError::parse(&context, "migration name is empty"));
        }
        Ok(Migration {
            identifier: self.timestamp,
            name: self.name,
            up: self.up.into_actions(&context)?,
            down: self.down.into_actions(&context)?,
        })
    }
}

/// Parse one migration file; the format is chosen by extension
pub fn parse_file(path: &Path) -> Result<Vec<Migration>, MigrateError> {
    let contents = std::fs::read_to_string(path).map_err(|e| MigrateError::io(path, e))?;
    let is_json = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));

    let file: MigrationFile = if is_json {
        serde_json::from_str(&contents).map_err(|e| MigrateError::parse(path.display(), e))?
    } else {
        toml::from_str(&contents).map_err(|e| MigrateError::parse(path.display(), e))?
    };

    file.migrations
        .into_iter()
        .map(|raw| raw.into_migration(path))
        .collect()
}
