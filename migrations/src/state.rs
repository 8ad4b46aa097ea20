//! Ledger of applied migrations
//!
//! The ledger (`restmigrate.state`) lives in the migrations directory and
//! records which migrations have been applied, sorted by timestamp. It is
//! rewritten in full after every applied or reverted migration.

use crate::error::MigrateError;
use crate::version::STATE_FILE;
use serde::{Deserialize, Deserializer, Serialize};
use std::io::Write;
use std::path::{Path, PathBuf};

/// A ledger entry for a migration whose up actions succeeded
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct AppliedMigration {
    /// Migration timestamp
    #[serde(rename = "timestamp", alias = "identifier")]
    pub identifier: i64,
    /// Migration name at the time it was applied
    pub name: String,
}

/// Ledger contents
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct State {
    /// Version of the tool that last wrote the ledger
    #[serde(rename = "app_version", alias = "schema_version", default)]
    pub schema_version: String,
    /// Applied migrations, ascending by timestamp
    #[serde(
        rename = "applied_migrations",
        alias = "applied",
        default,
        deserialize_with = "null_as_empty"
    )]
    pub applied: Vec<AppliedMigration>,
}

/// Older ledgers store an empty list as `null`
fn null_as_empty<'de, D>(deserializer: D) -> Result<Vec<AppliedMigration>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<Vec<AppliedMigration>>::deserialize(deserializer).map(Option::unwrap_or_default)
}

impl State {
    /// Create an empty ledger stamped with the given tool version
    pub fn new(version: impl Into<String>) -> Self {
        Self {
            schema_version: version.into(),
            applied: Vec::new(),
        }
    }

    /// Record a migration as applied, keeping entries sorted and unique
    pub fn add_migration(&mut self, identifier: i64, name: impl Into<String>) {
        let name = name.into();
        if let Some(existing) = self.applied.iter_mut().find(|m| m.identifier == identifier) {
            existing.name = name;
            return;
        }
        self.applied.push(AppliedMigration { identifier, name });
        self.applied.sort_by_key(|m| m.identifier);
    }

    /// Remove the entry with the highest timestamp
    pub fn remove_last(&mut self) -> Option<AppliedMigration> {
        self.applied.pop()
    }

    pub fn contains(&self, identifier: i64) -> bool {
        self.applied.iter().any(|m| m.identifier == identifier)
    }

    /// Entry with the highest timestamp
    pub fn last(&self) -> Option<&AppliedMigration> {
        self.applied.last()
    }

    pub fn len(&self) -> usize {
        self.applied.len()
    }

    pub fn is_empty(&self) -> bool {
        self.applied.is_empty()
    }

    /// Serialize the ledger to pretty JSON
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Parse a ledger from JSON, restoring the sorted, duplicate-free order
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        let mut state: Self = serde_json::from_str(json)?;
        state.normalize();
        Ok(state)
    }

    fn normalize(&mut self) {
        self.applied.sort_by_key(|m| m.identifier);
        // Later entries win, matching add_migration
        let mut deduped: Vec<AppliedMigration> = Vec::with_capacity(self.applied.len());
        for entry in self.applied.drain(..) {
            match deduped.last_mut() {
                Some(prev) if prev.identifier == entry.identifier => *prev = entry,
                _ => deduped.push(entry),
            }
        }
        self.applied = deduped;
    }
}

/// Loads and saves the ledger of one migrations directory
#[derive(Debug, Clone)]
pub struct StateStore {
    dir: PathBuf,
    version: String,
}

impl StateStore {
    pub fn new(dir: impl Into<PathBuf>, version: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            version: version.into(),
        }
    }

    /// Migrations directory this store belongs to
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Ledger file path
    pub fn path(&self) -> PathBuf {
        self.dir.join(STATE_FILE)
    }

    /// Load the ledger, or an empty one if the file does not exist yet
    ///
    /// When the ledger was written by another tool version, the version is
    /// updated and the ledger saved straight away.
    pub fn load(&self) -> Result<State, MigrateError> {
        let path = self.path();
        tracing::debug!(path = %path.display(), "loading state file");

        let contents = match std::fs::read_to_string(&path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!(path = %path.display(), "state file not found, starting with empty state");
                return Ok(State::new(self.version.as_str()));
            }
            Err(e) => return Err(MigrateError::io(&path, e)),
        };

        let mut state =
            State::from_json(&contents).map_err(|e| MigrateError::parse(path.display(), e))?;

        if state.schema_version != self.version {
            tracing::info!(
                old = %state.schema_version,
                new = %self.version,
                "updating app version in state file"
            );
            state.schema_version = self.version.clone();
            self.save(&state)?;
        }

        Ok(state)
    }

    /// Write the full ledger, replacing the previous file atomically
    pub fn save(&self, state: &State) -> Result<(), MigrateError> {
        let path = self.path();
        tracing::debug!(path = %path.display(), entries = state.len(), "saving state file");

        let json = state.to_json().map_err(|e| {
            MigrateError::io(&path, std::io::Error::new(std::io::ErrorKind::InvalidData, e))
        })?;

        std::fs::create_dir_all(&self.dir).map_err(|e| MigrateError::io(&self.dir, e))?;

        let mut file =
            tempfile::NamedTempFile::new_in(&self.dir).map_err(|e| MigrateError::io(&self.dir, e))?;
        file.write_all(json.as_bytes())
            .and_then(|()| file.as_file().sync_all())
            .map_err(|e| MigrateError::io(file.path(), e))?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            file.as_file()
                .set_permissions(std::fs::Permissions::from_mode(0o644))
                .map_err(|e| MigrateError::io(file.path(), e))?;
        }

        file.persist(&path)
            .map_err(|e| MigrateError::io(&path, e.error))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn ids(state: &State) -> Vec<i64> {
        state.applied.iter().map(|m| m.identifier).collect()
    }

    #[test]
    fn add_migration_keeps_sorted() {
        let mut state = State::new("1.0.0");
        state.add_migration(300, "c");
        state.add_migration(100, "a");
        state.add_migration(200, "b");

        assert_eq!(ids(&state), [100, 200, 300]);
        assert_eq!(state.last().map(|m| m.identifier), Some(300));
    }

    #[test]
    fn add_migration_replaces_duplicate() {
        let mut state = State::new("1.0.0");
        state.add_migration(100, "old");
        state.add_migration(100, "new");

        assert_eq!(state.len(), 1);
        assert_eq!(state.applied[0].name, "new");
    }

    #[test]
    fn remove_last_takes_highest() {
        let mut state = State::new("1.0.0");
        state.add_migration(200, "b");
        state.add_migration(100, "a");

        assert_eq!(state.remove_last().map(|m| m.identifier), Some(200));
        assert_eq!(ids(&state), [100]);
        assert_eq!(state.remove_last().map(|m| m.identifier), Some(100));
        assert!(state.remove_last().is_none());
        assert!(state.is_empty());
    }

    #[test]
    fn load_missing_file_is_empty() {
        let temp = TempDir::new().unwrap();
        let store = StateStore::new(temp.path(), "1.0.0");

        let state = store.load().unwrap();
        assert!(state.is_empty());
        assert_eq!(state.schema_version, "1.0.0");
        // Nothing is written until the first save
        assert!(!store.path().exists());
    }

    #[test]
    fn save_then_load() {
        let temp = TempDir::new().unwrap();
        let store = StateStore::new(temp.path(), "1.0.0");

        let mut state = State::new("1.0.0");
        state.add_migration(200, "second");
        state.add_migration(100, "first");
        store.save(&state).unwrap();

        let loaded = store.load().unwrap();
        assert_eq!(loaded, state);

        let raw = std::fs::read_to_string(store.path()).unwrap();
        assert!(raw.contains("\"app_version\": \"1.0.0\""));
        assert!(raw.contains("\"applied_migrations\""));
        assert!(raw.contains("\"timestamp\": 100"));
        assert!(raw.find("\"timestamp\": 100").unwrap() < raw.find("\"timestamp\": 200").unwrap());
    }

    #[test]
    fn save_leaves_no_temp_files() {
        let temp = TempDir::new().unwrap();
        let store = StateStore::new(temp.path(), "1.0.0");

        let mut state = State::new("1.0.0");
        for id in 0..5 {
            state.add_migration(id, format!("m{id}"));
            store.save(&state).unwrap();
        }

        let names: Vec<_> = std::fs::read_dir(temp.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
            .collect();
        assert_eq!(names, [STATE_FILE]);
    }

    #[test]
    fn load_accepts_null_and_unsorted_entries() {
        let temp = TempDir::new().unwrap();
        let store = StateStore::new(temp.path(), "1.0.0");

        std::fs::write(
            store.path(),
            r#"{"app_version": "1.0.0", "applied_migrations": null}"#,
        )
        .unwrap();
        assert!(store.load().unwrap().is_empty());

        std::fs::write(
            store.path(),
            r#"{"app_version": "1.0.0", "applied_migrations": [
                {"timestamp": 300, "name": "c"},
                {"timestamp": 100, "name": "a"},
                {"timestamp": 300, "name": "c2"}
            ]}"#,
        )
        .unwrap();
        let state = store.load().unwrap();
        assert_eq!(ids(&state), [100, 300]);
        assert_eq!(state.applied[1].name, "c2");
    }

    #[test]
    fn load_accepts_field_aliases() {
        let state = State::from_json(
            r#"{"schema_version": "2", "applied": [{"identifier": 7, "name": "x"}]}"#,
        )
        .unwrap();
        assert_eq!(state.schema_version, "2");
        assert_eq!(ids(&state), [7]);
    }

    #[test]
    fn load_updates_stale_version() {
        let temp = TempDir::new().unwrap();
        let old = StateStore::new(temp.path(), "0.9.0");
        let mut state = State::new("0.9.0");
        state.add_migration(100, "first");
        old.save(&state).unwrap();

        let store = StateStore::new(temp.path(), "1.0.0");
        let loaded = store.load().unwrap();
        assert_eq!(loaded.schema_version, "1.0.0");
        assert_eq!(ids(&loaded), [100]);

        let raw = std::fs::read_to_string(store.path()).unwrap();
        assert!(raw.contains("\"app_version\": \"1.0.0\""));
    }

    #[test]
    fn load_invalid_json_is_parse_error() {
        let temp = TempDir::new().unwrap();
        let store = StateStore::new(temp.path(), "1.0.0");
        std::fs::write(store.path(), "not json").unwrap();

        let err = store.load().unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::Parse);
    }

    #[test]
    fn load_unreadable_path_is_io_error() {
        let temp = TempDir::new().unwrap();
        let store = StateStore::new(temp.path(), "1.0.0");
        // A directory in place of the ledger file cannot be read as text
        std::fs::create_dir(store.path()).unwrap();

        let err = store.load().unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::Io);
    }
}
