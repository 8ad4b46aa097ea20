//! Migration executor
//!
//! Diffs the migration source against the ledger and drives the gateway:
//! - `up` applies every migration not yet in the ledger, oldest first
//! - `down` reverts the newest ledger entry, or all of them newest first
//!
//! The ledger is saved after every migration, so an aborted run keeps the
//! migrations that completed before the failure.

use crate::error::MigrateError;
use crate::gateway::Gateway;
use crate::migration::{Action, Migration, find, sort_by_identifier};
use crate::source::MigrationSource;
use crate::state::{AppliedMigration, State, StateStore};
use std::future::Future;
use tracing::{Instrument, Span};

/// Which ledger entries `down` reverts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DownMode {
    /// Only the entry with the highest timestamp
    #[default]
    Last,
    /// Every entry, newest first
    All,
}

/// Migrations applied or reverted by a run, in execution order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunReport {
    pub migrations: Vec<AppliedMigration>,
}

impl RunReport {
    pub fn len(&self) -> usize {
        self.migrations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.migrations.is_empty()
    }
}

/// A source migration and whether the ledger has it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationStatus {
    pub identifier: i64,
    pub name: String,
    pub applied: bool,
}

/// Applied vs pending view of a migrations directory
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatusReport {
    pub migrations: Vec<MigrationStatus>,
    /// Ledger entries whose migration no longer exists in the source
    pub orphaned: Vec<AppliedMigration>,
}

impl StatusReport {
    pub fn pending(&self) -> impl Iterator<Item = &MigrationStatus> {
        self.migrations.iter().filter(|m| !m.applied)
    }

    pub fn applied(&self) -> impl Iterator<Item = &MigrationStatus> {
        self.migrations.iter().filter(|m| m.applied)
    }
}

/// Compare a source against a ledger without touching the gateway
pub fn status(
    source: &impl MigrationSource,
    store: &StateStore,
) -> Result<StatusReport, MigrateError> {
    let state = store.load()?;
    let migrations = source.load()?;

    let report = StatusReport {
        migrations: migrations
            .iter()
            .map(|m| MigrationStatus {
                identifier: m.identifier,
                name: m.name.clone(),
                applied: state.contains(m.identifier),
            })
            .collect(),
        orphaned: orphaned(&state, &migrations),
    };

    Ok(report)
}

fn orphaned(state: &State, migrations: &[Migration]) -> Vec<AppliedMigration> {
    state
        .applied
        .iter()
        .filter(|entry| find(migrations, entry.identifier).is_none())
        .cloned()
        .collect()
}

/// Race a run against a shutdown signal
///
/// When `shutdown` completes first the run future is dropped, which aborts the
/// in-flight request. Ledger writes happen between awaits, so the ledger is
/// never left half-written.
pub async fn run_until<T, F, C>(run: F, shutdown: C) -> Result<T, MigrateError>
where
    F: Future<Output = Result<T, MigrateError>>,
    C: Future<Output = ()>,
{
    tokio::select! {
        result = run => result,
        () = shutdown => {
            tracing::warn!("shutdown requested, aborting run");
            Err(MigrateError::Cancelled)
        }
    }
}

/// Applies and reverts migrations against a gateway
pub struct Executor<G, S> {
    gateway: G,
    source: S,
    store: StateStore,
    span: Span,
}

impl<G: Gateway, S: MigrationSource> Executor<G, S> {
    pub fn new(gateway: G, source: S, store: StateStore) -> Self {
        Self {
            gateway,
            source,
            store,
            span: Span::none(),
        }
    }

    /// Emit run diagnostics under the given span
    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    pub fn gateway(&self) -> &G {
        &self.gateway
    }

    pub fn store(&self) -> &StateStore {
        &self.store
    }

    /// Applied vs pending view; does not contact the gateway
    pub fn status(&self) -> Result<StatusReport, MigrateError> {
        let _enter = self.span.enter();
        status(&self.source, &self.store)
    }

    /// Apply every pending migration in ascending timestamp order
    pub async fn up(&self) -> Result<RunReport, MigrateError> {
        self.up_inner().instrument(self.span.clone()).await
    }

    /// Revert the last applied migration, or all of them
    pub async fn down(&self, mode: DownMode) -> Result<RunReport, MigrateError> {
        self.down_inner(mode).instrument(self.span.clone()).await
    }

    async fn up_inner(&self) -> Result<RunReport, MigrateError> {
        tracing::debug!("starting up");

        let mut state = self.store.load().inspect_err(|e| {
            tracing::error!(error = %e, "failed to load state");
        })?;
        let mut migrations = self.source.load().inspect_err(|e| {
            tracing::error!(error = %e, "failed to load migrations");
        })?;
        sort_by_identifier(&mut migrations);

        for entry in orphaned(&state, &migrations) {
            tracing::warn!(
                timestamp = entry.identifier,
                name = %entry.name,
                "applied migration has no migration file"
            );
        }

        let mut report = RunReport::default();

        for migration in &migrations {
            if state.contains(migration.identifier) {
                tracing::debug!(name = %migration.name, "skipping already applied migration");
                continue;
            }

            tracing::info!(timestamp = migration.identifier, name = %migration.name, "applying migration");
            self.apply_actions(&migration.up)
                .await
                .map_err(|e| migration_failed(migration, e, "apply"))?;

            state.add_migration(migration.identifier, &migration.name);
            self.store.save(&state).inspect_err(|e| {
                tracing::error!(error = %e, "failed to save state");
            })?;

            tracing::info!(name = %migration.name, "successfully applied migration");
            report.migrations.push(AppliedMigration {
                identifier: migration.identifier,
                name: migration.name.clone(),
            });
        }

        if report.is_empty() {
            tracing::info!("no pending migrations");
        } else {
            tracing::info!(count = report.len(), "all migrations have been applied");
        }
        Ok(report)
    }

    async fn down_inner(&self, mode: DownMode) -> Result<RunReport, MigrateError> {
        tracing::debug!(?mode, "starting down");

        let mut state = self.store.load().inspect_err(|e| {
            tracing::error!(error = %e, "failed to load state");
        })?;

        if state.is_empty() {
            tracing::info!("no migrations to revert");
            return Ok(RunReport::default());
        }

        let migrations = self.source.load().inspect_err(|e| {
            tracing::error!(error = %e, "failed to load migrations");
        })?;

        // Newest first; each revert then removes the current maximum
        let targets: Vec<AppliedMigration> = match mode {
            DownMode::Last => state.last().cloned().into_iter().collect(),
            DownMode::All => state.applied.iter().rev().cloned().collect(),
        };

        let mut report = RunReport::default();

        for entry in targets {
            let migration = find(&migrations, entry.identifier).ok_or_else(|| {
                tracing::error!(timestamp = entry.identifier, "failed to load migration");
                MigrateError::NotFound(entry.identifier)
            })?;

            tracing::info!(timestamp = migration.identifier, name = %migration.name, "reverting migration");
            self.apply_actions(&migration.down)
                .await
                .map_err(|e| migration_failed(migration, e, "revert"))?;

            state.remove_last();
            self.store.save(&state).inspect_err(|e| {
                tracing::error!(error = %e, "failed to save state");
            })?;

            tracing::info!(name = %migration.name, "successfully reverted migration");
            report.migrations.push(entry);
        }

        Ok(report)
    }

    /// Issue each action in order, stopping at the first failure
    async fn apply_actions(&self, actions: &[Action]) -> Result<(), MigrateError> {
        for action in actions {
            tracing::debug!(method = %action.method, endpoint = %action.endpoint, "applying action");
            self.gateway.send_request(action).await.map_err(|source| {
                tracing::error!(endpoint = %action.endpoint, error = %source, "failed to apply action");
                MigrateError::Action {
                    endpoint: action.endpoint.clone(),
                    method: action.method.clone(),
                    source: Box::new(source),
                }
            })?;
        }
        Ok(())
    }
}

fn migration_failed(migration: &Migration, source: MigrateError, verb: &str) -> MigrateError {
    tracing::error!(name = %migration.name, error = %source, "failed to {verb} migration");
    MigrateError::Migration {
        identifier: migration.identifier,
        name: migration.name.clone(),
        source: Box::new(source),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorKind;
    use crate::source::InMemorySource;
    use async_trait::async_trait;
    use reqwest::Method;
    use std::collections::HashSet;
    use std::sync::Mutex;
    use tempfile::TempDir;

    /// Records every request; fails endpoints listed in `failing`
    #[derive(Default)]
    struct RecordingGateway {
        calls: Mutex<Vec<(Method, String)>>,
        failing: Mutex<HashSet<String>>,
    }

    impl RecordingGateway {
        fn failing_on(endpoint: &str) -> Self {
            let gateway = Self::default();
            gateway.fail(endpoint);
            gateway
        }

        fn fail(&self, endpoint: &str) {
            self.failing.lock().unwrap().insert(endpoint.to_string());
        }

        fn heal(&self) {
            self.failing.lock().unwrap().clear();
        }

        fn endpoints(&self) -> Vec<String> {
            self.calls.lock().unwrap().iter().map(|(_, e)| e.clone()).collect()
        }

        fn clear(&self) {
            self.calls.lock().unwrap().clear();
        }
    }

    #[async_trait]
    impl Gateway for RecordingGateway {
        async fn send_request(&self, action: &Action) -> Result<(), MigrateError> {
            self.calls
                .lock()
                .unwrap()
                .push((action.method.clone(), action.endpoint.clone()));
            if self.failing.lock().unwrap().contains(&action.endpoint) {
                return Err(MigrateError::Request {
                    status: 500,
                    body: "boom".into(),
                });
            }
            Ok(())
        }
    }

    fn migration(id: i64) -> Migration {
        Migration::new(id, format!("m{id}"))
            .with_up(Action::new(Method::PUT, format!("/up/{id}/a")))
            .with_up(Action::new(Method::PUT, format!("/up/{id}/b")))
            .with_down(Action::new(Method::DELETE, format!("/down/{id}")))
    }

    fn executor(
        temp: &TempDir,
        ids: &[i64],
        gateway: RecordingGateway,
    ) -> Executor<RecordingGateway, InMemorySource> {
        let source = InMemorySource::new(ids.iter().map(|&id| migration(id)));
        Executor::new(gateway, source, StateStore::new(temp.path(), "test"))
    }

    fn ledger(executor: &Executor<RecordingGateway, InMemorySource>) -> Vec<i64> {
        executor
            .store()
            .load()
            .unwrap()
            .applied
            .iter()
            .map(|m| m.identifier)
            .collect()
    }

    #[tokio::test]
    async fn up_applies_all_in_order() {
        let temp = TempDir::new().unwrap();
        let exec = executor(&temp, &[300, 100, 200], RecordingGateway::default());

        let report = exec.up().await.unwrap();

        assert_eq!(report.len(), 3);
        assert_eq!(ledger(&exec), [100, 200, 300]);
        assert_eq!(
            exec.gateway().endpoints(),
            [
                "/up/100/a", "/up/100/b", "/up/200/a", "/up/200/b", "/up/300/a", "/up/300/b"
            ]
        );
    }

    #[tokio::test]
    async fn up_twice_is_idempotent() {
        let temp = TempDir::new().unwrap();
        let exec = executor(&temp, &[100, 200], RecordingGateway::default());

        exec.up().await.unwrap();
        exec.gateway().clear();

        let report = exec.up().await.unwrap();
        assert!(report.is_empty());
        assert!(exec.gateway().endpoints().is_empty());
        assert_eq!(ledger(&exec), [100, 200]);
    }

    #[tokio::test]
    async fn up_failure_keeps_earlier_migrations_and_resumes() {
        let temp = TempDir::new().unwrap();
        let exec = executor(&temp, &[100, 200], RecordingGateway::failing_on("/up/200/a"));

        let err = exec.up().await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Request);
        assert!(matches!(err, MigrateError::Migration { identifier: 200, .. }));
        assert!(err.to_string().contains("/up/200/a"));
        assert_eq!(ledger(&exec), [100]);
        // The failing migration's later action is never attempted
        assert!(!exec.gateway().endpoints().contains(&"/up/200/b".to_string()));

        exec.gateway().heal();
        exec.gateway().clear();

        let report = exec.up().await.unwrap();
        assert_eq!(report.migrations[0].identifier, 200);
        assert_eq!(exec.gateway().endpoints(), ["/up/200/a", "/up/200/b"]);
        assert_eq!(ledger(&exec), [100, 200]);
    }

    #[tokio::test]
    async fn up_failure_on_later_action_does_not_record_migration() {
        let temp = TempDir::new().unwrap();
        let exec = executor(&temp, &[100], RecordingGateway::failing_on("/up/100/b"));

        exec.up().await.unwrap_err();

        assert_eq!(exec.gateway().endpoints(), ["/up/100/a", "/up/100/b"]);
        assert!(ledger(&exec).is_empty());
    }

    #[tokio::test]
    async fn down_last_reverts_highest_only() {
        let temp = TempDir::new().unwrap();
        let exec = executor(&temp, &[100, 200], RecordingGateway::default());
        exec.up().await.unwrap();
        exec.gateway().clear();

        let report = exec.down(DownMode::Last).await.unwrap();
        assert_eq!(report.migrations[0].identifier, 200);
        assert_eq!(exec.gateway().endpoints(), ["/down/200"]);
        assert_eq!(ledger(&exec), [100]);

        exec.gateway().clear();
        exec.down(DownMode::Last).await.unwrap();
        assert_eq!(exec.gateway().endpoints(), ["/down/100"]);
        assert!(ledger(&exec).is_empty());

        exec.gateway().clear();
        let report = exec.down(DownMode::Last).await.unwrap();
        assert!(report.is_empty());
        assert!(exec.gateway().endpoints().is_empty());
    }

    #[tokio::test]
    async fn down_all_reverts_newest_first() {
        let temp = TempDir::new().unwrap();
        let exec = executor(&temp, &[100, 200, 300], RecordingGateway::default());
        exec.up().await.unwrap();
        exec.gateway().clear();

        let report = exec.down(DownMode::All).await.unwrap();
        let reverted: Vec<_> = report.migrations.iter().map(|m| m.identifier).collect();
        assert_eq!(reverted, [300, 200, 100]);
        assert_eq!(exec.gateway().endpoints(), ["/down/300", "/down/200", "/down/100"]);
        assert!(ledger(&exec).is_empty());
    }

    #[tokio::test]
    async fn down_all_failure_keeps_remaining_entries() {
        let temp = TempDir::new().unwrap();
        let exec = executor(&temp, &[100, 200, 300], RecordingGateway::default());
        exec.up().await.unwrap();
        exec.gateway().fail("/down/200");

        let err = exec.down(DownMode::All).await.unwrap_err();
        assert!(matches!(err, MigrateError::Migration { identifier: 200, .. }));
        assert_eq!(ledger(&exec), [100, 200]);
    }

    #[tokio::test]
    async fn down_without_source_record_is_not_found() {
        let temp = TempDir::new().unwrap();
        let store = StateStore::new(temp.path(), "test");
        let mut state = State::new("test");
        state.add_migration(100, "m100");
        state.add_migration(999, "deleted");
        store.save(&state).unwrap();

        let exec = executor(&temp, &[100], RecordingGateway::default());
        let err = exec.down(DownMode::Last).await.unwrap_err();

        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert!(exec.gateway().endpoints().is_empty());
        assert_eq!(ledger(&exec), [100, 999]);
    }

    #[test]
    fn status_reports_pending_and_orphaned() {
        let temp = TempDir::new().unwrap();
        let store = StateStore::new(temp.path(), "test");
        let mut state = State::new("test");
        state.add_migration(100, "m100");
        state.add_migration(50, "gone");
        store.save(&state).unwrap();

        let exec = executor(&temp, &[100, 200], RecordingGateway::default());
        let report = exec.status().unwrap();

        let pending: Vec<_> = report.pending().map(|m| m.identifier).collect();
        let applied: Vec<_> = report.applied().map(|m| m.identifier).collect();
        assert_eq!(pending, [200]);
        assert_eq!(applied, [100]);
        assert_eq!(report.orphaned.len(), 1);
        assert_eq!(report.orphaned[0].identifier, 50);
    }

    #[tokio::test]
    async fn run_until_cancels_pending_run() {
        let result: Result<(), MigrateError> =
            run_until(std::future::pending(), async {}).await;
        assert_eq!(result.unwrap_err().kind(), ErrorKind::Cancelled);

        let result = run_until(async { Ok(7) }, std::future::pending()).await;
        assert_eq!(result.unwrap(), 7);
    }
}
