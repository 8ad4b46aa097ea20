//! CLI command implementations
//!
//! Each command module implements a specific restmigrate CLI command.

pub mod create;
pub mod down;
pub mod list;
pub mod status;
pub mod up;

use std::future::Future;
use std::path::Path;

use restmigrate_migrations::{
    DirectorySource, Executor, GatewayConfig, HttpGateway, MigrateError, StateStore, VERSION,
    run_until,
};

use crate::error::CliError;

/// Executor over the migrations directory at `path`
pub(crate) fn executor(
    path: &Path,
    config: GatewayConfig,
    command: &'static str,
) -> Result<Executor<HttpGateway, DirectorySource>, CliError> {
    let span = tracing::info_span!("restmigrate", command, dialect = %config.dialect);
    tracing::debug!(parent: &span, base_url = %config.base_url, "configuring gateway");

    let gateway = HttpGateway::new(config)?.with_span(span.clone());
    Ok(Executor::new(
        gateway,
        DirectorySource::new(path),
        StateStore::new(path, VERSION),
    )
    .with_span(span))
}

/// Drive `fut` on a single-threaded runtime, cancelling it on Ctrl-C
pub(crate) fn block_on<T, F>(fut: F) -> Result<T, CliError>
where
    F: Future<Output = Result<T, MigrateError>>,
{
    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|e| CliError::IoError(format!("Failed to create async runtime: {}", e)))?;

    rt.block_on(run_until(fut, shutdown_signal()))
        .map_err(Into::into)
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        // Without a handler the run simply cannot be interrupted
        tracing::warn!(error = %e, "failed to listen for Ctrl-C");
        std::future::pending::<()>().await;
    }
}
