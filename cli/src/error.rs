//! Error types for the CLI

use thiserror::Error;

use crate::config::ConfigError;
use restmigrate_migrations::MigrateError;

/// CLI errors
#[derive(Debug, Error)]
pub enum CliError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Engine error
    #[error(transparent)]
    Migrate(#[from] MigrateError),

    /// I/O error
    #[error("I/O error: {0}")]
    IoError(String),
}
