//! Migration engine errors

use reqwest::Method;
use std::path::Path;

/// Broad category of a [`MigrateError`], independent of the context it was wrapped in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Configuration,
    Io,
    Parse,
    NotFound,
    Request,
    Network,
    Cancelled,
}

/// Errors produced while loading, applying or reverting migrations
#[derive(Debug, thiserror::Error)]
pub enum MigrateError {
    /// Invalid or missing configuration (unknown gateway type, missing base URL)
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Ledger or migration file could not be read or written
    #[error("I/O error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Malformed migration definition or ledger contents
    #[error("Parse error in {context}: {message}")]
    Parse { context: String, message: String },

    /// A migration to revert has no record in the current migration files
    #[error("migration not found for timestamp {0}")]
    NotFound(i64),

    /// The gateway answered with a non-success status
    #[error("request failed with status code {status}: {body}")]
    Request { status: u16, body: String },

    /// Transport-level failure (connection refused, DNS, timeout)
    #[error("failed to send request: {0}")]
    Network(#[source] reqwest::Error),

    /// A single action of a migration failed
    #[error("{method} {endpoint}: {source}")]
    Action {
        endpoint: String,
        method: Method,
        #[source]
        source: Box<MigrateError>,
    },

    /// A migration failed while being applied or reverted
    #[error("migration {identifier} ({name}) failed: {source}")]
    Migration {
        identifier: i64,
        name: String,
        #[source]
        source: Box<MigrateError>,
    },

    /// The run was interrupted by a shutdown signal
    #[error("run cancelled")]
    Cancelled,
}

impl MigrateError {
    pub fn io(path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.display().to_string(),
            source,
        }
    }

    pub fn parse(context: impl std::fmt::Display, message: impl std::fmt::Display) -> Self {
        Self::Parse {
            context: context.to_string(),
            message: message.to_string(),
        }
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    /// The underlying category, looking through action/migration context
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Configuration(_) => ErrorKind::Configuration,
            Self::Io { .. } => ErrorKind::Io,
            Self::Parse { .. } => ErrorKind::Parse,
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::Request { .. } => ErrorKind::Request,
            Self::Network(_) => ErrorKind::Network,
            Self::Cancelled => ErrorKind::Cancelled,
            Self::Action { source, .. } | Self::Migration { source, .. } => source.kind(),
        }
    }

    /// Status code of the failed gateway call, if this error came from one
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Request { status, .. } => Some(*status),
            Self::Action { source, .. } | Self::Migration { source, .. } => source.status(),
            _ => None,
        }
    }
}
