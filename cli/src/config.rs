//! Configuration for restmigrate CLI
//!
//! An optional `restmigrate.toml` in the migrations directory supplies
//! gateway defaults:
//!
//! ```toml
//! [gateway]
//! type = "apisix"
//! base_url = "http://127.0.0.1:9180"
//! api_key = { env = "APISIX_ADMIN_KEY" }
//! timeout = 30
//! ```
//!
//! Values are resolved flag > environment variable > config file > default.
//! Clap handles the first two; [`Config::gateway_config`] merges the rest.

use restmigrate_migrations::{CONFIG_FILE, Dialect, GatewayConfig};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

// ============================================================================
// File format
// ============================================================================

/// A string literal, or the name of an environment variable holding it
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Literal(String),
    Env { env: String },
}

impl Value {
    /// Resolve to a string; an unset variable is an error
    pub fn resolve(&self) -> Result<String, Error> {
        match self {
            Self::Literal(s) => Ok(s.clone()),
            Self::Env { env } => std::env::var(env).map_err(|_| Error::MissingEnv(env.clone())),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GatewaySection {
    #[serde(rename = "type", default)]
    pub kind: Option<Value>,
    #[serde(default)]
    pub base_url: Option<Value>,
    #[serde(default)]
    pub api_key: Option<Value>,
    /// Request timeout in seconds
    #[serde(default)]
    pub timeout: Option<u64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub gateway: GatewaySection,
}

/// Gateway settings taken from flags and environment variables
#[derive(Debug, Clone, Default)]
pub struct GatewayArgs {
    pub base_url: Option<String>,
    pub api_key: Option<String>,
    pub kind: Option<String>,
    pub timeout: Option<u64>,
}

// ============================================================================
// Config implementation
// ============================================================================

impl Config {
    /// Load `path` if given (it must exist), else `<dir>/restmigrate.toml` if present
    pub fn discover(path: Option<&Path>, dir: &Path) -> Result<Self, Error> {
        match path {
            Some(path) => Self::load_from(path),
            None => match Self::load_from(&dir.join(CONFIG_FILE)) {
                Err(Error::NotFound(_)) => {
                    tracing::debug!("no {CONFIG_FILE} found, using defaults");
                    Ok(Self::default())
                }
                other => other,
            },
        }
    }

    /// Load from specific path
    pub fn load_from(path: &Path) -> Result<Self, Error> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                Error::NotFound(path.into())
            } else {
                Error::Io(path.into(), e)
            }
        })?;

        let config: Self =
            toml::from_str(&content).map_err(|e| Error::Parse(path.into(), e))?;
        tracing::debug!(path = %path.display(), "loaded config file");
        Ok(config)
    }

    /// Merge command-line settings over the file's `[gateway]` section
    pub fn gateway_config(&self, args: &GatewayArgs) -> Result<GatewayConfig, Error> {
        let section = &self.gateway;

        let kind = pick(args.kind.as_deref(), section.kind.as_ref())?;
        let dialect = match kind {
            Some(kind) => kind.parse::<Dialect>().map_err(|_| Error::UnsupportedType(kind))?,
            None => Dialect::default(),
        };

        let base_url = pick(args.base_url.as_deref(), section.base_url.as_ref())?
            .filter(|url| !url.trim().is_empty())
            .ok_or(Error::MissingBaseUrl)?;

        let mut config = GatewayConfig::new(dialect, base_url);
        if let Some(key) = pick(args.api_key.as_deref(), section.api_key.as_ref())? {
            config = config.with_api_key(key);
        }
        if let Some(secs) = args.timeout.or(section.timeout) {
            config = config.with_timeout(Duration::from_secs(secs));
        }
        Ok(config)
    }
}

fn pick(arg: Option<&str>, file: Option<&Value>) -> Result<Option<String>, Error> {
    match (arg, file) {
        (Some(arg), _) => Ok(Some(arg.to_string())),
        (None, Some(value)) => value.resolve().map(Some),
        (None, None) => Ok(None),
    }
}

// ============================================================================
// Errors
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("config not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("failed to read {}: {}", .0.display(), .1)]
    Io(PathBuf, #[source] std::io::Error),

    #[error("failed to parse {}: {}", .0.display(), .1)]
    Parse(PathBuf, #[source] toml::de::Error),

    #[error("environment variable {0} is not set")]
    MissingEnv(String),

    #[error("unsupported gateway type: {0} (expected one of: apisix, kong, generic)")]
    UnsupportedType(String),

    #[error("base URL is required (use --base-url or RESTMIGRATE_BASE_URL)")]
    MissingBaseUrl,
}

pub type ConfigError = Error;

// ============================================================================
// Tests
// ============================================================================
