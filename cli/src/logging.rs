//! Diagnostic logging for the CLI
//!
//! Diagnostics go to stderr so stdout stays reserved for command output.

use tracing::Subscriber;
use tracing_subscriber::EnvFilter;

/// Environment variable holding a filter directive (e.g. "restmigrate_migrations=debug")
pub const LOG_ENV: &str = "RESTMIGRATE_LOG";

/// Build the stderr subscriber
///
/// `--debug` forces the `debug` level; otherwise `RESTMIGRATE_LOG` applies,
/// falling back to `warn`.
pub fn subscriber(debug: bool) -> impl Subscriber + Send + Sync {
    let filter = if debug {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(debug)
        .finish()
}
