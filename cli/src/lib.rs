//! restmigrate CLI - Command-line interface for REST gateway migrations
//!
//! Migrations are `*.toml` (or `*.json`) files in a directory; applied
//! migrations are tracked in `restmigrate.state` next to them.
//!
//! # Quick Start
//!
//! 1. Install the CLI: `cargo install restmigrate-cli`
//! 2. Run `restmigrate create add_hello_route` and fill in the actions
//! 3. Run `restmigrate up --type apisix --base-url http://127.0.0.1:9180 --api-key <key>`
//!
//! # Configuration
//!
//! Gateway settings come from flags, `RESTMIGRATE_*` environment variables
//! (a `.env` file is honored), or an optional `restmigrate.toml`:
//!
//! ```toml
//! [gateway]
//! type = "kong"
//! base_url = "http://localhost:8001"
//! api_key = { env = "KONG_ADMIN_TOKEN" }
//! ```
//!
//! # Commands
//!
//! - `restmigrate create <name>` - Create a new migration file
//! - `restmigrate up` - Apply pending migrations
//! - `restmigrate down [--all]` - Revert the last (or every) applied migration
//! - `restmigrate list` - List applied migrations
//! - `restmigrate status` - Show applied vs pending migrations

pub mod commands;
pub mod config;
pub mod error;
pub mod logging;
pub mod output;

pub use config::{Config, ConfigError, GatewayArgs};
pub use error::CliError;
