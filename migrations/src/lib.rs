//! restmigrate migrations - declarative migrations for REST-configured API gateways
//!
//! This crate provides types and utilities for:
//! - Migration records made of ordered HTTP actions
//! - Loading migrations from `*.toml` / `*.json` files
//! - A JSON ledger (`restmigrate.state`) of applied migrations
//! - Gateway clients for APISIX, Kong and generic bearer-token APIs
//! - **Migration execution** (`up` / `down`) with a crash-safe ledger
//!
//! # Running migrations
//!
//! ```ignore
//! use restmigrate_migrations::{
//!     DirectorySource, Executor, GatewayConfig, HttpGateway, StateStore, VERSION,
//! };
//!
//! async fn deploy() -> Result<(), restmigrate_migrations::MigrateError> {
//!     let config = GatewayConfig::new("apisix".parse()?, "http://127.0.0.1:9180")
//!         .with_api_key("edd1c9f034335f136f87ad84b625c8f1");
//!     let gateway = HttpGateway::new(config)?;
//!
//!     let executor = Executor::new(
//!         gateway,
//!         DirectorySource::new("./migrations"),
//!         StateStore::new("./migrations", VERSION),
//!     );
//!
//!     let report = executor.up().await?;
//!     println!("applied {} migration(s)", report.len());
//!     Ok(())
//! }
//! ```
//!
//! # Custom sources
//!
//! Anything that can produce [`Migration`] records implements
//! [`MigrationSource`]; [`InMemorySource`] covers migrations built in code.

pub mod error;
pub mod executor;
pub mod gateway;
pub mod migration;
pub mod source;
pub mod state;
pub mod version;
pub mod writer;

pub use error::{ErrorKind, MigrateError};
pub use executor::{
    DownMode, Executor, MigrationStatus, RunReport, StatusReport, run_until, status,
};
pub use gateway::{Dialect, Gateway, GatewayConfig, HttpGateway};
pub use migration::{Action, Migration, parse_method};
pub use source::{DirectorySource, InMemorySource, MigrationSource, parse_file};
pub use state::{AppliedMigration, State, StateStore};
pub use version::{CONFIG_FILE, STATE_FILE, VERSION};
pub use writer::MigrationWriter;

// Re-export the HTTP verb type used by actions
pub use reqwest::Method;
