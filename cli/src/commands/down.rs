//! Down command implementation
//!
//! Reverts the last applied migration, or all of them with `--all`.

use std::path::Path;

use colored::Colorize;
use restmigrate_migrations::DownMode;

use crate::config::{Config, GatewayArgs};
use crate::error::CliError;
use crate::output;

/// Run the down command
pub fn run(path: &Path, config: &Config, args: &GatewayArgs, all: bool) -> Result<(), CliError> {
    let gateway = config.gateway_config(args)?;
    let mode = if all { DownMode::All } else { DownMode::Last };

    println!("{}", "Reverting migrations...".bright_cyan());
    println!(
        "  {}: {} ({})",
        output::label("Gateway"),
        gateway.base_url,
        gateway.dialect
    );
    println!();

    let executor = super::executor(path, gateway, "down")?;
    let report = super::block_on(executor.down(mode))?;

    if report.is_empty() {
        println!("  {}", "No migrations to revert.".yellow());
    } else {
        println!("  {} {} migration(s):", "Reverted".green(), report.len());
        for migration in &report.migrations {
            println!(
                "    {} {}",
                "<-".bright_blue(),
                output::migration_tag(migration.identifier, &migration.name)
            );
        }
    }

    Ok(())
}
