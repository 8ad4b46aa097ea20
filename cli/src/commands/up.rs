//! Up command implementation
//!
//! Applies pending migrations against the gateway.

use std::path::Path;

use colored::Colorize;

use crate::config::{Config, GatewayArgs};
use crate::error::CliError;
use crate::output;

/// Run the up command
pub fn run(path: &Path, config: &Config, args: &GatewayArgs) -> Result<(), CliError> {
    let gateway = config.gateway_config(args)?;

    println!("{}", "Applying migrations...".bright_cyan());
    println!(
        "  {}: {} ({})",
        output::label("Gateway"),
        gateway.base_url,
        gateway.dialect
    );
    println!();

    let executor = super::executor(path, gateway, "up")?;
    let report = super::block_on(executor.up())?;

    if report.is_empty() {
        println!("  {}", "No pending migrations.".green());
    } else {
        println!("  {} {} migration(s):", "Applied".green(), report.len());
        for migration in &report.migrations {
            println!(
                "    {} {}",
                "->".bright_blue(),
                output::migration_tag(migration.identifier, &migration.name)
            );
        }
    }

    println!();
    println!("{}", output::success("Migrations complete!"));

    Ok(())
}
