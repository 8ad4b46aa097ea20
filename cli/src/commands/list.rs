//! List command implementation
//!
//! Prints the migrations recorded in the ledger.

use std::path::Path;

use colored::Colorize;
use restmigrate_migrations::{StateStore, VERSION};

use crate::error::CliError;
use crate::output;

/// Run the list command
pub fn run(path: &Path) -> Result<(), CliError> {
    let state = StateStore::new(path, VERSION).load()?;

    println!("{}", output::heading("Applied migrations"));
    println!();

    if state.is_empty() {
        println!("  {}", "No migrations have been applied.".yellow());
        return Ok(());
    }

    for (i, entry) in state.applied.iter().enumerate() {
        let idx_display = format!("{:3}.", i + 1).bright_black();
        println!(
            "  {} {}",
            idx_display,
            output::migration_tag(entry.identifier, &entry.name)
        );
    }

    println!();
    println!("  {} migration(s) applied", state.len());

    Ok(())
}
