//! Create command implementation
//!
//! Writes a new, empty migration file stamped with the current time.

use std::path::Path;

use colored::Colorize;
use restmigrate_migrations::MigrationWriter;

use crate::error::CliError;
use crate::output;

/// Run the create command
pub fn run(path: &Path, name: &str) -> Result<(), CliError> {
    let file = MigrationWriter::new(path).create(name)?;

    println!(
        "{} {}",
        "Created migration".bright_green(),
        file.display()
    );
    println!();
    println!(
        "  {}",
        output::muted("Add [[migrations.up]] and [[migrations.down]] actions, then run 'restmigrate up'.")
    );

    Ok(())
}
