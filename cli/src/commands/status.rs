//! Status command implementation
//!
//! Shows migration status (applied vs pending).

use std::path::Path;

use colored::Colorize;
use restmigrate_migrations::{DirectorySource, StateStore, VERSION, status};

use crate::error::CliError;
use crate::output;

/// Run the status command
pub fn run(path: &Path) -> Result<(), CliError> {
    println!("{}", output::heading("Migration Status"));
    println!();

    let report = status(
        &DirectorySource::new(path),
        &StateStore::new(path, VERSION),
    )?;

    if report.migrations.is_empty() && report.orphaned.is_empty() {
        println!("  {}", "No migrations found.".yellow());
        println!("  Run 'restmigrate create <name>' to create your first migration.");
        return Ok(());
    }

    for (i, migration) in report.migrations.iter().enumerate() {
        let status_icon = if migration.applied {
            output::status_applied()
        } else {
            output::status_pending()
        };
        let idx_display = format!("{:3}.", i + 1).bright_black();

        println!(
            "  {} {} {}",
            idx_display,
            status_icon,
            output::migration_tag(migration.identifier, &migration.name)
        );
    }

    if !report.orphaned.is_empty() {
        println!();
        println!(
            "  {}",
            output::warn_line("Applied migrations without a migration file:")
        );
        for entry in &report.orphaned {
            println!(
                "      {} {}",
                output::status_orphaned(),
                output::migration_tag(entry.identifier, &entry.name)
            );
        }
    }

    let applied = report.applied().count();
    let pending = report.pending().count();

    println!();
    println!(
        "  {} applied, {}",
        applied.to_string().green(),
        if pending == 0 {
            output::success("up to date")
        } else {
            output::warning(&format!("{pending} pending"))
        }
    );

    Ok(())
}
