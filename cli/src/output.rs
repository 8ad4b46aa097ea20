//! CLI output helpers for consistent formatting.

use colored::Colorize;

pub fn heading(text: &str) -> String {
    format!("{}", text.bright_cyan())
}

pub fn label(text: &str) -> String {
    format!("{}", text.bright_blue())
}

pub fn muted(text: &str) -> String {
    format!("{}", text.bright_black())
}

pub fn success(text: &str) -> String {
    format!("{}", text.bright_green())
}

pub fn warning(text: &str) -> String {
    format!("{}", text.yellow())
}

pub fn warn_line(text: &str) -> String {
    format!("[{}] {}", "Warning".yellow(), text)
}

pub fn status_applied() -> String {
    format!("{}", "✓".green())
}

pub fn status_pending() -> String {
    format!("{}", "○".yellow())
}

pub fn status_orphaned() -> String {
    format!("{}", "✗".red())
}

/// "1718000000_add_routes" with the timestamp dimmed
pub fn migration_tag(identifier: i64, name: &str) -> String {
    format!("{} {}", muted(&identifier.to_string()), name)
}
