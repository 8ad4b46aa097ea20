//! Version and file-name constants shared by the engine and the CLI
//!
//! All on-disk names are centralized here for maintainability.

/// Version of the running tool, stamped into the ledger
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Ledger file name, relative to the migrations directory
pub const STATE_FILE: &str = "restmigrate.state";

/// Optional configuration file name, looked up in the migrations directory
pub const CONFIG_FILE: &str = "restmigrate.toml";

/// File extensions the directory source treats as migration files
pub const MIGRATION_EXTENSIONS: &[&str] = &["toml", "json"];

/// Check whether a file name is reserved by the tool and must not be read as a migration
pub fn is_reserved_file(name: &str) -> bool {
    name == STATE_FILE || name == CONFIG_FILE
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reserved_files() {
        assert!(is_reserved_file("restmigrate.state"));
        assert!(is_reserved_file("restmigrate.toml"));
        assert!(!is_reserved_file("20240101_000000_routes.toml"));
    }
}
