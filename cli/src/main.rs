//! restmigrate CLI - Main entry point
//!
//! This is the main binary for the restmigrate-cli tool.

use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use std::path::PathBuf;
use std::process::ExitCode;

use restmigrate_cli::config::{Config, GatewayArgs};
use restmigrate_cli::error::CliError;
use restmigrate_cli::{commands, logging};

/// restmigrate - Declarative migrations for REST-configured API gateways
#[derive(Parser, Debug)]
#[command(name = "restmigrate")]
#[command(author, version, about = "Declarative migrations for REST API gateways", long_about = None)]
struct Cli {
    /// Path to migrations directory
    #[arg(short, long, global = true, value_name = "DIR", default_value = ".")]
    path: PathBuf,

    /// Enable debug logging
    #[arg(long, global = true)]
    debug: bool,

    /// Path to config file (default: restmigrate.toml in the migrations directory, if present)
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

/// Gateway connection flags shared by `up` and `down`
#[derive(Args, Debug)]
struct GatewayFlags {
    /// Base URL for the API
    #[arg(short = 'u', long, env = "RESTMIGRATE_BASE_URL")]
    base_url: Option<String>,

    /// API key for authentication
    #[arg(short = 'k', long, env = "RESTMIGRATE_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// API gateway type (apisix, kong, generic) [default: generic]
    #[arg(short = 't', long = "type", env = "RESTMIGRATE_API_TYPE")]
    kind: Option<String>,

    /// Request timeout in seconds
    #[arg(long, env = "RESTMIGRATE_TIMEOUT", value_name = "SECS")]
    timeout: Option<u64>,
}

impl From<GatewayFlags> for GatewayArgs {
    fn from(flags: GatewayFlags) -> Self {
        Self {
            base_url: flags.base_url,
            api_key: flags.api_key,
            kind: flags.kind,
            timeout: flags.timeout,
        }
    }
}

/// CLI subcommands
#[derive(Subcommand, Debug)]
enum Command {
    /// Create a new migration
    #[command(visible_alias = "c")]
    Create {
        /// Migration name (letters, digits, '_' or '-')
        name: String,
    },

    /// Apply all pending migrations
    #[command(visible_alias = "u")]
    Up {
        #[command(flatten)]
        gateway: GatewayFlags,
    },

    /// Revert migration/s
    #[command(visible_aliases = ["d", "rollback"])]
    Down {
        /// Revert all applied migrations
        #[arg(long)]
        all: bool,

        #[command(flatten)]
        gateway: GatewayFlags,
    },

    /// List all applied migrations
    #[command(visible_alias = "l")]
    List,

    /// Show applied and pending migrations
    #[command(visible_alias = "s")]
    Status,
}

fn main() -> ExitCode {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    let result = tracing::subscriber::with_default(logging::subscriber(cli.debug), || run(cli));

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {}", "Error:".red().bold(), e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), CliError> {
    let path = cli.path.as_path();

    match cli.command {
        Command::Create { name } => commands::create::run(path, &name),
        Command::Up { gateway } => {
            let config = Config::discover(cli.config.as_deref(), path)?;
            commands::up::run(path, &config, &gateway.into())
        }
        Command::Down { all, gateway } => {
            let config = Config::discover(cli.config.as_deref(), path)?;
            commands::down::run(path, &config, &gateway.into(), all)
        }
        Command::List => commands::list::run(path),
        Command::Status => commands::status::run(path),
    }
}
