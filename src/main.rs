//! claude-usage-bar - CLI entry point
//!
//! `cub` prints claude.ai plan usage for a status bar, either once per
//! invocation (`status`, `refresh`) or continuously (`daemon`).

mod commands;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use claude_usage_bar::config::{default, loader::ConfigLoader, schema::Config, xdg};
use claude_usage_bar::daemon::{logging, run_daemon};

use commands::{run_clear_credentials_command, run_setup_credentials_command, run_status_command};

/// Claude usage for your status bar
#[derive(Parser)]
#[command(name = "cub")]
#[command(version, about = "Claude plan usage for your status bar")]
struct Cli {
    /// Configuration file (defaults to the XDG config path)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Available subcommands for the cub CLI
#[derive(Subcommand)]
enum Commands {
    /// Print the current usage once, reusing a fresh cached result
    Status,

    /// Clear the cache, fetch, and print the usage once
    Refresh,

    /// Interactively store the session key and organization ID
    SetupCredentials,

    /// Delete stored credentials
    ClearCredentials,

    /// Keep refreshing on a timer, printing one line per update
    Daemon,

    /// Manage configuration file
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Actions for the `config` subcommand.
#[derive(Subcommand)]
enum ConfigAction {
    /// Create default configuration file
    Init {
        /// Overwrite existing configuration (creates backup)
        #[arg(long)]
        force: bool,
    },
    /// Show configuration file path
    Path,
    /// Validate configuration file
    Validate,
}

/// Load the config, initialize logging, then run `command`.
fn with_config(path: Option<&PathBuf>, command: impl FnOnce(&Config) -> ExitCode) -> ExitCode {
    let loaded = match path {
        Some(path) => ConfigLoader::load_from_path(path),
        None => ConfigLoader::load_default(),
    };
    match loaded {
        Ok(config) => {
            logging::init(config.daemon.log_level);
            command(&config)
        }
        Err(e) => {
            eprintln!("Config error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run_daemon_command(config: &Config, path: Option<&PathBuf>) -> ExitCode {
    if let Err(e) = run_daemon(config.clone(), path.cloned()) {
        eprintln!("Daemon error: {}", e);
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}

fn run_config_command(action: ConfigAction, path: Option<&PathBuf>) -> ExitCode {
    let result = match action {
        ConfigAction::Init { force } => {
            let created = match path {
                Some(path) => default::create_default_config_at(path, force).map(|_| path.clone()),
                None => default::create_default_config(force),
            };
            created.map(|path| println!("Created configuration at {}", path.display()))
        }
        ConfigAction::Path => {
            let shown = path.cloned().unwrap_or_else(xdg::config_path);
            println!("{}", shown.display());
            Ok(())
        }
        ConfigAction::Validate => {
            let loaded = match path {
                Some(path) => ConfigLoader::load_from_path(path),
                None => ConfigLoader::load_default(),
            };
            loaded.and_then(|config| {
                config.usage.try_refresh_interval()?;
                println!("Configuration is valid");
                println!("{config:#?}");
                Ok(())
            })
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Config error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let path = cli.config.as_ref();

    match cli.command {
        Commands::Status => with_config(path, |config| run_status_command(config, false)),
        Commands::Refresh => with_config(path, |config| run_status_command(config, true)),
        Commands::SetupCredentials => with_config(path, run_setup_credentials_command),
        Commands::ClearCredentials => with_config(path, run_clear_credentials_command),
        Commands::Daemon => with_config(path, |config| run_daemon_command(config, path)),
        Commands::Config { action } => run_config_command(action, path),
    }
}
