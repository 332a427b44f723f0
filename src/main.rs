//! Launchpad - launch browsing and trip booking client
//!
//! CLI entry point that dispatches to subcommands.

use clap::Parser;
use console::style;
use launchpad::cli::{Cli, Commands};
use launchpad::config::ConfigManager;
use launchpad::error::LaunchpadResult;
use std::process::ExitCode;
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {}", style("Error:").red().bold(), e);
            if let Some(hint) = e.hint() {
                eprintln!("{} {}", style("Hint:").yellow(), hint);
            }
            ExitCode::FAILURE
        }
    }
}

async fn run() -> LaunchpadResult<()> {
    let cli = Cli::parse();

    // 0 = warn, 1 = info, 2+ = debug
    let filter = match cli.verbose {
        0 => EnvFilter::new("launchpad=warn"),
        1 => EnvFilter::new("launchpad=info"),
        _ => EnvFilter::new("launchpad=debug"),
    };

    // Logs go to stderr so listings stay pipeable
    if cli.log_json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_target(false)
            .without_time()
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .without_time()
            .with_writer(std::io::stderr)
            .init();
    }

    let config_manager = match cli.config {
        Some(ref path) => ConfigManager::with_path(path.clone()),
        None => ConfigManager::new(),
    };
    debug!("Using config {}", config_manager.path().display());

    let config = config_manager.load().await?;

    match cli.command {
        Commands::Launches(args) => launchpad::cli::commands::launches(args, &config).await,
        Commands::Login(args) => launchpad::cli::commands::login(args, &config).await,
        Commands::Logout => launchpad::cli::commands::logout(&config).await,
        Commands::Status => launchpad::cli::commands::status(&config_manager, &config).await,
        Commands::Book(args) => launchpad::cli::commands::book(args, &config).await,
        Commands::Shell => launchpad::cli::commands::shell(&config).await,
        Commands::Config(args) => {
            launchpad::cli::commands::config(args, &config_manager, &config).await
        }
    }
}
