//! CLI argument definitions using clap derive

use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Launchpad - browse and book seats on upcoming launches
///
/// Keeps a normalized client cache in sync with the launch API: paged
/// listings, a local cart, login and trip booking.
#[derive(Parser, Debug)]
#[command(name = "launchpad")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity (-v info, -vv debug)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    /// Configuration file path
    #[arg(short, long, global = true, env = "LAUNCHPAD_CONFIG")]
    pub config: Option<PathBuf>,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    pub log_json: bool,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List upcoming launches
    Launches(LaunchesArgs),

    /// Log in with an email address
    Login(LoginArgs),

    /// Forget the stored session
    Logout,

    /// Show session and configuration status
    Status,

    /// Book seats on one or more launches
    Book(BookArgs),

    /// Interactive session reading commands from stdin
    Shell,

    /// Show or initialize configuration
    Config(ConfigArgs),
}

/// Arguments for the launches command
#[derive(Parser, Debug)]
pub struct LaunchesArgs {
    /// Number of pages to load
    #[arg(short, long, default_value = "1", value_parser = clap::value_parser!(u32).range(1..))]
    pub pages: u32,

    /// Output format
    #[arg(short, long, default_value = "table")]
    pub format: OutputFormat,
}

/// Arguments for the login command
#[derive(Parser, Debug)]
pub struct LoginArgs {
    /// Email address to log in with
    pub email: String,
}

/// Arguments for the book command
#[derive(Parser, Debug)]
pub struct BookArgs {
    /// Launch IDs to book
    #[arg(required = true)]
    pub ids: Vec<String>,
}

/// Arguments for the config command
#[derive(Parser, Debug)]
pub struct ConfigArgs {
    /// Subcommand for config
    #[command(subcommand)]
    pub action: Option<ConfigAction>,
}

/// Config subcommands
#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Show configuration file path
    Path,

    /// Initialize default configuration
    Init {
        /// Overwrite existing configuration
        #[arg(short, long)]
        force: bool,
    },
}

/// Output format for listings
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable table
    Table,
    /// JSON output
    Json,
    /// Simple text (one per line)
    Plain,
}
