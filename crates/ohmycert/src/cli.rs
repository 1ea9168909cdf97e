//! CLI argument parsing with clap

use camino::Utf8PathBuf;
use clap::{Args, Parser, Subcommand};

/// ohmycert - sync TLS certificates from object storage into Traefik
#[derive(Parser, Debug)]
#[command(name = "ohmycert")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Increase verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Path to ohmycert.yaml config file
    #[arg(short, long, global = true, env = "OHMYCERT_CONFIG")]
    pub config: Option<Utf8PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Download changed certificates and update the proxy config
    Sync(SyncArgs),

    /// Show recorded ETags and deployed files
    Status(StatusArgs),

    /// Configuration management
    #[command(subcommand)]
    Config(ConfigCommands),
}

#[derive(Args, Debug)]
pub struct SyncArgs {
    /// Check for changes and print the fragment without writing anything
    #[arg(long)]
    pub dry_run: bool,

    /// Exit with an error if any certificate could not be synced
    #[arg(long)]
    pub strict: bool,
}

#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

// Config commands
#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Write a starter ohmycert.yaml
    Init(ConfigInitArgs),

    /// Validate the configuration
    Validate,

    /// Show resolved configuration
    Show,
}

#[derive(Args, Debug)]
pub struct ConfigInitArgs {
    /// Output file path
    #[arg(short, long, default_value = "ohmycert.yaml")]
    pub output: Utf8PathBuf,

    /// Overwrite existing file
    #[arg(short, long)]
    pub force: bool,
}
