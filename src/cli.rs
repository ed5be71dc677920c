//! CLI command definitions for traefik-setup
//!
//! This module contains all the clap-based command definitions and argument parsing.

use clap::{Args, Parser, Subcommand};

use crate::setup::answers::ChallengeType;

#[derive(Parser)]
#[command(name = "traefik-setup")]
#[command(about = "Provision a Traefik reverse proxy on this host", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Write configuration, generate certificates and start Traefik
    Setup(SetupArgs),
    /// Show Traefik status and any pending test page removal
    Status,
    /// Show Traefik logs
    Logs {
        /// Follow log output
        #[arg(short, long)]
        follow: bool,
    },
    /// Restart the Traefik stack
    Restart,
    /// Stop and remove the Traefik stack
    Down,
    /// Manage the temporary test page
    TestPage {
        #[command(subcommand)]
        subcommand: TestPageCommands,
    },
    /// Print the effective configuration
    Config,
}

/// Values that would otherwise be asked for interactively
#[derive(Args, Debug, Default, Clone)]
pub struct SetupArgs {
    /// Email used for Let's Encrypt registration
    #[arg(long)]
    pub email: Option<String>,
    /// Domain served by Traefik (also used for the dashboard)
    #[arg(long)]
    pub domain: Option<String>,
    /// Certificate resolver
    #[arg(long, value_enum)]
    pub resolver: Option<ChallengeType>,
    /// Cloudflare account email (cloudflare resolver only)
    #[arg(long)]
    pub cf_email: Option<String>,
    /// Cloudflare DNS API token (cloudflare resolver only)
    #[arg(long)]
    pub cf_token: Option<String>,
    /// Dashboard basic auth user
    #[arg(long)]
    pub dashboard_user: Option<String>,
    /// Dashboard basic auth password
    #[arg(long)]
    pub dashboard_password: Option<String>,
    /// Domain for a temporary nginx test page
    #[arg(long)]
    pub test_domain: Option<String>,
    /// Answer yes to confirmations
    #[arg(short, long)]
    pub yes: bool,
    /// Do not wait in the foreground to remove the test page
    #[arg(long)]
    pub detach: bool,
}

#[derive(Subcommand)]
pub enum TestPageCommands {
    /// Remove the test page, optionally after a delay
    Remove {
        /// Seconds to wait before removing (defaults to the recorded deadline)
        #[arg(long, value_name = "SECS", conflicts_with = "now")]
        after: Option<u64>,
        /// Remove immediately
        #[arg(long)]
        now: bool,
    },
    /// Show the deployed test page and its removal deadline
    Status,
}
