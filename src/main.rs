//! traefik-setup - Traefik reverse proxy provisioning CLI
//!
//! Writes the Traefik static and dynamic configuration, generates TLS and
//! dashboard credentials, creates the shared Docker network and starts the
//! stack with Docker Compose. An optional nginx test page can be deployed and
//! removed again on a timer the operator can watch and interrupt.

use anyhow::Result;
use clap::Parser;

mod auth;
mod certs;
mod cli;
mod config;
mod dns;
mod docker;
mod manage;
mod prompt;
mod setup;
mod templates;
mod test_page;

use cli::{Cli, Commands, TestPageCommands};
use config::Settings;

fn main() -> Result<()> {
    let cli = Cli::parse();
    let settings = Settings::load()?;

    match cli.command {
        Commands::Setup(args) => {
            setup::run(&settings, args)?;
        }
        Commands::Status => {
            manage::status(&settings)?;
        }
        Commands::Logs { follow } => {
            manage::logs(&settings, follow)?;
        }
        Commands::Restart => {
            manage::restart(&settings)?;
        }
        Commands::Down => {
            manage::down(&settings)?;
        }
        Commands::TestPage { subcommand } => match subcommand {
            TestPageCommands::Remove { after, now } => {
                test_page::remove_command(&settings, after, now)?;
            }
            TestPageCommands::Status => {
                test_page::status(&settings)?;
            }
        },
        Commands::Config => {
            print!("{}", settings.to_toml()?);
        }
    }

    Ok(())
}
