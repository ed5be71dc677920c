//! Docker operations module
//!
//! This module contains functionality for interacting with Docker:
//! - installation and daemon checks
//! - docker compose invocation and compose file inspection
//! - Network management

pub mod compose;
pub mod network;

use std::process::Command;

use anyhow::{Result, bail};
use colored::Colorize;

/// Run a command to completion with captured output, reporting only success
pub(crate) fn succeeds(program: &str, args: &[&str]) -> bool {
    Command::new(program)
        .args(args)
        .output()
        .map(|output| output.status.success())
        .unwrap_or(false)
}

/// Check that Docker is installed and the daemon is reachable
pub fn check_installed() -> Result<()> {
    println!("{} Checking Docker installation...", "ℹ".blue());

    if !succeeds("docker", &["--version"]) {
        bail!("Docker is not installed. Please install Docker first.");
    }

    if !succeeds("docker", &["info"]) {
        bail!("Docker daemon is not running. Please start Docker first.");
    }

    println!("{} Docker is installed and running", "✓".green());
    Ok(())
}
