//! Dashboard basic auth credentials
//!
//! Entries are hashed with the `htpasswd` tool (bcrypt) and written to the
//! usersfile Traefik's basicauth middleware reads.

use std::{
    io::Write,
    process::{Command, Stdio},
};

use anyhow::{Context, Result, bail};
use colored::Colorize;

use crate::certs::write_private;
use crate::config::Settings;
use crate::setup::answers::DashboardAuth;

/// Fail unless the `htpasswd` binary can be executed
pub fn ensure_htpasswd() -> Result<()> {
    // `htpasswd` with no arguments prints usage and exits non-zero; only a
    // spawn failure means it is missing.
    let found = Command::new("htpasswd")
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .is_ok();

    if !found {
        bail!(
            "htpasswd is not installed. Install apache2-utils (Debian/Ubuntu) or httpd-tools (RHEL/Fedora) first."
        );
    }

    Ok(())
}

/// Check that `htpasswd -niB` output is a single `user:hash` line for `username`
pub fn parse_entry(stdout: &str, username: &str) -> Result<String> {
    let entry = stdout
        .lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .context("htpasswd produced no output")?;

    match entry.split_once(':') {
        Some((user, hash)) if user == username && !hash.is_empty() => Ok(entry.to_string()),
        _ => bail!("Unexpected htpasswd output"),
    }
}

/// Arguments for a bcrypt hash printed to stdout, password read from stdin
pub fn htpasswd_args(username: &str) -> Vec<String> {
    vec!["-niB".to_string(), username.to_string()]
}

/// Hash the credentials into a usersfile line.
/// The password goes through stdin so it never shows up in the process list.
pub fn hash_entry(auth: &DashboardAuth) -> Result<String> {
    let mut child = Command::new("htpasswd")
        .args(htpasswd_args(&auth.username))
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .context("Failed to run htpasswd")?;

    if let Some(mut stdin) = child.stdin.take() {
        stdin
            .write_all(format!("{}\n", auth.password).as_bytes())
            .context("Failed to pass password to htpasswd")?;
        drop(stdin);
    }

    let output = child
        .wait_with_output()
        .context("Failed to wait for htpasswd")?;

    if !output.status.success() {
        bail!(
            "htpasswd failed: {}",
            String::from_utf8_lossy(&output.stderr).trim()
        );
    }

    parse_entry(&String::from_utf8_lossy(&output.stdout), &auth.username)
}

pub fn write_users_file(settings: &Settings, entry: &str) -> Result<()> {
    let path = settings.users_file();
    write_private(&path, &format!("{}\n", entry))?;

    println!(
        "{} Dashboard credentials written to {}",
        "✓".green(),
        path.display()
    );
    Ok(())
}
