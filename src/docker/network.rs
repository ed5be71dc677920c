use std::process::Command;

use anyhow::{Context, Result};
use colored::Colorize;

/// Whether `docker network ls --format {{.Name}}` output lists `name` exactly
pub fn network_listed(ls_output: &str, name: &str) -> bool {
    ls_output.lines().any(|line| line.trim() == name)
}

/// Create the Docker network if it does not exist yet
pub fn ensure(name: &str) -> Result<()> {
    println!("{} Setting up Docker network...", "ℹ".blue());

    let output = Command::new("docker")
        .args(["network", "ls", "--format", "{{.Name}}"])
        .output()
        .context("Failed to list networks")?;

    if !output.status.success() {
        anyhow::bail!(
            "Failed to list networks: {}",
            String::from_utf8_lossy(&output.stderr).trim()
        );
    }

    if network_listed(&String::from_utf8_lossy(&output.stdout), name) {
        println!(
            "{} Docker network {} already exists",
            "⚠".yellow(),
            name.bright_white()
        );
        return Ok(());
    }

    let output = Command::new("docker")
        .args(["network", "create", name])
        .output()
        .context("Failed to create network")?;

    if !output.status.success() {
        anyhow::bail!(
            "Failed to create network {}: {}",
            name,
            String::from_utf8_lossy(&output.stderr).trim()
        );
    }

    println!(
        "{} Docker network {} created",
        "✓".green(),
        name.bright_white()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_network_listed_exact_match() {
        let output = "bridge\nhost\ntraefik-old\nnone\n";

        assert!(!network_listed(output, "traefik"));
        assert!(network_listed(output, "traefik-old"));
        assert!(network_listed("traefik\n", "traefik"));
    }

    #[test]
    fn test_network_listed_empty_output() {
        assert!(!network_listed("", "traefik"));
    }
}
