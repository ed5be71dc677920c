//! Docker Compose invocation and file inspection
//!
//! Runs `docker compose -f <file> ...` for the generated stacks, and parses
//! compose files to find the host paths they bind-mount so a stack is never
//! started before everything it references is on disk.

use std::{
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
    process::Command,
};

use anyhow::{Context, Result};
use colored::Colorize;
use serde_yaml::Value;

/// Information extracted from a docker-compose.yml file
#[derive(Debug, Clone)]
pub struct ComposeInfo {
    /// Service name -> ServiceInfo
    pub services: BTreeMap<String, ServiceInfo>,
    /// Networks declared as external
    pub external_networks: Vec<String>,
}

/// Information about a single service
#[derive(Debug, Clone)]
pub struct ServiceInfo {
    pub container_name: Option<String>,
    /// Host ports published ("80:80" -> 80)
    pub host_ports: Vec<u16>,
    /// Absolute host paths mounted into the container
    pub bind_sources: Vec<PathBuf>,
    pub networks: Vec<String>,
    /// `key=value` labels, from either list or map syntax
    pub labels: Vec<String>,
}

impl ServiceInfo {
    /// Router name -> rule, from `traefik.http.routers.<name>.rule` labels
    pub fn router_rules(&self) -> BTreeMap<String, String> {
        self.labels
            .iter()
            .filter_map(|label| {
                let (key, rule) = label.split_once('=')?;
                let router = key
                    .strip_prefix("traefik.http.routers.")?
                    .strip_suffix(".rule")?;
                Some((router.to_string(), rule.to_string()))
            })
            .collect()
    }
}

impl ComposeInfo {
    /// Parse a docker-compose.yml file
    pub fn parse(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .context(format!("Failed to read docker-compose file: {:?}", path))?;

        Self::parse_str(&content)
    }

    pub fn parse_str(content: &str) -> Result<Self> {
        let yaml: Value =
            serde_yaml::from_str(content).context("Failed to parse docker-compose YAML")?;

        let mut services = BTreeMap::new();

        if let Some(services_map) = yaml.get("services").and_then(|v| v.as_mapping()) {
            for (service_name, service_config) in services_map {
                let name = service_name
                    .as_str()
                    .context("Service name is not a string")?
                    .to_string();

                let container_name = service_config
                    .get("container_name")
                    .and_then(|v| v.as_str())
                    .map(|s| s.to_string());

                services.insert(
                    name,
                    ServiceInfo {
                        container_name,
                        host_ports: Self::parse_ports(service_config),
                        bind_sources: Self::parse_bind_sources(service_config),
                        networks: Self::parse_networks(service_config),
                        labels: Self::parse_labels(service_config),
                    },
                );
            }
        }

        let mut external_networks = Vec::new();
        if let Some(networks) = yaml.get("networks").and_then(|v| v.as_mapping()) {
            for (key, config) in networks {
                let external = config
                    .get("external")
                    .and_then(|v| v.as_bool())
                    .unwrap_or(false);
                if !external {
                    continue;
                }
                // `name:` overrides the key as the real network name
                let name = config
                    .get("name")
                    .and_then(|v| v.as_str())
                    .or_else(|| key.as_str());
                if let Some(name) = name {
                    external_networks.push(name.to_string());
                }
            }
        }

        Ok(Self {
            services,
            external_networks,
        })
    }

    fn parse_ports(service_config: &Value) -> Vec<u16> {
        let mut host_ports = Vec::new();

        if let Some(ports) = service_config.get("ports").and_then(|v| v.as_sequence()) {
            for port_entry in ports {
                if let Some(port_str) = port_entry.as_str() {
                    let parts: Vec<&str> = port_str.split(':').collect();
                    // "host:container" or "ip:host:container"
                    let host = match parts.len() {
                        2 => parts[0],
                        3 => parts[1],
                        _ => continue,
                    };
                    if let Ok(port) = host.parse::<u16>() {
                        host_ports.push(port);
                    }
                } else if let Some(published) = port_entry.get("published") {
                    if let Some(port) = published.as_u64() {
                        host_ports.push(port as u16);
                    } else if let Some(port) = published.as_str().and_then(|s| s.parse().ok()) {
                        host_ports.push(port);
                    }
                }
            }
        }

        host_ports
    }

    fn parse_bind_sources(service_config: &Value) -> Vec<PathBuf> {
        let mut sources = Vec::new();

        if let Some(volumes) = service_config.get("volumes").and_then(|v| v.as_sequence()) {
            for volume in volumes {
                let source = if let Some(spec) = volume.as_str() {
                    spec.split(':').next()
                } else {
                    // Long syntax: only `type: bind` has a host path
                    let is_bind = volume.get("type").and_then(|v| v.as_str()) == Some("bind");
                    volume
                        .get("source")
                        .and_then(|v| v.as_str())
                        .filter(|_| is_bind)
                };

                // Relative sources and named volumes are not host paths we manage
                if let Some(source) = source.filter(|s| s.starts_with('/')) {
                    sources.push(PathBuf::from(source));
                }
            }
        }

        sources
    }

    /// Parse networks from a service configuration
    fn parse_networks(service_config: &Value) -> Vec<String> {
        let mut networks = Vec::new();

        if let Some(networks_value) = service_config.get("networks") {
            if let Some(networks_seq) = networks_value.as_sequence() {
                for network in networks_seq {
                    if let Some(network_str) = network.as_str() {
                        networks.push(network_str.to_string());
                    }
                }
            } else if let Some(networks_map) = networks_value.as_mapping() {
                for (network_name, _) in networks_map {
                    if let Some(network_str) = network_name.as_str() {
                        networks.push(network_str.to_string());
                    }
                }
            }
        }

        networks
    }

    fn parse_labels(service_config: &Value) -> Vec<String> {
        match service_config.get("labels") {
            Some(Value::Sequence(seq)) => seq
                .iter()
                .filter_map(|v| v.as_str().map(|s| s.to_string()))
                .collect(),
            Some(Value::Mapping(map)) => map
                .iter()
                .filter_map(|(k, v)| Some(format!("{}={}", k.as_str()?, v.as_str()?)))
                .collect(),
            _ => Vec::new(),
        }
    }

    /// All host ports published by any service
    pub fn host_ports(&self) -> Vec<u16> {
        let mut ports: Vec<u16> = self
            .services
            .values()
            .flat_map(|s| s.host_ports.iter().copied())
            .collect();
        ports.sort();
        ports.dedup();
        ports
    }
}

/// Host paths a compose file bind-mounts that do not exist yet
pub fn missing_bind_sources(path: &Path) -> Result<Vec<PathBuf>> {
    let info = ComposeInfo::parse(path)?;

    let mut missing: Vec<PathBuf> = info
        .services
        .values()
        .flat_map(|s| s.bind_sources.iter())
        .filter(|source| !source.exists())
        .cloned()
        .collect();
    missing.sort();
    missing.dedup();

    Ok(missing)
}

fn compose_command(file: &Path) -> Command {
    let mut cmd = Command::new("docker");
    cmd.arg("compose").arg("-f").arg(file);
    cmd
}

/// Run `docker compose ... <args>` with captured output, failing with its stderr
fn run_captured(file: &Path, args: &[&str]) -> Result<()> {
    let output = compose_command(file)
        .args(args)
        .output()
        .context("Failed to run docker compose")?;

    if !output.status.success() {
        anyhow::bail!(
            "docker compose {} failed for {}: {}",
            args.join(" "),
            file.display(),
            String::from_utf8_lossy(&output.stderr).trim()
        );
    }

    Ok(())
}

/// Start a stack in the background after checking its bind mounts exist
pub fn up(file: &Path) -> Result<()> {
    let missing = missing_bind_sources(file)?;
    if !missing.is_empty() {
        let list: Vec<String> = missing.iter().map(|p| p.display().to_string()).collect();
        anyhow::bail!(
            "Refusing to start {}: missing host paths {}",
            file.display(),
            list.join(", ")
        );
    }

    run_captured(file, &["up", "-d"])
}

pub fn down(file: &Path) -> Result<()> {
    run_captured(file, &["down"])
}

pub fn restart(file: &Path) -> Result<()> {
    run_captured(file, &["restart"])
}

/// Stream logs to the terminal
pub fn logs(file: &Path, follow: bool) -> Result<()> {
    let mut cmd = compose_command(file);
    cmd.arg("logs");
    if follow {
        cmd.arg("-f");
    }

    let status = cmd.status().context("Failed to show logs")?;
    if !status.success() {
        anyhow::bail!("Failed to show logs for {}", file.display());
    }

    Ok(())
}

/// Names of running containers in a stack
pub fn running_services(file: &Path) -> Result<Vec<String>> {
    let output = compose_command(file)
        .args(["ps", "--status", "running", "--format", "{{.Name}}"])
        .output()
        .context("Failed to query docker compose status")?;

    if !output.status.success() {
        anyhow::bail!(
            "Failed to query status of {}: {}",
            file.display(),
            String::from_utf8_lossy(&output.stderr).trim()
        );
    }

    Ok(String::from_utf8_lossy(&output.stdout)
        .lines()
        .map(|l| l.trim().to_string())
        .filter(|l| !l.is_empty())
        .collect())
}

/// Print the `docker compose` invocation an operator can run by hand
pub fn print_manual_hint(file: &Path, action: &str) {
    println!(
        "  {}",
        format!("docker compose -f {} {}", file.display(), action).bright_white()
    );
}
