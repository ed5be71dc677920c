//! DNS sanity check
//!
//! Best effort only: looks up this host's public IPv4 address and the
//! domain's A records and warns when they disagree. Nothing here aborts setup.

use std::process::Command;

use colored::Colorize;

const PUBLIC_IP_URL: &str = "https://api.ipify.org";

/// This host's public IPv4 address, if it can be determined
pub fn public_ip() -> Option<String> {
    let output = Command::new("curl")
        .args(["-4s", "--max-time", "10", PUBLIC_IP_URL])
        .output()
        .ok()?;

    if !output.status.success() {
        return None;
    }

    let ip = String::from_utf8_lossy(&output.stdout).trim().to_string();
    is_ipv4(&ip).then_some(ip)
}

fn is_ipv4(candidate: &str) -> bool {
    candidate.parse::<std::net::Ipv4Addr>().is_ok()
}

/// Addresses from the answer section of `nslookup` output.
/// The first `Address:` line belongs to the resolver and is skipped.
pub fn resolved_addresses(nslookup_stdout: &str) -> Vec<String> {
    let mut in_answer = false;
    let mut addresses = Vec::new();

    for line in nslookup_stdout.lines() {
        let line = line.trim();

        if line.starts_with("Name:") {
            in_answer = true;
            continue;
        }

        if !in_answer {
            continue;
        }

        if let Some(address) = line.strip_prefix("Address:") {
            // "Address: 1.2.3.4" or "Address: 1.2.3.4#53"
            let address = address.trim().split('#').next().unwrap_or("").trim();
            if !address.is_empty() {
                addresses.push(address.to_string());
            }
        }
    }

    addresses
}

/// Warn about how `domain` should resolve and whether it currently does
pub fn check_resolution(domain: &str) {
    println!(
        "{} Checking DNS resolution for {}...",
        "ℹ".blue(),
        domain.bright_white()
    );

    let server_ip = public_ip();
    match &server_ip {
        Some(ip) => {
            println!(
                "{} Make sure {} DNS A record points to: {}",
                "⚠".yellow(),
                domain,
                ip.bright_white()
            );
            println!(
                "{} If DNS is not configured, the domain won't be reachable",
                "⚠".yellow()
            );
        }
        None => println!(
            "{} Could not determine server IP. Please ensure {} points to this server.",
            "⚠".yellow(),
            domain
        ),
    }

    let output = match Command::new("nslookup").arg(domain).output() {
        Ok(output) => output,
        Err(_) => {
            println!(
                "{} nslookup is not available, skipping DNS lookup",
                "⚠".yellow()
            );
            return;
        }
    };

    if !output.status.success() {
        println!("{} DNS lookup failed for {}", "⚠".yellow(), domain);
        return;
    }

    let addresses = resolved_addresses(&String::from_utf8_lossy(&output.stdout));
    println!("{} DNS lookup successful for {}", "✓".green(), domain);

    if let Some(ip) = &server_ip {
        if !addresses.is_empty() && !addresses.contains(ip) {
            println!(
                "{} {} resolves to {} but this server is {}",
                "⚠".yellow(),
                domain,
                addresses.join(", "),
                ip
            );
        }
    }
}
