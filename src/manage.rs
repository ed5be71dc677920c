use anyhow::Result;
use colored::Colorize;

use crate::config::Settings;
use crate::docker::compose::{self, ComposeInfo};
use crate::templates::compose::TRAEFIK_CONTAINER;
use crate::test_page::{self, TestPageState};

/// Bail with a hint when setup has not been run yet
fn require_compose_file(settings: &Settings) -> Result<()> {
    let compose_file = settings.compose_file();
    if !compose_file.exists() {
        anyhow::bail!(
            "No Traefik compose file at {}. Run 'traefik-setup setup' first.",
            compose_file.display()
        );
    }
    Ok(())
}

/// "traefik (external), default"
fn network_summary(networks: &[String], external: &[String]) -> String {
    networks
        .iter()
        .map(|name| {
            if external.contains(name) {
                format!("{} (external)", name)
            } else {
                name.clone()
            }
        })
        .collect::<Vec<_>>()
        .join(", ")
}

/// Show Traefik status
pub fn status(settings: &Settings) -> Result<()> {
    require_compose_file(settings)?;
    let compose_file = settings.compose_file();

    println!("{}", "Traefik Status:".blue());
    println!();

    let info = ComposeInfo::parse(&compose_file)?;
    let service = info.services.get(TRAEFIK_CONTAINER);
    let container = service
        .and_then(|s| s.container_name.clone())
        .unwrap_or_else(|| TRAEFIK_CONTAINER.to_string());

    let running = compose::running_services(&compose_file)?;
    if running.contains(&container) {
        println!("  Status: {}", "Running".green());
    } else {
        println!("  Status: {}", "Not running".red());
    }

    let ports: Vec<String> = info.host_ports().iter().map(|p| p.to_string()).collect();
    println!("  Ports:   {}", ports.join(", "));
    if let Some(service) = service {
        println!("  Network: {}", network_summary(&service.networks, &info.external_networks));
    }
    println!("  Config:  {}", settings.paths.config_dir.display());
    println!("  Compose: {}", compose_file.display());

    let routes = service.map(|s| s.router_rules()).unwrap_or_default();
    if !routes.is_empty() {
        println!("  Routes:");
        for (router, rule) in &routes {
            println!("    {} {}", format!("{}:", router).bright_white(), rule);
        }
    }
    println!();

    match TestPageState::load(&settings.test_state_file())? {
        Some(state) => test_page::print_state(&state),
        None => println!("{} No test page is deployed", "ℹ".blue()),
    }

    Ok(())
}

/// Show Traefik logs
pub fn logs(settings: &Settings, follow: bool) -> Result<()> {
    require_compose_file(settings)?;
    compose::logs(&settings.compose_file(), follow)
}

/// Restart the Traefik stack
pub fn restart(settings: &Settings) -> Result<()> {
    require_compose_file(settings)?;

    println!("{}", "Restarting Traefik...".blue());
    compose::restart(&settings.compose_file())?;
    println!("{}", "✓ Traefik restarted".green());

    Ok(())
}

/// Stop and remove the Traefik stack
pub fn down(settings: &Settings) -> Result<()> {
    require_compose_file(settings)?;

    println!("{}", "Stopping Traefik...".blue());
    compose::down(&settings.compose_file())?;
    println!("{}", "✓ Traefik stopped".green());

    Ok(())
}
