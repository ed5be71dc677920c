//! `traefik-setup setup`
//!
//! One linear pass: check Docker, collect answers, write every file Traefik
//! mounts, create the network, start the stack, and optionally run the test
//! page until its removal deadline.

pub mod answers;

use std::fs;

use anyhow::{Context, Result};
use colored::Colorize;

use crate::auth;
use crate::certs::{self, write_private};
use crate::cli::SetupArgs;
use crate::config::Settings;
use crate::dns;
use crate::docker::{self, compose, network};
use crate::prompt::Prompt;
use crate::templates::{compose::traefik_compose, traefik};
use crate::test_page::{self, TestPageState};
use answers::{ChallengeType, SetupAnswers};

/// Write traefik.yml, dynamic.yml and docker-compose.yml
pub fn write_configuration(settings: &Settings, answers: &SetupAnswers) -> Result<()> {
    let static_file = settings.static_config_file();
    fs::write(
        &static_file,
        traefik::static_config(answers, &settings.traefik.network),
    )
    .context(format!("Failed to write {:?}", static_file))?;
    println!("{} Traefik configuration created", "✓".green());

    let dynamic_file = settings.dynamic_config_file();
    fs::write(&dynamic_file, traefik::dynamic_config(answers))
        .context(format!("Failed to write {:?}", dynamic_file))?;
    println!("{} Traefik dynamic configuration created", "✓".green());

    let compose_file = settings.compose_file();
    let content = traefik_compose(settings, answers);
    if answers.cloudflare.is_some() {
        // Holds the Cloudflare API token
        write_private(&compose_file, &content)?;
    } else {
        fs::write(&compose_file, content)
            .context(format!("Failed to write {:?}", compose_file))?;
    }
    println!("{} Docker Compose configuration created", "✓".green());

    Ok(())
}

/// Certificates and credentials the compose file mounts
fn prepare_secrets(settings: &Settings, answers: &SetupAnswers) -> Result<()> {
    match answers.challenge {
        ChallengeType::SelfSigned => {
            certs::generate_self_signed(settings, answers.common_name())?;
        }
        ChallengeType::Http | ChallengeType::Cloudflare => {
            certs::acme_storage(settings)?;
        }
    }

    if let Some(dashboard) = &answers.dashboard {
        let entry = auth::hash_entry(dashboard)?;
        auth::write_users_file(settings, &entry)?;
    }

    Ok(())
}

fn deploy_traefik(settings: &Settings) -> Result<()> {
    println!("{} Deploying Traefik...", "ℹ".blue());

    compose::up(&settings.compose_file()).context("Failed to deploy Traefik")?;

    println!("{} Traefik deployed successfully", "✓".green());
    Ok(())
}

/// Run the full setup
pub fn run(settings: &Settings, args: SetupArgs) -> Result<()> {
    println!("{} Starting Traefik automated setup...", "ℹ".blue());

    docker::check_installed()?;

    println!();
    println!("{}", "Traefik Setup Configuration".blue());
    println!("==================================");

    let mut prompt = Prompt::stdio();
    let Some(answers) = answers::collect(&mut prompt, &args, settings.test_page.ttl_secs)? else {
        return Ok(());
    };
    println!();

    for domain in [&answers.domain, &answers.test_domain].into_iter().flatten() {
        dns::check_resolution(domain);
    }

    if answers.dashboard.is_some() {
        auth::ensure_htpasswd()?;
    }

    settings.ensure_directories()?;
    println!("{} Directories created", "✓".green());

    prepare_secrets(settings, &answers)?;
    write_configuration(settings, &answers)?;

    network::ensure(&settings.traefik.network)?;
    deploy_traefik(settings)?;

    let test_page = match &answers.test_domain {
        Some(test_domain) => Some(test_page::deploy(settings, &answers, test_domain)?),
        None => None,
    };

    print_summary(settings, &answers, test_page.as_ref());
    println!("{} Setup complete!", "✓".green());

    if let Some(state) = test_page {
        if args.detach {
            println!();
            println!("Run this to remove the test page on schedule:");
            println!("  {}", "traefik-setup test-page remove".bright_white());
        } else {
            println!();
            test_page::wait_and_remove(settings, state.remove_at)?;
        }
    }

    Ok(())
}

fn print_summary(settings: &Settings, answers: &SetupAnswers, test_page: Option<&TestPageState>) {
    println!();
    println!("{}", "Summary:".blue());
    println!("--------");
    println!(
        "• Traefik configuration: {}/",
        settings.paths.config_dir.display()
    );
    println!(
        "• Docker Compose files: {}/",
        settings.paths.base_dir.display()
    );
    println!("• Docker network: {}", settings.traefik.network);
    println!("• Certificates: {}", answers.challenge.label());

    if answers.dashboard.is_some() {
        match &answers.domain {
            Some(domain) => println!("• Dashboard: https://{}/dashboard/", domain),
            None => println!("• Dashboard: https://<this host>/dashboard/"),
        }
    }
    println!();

    match test_page {
        Some(state) => {
            println!("Your test page is available at:");
            println!("  • https://{}", state.domain.bright_white());
            println!();
            println!("To remove the test page early:");
            println!(
                "  {}",
                "traefik-setup test-page remove --now".bright_white()
            );
        }
        None => {
            println!("No test domain provided - only Traefik is running.");
            println!("You can add services by:");
            println!("1. Adding them to the '{}' network", settings.traefik.network);
            println!("2. Setting appropriate Traefik labels");
        }
    }

    println!();
    println!("To manage Traefik:");
    println!(
        "  {}",
        "traefik-setup [status|logs|restart|down]".bright_white()
    );
    compose::print_manual_hint(&settings.compose_file(), "[logs|restart|down]");
    println!();
}
