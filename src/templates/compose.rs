//! Docker Compose file generator
//!
//! Renders the Traefik stack and the temporary nginx test page.

use std::path::Path;

use super::traefik::SECURE_HEADERS_MIDDLEWARE;
use super::{RESOLVER_NAME, yaml_quote};
use crate::config::{CONTAINER_CERTS_DIR, CONTAINER_CONFIG_DIR, Settings};
use crate::setup::answers::{ChallengeType, SetupAnswers};

pub const TRAEFIK_CONTAINER: &str = "traefik";
pub const TEST_PAGE_CONTAINER: &str = "nginx-test";

fn volume_line(host: &Path, container: &str, options: Option<&str>) -> String {
    let spec = match options {
        Some(options) => format!("{}:{}:{}", host.display(), container, options),
        None => format!("{}:{}", host.display(), container),
    };
    format!("      - {}\n", yaml_quote(&spec))
}

fn label_line(label: &str) -> String {
    format!("      - {}\n", yaml_quote(label))
}

/// Router labels for a service reachable on websecure
fn router_labels(router: &str, rule: &str, challenge: ChallengeType) -> Vec<String> {
    let mut labels = vec![
        format!("traefik.http.routers.{}.rule={}", router, rule),
        format!("traefik.http.routers.{}.entrypoints=websecure", router),
        format!("traefik.http.routers.{}.tls=true", router),
    ];

    if challenge.uses_acme() {
        labels.push(format!(
            "traefik.http.routers.{}.tls.certresolver={}",
            router, RESOLVER_NAME
        ));
    }

    labels
}

fn networks_section(network: &str) -> String {
    format!(
        "\nnetworks:\n  {}:\n    external: true\n    name: {}\n",
        network,
        yaml_quote(network)
    )
}

/// Generate docker-compose.yml for Traefik
pub fn traefik_compose(settings: &Settings, answers: &SetupAnswers) -> String {
    let network = &settings.traefik.network;

    let mut content = String::from("# Generated by traefik-setup\n");
    content.push_str("services:\n");
    content.push_str(&format!("  {}:\n", TRAEFIK_CONTAINER));
    content.push_str(&format!("    image: {}\n", yaml_quote(&settings.traefik.image)));
    content.push_str(&format!("    container_name: {}\n", TRAEFIK_CONTAINER));
    content.push_str("    restart: unless-stopped\n");
    content.push_str("    security_opt:\n");
    content.push_str("      - no-new-privileges:true\n");

    content.push_str("    networks:\n");
    content.push_str(&format!("      - {}\n", network));

    content.push_str("    ports:\n");
    content.push_str("      - \"80:80\"\n");
    content.push_str("      - \"443:443\"\n");

    match (answers.challenge, &answers.cloudflare) {
        (ChallengeType::Cloudflare, Some(cloudflare)) => {
            content.push_str("    environment:\n");
            content.push_str(&format!(
                "      CF_API_EMAIL: {}\n",
                yaml_quote(&cloudflare.email)
            ));
            content.push_str(&format!(
                "      CF_DNS_API_TOKEN: {}\n",
                yaml_quote(&cloudflare.api_token)
            ));
        }
        // Certificates come from the mounted certs directory or the HTTP challenge
        _ => {}
    }

    content.push_str("    volumes:\n");
    content.push_str(&volume_line(
        Path::new("/var/run/docker.sock"),
        "/var/run/docker.sock",
        Some("ro"),
    ));
    content.push_str(&volume_line(
        &settings.static_config_file(),
        &format!("{}/traefik.yml", CONTAINER_CONFIG_DIR),
        Some("ro"),
    ));
    content.push_str(&volume_line(
        &settings.dynamic_config_file(),
        &format!("{}/dynamic.yml", CONTAINER_CONFIG_DIR),
        Some("ro"),
    ));
    content.push_str(&volume_line(
        &settings.paths.certs_dir,
        CONTAINER_CERTS_DIR,
        None,
    ));

    if answers.dashboard.is_some() {
        let users_file = format!("{}/usersfile", CONTAINER_CONFIG_DIR);
        content.push_str(&volume_line(&settings.users_file(), &users_file, Some("ro")));

        let rule = match &answers.domain {
            Some(domain) => format!("Host(`{}`)", domain),
            None => "PathPrefix(`/api`) || PathPrefix(`/dashboard`)".to_string(),
        };

        let mut labels = vec!["traefik.enable=true".to_string()];
        labels.extend(router_labels("dashboard", &rule, answers.challenge));
        labels.push("traefik.http.routers.dashboard.service=api@internal".to_string());
        labels.push(format!(
            "traefik.http.routers.dashboard.middlewares=dashboard-auth,{}",
            SECURE_HEADERS_MIDDLEWARE
        ));
        labels.push(format!(
            "traefik.http.middlewares.dashboard-auth.basicauth.usersfile={}",
            users_file
        ));

        content.push_str("    labels:\n");
        for label in &labels {
            content.push_str(&label_line(label));
        }
    }

    content.push_str(&networks_section(network));
    content
}

/// Generate the compose file for the nginx test page.
/// `html_dir` must be absolute; it is bind-mounted as the nginx web root.
pub fn test_page_compose(
    settings: &Settings,
    answers: &SetupAnswers,
    test_domain: &str,
    html_dir: &Path,
) -> String {
    let network = &settings.traefik.network;

    let mut content = String::from("# Generated by traefik-setup\n");
    content.push_str("services:\n");
    content.push_str(&format!("  {}:\n", TEST_PAGE_CONTAINER));
    content.push_str(&format!(
        "    image: {}\n",
        yaml_quote(&settings.test_page.image)
    ));
    content.push_str(&format!("    container_name: {}\n", TEST_PAGE_CONTAINER));
    content.push_str("    restart: \"no\"\n");
    content.push_str("    networks:\n");
    content.push_str(&format!("      - {}\n", network));
    content.push_str("    volumes:\n");
    content.push_str(&volume_line(html_dir, "/usr/share/nginx/html", Some("ro")));

    let mut labels = vec!["traefik.enable=true".to_string()];
    labels.extend(router_labels(
        TEST_PAGE_CONTAINER,
        &format!("Host(`{}`)", test_domain),
        answers.challenge,
    ));
    labels.push(format!(
        "traefik.http.routers.{}.middlewares={}",
        TEST_PAGE_CONTAINER, SECURE_HEADERS_MIDDLEWARE
    ));

    content.push_str("    labels:\n");
    for label in &labels {
        content.push_str(&label_line(label));
    }

    content.push_str(&networks_section(network));
    content
}

fn html_escape(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            c => escaped.push(c),
        }
    }
    escaped
}

/// index.html served by the test page
pub fn test_page_html(test_domain: &str) -> String {
    let domain = html_escape(test_domain);
    format!(
        r#"<!DOCTYPE html>
<html>
<head><meta charset="utf-8"><title>Traefik test page</title></head>
<body>
<h1>Traefik + Nginx Test Page</h1>
<p>Domain: {}</p>
</body>
</html>
"#,
        domain
    )
}
