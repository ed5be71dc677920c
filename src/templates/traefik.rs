//! Traefik static and dynamic configuration

use super::{RESOLVER_NAME, yaml_quote};
use crate::config::{CONTAINER_CERTS_DIR, CONTAINER_CONFIG_DIR};
use crate::setup::answers::{ChallengeType, SetupAnswers};

/// Used when the operator gives no ACME email
pub const FALLBACK_ACME_EMAIL: &str = "admin@example.com";

/// Middleware defined in the dynamic configuration and applied to routed services
pub const SECURE_HEADERS_MIDDLEWARE: &str = "secure-headers@file";

/// Generate traefik.yml
pub fn static_config(answers: &SetupAnswers, network: &str) -> String {
    let mut content = String::from("# Traefik static configuration, generated by traefik-setup\n");

    content.push_str(
        r#"global:
  checkNewVersion: false
  sendAnonymousUsage: false

log:
  level: INFO

api:
  dashboard: true
  insecure: false

entryPoints:
  web:
    address: ":80"
    http:
      redirections:
        entryPoint:
          to: websecure
          scheme: https
  websecure:
    address: ":443"
"#,
    );

    content.push_str(&format!(
        r#"
providers:
  docker:
    endpoint: "unix:///var/run/docker.sock"
    exposedByDefault: false
    network: {}
  file:
    filename: {}/dynamic.yml
    watch: true
"#,
        yaml_quote(network),
        CONTAINER_CONFIG_DIR
    ));

    if answers.challenge.uses_acme() {
        let email = answers.email.as_deref().unwrap_or(FALLBACK_ACME_EMAIL);

        content.push_str(&format!(
            r#"
certificatesResolvers:
  {}:
    acme:
      email: {}
      storage: {}/acme.json
"#,
            RESOLVER_NAME,
            yaml_quote(email),
            CONTAINER_CERTS_DIR
        ));

        match answers.challenge {
            ChallengeType::Http => content.push_str(
                r#"      httpChallenge:
        entryPoint: web
"#,
            ),
            ChallengeType::Cloudflare => content.push_str(
                r#"      dnsChallenge:
        provider: cloudflare
        resolvers:
          - "1.1.1.1:53"
          - "1.0.0.1:53"
"#,
            ),
            ChallengeType::SelfSigned => {}
        }
    }

    content
}

/// Generate dynamic.yml
pub fn dynamic_config(answers: &SetupAnswers) -> String {
    let mut content = String::from("# Traefik dynamic configuration, generated by traefik-setup\n");

    content.push_str(
        r#"http:
  middlewares:
    secure-headers:
      headers:
        stsSeconds: 31536000
        stsIncludeSubdomains: true
        frameDeny: true
        contentTypeNosniff: true
        browserXssFilter: true
        referrerPolicy: "strict-origin-when-cross-origin"
"#,
    );

    if answers.challenge == ChallengeType::SelfSigned {
        let cert = format!("{}/selfsigned.crt", CONTAINER_CERTS_DIR);
        let key = format!("{}/selfsigned.key", CONTAINER_CERTS_DIR);

        content.push_str(&format!(
            r#"
tls:
  certificates:
    - certFile: {cert}
      keyFile: {key}
  stores:
    default:
      defaultCertificate:
        certFile: {cert}
        keyFile: {key}
"#
        ));
    }

    content
}

#[cfg(test)]
mod tests {
    use serde_yaml::Value;

    use super::*;
    use crate::setup::answers::{CloudflareCredentials, http_answers};

    fn parse(content: &str) -> Value {
        serde_yaml::from_str(content).unwrap()
    }

    #[test]
    fn test_http_challenge() {
        let yaml = parse(&static_config(&http_answers("proxy.example.com"), "traefik"));

        let acme = &yaml["certificatesResolvers"]["letsencrypt"]["acme"];
        assert_eq!(acme["email"].as_str(), Some("ops@example.org"));
        assert_eq!(
            acme["storage"].as_str(),
            Some("/etc/traefik/certs/acme.json")
        );
        assert_eq!(acme["httpChallenge"]["entryPoint"].as_str(), Some("web"));
        assert!(acme.get("dnsChallenge").is_none());

        assert_eq!(
            yaml["entryPoints"]["web"]["http"]["redirections"]["entryPoint"]["to"].as_str(),
            Some("websecure")
        );
        assert_eq!(
            yaml["providers"]["docker"]["exposedByDefault"].as_bool(),
            Some(false)
        );
        assert_eq!(yaml["api"]["insecure"].as_bool(), Some(false));
    }

    #[test]
    fn test_missing_email_falls_back() {
        let mut answers = http_answers("proxy.example.com");
        answers.email = None;

        let yaml = parse(&static_config(&answers, "traefik"));
        assert_eq!(
            yaml["certificatesResolvers"]["letsencrypt"]["acme"]["email"].as_str(),
            Some(FALLBACK_ACME_EMAIL)
        );
    }

    #[test]
    fn test_cloudflare_challenge() {
        let mut answers = http_answers("proxy.example.com");
        answers.challenge = ChallengeType::Cloudflare;
        answers.cloudflare = Some(CloudflareCredentials {
            email: "cf@example.com".to_string(),
            api_token: "token".to_string(),
        });

        let yaml = parse(&static_config(&answers, "traefik"));
        let acme = &yaml["certificatesResolvers"]["letsencrypt"]["acme"];

        assert_eq!(acme["dnsChallenge"]["provider"].as_str(), Some("cloudflare"));
        assert_eq!(
            acme["dnsChallenge"]["resolvers"][0].as_str(),
            Some("1.1.1.1:53")
        );
        assert!(acme.get("httpChallenge").is_none());
    }

    #[test]
    fn test_self_signed_has_no_resolver() {
        let mut answers = http_answers("proxy.example.com");
        answers.challenge = ChallengeType::SelfSigned;

        let yaml = parse(&static_config(&answers, "edge"));
        assert!(yaml.get("certificatesResolvers").is_none());
        assert_eq!(yaml["providers"]["docker"]["network"].as_str(), Some("edge"));

        let dynamic = parse(&dynamic_config(&answers));
        assert_eq!(
            dynamic["tls"]["certificates"][0]["certFile"].as_str(),
            Some("/etc/traefik/certs/selfsigned.crt")
        );
        assert_eq!(
            dynamic["tls"]["stores"]["default"]["defaultCertificate"]["keyFile"].as_str(),
            Some("/etc/traefik/certs/selfsigned.key")
        );
    }

    #[test]
    fn test_acme_dynamic_config_has_only_middlewares() {
        let dynamic = parse(&dynamic_config(&http_answers("proxy.example.com")));

        assert!(dynamic.get("tls").is_none());
        assert_eq!(
            dynamic["http"]["middlewares"]["secure-headers"]["headers"]["frameDeny"].as_bool(),
            Some(true)
        );
    }
}
