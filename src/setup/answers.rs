//! Setup answers
//!
//! Everything the operator decides during `setup`, collected from command-line
//! flags first and interactive prompts for whatever is still missing.

use std::io::{BufRead, Write};
use std::sync::LazyLock;

use anyhow::{Result, bail};
use clap::ValueEnum;
use colored::Colorize;
use regex::Regex;

use crate::cli::SetupArgs;
use crate::prompt::Prompt;

static EMAIL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^@\s]+@[A-Za-z0-9-]+(\.[A-Za-z0-9-]+)*\.[A-Za-z]{2,}$").unwrap());

static DOMAIN_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([A-Za-z0-9]([A-Za-z0-9-]{0,61}[A-Za-z0-9])?\.)+[A-Za-z]{2,63}$").unwrap()
});

/// How Traefik obtains certificates
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ChallengeType {
    /// Let's Encrypt, HTTP-01 challenge on port 80
    Http,
    /// Let's Encrypt, DNS-01 challenge through Cloudflare
    Cloudflare,
    /// Self-signed certificate generated with OpenSSL
    SelfSigned,
}

impl ChallengeType {
    pub const MENU: [&'static str; 3] = [
        "Let's Encrypt (HTTP challenge)",
        "Let's Encrypt (Cloudflare DNS challenge)",
        "Self-signed certificate (OpenSSL)",
    ];

    pub fn from_menu_index(idx: usize) -> Option<Self> {
        match idx {
            0 => Some(Self::Http),
            1 => Some(Self::Cloudflare),
            2 => Some(Self::SelfSigned),
            _ => None,
        }
    }

    pub fn uses_acme(self) -> bool {
        !matches!(self, Self::SelfSigned)
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Http => "http",
            Self::Cloudflare => "cloudflare",
            Self::SelfSigned => "self-signed",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CloudflareCredentials {
    pub email: String,
    pub api_token: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DashboardAuth {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetupAnswers {
    pub challenge: ChallengeType,
    pub domain: Option<String>,
    pub email: Option<String>,
    pub cloudflare: Option<CloudflareCredentials>,
    pub dashboard: Option<DashboardAuth>,
    pub test_domain: Option<String>,
}

impl SetupAnswers {
    /// Name the self-signed certificate is issued for
    pub fn common_name(&self) -> &str {
        self.domain.as_deref().unwrap_or("localhost")
    }
}

pub fn validate_email(email: &str) -> Result<()> {
    if !EMAIL_RE.is_match(email) {
        bail!("'{}' is not a valid email address", email);
    }
    Ok(())
}

pub fn validate_domain(domain: &str) -> Result<()> {
    if domain.len() > 253 || !DOMAIN_RE.is_match(domain) {
        bail!("'{}' is not a valid domain name", domain);
    }
    Ok(())
}

/// Collect answers. Returns `None` when the operator cancels.
///
/// With `args.yes` set, optional questions are skipped instead of asked and
/// confirmations are answered yes.
pub fn collect<R: BufRead, W: Write>(
    prompt: &mut Prompt<R, W>,
    args: &SetupArgs,
    ttl_secs: u64,
) -> Result<Option<SetupAnswers>> {
    let interactive = !args.yes;

    let challenge = match args.resolver {
        Some(challenge) => challenge,
        None if interactive => {
            let idx = prompt.choose("Certificate resolver", &ChallengeType::MENU, 0)?;
            ChallengeType::from_menu_index(idx).unwrap_or(ChallengeType::Http)
        }
        None => ChallengeType::Http,
    };

    let domain = match &args.domain {
        Some(domain) => Some(domain.clone()),
        None if interactive => prompt.ask("Enter your domain (e.g., proxy.yourdomain.com)")?,
        None => None,
    };
    if let Some(domain) = &domain {
        validate_domain(domain)?;
    }
    if challenge.uses_acme() && domain.is_none() {
        bail!(
            "A domain is required for the {} challenge",
            challenge.label()
        );
    }

    let email = if challenge.uses_acme() {
        match &args.email {
            Some(email) => Some(email.clone()),
            None if interactive => prompt.ask("Enter your email for Let's Encrypt (optional)")?,
            None => None,
        }
    } else {
        None
    };
    if let Some(email) = &email {
        validate_email(email)?;
    }

    let cloudflare = if challenge == ChallengeType::Cloudflare {
        let email = match &args.cf_email {
            Some(email) => email.clone(),
            None if interactive => prompt.ask_required("Cloudflare account email")?,
            None => bail!("--cf-email is required for the cloudflare resolver"),
        };
        validate_email(&email)?;

        let api_token = match &args.cf_token {
            Some(token) => token.clone(),
            None if interactive => prompt.ask_required("Cloudflare DNS API token")?,
            None => bail!("--cf-token is required for the cloudflare resolver"),
        };

        Some(CloudflareCredentials { email, api_token })
    } else {
        None
    };

    let dashboard_user = match &args.dashboard_user {
        Some(user) => Some(user.clone()),
        None if interactive => prompt.ask("Dashboard username (empty to disable the dashboard)")?,
        None => None,
    };
    let dashboard = match dashboard_user {
        Some(username) => {
            if username.contains(':') {
                bail!("Dashboard username must not contain ':'");
            }
            let password = match &args.dashboard_password {
                Some(password) => password.clone(),
                None if interactive => prompt.ask_required("Dashboard password")?,
                None => bail!("--dashboard-password is required with --dashboard-user"),
            };
            Some(DashboardAuth { username, password })
        }
        None => None,
    };

    let test_domain = match &args.test_domain {
        Some(domain) => Some(domain.clone()),
        None if interactive => {
            prompt.ask("Enter test domain/subdomain (optional, e.g., test.yourdomain.com)")?
        }
        None => None,
    };
    if let Some(test_domain) = &test_domain {
        validate_domain(test_domain)?;

        if interactive {
            let minutes = ttl_secs.div_ceil(60);
            let question = format!(
                "Test page will auto-remove after {} minutes. Continue?",
                minutes
            );
            if !prompt.confirm(&question, false)? {
                prompt.println(&format!("{} Setup cancelled.", "ℹ".blue()))?;
                return Ok(None);
            }
        }
    }

    Ok(Some(SetupAnswers {
        challenge,
        domain,
        email,
        cloudflare,
        dashboard,
        test_domain,
    }))
}

#[cfg(test)]
pub(crate) fn http_answers(domain: &str) -> SetupAnswers {
    SetupAnswers {
        challenge: ChallengeType::Http,
        domain: Some(domain.to_string()),
        email: Some("ops@example.org".to_string()),
        cloudflare: None,
        dashboard: None,
        test_domain: None,
    }
}
