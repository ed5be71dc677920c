use std::{
    env, fs,
    path::{Path, PathBuf},
    sync::LazyLock,
};

use anyhow::{Context, Result, bail};
use chrono::TimeDelta;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Environment variable pointing at an explicit configuration file
pub const CONFIG_ENV: &str = "TRAEFIK_SETUP_CONFIG";

/// Container-side locations; these are fixed by the compose file we generate.
pub const CONTAINER_CONFIG_DIR: &str = "/etc/traefik";
pub const CONTAINER_CERTS_DIR: &str = "/etc/traefik/certs";

/// Docker network names; also safe as bare YAML keys and list entries
static NETWORK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9][A-Za-z0-9_.-]*$").unwrap());

/// Locate the configuration file.
/// Checks TRAEFIK_SETUP_CONFIG first, then the user config directory.
/// Returns None when no file exists and built-in defaults apply.
pub fn find_config_file() -> Option<PathBuf> {
    if let Ok(custom) = env::var(CONFIG_ENV) {
        return Some(PathBuf::from(custom));
    }

    let candidate = dirs::config_dir()?.join("traefik-setup").join("config.toml");
    candidate.exists().then_some(candidate)
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct Settings {
    #[serde(default)]
    pub paths: PathSettings,
    #[serde(default)]
    pub traefik: TraefikSettings,
    #[serde(default)]
    pub test_page: TestPageSettings,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct PathSettings {
    /// Holds docker-compose.yml and the test page state
    pub base_dir: PathBuf,
    /// Holds traefik.yml, dynamic.yml and the usersfile
    pub config_dir: PathBuf,
    /// Holds acme.json and the self-signed pair
    pub certs_dir: PathBuf,
    pub test_page_dir: PathBuf,
}

impl Default for PathSettings {
    fn default() -> Self {
        Self {
            base_dir: PathBuf::from("/opt/traefik"),
            config_dir: PathBuf::from("/etc/traefik"),
            certs_dir: PathBuf::from("/etc/traefik/certs"),
            test_page_dir: PathBuf::from("/tmp/traefik_test_page"),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct TraefikSettings {
    pub image: String,
    /// External Docker network shared by Traefik and routed services
    pub network: String,
}

impl Default for TraefikSettings {
    fn default() -> Self {
        Self {
            image: "traefik:v3.4".to_string(),
            network: "traefik".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct TestPageSettings {
    pub image: String,
    /// Seconds the test page stays up before removal
    pub ttl_secs: u64,
}

impl Default for TestPageSettings {
    fn default() -> Self {
        Self {
            image: "nginx:latest".to_string(),
            ttl_secs: 600,
        }
    }
}

impl Settings {
    /// Load settings from the configuration file, or defaults if there is none
    pub fn load() -> Result<Self> {
        match find_config_file() {
            Some(path) => Self::load_from_path(&path),
            None => Ok(Self::default()),
        }
    }

    pub fn load_from_path(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read configuration: {:?}", path))?;

        Self::from_toml(&content).with_context(|| format!("Invalid configuration in {:?}", path))
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let settings: Self = toml::from_str(content).context("Failed to parse configuration")?;
        settings.validate()?;

        Ok(settings)
    }

    /// Reject values that would break generated files or deadline arithmetic
    pub fn validate(&self) -> Result<()> {
        let network = &self.traefik.network;
        if !NETWORK_RE.is_match(network) {
            bail!(
                "Invalid traefik.network {:?}: use letters, digits, '_', '.' or '-'",
                network
            );
        }

        let ttl = self.test_page.ttl_secs;
        if i64::try_from(ttl).ok().and_then(TimeDelta::try_seconds).is_none() {
            bail!("test_page.ttl_secs {} is out of range", ttl);
        }

        Ok(())
    }

    pub fn to_toml(&self) -> Result<String> {
        toml::to_string(self).context("Failed to serialize configuration")
    }

    pub fn static_config_file(&self) -> PathBuf {
        self.paths.config_dir.join("traefik.yml")
    }

    pub fn dynamic_config_file(&self) -> PathBuf {
        self.paths.config_dir.join("dynamic.yml")
    }

    pub fn users_file(&self) -> PathBuf {
        self.paths.config_dir.join("usersfile")
    }

    pub fn compose_file(&self) -> PathBuf {
        self.paths.base_dir.join("docker-compose.yml")
    }

    pub fn acme_file(&self) -> PathBuf {
        self.paths.certs_dir.join("acme.json")
    }

    pub fn cert_file(&self) -> PathBuf {
        self.paths.certs_dir.join("selfsigned.crt")
    }

    pub fn key_file(&self) -> PathBuf {
        self.paths.certs_dir.join("selfsigned.key")
    }

    pub fn test_compose_file(&self) -> PathBuf {
        self.paths.test_page_dir.join("docker-compose-test.yml")
    }

    /// Web root served by the test page; the compose file stays outside it
    pub fn test_html_dir(&self) -> PathBuf {
        self.paths.test_page_dir.join("html")
    }

    pub fn test_state_file(&self) -> PathBuf {
        self.paths.base_dir.join("test-page.json")
    }

    /// Create the base, config and certs directories
    pub fn ensure_directories(&self) -> Result<()> {
        let dirs = [
            &self.paths.base_dir,
            &self.paths.config_dir,
            &self.paths.certs_dir,
        ];

        for dir in dirs {
            fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create directory: {:?}", dir))?;
        }

        Ok(())
    }
}

#[cfg(test)]
pub(crate) fn settings_in(root: &Path) -> Settings {
    Settings {
        paths: PathSettings {
            base_dir: root.join("opt"),
            config_dir: root.join("etc"),
            certs_dir: root.join("etc/certs"),
            test_page_dir: root.join("test-page"),
        },
        ..Settings::default()
    }
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    #[test]
    fn test_empty_config_uses_defaults() {
        let settings = Settings::from_toml("").unwrap();

        assert_eq!(settings.paths.base_dir, PathBuf::from("/opt/traefik"));
        assert_eq!(settings.traefik.network, "traefik");
        assert_eq!(settings.test_page.ttl_secs, 600);
        assert_eq!(
            settings.compose_file(),
            PathBuf::from("/opt/traefik/docker-compose.yml")
        );
        assert_eq!(
            settings.acme_file(),
            PathBuf::from("/etc/traefik/certs/acme.json")
        );
    }

    #[test]
    fn test_partial_config_keeps_other_defaults() {
        let settings = Settings::from_toml(
            r#"
[paths]
base_dir = "/srv/proxy"

[test_page]
ttl_secs = 60
"#,
        )
        .unwrap();

        assert_eq!(settings.paths.base_dir, PathBuf::from("/srv/proxy"));
        assert_eq!(settings.paths.config_dir, PathBuf::from("/etc/traefik"));
        assert_eq!(settings.test_page.ttl_secs, 60);
        assert_eq!(settings.test_page.image, "nginx:latest");
        assert_eq!(settings.traefik.image, "traefik:v3.4");
    }

    #[test]
    fn test_unknown_key_is_rejected() {
        let result = Settings::from_toml(
            r#"
[traefik]
dashboard_port = 8080
"#,
        );

        assert!(result.is_err());
    }

    #[test]
    fn test_invalid_network_is_rejected() {
        for network in ["bad net", "a:b", "-x", "", "x\ny"] {
            let content = format!("[traefik]\nnetwork = {:?}\n", network);
            let err = Settings::from_toml(&content).unwrap_err();
            assert!(err.to_string().contains("traefik.network"), "{}", network);
        }

        let settings = Settings::from_toml("[traefik]\nnetwork = \"proxy_net-1.a\"\n").unwrap();
        assert_eq!(settings.traefik.network, "proxy_net-1.a");
    }

    #[test]
    fn test_huge_ttl_is_rejected() {
        // fits in i64, too large for a TimeDelta
        let err = Settings::from_toml("[test_page]\nttl_secs = 10000000000000000\n").unwrap_err();
        assert!(err.to_string().contains("out of range"));

        assert!(Settings::from_toml("[test_page]\nttl_secs = 0\n").is_ok());
    }

    #[test]
    fn test_to_toml_round_trips_through_parser() {
        let mut settings = Settings::default();
        settings.traefik.network = "edge".to_string();

        let parsed = Settings::from_toml(&settings.to_toml().unwrap()).unwrap();
        assert_eq!(parsed.traefik.network, "edge");
    }

    #[test]
    fn test_ensure_directories_creates_tree() {
        let dir = TempDir::new().unwrap();
        let settings = settings_in(dir.path());

        settings.ensure_directories().unwrap();

        assert!(settings.paths.base_dir.is_dir());
        assert!(settings.paths.config_dir.is_dir());
        assert!(settings.paths.certs_dir.is_dir());
        assert!(!settings.paths.test_page_dir.exists());
    }

    #[test]
    fn test_load_from_path_reports_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[paths]\nnope = 1\n").unwrap();

        let err = Settings::load_from_path(&path).unwrap_err();
        assert!(format!("{:#}", err).contains("config.toml"));
    }
}
