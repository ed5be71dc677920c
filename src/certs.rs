//! TLS material
//!
//! Self-signed certificates are generated with the `openssl` CLI; the ACME
//! modes only need an empty, owner-only `acme.json` that Traefik fills in.

use std::{fs, path::Path, process::Command};

use anyhow::{Context, Result};
use colored::Colorize;

use crate::config::Settings;

/// Write a file readable only by its owner
pub fn write_private(path: &Path, content: &str) -> Result<()> {
    fs::write(path, content).context(format!("Failed to write {:?}", path))?;
    restrict_permissions(path)
}

#[cfg(unix)]
fn restrict_permissions(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;

    fs::set_permissions(path, fs::Permissions::from_mode(0o600))
        .context(format!("Failed to set permissions on {:?}", path))
}

#[cfg(not(unix))]
fn restrict_permissions(_path: &Path) -> Result<()> {
    Ok(())
}

/// Arguments for a one-year self-signed RSA certificate
pub fn openssl_args(common_name: &str, key_file: &Path, cert_file: &Path) -> Vec<String> {
    vec![
        "req".to_string(),
        "-x509".to_string(),
        "-nodes".to_string(),
        "-newkey".to_string(),
        "rsa:2048".to_string(),
        "-days".to_string(),
        "365".to_string(),
        "-keyout".to_string(),
        key_file.display().to_string(),
        "-out".to_string(),
        cert_file.display().to_string(),
        "-subj".to_string(),
        format!("/CN={}", common_name),
        "-addext".to_string(),
        format!("subjectAltName=DNS:{}", common_name),
    ]
}

/// Generate the self-signed certificate pair unless both files already exist
pub fn generate_self_signed(settings: &Settings, common_name: &str) -> Result<()> {
    let cert_file = settings.cert_file();
    let key_file = settings.key_file();

    if cert_file.exists() && key_file.exists() {
        println!(
            "{} Keeping existing certificate {}",
            "ℹ".blue(),
            cert_file.display()
        );
        return Ok(());
    }

    println!(
        "{} Generating self-signed certificate for {}...",
        "ℹ".blue(),
        common_name.bright_white()
    );

    let output = Command::new("openssl")
        .args(openssl_args(common_name, &key_file, &cert_file))
        .output()
        .context("Failed to run openssl. Make sure OpenSSL is installed.")?;

    if !output.status.success() {
        anyhow::bail!(
            "Failed to generate certificate: {}",
            String::from_utf8_lossy(&output.stderr).trim()
        );
    }

    restrict_permissions(&key_file)?;

    println!("{} Certificate generated", "✓".green());
    println!("  Certificate: {}", cert_file.display());
    println!("  Private Key: {}", key_file.display());

    Ok(())
}

/// Create an empty acme.json with owner-only permissions if it is missing
pub fn acme_storage(settings: &Settings) -> Result<()> {
    let acme_file = settings.acme_file();

    if acme_file.exists() {
        // Traefik refuses to use ACME storage readable by others
        return restrict_permissions(&acme_file);
    }

    write_private(&acme_file, "")?;
    println!("{} Created {}", "✓".green(), acme_file.display());

    Ok(())
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;
    use crate::config::settings_in;

    #[test]
    fn test_openssl_args() {
        let args = openssl_args(
            "proxy.example.com",
            Path::new("/c/selfsigned.key"),
            Path::new("/c/selfsigned.crt"),
        );

        assert_eq!(args[0], "req");
        assert!(args.contains(&"/CN=proxy.example.com".to_string()));
        assert!(args.contains(&"subjectAltName=DNS:proxy.example.com".to_string()));

        let keyout = args.iter().position(|a| a == "-keyout").unwrap();
        assert_eq!(args[keyout + 1], "/c/selfsigned.key");
    }

    #[test]
    fn test_existing_pair_is_kept() {
        let dir = TempDir::new().unwrap();
        let settings = settings_in(dir.path());
        settings.ensure_directories().unwrap();
        fs::write(settings.cert_file(), "CERT").unwrap();
        fs::write(settings.key_file(), "KEY").unwrap();

        // Does not spawn openssl when both files are present
        generate_self_signed(&settings, "localhost").unwrap();

        assert_eq!(fs::read_to_string(settings.cert_file()).unwrap(), "CERT");
    }

    #[test]
    fn test_acme_storage_keeps_content() {
        let dir = TempDir::new().unwrap();
        let settings = settings_in(dir.path());
        settings.ensure_directories().unwrap();

        acme_storage(&settings).unwrap();
        assert_eq!(fs::read_to_string(settings.acme_file()).unwrap(), "");

        fs::write(settings.acme_file(), "{\"letsencrypt\":{}}").unwrap();
        acme_storage(&settings).unwrap();
        assert_eq!(
            fs::read_to_string(settings.acme_file()).unwrap(),
            "{\"letsencrypt\":{}}"
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_write_private_mode() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        let path = dir.path().join("secret");

        write_private(&path, "x").unwrap();

        let mode = fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }
}
