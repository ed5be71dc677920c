//! Temporary nginx test page
//!
//! The page is deployed next to Traefik to prove routing and certificates
//! work, then removed on a deadline. Removal is run by a foreground process
//! the operator can watch and interrupt; the deadline itself is recorded in a
//! JSON state file so `test-page status` and a later `test-page remove` can
//! pick it up.

use std::{
    fs,
    path::{Path, PathBuf},
    thread,
    time::Duration,
};

use anyhow::{Context, Result, bail};
use chrono::{DateTime, Local, TimeDelta, Utc};
use colored::Colorize;
use serde::{Deserialize, Serialize};

use crate::config::Settings;
use crate::docker::compose;
use crate::setup::answers::SetupAnswers;
use crate::templates::compose::{test_page_compose, test_page_html};

/// Longest single sleep while waiting, so progress is reported regularly
const TICK: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestPageState {
    pub domain: String,
    pub compose_file: PathBuf,
    /// Directory holding the compose file and the served `html/` root
    pub page_dir: PathBuf,
    pub deployed_at: DateTime<Utc>,
    pub remove_at: DateTime<Utc>,
}

impl TestPageState {
    /// Load the recorded state; `None` when no test page is deployed
    pub fn load(path: &Path) -> Result<Option<Self>> {
        if !path.exists() {
            return Ok(None);
        }

        let content = fs::read_to_string(path).context("Failed to read test page state")?;
        let state = serde_json::from_str(&content).context("Failed to parse test page state")?;

        Ok(Some(state))
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let content =
            serde_json::to_string_pretty(self).context("Failed to serialize test page state")?;
        fs::write(path, content).context("Failed to write test page state")?;

        Ok(())
    }

    pub fn remaining(&self, now: DateTime<Utc>) -> TimeDelta {
        self.remove_at - now
    }
}

/// "9m 05s", "42s"; zero or negative durations render as "0s"
pub fn format_remaining(remaining: TimeDelta) -> String {
    let secs = remaining.num_seconds().max(0);
    let (minutes, seconds) = (secs / 60, secs % 60);

    if minutes > 0 {
        format!("{}m {:02}s", minutes, seconds)
    } else {
        format!("{}s", seconds)
    }
}

/// `from` plus `secs`, failing instead of wrapping or panicking on huge values
pub fn deadline_after(from: DateTime<Utc>, secs: u64) -> Result<DateTime<Utc>> {
    let Some(deadline) = i64::try_from(secs)
        .ok()
        .and_then(TimeDelta::try_seconds)
        .and_then(|delay| from.checked_add_signed(delay))
    else {
        bail!("A delay of {} seconds is out of range", secs);
    };

    Ok(deadline)
}

fn local_clock(at: DateTime<Utc>) -> String {
    at.with_timezone(&Local).format("%H:%M:%S").to_string()
}

/// Write index.html into `html/` and the compose file next to it, so the
/// compose file is not part of the served web root. Returns the absolute page dir.
pub fn write_page_files(
    settings: &Settings,
    answers: &SetupAnswers,
    test_domain: &str,
) -> Result<PathBuf> {
    let page_dir = std::path::absolute(&settings.paths.test_page_dir)
        .context("Failed to resolve test page directory")?;
    let html_dir = std::path::absolute(settings.test_html_dir())
        .context("Failed to resolve test page directory")?;
    fs::create_dir_all(&html_dir)
        .context(format!("Failed to create directory: {:?}", html_dir))?;

    fs::write(html_dir.join("index.html"), test_page_html(test_domain))
        .context("Failed to write test page index.html")?;

    fs::write(
        settings.test_compose_file(),
        test_page_compose(settings, answers, test_domain, &html_dir),
    )
    .context("Failed to write test page compose file")?;

    println!(
        "{} Nginx test service configuration created",
        "✓".green()
    );

    Ok(page_dir)
}

/// Write the page, start it, and record when it should be removed
pub fn deploy(
    settings: &Settings,
    answers: &SetupAnswers,
    test_domain: &str,
) -> Result<TestPageState> {
    let ttl_secs = settings.test_page.ttl_secs;
    // Checked before anything is started
    let now = Utc::now();
    let remove_in = deadline_after(now, ttl_secs)? - now;

    println!(
        "{} Deploying test page (will auto-remove in {})...",
        "ℹ".blue(),
        format_remaining(remove_in)
    );

    let page_dir = write_page_files(settings, answers, test_domain)?;
    let compose_file = settings.test_compose_file();

    compose::up(&compose_file)?;

    let deployed_at = Utc::now();
    let state = TestPageState {
        domain: test_domain.to_string(),
        compose_file,
        page_dir,
        deployed_at,
        remove_at: deadline_after(deployed_at, ttl_secs)?,
    };
    state.save(&settings.test_state_file())?;

    println!(
        "{} Test page deployed at {}",
        "✓".green(),
        format!("https://{}", test_domain).bright_white()
    );

    Ok(state)
}

/// Stop the page and delete its files and state
pub fn remove(settings: &Settings) -> Result<()> {
    let state_file = settings.test_state_file();
    let state = TestPageState::load(&state_file)?;

    let (compose_file, page_dir) = match &state {
        Some(state) => (state.compose_file.clone(), state.page_dir.clone()),
        None => (
            settings.test_compose_file(),
            settings.paths.test_page_dir.clone(),
        ),
    };

    if state.is_none() && !compose_file.exists() {
        println!("{} No test page is deployed", "ℹ".blue());
        return Ok(());
    }

    println!("{} Removing test page...", "ℹ".blue());

    if compose_file.exists() {
        compose::down(&compose_file)?;
    }

    if page_dir.exists() {
        fs::remove_dir_all(&page_dir)
            .context(format!("Failed to remove directory: {:?}", page_dir))?;
    }

    if state_file.exists() {
        fs::remove_file(&state_file).context("Failed to remove test page state")?;
    }

    println!("{} Test page removed", "✓".green());
    Ok(())
}

/// Block until `deadline`, reporting progress, then remove the page.
/// Interrupting the process leaves the page running.
pub fn wait_and_remove(settings: &Settings, deadline: DateTime<Utc>) -> Result<()> {
    println!(
        "{} Test page will be removed at {}",
        "⏰".yellow(),
        local_clock(deadline).bright_white()
    );
    println!(
        "  Press Ctrl-C to cancel; the page then keeps running until {}",
        "traefik-setup test-page remove".bright_white()
    );

    loop {
        let remaining = deadline - Utc::now();
        let Ok(remaining) = remaining.to_std() else {
            break;
        };
        if remaining.is_zero() {
            break;
        }

        println!("  {} remaining", format_remaining(TimeDelta::from_std(remaining)?));
        thread::sleep(remaining.min(TICK));
    }

    println!();
    println!("{} Time is up!", "⏰".yellow());
    remove(settings)
}

/// `test-page remove`
pub fn remove_command(settings: &Settings, after: Option<u64>, now: bool) -> Result<()> {
    if now {
        return remove(settings);
    }

    let state_file = settings.test_state_file();
    let state = match after {
        Some(secs) => reschedule(&state_file, secs)?,
        None => TestPageState::load(&state_file)?,
    };

    match state {
        Some(state) => wait_and_remove(settings, state.remove_at),
        None => remove(settings),
    }
}

/// Move the recorded deadline to `secs` from now
pub fn reschedule(state_file: &Path, secs: u64) -> Result<Option<TestPageState>> {
    let Some(mut state) = TestPageState::load(state_file)? else {
        return Ok(None);
    };

    state.remove_at = deadline_after(Utc::now(), secs)?;
    state.save(state_file)?;

    Ok(Some(state))
}

/// `test-page status`
pub fn status(settings: &Settings) -> Result<()> {
    let Some(state) = TestPageState::load(&settings.test_state_file())? else {
        println!("{} No test page is deployed", "ℹ".blue());
        return Ok(());
    };

    print_state(&state);
    Ok(())
}

pub fn print_state(state: &TestPageState) {
    println!("{}", "Test page:".blue());
    println!("  URL:       https://{}", state.domain.bright_white());
    println!("  Deployed:  {}", local_clock(state.deployed_at));

    let remaining = state.remaining(Utc::now());
    if remaining > TimeDelta::zero() {
        println!(
            "  Removal:   {} ({} remaining)",
            local_clock(state.remove_at),
            format_remaining(remaining)
        );
    } else {
        println!(
            "  Removal:   {} ({})",
            local_clock(state.remove_at),
            "overdue".red()
        );
        println!(
            "  Run {} to remove it",
            "traefik-setup test-page remove --now".bright_white()
        );
    }
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;
    use crate::config::settings_in;

    fn sample_state(root: &Path) -> TestPageState {
        let deployed_at = Utc::now();
        TestPageState {
            domain: "test.example.com".to_string(),
            compose_file: root.join("missing-compose.yml"),
            page_dir: root.join("test-page"),
            deployed_at,
            remove_at: deployed_at + TimeDelta::seconds(600),
        }
    }

    #[test]
    fn test_format_remaining() {
        assert_eq!(format_remaining(TimeDelta::seconds(600)), "10m 00s");
        assert_eq!(format_remaining(TimeDelta::seconds(545)), "9m 05s");
        assert_eq!(format_remaining(TimeDelta::seconds(42)), "42s");
        assert_eq!(format_remaining(TimeDelta::seconds(-5)), "0s");
    }

    #[test]
    fn test_state_save_and_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("test-page.json");

        assert_eq!(TestPageState::load(&path).unwrap(), None);

        let state = sample_state(dir.path());
        state.save(&path).unwrap();

        assert_eq!(TestPageState::load(&path).unwrap(), Some(state));
    }

    #[test]
    fn test_remaining() {
        let state = sample_state(Path::new("/tmp"));

        let later = state.deployed_at + TimeDelta::seconds(700);
        assert!(state.remaining(later) < TimeDelta::zero());
        assert_eq!(
            state.remaining(state.deployed_at),
            TimeDelta::seconds(600)
        );
    }

    #[test]
    fn test_remove_without_deployment_is_noop() {
        let dir = TempDir::new().unwrap();
        let settings = settings_in(dir.path());

        remove(&settings).unwrap();
    }

    #[test]
    fn test_remove_cleans_files_when_compose_is_gone() {
        let dir = TempDir::new().unwrap();
        let settings = settings_in(dir.path());
        settings.ensure_directories().unwrap();

        let state = sample_state(dir.path());
        fs::create_dir_all(state.page_dir.join("html")).unwrap();
        fs::write(state.page_dir.join("html/index.html"), "<h1>x</h1>").unwrap();
        state.save(&settings.test_state_file()).unwrap();

        // compose file is absent, so docker is never invoked
        remove(&settings).unwrap();

        assert!(!state.page_dir.exists());
        assert!(!settings.test_state_file().exists());
    }

    #[test]
    fn test_wait_and_remove_past_deadline_removes_immediately() {
        let dir = TempDir::new().unwrap();
        let settings = settings_in(dir.path());
        settings.ensure_directories().unwrap();

        let mut state = sample_state(dir.path());
        state.remove_at = state.deployed_at - TimeDelta::seconds(1);
        state.save(&settings.test_state_file()).unwrap();

        wait_and_remove(&settings, state.remove_at).unwrap();

        assert!(!settings.test_state_file().exists());
    }

    #[test]
    fn test_deadline_after_rejects_out_of_range() {
        let now = Utc::now();

        assert_eq!(
            deadline_after(now, 600).unwrap(),
            now + TimeDelta::seconds(600)
        );
        // would wrap to a negative delay with a plain cast
        assert!(deadline_after(now, u64::MAX).is_err());
        // fits in i64 but not in a TimeDelta
        assert!(deadline_after(now, 10_000_000_000_000_000).is_err());
    }

    #[test]
    fn test_remove_after_huge_delay_keeps_page() {
        let dir = TempDir::new().unwrap();
        let settings = settings_in(dir.path());
        settings.ensure_directories().unwrap();

        let state = sample_state(dir.path());
        fs::create_dir_all(&state.page_dir).unwrap();
        state.save(&settings.test_state_file()).unwrap();

        assert!(remove_command(&settings, Some(u64::MAX), false).is_err());
        assert!(remove_command(&settings, Some(10_000_000_000_000_000), false).is_err());

        assert!(state.page_dir.exists());
        assert_eq!(
            TestPageState::load(&settings.test_state_file()).unwrap(),
            Some(state)
        );
    }

    #[test]
    fn test_reschedule_rewrites_deadline() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("test-page.json");

        assert_eq!(reschedule(&path, 60).unwrap(), None);

        let state = sample_state(dir.path());
        state.save(&path).unwrap();

        let before = Utc::now();
        let updated = reschedule(&path, 3600).unwrap().unwrap();

        assert!(updated.remove_at >= before + TimeDelta::seconds(3600));
        assert_eq!(updated.deployed_at, state.deployed_at);
        assert_eq!(TestPageState::load(&path).unwrap(), Some(updated));
    }

    #[test]
    fn test_compose_file_is_outside_web_root() {
        let dir = TempDir::new().unwrap();
        let settings = settings_in(dir.path());

        let answers = crate::setup::answers::http_answers("proxy.example.com");
        let page_dir = write_page_files(&settings, &answers, "test.example.com").unwrap();

        let info = compose::ComposeInfo::parse(&settings.test_compose_file()).unwrap();
        let web_root = &info.services.get("nginx-test").unwrap().bind_sources[0];

        assert_eq!(web_root, &page_dir.join("html"));
        assert!(web_root.join("index.html").exists());
        assert!(!web_root.join("docker-compose-test.yml").exists());
        assert!(page_dir.join("docker-compose-test.yml").exists());
    }
}
