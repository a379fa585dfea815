//! Centralized filesystem locations used by the monitor.
//!
//! - `~/.config/claude-monitor/config.json` - profile store
//! - `~/.config/claude-monitor/monitor.log` - tracing output
//! - `~/.claude/.credentials.json` - credential fallback written by the Claude CLI

use anyhow::{Context, Result};
use std::fs;
use std::path::PathBuf;

/// Overrides the monitor's config directory (used by tests and portable installs).
pub const CONFIG_DIR_ENV: &str = "CLAUDE_MONITOR_CONFIG_DIR";

/// Overrides the Claude CLI config directory, matching the CLI's own variable.
pub const CLAUDE_CONFIG_DIR_ENV: &str = "CLAUDE_CONFIG_DIR";

const CONFIG_FILENAME: &str = "config.json";
const LOG_FILENAME: &str = "monitor.log";
const CREDENTIALS_FILENAME: &str = ".credentials.json";

/// Returns the monitor config directory: `~/.config/claude-monitor/`
///
/// Creates the directory if it doesn't exist.
///
/// # Errors
///
/// Returns an error if the home directory cannot be determined or the
/// directory cannot be created.
pub fn config_dir() -> Result<PathBuf> {
    let dir = match std::env::var_os(CONFIG_DIR_ENV) {
        Some(dir) => PathBuf::from(dir),
        None => dirs::home_dir()
            .context("Could not determine home directory for config storage")?
            .join(".config")
            .join("claude-monitor"),
    };
    fs::create_dir_all(&dir)
        .with_context(|| format!("Failed to create config directory: {}", dir.display()))?;
    Ok(dir)
}

/// Returns the profile store path: `~/.config/claude-monitor/config.json`
pub fn config_file() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILENAME))
}

/// Returns the log file path: `~/.config/claude-monitor/monitor.log`
pub fn log_file() -> Result<PathBuf> {
    Ok(config_dir()?.join(LOG_FILENAME))
}

/// Returns the Claude CLI credentials file: `~/.claude/.credentials.json`
///
/// Unlike [`config_dir`], this never creates anything: the file belongs to the CLI.
pub fn claude_credentials_file() -> Option<PathBuf> {
    std::env::var_os(CLAUDE_CONFIG_DIR_ENV)
        .map(PathBuf::from)
        .or_else(|| dirs::home_dir().map(|h| h.join(".claude")))
        .map(|dir| dir.join(CREDENTIALS_FILENAME))
}
