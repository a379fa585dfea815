//! Command-line surface and the one-shot commands.

use crate::credentials::ResolvedToken;
use crate::display::{self, Severity};
use crate::poll::Poller;
use crate::profiles::{ProfileSource, ProfileStore};
use crate::usage::UsageSnapshot;
use anyhow::{anyhow, bail, Context, Result};
use chrono::{Local, Utc};
use clap::{Parser, Subcommand};
use std::io::Write;

const VERSION: &str = concat!(
    env!("CARGO_PKG_VERSION"),
    " (",
    env!("CLAUDE_MONITOR_GIT_SHA"),
    ")"
);

const LOGIN_HINT: &str = "No Claude credentials found. Run: claude (and log in)";

#[derive(Parser)]
#[command(name = "claude-monitor")]
#[command(about = "Live Claude subscription usage with multi-account switching")]
#[command(version = VERSION)]
pub struct Cli {
    /// Without a subcommand the interactive monitor starts
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Snapshot the current keychain token as a named profile
    AddProfile { name: String, label: String },
    /// Re-snapshot the keychain token for an existing profile
    RefreshProfile { name: String },
    /// Make NAME the active profile
    Use { name: String },
    /// List profiles, marking the active one
    Profiles,
    /// Check credentials and call the usage endpoint once
    Test,
    /// Poll once and print a status-bar plugin document
    Status,
    /// Poll on the configured interval, one title line per poll
    Watch {
        /// Stop after this many polls
        #[arg(long)]
        count: Option<usize>,
    },
}

pub fn execute(
    command: Command,
    store: &ProfileStore,
    poller: &Poller,
    out: &mut dyn Write,
) -> Result<()> {
    match command {
        Command::AddProfile { name, label } => add_profile(store, poller, &name, &label, out),
        Command::RefreshProfile { name } => refresh_profile(store, poller, &name, out),
        Command::Use { name } => use_profile(store, &name, out),
        Command::Profiles => list_profiles(store, out),
        Command::Test => test_connection(poller, out),
        Command::Status => status(store, poller, out),
        Command::Watch { count } => watch(store, poller, count, out),
    }
}

fn add_profile(
    store: &ProfileStore,
    poller: &Poller,
    name: &str,
    label: &str,
    out: &mut dyn Write,
) -> Result<()> {
    let snapshot = poller.token_service().resolve().context(LOGIN_HINT)?;
    store.add_or_update_profile(name, label, &snapshot)?;

    writeln!(out, "✅ Profile '{}' saved  (Plan: {})", name, snapshot.plan)?;
    writeln!(
        out,
        "   When this token expires, log into that account in Claude Code and run:"
    )?;
    writeln!(out, "   claude-monitor refresh-profile {}", name)?;
    Ok(())
}

fn refresh_profile(
    store: &ProfileStore,
    poller: &Poller,
    name: &str,
    out: &mut dyn Write,
) -> Result<()> {
    let snapshot = poller.token_service().resolve().context(LOGIN_HINT)?;
    store.refresh_profile(name, &snapshot)?;
    writeln!(out, "✅ Profile '{}' token refreshed  (Plan: {})", name, snapshot.plan)?;
    Ok(())
}

fn use_profile(store: &ProfileStore, name: &str, out: &mut dyn Write) -> Result<()> {
    let state = store.set_active(name)?;
    writeln!(out, "Active profile: {}", state.active_label())?;
    Ok(())
}

fn list_profiles(store: &ProfileStore, out: &mut dyn Write) -> Result<()> {
    let state = store.load();
    let (active, _) = state.resolve_active();

    for (name, profile) in &state.profiles {
        let marker = if *name == active { "●" } else { " " };
        let source = match &profile.source {
            ProfileSource::Delegated => "keychain".to_string(),
            ProfileSource::Pinned { plan, .. } => format!("token, {}", plan),
        };
        writeln!(
            out,
            "{} {:<12} {}  ({})",
            marker,
            name,
            profile.display_label(name),
            source
        )?;
    }
    writeln!(out, "Refresh: every {}s", state.poll_interval().as_secs())?;
    writeln!(out, "Config:  {}", store.path().display())?;
    Ok(())
}

fn test_connection(poller: &Poller, out: &mut dyn Write) -> Result<()> {
    writeln!(out, "Reading stored Claude credentials…")?;
    let blob = poller.store().read().context(LOGIN_HINT)?;
    let service = poller.token_service();

    let now_ms = Utc::now().timestamp_millis();
    let expired_at = blob
        .oauth
        .expires_at_ms()
        .filter(|_| blob.oauth.is_expired_at(now_ms));
    let token = match expired_at {
        Some(expires_at) => {
            writeln!(
                out,
                "⚠️  Access token is expired (by {} min)",
                (now_ms - expires_at) / 60_000
            )?;
            if blob.oauth.refresh_token().is_none() {
                bail!("No refresh token available. Run: claude (and re-login)");
            }
            writeln!(out, "   Attempting auto-refresh…")?;
            // The stored expiry can still be in the past here, so resolve() would exchange again.
            let Some(access_token) = service.force_refresh() else {
                bail!("Refresh failed. Run: claude (and re-login)");
            };
            writeln!(out, "   ✅ Token refreshed and saved")?;
            ResolvedToken {
                access_token,
                plan: blob.oauth.plan().to_string(),
            }
        }
        None => service.resolve().context(LOGIN_HINT)?,
    };
    writeln!(out, "✅ Token ready  •  Plan: {}", token.plan)?;
    writeln!(out, "   Calling the usage endpoint…")?;
    writeln!(out)?;

    let json = poller
        .usage_client()
        .fetch_json(&token.access_token, Some(&service))
        .map_err(|e| anyhow!("❌ {}", e))?;
    writeln!(out, "{}", serde_json::to_string_pretty(&json)?)?;

    let snapshot = UsageSnapshot::from_json(json, &token.plan, Utc::now())
        .map_err(|e| anyhow!("❌ {}", e))?;
    writeln!(out)?;
    writeln!(out, "{}", "─".repeat(44))?;
    write_summary(&snapshot, out)?;
    Ok(())
}

fn write_summary(snapshot: &UsageSnapshot, out: &mut dyn Write) -> Result<()> {
    let now = Utc::now();
    let rows = [
        ("5-hour:", snapshot.five_hour.as_ref()),
        ("7-day:", snapshot.seven_day.as_ref()),
        ("Opus:", snapshot.opus_in_use()),
    ];
    for (heading, window) in rows {
        let Some(window) = window else {
            continue;
        };
        let dot = Severity::from_percent(window.utilization).dot();
        let resets = display::time_until(window, now).unwrap_or_else(|| "—".to_string());
        writeln!(
            out,
            "  {:<8} {} {}  {:.1}%  (resets in {})",
            heading,
            dot,
            display::bar(window.utilization),
            window.utilization,
            resets
        )?;
    }
    Ok(())
}

fn status(store: &ProfileStore, poller: &Poller, out: &mut dyn Write) -> Result<()> {
    let state = store.load();
    let result = poller.poll(&state);
    let doc = display::status_document(
        &result,
        &state.active_label(),
        state.poll_interval().as_secs(),
        Utc::now(),
    );
    writeln!(out, "{}", doc)?;
    Ok(())
}

fn watch(
    store: &ProfileStore,
    poller: &Poller,
    count: Option<usize>,
    out: &mut dyn Write,
) -> Result<()> {
    let mut polls = 0usize;
    loop {
        let state = store.load();
        let result = poller.poll(&state);
        let clock = Local::now().format("%I:%M:%S %p");
        match &result {
            Ok(_) => writeln!(out, "{}  {}", clock, display::title_for(&result))?,
            Err(e) => writeln!(out, "{}  {}  {}", clock, display::title_for(&result), e)?,
        }
        out.flush()?;

        polls += 1;
        if count.is_some_and(|limit| polls >= limit) {
            return Ok(());
        }
        std::thread::sleep(state.poll_interval());
    }
}

#[cfg(test)]
#[path = "tests/cli_tests.rs"]
mod tests;
