//! Durable profile configuration: named credential sources, the active
//! profile and the poll interval.
//!
//! [`ProfileState`] is a plain value handed to every operation;
//! [`ProfileStore`] is the only thing that touches the file.

use crate::credentials::types::UNKNOWN_PLAN;
use crate::credentials::ResolvedToken;
use crate::private_file::write_private_atomic;
use anyhow::{bail, Context, Result};
use fs2::FileExt;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Name of the profile that always follows the secure store.
pub const AUTO_PROFILE: &str = "auto";
pub const AUTO_LABEL: &str = "Auto (Keychain)";
pub const DEFAULT_REFRESH_SECONDS: u64 = 120;
pub const MIN_REFRESH_SECONDS: u64 = 10;

const SOURCE_KEYCHAIN: &str = "keychain";
const SOURCE_TOKEN: &str = "token";

/// Where a profile gets its access token from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProfileSource {
    /// Whatever the secure store currently holds, refreshed as needed.
    Delegated,
    /// A token snapshotted earlier. Never refreshed automatically.
    Pinned { token: String, plan: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "ProfileRecord", into = "ProfileRecord")]
pub struct Profile {
    pub label: String,
    pub source: ProfileSource,
}

/// On-disk shape of a profile entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct ProfileRecord {
    #[serde(default, deserialize_with = "null_as_default")]
    label: String,
    #[serde(default, deserialize_with = "null_as_default")]
    source: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    plan: Option<String>,
}

impl From<ProfileRecord> for Profile {
    fn from(record: ProfileRecord) -> Self {
        let source = if record.source == SOURCE_KEYCHAIN {
            ProfileSource::Delegated
        } else {
            ProfileSource::Pinned {
                token: record.token.unwrap_or_default(),
                plan: record.plan.unwrap_or_else(|| UNKNOWN_PLAN.to_string()),
            }
        };
        Self {
            label: record.label,
            source,
        }
    }
}

impl From<Profile> for ProfileRecord {
    fn from(profile: Profile) -> Self {
        match profile.source {
            ProfileSource::Delegated => Self {
                label: profile.label,
                source: SOURCE_KEYCHAIN.to_string(),
                token: None,
                plan: None,
            },
            ProfileSource::Pinned { token, plan } => Self {
                label: profile.label,
                source: SOURCE_TOKEN.to_string(),
                token: Some(token),
                plan: Some(plan),
            },
        }
    }
}

impl Profile {
    pub fn auto() -> Self {
        Self {
            label: AUTO_LABEL.to_string(),
            source: ProfileSource::Delegated,
        }
    }

    pub fn pinned(label: impl Into<String>, snapshot: &ResolvedToken) -> Self {
        Self {
            label: label.into(),
            source: ProfileSource::Pinned {
                token: snapshot.access_token.clone(),
                plan: snapshot.plan.clone(),
            },
        }
    }

    /// Label for display; an empty label falls back to the profile name.
    pub fn display_label<'a>(&'a self, name: &'a str) -> &'a str {
        if self.label.trim().is_empty() {
            name
        } else {
            &self.label
        }
    }

    pub fn is_delegated(&self) -> bool {
        matches!(self.source, ProfileSource::Delegated)
    }
}

/// Complete configuration document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProfileState {
    #[serde(deserialize_with = "active_or_auto")]
    pub active_profile: String,
    #[serde(deserialize_with = "lenient_seconds")]
    pub refresh_seconds: u64,
    #[serde(deserialize_with = "null_as_default")]
    pub profiles: BTreeMap<String, Profile>,
}

// Hand-edited files may carry `null` where a value is expected.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

fn active_or_auto<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?
        .filter(|name| !name.trim().is_empty())
        .unwrap_or_else(|| AUTO_PROFILE.to_string()))
}

/// Accepts whole, fractional or quoted seconds; anything else means the default.
fn lenient_seconds<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    let seconds = match Value::deserialize(deserializer)? {
        Value::Number(number) => number.as_u64().or_else(|| {
            number
                .as_f64()
                .filter(|secs| secs.is_finite() && *secs >= 0.0)
                .map(|secs| secs as u64)
        }),
        Value::String(text) => text.trim().parse::<f64>().ok().and_then(|secs| {
            (secs.is_finite() && secs >= 0.0).then_some(secs as u64)
        }),
        _ => None,
    };
    Ok(seconds.unwrap_or(DEFAULT_REFRESH_SECONDS))
}

impl Default for ProfileState {
    fn default() -> Self {
        let mut profiles = BTreeMap::new();
        profiles.insert(AUTO_PROFILE.to_string(), Profile::auto());
        Self {
            active_profile: AUTO_PROFILE.to_string(),
            refresh_seconds: DEFAULT_REFRESH_SECONDS,
            profiles,
        }
    }
}

impl ProfileState {
    /// Re-creates the `auto` profile if a hand edit removed it.
    pub fn ensure_auto(&mut self) {
        self.profiles
            .entry(AUTO_PROFILE.to_string())
            .or_insert_with(Profile::auto);
    }

    /// Name and profile to poll; a dangling active name falls back to `auto`.
    pub fn resolve_active(&self) -> (String, Profile) {
        if let Some(profile) = self.profiles.get(&self.active_profile) {
            return (self.active_profile.clone(), profile.clone());
        }
        if self.active_profile != AUTO_PROFILE {
            debug!(active = %self.active_profile, "active profile missing, using auto");
        }
        let auto = self
            .profiles
            .get(AUTO_PROFILE)
            .cloned()
            .unwrap_or_else(Profile::auto);
        (AUTO_PROFILE.to_string(), auto)
    }

    /// Label of the profile that will be polled.
    pub fn active_label(&self) -> String {
        let (name, profile) = self.resolve_active();
        profile.display_label(&name).to_string()
    }

    /// Configured interval, never below [`MIN_REFRESH_SECONDS`].
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_seconds.max(MIN_REFRESH_SECONDS))
    }
}

/// File-backed store for [`ProfileState`].
pub struct ProfileStore {
    path: PathBuf,
}

impl ProfileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Store at the default config location.
    pub fn open_default() -> Result<Self> {
        Ok(Self::new(crate::paths::config_file()?))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the configuration. Absent or unparsable files yield the default state.
    pub fn load(&self) -> ProfileState {
        match self.try_load() {
            Ok(state) => state,
            Err(e) => {
                let error = format!("{:#}", e);
                warn!(path = %self.path.display(), %error, "config unusable, using defaults");
                ProfileState::default()
            }
        }
    }

    /// Reads the configuration, failing when an existing file cannot be read or parsed.
    ///
    /// An absent file is the default state.
    pub fn try_load(&self) -> Result<ProfileState> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(ProfileState::default());
            }
            Err(e) => {
                return Err(e)
                    .with_context(|| format!("Failed to read config: {}", self.path.display()));
            }
        };

        let mut state: ProfileState = serde_json::from_str(&content).with_context(|| {
            format!(
                "Config is not valid JSON for this version; fix or remove it: {}",
                self.path.display()
            )
        })?;
        state.ensure_auto();
        Ok(state)
    }

    /// Rewrites the whole file atomically with owner-only permissions.
    pub fn save(&self, state: &ProfileState) -> Result<()> {
        let json =
            serde_json::to_string_pretty(state).context("Failed to serialize profile config")?;
        write_private_atomic(&self.path, json.as_bytes())
            .with_context(|| format!("Failed to save config: {}", self.path.display()))?;
        debug!(path = %self.path.display(), "config saved");
        Ok(())
    }

    /// Writes the default document when no config file exists yet.
    pub fn ensure_exists(&self) -> Result<()> {
        if self.path.exists() {
            return Ok(());
        }
        info!(path = %self.path.display(), "creating default config");
        self.save(&ProfileState::default())
    }

    /// Snapshots `snapshot` into a pinned profile. The active profile is left alone.
    pub fn add_or_update_profile(
        &self,
        name: &str,
        label: &str,
        snapshot: &ResolvedToken,
    ) -> Result<ProfileState> {
        if name.trim().is_empty() {
            bail!("Profile name must not be empty");
        }
        if name == AUTO_PROFILE {
            bail!("'{}' is reserved for the keychain profile", AUTO_PROFILE);
        }
        self.update(|state| {
            state
                .profiles
                .insert(name.to_string(), Profile::pinned(label, snapshot));
            info!(profile = name, plan = %snapshot.plan, "profile snapshot saved");
            Ok(())
        })
    }

    /// Replaces the token and plan of an existing pinned profile, keeping its label.
    pub fn refresh_profile(&self, name: &str, snapshot: &ResolvedToken) -> Result<ProfileState> {
        self.update(|state| {
            let Some(profile) = state.profiles.get_mut(name) else {
                bail!("Profile '{}' not found", name);
            };
            if profile.is_delegated() {
                bail!("Profile '{}' follows the keychain and needs no refresh", name);
            }
            profile.source = ProfileSource::Pinned {
                token: snapshot.access_token.clone(),
                plan: snapshot.plan.clone(),
            };
            info!(profile = name, "profile token refreshed");
            Ok(())
        })
    }

    /// Makes `name` the active profile and persists immediately.
    pub fn set_active(&self, name: &str) -> Result<ProfileState> {
        self.update(|state| {
            if !state.profiles.contains_key(name) {
                bail!("Profile '{}' not found", name);
            }
            state.active_profile = name.to_string();
            info!(profile = name, "active profile changed");
            Ok(())
        })
    }

    /// Re-reads, mutates and saves under an exclusive lock on a sibling lock file.
    ///
    /// A file that exists but cannot be parsed is left untouched.
    fn update<F>(&self, mutate: F) -> Result<ProfileState>
    where
        F: FnOnce(&mut ProfileState) -> Result<()>,
    {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }
        let lock_path = self.path.with_extension("lock");
        let lock_file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&lock_path)
            .with_context(|| format!("Failed to open lock file: {}", lock_path.display()))?;
        lock_file
            .lock_exclusive()
            .with_context(|| format!("Failed to lock: {}", lock_path.display()))?;

        let mut state = self.try_load()?;
        mutate(&mut state)?;
        self.save(&state)?;
        Ok(state)
    }
}

#[cfg(test)]
#[path = "tests/profiles_tests.rs"]
mod tests;
