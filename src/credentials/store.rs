//! Secret store adapters for the OAuth credential blob.
//!
//! Every adapter is best-effort: reads collapse all failures into `None` and
//! writes report a bare success flag. The owning CLI may rewrite the same
//! entry at any moment, so callers treat a write as a cache sync rather than a
//! transaction.

use super::keychain::KeychainStore;
use super::types::CredentialBlob;
use crate::paths;
use crate::private_file::write_private_atomic;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Read/write access to one named credential entry.
pub trait SecretStore: Send {
    /// Returns the stored blob, or `None` if absent, unreadable or malformed.
    fn read(&self) -> Option<CredentialBlob>;

    /// Replaces the stored blob. Returns whether the write is believed to have succeeded.
    fn write(&self, blob: &CredentialBlob) -> bool;
}

/// Plain JSON file holding the blob, as written by the Claude CLI on platforms
/// without a keychain.
#[derive(Debug, Clone)]
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SecretStore for FileStore {
    fn read(&self) -> Option<CredentialBlob> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) => {
                debug!(path = %self.path.display(), error = %e, "credentials file unavailable");
                return None;
            }
        };

        let blob = CredentialBlob::from_json(&content);
        if blob.is_none() {
            warn!(path = %self.path.display(), "credentials file is malformed");
        }
        blob
    }

    fn write(&self, blob: &CredentialBlob) -> bool {
        let result = serde_json::to_vec_pretty(blob)
            .map_err(anyhow::Error::from)
            .and_then(|content| write_private_atomic(&self.path, &content));
        match result {
            Ok(()) => {
                debug!(path = %self.path.display(), "credentials file updated");
                true
            }
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "failed to write credentials file");
                false
            }
        }
    }
}

/// The OS secure store with the credentials file as fallback.
///
/// Reads try the keychain first and fall back to the file. Writes go to the
/// keychain when one exists, otherwise to the file.
#[derive(Debug, Clone)]
pub struct SystemStore {
    keychain: Option<KeychainStore>,
    file: Option<FileStore>,
}

impl SystemStore {
    pub fn new(keychain: Option<KeychainStore>, file: Option<FileStore>) -> Self {
        Self { keychain, file }
    }

    /// Store backed by the login keychain (if any) and `~/.claude/.credentials.json`.
    pub fn detect() -> Self {
        let keychain = KeychainStore::locate();
        let file = paths::claude_credentials_file().map(FileStore::new);
        debug!(
            keychain = keychain.is_some(),
            file = ?file.as_ref().map(|f| f.path().display().to_string()),
            "secret store detected"
        );
        Self::new(keychain, file)
    }
}

impl SecretStore for SystemStore {
    fn read(&self) -> Option<CredentialBlob> {
        self.keychain
            .as_ref()
            .and_then(|keychain| keychain.read())
            .or_else(|| self.file.as_ref().and_then(|file| file.read()))
    }

    fn write(&self, blob: &CredentialBlob) -> bool {
        match (&self.keychain, &self.file) {
            (Some(keychain), _) => keychain.write(blob),
            (None, Some(file)) => file.write(blob),
            (None, None) => false,
        }
    }
}

#[cfg(test)]
#[path = "tests/store_tests.rs"]
mod tests;
