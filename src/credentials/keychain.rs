//! macOS keychain access through the `security` command-line tool.
//!
//! Each invocation is bounded by a timeout; a hung `security` process is killed
//! rather than allowed to stall a poll.

use super::store::SecretStore;
use super::types::CredentialBlob;
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Keychain service name the Claude CLI stores its OAuth blob under.
pub const KEYCHAIN_SERVICE: &str = "Claude Code-credentials";

pub const STORE_TIMEOUT: Duration = Duration::from_secs(5);

const WAIT_STEP: Duration = Duration::from_millis(20);

/// Generic-password entry in the login keychain.
#[derive(Debug, Clone)]
pub struct KeychainStore {
    program: PathBuf,
    service: String,
    account: String,
    timeout: Duration,
}

impl KeychainStore {
    /// Locates the `security` tool. Returns `None` when no keychain is available,
    /// which is always the case off macOS.
    pub fn locate() -> Option<Self> {
        if !cfg!(target_os = "macos") {
            return None;
        }
        let program = which::which("security").ok()?;
        Some(Self::new(program, KEYCHAIN_SERVICE))
    }

    pub fn new(program: impl Into<PathBuf>, service: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            service: service.into(),
            account: std::env::var("USER").unwrap_or_else(|_| "claude".to_string()),
            timeout: STORE_TIMEOUT,
        }
    }

    fn run(&self, args: &[&str]) -> Result<Output> {
        run_with_timeout(&self.program, args, self.timeout)
    }
}

impl SecretStore for KeychainStore {
    fn read(&self) -> Option<CredentialBlob> {
        let output = match self.run(&["find-generic-password", "-s", &self.service, "-w"]) {
            Ok(output) => output,
            Err(e) => {
                warn!(error = %e, "keychain lookup failed");
                return None;
            }
        };

        if !output.status.success() {
            debug!(status = ?output.status.code(), "no keychain entry");
            return None;
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        if stdout.trim().is_empty() {
            return None;
        }

        let blob = CredentialBlob::from_json(&stdout);
        if blob.is_none() {
            warn!("keychain entry is not a credential document");
        }
        blob
    }

    fn write(&self, blob: &CredentialBlob) -> bool {
        let payload = match serde_json::to_string(blob) {
            Ok(payload) => payload,
            Err(e) => {
                warn!(error = %e, "failed to serialize credentials for keychain");
                return false;
            }
        };

        // `security add-generic-password` refuses to overwrite, so the old entry goes first.
        if let Err(e) = self.run(&["delete-generic-password", "-s", &self.service]) {
            debug!(error = %e, "keychain delete failed");
        }

        match self.run(&[
            "add-generic-password",
            "-a",
            &self.account,
            "-s",
            &self.service,
            "-w",
            &payload,
        ]) {
            Ok(output) if output.status.success() => {
                debug!("credentials written to keychain");
                true
            }
            Ok(output) => {
                warn!(status = ?output.status.code(), "keychain write rejected");
                false
            }
            Err(e) => {
                warn!(error = %e, "keychain write failed");
                false
            }
        }
    }
}

/// Runs `program` to completion, killing it once `timeout` elapses.
pub fn run_with_timeout(program: &Path, args: &[&str], timeout: Duration) -> Result<Output> {
    let mut child = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .with_context(|| format!("Failed to spawn {}", program.display()))?;

    let deadline = Instant::now() + timeout;
    loop {
        match child.try_wait() {
            Ok(Some(_)) => {
                return child
                    .wait_with_output()
                    .with_context(|| format!("Failed to collect output of {}", program.display()));
            }
            Ok(None) if Instant::now() >= deadline => {
                // Ignoring errors: the child may have exited between try_wait and kill
                let _ = child.kill();
                let _ = child.wait();
                anyhow::bail!(
                    "{} timed out after {:.1}s",
                    program.display(),
                    timeout.as_secs_f64()
                );
            }
            Ok(None) => std::thread::sleep(WAIT_STEP),
            Err(e) => {
                let _ = child.kill();
                return Err(e)
                    .with_context(|| format!("Failed to wait for {}", program.display()));
            }
        }
    }
}
