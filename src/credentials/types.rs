//! Data types for the OAuth credential blob shared with the Claude CLI.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Plan reported when the store does not record a subscription type.
pub const UNKNOWN_PLAN: &str = "unknown";

/// The full JSON document kept in the secure store (or the fallback file).
///
/// Only the OAuth section is interpreted; every other key is carried through
/// untouched so that writing a refreshed token back never drops data owned by
/// the CLI that created the entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CredentialBlob {
    #[serde(rename = "claudeAiOauth", alias = "oauthCredentials")]
    pub oauth: Credential,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// OAuth access/refresh token pair with its expiry and plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Credential {
    #[serde(default)]
    pub access_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    /// Expiry as Unix epoch milliseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subscription_type: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Credential {
    pub fn new(access_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token: None,
            expires_at: None,
            subscription_type: None,
            extra: Map::new(),
        }
    }

    /// Returns true when the credential carries a usable access token.
    pub fn has_access_token(&self) -> bool {
        !self.access_token.trim().is_empty()
    }

    /// Returns the refresh token, ignoring blank values.
    pub fn refresh_token(&self) -> Option<&str> {
        self.refresh_token
            .as_deref()
            .filter(|token| !token.trim().is_empty())
    }

    /// Expiry in epoch milliseconds; zero and negative values mean "no expiry".
    pub fn expires_at_ms(&self) -> Option<i64> {
        self.expires_at.filter(|ms| *ms > 0)
    }

    /// Returns true when an expiry is recorded and `now_ms` is past it.
    pub fn is_expired_at(&self, now_ms: i64) -> bool {
        self.expires_at_ms().is_some_and(|expires| now_ms > expires)
    }

    pub fn plan(&self) -> &str {
        self.subscription_type
            .as_deref()
            .filter(|plan| !plan.is_empty())
            .unwrap_or(UNKNOWN_PLAN)
    }

    /// Merges the result of a refresh exchange into this credential.
    pub fn apply_refresh(&mut self, refreshed: &RefreshedToken) {
        self.access_token = refreshed.access_token.clone();
        if let Some(expires_at) = refreshed.expires_at {
            self.expires_at = Some(expires_at);
        }
        if let Some(rotated) = refreshed.refresh_token.as_ref() {
            self.refresh_token = Some(rotated.clone());
        }
    }
}

impl CredentialBlob {
    pub fn new(oauth: Credential) -> Self {
        Self {
            oauth,
            extra: Map::new(),
        }
    }

    pub fn from_json(raw: &str) -> Option<Self> {
        serde_json::from_str(raw.trim()).ok()
    }
}

/// Outcome of a successful refresh-token exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefreshedToken {
    pub access_token: String,
    /// New expiry in epoch milliseconds, when the endpoint reported one.
    pub expires_at: Option<i64>,
    /// Rotated refresh token, when the endpoint issued a new one.
    pub refresh_token: Option<String>,
}

/// An access token ready to be sent, with the plan it belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedToken {
    pub access_token: String,
    pub plan: String,
}
