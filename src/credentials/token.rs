//! Access-token lifecycle for the delegated (secure store) credential.
//!
//! A credential is either *valid* (returned as-is) or *expired* (refresh is
//! attempted). A failed refresh never fails the caller: the stale token is
//! returned and the usage API gets the final say on whether it still works.

use super::refresh::TokenExchanger;
use super::store::SecretStore;
use super::types::{CredentialBlob, ResolvedToken};
use tracing::{debug, info, warn};

/// Resolves and refreshes the token kept in the secure store.
pub struct TokenService<'a> {
    store: &'a dyn SecretStore,
    exchanger: &'a dyn TokenExchanger,
}

impl<'a> TokenService<'a> {
    pub fn new(store: &'a dyn SecretStore, exchanger: &'a dyn TokenExchanger) -> Self {
        Self { store, exchanger }
    }

    /// Returns the current access token and plan, refreshing an expired token first.
    pub fn resolve(&self) -> Option<ResolvedToken> {
        self.resolve_at(chrono::Utc::now().timestamp_millis())
    }

    /// [`Self::resolve`] with an explicit clock, in epoch milliseconds.
    pub fn resolve_at(&self, now_ms: i64) -> Option<ResolvedToken> {
        let blob = self.store.read()?;
        if !blob.oauth.has_access_token() {
            debug!("stored credential has no access token");
            return None;
        }

        let plan = blob.oauth.plan().to_string();
        if !blob.oauth.is_expired_at(now_ms) {
            return Some(ResolvedToken {
                access_token: blob.oauth.access_token,
                plan,
            });
        }

        info!("access token expired, attempting refresh");
        let stale = blob.oauth.access_token.clone();
        let access_token = self.refresh_and_persist(blob).unwrap_or(stale);
        Some(ResolvedToken { access_token, plan })
    }

    /// Re-reads the store and performs exactly one refresh exchange, regardless of expiry.
    ///
    /// Used after the usage API rejected a token: another process may already have
    /// rotated the stored credential, so nothing cached in memory is trusted here.
    pub fn force_refresh(&self) -> Option<String> {
        let blob = self.store.read()?;
        self.refresh_and_persist(blob)
    }

    fn refresh_and_persist(&self, mut blob: CredentialBlob) -> Option<String> {
        let Some(refresh_token) = blob.oauth.refresh_token().map(str::to_string) else {
            warn!("no refresh token available, keeping current access token");
            return None;
        };

        let refreshed = match self.exchanger.exchange(&refresh_token) {
            Ok(refreshed) => refreshed,
            Err(e) => {
                warn!(error = %e, "token refresh failed");
                return None;
            }
        };

        blob.oauth.apply_refresh(&refreshed);
        if self.store.write(&blob) {
            info!("refreshed access token persisted");
        } else {
            warn!("refreshed access token could not be persisted");
        }
        Some(refreshed.access_token)
    }
}

#[cfg(test)]
#[path = "tests/token_tests.rs"]
mod tests;
