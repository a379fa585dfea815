//! One poll: resolve a token for the active profile, then fetch usage.

use crate::credentials::{
    OAuthRefresher, ResolvedToken, SecretStore, SystemStore, TokenExchanger, TokenService,
};
use crate::error::PollError;
use crate::profiles::{ProfileSource, ProfileState};
use crate::usage::{HttpUsageTransport, UsageClient, UsageSnapshot, UsageTransport};
use tracing::debug;

/// Owns the collaborators a poll needs. Each call to [`Poller::poll`] is independent.
pub struct Poller {
    store: Box<dyn SecretStore>,
    exchanger: Box<dyn TokenExchanger>,
    transport: Box<dyn UsageTransport>,
}

impl Poller {
    pub fn new(
        store: Box<dyn SecretStore>,
        exchanger: Box<dyn TokenExchanger>,
        transport: Box<dyn UsageTransport>,
    ) -> Self {
        Self {
            store,
            exchanger,
            transport,
        }
    }

    /// Poller wired to the real keychain/file store and HTTP endpoints.
    pub fn system() -> Self {
        Self::new(
            Box::new(SystemStore::detect()),
            Box::new(OAuthRefresher::new()),
            Box::new(HttpUsageTransport::new()),
        )
    }

    pub fn store(&self) -> &dyn SecretStore {
        self.store.as_ref()
    }

    pub fn token_service(&self) -> TokenService<'_> {
        TokenService::new(self.store.as_ref(), self.exchanger.as_ref())
    }

    pub fn usage_client(&self) -> UsageClient<'_> {
        UsageClient::new(self.transport.as_ref())
    }

    /// Polls usage for the active profile of `state`.
    pub fn poll(&self, state: &ProfileState) -> Result<UsageSnapshot, PollError> {
        let (name, profile) = state.resolve_active();
        let client = self.usage_client();

        match profile.source {
            ProfileSource::Delegated => {
                let service = self.token_service();
                let ResolvedToken { access_token, plan } =
                    service.resolve().ok_or(PollError::NoCredential)?;
                debug!(profile = %name, "polling with keychain token");
                client.fetch(&access_token, &plan, Some(&service))
            }
            ProfileSource::Pinned { token, plan } => {
                if token.trim().is_empty() {
                    return Err(PollError::NoCredential);
                }
                debug!(profile = %name, "polling with pinned token");
                client.fetch(&token, &plan, None)
            }
        }
    }
}

#[cfg(test)]
#[path = "tests/poll_tests.rs"]
mod tests;
