//! Usage fetching with a single refresh-and-retry on authentication failure.

use super::transport::{HttpReply, TransportError, UsageTransport};
use super::types::UsageSnapshot;
use crate::credentials::TokenService;
use crate::error::PollError;
use serde_json::Value;
use tracing::{debug, info, warn};

/// Maps transport outcomes onto [`PollError`] kinds.
pub struct UsageClient<'a> {
    transport: &'a dyn UsageTransport,
}

impl<'a> UsageClient<'a> {
    pub fn new(transport: &'a dyn UsageTransport) -> Self {
        Self { transport }
    }

    /// Fetches and parses usage for `token`.
    ///
    /// `recovery` is consulted once on HTTP 401. Pass `None` for tokens that do
    /// not come from the secure store, so a rejected pinned token never touches it.
    pub fn fetch(
        &self,
        token: &str,
        plan: &str,
        recovery: Option<&TokenService<'_>>,
    ) -> Result<UsageSnapshot, PollError> {
        let value = self.fetch_json(token, recovery)?;
        UsageSnapshot::from_json(value, plan, chrono::Utc::now())
    }

    /// Like [`Self::fetch`] but returns the raw JSON body.
    pub fn fetch_json(
        &self,
        token: &str,
        recovery: Option<&TokenService<'_>>,
    ) -> Result<Value, PollError> {
        let reply = self.get(token)?;
        match reply.status {
            200..=299 => parse_body(&reply),
            401 => self.retry_after_refresh(recovery),
            403 => Err(PollError::Forbidden),
            code => {
                warn!(status = code, "unexpected usage status");
                Err(PollError::HttpStatus(code))
            }
        }
    }

    fn retry_after_refresh(&self, recovery: Option<&TokenService<'_>>) -> Result<Value, PollError> {
        let Some(service) = recovery else {
            debug!("401 for a token without a refresh path");
            return Err(PollError::AuthExpired);
        };

        info!("usage request returned 401, forcing a token refresh");
        let Some(fresh) = service.force_refresh() else {
            return Err(PollError::AuthExpired);
        };

        let reply = self.get(&fresh)?;
        if reply.is_success() {
            parse_body(&reply)
        } else {
            warn!(status = reply.status, "retry after refresh still rejected");
            Err(PollError::AuthExpired)
        }
    }

    fn get(&self, token: &str) -> Result<HttpReply, PollError> {
        self.transport.get_usage(token).map_err(|e| match e {
            TransportError::Unreachable(message) => {
                debug!(%message, "usage endpoint unreachable");
                PollError::NetworkUnavailable
            }
            TransportError::Timeout => PollError::Timeout,
            TransportError::Other(message) => PollError::unknown(message),
        })
    }
}

fn parse_body(reply: &HttpReply) -> Result<Value, PollError> {
    let value: Value = serde_json::from_str(&reply.body)
        .map_err(|e| PollError::unknown(format!("Invalid JSON: {}", e)))?;
    if value.is_object() {
        Ok(value)
    } else {
        Err(PollError::unknown("Unexpected usage response"))
    }
}

#[cfg(test)]
#[path = "tests/client_tests.rs"]
mod tests;
