//! Refresh-token exchange against the OAuth token endpoint.

use super::types::RefreshedToken;
use serde::Deserialize;
use std::fmt::{Display, Formatter};
use std::time::Duration;
use tracing::debug;

pub const TOKEN_URL: &str = "https://console.anthropic.com/v1/oauth/token";

/// Public OAuth client identifier of the Claude CLI.
pub const CLIENT_ID: &str = "9d1c250a-e61b-44d9-88ed-5944d1962f5e";

const REFRESH_TIMEOUT: Duration = Duration::from_secs(15);

/// Errors that can occur while exchanging a refresh token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefreshError {
    /// The endpoint could not be reached or timed out.
    Transport { message: String },
    /// The endpoint answered with a non-2xx status.
    Status { code: u16 },
    /// The endpoint answered 2xx without a usable access token.
    Malformed { message: String },
}

impl Display for RefreshError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Transport { message } => write!(f, "token endpoint unreachable: {}", message),
            Self::Status { code } => write!(f, "token endpoint returned HTTP {}", code),
            Self::Malformed { message } => write!(f, "malformed token response: {}", message),
        }
    }
}

impl std::error::Error for RefreshError {}

/// Exchanges a refresh token for a new access token.
pub trait TokenExchanger: Send {
    fn exchange(&self, refresh_token: &str) -> Result<RefreshedToken, RefreshError>;
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
    refresh_token: Option<String>,
    /// Absolute expiry in epoch milliseconds.
    expires_at: Option<i64>,
    /// Relative lifetime in seconds (standard OAuth field).
    expires_in: Option<i64>,
}

/// Parses a token endpoint body; `now_ms` anchors a relative `expires_in`.
pub fn parse_token_response(body: &str, now_ms: i64) -> Result<RefreshedToken, RefreshError> {
    let response: TokenResponse =
        serde_json::from_str(body).map_err(|e| RefreshError::Malformed {
            message: e.to_string(),
        })?;

    let access_token = response
        .access_token
        .filter(|token| !token.is_empty())
        .ok_or_else(|| RefreshError::Malformed {
            message: "missing access_token".to_string(),
        })?;

    let expires_at = response
        .expires_at
        .filter(|ms| *ms > 0)
        .or_else(|| {
            response
                .expires_in
                .filter(|secs| *secs > 0)
                .map(|secs| now_ms.saturating_add(secs.saturating_mul(1000)))
        });

    Ok(RefreshedToken {
        access_token,
        expires_at,
        refresh_token: response.refresh_token.filter(|token| !token.is_empty()),
    })
}

/// HTTP implementation of [`TokenExchanger`].
pub struct OAuthRefresher {
    agent: ureq::Agent,
    url: String,
}

impl OAuthRefresher {
    pub fn new() -> Self {
        Self::with_url(TOKEN_URL)
    }

    pub fn with_url(url: impl Into<String>) -> Self {
        let agent: ureq::Agent = ureq::Agent::config_builder()
            .timeout_global(Some(REFRESH_TIMEOUT))
            .http_status_as_error(false)
            .build()
            .into();
        Self {
            agent,
            url: url.into(),
        }
    }
}

impl Default for OAuthRefresher {
    fn default() -> Self {
        Self::new()
    }
}

impl TokenExchanger for OAuthRefresher {
    fn exchange(&self, refresh_token: &str) -> Result<RefreshedToken, RefreshError> {
        let request_body = serde_json::json!({
            "grant_type": "refresh_token",
            "refresh_token": refresh_token,
            "client_id": CLIENT_ID,
        })
        .to_string();

        debug!(url = %self.url, "exchanging refresh token");
        let mut response = self
            .agent
            .post(self.url.as_str())
            .header("Content-Type", "application/json")
            .send(&request_body)
            .map_err(|e| RefreshError::Transport {
                message: e.to_string(),
            })?;

        let status = response.status().as_u16();
        if !(200..300).contains(&status) {
            return Err(RefreshError::Status { code: status });
        }

        let body = response
            .body_mut()
            .read_to_string()
            .map_err(|e| RefreshError::Transport {
                message: e.to_string(),
            })?;

        parse_token_response(&body, chrono::Utc::now().timestamp_millis())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_absolute_expiry() {
        let token =
            parse_token_response(r#"{"access_token":"new","expires_at":1760000000000}"#, 0)
                .unwrap();
        assert_eq!(token.access_token, "new");
        assert_eq!(token.expires_at, Some(1_760_000_000_000));
        assert_eq!(token.refresh_token, None);
    }

    #[test]
    fn test_parse_relative_expiry_and_rotation() {
        let token = parse_token_response(
            r#"{"access_token":"new","refresh_token":"r2","expires_in":3600}"#,
            1_000,
        )
        .unwrap();
        assert_eq!(token.expires_at, Some(1_000 + 3_600_000));
        assert_eq!(token.refresh_token.as_deref(), Some("r2"));
    }

    #[test]
    fn test_parse_missing_access_token_is_malformed() {
        let err = parse_token_response(r#"{"expires_in":3600}"#, 0).unwrap_err();
        assert!(matches!(err, RefreshError::Malformed { .. }));

        let err = parse_token_response("<html>", 0).unwrap_err();
        assert!(matches!(err, RefreshError::Malformed { .. }));
    }
}
