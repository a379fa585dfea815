//! HTTP transport for the usage endpoint.

use std::fmt::{Display, Formatter};
use std::io::ErrorKind;
use std::time::Duration;
use tracing::debug;

pub const USAGE_URL: &str = "https://api.anthropic.com/api/oauth/usage";

/// Value of the `anthropic-beta` header that unlocks OAuth access to the endpoint.
pub const OAUTH_BETA: &str = "oauth-2025-04-20";

/// Client identification the endpoint expects.
pub const USER_AGENT: &str = "claude-code/2.1.0";

const USAGE_TIMEOUT: Duration = Duration::from_secs(15);

/// Raw status and body. Any status is a successful transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpReply {
    pub status: u16,
    pub body: String,
}

impl HttpReply {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Failure before an HTTP status was received.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// DNS failure, refused or dropped connection.
    Unreachable(String),
    Timeout,
    Other(String),
}

impl Display for TransportError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unreachable(message) => write!(f, "unreachable: {}", message),
            Self::Timeout => write!(f, "timed out"),
            Self::Other(message) => write!(f, "{}", message),
        }
    }
}

impl std::error::Error for TransportError {}

/// Issues one authenticated GET against the usage endpoint.
pub trait UsageTransport: Send {
    fn get_usage(&self, token: &str) -> Result<HttpReply, TransportError>;
}

/// [`UsageTransport`] over `ureq`.
pub struct HttpUsageTransport {
    agent: ureq::Agent,
    url: String,
}

impl HttpUsageTransport {
    pub fn new() -> Self {
        Self::with_url(USAGE_URL, USAGE_TIMEOUT)
    }

    pub fn with_url(url: impl Into<String>, timeout: Duration) -> Self {
        let agent: ureq::Agent = ureq::Agent::config_builder()
            .timeout_global(Some(timeout))
            .http_status_as_error(false)
            .build()
            .into();
        Self {
            agent,
            url: url.into(),
        }
    }
}

impl Default for HttpUsageTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl UsageTransport for HttpUsageTransport {
    fn get_usage(&self, token: &str) -> Result<HttpReply, TransportError> {
        debug!(url = %self.url, "fetching usage");
        let mut response = self
            .agent
            .get(self.url.as_str())
            .header("Accept", "application/json")
            .header("Content-Type", "application/json")
            .header("User-Agent", USER_AGENT)
            .header("Authorization", &format!("Bearer {}", token))
            .header("anthropic-beta", OAUTH_BETA)
            .call()
            .map_err(classify)?;

        let status = response.status().as_u16();
        let body = response.body_mut().read_to_string().map_err(classify)?;
        Ok(HttpReply { status, body })
    }
}

fn classify(error: ureq::Error) -> TransportError {
    match error {
        ureq::Error::Timeout(_) => TransportError::Timeout,
        ureq::Error::HostNotFound | ureq::Error::ConnectionFailed => {
            TransportError::Unreachable(error.to_string())
        }
        ureq::Error::Io(io) => classify_io(io),
        other => TransportError::Other(other.to_string()),
    }
}

fn classify_io(io: std::io::Error) -> TransportError {
    match io.kind() {
        ErrorKind::TimedOut | ErrorKind::WouldBlock => TransportError::Timeout,
        ErrorKind::ConnectionRefused
        | ErrorKind::ConnectionReset
        | ErrorKind::ConnectionAborted
        | ErrorKind::NotConnected
        | ErrorKind::AddrNotAvailable
        | ErrorKind::BrokenPipe
        | ErrorKind::UnexpectedEof => TransportError::Unreachable(io.to_string()),
        _ => TransportError::Other(io.to_string()),
    }
}
