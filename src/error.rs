//! Error taxonomy reported by a poll.

use std::fmt::{Display, Formatter};

/// Longest message carried by [`PollError::Unknown`], in characters.
pub const MAX_MESSAGE_CHARS: usize = 60;

/// Why a poll produced no usage snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollError {
    /// No token could be resolved for the active profile.
    NoCredential,
    /// The API rejected the token and a refresh did not help.
    AuthExpired,
    /// Authenticated but denied.
    Forbidden,
    /// The endpoint could not be reached.
    NetworkUnavailable,
    /// The request did not complete within its timeout.
    Timeout,
    /// Unexpected status code from the API.
    HttpStatus(u16),
    /// Anything else, with a display-safe message.
    Unknown(String),
}

impl PollError {
    /// Builds an [`PollError::Unknown`], truncating the message for display.
    pub fn unknown(message: impl AsRef<str>) -> Self {
        Self::Unknown(truncate_chars(message.as_ref(), MAX_MESSAGE_CHARS))
    }

    /// Transient errors clear up on their own at a later tick.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::NetworkUnavailable | Self::Timeout)
    }

    /// What the user can do about it, when there is something to do.
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            Self::NoCredential => Some("Run: claude (and log in)"),
            Self::AuthExpired => Some("Run: claude (and re-login)"),
            Self::NetworkUnavailable | Self::Timeout => Some("Will retry on the next refresh"),
            Self::Forbidden | Self::HttpStatus(_) | Self::Unknown(_) => None,
        }
    }
}

impl Display for PollError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NoCredential => write!(f, "No OAuth token found"),
            Self::AuthExpired => write!(f, "Token expired — run: claude (and re-login)"),
            Self::Forbidden => write!(f, "Access denied (403)"),
            Self::NetworkUnavailable => write!(f, "No network connection"),
            Self::Timeout => write!(f, "Request timed out"),
            Self::HttpStatus(code) => write!(f, "HTTP {}", code),
            Self::Unknown(message) => write!(f, "{}", message),
        }
    }
}

impl std::error::Error for PollError {}

fn truncate_chars(text: &str, max: usize) -> String {
    text.chars().take(max).collect()
}
