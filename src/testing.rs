//! Scripted in-memory collaborators shared by unit tests.

use crate::credentials::{
    Credential, CredentialBlob, RefreshError, RefreshedToken, SecretStore, TokenExchanger,
};
use crate::usage::{HttpReply, TransportError, UsageTransport};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

/// Builds a blob with the given access token, optional refresh token and expiry.
pub fn blob(access: &str, refresh: Option<&str>, expires_at: Option<i64>) -> CredentialBlob {
    let mut cred = Credential::new(access);
    cred.refresh_token = refresh.map(str::to_string);
    cred.expires_at = expires_at;
    cred.subscription_type = Some("max".to_string());
    CredentialBlob::new(cred)
}

#[derive(Default)]
struct StoreState {
    blob: Option<CredentialBlob>,
    reads: usize,
    writes: Vec<CredentialBlob>,
    reject_writes: bool,
}

/// In-memory [`SecretStore`] that records every access.
#[derive(Clone, Default)]
pub struct FakeStore {
    state: Arc<Mutex<StoreState>>,
}

impl FakeStore {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn with_blob(blob: CredentialBlob) -> Self {
        let store = Self::default();
        store.state.lock().unwrap().blob = Some(blob);
        store
    }

    pub fn rejecting_writes(self) -> Self {
        self.state.lock().unwrap().reject_writes = true;
        self
    }

    /// Simulates another process rotating the stored credential.
    pub fn replace(&self, blob: CredentialBlob) {
        self.state.lock().unwrap().blob = Some(blob);
    }

    pub fn current(&self) -> Option<CredentialBlob> {
        self.state.lock().unwrap().blob.clone()
    }

    pub fn reads(&self) -> usize {
        self.state.lock().unwrap().reads
    }

    pub fn writes(&self) -> Vec<CredentialBlob> {
        self.state.lock().unwrap().writes.clone()
    }
}

impl SecretStore for FakeStore {
    fn read(&self) -> Option<CredentialBlob> {
        let mut state = self.state.lock().unwrap();
        state.reads += 1;
        state.blob.clone()
    }

    fn write(&self, blob: &CredentialBlob) -> bool {
        let mut state = self.state.lock().unwrap();
        state.writes.push(blob.clone());
        if state.reject_writes {
            return false;
        }
        state.blob = Some(blob.clone());
        true
    }
}

#[derive(Default)]
struct ExchangerState {
    responses: VecDeque<Result<RefreshedToken, RefreshError>>,
    calls: Vec<String>,
}

/// [`TokenExchanger`] answering from a script; unscripted calls fail.
#[derive(Clone, Default)]
pub struct FakeExchanger {
    state: Arc<Mutex<ExchangerState>>,
}

impl FakeExchanger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn succeeding(access_token: &str, expires_at: Option<i64>) -> Self {
        let exchanger = Self::default();
        exchanger.push(Ok(RefreshedToken {
            access_token: access_token.to_string(),
            expires_at,
            refresh_token: None,
        }));
        exchanger
    }

    pub fn failing(error: RefreshError) -> Self {
        let exchanger = Self::default();
        exchanger.push(Err(error));
        exchanger
    }

    pub fn push(&self, response: Result<RefreshedToken, RefreshError>) {
        self.state.lock().unwrap().responses.push_back(response);
    }

    /// Refresh tokens presented so far, in order.
    pub fn calls(&self) -> Vec<String> {
        self.state.lock().unwrap().calls.clone()
    }
}

impl TokenExchanger for FakeExchanger {
    fn exchange(&self, refresh_token: &str) -> Result<RefreshedToken, RefreshError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(refresh_token.to_string());
        state
            .responses
            .pop_front()
            .unwrap_or_else(|| {
                Err(RefreshError::Transport {
                    message: "no scripted response".to_string(),
                })
            })
    }
}

#[derive(Default)]
struct TransportState {
    replies: VecDeque<Result<HttpReply, TransportError>>,
    tokens: Vec<String>,
}

/// [`UsageTransport`] answering from a script; unscripted calls fail.
#[derive(Clone, Default)]
pub struct FakeTransport {
    state: Arc<Mutex<TransportState>>,
}

impl FakeTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reply(self, status: u16, body: &str) -> Self {
        self.push(Ok(HttpReply {
            status,
            body: body.to_string(),
        }));
        self
    }

    pub fn fail(self, error: TransportError) -> Self {
        self.push(Err(error));
        self
    }

    pub fn push(&self, reply: Result<HttpReply, TransportError>) {
        self.state.lock().unwrap().replies.push_back(reply);
    }

    /// Bearer tokens sent so far, in order.
    pub fn tokens(&self) -> Vec<String> {
        self.state.lock().unwrap().tokens.clone()
    }
}

impl UsageTransport for FakeTransport {
    fn get_usage(&self, token: &str) -> Result<HttpReply, TransportError> {
        let mut state = self.state.lock().unwrap();
        state.tokens.push(token.to_string());
        state
            .replies
            .pop_front()
            .unwrap_or_else(|| Err(TransportError::Other("no scripted reply".to_string())))
    }
}

pub const USAGE_BODY: &str = r#"{
    "five_hour": {"utilization": 87.0, "resets_at": "2026-10-16T18:00:00+00:00"},
    "seven_day": {"utilization": 42.0, "resets_at": "2026-10-20T09:00:00+00:00"},
    "seven_day_opus": null
}"#;
