//! Background poll worker.
//!
//! All blocking work (keychain subprocesses, token refresh, the usage request)
//! happens here so the UI thread only ever draws and reads keys. Requests go
//! through a single-slot queue: a request made while another is already
//! waiting is folded into it, so polls never overlap or pile up.

use crate::error::PollError;
use crate::poll::Poller;
use crate::profiles::{ProfileState, ProfileStore};
use crate::usage::UsageSnapshot;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use std::sync::mpsc::{self, Receiver, SyncSender, TryRecvError, TrySendError};
use std::thread;
use tracing::{debug, warn};

/// Result of one poll together with the configuration it ran against.
#[derive(Debug, Clone)]
pub struct PollOutcome {
    pub state: ProfileState,
    pub result: Result<UsageSnapshot, PollError>,
    pub finished_at: DateTime<Utc>,
}

pub struct PollWorker {
    requests: SyncSender<()>,
    outcomes: Receiver<PollOutcome>,
}

impl PollWorker {
    /// Starts the worker thread. It exits once the worker is dropped.
    pub fn spawn(poller: Poller, store: ProfileStore) -> Result<Self> {
        let (request_tx, request_rx) = mpsc::sync_channel::<()>(1);
        let (outcome_tx, outcome_rx) = mpsc::channel();

        thread::Builder::new()
            .name("poll-worker".to_string())
            .spawn(move || {
                while request_rx.recv().is_ok() {
                    // Re-read so edits made by other processes apply to this poll.
                    let state = store.load();
                    let result = poller.poll(&state);
                    if let Err(e) = &result {
                        debug!(error = %e, "poll failed");
                    }
                    let outcome = PollOutcome {
                        state,
                        result,
                        finished_at: Utc::now(),
                    };
                    if outcome_tx.send(outcome).is_err() {
                        break;
                    }
                }
                debug!("poll worker stopped");
            })
            .context("Failed to spawn poll worker")?;

        Ok(Self {
            requests: request_tx,
            outcomes: outcome_rx,
        })
    }

    /// Asks for a poll. Returns `false` when it was folded into one already queued.
    pub fn request(&self) -> bool {
        match self.requests.try_send(()) {
            Ok(()) => true,
            Err(TrySendError::Full(())) => {
                debug!("poll already queued");
                false
            }
            Err(TrySendError::Disconnected(())) => {
                warn!("poll worker is gone");
                false
            }
        }
    }

    /// Next finished poll, if any, without blocking.
    pub fn try_recv(&self) -> Option<PollOutcome> {
        match self.outcomes.try_recv() {
            Ok(outcome) => Some(outcome),
            Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => None,
        }
    }
}
