//! Monitor state and key handling, independent of the terminal.

use super::worker::PollOutcome;
use crate::error::PollError;
use crate::profiles::ProfileState;
use crate::usage::UsageSnapshot;
use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use std::time::{Duration, Instant};
use tracing::debug;

/// What the event loop should do after a key press.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    None,
    Refresh,
    Activate(String),
    Quit,
}

pub struct App {
    pub state: ProfileState,
    pub selected: usize,
    pub last: Option<PollOutcome>,
    /// Latest failure that was not a poll error, e.g. a config write.
    pub notice: Option<String>,
    pub polling: bool,
    /// Set by a profile switch until an outcome for the new profile arrives.
    switch_pending: bool,
    next_poll: Instant,
}

impl App {
    pub fn new(state: ProfileState, now: Instant) -> Self {
        let mut app = Self {
            state,
            selected: 0,
            last: None,
            notice: None,
            polling: false,
            switch_pending: false,
            next_poll: now,
        };
        app.select_active();
        app
    }

    pub fn profile_names(&self) -> Vec<&str> {
        self.state.profiles.keys().map(String::as_str).collect()
    }

    pub fn selected_name(&self) -> Option<&str> {
        self.state
            .profiles
            .keys()
            .nth(self.selected)
            .map(String::as_str)
    }

    fn select_active(&mut self) {
        let (active, _) = self.state.resolve_active();
        if let Some(index) = self.state.profiles.keys().position(|name| *name == active) {
            self.selected = index;
        }
    }

    pub fn handle_key(&mut self, key: KeyEvent) -> Action {
        if key.kind != KeyEventKind::Press {
            return Action::None;
        }
        match key.code {
            KeyCode::Char('q') | KeyCode::Esc => Action::Quit,
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => Action::Quit,
            KeyCode::Char('r') => Action::Refresh,
            KeyCode::Up | KeyCode::Char('k') => {
                self.selected = self.selected.saturating_sub(1);
                Action::None
            }
            KeyCode::Down | KeyCode::Char('j') => {
                let last = self.state.profiles.len().saturating_sub(1);
                self.selected = (self.selected + 1).min(last);
                Action::None
            }
            KeyCode::Enter => match self.selected_name() {
                Some(name) => Action::Activate(name.to_string()),
                None => Action::None,
            },
            _ => Action::None,
        }
    }

    /// Adopts a configuration written by this process or another one.
    pub fn replace_state(&mut self, state: ProfileState) {
        let keep = self.selected_name().map(str::to_string);
        self.state = state;
        match keep.and_then(|name| self.state.profiles.keys().position(|k| *k == name)) {
            Some(index) => self.selected = index,
            None => self.select_active(),
        }
    }

    /// Adopts the state written by a profile switch.
    pub fn profile_switched(&mut self, state: ProfileState) {
        self.notice = None;
        self.replace_state(state);
        self.switch_pending = true;
    }

    pub fn apply_outcome(&mut self, outcome: PollOutcome) {
        if self.switch_pending {
            self.switch_pending = false;
            // A poll already in flight at switch time still reports the old profile.
            if outcome.state.active_profile != self.state.active_profile {
                debug!(profile = %outcome.state.active_profile, "dropping outcome from before the switch");
                return;
            }
        }
        self.polling = false;
        self.replace_state(outcome.state.clone());
        self.last = Some(outcome);
    }

    /// Whether the periodic timer has fired.
    pub fn poll_due(&self, now: Instant) -> bool {
        now >= self.next_poll
    }

    /// Marks a poll as requested and restarts the interval timer.
    pub fn poll_started(&mut self, now: Instant) {
        self.polling = true;
        self.next_poll = now + self.state.poll_interval();
    }

    pub fn until_next_poll(&self, now: Instant) -> Duration {
        self.next_poll.saturating_duration_since(now)
    }

    pub fn snapshot(&self) -> Option<&UsageSnapshot> {
        self.last.as_ref().and_then(|o| o.result.as_ref().ok())
    }

    pub fn error(&self) -> Option<&PollError> {
        self.last.as_ref().and_then(|o| o.result.as_ref().err())
    }
}
