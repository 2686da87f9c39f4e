//! Session state shared between the arbiter, the pipeline, and observers
//!
//! The session triple (state, last activity, current status line) is only
//! mutated through [`SessionHandle`], which serializes access behind one lock.
//! Timeout expiry is lazy: it happens when the session is next touched or
//! observed, never on a background timer.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde::Serialize;
use tokio::time::Instant;

/// Whether the assistant is engaged with a user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionState {
    /// Waiting for a wake word or proximity trigger
    Idle,
    /// Engaged; utterances are treated as queries
    Active,
}

/// A trigger event produced by one of the input sources
#[derive(Debug, Clone)]
pub enum TriggerEvent {
    /// Voice heard while idle; may contain the wake word
    WakeWordHeard { utterance: String },
    /// Voice heard while active; treated as a query
    UtteranceHeard { utterance: String },
    /// Fresh proximity reading, in centimeters
    ProximityEngaged { distance_cm: f32 },
    /// Text submitted through the HTTP endpoint; bypasses wake gating
    DirectText { text: String },
}

/// Process-lifetime session record
#[derive(Debug)]
pub struct Session {
    state: SessionState,
    last_activity: Instant,
    current_line: String,
}

impl Session {
    fn new() -> Self {
        Self {
            state: SessionState::Idle,
            last_activity: Instant::now(),
            current_line: String::new(),
        }
    }

    /// Current state, without expiry evaluation
    #[must_use]
    pub const fn state(&self) -> SessionState {
        self.state
    }

    /// Latest human-readable status line
    #[must_use]
    pub fn current_line(&self) -> &str {
        &self.current_line
    }

    /// Transition to Idle if the activation timeout has elapsed
    ///
    /// Returns true if the session expired on this call.
    pub fn expire_if_stale(&mut self, timeout: Duration) -> bool {
        if self.state == SessionState::Active && self.last_activity.elapsed() >= timeout {
            self.state = SessionState::Idle;
            tracing::info!("session deactivated after timeout");
            return true;
        }
        false
    }

    /// Transition to Active and reset the activity clock
    pub fn activate(&mut self) {
        self.state = SessionState::Active;
        self.last_activity = Instant::now();
    }

    /// Reset the activity clock without changing state
    pub fn touch(&mut self) {
        self.last_activity = Instant::now();
    }

    /// Replace the status line
    pub fn set_line(&mut self, line: impl Into<String>) {
        self.current_line = line.into();
    }
}

/// Point-in-time view of the session for observers
#[derive(Debug, Clone, Serialize)]
pub struct SessionSnapshot {
    pub state: SessionState,
    pub current_line: String,
}

/// Shared, lock-guarded session
#[derive(Clone)]
pub struct SessionHandle {
    inner: Arc<Mutex<Session>>,
}

impl Default for SessionHandle {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionHandle {
    /// Create a fresh idle session
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(Session::new())),
        }
    }

    /// Lock the session for a transition decision
    ///
    /// Callers must not hold the guard across an await point.
    pub(crate) fn lock(&self) -> std::sync::MutexGuard<'_, Session> {
        self.inner.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    /// Observe the session, evaluating lazy expiry first
    #[must_use]
    pub fn snapshot(&self, timeout: Duration) -> SessionSnapshot {
        let mut session = self.lock();
        session.expire_if_stale(timeout);
        SessionSnapshot {
            state: session.state,
            current_line: session.current_line.clone(),
        }
    }

    /// Whether the session is currently active, evaluating lazy expiry first
    #[must_use]
    pub fn is_active(&self, timeout: Duration) -> bool {
        self.snapshot(timeout).state == SessionState::Active
    }

    /// Record a delivered reply: update the status line and activity clock
    pub fn note_reply(&self, assistant_text: &str) {
        let mut session = self.lock();
        session.set_line(format!("Assistant: {assistant_text}"));
        session.touch();
    }
}
