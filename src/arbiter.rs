//! Activation arbitration
//!
//! The arbiter is the single entry point through which concurrent trigger
//! sources reach the session. Each event is decided under one lock with a
//! fresh settings snapshot; the resulting pipeline run happens after the
//! lock is released.

use std::time::Duration;

use crate::db::{Settings, SettingsRepo};
use crate::pipeline::{Pipeline, ReplyRx};
use crate::session::{SessionHandle, SessionSnapshot, SessionState, TriggerEvent};

/// Near edge of the proximity activation band, in centimeters
pub const PROXIMITY_NEAR_CM: f32 = 10.0;

/// Far edge of the proximity activation band, in centimeters
pub const PROXIMITY_FAR_CM: f32 = 50.0;

/// What the arbiter decided to do with an event, resolved under the lock
enum Action {
    Greet(&'static str),
    Respond(String),
    Ignore,
}

/// Serialized decision point for all trigger events
pub struct Arbiter {
    session: SessionHandle,
    settings: SettingsRepo,
    pipeline: Pipeline,
}

impl Arbiter {
    /// Create a new arbiter
    #[must_use]
    pub const fn new(session: SessionHandle, settings: SettingsRepo, pipeline: Pipeline) -> Self {
        Self {
            session,
            settings,
            pipeline,
        }
    }

    /// Process one trigger event
    ///
    /// Returns the reply stream when the event produced a pipeline run.
    /// Callers that have no use for the text stream may drop the receiver;
    /// history and speech still happen.
    #[must_use]
    pub fn dispatch(&self, event: TriggerEvent) -> Option<ReplyRx> {
        let settings = self.fresh_settings();
        let timeout = Duration::from_secs(settings.activation_timeout_secs);

        let action = {
            let mut session = self.session.lock();
            // Lazy timeout: an expired session goes Idle before the event
            // is interpreted, so a stale utterance must re-satisfy the wake
            // condition.
            session.expire_if_stale(timeout);

            match event {
                TriggerEvent::WakeWordHeard { utterance } => match session.state() {
                    SessionState::Idle => {
                        if contains_wake_word(&utterance, &settings.wake_word) {
                            session.activate();
                            tracing::info!(utterance = %utterance, "wake word detected, assistant activated");
                            Action::Greet("wake word")
                        } else {
                            Action::Ignore
                        }
                    }
                    // The listener classified against a stale snapshot;
                    // while active every utterance is a query.
                    SessionState::Active => {
                        session.set_line(format!("You said: {utterance}"));
                        session.touch();
                        Action::Respond(utterance)
                    }
                },

                TriggerEvent::UtteranceHeard { utterance } => match session.state() {
                    SessionState::Active => {
                        session.set_line(format!("You said: {utterance}"));
                        session.touch();
                        Action::Respond(utterance)
                    }
                    SessionState::Idle => Action::Ignore,
                },

                TriggerEvent::ProximityEngaged { distance_cm } => {
                    if !settings.sensor_enabled
                        || !(PROXIMITY_NEAR_CM..=PROXIMITY_FAR_CM).contains(&distance_cm)
                    {
                        Action::Ignore
                    } else {
                        match session.state() {
                            SessionState::Idle => {
                                session.activate();
                                tracing::info!(distance_cm, "proximity trigger, assistant activated");
                                Action::Greet("proximity sensor")
                            }
                            // Repeated in-band readings refresh the clock
                            // but never re-trigger the greeting.
                            SessionState::Active => {
                                session.touch();
                                Action::Ignore
                            }
                        }
                    }
                }

                // Direct text bypasses wake gating entirely.
                TriggerEvent::DirectText { text } => {
                    if session.state() == SessionState::Active {
                        session.set_line(format!("You said: {text}"));
                        session.touch();
                    }
                    Action::Respond(text)
                }
            }
        };

        match action {
            Action::Greet(origin) => Some(self.pipeline.greet(origin)),
            Action::Respond(text) => Some(self.pipeline.respond(text)),
            Action::Ignore => None,
        }
    }

    /// Whether the session is active right now (lazy expiry applied)
    #[must_use]
    pub fn is_active(&self) -> bool {
        let settings = self.fresh_settings();
        self.session
            .is_active(Duration::from_secs(settings.activation_timeout_secs))
    }

    /// Observer view of the session (lazy expiry applied)
    #[must_use]
    pub fn snapshot(&self) -> SessionSnapshot {
        let settings = self.fresh_settings();
        self.session
            .snapshot(Duration::from_secs(settings.activation_timeout_secs))
    }

    /// Settings are re-read for every decision; a missing store falls back
    /// to defaults rather than stalling the event loop.
    fn fresh_settings(&self) -> Settings {
        self.settings.get().unwrap_or_else(|e| {
            tracing::warn!(error = %e, "settings unavailable, using defaults");
            Settings::default()
        })
    }
}

/// Case-insensitive substring match for the wake word
fn contains_wake_word(utterance: &str, wake_word: &str) -> bool {
    !wake_word.is_empty() && utterance.to_lowercase().contains(&wake_word.to_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wake_word_match_is_case_insensitive() {
        assert!(contains_wake_word("Hello there", "hello"));
        assert!(contains_wake_word("well HELLO friend", "Hello"));
        assert!(!contains_wake_word("goodbye", "hello"));
    }

    #[test]
    fn test_empty_wake_word_never_matches() {
        assert!(!contains_wake_word("anything", ""));
    }

    #[test]
    fn test_proximity_band_is_inclusive() {
        assert!((PROXIMITY_NEAR_CM..=PROXIMITY_FAR_CM).contains(&10.0));
        assert!((PROXIMITY_NEAR_CM..=PROXIMITY_FAR_CM).contains(&50.0));
        assert!(!(PROXIMITY_NEAR_CM..=PROXIMITY_FAR_CM).contains(&5.0));
        assert!(!(PROXIMITY_NEAR_CM..=PROXIMITY_FAR_CM).contains(&60.0));
    }
}
