//! Voice trigger loop

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::arbiter::Arbiter;
use crate::session::TriggerEvent;
use crate::speech::{Heard, Recognizer};

/// Pause after a recognition error before listening again
const ERROR_BACKOFF: Duration = Duration::from_secs(2);

/// Listens for utterances and forwards them to the arbiter
///
/// Runs on the main task because cpal streams aren't Send. The utterance
/// is classified against the session state at the moment it is heard: a
/// dormant session treats it as a wake word candidate, an active session
/// treats it as a query.
pub struct VoiceListener {
    arbiter: Arc<Arbiter>,
    recognizer: Box<dyn Recognizer>,
    listen_window: Duration,
    shutdown: CancellationToken,
}

impl VoiceListener {
    /// Create a new voice listener
    #[must_use]
    pub fn new(
        arbiter: Arc<Arbiter>,
        recognizer: Box<dyn Recognizer>,
        listen_window: Duration,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            arbiter,
            recognizer,
            listen_window,
            shutdown,
        }
    }

    /// Run the listen loop until shutdown
    #[allow(clippy::future_not_send)]
    pub async fn run(mut self) {
        tracing::info!("voice listener started");

        loop {
            let heard = tokio::select! {
                () = self.shutdown.cancelled() => break,
                result = self.recognizer.listen(self.listen_window) => result,
            };

            match heard {
                Ok(Heard::Text(utterance)) => {
                    let event = if self.arbiter.is_active() {
                        TriggerEvent::UtteranceHeard { utterance }
                    } else {
                        TriggerEvent::WakeWordHeard { utterance }
                    };
                    // Replies are spoken through the gate; the text stream
                    // has no consumer here.
                    drop(self.arbiter.dispatch(event));
                }
                Ok(Heard::NoSpeech) => {}
                Ok(Heard::Unintelligible) => {
                    tracing::debug!("utterance was unintelligible, ignoring");
                }
                Err(e) => {
                    tracing::warn!(error = %e, "voice recognition failed");
                    tokio::select! {
                        () = self.shutdown.cancelled() => break,
                        () = tokio::time::sleep(ERROR_BACKOFF) => {}
                    }
                }
            }
        }

        tracing::info!("voice listener stopped");
    }
}
