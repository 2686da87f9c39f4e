//! Response pipeline
//!
//! Turns an accepted query into a reply and fans it out to two consumers:
//! a paced text stream for the caller and, when voice is enabled, the speech
//! gate. The inference call never runs under the arbitration lock.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;

use crate::db::{Exchange, HistoryRepo, SettingsRepo};
use crate::inference::Inference;
use crate::session::SessionHandle;
use crate::speech::{SpeechGate, SpeechJob};

/// Canonical greeting delivered when a trigger activates the assistant
pub const GREETING: &str = "Hello! How can I assist you today?";

/// Stream chunk size in characters
pub const STREAM_CHUNK_CHARS: usize = 50;

/// Speech chunk size in characters, large enough that sentences are not
/// pathologically fragmented for the synthesizer
pub const SPEECH_CHUNK_CHARS: usize = 500;

/// Pacing delay between emitted stream chunks
const STREAM_PACE: Duration = Duration::from_millis(50);

/// Buffered channel of reply chunks for one caller
pub type ReplyRx = mpsc::Receiver<String>;

/// Split text into fixed-size chunks on character boundaries
///
/// Concatenating the chunks in order reproduces the input exactly.
#[must_use]
pub fn chunk_text(text: &str, size: usize) -> Vec<String> {
    let size = size.max(1);
    let chars: Vec<char> = text.chars().collect();
    chars
        .chunks(size)
        .map(|chunk| chunk.iter().collect())
        .collect()
}

/// Runs queries through inference and fans replies out
#[derive(Clone)]
pub struct Pipeline {
    inference: Arc<dyn Inference>,
    history: HistoryRepo,
    settings: SettingsRepo,
    session: SessionHandle,
    gate: Arc<SpeechGate>,
}

impl Pipeline {
    /// Create a new pipeline
    #[must_use]
    pub fn new(
        inference: Arc<dyn Inference>,
        history: HistoryRepo,
        settings: SettingsRepo,
        session: SessionHandle,
        gate: Arc<SpeechGate>,
    ) -> Self {
        Self {
            inference,
            history,
            settings,
            session,
            gate,
        }
    }

    /// Run a query and return its paced reply stream
    ///
    /// The returned receiver may be dropped by callers that do not consume
    /// the text stream (voice and sensor triggers); the reply is still
    /// recorded and spoken.
    #[must_use]
    pub fn respond(&self, user_text: String) -> ReplyRx {
        let (tx, rx) = mpsc::channel(8);
        let pipeline = self.clone();

        tokio::spawn(async move {
            let personality = pipeline
                .settings
                .get()
                .map_or_else(|_| String::new(), |s| s.personality);

            let reply = match pipeline.inference.complete(&user_text, &personality).await {
                Ok(reply) => reply,
                Err(e) => {
                    tracing::error!(error = %e, query = %user_text, "inference failed");
                    format!("Error: {e}")
                }
            };

            pipeline.deliver(&user_text, &reply, &tx).await;
        });

        rx
    }

    /// Deliver the canonical greeting without consulting inference
    ///
    /// `origin` is recorded as the user side of the history exchange,
    /// e.g. "wake word" or "proximity sensor".
    #[must_use]
    pub fn greet(&self, origin: &str) -> ReplyRx {
        let (tx, rx) = mpsc::channel(8);
        let pipeline = self.clone();
        let origin = origin.to_string();

        tokio::spawn(async move {
            pipeline.deliver(&origin, GREETING, &tx).await;
        });

        rx
    }

    /// Record the exchange and fan the reply out to both emitters
    async fn deliver(&self, user_text: &str, reply: &str, tx: &mpsc::Sender<String>) {
        if let Err(e) = self.history.append(&Exchange::new(user_text, reply)) {
            tracing::error!(error = %e, "failed to append exchange to history");
        }

        self.session.note_reply(reply);

        // Paced text stream; a dropped receiver just ends emission early
        let chunks = chunk_text(reply, STREAM_CHUNK_CHARS);
        let last = chunks.len().saturating_sub(1);
        for (i, chunk) in chunks.into_iter().enumerate() {
            if tx.send(chunk).await.is_err() {
                break;
            }
            if i < last {
                tokio::time::sleep(STREAM_PACE).await;
            }
        }

        // Fresh settings read; a toggle takes effect on the next reply
        let voice_enabled = match self.settings.get() {
            Ok(settings) => settings.voice_enabled,
            Err(e) => {
                tracing::warn!(error = %e, "settings unavailable, skipping speech");
                false
            }
        };

        if voice_enabled {
            let job = SpeechJob {
                text: reply.to_string(),
                chunk_size: SPEECH_CHUNK_CHARS,
            };
            if let Err(e) = self.gate.speak(&job).await {
                tracing::error!(error = %e, "speech output failed");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chunk_text_round_trip() {
        let text = "The quick brown fox jumps over the lazy dog, twice over.";
        for size in [1, 3, 50, 500] {
            let chunks = chunk_text(text, size);
            assert_eq!(chunks.concat(), text);
        }
    }

    #[test]
    fn test_chunk_text_sizes() {
        let chunks = chunk_text("abcdefgh", 3);
        assert_eq!(chunks, vec!["abc", "def", "gh"]);
    }

    #[test]
    fn test_chunk_text_multibyte() {
        let text = "héllo wörld — ça va";
        let chunks = chunk_text(text, 4);
        assert_eq!(chunks.concat(), text);
    }

    #[test]
    fn test_chunk_text_empty() {
        assert!(chunk_text("", 50).is_empty());
    }
}
