//! Microphone utterance recognition
//!
//! Waits for speech onset, records until trailing silence, and transcribes
//! the captured audio. Runs on the main task because cpal streams aren't
//! Send.

use std::time::Duration;

use async_trait::async_trait;

use crate::Result;

use super::capture::{AudioCapture, SAMPLE_RATE, rms_energy, samples_to_wav};
use super::stt::Transcriber;

/// RMS energy above which audio counts as speech
const ENERGY_THRESHOLD: f32 = 0.03;

/// How often to poll the capture buffer
const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Trailing silence that ends an utterance
const TRAILING_SILENCE: Duration = Duration::from_millis(500);

/// Hard cap on a single utterance recording
const MAX_UTTERANCE: Duration = Duration::from_secs(10);

/// Outcome of one listen window
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Heard {
    /// Speech was transcribed successfully
    Text(String),
    /// No speech onset within the window
    NoSpeech,
    /// Audio was captured but nothing intelligible came back
    Unintelligible,
}

/// Source of spoken utterances
#[async_trait(?Send)]
pub trait Recognizer {
    /// Listen for one utterance, waiting up to `window` for speech onset
    ///
    /// # Errors
    ///
    /// Returns error if capture or transcription fails
    async fn listen(&mut self, window: Duration) -> Result<Heard>;
}

/// Recognizer backed by the default microphone and a transcription API
pub struct MicRecognizer {
    capture: AudioCapture,
    transcriber: Transcriber,
}

impl MicRecognizer {
    /// Create a new microphone recognizer
    ///
    /// # Errors
    ///
    /// Returns error if the audio device cannot be opened
    pub fn new(transcriber: Transcriber) -> Result<Self> {
        Ok(Self {
            capture: AudioCapture::new()?,
            transcriber,
        })
    }

    /// Wait up to `window` for audio energy to cross the speech threshold
    async fn wait_for_onset(&mut self, window: Duration) -> bool {
        let start = std::time::Instant::now();

        while start.elapsed() < window {
            tokio::time::sleep(POLL_INTERVAL).await;

            let samples = self.capture.take_buffer();
            if rms_energy(&samples) > ENERGY_THRESHOLD {
                return true;
            }
        }

        false
    }

    /// Record until trailing silence or the utterance cap
    async fn record_utterance(&mut self) -> Vec<f32> {
        let mut samples = Vec::new();
        let mut silence = Duration::ZERO;
        let start = std::time::Instant::now();

        while start.elapsed() < MAX_UTTERANCE {
            tokio::time::sleep(POLL_INTERVAL).await;

            let chunk = self.capture.take_buffer();
            if rms_energy(&chunk) > ENERGY_THRESHOLD {
                silence = Duration::ZERO;
            } else {
                silence += POLL_INTERVAL;
            }
            samples.extend(chunk);

            if silence >= TRAILING_SILENCE {
                break;
            }
        }

        samples
    }
}

#[async_trait(?Send)]
impl Recognizer for MicRecognizer {
    async fn listen(&mut self, window: Duration) -> Result<Heard> {
        self.capture.start()?;
        self.capture.clear_buffer();

        if !self.wait_for_onset(window).await {
            self.capture.stop();
            return Ok(Heard::NoSpeech);
        }

        let samples = self.record_utterance().await;
        self.capture.stop();

        let wav = samples_to_wav(&samples, SAMPLE_RATE)?;
        let text = self.transcriber.transcribe(wav).await?;

        if text.is_empty() {
            return Ok(Heard::Unintelligible);
        }

        tracing::debug!(text = %text, "utterance transcribed");
        Ok(Heard::Text(text))
    }
}
