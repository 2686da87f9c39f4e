//! Speech output gate
//!
//! There is one audio output. The gate wraps it in a mutex so whole replies
//! are spoken back to back: every chunk of one reply is submitted before any
//! chunk of the next. The guard is released on every exit path, so a failed
//! synthesis never deadlocks later replies.

use tokio::sync::Mutex;

use crate::Result;
use crate::pipeline::chunk_text;

use super::SpeechDevice;

/// One reply to speak, pre-chunked by the gate holder
#[derive(Debug, Clone)]
pub struct SpeechJob {
    pub text: String,
    pub chunk_size: usize,
}

/// Mutual exclusion over the single speech device
pub struct SpeechGate {
    device: Mutex<Box<dyn SpeechDevice>>,
    rate_wpm: u32,
    volume: f32,
}

impl SpeechGate {
    /// Wrap a speech device behind the gate
    #[must_use]
    pub fn new(device: Box<dyn SpeechDevice>, rate_wpm: u32, volume: f32) -> Self {
        Self {
            device: Mutex::new(device),
            rate_wpm,
            volume,
        }
    }

    /// Speak one reply to completion
    ///
    /// Blocks until the gate is free, configures the device, then submits
    /// chunks in order. Acquisition order across contending replies is not
    /// FIFO; only mutual exclusion is guaranteed.
    ///
    /// # Errors
    ///
    /// Returns error if configuration or synthesis fails. The gate itself
    /// is always released.
    pub async fn speak(&self, job: &SpeechJob) -> Result<()> {
        let mut device = self.device.lock().await;

        // Configuration precedes synthesis within each acquisition; the
        // device may re-initialize per hold.
        device.configure(self.rate_wpm, self.volume).await?;

        for chunk in chunk_text(&job.text, job.chunk_size) {
            device.speak(&chunk).await?;
        }

        device.wait().await
    }
}
