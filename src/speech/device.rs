//! Speech output device abstraction

use async_trait::async_trait;

use crate::{Error, Result};

use super::playback::{AudioPlayback, decode_mp3};
use super::tts::SpeechSynth;

/// Words-per-minute rate treated as 1.0x synthesis speed
const BASELINE_RATE_WPM: f64 = 150.0;

/// The one physical speech output
///
/// `configure` calls within an acquisition happen before the `speak` calls
/// that follow; `wait` completes once everything submitted has played out.
#[async_trait]
pub trait SpeechDevice: Send {
    /// Apply rate and volume before synthesis
    ///
    /// # Errors
    ///
    /// Returns error if the device rejects the configuration
    async fn configure(&mut self, rate_wpm: u32, volume: f32) -> Result<()>;

    /// Synthesize and play one chunk
    ///
    /// # Errors
    ///
    /// Returns error if synthesis or playback fails
    async fn speak(&mut self, chunk: &str) -> Result<()>;

    /// Block until submitted audio has finished playing
    ///
    /// # Errors
    ///
    /// Returns error if the device fails while draining
    async fn wait(&mut self) -> Result<()>;
}

/// HTTP TTS synthesis played through the default output device
///
/// The playback stream is opened fresh for each chunk, so the device fully
/// re-initializes per gate acquisition.
pub struct HttpSpeechDevice {
    synth: SpeechSynth,
    speed: f64,
    volume: f32,
}

impl HttpSpeechDevice {
    /// Create a new device around a synthesis client
    #[must_use]
    pub const fn new(synth: SpeechSynth) -> Self {
        Self {
            synth,
            speed: 1.0,
            volume: 1.0,
        }
    }
}

#[async_trait]
impl SpeechDevice for HttpSpeechDevice {
    async fn configure(&mut self, rate_wpm: u32, volume: f32) -> Result<()> {
        self.speed = (f64::from(rate_wpm) / BASELINE_RATE_WPM).clamp(0.25, 4.0);
        self.volume = volume.clamp(0.0, 1.0);
        Ok(())
    }

    async fn speak(&mut self, chunk: &str) -> Result<()> {
        let mp3 = self.synth.synthesize(chunk, self.speed).await?;

        let volume = self.volume;
        tokio::task::spawn_blocking(move || {
            let mut samples = decode_mp3(&mp3)?;
            for sample in &mut samples {
                *sample *= volume;
            }
            AudioPlayback::new()?.play_blocking(&samples)
        })
        .await
        .map_err(|e| Error::Audio(format!("playback task failed: {e}")))?
    }

    async fn wait(&mut self) -> Result<()> {
        // Playback is synchronous per chunk; nothing left in flight
        Ok(())
    }
}
