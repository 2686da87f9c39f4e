//! Speech input and output
//!
//! Capture, utterance recognition, synthesis, and the single output gate
//! that serializes everything the assistant says.

mod capture;
mod device;
mod gate;
mod playback;
mod recognizer;
mod stt;
mod tts;

pub use capture::{AudioCapture, SAMPLE_RATE, rms_energy, samples_to_wav};
pub use device::{HttpSpeechDevice, SpeechDevice};
pub use gate::{SpeechGate, SpeechJob};
pub use playback::AudioPlayback;
pub use recognizer::{Heard, MicRecognizer, Recognizer};
pub use stt::Transcriber;
pub use tts::SpeechSynth;
