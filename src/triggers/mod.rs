//! Trigger sources
//!
//! Each trigger source watches one input channel and forwards activation
//! events to the arbiter. Sources are independent: a failure in one never
//! takes down another.

mod sensor;
mod voice;

pub use sensor::{DistanceSource, SensorWorker, SerialDistanceSource};
pub use voice::VoiceListener;
