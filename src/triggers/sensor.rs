//! Proximity sensor trigger loop

use std::io::{BufRead, BufReader};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use crate::arbiter::Arbiter;
use crate::session::TriggerEvent;
use crate::{Error, Result};

/// Pause after a sensor read failure before retrying
const READ_BACKOFF: Duration = Duration::from_secs(2);

/// Serial open timeout
const SERIAL_TIMEOUT: Duration = Duration::from_millis(500);

/// Blocking source of distance readings
pub trait DistanceSource: Send {
    /// Read the next distance in centimeters
    ///
    /// Returns `None` when no fresh reading is available yet.
    ///
    /// # Errors
    ///
    /// Returns error if the underlying device fails
    fn read_distance(&mut self) -> Result<Option<f32>>;
}

/// Distance readings from a serial-attached ultrasonic sensor
///
/// The device writes one decimal centimeter value per line.
pub struct SerialDistanceSource {
    reader: BufReader<Box<dyn serialport::SerialPort>>,
    line: String,
}

impl SerialDistanceSource {
    /// Open the serial port
    ///
    /// # Errors
    ///
    /// Returns error if the port cannot be opened
    pub fn open(port: &str, baud_rate: u32) -> Result<Self> {
        let port = serialport::new(port, baud_rate)
            .timeout(SERIAL_TIMEOUT)
            .open()
            .map_err(|e| Error::Sensor(format!("failed to open serial port: {e}")))?;

        Ok(Self {
            reader: BufReader::new(port),
            line: String::new(),
        })
    }
}

impl DistanceSource for SerialDistanceSource {
    fn read_distance(&mut self) -> Result<Option<f32>> {
        self.line.clear();
        match self.reader.read_line(&mut self.line) {
            Ok(0) => Err(Error::Sensor("serial port closed".to_string())),
            Ok(_) => Ok(parse_reading(&self.line)),
            // A timeout just means no reading arrived within the window
            Err(e) if e.kind() == std::io::ErrorKind::TimedOut => Ok(None),
            Err(e) => Err(Error::Sensor(format!("serial read failed: {e}"))),
        }
    }
}

/// Parse one line of sensor output, warning on non-numeric data
fn parse_reading(line: &str) -> Option<f32> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return None;
    }
    match trimmed.parse::<f32>() {
        Ok(distance) => Some(distance),
        Err(_) => {
            tracing::warn!(line = %trimmed, "discarding unparseable sensor data");
            None
        }
    }
}

/// Polls a distance source and forwards readings to the arbiter
///
/// Every parsed reading is published on a watch channel for observers;
/// the arbiter decides which readings actually activate the assistant.
pub struct SensorWorker {
    arbiter: Arc<Arbiter>,
    poll_interval: Duration,
    distance_tx: watch::Sender<Option<f32>>,
    shutdown: CancellationToken,
}

impl SensorWorker {
    /// Create a new sensor worker and the receiver side of its distance feed
    #[must_use]
    pub fn new(
        arbiter: Arc<Arbiter>,
        poll_interval: Duration,
        shutdown: CancellationToken,
    ) -> (Self, watch::Receiver<Option<f32>>) {
        let (distance_tx, distance_rx) = watch::channel(None);
        (
            Self {
                arbiter,
                poll_interval,
                distance_tx,
                shutdown,
            },
            distance_rx,
        )
    }

    /// Run the poll loop until shutdown
    ///
    /// The source is moved into `spawn_blocking` for each read and handed
    /// back, since serial reads block.
    pub async fn run(self, mut source: Box<dyn DistanceSource>) {
        tracing::info!("sensor worker started");

        loop {
            let (returned, reading) = tokio::select! {
                () = self.shutdown.cancelled() => break,
                result = tokio::task::spawn_blocking(move || {
                    let reading = source.read_distance();
                    (source, reading)
                }) => match result {
                    Ok(pair) => pair,
                    Err(e) => {
                        tracing::error!(error = %e, "sensor read task failed");
                        break;
                    }
                },
            };
            source = returned;

            match reading {
                Ok(Some(distance_cm)) => {
                    tracing::trace!(distance_cm, "distance reading");
                    if self.distance_tx.send(Some(distance_cm)).is_err() {
                        tracing::debug!("distance feed closed");
                    }
                    drop(self.arbiter.dispatch(TriggerEvent::ProximityEngaged {
                        distance_cm,
                    }));
                }
                Ok(None) => {}
                Err(e) => {
                    tracing::warn!(error = %e, "sensor read failed, backing off");
                    tokio::select! {
                        () = self.shutdown.cancelled() => break,
                        () = tokio::time::sleep(READ_BACKOFF) => {}
                    }
                    continue;
                }
            }

            tokio::select! {
                () = self.shutdown.cancelled() => break,
                () = tokio::time::sleep(self.poll_interval) => {}
            }
        }

        tracing::info!("sensor worker stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_reading_accepts_decimal_centimeters() {
        assert_eq!(parse_reading("25.5\r\n"), Some(25.5));
        assert_eq!(parse_reading("30"), Some(30.0));
    }

    #[test]
    fn test_parse_reading_discards_noise() {
        assert_eq!(parse_reading("distance: 25"), None);
        assert_eq!(parse_reading(""), None);
        assert_eq!(parse_reading("\r\n"), None);
    }
}
