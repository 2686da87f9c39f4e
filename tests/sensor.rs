//! Sensor worker integration tests

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use hearth::Result;
use hearth::triggers::{DistanceSource, SensorWorker};

mod common;
use common::{EchoInference, setup_arbiter};

/// Plays back a fixed list of readings, then requests shutdown
struct ScriptedSource {
    readings: VecDeque<Result<Option<f32>>>,
    shutdown: CancellationToken,
}

impl DistanceSource for ScriptedSource {
    fn read_distance(&mut self) -> Result<Option<f32>> {
        match self.readings.pop_front() {
            Some(reading) => reading,
            None => {
                self.shutdown.cancel();
                Ok(None)
            }
        }
    }
}

#[tokio::test]
async fn sensor_readings_reach_the_arbiter_and_the_feed() {
    let fx = setup_arbiter(Arc::new(EchoInference));
    let shutdown = CancellationToken::new();

    let source = ScriptedSource {
        readings: VecDeque::from([Ok(Some(60.0)), Ok(None), Ok(Some(30.0)), Ok(Some(5.0))]),
        shutdown: shutdown.clone(),
    };

    let (worker, distance_rx) = SensorWorker::new(
        Arc::clone(&fx.arbiter),
        Duration::from_millis(1),
        shutdown.clone(),
    );

    tokio::time::timeout(Duration::from_secs(5), worker.run(Box::new(source)))
        .await
        .expect("worker should stop once the script runs out");

    // Every reading is published; only the in-band one activated
    assert_eq!(*distance_rx.borrow(), Some(5.0));
    assert!(fx.arbiter.is_active());

    // Exactly one greeting was recorded for the whole script
    let mut waited = 0;
    while fx.history.count().unwrap() == 0 && waited < 100 {
        tokio::time::sleep(Duration::from_millis(20)).await;
        waited += 1;
    }
    let recent = fx.history.recent(10).unwrap();
    assert_eq!(recent.len(), 1);
    assert_eq!(recent[0].user_text, "proximity sensor");
}

#[tokio::test]
async fn sensor_worker_stops_on_shutdown() {
    let fx = setup_arbiter(Arc::new(EchoInference));
    let shutdown = CancellationToken::new();

    let source = ScriptedSource {
        readings: VecDeque::from([Ok(Some(80.0))]),
        shutdown: CancellationToken::new(),
    };

    let (worker, _distance_rx) = SensorWorker::new(
        Arc::clone(&fx.arbiter),
        Duration::from_millis(1),
        shutdown.clone(),
    );

    let handle = tokio::spawn(worker.run(Box::new(source)));
    shutdown.cancel();

    tokio::time::timeout(Duration::from_secs(5), handle)
        .await
        .expect("worker should exit promptly after cancel")
        .unwrap();
}
