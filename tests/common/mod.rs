//! Shared test fixtures

#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use hearth::db::{self, DbPool, HistoryRepo, SettingsRepo};
use hearth::speech::{SpeechDevice, SpeechGate};
use hearth::{Arbiter, Inference, Pipeline, Result, SessionHandle};

/// Create an in-memory test database
pub fn setup_test_db() -> DbPool {
    db::init_memory().expect("in-memory db")
}

/// Inference fake that echoes the query back
pub struct EchoInference;

#[async_trait]
impl Inference for EchoInference {
    async fn complete(&self, query: &str, _personality: &str) -> Result<String> {
        Ok(format!("echo: {query}"))
    }
}

/// Inference fake that returns a fixed reply
pub struct FixedInference(pub String);

#[async_trait]
impl Inference for FixedInference {
    async fn complete(&self, _query: &str, _personality: &str) -> Result<String> {
        Ok(self.0.clone())
    }
}

/// Inference fake that always fails
pub struct FailingInference;

#[async_trait]
impl Inference for FailingInference {
    async fn complete(&self, _query: &str, _personality: &str) -> Result<String> {
        Err(hearth::Error::Inference("backend down".to_string()))
    }
}

/// What a recording speech device observed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpeechCall {
    Configure { rate_wpm: u32 },
    Chunk(String),
    Wait,
}

/// Speech device fake that records every call
///
/// An optional per-chunk delay makes gate contention observable.
pub struct RecordingDevice {
    pub calls: Arc<Mutex<Vec<SpeechCall>>>,
    pub chunk_delay: Duration,
}

impl RecordingDevice {
    pub fn new() -> (Self, Arc<Mutex<Vec<SpeechCall>>>) {
        Self::with_delay(Duration::ZERO)
    }

    pub fn with_delay(chunk_delay: Duration) -> (Self, Arc<Mutex<Vec<SpeechCall>>>) {
        let calls = Arc::new(Mutex::new(Vec::new()));
        (
            Self {
                calls: Arc::clone(&calls),
                chunk_delay,
            },
            calls,
        )
    }
}

#[async_trait]
impl SpeechDevice for RecordingDevice {
    async fn configure(&mut self, rate_wpm: u32, _volume: f32) -> Result<()> {
        self.calls
            .lock()
            .unwrap()
            .push(SpeechCall::Configure { rate_wpm });
        Ok(())
    }

    async fn speak(&mut self, chunk: &str) -> Result<()> {
        if !self.chunk_delay.is_zero() {
            tokio::time::sleep(self.chunk_delay).await;
        }
        self.calls
            .lock()
            .unwrap()
            .push(SpeechCall::Chunk(chunk.to_string()));
        Ok(())
    }

    async fn wait(&mut self) -> Result<()> {
        self.calls.lock().unwrap().push(SpeechCall::Wait);
        Ok(())
    }
}

/// A fully wired arbiter over fakes, plus handles into its collaborators
pub struct Fixture {
    pub arbiter: Arc<Arbiter>,
    pub db: DbPool,
    pub settings: SettingsRepo,
    pub history: HistoryRepo,
    pub session: SessionHandle,
    pub speech_calls: Arc<Mutex<Vec<SpeechCall>>>,
}

/// Wire an arbiter around the given inference fake
pub fn setup_arbiter(inference: Arc<dyn Inference>) -> Fixture {
    let db = setup_test_db();
    let settings = SettingsRepo::new(db.clone());
    let history = HistoryRepo::new(db.clone());
    let session = SessionHandle::new();

    let (device, speech_calls) = RecordingDevice::new();
    let gate = Arc::new(SpeechGate::new(Box::new(device), 150, 0.9));

    let pipeline = Pipeline::new(
        inference,
        history.clone(),
        settings.clone(),
        session.clone(),
        gate,
    );
    let arbiter = Arc::new(Arbiter::new(session.clone(), settings.clone(), pipeline));

    Fixture {
        arbiter,
        db,
        settings,
        history,
        session,
        speech_calls,
    }
}

/// Collect every chunk from a reply stream
pub async fn collect_reply(mut rx: hearth::ReplyRx) -> Vec<String> {
    let mut chunks = Vec::new();
    while let Some(chunk) = rx.recv().await {
        chunks.push(chunk);
    }
    chunks
}
