//! Daemon orchestration
//!
//! Wires the database, arbiter, pipeline, trigger workers, and API server
//! together and runs them until shutdown. The voice loop runs on the main
//! task because cpal streams aren't Send.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::api::ApiServerBuilder;
use crate::arbiter::Arbiter;
use crate::config::Config;
use crate::db::{self, DbPool, HistoryRepo, SettingsRepo};
use crate::inference::OpenAiInference;
use crate::pipeline::Pipeline;
use crate::session::SessionHandle;
use crate::speech::{HttpSpeechDevice, MicRecognizer, SpeechGate, SpeechSynth, Transcriber};
use crate::triggers::{SensorWorker, SerialDistanceSource, VoiceListener};
use crate::{Error, Result};

/// The assistant daemon
pub struct Daemon {
    config: Config,
    db: DbPool,
}

impl Daemon {
    /// Create a new daemon, opening the database in the data directory
    ///
    /// # Errors
    ///
    /// Returns error if the database cannot be opened or migrated
    pub fn new(config: Config) -> Result<Self> {
        let db_path = config.data_dir.join("hearth.db");
        let db = db::init(&db_path)?;

        tracing::info!(path = %db_path.display(), "database ready");

        Ok(Self { config, db })
    }

    /// Run the daemon until Ctrl-C or a kill request
    ///
    /// # Errors
    ///
    /// Returns error if a required component fails to initialize
    #[allow(clippy::future_not_send)]
    pub async fn run(self) -> Result<()> {
        let api_key = self
            .config
            .openai_api_key
            .clone()
            .ok_or_else(|| Error::Config("OPENAI_API_KEY is required".to_string()))?;

        let settings = SettingsRepo::new(self.db.clone());
        let history = HistoryRepo::new(self.db.clone());
        let session = SessionHandle::new();

        let inference = Arc::new(OpenAiInference::new(
            api_key.clone(),
            self.config.openai_base_url.clone(),
            self.config.llm_model.clone(),
        )?);

        let synth = SpeechSynth::new(
            api_key.clone(),
            self.config.openai_base_url.clone(),
            self.config.voice.tts_model.clone(),
            self.config.voice.tts_voice.clone(),
        )?;
        let gate = Arc::new(SpeechGate::new(
            Box::new(HttpSpeechDevice::new(synth)),
            self.config.voice.tts_rate,
            self.config.voice.tts_volume,
        ));

        let pipeline = Pipeline::new(
            inference,
            history,
            settings.clone(),
            session.clone(),
            gate,
        );
        let arbiter = Arc::new(Arbiter::new(session, settings, pipeline));

        let shutdown = CancellationToken::new();

        // Ctrl-C cancels the same token /api/kill does
        {
            let shutdown = shutdown.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    tracing::info!("received Ctrl-C, shutting down");
                    shutdown.cancel();
                }
            });
        }

        // Sensor worker, when enabled and the serial port opens
        let (sensor_worker, distance_rx) = SensorWorker::new(
            Arc::clone(&arbiter),
            Duration::from_millis(self.config.sensor.poll_interval_ms),
            shutdown.clone(),
        );
        let sensor_handle = if self.config.sensor.enabled {
            match SerialDistanceSource::open(
                &self.config.sensor.serial_port,
                self.config.sensor.baud_rate,
            ) {
                Ok(source) => {
                    tracing::info!(
                        port = %self.config.sensor.serial_port,
                        baud = self.config.sensor.baud_rate,
                        "proximity sensor connected"
                    );
                    Some(tokio::spawn(sensor_worker.run(Box::new(source))))
                }
                Err(e) => {
                    tracing::warn!(error = %e, "sensor unavailable, continuing without it");
                    None
                }
            }
        } else {
            None
        };

        let api_handle = ApiServerBuilder::new(
            self.db.clone(),
            Arc::clone(&arbiter),
            self.config.api_port,
            distance_rx,
            shutdown.clone(),
        )
        .build()
        .spawn();

        // Voice loop runs here on the main task
        if self.config.voice.enabled {
            match Transcriber::new(
                api_key,
                self.config.openai_base_url.clone(),
                self.config.voice.stt_model.clone(),
            )
            .and_then(MicRecognizer::new)
            {
                Ok(recognizer) => {
                    VoiceListener::new(
                        Arc::clone(&arbiter),
                        Box::new(recognizer),
                        Duration::from_secs(self.config.voice.listen_window_secs),
                        shutdown.clone(),
                    )
                    .run()
                    .await;
                }
                Err(e) => {
                    tracing::warn!(error = %e, "voice unavailable, continuing without it");
                    shutdown.cancelled().await;
                }
            }
        } else {
            shutdown.cancelled().await;
        }

        // Drain workers before exit
        if let Some(handle) = sensor_handle
            && let Err(e) = handle.await
        {
            tracing::error!(error = %e, "sensor worker join failed");
        }
        match api_handle.await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => tracing::error!(error = %e, "API server exited with error"),
            Err(e) => tracing::error!(error = %e, "API server join failed"),
        }

        tracing::info!("daemon stopped");
        Ok(())
    }
}
