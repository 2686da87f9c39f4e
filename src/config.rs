//! Configuration management for the hearth daemon

use std::path::PathBuf;

use serde::Deserialize;

use crate::Result;

/// Hearth daemon configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Path to data directory (database, cache, etc)
    pub data_dir: PathBuf,

    /// HTTP API server port
    pub api_port: u16,

    /// Voice configuration
    pub voice: VoiceConfig,

    /// Proximity sensor configuration
    pub sensor: SensorConfig,

    /// `OpenAI`-compatible API key for STT/TTS/chat
    pub openai_api_key: Option<String>,

    /// Base URL for the `OpenAI`-compatible API
    pub openai_base_url: String,

    /// LLM model identifier for chat completions
    pub llm_model: String,
}

/// Voice processing configuration
#[derive(Debug, Clone)]
pub struct VoiceConfig {
    /// Enable voice capture (wake word listening)
    pub enabled: bool,

    /// STT model (e.g. "whisper-1")
    pub stt_model: String,

    /// TTS model (e.g. "tts-1")
    pub tts_model: String,

    /// TTS voice identifier
    pub tts_voice: String,

    /// Speech rate in words per minute
    pub tts_rate: u32,

    /// Playback volume, 0.0 to 1.0
    pub tts_volume: f32,

    /// Bounded wait for one utterance window, in seconds
    pub listen_window_secs: u64,
}

impl Default for VoiceConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            stt_model: "whisper-1".to_string(),
            tts_model: "tts-1".to_string(),
            tts_voice: "alloy".to_string(),
            tts_rate: 150,
            tts_volume: 0.9,
            listen_window_secs: 5,
        }
    }
}

/// Proximity sensor configuration
#[derive(Debug, Clone)]
pub struct SensorConfig {
    /// Enable the sensor poller worker
    pub enabled: bool,

    /// Serial device path (e.g. "/dev/ttyACM0")
    pub serial_port: String,

    /// Serial baud rate
    pub baud_rate: u32,

    /// Pause between readings, in milliseconds
    pub poll_interval_ms: u64,
}

impl Default for SensorConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            serial_port: "/dev/ttyACM0".to_string(),
            baud_rate: 9600,
            poll_interval_ms: 100,
        }
    }
}

/// Optional config file contents (`config.toml` in the data directory)
#[derive(Debug, Default, Deserialize)]
struct FileConfig {
    api_port: Option<u16>,
    openai_base_url: Option<String>,
    llm_model: Option<String>,
    stt_model: Option<String>,
    tts_model: Option<String>,
    tts_voice: Option<String>,
    tts_rate: Option<u32>,
    tts_volume: Option<f32>,
    listen_window_secs: Option<u64>,
    serial_port: Option<String>,
    baud_rate: Option<u32>,
    poll_interval_ms: Option<u64>,
}

/// Return the default data directory, creating it if needed
///
/// Uses `~/.local/share/hearth` on Linux
#[must_use]
pub fn default_data_dir() -> PathBuf {
    let data_dir = directories::ProjectDirs::from("dev", "hearth", "hearth")
        .map_or_else(|| PathBuf::from(".hearth"), |d| d.data_dir().to_path_buf());

    if let Err(e) = std::fs::create_dir_all(&data_dir) {
        tracing::warn!(path = %data_dir.display(), error = %e, "failed to create data directory");
    }

    data_dir
}

impl Config {
    /// Load configuration from the data directory and environment
    ///
    /// Precedence: environment variables override `config.toml`, which
    /// overrides built-in defaults.
    ///
    /// # Errors
    ///
    /// Returns error if an existing config file cannot be parsed
    pub fn load(data_dir: Option<PathBuf>, disable_voice: bool, disable_sensor: bool) -> Result<Self> {
        let data_dir = data_dir.unwrap_or_else(default_data_dir);

        let file = Self::load_file(&data_dir)?;

        let voice_defaults = VoiceConfig::default();
        let voice = VoiceConfig {
            enabled: !disable_voice,
            stt_model: env_or("HEARTH_STT_MODEL", file.stt_model, voice_defaults.stt_model),
            tts_model: env_or("HEARTH_TTS_MODEL", file.tts_model, voice_defaults.tts_model),
            tts_voice: env_or("HEARTH_TTS_VOICE", file.tts_voice, voice_defaults.tts_voice),
            tts_rate: env_parse_or("HEARTH_TTS_RATE", file.tts_rate, voice_defaults.tts_rate),
            tts_volume: env_parse_or("HEARTH_TTS_VOLUME", file.tts_volume, voice_defaults.tts_volume),
            listen_window_secs: env_parse_or(
                "HEARTH_LISTEN_WINDOW_SECS",
                file.listen_window_secs,
                voice_defaults.listen_window_secs,
            ),
        };

        let sensor_defaults = SensorConfig::default();
        let sensor = SensorConfig {
            enabled: !disable_sensor,
            serial_port: env_or("HEARTH_SERIAL_PORT", file.serial_port, sensor_defaults.serial_port),
            baud_rate: env_parse_or("HEARTH_BAUD_RATE", file.baud_rate, sensor_defaults.baud_rate),
            poll_interval_ms: env_parse_or(
                "HEARTH_SENSOR_POLL_MS",
                file.poll_interval_ms,
                sensor_defaults.poll_interval_ms,
            ),
        };

        if disable_voice {
            tracing::info!("voice explicitly disabled via --disable-voice");
        }
        if disable_sensor {
            tracing::info!("sensor explicitly disabled via --disable-sensor");
        }

        Ok(Self {
            data_dir,
            api_port: env_parse_or("HEARTH_API_PORT", file.api_port, 5000),
            voice,
            sensor,
            openai_api_key: std::env::var("OPENAI_API_KEY").ok(),
            openai_base_url: env_or(
                "HEARTH_OPENAI_BASE_URL",
                file.openai_base_url,
                "https://api.openai.com/v1".to_string(),
            ),
            llm_model: env_or("HEARTH_LLM_MODEL", file.llm_model, "gpt-4o-mini".to_string()),
        })
    }

    /// Parse `config.toml` in the data directory, if present
    fn load_file(data_dir: &std::path::Path) -> Result<FileConfig> {
        let path = data_dir.join("config.toml");
        if !path.exists() {
            return Ok(FileConfig::default());
        }

        let contents = std::fs::read_to_string(&path)?;
        let file: FileConfig = toml::from_str(&contents)?;
        tracing::debug!(path = %path.display(), "loaded config file");
        Ok(file)
    }
}

fn env_or(var: &str, file_value: Option<String>, default: String) -> String {
    std::env::var(var).ok().or(file_value).unwrap_or(default)
}

fn env_parse_or<T: std::str::FromStr>(var: &str, file_value: Option<T>, default: T) -> T {
    std::env::var(var)
        .ok()
        .and_then(|s| s.parse().ok())
        .or(file_value)
        .unwrap_or(default)
}
