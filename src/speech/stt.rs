//! Speech-to-text transcription client

use crate::{Error, Result};

/// Transcribes audio via an `OpenAI`-compatible Whisper API
pub struct Transcriber {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
}

impl Transcriber {
    /// Create a new transcription client
    ///
    /// # Errors
    ///
    /// Returns error if the API key is missing
    pub fn new(api_key: String, base_url: String, model: String) -> Result<Self> {
        if api_key.is_empty() {
            return Err(Error::Config("OpenAI API key required for STT".to_string()));
        }

        Ok(Self {
            client: reqwest::Client::new(),
            api_key,
            base_url,
            model,
        })
    }

    /// Transcribe WAV audio bytes to text
    ///
    /// # Errors
    ///
    /// Returns error if transcription fails
    pub async fn transcribe(&self, wav_data: Vec<u8>) -> Result<String> {
        #[derive(serde::Deserialize)]
        struct TranscriptionResponse {
            text: String,
        }

        let part = reqwest::multipart::Part::bytes(wav_data)
            .file_name("audio.wav")
            .mime_str("audio/wav")
            .map_err(|e| Error::Stt(e.to_string()))?;

        let form = reqwest::multipart::Form::new()
            .part("file", part)
            .text("model", self.model.clone())
            .text("response_format", "json");

        let response = self
            .client
            .post(format!("{}/audio/transcriptions", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .multipart(form)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Stt(format!("STT error {status}: {body}")));
        }

        let result: TranscriptionResponse = response.json().await?;
        Ok(result.text.trim().to_string())
    }
}
