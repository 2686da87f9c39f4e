//! Runtime settings endpoints
//!
//! Settings edits take effect on the next arbitration decision; nothing
//! caches them.

use std::sync::Arc;

use axum::{Json, Router, extract::State, http::StatusCode, routing::get};
use serde::Deserialize;

use super::ApiState;
use crate::db::Settings;

/// Partial settings update; absent fields keep their stored values
#[derive(Deserialize)]
pub struct SettingsUpdate {
    pub wake_word: Option<String>,
    pub voice_enabled: Option<bool>,
    pub personality: Option<String>,
    pub sensor_enabled: Option<bool>,
    pub activation_timeout_secs: Option<u64>,
}

/// Get the current settings
async fn get_settings(
    State(state): State<Arc<ApiState>>,
) -> Result<Json<Settings>, (StatusCode, String)> {
    state
        .settings
        .get()
        .map(Json)
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))
}

/// Apply a partial settings update and return the merged result
async fn update_settings(
    State(state): State<Arc<ApiState>>,
    Json(update): Json<SettingsUpdate>,
) -> Result<Json<Settings>, (StatusCode, String)> {
    if let Some(timeout) = update.activation_timeout_secs
        && timeout == 0
    {
        return Err((
            StatusCode::BAD_REQUEST,
            "activation_timeout_secs must be positive".to_string(),
        ));
    }
    if let Some(wake_word) = &update.wake_word
        && wake_word.trim().is_empty()
    {
        return Err((
            StatusCode::BAD_REQUEST,
            "wake_word must not be empty".to_string(),
        ));
    }

    let mut settings = state
        .settings
        .get()
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;

    if let Some(wake_word) = update.wake_word {
        settings.wake_word = wake_word.trim().to_lowercase();
    }
    if let Some(voice_enabled) = update.voice_enabled {
        settings.voice_enabled = voice_enabled;
    }
    if let Some(personality) = update.personality {
        settings.personality = personality;
    }
    if let Some(sensor_enabled) = update.sensor_enabled {
        settings.sensor_enabled = sensor_enabled;
    }
    if let Some(timeout) = update.activation_timeout_secs {
        settings.activation_timeout_secs = timeout;
    }

    state
        .settings
        .set(&settings)
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;

    Ok(Json(settings))
}

/// Build the settings router
pub fn router(state: Arc<ApiState>) -> Router {
    Router::new()
        .route("/api/settings", get(get_settings).post(update_settings))
        .with_state(state)
}
