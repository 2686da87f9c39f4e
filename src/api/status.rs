//! Assistant status endpoint

use std::sync::Arc;

use axum::{Json, Router, extract::State, routing::get};
use serde::Serialize;

use super::ApiState;
use crate::db::{Exchange, Settings};
use crate::session::SessionState;

/// How many recent exchanges the status view includes
const RECENT_EXCHANGES: usize = 10;

/// Status response for dashboards and diagnostics
#[derive(Serialize)]
pub struct StatusResponse {
    pub version: &'static str,
    pub state: SessionState,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub current_line: String,
    pub settings: Settings,
    pub recent_exchanges: Vec<Exchange>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_distance_cm: Option<f32>,
}

/// Get the current assistant state, settings, and recent history
async fn status(State(state): State<Arc<ApiState>>) -> Json<StatusResponse> {
    let snapshot = state.arbiter.snapshot();

    let settings = state.settings.get().unwrap_or_default();

    let recent_exchanges = state.history.recent(RECENT_EXCHANGES).unwrap_or_else(|e| {
        tracing::warn!(error = %e, "failed to load recent exchanges");
        Vec::new()
    });

    Json(StatusResponse {
        version: env!("CARGO_PKG_VERSION"),
        state: snapshot.state,
        current_line: snapshot.current_line,
        settings,
        recent_exchanges,
        last_distance_cm: *state.last_distance.borrow(),
    })
}

/// Build the status router
pub fn router(state: Arc<ApiState>) -> Router {
    Router::new()
        .route("/api/status", get(status))
        .with_state(state)
}
