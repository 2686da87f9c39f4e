//! Remote shutdown endpoint

use std::sync::Arc;

use axum::{Json, Router, extract::State, routing::post};
use serde::Serialize;

use super::ApiState;

/// Acknowledgement returned before the process winds down
#[derive(Serialize)]
pub struct KillResponse {
    pub status: &'static str,
}

/// Request a graceful shutdown of the whole daemon
async fn kill(State(state): State<Arc<ApiState>>) -> Json<KillResponse> {
    tracing::info!("shutdown requested via API");
    state.shutdown.cancel();

    Json(KillResponse {
        status: "shutting down",
    })
}

/// Build the control router
pub fn router(state: Arc<ApiState>) -> Router {
    Router::new()
        .route("/api/kill", post(kill))
        .with_state(state)
}
