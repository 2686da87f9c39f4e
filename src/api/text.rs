//! Direct text input endpoint
//!
//! Text submitted here bypasses wake gating: it always produces a reply,
//! without changing the activation state of a dormant session.

use std::convert::Infallible;
use std::sync::Arc;

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::sse::{Event, KeepAlive, Sse},
    routing::post,
};
use futures::Stream;
use futures::StreamExt;
use serde::Deserialize;
use tokio_stream::wrappers::ReceiverStream;

use super::ApiState;
use crate::session::TriggerEvent;

/// Request body for text input
#[derive(Deserialize)]
pub struct TextInputRequest {
    pub text: String,
}

/// Submit a text query and stream the reply back as SSE
async fn text_input(
    State(state): State<Arc<ApiState>>,
    Json(request): Json<TextInputRequest>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, (StatusCode, String)> {
    let text = request.text.trim().to_string();
    if text.is_empty() {
        return Err((StatusCode::BAD_REQUEST, "text must not be empty".to_string()));
    }

    tracing::info!(text = %text, "text input received");

    let Some(rx) = state.arbiter.dispatch(TriggerEvent::DirectText { text }) else {
        // DirectText always produces a reply; this arm is unreachable in
        // practice but the handler stays total.
        return Err((
            StatusCode::INTERNAL_SERVER_ERROR,
            "no reply produced".to_string(),
        ));
    };

    let stream = ReceiverStream::new(rx).map(|chunk| Ok(Event::default().data(chunk)));

    Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}

/// Build the text input router
pub fn router(state: Arc<ApiState>) -> Router {
    Router::new()
        .route("/api/text", post(text_input))
        .with_state(state)
}
