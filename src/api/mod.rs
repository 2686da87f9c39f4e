//! HTTP API server

pub mod control;
pub mod health;
pub mod settings;
pub mod status;
pub mod text;

use std::sync::Arc;

use axum::Router;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::Result;
use crate::arbiter::Arbiter;
use crate::db::{DbPool, HistoryRepo, SettingsRepo};

/// Shared state for API handlers
#[derive(Clone)]
pub struct ApiState {
    pub db: DbPool,
    pub arbiter: Arc<Arbiter>,
    pub settings: SettingsRepo,
    pub history: HistoryRepo,
    /// Most recent proximity reading, when the sensor is running
    pub last_distance: watch::Receiver<Option<f32>>,
    pub shutdown: CancellationToken,
}

/// Configuration for building an API server
pub struct ApiServerBuilder {
    db: DbPool,
    arbiter: Arc<Arbiter>,
    port: u16,
    last_distance: watch::Receiver<Option<f32>>,
    shutdown: CancellationToken,
}

impl ApiServerBuilder {
    /// Create a new API server builder
    #[must_use]
    pub fn new(
        db: DbPool,
        arbiter: Arc<Arbiter>,
        port: u16,
        last_distance: watch::Receiver<Option<f32>>,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            db,
            arbiter,
            port,
            last_distance,
            shutdown,
        }
    }

    /// Build the API server
    #[must_use]
    pub fn build(self) -> ApiServer {
        let settings = SettingsRepo::new(self.db.clone());
        let history = HistoryRepo::new(self.db.clone());

        let state = Arc::new(ApiState {
            db: self.db,
            arbiter: self.arbiter,
            settings,
            history,
            last_distance: self.last_distance,
            shutdown: self.shutdown,
        });

        ApiServer {
            state,
            port: self.port,
        }
    }
}

/// API server
pub struct ApiServer {
    state: Arc<ApiState>,
    port: u16,
}

impl ApiServer {
    /// Build the router with all routes
    #[must_use]
    pub fn router(&self) -> Router {
        let router = Router::new()
            .merge(health::router())
            .merge(health::ready_router(self.state.clone()))
            .merge(status::router(self.state.clone()))
            .merge(settings::router(self.state.clone()))
            .merge(text::router(self.state.clone()))
            .merge(control::router(self.state.clone()));

        // CORS layer for cross-origin requests from frontend
        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);

        router.layer(cors).layer(TraceLayer::new_for_http())
    }

    /// Run the API server until shutdown
    ///
    /// # Errors
    ///
    /// Returns error if server fails to bind or run
    pub async fn run(self) -> Result<()> {
        let addr = format!("0.0.0.0:{}", self.port);
        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|e| crate::Error::Config(format!("failed to bind API server: {e}")))?;

        tracing::info!(port = self.port, "API server listening");

        let shutdown = self.state.shutdown.clone();
        axum::serve(listener, self.router())
            .with_graceful_shutdown(async move { shutdown.cancelled().await })
            .await
            .map_err(|e| crate::Error::Config(format!("API server error: {e}")))?;

        Ok(())
    }

    /// Run the API server in a background task
    #[must_use]
    pub fn spawn(self) -> tokio::task::JoinHandle<Result<()>> {
        tokio::spawn(async move { self.run().await })
    }
}
