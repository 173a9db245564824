//! Server assembly and lifecycle.
//!
//! Builds the full router (API first, SPA fallback last, so client routes
//! can never shadow `/api`), layers on CORS, request tracing, and metrics,
//! then serves until a shutdown signal arrives.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use axum::Router;
use tokio::signal;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use super::api::{create_api_router, AppState};
use super::metrics::track_metrics;
use super::static_files::spa_service;
use crate::error::ServerError;
use crate::storage::Database;
use crate::Result;

/// Listener and asset settings, extracted from [`crate::Config`] by the
/// entrypoint.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Listen address.
    pub host: String,
    /// Listen port.
    pub port: u16,
    /// Frontend bundle directory.
    pub client_dir: PathBuf,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            client_dir: PathBuf::from("./client/dist"),
        }
    }
}

/// The assembled application.
pub struct App {
    config: ServerConfig,
    state: Arc<AppState>,
}

impl App {
    /// Wire the shared database handle into a runnable app.
    #[must_use]
    pub fn new(config: ServerConfig, db: Database) -> Self {
        Self {
            config,
            state: Arc::new(AppState::new(db)),
        }
    }

    /// Compose routes and middleware.
    fn router(&self) -> Router {
        let trace = TraceLayer::new_for_http()
            .make_span_with(|request: &axum::http::Request<_>| {
                tracing::info_span!(
                    "request",
                    method = %request.method(),
                    path = %request.uri().path(),
                )
            })
            .on_response(
                |response: &axum::response::Response,
                 latency: std::time::Duration,
                 _span: &tracing::Span| {
                    tracing::info!(
                        status = response.status().as_u16(),
                        latency_ms = latency.as_millis() as u64,
                        "request finished"
                    );
                },
            );

        create_api_router(Arc::clone(&self.state))
            .fallback_service(spa_service(&self.config.client_dir))
            .layer(trace)
            .layer(axum::middleware::from_fn(track_metrics))
            .layer(
                CorsLayer::new()
                    .allow_origin(Any)
                    .allow_methods(Any)
                    .allow_headers(Any),
            )
    }

    /// Bind the listener and serve until SIGTERM or Ctrl+C.
    ///
    /// # Errors
    ///
    /// Returns an error if the address is invalid, the socket cannot be
    /// bound, or the serve loop dies.
    pub async fn run(self) -> Result<()> {
        let addr: SocketAddr = format!("{}:{}", self.config.host, self.config.port)
            .parse()
            .map_err(|e| crate::Error::config(format!("bad listen address: {e}")))?;

        let listener =
            tokio::net::TcpListener::bind(addr)
                .await
                .map_err(|e| ServerError::BindFailed {
                    address: addr.to_string(),
                    reason: e.to_string(),
                })?;

        tracing::info!(
            %addr,
            client_dir = %self.config.client_dir.display(),
            "listening"
        );

        axum::serve(listener, self.router())
            .with_graceful_shutdown(shutdown_signal())
            .await
            .map_err(|e| ServerError::Serve(e.to_string()))?;

        tracing::info!("shut down cleanly");
        Ok(())
    }
}

/// Resolve when the process is asked to stop.
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => tracing::info!("Ctrl+C received, shutting down"),
        () = terminate => tracing::info!("SIGTERM received, shutting down"),
    }
}
