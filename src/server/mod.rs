//! HTTP server: REST API, static SPA hosting, and observability.

mod api;
mod app;
mod metrics;
mod observability;
mod static_files;

pub use api::{create_api_router, ApiError, AppState};
pub use app::{App, ServerConfig};
pub use metrics::init_metrics;
pub use observability::init_tracing;
pub use static_files::spa_service;
