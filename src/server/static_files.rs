//! Static hosting for the pre-built frontend bundle.
//!
//! Unmatched routes get the root HTML document so client-side routing can
//! take over. The service is registered as the router fallback, after every
//! API route, so it can never shadow an API path.

use std::path::Path;

use tower_http::services::{ServeDir, ServeFile};

/// Build the static file service with SPA fallback to `index.html`.
pub fn spa_service(client_dir: &Path) -> ServeDir<ServeFile> {
    if !client_dir.is_dir() {
        tracing::warn!(
            dir = %client_dir.display(),
            "Client directory not found, static requests will fail"
        );
    }

    ServeDir::new(client_dir).fallback(ServeFile::new(client_dir.join("index.html")))
}
