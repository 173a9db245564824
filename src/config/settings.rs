//! Runtime configuration.
//!
//! All knobs arrive through the CLI (with env fallbacks) and are validated
//! once before anything is opened or bound. There is exactly one entrypoint
//! and one `Config`; per-environment differences live in flags, not copies
//! of the binary.

use crate::{Error, Result};
use std::path::PathBuf;

/// Log levels accepted by `--log-level`.
const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Validated server configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Directory holding the `SQLite` database file.
    pub data_dir: PathBuf,

    /// Directory with the pre-built frontend bundle.
    pub client_dir: PathBuf,

    /// Listen address.
    pub host: String,

    /// Listen port.
    pub port: u16,

    /// Log level name.
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./data"),
            client_dir: PathBuf::from("./client/dist"),
            host: "0.0.0.0".to_string(),
            port: 3000,
            log_level: "info".to_string(),
        }
    }
}

impl Config {
    /// Default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Check every field before the server starts.
    ///
    /// # Errors
    ///
    /// Returns the first rejected value.
    pub fn validate(&self) -> Result<()> {
        if self.host.is_empty() {
            return Err(Error::config("host must not be empty"));
        }

        if self.port == 0 {
            return Err(Error::config("listen port must be nonzero"));
        }

        let level = self.log_level.to_lowercase();
        if !LOG_LEVELS.contains(&level.as_str()) {
            return Err(Error::config(format!(
                "unknown log level '{}' (expected {})",
                self.log_level,
                LOG_LEVELS.join("|")
            )));
        }

        Ok(())
    }

    /// Location of the database file inside `data_dir`.
    #[must_use]
    pub fn database_path(&self) -> PathBuf {
        self.data_dir.join("ecoatlas.db")
    }

    /// `host:port` string for the listener.
    #[must_use]
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
