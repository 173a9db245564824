//! Error hierarchy for the ecoatlas crate.
//!
//! Fallible functions return [`Result<T>`]; failures bubble up with `?` and
//! are rendered for clients in one place (the API error mapper).

use thiserror::Error;

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error, one variant per subsystem.
#[derive(Error, Debug)]
pub enum Error {
    /// Rejected configuration value.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// Anything raised by the storage layer.
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// Anything raised by the HTTP server.
    #[error(transparent)]
    Server(#[from] ServerError),

    /// Filesystem failure while preparing the data directory.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors from the storage layer.
#[derive(Error, Debug)]
pub enum StorageError {
    /// Underlying `SQLite` failure, normalized to its message.
    #[error("sqlite error: {0}")]
    Sqlite(String),

    /// A migration step did not apply cleanly.
    #[error("migration v{version} failed: {reason}")]
    Migration { version: i32, reason: String },

    /// Startup schema check found a table missing.
    #[error("schema check failed: table '{0}' is missing")]
    MissingTable(String),
}

/// Errors from the HTTP server.
#[derive(Error, Debug)]
pub enum ServerError {
    /// The listen socket could not be bound.
    #[error("failed to bind {address}: {reason}")]
    BindFailed { address: String, reason: String },

    /// The serve loop terminated with an error.
    #[error("server error: {0}")]
    Serve(String),
}

impl Error {
    /// Shorthand for a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }
}

impl From<rusqlite::Error> for StorageError {
    fn from(err: rusqlite::Error) -> Self {
        Self::Sqlite(err.to_string())
    }
}

// Lets storage code use `?` directly on rusqlite calls.
impl From<rusqlite::Error> for Error {
    fn from(err: rusqlite::Error) -> Self {
        Self::Storage(StorageError::from(err))
    }
}
