//! Shared handle to the `SQLite` dataset.
//!
//! One connection is opened at startup and reused by every request handler.
//! Access goes through [`Database::with_conn`], which serializes callers on a
//! `parking_lot` mutex; WAL mode keeps the read-heavy workload cheap.

use parking_lot::Mutex;
use rusqlite::{Connection, OpenFlags};
use std::path::Path;
use std::sync::Arc;

use crate::error::StorageError;
use crate::Result;

/// Connection options applied to every open.
///
/// The dataset is written by an out-of-band importer, so the settings favor
/// concurrent readers over write throughput.
const CONNECTION_PRAGMAS: &str = "
    PRAGMA journal_mode = WAL;
    PRAGMA synchronous = NORMAL;
    PRAGMA cache_size = -64000;
    PRAGMA temp_store = MEMORY;
    PRAGMA foreign_keys = ON;
";

/// Cloneable handle to the process-wide database connection.
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
    path: String,
}

impl Database {
    /// Open (or create) the database file at `path`.
    ///
    /// Missing parent directories are created first, so a fresh deployment
    /// can point at an empty data dir.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened or a pragma fails to
    /// apply; startup should treat that as fatal.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
            | OpenFlags::SQLITE_OPEN_CREATE
            | OpenFlags::SQLITE_OPEN_NO_MUTEX;
        let conn = Connection::open_with_flags(path, flags)
            .map_err(|e| StorageError::Sqlite(format!("open {}: {e}", path.display())))?;

        Self::from_connection(conn, path.to_string_lossy().into_owned())
    }

    /// Open a throwaway in-memory database.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection cannot be established.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()
            .map_err(|e| StorageError::Sqlite(format!("open :memory:: {e}")))?;

        Self::from_connection(conn, ":memory:".to_string())
    }

    fn from_connection(conn: Connection, path: String) -> Result<Self> {
        conn.execute_batch(CONNECTION_PRAGMAS)
            .map_err(|e| StorageError::Sqlite(format!("apply pragmas: {e}")))?;

        tracing::debug!(path = %path, "database ready");

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            path,
        })
    }

    /// Run `f` against the connection while holding the lock.
    ///
    /// Handlers pass the borrowed connection straight into a query function
    /// and return its rows.
    ///
    /// # Errors
    ///
    /// Propagates whatever `f` returns.
    pub fn with_conn<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T>,
    {
        let conn = self.conn.lock();
        f(&conn)
    }

    /// Path the database was opened at.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Cheap liveness probe used by the health endpoint.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection no longer answers queries.
    pub fn health_check(&self) -> Result<()> {
        self.with_conn(|conn| {
            conn.query_row("SELECT 1", [], |_| Ok(()))?;
            Ok(())
        })
    }
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}
