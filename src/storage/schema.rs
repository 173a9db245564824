//! Schema migrations for the dataset tables.
//!
//! The server never writes to `country`/`indicator`/`datapoint`; an external
//! importer populates them. Migrations exist so a fresh process starts from
//! a valid (possibly empty) schema and so startup fails fast when the store
//! is unusable.

use rusqlite::Connection;

use crate::error::StorageError;
use crate::Result;

/// Schema version this build expects.
pub const SCHEMA_VERSION: i32 = 1;

/// Bring the database up to [`SCHEMA_VERSION`].
///
/// Safe to call on every startup; already-applied versions are skipped.
///
/// # Errors
///
/// Returns an error if a migration step fails.
pub fn migrate(conn: &Connection) -> Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version INTEGER PRIMARY KEY,
            applied_at INTEGER NOT NULL
        )",
        [],
    )
    .map_err(|e| StorageError::Migration {
        version: 0,
        reason: format!("create schema_migrations: {e}"),
    })?;

    let applied = current_version(conn)?;
    tracing::info!(applied, expected = SCHEMA_VERSION, "checking migrations");

    if applied < 1 {
        migrate_v1(conn)?;
    }

    Ok(())
}

/// Highest applied migration version, 0 for a fresh database.
fn current_version(conn: &Connection) -> Result<i32> {
    let version = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_migrations",
        [],
        |row| row.get(0),
    )?;
    Ok(version)
}

fn mark_applied(conn: &Connection, version: i32) -> Result<()> {
    conn.execute(
        "INSERT INTO schema_migrations (version, applied_at)
         VALUES (?, strftime('%s', 'now'))",
        [version],
    )?;
    Ok(())
}

/// v1: the three dataset tables and their lookup indexes.
fn migrate_v1(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r"
        CREATE TABLE IF NOT EXISTS country (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            iso3 TEXT NOT NULL UNIQUE
        );

        CREATE INDEX IF NOT EXISTS idx_country_name ON country(name);

        CREATE TABLE IF NOT EXISTS indicator (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            code TEXT NOT NULL UNIQUE,
            name TEXT NOT NULL,
            unit TEXT,
            igroup TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_indicator_igroup ON indicator(igroup);

        -- One observation per (indicator, country, year); value stays
        -- nullable because the importer keeps placeholder rows.
        CREATE TABLE IF NOT EXISTS datapoint (
            indicator_id INTEGER NOT NULL REFERENCES indicator(id),
            country_id INTEGER NOT NULL REFERENCES country(id),
            year INTEGER NOT NULL,
            value REAL,
            UNIQUE(indicator_id, country_id, year)
        );

        CREATE INDEX IF NOT EXISTS idx_datapoint_country ON datapoint(country_id);
        CREATE INDEX IF NOT EXISTS idx_datapoint_indicator_year
            ON datapoint(indicator_id, year);
        ",
    )
    .map_err(|e| StorageError::Migration {
        version: 1,
        reason: e.to_string(),
    })?;

    mark_applied(conn, 1)?;
    tracing::info!("migration v1 applied");

    Ok(())
}

/// Confirm the dataset tables exist before serving traffic.
///
/// # Errors
///
/// Returns an error naming the first missing table.
pub fn verify_schema(conn: &Connection) -> Result<()> {
    for table in ["country", "indicator", "datapoint"] {
        let found: bool = conn
            .query_row(
                "SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?",
                [table],
                |_| Ok(true),
            )
            .unwrap_or(false);

        if !found {
            return Err(StorageError::MissingTable(table.to_string()).into());
        }
    }

    Ok(())
}
