//! `SQLite` storage for the country/indicator dataset: the shared
//! connection handle, schema migrations, and the read-only query
//! functions behind each REST endpoint.

mod connection;
mod models;
mod queries;
mod schema;

pub use connection::Database;
pub use models::{
    CountryRow, GdpPoint, IndicatorRow, PanelRow, PolicyAdoption, SeriesPoint, SliceRow,
};
pub use queries::{
    count_countries, count_datapoints, count_indicators, country_panel, country_series,
    gdp_series, indicator_slice, list_countries, list_indicators, policy_adoptions, GDP_CODE,
    POLICY_EPS_CODE,
};
pub use schema::{migrate, verify_schema, SCHEMA_VERSION};

/// Migrate and verify the store before the server starts.
///
/// # Errors
///
/// Returns an error if a migration fails or a dataset table is missing
/// afterwards.
pub fn init_storage(db: &Database) -> crate::Result<()> {
    db.with_conn(|conn| {
        migrate(conn)?;
        verify_schema(conn)?;

        tracing::info!(version = SCHEMA_VERSION, "storage ready");
        Ok(())
    })
}
