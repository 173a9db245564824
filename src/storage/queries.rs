//! Read-only queries backing the REST endpoints.
//!
//! Every function takes a borrowed connection and binds all user input as
//! parameters. List filters (indicator codes, ISO3 codes) are expanded into
//! `IN (...)` clauses with one placeholder per entry, never interpolated.

use rusqlite::{params, types::Value, Connection};

use super::models::{
    CountryRow, GdpPoint, IndicatorRow, PanelRow, PolicyAdoption, SeriesPoint, SliceRow,
};
use crate::Result;

/// Indicator code for GDP in current US$.
pub const GDP_CODE: &str = "NY.GDP.MKTP.CD";

/// Indicator code for the environmental policy stringency index.
pub const POLICY_EPS_CODE: &str = "POL.EPS";

/// Indicator group holding policy indicators.
const POLICY_GROUP: &str = "POL";

/// Build a `?, ?, ...` placeholder list for an `IN` clause.
fn placeholders(n: usize) -> String {
    vec!["?"; n].join(",")
}

/// List all countries ordered by name.
///
/// # Errors
///
/// Returns an error if the database query fails.
pub fn list_countries(conn: &Connection) -> Result<Vec<CountryRow>> {
    let mut stmt = conn.prepare("SELECT name, iso3 FROM country ORDER BY name")?;

    let rows = stmt.query_map([], |row| {
        Ok(CountryRow {
            name: row.get(0)?,
            iso3: row.get(1)?,
        })
    })?;

    Ok(rows.collect::<rusqlite::Result<_>>()?)
}

/// List all indicators ordered by group then code.
///
/// # Errors
///
/// Returns an error if the database query fails.
pub fn list_indicators(conn: &Connection) -> Result<Vec<IndicatorRow>> {
    let mut stmt =
        conn.prepare("SELECT code, name, unit, igroup FROM indicator ORDER BY igroup, code")?;

    let rows = stmt.query_map([], |row| {
        Ok(IndicatorRow {
            code: row.get(0)?,
            name: row.get(1)?,
            unit: row.get(2)?,
            igroup: row.get(3)?,
        })
    })?;

    Ok(rows.collect::<rusqlite::Result<_>>()?)
}

/// Policy indicators a country has adopted, with the earliest year a
/// positive value was observed.
///
/// # Errors
///
/// Returns an error if the database query fails.
pub fn policy_adoptions(conn: &Connection, iso3: &str) -> Result<Vec<PolicyAdoption>> {
    let mut stmt = conn.prepare(
        "SELECT
            i.code AS indicator_code,
            i.name AS indicator_name,
            MIN(d.year) AS start_year
         FROM datapoint d
         JOIN indicator i ON i.id = d.indicator_id
         JOIN country  c ON c.id = d.country_id
         WHERE c.iso3 = ?
           AND i.igroup = ?
           AND d.value > 0
         GROUP BY i.code, i.name
         ORDER BY i.code",
    )?;

    let rows = stmt.query_map(params![iso3, POLICY_GROUP], |row| {
        Ok(PolicyAdoption {
            indicator_code: row.get(0)?,
            indicator_name: row.get(1)?,
            start_year: row.get(2)?,
        })
    })?;

    Ok(rows.collect::<rusqlite::Result<_>>()?)
}

/// Time series for a country restricted to the given indicator codes,
/// ordered by code then year.
///
/// # Errors
///
/// Returns an error if the database query fails.
pub fn country_series(conn: &Connection, iso3: &str, codes: &[String]) -> Result<Vec<SeriesPoint>> {
    let sql = format!(
        "SELECT i.code, i.name, i.unit, d.year, d.value
         FROM datapoint d
         JOIN indicator i ON i.id = d.indicator_id
         JOIN country  c ON c.id = d.country_id
         WHERE c.iso3 = ? AND i.code IN ({})
         ORDER BY i.code, d.year",
        placeholders(codes.len())
    );

    let mut stmt = conn.prepare(&sql)?;

    let mut bind: Vec<Value> = Vec::with_capacity(codes.len() + 1);
    bind.push(iso3.to_string().into());
    bind.extend(codes.iter().map(|c| Value::from(c.clone())));

    let rows = stmt.query_map(rusqlite::params_from_iter(bind), |row| {
        Ok(SeriesPoint {
            code: row.get(0)?,
            name: row.get(1)?,
            unit: row.get(2)?,
            year: row.get(3)?,
            value: row.get(4)?,
        })
    })?;

    Ok(rows.collect::<rusqlite::Result<_>>()?)
}

/// Cross-country values for one indicator in one year, ordered by ISO3.
///
/// # Errors
///
/// Returns an error if the database query fails.
pub fn indicator_slice(
    conn: &Connection,
    code: &str,
    year: i64,
    countries: &[String],
) -> Result<Vec<SliceRow>> {
    let sql = format!(
        "SELECT c.iso3, d.value
         FROM datapoint d
         JOIN indicator i ON i.id = d.indicator_id
         JOIN country  c ON c.id = d.country_id
         WHERE i.code = ? AND d.year = ? AND c.iso3 IN ({})
         ORDER BY c.iso3",
        placeholders(countries.len())
    );

    let mut stmt = conn.prepare(&sql)?;

    let mut bind: Vec<Value> = Vec::with_capacity(countries.len() + 2);
    bind.push(code.to_string().into());
    bind.push(year.into());
    bind.extend(countries.iter().map(|c| Value::from(c.clone())));

    let rows = stmt.query_map(rusqlite::params_from_iter(bind), |row| {
        Ok(SliceRow {
            iso3: row.get(0)?,
            value: row.get(1)?,
        })
    })?;

    Ok(rows.collect::<rusqlite::Result<_>>()?)
}

/// Per-year panel of GDP, one environmental indicator, and the policy
/// stringency index for a country, pivoted via conditional aggregation.
///
/// # Errors
///
/// Returns an error if the database query fails.
pub fn country_panel(conn: &Connection, iso3: &str, env_code: &str) -> Result<Vec<PanelRow>> {
    let mut stmt = conn.prepare(
        "SELECT d.year,
            MAX(CASE WHEN i.code = ? THEN d.value END) AS gdp,
            MAX(CASE WHEN i.code = ? THEN d.value END) AS env,
            MAX(CASE WHEN i.code = ? THEN d.value END) AS policy_eps
         FROM datapoint d
         JOIN indicator i ON i.id = d.indicator_id
         JOIN country  c ON c.id = d.country_id
         WHERE c.iso3 = ? AND i.code IN (?, ?, ?)
         GROUP BY d.year
         ORDER BY d.year",
    )?;

    let rows = stmt.query_map(
        params![
            GDP_CODE,
            env_code,
            POLICY_EPS_CODE,
            iso3,
            GDP_CODE,
            POLICY_EPS_CODE,
            env_code
        ],
        |row| {
            Ok(PanelRow {
                year: row.get(0)?,
                gdp: row.get(1)?,
                env: row.get(2)?,
                policy_eps: row.get(3)?,
            })
        },
    )?;

    Ok(rows.collect::<rusqlite::Result<_>>()?)
}

/// GDP time series for a country, ordered by year.
///
/// # Errors
///
/// Returns an error if the database query fails.
pub fn gdp_series(conn: &Connection, iso3: &str) -> Result<Vec<GdpPoint>> {
    let mut stmt = conn.prepare(
        "SELECT c.name, d.year, d.value AS gdp
         FROM datapoint d
         JOIN indicator i ON i.id = d.indicator_id
         JOIN country  c ON c.id = d.country_id
         WHERE c.iso3 = ? AND i.code = ?
         ORDER BY d.year",
    )?;

    let rows = stmt.query_map(params![iso3, GDP_CODE], |row| {
        Ok(GdpPoint {
            name: row.get(0)?,
            year: row.get(1)?,
            gdp: row.get(2)?,
        })
    })?;

    Ok(rows.collect::<rusqlite::Result<_>>()?)
}

/// Count rows in the country table.
///
/// # Errors
///
/// Returns an error if the database query fails.
pub fn count_countries(conn: &Connection) -> Result<i64> {
    count_table(conn, "country")
}

/// Count rows in the indicator table.
///
/// # Errors
///
/// Returns an error if the database query fails.
pub fn count_indicators(conn: &Connection) -> Result<i64> {
    count_table(conn, "indicator")
}

/// Count rows in the datapoint table.
///
/// # Errors
///
/// Returns an error if the database query fails.
pub fn count_datapoints(conn: &Connection) -> Result<i64> {
    count_table(conn, "datapoint")
}

fn count_table(conn: &Connection, table: &str) -> Result<i64> {
    // `table` is one of our own fixed names, not user input
    let count = conn.query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| {
        row.get(0)
    })?;
    Ok(count)
}
