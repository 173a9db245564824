//! Row types returned by the query layer.
//!
//! Each struct mirrors one endpoint's JSON payload. Values are `Option<f64>`
//! because the fact table admits NULL observations alongside absent rows.

use serde::{Deserialize, Serialize};

/// A country with its external ISO3 key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountryRow {
    /// Display name.
    pub name: String,

    /// Three-letter country code (e.g. "BRA").
    pub iso3: String,
}

/// An indicator definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndicatorRow {
    /// Stable external code (e.g. "NY.GDP.MKTP.CD").
    pub code: String,

    /// Display name.
    pub name: String,

    /// Unit of measurement, when one applies.
    pub unit: Option<String>,

    /// Categorical group (e.g. "POL" for policy indicators).
    pub igroup: String,
}

/// A policy indicator adopted by a country, with its earliest observed year.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyAdoption {
    pub indicator_code: String,
    pub indicator_name: String,
    pub start_year: i64,
}

/// One observation in a per-country time series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesPoint {
    pub code: String,
    pub name: String,
    pub unit: Option<String>,
    pub year: i64,
    pub value: Option<f64>,
}

/// One country's value in a cross-country slice for a fixed indicator/year.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SliceRow {
    pub iso3: String,
    pub value: Option<f64>,
}

/// One year of a country's combined GDP / environment / policy panel.
///
/// Columns are null when the underlying indicator has no observation
/// for that year.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PanelRow {
    pub year: i64,
    pub gdp: Option<f64>,
    pub env: Option<f64>,
    pub policy_eps: Option<f64>,
}

/// One observation in a country's GDP series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GdpPoint {
    pub name: String,
    pub year: i64,
    pub gdp: Option<f64>,
}
