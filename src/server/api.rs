//! REST API endpoints.
//!
//! Each handler maps validated request parameters onto one storage query
//! and returns its rows as JSON. Validation failures surface as 400 with a
//! short reason; anything the storage layer propagates surfaces as 500 via
//! [`ApiError`].

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use prometheus::{Encoder, TextEncoder};
use serde::Deserialize;

use super::metrics::{COUNTRIES_TOTAL, DATAPOINTS_TOTAL, INDICATORS_TOTAL};
use crate::storage::{self, Database};

/// Countries used by the slice endpoint when none are requested.
const DEFAULT_SLICE_COUNTRIES: &str = "BRA,POL,KOR";

/// Accepted `env` keys for the panel endpoint and the indicator each maps to.
const ENV_INDICATORS: &[(&str, &str)] = &[
    ("co2", "EN.ATM.CO2E.PC"),
    ("pm25", "EN.ATM.PM25.MC.M3"),
    ("forest", "AG.LND.FRST.ZS"),
];

/// Shared state for all API handlers.
#[derive(Debug, Clone)]
pub struct AppState {
    pub db: Database,
}

impl AppState {
    /// Create new application state.
    #[must_use]
    pub fn new(db: Database) -> Self {
        Self { db }
    }
}

/// Error type returned by API handlers.
#[derive(Debug)]
pub enum ApiError {
    /// Invalid request parameters; maps to 400.
    BadRequest(String),
    /// Anything propagated from the storage layer; maps to 500.
    Internal(crate::Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            Self::BadRequest(reason) => {
                tracing::debug!(reason = %reason, "Rejected request");
                (
                    StatusCode::BAD_REQUEST,
                    Json(serde_json::json!({ "error": reason })),
                )
                    .into_response()
            }
            Self::Internal(err) => {
                tracing::error!(error = %err, "Request failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(serde_json::json!({
                        "error": "internal_error",
                        "detail": err.to_string(),
                    })),
                )
                    .into_response()
            }
        }
    }
}

impl From<crate::Error> for ApiError {
    fn from(err: crate::Error) -> Self {
        Self::Internal(err)
    }
}

/// Split a comma-separated list, trimming entries and dropping empty ones.
fn split_csv(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(ToString::to_string)
        .collect()
}

/// Look up the indicator code for an `env` key (case-insensitive).
fn env_indicator(env: &str) -> Option<&'static str> {
    let env = env.to_lowercase();
    ENV_INDICATORS
        .iter()
        .find(|(key, _)| *key == env)
        .map(|(_, code)| *code)
}

/// Create the API router.
pub fn create_api_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/health", get(health))
        .route("/api/countries", get(countries))
        .route("/api/indicators", get(indicators))
        .route("/api/country/{iso3}/policies", get(country_policies))
        .route("/api/country/{iso3}/series", get(country_series))
        .route("/api/country/{iso3}/panel", get(country_panel))
        .route("/api/country/{iso3}/gdp", get(country_gdp))
        .route("/api/indicator/{code}/slice", get(indicator_slice))
        .route("/api/status", get(status))
        .route("/metrics", get(metrics))
        .with_state(state)
}

/// Health check endpoint.
async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    match state.db.health_check() {
        Ok(()) => (StatusCode::OK, Json(serde_json::json!({ "ok": true }))),
        Err(e) => {
            tracing::warn!(error = %e, "Database health check failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(serde_json::json!({ "ok": false })),
            )
        }
    }
}

/// All countries, sorted by name.
async fn countries(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<storage::CountryRow>>, ApiError> {
    let rows = state.db.with_conn(storage::list_countries)?;
    Ok(Json(rows))
}

/// All indicators, sorted by group then code.
async fn indicators(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<storage::IndicatorRow>>, ApiError> {
    let rows = state.db.with_conn(storage::list_indicators)?;
    Ok(Json(rows))
}

/// Policy indicators a country has adopted, with their start year.
async fn country_policies(
    Path(iso3): Path<String>,
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<storage::PolicyAdoption>>, ApiError> {
    let rows = state
        .db
        .with_conn(|conn| storage::policy_adoptions(conn, &iso3))?;
    Ok(Json(rows))
}

#[derive(Debug, Deserialize)]
struct SeriesParams {
    codes: Option<String>,
}

/// Time series for a country across the requested indicator codes.
async fn country_series(
    Path(iso3): Path<String>,
    Query(params): Query<SeriesParams>,
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<storage::SeriesPoint>>, ApiError> {
    let codes = split_csv(params.codes.as_deref().unwrap_or(""));
    if codes.is_empty() {
        return Err(ApiError::BadRequest("codes required".to_string()));
    }

    let rows = state
        .db
        .with_conn(|conn| storage::country_series(conn, &iso3, &codes))?;
    Ok(Json(rows))
}

#[derive(Debug, Deserialize)]
struct SliceParams {
    year: Option<i64>,
    countries: Option<String>,
}

/// One indicator's values across countries for a single year.
async fn indicator_slice(
    Path(code): Path<String>,
    Query(params): Query<SliceParams>,
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<storage::SliceRow>>, ApiError> {
    let Some(year) = params.year else {
        return Err(ApiError::BadRequest("year required".to_string()));
    };

    let countries = split_csv(
        params
            .countries
            .as_deref()
            .unwrap_or(DEFAULT_SLICE_COUNTRIES),
    );
    if countries.is_empty() {
        return Ok(Json(Vec::new()));
    }

    let rows = state
        .db
        .with_conn(|conn| storage::indicator_slice(conn, &code, year, &countries))?;
    Ok(Json(rows))
}

#[derive(Debug, Deserialize)]
struct PanelParams {
    env: Option<String>,
}

/// Per-year GDP / environment / policy panel for a country.
async fn country_panel(
    Path(iso3): Path<String>,
    Query(params): Query<PanelParams>,
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<storage::PanelRow>>, ApiError> {
    let env = params.env.as_deref().unwrap_or("co2");
    let Some(env_code) = env_indicator(env) else {
        return Err(ApiError::BadRequest(format!(
            "unknown env '{env}', expected one of: co2, pm25, forest"
        )));
    };

    let rows = state
        .db
        .with_conn(|conn| storage::country_panel(conn, &iso3, env_code))?;
    Ok(Json(rows))
}

/// GDP time series for a country.
async fn country_gdp(
    Path(iso3): Path<String>,
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<storage::GdpPoint>>, ApiError> {
    let rows = state.db.with_conn(|conn| storage::gdp_series(conn, &iso3))?;
    Ok(Json(rows))
}

/// Status endpoint with dataset statistics.
async fn status(State(state): State<Arc<AppState>>) -> Result<Json<serde_json::Value>, ApiError> {
    let countries = state.db.with_conn(storage::count_countries)?;
    let indicators = state.db.with_conn(storage::count_indicators)?;
    let datapoints = state.db.with_conn(storage::count_datapoints)?;

    COUNTRIES_TOTAL.set(countries);
    INDICATORS_TOTAL.set(indicators);
    DATAPOINTS_TOTAL.set(datapoints);

    tracing::debug!(countries, indicators, datapoints, "Status retrieved");

    Ok(Json(serde_json::json!({
        "version": env!("CARGO_PKG_VERSION"),
        "stats": {
            "countries": countries,
            "indicators": indicators,
            "datapoints": datapoints,
        }
    })))
}

/// Prometheus metrics endpoint.
async fn metrics() -> impl IntoResponse {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();

    let mut buffer = Vec::new();
    match encoder.encode(&metric_families, &mut buffer) {
        Ok(()) => (
            StatusCode::OK,
            [(
                axum::http::header::CONTENT_TYPE,
                "text/plain; charset=utf-8",
            )],
            buffer,
        ),
        Err(e) => {
            tracing::error!(error = %e, "Failed to encode metrics");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                [(
                    axum::http::header::CONTENT_TYPE,
                    "text/plain; charset=utf-8",
                )],
                b"Failed to encode metrics".to_vec(),
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{migrate, Database};
    use axum::body::Body;
    use axum::http::Request;
    use rusqlite::params;
    use tower::ServiceExt;

    fn create_test_state() -> Arc<AppState> {
        let db = Database::open_in_memory().unwrap();
        db.with_conn(|conn| {
            migrate(conn)?;

            for (name, iso3) in [("Brazil", "BRA"), ("Poland", "POL"), ("South Korea", "KOR")] {
                conn.execute(
                    "INSERT INTO country (name, iso3) VALUES (?, ?)",
                    params![name, iso3],
                )
                .unwrap();
            }
            for (code, name, unit, igroup) in [
                ("NY.GDP.MKTP.CD", "GDP (current US$)", Some("US$"), "ECO"),
                ("AG.LND.FRST.ZS", "Forest area", Some("% of land"), "ENV"),
                ("POL.EPS", "Policy stringency index", None, "POL"),
            ] {
                conn.execute(
                    "INSERT INTO indicator (code, name, unit, igroup) VALUES (?, ?, ?, ?)",
                    params![code, name, unit, igroup],
                )
                .unwrap();
            }
            for (code, iso3, year, value) in [
                ("NY.GDP.MKTP.CD", "BRA", 2019, 1.87e12),
                ("NY.GDP.MKTP.CD", "BRA", 2020, 1.45e12),
                ("NY.GDP.MKTP.CD", "POL", 2020, 5.99e11),
                ("AG.LND.FRST.ZS", "BRA", 2020, 59.4),
                ("POL.EPS", "BRA", 2020, 2.1),
            ] {
                conn.execute(
                    "INSERT INTO datapoint (indicator_id, country_id, year, value)
                     SELECT i.id, c.id, ?, ?
                     FROM indicator i, country c
                     WHERE i.code = ? AND c.iso3 = ?",
                    params![year, value, code, iso3],
                )
                .unwrap();
            }
            Ok(())
        })
        .unwrap();
        Arc::new(AppState::new(db))
    }

    async fn get_json(app: Router, uri: &str) -> (StatusCode, serde_json::Value) {
        let response = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();

        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let value = serde_json::from_slice(&bytes).unwrap();
        (status, value)
    }

    #[tokio::test]
    async fn test_health() {
        let app = create_api_router(create_test_state());
        let (status, body) = get_json(app, "/api/health").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, serde_json::json!({ "ok": true }));
    }

    #[tokio::test]
    async fn test_countries_sorted() {
        let app = create_api_router(create_test_state());
        let (status, body) = get_json(app, "/api/countries").await;

        assert_eq!(status, StatusCode::OK);
        let names: Vec<&str> = body
            .as_array()
            .unwrap()
            .iter()
            .map(|c| c["name"].as_str().unwrap())
            .collect();
        assert_eq!(names, ["Brazil", "Poland", "South Korea"]);
    }

    #[tokio::test]
    async fn test_indicators_sorted_by_group_then_code() {
        let app = create_api_router(create_test_state());
        let (status, body) = get_json(app, "/api/indicators").await;

        assert_eq!(status, StatusCode::OK);
        let codes: Vec<&str> = body
            .as_array()
            .unwrap()
            .iter()
            .map(|i| i["code"].as_str().unwrap())
            .collect();
        assert_eq!(codes, ["NY.GDP.MKTP.CD", "AG.LND.FRST.ZS", "POL.EPS"]);
    }

    #[tokio::test]
    async fn test_policies() {
        let app = create_api_router(create_test_state());
        let (status, body) = get_json(app, "/api/country/BRA/policies").await;

        assert_eq!(status, StatusCode::OK);
        let rows = body.as_array().unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["indicator_code"], "POL.EPS");
        assert_eq!(rows[0]["start_year"], 2020);
    }

    #[tokio::test]
    async fn test_series_requires_codes() {
        let app = create_api_router(create_test_state());

        let (status, body) = get_json(app.clone(), "/api/country/BRA/series").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "codes required");

        // Present but empty after trim/filter
        let (status, _) = get_json(app, "/api/country/BRA/series?codes=,%20,").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_series_single_code() {
        let app = create_api_router(create_test_state());
        let (status, body) =
            get_json(app, "/api/country/BRA/series?codes=NY.GDP.MKTP.CD").await;

        assert_eq!(status, StatusCode::OK);
        let rows = body.as_array().unwrap();
        assert_eq!(rows.len(), 2);
        assert!(rows.iter().all(|r| r["code"] == "NY.GDP.MKTP.CD"));
        assert_eq!(rows[0]["year"], 2019);
        assert_eq!(rows[1]["year"], 2020);
    }

    #[tokio::test]
    async fn test_slice_requires_year() {
        let app = create_api_router(create_test_state());
        let (status, body) = get_json(app, "/api/indicator/NY.GDP.MKTP.CD/slice").await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "year required");
    }

    #[tokio::test]
    async fn test_slice_default_countries() {
        let app = create_api_router(create_test_state());
        let (status, body) = get_json(app, "/api/indicator/NY.GDP.MKTP.CD/slice?year=2020").await;

        assert_eq!(status, StatusCode::OK);
        let rows = body.as_array().unwrap();
        // Only BRA and POL have 2020 GDP datapoints among the defaults
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0]["iso3"], "BRA");
        assert_eq!(rows[1]["iso3"], "POL");
    }

    #[tokio::test]
    async fn test_slice_explicit_countries() {
        let app = create_api_router(create_test_state());
        let (status, body) =
            get_json(app, "/api/indicator/NY.GDP.MKTP.CD/slice?year=2020&countries=POL").await;

        assert_eq!(status, StatusCode::OK);
        let rows = body.as_array().unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["iso3"], "POL");
    }

    #[tokio::test]
    async fn test_panel_default_env() {
        let app = create_api_router(create_test_state());
        let (status, body) = get_json(app, "/api/country/BRA/panel").await;

        assert_eq!(status, StatusCode::OK);
        let rows = body.as_array().unwrap();
        assert_eq!(rows.len(), 2);
        // No CO2 data seeded, so env is null throughout
        assert!(rows.iter().all(|r| r["env"].is_null()));
        assert_eq!(rows[1]["gdp"], 1.45e12);
        assert_eq!(rows[1]["policy_eps"], 2.1);
    }

    #[tokio::test]
    async fn test_panel_forest_env() {
        let app = create_api_router(create_test_state());
        let (status, body) = get_json(app, "/api/country/BRA/panel?env=forest").await;

        assert_eq!(status, StatusCode::OK);
        let rows = body.as_array().unwrap();
        let row_2020 = rows.iter().find(|r| r["year"] == 2020).unwrap();
        assert_eq!(row_2020["env"], 59.4);
    }

    #[tokio::test]
    async fn test_panel_env_case_insensitive() {
        let app = create_api_router(create_test_state());
        let (status, _) = get_json(app, "/api/country/BRA/panel?env=Forest").await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_panel_unknown_env_rejected() {
        let app = create_api_router(create_test_state());
        let (status, body) = get_json(app, "/api/country/BRA/panel?env=ozone").await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains("ozone"));
    }

    #[tokio::test]
    async fn test_gdp() {
        let app = create_api_router(create_test_state());
        let (status, body) = get_json(app, "/api/country/BRA/gdp").await;

        assert_eq!(status, StatusCode::OK);
        let rows = body.as_array().unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0]["name"], "Brazil");
        assert_eq!(rows[0]["year"], 2019);
        assert_eq!(rows[0]["gdp"], 1.87e12);
    }

    #[tokio::test]
    async fn test_status() {
        let app = create_api_router(create_test_state());
        let (status, body) = get_json(app, "/api/status").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["stats"]["countries"], 3);
        assert_eq!(body["stats"]["indicators"], 3);
        assert_eq!(body["stats"]["datapoints"], 5);
    }

    #[tokio::test]
    async fn test_metrics() {
        let app = create_api_router(create_test_state());

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/metrics")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_api_error_response_bodies() {
        let bad = ApiError::BadRequest("codes required".to_string()).into_response();
        assert_eq!(bad.status(), StatusCode::BAD_REQUEST);
        let bytes = axum::body::to_bytes(bad.into_body(), usize::MAX).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["error"], "codes required");

        let err = crate::error::StorageError::Sqlite("disk I/O error".to_string());
        let internal = ApiError::Internal(err.into()).into_response();
        assert_eq!(internal.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let bytes = axum::body::to_bytes(internal.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["error"], "internal_error");
        assert!(body["detail"].as_str().unwrap().contains("disk I/O error"));
    }

    #[test]
    fn test_split_csv() {
        assert_eq!(split_csv("a,b,c"), ["a", "b", "c"]);
        assert_eq!(split_csv(" a , b "), ["a", "b"]);
        assert_eq!(split_csv("a,,b,"), ["a", "b"]);
        assert!(split_csv("").is_empty());
        assert!(split_csv(" , ,").is_empty());
    }

    #[test]
    fn test_env_indicator_lookup() {
        assert_eq!(env_indicator("co2"), Some("EN.ATM.CO2E.PC"));
        assert_eq!(env_indicator("pm25"), Some("EN.ATM.PM25.MC.M3"));
        assert_eq!(env_indicator("forest"), Some("AG.LND.FRST.ZS"));
        assert_eq!(env_indicator("FOREST"), Some("AG.LND.FRST.ZS"));
        assert_eq!(env_indicator("ozone"), None);
    }
}
