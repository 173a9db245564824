//! Prometheus metrics.
//!
//! Dataset gauges are refreshed whenever the status endpoint runs; request
//! metrics are recorded by the [`track_metrics`] middleware on every call.

use axum::extract::Request;
use axum::middleware::Next;
use axum::response::Response;
use once_cell::sync::Lazy;
use prometheus::{
    register_histogram_vec, register_int_counter_vec, register_int_gauge, HistogramVec,
    IntCounterVec, IntGauge,
};

/// Countries currently in the dataset.
pub static COUNTRIES_TOTAL: Lazy<IntGauge> = Lazy::new(|| {
    register_int_gauge!("ecoatlas_countries_total", "Countries in the dataset").unwrap()
});

/// Indicators currently in the dataset.
pub static INDICATORS_TOTAL: Lazy<IntGauge> = Lazy::new(|| {
    register_int_gauge!("ecoatlas_indicators_total", "Indicators in the dataset").unwrap()
});

/// Observations currently in the dataset.
pub static DATAPOINTS_TOTAL: Lazy<IntGauge> = Lazy::new(|| {
    register_int_gauge!("ecoatlas_datapoints_total", "Datapoints in the dataset").unwrap()
});

/// Request latency, labeled by path and method.
pub static REQUEST_LATENCY: Lazy<HistogramVec> = Lazy::new(|| {
    register_histogram_vec!(
        "ecoatlas_request_duration_seconds",
        "Request latency in seconds",
        &["path", "method"],
        vec![0.001, 0.005, 0.025, 0.1, 0.25, 1.0]
    )
    .unwrap()
});

/// Request count, labeled by path, method, and response status.
pub static REQUEST_COUNT: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "ecoatlas_requests_total",
        "Requests served",
        &["path", "method", "status"]
    )
    .unwrap()
});

/// Force registration of every metric at startup.
pub fn init_metrics() {
    Lazy::force(&COUNTRIES_TOTAL);
    Lazy::force(&INDICATORS_TOTAL);
    Lazy::force(&DATAPOINTS_TOTAL);
    Lazy::force(&REQUEST_LATENCY);
    Lazy::force(&REQUEST_COUNT);
}

/// Middleware recording count and latency for each request.
pub async fn track_metrics(req: Request, next: Next) -> Response {
    let path = req.uri().path().to_string();
    let method = req.method().to_string();

    let timer = REQUEST_LATENCY
        .with_label_values(&[&path, &method])
        .start_timer();

    let response = next.run(req).await;

    timer.observe_duration();
    REQUEST_COUNT
        .with_label_values(&[&path, &method, response.status().as_str()])
        .inc();

    response
}
