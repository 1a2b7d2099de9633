/// Prometheus metrics for the paste server
///
/// Counters are bumped by the handlers and the HTTP middleware below and
/// exposed at `/metrics` in Prometheus text format.

use axum::{
    extract::{MatchedPath, Request},
    middleware::Next,
    response::Response,
};
use lazy_static::lazy_static;
use prometheus::{
    histogram_opts, opts, register_histogram_vec, register_int_counter,
    register_int_counter_vec, Encoder, HistogramVec, IntCounter, IntCounterVec, Registry,
    TextEncoder,
};
use std::sync::Once;
use std::time::Instant;

lazy_static! {
    /// Global Prometheus registry
    pub static ref REGISTRY: Registry = Registry::new();

    /// Total number of pastes created
    pub static ref PASTES_CREATED_TOTAL: IntCounter = register_int_counter!(opts!(
        "ephem_pastes_created_total",
        "Total number of pastes created"
    ))
    .unwrap();

    /// Consume attempts by outcome
    ///
    /// Labels:
    /// - outcome: granted, not_available or error
    pub static ref CONSUMPTIONS_TOTAL: IntCounterVec = register_int_counter_vec!(
        opts!(
            "ephem_consumptions_total",
            "Total number of paste consume attempts"
        ),
        &["outcome"]
    )
    .unwrap();

    /// HTTP requests by method, matched route and status code
    pub static ref HTTP_REQUESTS_TOTAL: IntCounterVec = register_int_counter_vec!(
        opts!(
            "ephem_http_requests_total",
            "Total number of HTTP requests"
        ),
        &["method", "route", "status"]
    )
    .unwrap();

    /// HTTP request duration in seconds
    ///
    /// Buckets: 0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0, 5.0 seconds
    pub static ref HTTP_DURATION_SECONDS: HistogramVec = register_histogram_vec!(
        histogram_opts!(
            "ephem_http_duration_seconds",
            "HTTP request duration in seconds",
            vec![0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0, 5.0]
        ),
        &["route"]
    )
    .unwrap();

    /// Errors returned to clients by type
    ///
    /// Labels:
    /// - error_type: bad_request, validation, not_found, store_unavailable, internal
    pub static ref ERRORS_TOTAL: IntCounterVec = register_int_counter_vec!(
        opts!(
            "ephem_errors_total",
            "Total number of errors by type"
        ),
        &["error_type"]
    )
    .unwrap();
}

static REGISTER: Once = Once::new();

/// Register all metrics with the global registry. Safe to call more than once.
pub fn register_metrics() {
    REGISTER.call_once(|| {
        let collectors: Vec<(&str, Box<dyn prometheus::core::Collector>)> = vec![
            ("PASTES_CREATED_TOTAL", Box::new(PASTES_CREATED_TOTAL.clone())),
            ("CONSUMPTIONS_TOTAL", Box::new(CONSUMPTIONS_TOTAL.clone())),
            ("HTTP_REQUESTS_TOTAL", Box::new(HTTP_REQUESTS_TOTAL.clone())),
            ("HTTP_DURATION_SECONDS", Box::new(HTTP_DURATION_SECONDS.clone())),
            ("ERRORS_TOTAL", Box::new(ERRORS_TOTAL.clone())),
        ];
        for (name, collector) in collectors {
            if let Err(e) = REGISTRY.register(collector) {
                tracing::warn!(metric = name, error = %e, "failed to register metric");
            }
        }
    });
}

/// Encode metrics in Prometheus text format
pub fn encode_metrics() -> Result<String, Box<dyn std::error::Error + Send + Sync>> {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = vec![];
    encoder.encode(&metric_families, &mut buffer)?;
    Ok(String::from_utf8(buffer)?)
}

/// Middleware recording request count and latency per matched route
pub async fn track_http(req: Request, next: Next) -> Response {
    let start = Instant::now();
    let method = req.method().as_str().to_string();
    let route = req
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_string())
        .unwrap_or_else(|| "unmatched".to_string());

    let response = next.run(req).await;

    HTTP_REQUESTS_TOTAL
        .with_label_values(&[&method, &route, response.status().as_str()])
        .inc();
    HTTP_DURATION_SECONDS
        .with_label_values(&[&route])
        .observe(start.elapsed().as_secs_f64());

    response
}
