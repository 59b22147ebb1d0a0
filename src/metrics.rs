/// Metrics and telemetry for the CKBFS gateway
///
/// Provides Prometheus-compatible metrics for monitoring:
/// - HTTP request counts and latencies
/// - Resolver attempts and latencies per network
/// - Files and bytes served per response format
/// - Errors by code
use lazy_static::lazy_static;
use prometheus::{
    register_gauge, register_histogram_vec, register_int_counter_vec, Encoder, Gauge,
    HistogramVec, IntCounterVec, TextEncoder,
};

lazy_static! {
    // ========== HTTP Metrics ==========

    /// Total HTTP requests by method, path, and status
    pub static ref HTTP_REQUESTS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "http_requests_total",
        "Total number of HTTP requests",
        &["method", "path", "status"]
    )
    .unwrap();

    /// HTTP request duration in seconds
    pub static ref HTTP_REQUEST_DURATION_SECONDS: HistogramVec = register_histogram_vec!(
        "http_request_duration_seconds",
        "HTTP request latencies in seconds",
        &["method", "path"],
        vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0]
    )
    .unwrap();

    // ========== Resolver Metrics ==========

    /// Resolver attempts by network and outcome (`success` or an error code)
    pub static ref RESOLVE_ATTEMPTS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "ckbfs_resolve_attempts_total",
        "Total number of resolver attempts",
        &["network", "outcome"]
    )
    .unwrap();

    /// Resolver attempt duration in seconds
    pub static ref RESOLVE_DURATION_SECONDS: HistogramVec = register_histogram_vec!(
        "ckbfs_resolve_duration_seconds",
        "Resolver attempt latencies in seconds",
        &["network"],
        vec![0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0]
    )
    .unwrap();

    // ========== Delivery Metrics ==========

    /// Files served by response format
    pub static ref FILES_SERVED_TOTAL: IntCounterVec = register_int_counter_vec!(
        "ckbfs_files_served_total",
        "Total number of files served",
        &["format"]
    )
    .unwrap();

    /// Content bytes served by response format
    pub static ref BYTES_SERVED_TOTAL: IntCounterVec = register_int_counter_vec!(
        "ckbfs_bytes_served_total",
        "Total content bytes served",
        &["format"]
    )
    .unwrap();

    // ========== Error Metrics ==========

    /// Error responses by error code
    pub static ref ERRORS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "errors_total",
        "Total number of error responses",
        &["code"]
    )
    .unwrap();

    // ========== System Metrics ==========

    /// Application uptime in seconds
    pub static ref UPTIME_SECONDS: Gauge = register_gauge!(
        "uptime_seconds",
        "Application uptime in seconds"
    )
    .unwrap();
}

/// Render metrics in Prometheus text format
pub fn render_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::error!(error = %e, "metrics_encode_failed");
        return String::new();
    }
    String::from_utf8(buffer).unwrap_or_default()
}

/// Record an HTTP request
pub fn record_http_request(method: &str, path: &str, status: u16, duration: f64) {
    HTTP_REQUESTS_TOTAL
        .with_label_values(&[method, path, &status.to_string()])
        .inc();
    HTTP_REQUEST_DURATION_SECONDS
        .with_label_values(&[method, path])
        .observe(duration);
}

/// Record one resolver attempt
pub fn record_resolve_attempt(network: &str, outcome: &str, duration: f64) {
    RESOLVE_ATTEMPTS_TOTAL
        .with_label_values(&[network, outcome])
        .inc();
    RESOLVE_DURATION_SECONDS
        .with_label_values(&[network])
        .observe(duration);
}

/// Record a delivered file
pub fn record_file_served(format: &str, bytes: u64) {
    FILES_SERVED_TOTAL.with_label_values(&[format]).inc();
    BYTES_SERVED_TOTAL.with_label_values(&[format]).inc_by(bytes);
}

/// Record an error response
pub fn record_error(code: &str) {
    ERRORS_TOTAL.with_label_values(&[code]).inc();
}

/// Refresh the uptime gauge
pub fn set_uptime(seconds: f64) {
    UPTIME_SECONDS.set(seconds);
}
