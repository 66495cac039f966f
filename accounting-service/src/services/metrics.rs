//! Prometheus metrics for accounting-service.

use once_cell::sync::Lazy;
use prometheus::{
    register_counter_vec, register_histogram_vec, register_int_counter, CounterVec, Encoder,
    HistogramVec, IntCounter, TextEncoder,
};

/// Counter for HTTP requests by method, matched route and status.
pub static HTTP_REQUESTS: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "accounting_http_requests_total",
        "Total number of HTTP requests",
        &["method", "route", "status"]
    )
    .expect("Failed to register HTTP_REQUESTS")
});

/// Histogram for HTTP request duration by method and matched route.
pub static HTTP_REQUEST_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    register_histogram_vec!(
        "accounting_http_request_duration_seconds",
        "HTTP request duration in seconds",
        &["method", "route"],
        vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0]
    )
    .expect("Failed to register HTTP_REQUEST_DURATION")
});

/// Histogram for database query duration.
pub static DB_QUERY_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    register_histogram_vec!(
        "accounting_db_query_duration_seconds",
        "Database query duration in seconds",
        &["operation"],
        vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5]
    )
    .expect("Failed to register DB_QUERY_DURATION")
});

/// Counter for ingestion attempts by outcome.
pub static INGEST_BATCHES: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "accounting_ingest_batches_total",
        "Total number of spreadsheet ingestion attempts",
        &["status"]
    )
    .expect("Failed to register INGEST_BATCHES")
});

/// Counter for ingested rows by outcome (inserted, duplicate, replaced).
pub static INGEST_ROWS: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "accounting_ingest_rows_total",
        "Total number of rows processed by ingestion",
        &["outcome"]
    )
    .expect("Failed to register INGEST_ROWS")
});

/// Counter for records removed through explicit clearing.
pub static RECORDS_CLEARED: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "accounting_records_cleared_total",
        "Total number of records deleted by filter"
    )
    .expect("Failed to register RECORDS_CLEARED")
});

/// Counter for errors.
pub static ERRORS: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "accounting_errors_total",
        "Total number of errors",
        &["error_type"]
    )
    .expect("Failed to register ERRORS")
});

/// Initialize all metrics (forces lazy initialization).
pub fn init_metrics() {
    Lazy::force(&HTTP_REQUESTS);
    Lazy::force(&HTTP_REQUEST_DURATION);
    Lazy::force(&DB_QUERY_DURATION);
    Lazy::force(&INGEST_BATCHES);
    Lazy::force(&INGEST_ROWS);
    Lazy::force(&RECORDS_CLEARED);
    Lazy::force(&ERRORS);
}

/// Get all metrics as Prometheus text format.
pub fn get_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();

    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::error!("Failed to encode metrics: {}", e);
        return format!("# Failed to encode metrics: {}\n", e);
    }

    String::from_utf8(buffer).unwrap_or_else(|e| {
        tracing::error!("Metrics output is not UTF-8: {}", e);
        String::new()
    })
}

/// Record a served HTTP request.
pub fn record_http_request(method: &str, route: &str, status: &str, duration_secs: f64) {
    HTTP_REQUESTS
        .with_label_values(&[method, route, status])
        .inc();
    HTTP_REQUEST_DURATION
        .with_label_values(&[method, route])
        .observe(duration_secs);
}

/// Record the outcome of one ingestion attempt.
pub fn record_ingest(status: &str, inserted: u64, duplicates: u64, replaced: u64) {
    INGEST_BATCHES.with_label_values(&[status]).inc();
    INGEST_ROWS
        .with_label_values(&["inserted"])
        .inc_by(inserted as f64);
    INGEST_ROWS
        .with_label_values(&["duplicate"])
        .inc_by(duplicates as f64);
    INGEST_ROWS
        .with_label_values(&["replaced"])
        .inc_by(replaced as f64);
}

/// Record records removed by an explicit clear.
pub fn record_cleared(count: u64) {
    RECORDS_CLEARED.inc_by(count);
}

/// Record an error.
pub fn record_error(error_type: &str) {
    ERRORS.with_label_values(&[error_type]).inc();
}
