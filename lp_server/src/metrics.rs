//! Prometheus metrics for the pairing server.
//!
//! Metrics are exposed in Prometheus text format by a dedicated scrape
//! listener (see `METRICS_BIND`). Without an installed exporter every
//! recording call is a no-op.
//!
//! # Example Usage
//!
//! ```rust,no_run
//! use lp_server::metrics;
//! use std::net::SocketAddr;
//!
//! let addr: SocketAddr = "127.0.0.1:9090".parse().unwrap();
//! metrics::init_metrics(addr).unwrap();
//!
//! metrics::pairings_generated("add_block", 12);
//! ```

use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;

/// Initialize Prometheus metrics exporter.
///
/// Metrics will be available at `http://<addr>/metrics`.
///
/// # Arguments
///
/// - `addr`: Address to bind the metrics server to (e.g., `0.0.0.0:9090`)
pub fn init_metrics(addr: SocketAddr) -> Result<(), String> {
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|e| format!("Failed to install Prometheus exporter: {}", e))
}

// ============================================================================
// HTTP Metrics
// ============================================================================

/// Record HTTP request with method, path, and status labels.
pub fn http_requests_total(method: &str, path: &str, status: u16) {
    metrics::counter!("http_requests_total",
        "method" => method.to_string(),
        "path" => path.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
}

/// Record HTTP request duration in milliseconds.
pub fn http_request_duration_ms(method: &str, path: &str, duration_ms: f64) {
    metrics::histogram!("http_request_duration_ms",
        "method" => method.to_string(),
        "path" => path.to_string()
    )
    .record(duration_ms);
}

// ============================================================================
// Pairing Metrics
// ============================================================================

/// Count pairings committed by a generator operation.
pub fn pairings_generated(operation: &'static str, count: usize) {
    metrics::counter!("pairings_generated_total", "operation" => operation)
        .increment(count as u64);
}

/// Count operations rejected with a validation, conflict, referential
/// integrity, not-found or internal error.
pub fn operation_rejected(operation: &'static str, kind: &'static str) {
    metrics::counter!("operations_rejected_total",
        "operation" => operation,
        "kind" => kind
    )
    .increment(1);
}

/// Count optimistic-concurrency conflicts separately for alerting.
pub fn pairing_conflicts_total() {
    metrics::counter!("pairing_conflicts_total").increment(1);
}
