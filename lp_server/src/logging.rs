//! Structured logging configuration.
//!
//! The engine logs through the `log` facade; those records are forwarded
//! into the tracing subscriber installed here.

use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Filter used when `RUST_LOG` is not set
pub const DEFAULT_FILTER: &str = "info,sqlx=warn,hyper=warn";

/// Initialize structured logging.
///
/// Log levels are configurable via the `RUST_LOG` env var.
///
/// # Example
///
/// ```no_run
/// use lp_server::logging;
///
/// #[tokio::main]
/// async fn main() {
///     logging::init();
///     tracing::info!("Server starting");
/// }
/// ```
pub fn init() {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true);

    // `init` also installs the `log` -> tracing bridge
    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .init();

    tracing::info!("Structured logging initialized");
}

/// Log a rejected pairing or roster operation.
///
/// # Arguments
///
/// * `request_id` - Correlation ID of the failed request
/// * `operation` - Operation name (`add_block`, `delete_pairing`, ...)
/// * `division_id` - Division the operation targeted
/// * `kind` - Error category (`validation`, `conflict`, ...)
/// * `message` - Client-facing error message
pub fn log_rejected_operation(
    request_id: &str,
    operation: &str,
    division_id: i64,
    kind: &str,
    message: &str,
) {
    match kind {
        "internal" => tracing::error!(
            request_id = request_id,
            operation = operation,
            division_id = division_id,
            kind = kind,
            "Operation failed: {}",
            message
        ),
        _ => tracing::warn!(
            request_id = request_id,
            operation = operation,
            division_id = division_id,
            kind = kind,
            "Operation rejected: {}",
            message
        ),
    }
}

/// Log a committed batch of generated pairings
pub fn log_generated(operation: &str, division_id: i64, count: usize, duration_ms: u64) {
    tracing::info!(
        operation = operation,
        division_id = division_id,
        count = count,
        duration_ms = duration_ms,
        "Pairings generated"
    );

    if duration_ms > 1000 {
        tracing::warn!(
            operation = operation,
            duration_ms = duration_ms,
            "PERFORMANCE: Slow pairing generation"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_rejected_operation() {
        // Just ensure it doesn't panic
        log_rejected_operation("req-1", "delete_pairing", 1, "referential_integrity", "Game 3");
        log_rejected_operation("req-2", "add_block", 1, "internal", "Internal server error");
    }

    #[test]
    fn test_log_generated() {
        log_generated("add_block", 7, 12, 3);
        log_generated("add_elimination", 7, 63, 1500);
    }

    #[test]
    fn test_default_filter_parses() {
        assert!(EnvFilter::try_new(DEFAULT_FILTER).is_ok());
    }
}
