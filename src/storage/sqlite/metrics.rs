//! Metrics for collection database reads and writes.

use std::time::Instant;

/// Records the count and latency of one database operation.
///
/// Emits `apkg_database_operations_total` and
/// `apkg_database_operation_duration_ms`, labelled by operation and status.
///
/// ```ignore
/// let start = Instant::now();
/// let result = read_raw_snapshot(&conn);
/// record_database_operation("read", start, result.is_ok());
/// ```
pub fn record_database_operation(operation: &'static str, start: Instant, success: bool) {
    let status = if success { "success" } else { "error" };
    metrics::counter!(
        "apkg_database_operations_total",
        "operation" => operation,
        "status" => status
    )
    .increment(1);
    metrics::histogram!(
        "apkg_database_operation_duration_ms",
        "operation" => operation,
        "status" => status
    )
    .record(start.elapsed().as_secs_f64() * 1000.0);
}
