//! Firestore metrics collection.

use metrics::{counter, histogram};

/// Metric name constants for consistency.
pub mod names {
    /// Total Firestore requests by operation and status.
    pub const REQUESTS_TOTAL: &str = "firestore_requests_total";

    /// Request latency in seconds by operation.
    pub const LATENCY_SECONDS: &str = "firestore_latency_seconds";

    /// Documents returned by queries.
    pub const QUERY_DOCUMENTS_RETURNED_TOTAL: &str = "firestore_query_documents_returned_total";

    /// Like increments committed.
    pub const LIKES_WRITTEN_TOTAL: &str = "firestore_likes_written_total";
}

/// Record metrics for a completed Firestore request.
pub fn record_request(operation: &str, status: u16, latency_ms: f64) {
    counter!(
        names::REQUESTS_TOTAL,
        "operation" => operation.to_string(),
        "status" => status.to_string()
    )
    .increment(1);

    histogram!(
        names::LATENCY_SECONDS,
        "operation" => operation.to_string()
    )
    .record(latency_ms / 1000.0);
}

/// Record the size of a query result.
pub fn record_query_documents(collection: &str, count: usize) {
    counter!(
        names::QUERY_DOCUMENTS_RETURNED_TOTAL,
        "collection" => collection.to_string()
    )
    .increment(count as u64);
}

/// Record a committed like increment.
pub fn record_like_written() {
    counter!(names::LIKES_WRITTEN_TOTAL).increment(1);
}
