//! Test fixtures for store error codes and envelopes.

use rally_metrics_shared::{ErrorClass, ErrorCode, ErrorEnvelope};

/// Return the error codes a document store adapter may surface.
pub fn store_error_codes() -> Vec<ErrorCode> {
    vec![
        ErrorCode::new("store", "connection"),
        ErrorCode::new("store", "timeout"),
        ErrorCode::new("store", "http_status"),
        ErrorCode::new("store", "invalid_response"),
        ErrorCode::new("store", "bulk_rejected"),
    ]
}

/// A retriable connection failure fixture.
pub fn connection_error() -> ErrorEnvelope {
    ErrorEnvelope::unexpected(
        ErrorCode::new("store", "connection"),
        "connection refused",
        ErrorClass::Retriable,
    )
}

/// A retriable timeout fixture.
pub fn timeout_error() -> ErrorEnvelope {
    ErrorEnvelope::unexpected(
        ErrorCode::new("store", "timeout"),
        "request timed out",
        ErrorClass::Retriable,
    )
}

/// A bulk item rejection fixture.
pub fn bulk_rejected_error() -> ErrorEnvelope {
    ErrorEnvelope::unexpected(
        ErrorCode::new("store", "bulk_rejected"),
        "rejected 1 of 1 documents: mapper_parsing_exception",
        ErrorClass::NonRetriable,
    )
}

/// Missing index as reported by the store.
pub fn index_not_found_error(index: &str) -> ErrorEnvelope {
    ErrorEnvelope::unexpected(
        ErrorCode::new("store", "http_status"),
        format!("no such index [{index}]"),
        ErrorClass::NonRetriable,
    )
    .with_metadata("http_status", "404")
    .with_metadata("index", index.to_owned())
}
