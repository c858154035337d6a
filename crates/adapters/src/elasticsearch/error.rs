//! Elasticsearch error mapping helpers.

use rally_metrics_shared::{ErrorClass, ErrorCode, ErrorEnvelope};
use serde_json::Value;

const PROVIDER_ID: &str = "elasticsearch";
const MAX_BODY_EXCERPT: usize = 512;

/// Context payload attached to Elasticsearch error envelopes.
#[derive(Debug, Clone)]
pub struct ElasticsearchErrorContext {
    /// Operation label (e.g. `elasticsearch.bulk_index`).
    pub operation: &'static str,
    /// Index the request targeted, when index-scoped.
    pub index: Option<String>,
    /// Request path relative to the base URL.
    pub endpoint: Option<String>,
}

impl ElasticsearchErrorContext {
    /// Context for one request.
    #[must_use]
    pub fn new(operation: &'static str, index: Option<&str>, endpoint: &str) -> Self {
        Self {
            operation,
            index: index.map(ToOwned::to_owned),
            endpoint: Some(endpoint.to_owned()),
        }
    }

    fn annotate(&self, envelope: ErrorEnvelope) -> ErrorEnvelope {
        let mut envelope = envelope
            .with_metadata("provider", PROVIDER_ID)
            .with_metadata("operation", self.operation);
        if let Some(index) = self.index.as_ref() {
            envelope = envelope.with_metadata("index", index.to_owned());
        }
        if let Some(endpoint) = self.endpoint.as_ref() {
            envelope = envelope.with_metadata("endpoint", endpoint.to_owned());
        }
        envelope
    }
}

/// Maps a non-success HTTP status and its body into a shared envelope.
pub fn map_http_status_error(
    status: u16,
    body: &str,
    ctx: &ElasticsearchErrorContext,
) -> ErrorEnvelope {
    let reason = error_reason(body).unwrap_or_else(|| excerpt(body));
    let (code, class) = match status {
        408 | 504 => (store_timeout_code(), ErrorClass::Retriable),
        429 | 502 | 503 => (store_http_status_code(), ErrorClass::Retriable),
        _ => (store_http_status_code(), ErrorClass::NonRetriable),
    };
    let message = if reason.is_empty() {
        format!("Elasticsearch returned HTTP {status}")
    } else {
        format!("Elasticsearch returned HTTP {status}: {reason}")
    };

    ctx.annotate(ErrorEnvelope::unexpected(code, message, class))
        .with_metadata("http_status", status.to_string())
}

/// Maps reqwest transport errors into shared envelopes.
pub fn map_transport_error(
    error: &reqwest::Error,
    ctx: &ElasticsearchErrorContext,
) -> ErrorEnvelope {
    let envelope = if error.is_timeout() {
        ErrorEnvelope::unexpected(
            store_timeout_code(),
            format!("Elasticsearch request timed out: {error}"),
            ErrorClass::Retriable,
        )
    } else if error.is_connect() {
        ErrorEnvelope::unexpected(
            store_connection_code(),
            format!("Elasticsearch connection failed: {error}"),
            ErrorClass::Retriable,
        )
    } else {
        ErrorEnvelope::unexpected(
            store_connection_code(),
            format!("Elasticsearch request failed: {error}"),
            ErrorClass::NonRetriable,
        )
    };
    ctx.annotate(envelope)
}

/// A response the adapter could not decode.
pub fn invalid_response(
    message: impl Into<String>,
    ctx: &ElasticsearchErrorContext,
) -> ErrorEnvelope {
    ctx.annotate(ErrorEnvelope::unexpected(
        ErrorCode::new("store", "invalid_response"),
        message,
        ErrorClass::NonRetriable,
    ))
}

/// A bulk request the store accepted but whose items (partly) failed.
pub fn bulk_rejected(
    failed: usize,
    total: usize,
    reason: Option<&str>,
    ctx: &ElasticsearchErrorContext,
) -> ErrorEnvelope {
    let reason = reason.unwrap_or("no reason given");
    ctx.annotate(ErrorEnvelope::unexpected(
        ErrorCode::new("store", "bulk_rejected"),
        format!("Elasticsearch rejected {failed} of {total} documents: {reason}"),
        ErrorClass::NonRetriable,
    ))
    .with_metadata("failed_items", failed.to_string())
}

/// Extract `error.reason` (or a plain string `error`) from an Elasticsearch
/// error body.
pub fn error_reason(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    match value.get("error")? {
        Value::String(reason) => Some(reason.clone()),
        Value::Object(error) => error
            .get("reason")
            .and_then(Value::as_str)
            .map(ToOwned::to_owned),
        _ => None,
    }
}

/// Extract `error.type` from an Elasticsearch error body.
pub fn error_type(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    value
        .get("error")?
        .get("type")
        .and_then(Value::as_str)
        .map(ToOwned::to_owned)
}

fn excerpt(body: &str) -> String {
    let trimmed = body.trim();
    match trimmed.char_indices().nth(MAX_BODY_EXCERPT) {
        Some((cut, _)) => format!("{}...", trimmed.get(..cut).unwrap_or(trimmed)),
        None => trimmed.to_owned(),
    }
}

fn store_timeout_code() -> ErrorCode {
    ErrorCode::new("store", "timeout")
}

fn store_connection_code() -> ErrorCode {
    ErrorCode::new("store", "connection")
}

fn store_http_status_code() -> ErrorCode {
    ErrorCode::new("store", "http_status")
}
