//! # rally-metrics-adapters
//!
//! Adapter implementations for ports (clock, index templates, document store,
//! structured logging). This crate depends on `ports`, `domain` and `shared`.

pub mod clock;
/// Elasticsearch REST document store.
#[cfg(feature = "elasticsearch")]
pub mod elasticsearch;
pub mod log_sink;
pub mod logger;
pub mod template;

/// Returns the adapters crate version.
#[must_use]
pub const fn adapters_crate_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
