//! # rally-metrics-domain
//!
//! Domain model for benchmark trial metrics.
//!
//! - **Primitives** - `EnvironmentName`, `TrackName`, `TrackSetupName`, `MetricName`
//! - **Trial** - `TrialTimestamp`, `TrialContext`
//! - **Document** - `MetricDocument`, `MetricValue`, `DocType`
//! - **Index** - `IndexName`, `index_name_for`
//! - **Query** - `MetricQuery`
//!
//! ## Dependency Rules
//!
//! - Depends only on `shared` crate
//! - No infrastructure or adapter dependencies
//! - Pure domain logic with no I/O

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]

pub use rally_metrics_shared::shared_crate_version;

// =============================================================================
// DOMAIN MODULES
// =============================================================================

pub mod document;
pub mod index;
pub mod primitives;
pub mod query;
pub mod trial;

pub use document::{DocType, MetricDocument, MetricValue};
pub use index::{INDEX_PATTERN, INDEX_PREFIX, IndexName, index_name_for};
pub use primitives::{EnvironmentName, MetricName, PrimitiveError, TrackName, TrackSetupName};
pub use query::MetricQuery;
pub use trial::{COMPACT_STAMP_FORMAT, TrialContext, TrialTimestamp};

/// Returns the domain crate version.
#[must_use]
pub const fn domain_crate_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
