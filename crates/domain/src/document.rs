//! Metric document schema as stored in the document store.

use crate::primitives::{EnvironmentName, MetricName, PrimitiveError, TrackName, TrackSetupName};
use crate::trial::TrialContext;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Document type identifier used for both writes and reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DocType(&'static str);

impl DocType {
    /// The only document type metrics are stored under.
    pub const METRICS: Self = Self("metrics");

    /// Access the underlying string.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        self.0
    }
}

impl fmt::Display for DocType {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.0)
    }
}

/// Numeric measurement.
///
/// Serialized untagged so counts stay JSON integers; deserialization prefers
/// `Integer` and falls back to `Float`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetricValue {
    /// Whole-number measurement (counts, throughput in docs/s).
    Integer(i64),
    /// Floating-point measurement (latencies, ratios).
    Float(f64),
}

impl MetricValue {
    /// Build a value from an unsigned count.
    pub fn count(count: u64) -> Result<Self, PrimitiveError> {
        i64::try_from(count)
            .map(Self::Integer)
            .map_err(|_| PrimitiveError::CountOutOfRange { count })
    }

    /// Build a value from a float; NaN and infinities are rejected.
    pub fn float(value: f64) -> Result<Self, PrimitiveError> {
        if value.is_finite() {
            Ok(Self::Float(value))
        } else {
            Err(PrimitiveError::NonFiniteMetricValue { value })
        }
    }

    /// Lossy conversion for arithmetic and display.
    #[must_use]
    #[expect(
        clippy::cast_precision_loss,
        reason = "metric integers beyond 2^53 are not meaningful measurements"
    )]
    pub const fn as_f64(self) -> f64 {
        match self {
            Self::Integer(value) => value as f64,
            Self::Float(value) => value,
        }
    }
}

impl fmt::Display for MetricValue {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Integer(value) => write!(formatter, "{value}"),
            Self::Float(value) => write!(formatter, "{value}"),
        }
    }
}

/// One measurement of a trial.
///
/// Fields are private and have no setters: documents are append-only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricDocument {
    #[serde(rename = "@timestamp")]
    timestamp: i64,
    #[serde(rename = "trial-timestamp")]
    trial_timestamp: Box<str>,
    environment: EnvironmentName,
    track: TrackName,
    #[serde(rename = "track-setup")]
    track_setup: TrackSetupName,
    name: MetricName,
    value: MetricValue,
    unit: Box<str>,
}

impl MetricDocument {
    /// Build a document for the given context, recorded at `timestamp`
    /// (epoch seconds).
    #[must_use]
    pub fn new(
        context: &TrialContext,
        timestamp: i64,
        name: MetricName,
        value: MetricValue,
        unit: impl Into<Box<str>>,
    ) -> Self {
        Self {
            timestamp,
            trial_timestamp: context.trial_timestamp().to_compact_stamp().into_boxed_str(),
            environment: context.environment().clone(),
            track: context.track().clone(),
            track_setup: context.track_setup().clone(),
            name,
            value,
            unit: unit.into(),
        }
    }

    /// Recording time (epoch seconds).
    #[must_use]
    pub const fn timestamp(&self) -> i64 {
        self.timestamp
    }

    /// Trial start as a compact UTC stamp.
    #[must_use]
    pub fn trial_timestamp(&self) -> &str {
        &self.trial_timestamp
    }

    /// Environment name.
    #[must_use]
    pub const fn environment(&self) -> &EnvironmentName {
        &self.environment
    }

    /// Track name.
    #[must_use]
    pub const fn track(&self) -> &TrackName {
        &self.track
    }

    /// Track setup name.
    #[must_use]
    pub const fn track_setup(&self) -> &TrackSetupName {
        &self.track_setup
    }

    /// Metric name.
    #[must_use]
    pub const fn name(&self) -> &MetricName {
        &self.name
    }

    /// Measured value.
    #[must_use]
    pub const fn value(&self) -> MetricValue {
        self.value
    }

    /// Unit string.
    #[must_use]
    pub fn unit(&self) -> &str {
        &self.unit
    }
}
