//! Domain primitives with validated constructors.

use rally_metrics_shared::{ErrorCode, ErrorEnvelope};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Validation failures for domain primitives.
#[derive(Debug, Clone, PartialEq)]
pub enum PrimitiveError {
    /// `EnvironmentName` is empty after trimming.
    EmptyEnvironmentName {
        /// Length of the raw input before trimming.
        input_length: usize,
    },
    /// `TrackName` is empty after trimming.
    EmptyTrackName {
        /// Length of the raw input before trimming.
        input_length: usize,
    },
    /// `TrackSetupName` is empty after trimming.
    EmptyTrackSetupName {
        /// Length of the raw input before trimming.
        input_length: usize,
    },
    /// `MetricName` is empty after trimming.
    EmptyMetricName {
        /// Length of the raw input before trimming.
        input_length: usize,
    },
    /// A trial timestamp could not be parsed.
    InvalidTrialTimestamp {
        /// Raw input that failed to parse.
        input: String,
    },
    /// A trial timestamp year cannot be rendered as four digits.
    TrialYearOutOfRange {
        /// Offending year.
        year: i32,
    },
    /// An index name violates the document store naming rules.
    InvalidIndexName {
        /// Trimmed index name that failed validation.
        input: String,
        /// Rule that was violated.
        reason: &'static str,
    },
    /// A metric value is NaN or infinite.
    NonFiniteMetricValue {
        /// Offending value.
        value: f64,
    },
    /// A count does not fit the signed 64-bit range of the document schema.
    CountOutOfRange {
        /// Offending count.
        count: u64,
    },
}

impl PrimitiveError {
    fn error_code(&self) -> ErrorCode {
        match self {
            Self::EmptyEnvironmentName { .. } => ErrorCode::new("domain", "invalid_environment"),
            Self::EmptyTrackName { .. } => ErrorCode::new("domain", "invalid_track"),
            Self::EmptyTrackSetupName { .. } => ErrorCode::new("domain", "invalid_track_setup"),
            Self::EmptyMetricName { .. } => ErrorCode::new("domain", "invalid_metric_name"),
            Self::InvalidTrialTimestamp { .. } | Self::TrialYearOutOfRange { .. } => {
                ErrorCode::new("domain", "invalid_trial_timestamp")
            },
            Self::InvalidIndexName { .. } => ErrorCode::new("domain", "invalid_index_name"),
            Self::NonFiniteMetricValue { .. } | Self::CountOutOfRange { .. } => {
                ErrorCode::new("domain", "invalid_metric_value")
            },
        }
    }
}

impl fmt::Display for PrimitiveError {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyEnvironmentName { .. } => {
                formatter.write_str("EnvironmentName must be non-empty")
            },
            Self::EmptyTrackName { .. } => formatter.write_str("TrackName must be non-empty"),
            Self::EmptyTrackSetupName { .. } => {
                formatter.write_str("TrackSetupName must be non-empty")
            },
            Self::EmptyMetricName { .. } => formatter.write_str("MetricName must be non-empty"),
            Self::InvalidTrialTimestamp { input } => write!(
                formatter,
                "invalid trial timestamp `{input}` (expected YYYYMMDDTHHMMSSZ, RFC 3339, or YYYY-MM-DDTHH:MM:SS)"
            ),
            Self::TrialYearOutOfRange { year } => {
                write!(formatter, "trial year {year} is outside 0..=9999")
            },
            Self::InvalidIndexName { input, reason } => {
                write!(formatter, "invalid index name `{input}`: {reason}")
            },
            Self::NonFiniteMetricValue { value } => {
                write!(formatter, "metric value must be finite (got {value})")
            },
            Self::CountOutOfRange { count } => {
                write!(formatter, "count {count} exceeds the supported range")
            },
        }
    }
}

impl std::error::Error for PrimitiveError {}

impl From<PrimitiveError> for ErrorEnvelope {
    fn from(error: PrimitiveError) -> Self {
        let envelope = Self::expected(error.error_code(), error.to_string());

        match error {
            PrimitiveError::EmptyEnvironmentName { input_length }
            | PrimitiveError::EmptyTrackName { input_length }
            | PrimitiveError::EmptyTrackSetupName { input_length }
            | PrimitiveError::EmptyMetricName { input_length } => {
                envelope.with_metadata("input_length", input_length.to_string())
            },
            PrimitiveError::InvalidTrialTimestamp { input } => {
                envelope.with_metadata("input", input)
            },
            PrimitiveError::TrialYearOutOfRange { year } => {
                envelope.with_metadata("year", year.to_string())
            },
            PrimitiveError::InvalidIndexName { input, reason } => envelope
                .with_metadata("input", input)
                .with_metadata("reason", reason),
            PrimitiveError::NonFiniteMetricValue { value } => {
                envelope.with_metadata("value", value.to_string())
            },
            PrimitiveError::CountOutOfRange { count } => {
                envelope.with_metadata("count", count.to_string())
            },
        }
    }
}

macro_rules! non_empty_name {
    ($(#[$meta:meta])* $name:ident, $error:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(try_from = "String", into = "String")]
        pub struct $name(Box<str>);

        impl $name {
            #[doc = concat!("Parse a `", stringify!($name), "` from user input (trimmed, non-empty).")]
            pub fn parse(input: impl AsRef<str>) -> Result<Self, PrimitiveError> {
                let raw = input.as_ref();
                let Some(trimmed) = trimmed_non_empty(raw) else {
                    return Err(PrimitiveError::$error {
                        input_length: raw.len(),
                    });
                };

                Ok(Self(trimmed.to_owned().into_boxed_str()))
            }

            /// Access the underlying string.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                self.as_str()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
                formatter.write_str(self.as_str())
            }
        }

        impl TryFrom<String> for $name {
            type Error = PrimitiveError;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                Self::parse(value)
            }
        }

        impl From<$name> for String {
            fn from(value: $name) -> Self {
                value.0.into_string()
            }
        }
    };
}

non_empty_name!(
    /// Logical deployment name metrics are recorded under (e.g. `unittest`).
    EnvironmentName,
    EmptyEnvironmentName
);

non_empty_name!(
    /// Name of the benchmarked workload.
    TrackName,
    EmptyTrackName
);

non_empty_name!(
    /// Name of the configuration variant of a track.
    TrackSetupName,
    EmptyTrackSetupName
);

non_empty_name!(
    /// Metric identifier (e.g. `indexing_throughput`).
    MetricName,
    EmptyMetricName
);

fn trimmed_non_empty(input: &str) -> Option<&str> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed)
    }
}
