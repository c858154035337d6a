//! Yearly index naming.

use crate::primitives::PrimitiveError;
use crate::trial::TrialTimestamp;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Prefix shared by every metrics index.
pub const INDEX_PREFIX: &str = "rally-";

/// Pattern matching every metrics index (used by the index template).
pub const INDEX_PATTERN: &str = "rally-*";

const MAX_INDEX_NAME_BYTES: usize = 255;
const FORBIDDEN_CHARACTERS: &[char] = &['/', '\\', '*', '?', '"', '<', '>', '|', ',', '#', ':'];

/// Validated document store index name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct IndexName(Box<str>);

impl IndexName {
    /// Parse an index name supplied from outside the store.
    ///
    /// Names must be non-empty, lowercase, at most 255 bytes, must not start
    /// with `-`, `_` or `+`, must not be `.` or `..`, and must not contain
    /// whitespace or any of `/\*?"<>|,#:`.
    pub fn parse(input: impl AsRef<str>) -> Result<Self, PrimitiveError> {
        let trimmed = input.as_ref().trim();
        let invalid = |reason: &'static str| PrimitiveError::InvalidIndexName {
            input: trimmed.to_owned(),
            reason,
        };

        if trimmed.is_empty() {
            return Err(invalid("must be non-empty"));
        }
        if trimmed.len() > MAX_INDEX_NAME_BYTES {
            return Err(invalid("must be at most 255 bytes"));
        }
        if trimmed == "." || trimmed == ".." {
            return Err(invalid("must not be `.` or `..`"));
        }
        if trimmed.starts_with(['-', '_', '+']) {
            return Err(invalid("must not start with `-`, `_` or `+`"));
        }
        if trimmed.chars().any(char::is_uppercase) {
            return Err(invalid("must be lowercase"));
        }
        if trimmed
            .chars()
            .any(|ch| ch.is_whitespace() || FORBIDDEN_CHARACTERS.contains(&ch))
        {
            return Err(invalid("contains a forbidden character"));
        }

        Ok(Self(trimmed.into()))
    }

    /// Access the underlying string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for IndexName {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl fmt::Display for IndexName {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

impl TryFrom<String> for IndexName {
    type Error = PrimitiveError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl From<IndexName> for String {
    fn from(value: IndexName) -> Self {
        value.0.into_string()
    }
}

/// Derive the index a trial's metrics live in: `rally-` plus the
/// zero-padded four-digit year of the trial timestamp.
#[must_use]
pub fn index_name_for(trial_timestamp: &TrialTimestamp) -> IndexName {
    IndexName(format!("{INDEX_PREFIX}{:04}", trial_timestamp.year()).into_boxed_str())
}
