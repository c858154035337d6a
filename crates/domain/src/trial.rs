//! Trial identity: the start instant of a benchmark run and its recording context.

use crate::primitives::{EnvironmentName, PrimitiveError, TrackName, TrackSetupName};
use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, SubsecRound, Utc};
use std::fmt;

/// Compact UTC stamp format used on the wire (`20160131T000000Z`).
pub const COMPACT_STAMP_FORMAT: &str = "%Y%m%dT%H%M%SZ";

const NAIVE_ISO_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

const MAX_YEAR: i32 = 9_999;

/// Start instant of a trial, UTC, truncated to whole seconds.
///
/// The year is restricted to `0..=9999` so index names always carry a
/// four-digit year.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TrialTimestamp(DateTime<Utc>);

impl TrialTimestamp {
    /// Wrap a UTC instant; sub-second precision is dropped.
    pub fn new(instant: DateTime<Utc>) -> Result<Self, PrimitiveError> {
        let year = instant.year();
        if !(0..=MAX_YEAR).contains(&year) {
            return Err(PrimitiveError::TrialYearOutOfRange { year });
        }
        Ok(Self(instant.trunc_subsecs(0)))
    }

    /// Build a timestamp from calendar fields, interpreted as UTC.
    pub fn from_ymd_hms(
        year: i32,
        month: u32,
        day: u32,
        hour: u32,
        minute: u32,
        second: u32,
    ) -> Result<Self, PrimitiveError> {
        let naive = NaiveDate::from_ymd_opt(year, month, day)
            .and_then(|date| date.and_hms_opt(hour, minute, second))
            .ok_or_else(|| PrimitiveError::InvalidTrialTimestamp {
                input: format!("{year:04}-{month:02}-{day:02}T{hour:02}:{minute:02}:{second:02}"),
            })?;
        Self::new(naive.and_utc())
    }

    /// Parse a compact stamp, an RFC 3339 instant, or a naive ISO date-time (UTC).
    pub fn parse(input: &str) -> Result<Self, PrimitiveError> {
        let trimmed = input.trim();
        let invalid = || PrimitiveError::InvalidTrialTimestamp {
            input: trimmed.to_owned(),
        };

        if let Ok(naive) = NaiveDateTime::parse_from_str(trimmed, COMPACT_STAMP_FORMAT) {
            return Self::new(naive.and_utc());
        }
        if let Ok(instant) = DateTime::parse_from_rfc3339(trimmed) {
            return Self::new(instant.with_timezone(&Utc));
        }
        NaiveDateTime::parse_from_str(trimmed, NAIVE_ISO_FORMAT)
            .map_err(|_| invalid())
            .and_then(|naive| Self::new(naive.and_utc()))
    }

    /// Calendar year of the trial.
    #[must_use]
    pub fn year(&self) -> i32 {
        self.0.year()
    }

    /// Render as `YYYYMMDDTHHMMSSZ`.
    #[must_use]
    pub fn to_compact_stamp(&self) -> String {
        self.0.format(COMPACT_STAMP_FORMAT).to_string()
    }

    /// Underlying UTC instant.
    #[must_use]
    pub const fn as_datetime(&self) -> DateTime<Utc> {
        self.0
    }
}

impl fmt::Display for TrialTimestamp {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(&self.to_compact_stamp())
    }
}

/// Identifies the active recording session of a metrics store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrialContext {
    trial_timestamp: TrialTimestamp,
    track: TrackName,
    track_setup: TrackSetupName,
    environment: EnvironmentName,
}

impl TrialContext {
    /// Create a trial context.
    #[must_use]
    pub const fn new(
        trial_timestamp: TrialTimestamp,
        track: TrackName,
        track_setup: TrackSetupName,
        environment: EnvironmentName,
    ) -> Self {
        Self {
            trial_timestamp,
            track,
            track_setup,
            environment,
        }
    }

    /// Trial start instant.
    #[must_use]
    pub const fn trial_timestamp(&self) -> TrialTimestamp {
        self.trial_timestamp
    }

    /// Benchmarked track.
    #[must_use]
    pub const fn track(&self) -> &TrackName {
        &self.track
    }

    /// Track configuration variant.
    #[must_use]
    pub const fn track_setup(&self) -> &TrackSetupName {
        &self.track_setup
    }

    /// Environment the trial runs in.
    #[must_use]
    pub const fn environment(&self) -> &EnvironmentName {
        &self.environment
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compact_stamp_matches_wire_format() -> Result<(), PrimitiveError> {
        let timestamp = TrialTimestamp::from_ymd_hms(2016, 1, 31, 0, 0, 0)?;
        assert_eq!(timestamp.to_compact_stamp(), "20160131T000000Z");
        assert_eq!(timestamp.year(), 2016);
        Ok(())
    }

    #[test]
    fn parse_accepts_all_supported_formats() -> Result<(), PrimitiveError> {
        let expected = TrialTimestamp::from_ymd_hms(2016, 1, 31, 13, 5, 9)?;
        assert_eq!(TrialTimestamp::parse("20160131T130509Z")?, expected);
        assert_eq!(TrialTimestamp::parse("2016-01-31T13:05:09Z")?, expected);
        assert_eq!(TrialTimestamp::parse("2016-01-31T14:05:09+01:00")?, expected);
        assert_eq!(TrialTimestamp::parse(" 2016-01-31T13:05:09 ")?, expected);
        Ok(())
    }

    #[test]
    fn parse_rejects_garbage() {
        assert!(matches!(
            TrialTimestamp::parse("yesterday"),
            Err(PrimitiveError::InvalidTrialTimestamp { .. })
        ));
    }

    #[test]
    fn invalid_calendar_fields_are_rejected() {
        assert!(TrialTimestamp::from_ymd_hms(2016, 2, 30, 0, 0, 0).is_err());
        assert!(TrialTimestamp::from_ymd_hms(2016, 1, 1, 24, 0, 0).is_err());
    }

    #[test]
    fn five_digit_years_are_rejected() {
        assert!(matches!(
            TrialTimestamp::from_ymd_hms(10_000, 1, 1, 0, 0, 0),
            Err(PrimitiveError::TrialYearOutOfRange { year: 10_000 })
        ));
    }

    #[test]
    fn sub_second_precision_is_dropped() -> Result<(), PrimitiveError> {
        let instant = DateTime::parse_from_rfc3339("2016-01-31T00:00:00.750Z")
            .map_err(|_| PrimitiveError::InvalidTrialTimestamp {
                input: "fixture".into(),
            })?
            .with_timezone(&Utc);
        let timestamp = TrialTimestamp::new(instant)?;
        assert_eq!(timestamp, TrialTimestamp::from_ymd_hms(2016, 1, 31, 0, 0, 0)?);
        Ok(())
    }
}
