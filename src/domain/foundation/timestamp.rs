//! Timestamp value object for immutable points in time.
//!
//! Quota logic never reads the system clock directly; callers inject a
//! `Timestamp` so period-boundary behavior stays deterministic in tests.

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Immutable point in time, always UTC.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    /// Creates a timestamp for the current moment.
    ///
    /// Only the outermost layers (HTTP handlers, `main`) call this; the
    /// core receives the value as a parameter.
    pub fn now() -> Self {
        Self(Utc::now())
    }

    /// Creates a timestamp from a DateTime<Utc>.
    pub fn from_datetime(dt: DateTime<Utc>) -> Self {
        Self(dt)
    }

    /// Returns the inner DateTime.
    pub fn as_datetime(&self) -> &DateTime<Utc> {
        &self.0
    }

    /// Checks if this timestamp is before another.
    pub fn is_before(&self, other: &Timestamp) -> bool {
        self.0 < other.0
    }

    /// Returns the first instant of this timestamp's calendar month (UTC).
    ///
    /// This is the natural key for a usage period.
    pub fn start_of_month(&self) -> Self {
        let first = self.0.date_naive().with_day(1).unwrap();
        Self(first.and_hms_opt(0, 0, 0).unwrap().and_utc())
    }

    /// Returns the first instant of the following calendar month (UTC).
    ///
    /// Usage accumulated before this point is invisible to the next period.
    pub fn next_month_start(&self) -> Self {
        let date = self.0.date_naive();
        let (year, month) = if date.month() == 12 {
            (date.year() + 1, 1)
        } else {
            (date.year(), date.month() + 1)
        };
        let first = NaiveDate::from_ymd_opt(year, month, 1).unwrap();
        Self(first.and_hms_opt(0, 0, 0).unwrap().and_utc())
    }

    /// Creates a timestamp from Unix seconds.
    pub fn from_unix_secs(secs: u64) -> Self {
        use chrono::TimeZone;
        Self(Utc.timestamp_opt(secs as i64, 0).unwrap())
    }

    /// Returns the timestamp as Unix seconds.
    pub fn as_unix_secs(&self) -> u64 {
        self.0.timestamp() as u64
    }
}

impl Default for Timestamp {
    fn default() -> Self {
        Self::now()
    }
}

impl std::fmt::Display for Timestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.to_rfc3339())
    }
}
