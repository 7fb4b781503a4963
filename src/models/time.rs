//! Timestamp handling
//!
//! All persisted timestamps are naive UTC in `%Y-%m-%dT%H:%M:%S` form, which
//! keeps them lexicographically ordered as sort keys. Clients submit local
//! times with an IANA timezone name; conversion to UTC happens once at the
//! edge and everything downstream compares plain UTC values.

use chrono::{LocalResult, NaiveDateTime, TimeZone, Timelike, Utc};
use chrono_tz::Tz;

/// Wire and storage format for all timestamps
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum TimeError {
    #[error("invalid timestamp: '{0}'")]
    InvalidTimestamp(String),

    #[error("unknown timezone: '{0}'")]
    UnknownTimezone(String),

    #[error("local time '{0}' does not exist in timezone '{1}'")]
    NonexistentLocalTime(String, String),
}

/// Current UTC time, truncated to whole seconds.
///
/// Formatting drops sub-second precision anyway; truncating here keeps
/// comparisons between fresh and round-tripped values exact.
pub fn now() -> NaiveDateTime {
    let n = Utc::now().naive_utc();
    n.with_nanosecond(0).unwrap_or(n)
}

/// Parse a timestamp in the canonical format.
pub fn parse(s: &str) -> Result<NaiveDateTime, TimeError> {
    NaiveDateTime::parse_from_str(s, TIMESTAMP_FORMAT)
        .map_err(|_| TimeError::InvalidTimestamp(s.to_string()))
}

/// Format a timestamp in the canonical format.
pub fn format(t: &NaiveDateTime) -> String {
    t.format(TIMESTAMP_FORMAT).to_string()
}

/// Sort-key prefix covering one whole hour, e.g. `2024-06-01T10:`.
pub fn hour_bucket(t: &NaiveDateTime) -> String {
    t.format("%Y-%m-%dT%H:").to_string()
}

/// Convert a local wall-clock time in the named IANA timezone to UTC.
///
/// Ambiguous times (the repeated hour when clocks fall back) resolve to the
/// earlier instant; times skipped by a spring-forward gap are an error.
pub fn to_utc(local: &NaiveDateTime, timezone: &str) -> Result<NaiveDateTime, TimeError> {
    let tz: Tz = timezone
        .parse()
        .map_err(|_| TimeError::UnknownTimezone(timezone.to_string()))?;

    match tz.from_local_datetime(local) {
        LocalResult::Single(dt) => Ok(dt.naive_utc()),
        LocalResult::Ambiguous(earlier, _) => Ok(earlier.naive_utc()),
        LocalResult::None => Err(TimeError::NonexistentLocalTime(
            format(local),
            timezone.to_string(),
        )),
    }
}

/// Convert a UTC time to local wall-clock time in the named IANA timezone.
pub fn from_utc(utc: &NaiveDateTime, timezone: &str) -> Result<NaiveDateTime, TimeError> {
    let tz: Tz = timezone
        .parse()
        .map_err(|_| TimeError::UnknownTimezone(timezone.to_string()))?;

    Ok(tz.from_utc_datetime(utc).naive_local())
}

/// Serde adapter persisting `NaiveDateTime` fields in the canonical format.
pub mod ts_format {
    use chrono::NaiveDateTime;
    use serde::{self, Deserialize, Deserializer, Serializer};

    use super::TIMESTAMP_FORMAT;

    pub fn serialize<S>(t: &NaiveDateTime, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&t.format(TIMESTAMP_FORMAT).to_string())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<NaiveDateTime, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        NaiveDateTime::parse_from_str(&s, TIMESTAMP_FORMAT).map_err(serde::de::Error::custom)
    }
}
