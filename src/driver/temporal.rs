//! Temporal host objects.
//!
//! Temporal values cross the host boundary as JSON objects tagged with
//! `objectType` and carrying their raw integer components. Decoded objects
//! also get a `display` string rendered with chrono at millisecond
//! resolution, or `null` when the value is outside chrono's range.

use chrono::{DateTime, Days, NaiveDate, NaiveTime};
use serde_json::{json, Value};

use super::types::{Date, Duration, LocalDateTime, LocalTime};

/// Key that marks a host object as a temporal value.
pub const OBJECT_TYPE_KEY: &str = "objectType";

const NANOS_PER_SECOND: i64 = 1_000_000_000;
const NANOS_PER_MILLI: i64 = 1_000_000;

/// Temporal kinds recognised in `objectType`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemporalKind {
    /// `date`
    Date,
    /// `local_time`
    LocalTime,
    /// `local_date_time`
    LocalDateTime,
    /// `duration`
    Duration,
}

impl TemporalKind {
    /// Parse an `objectType` value. Anything else is not temporal.
    pub fn parse(object_type: &str) -> Option<Self> {
        match object_type {
            "date" => Some(TemporalKind::Date),
            "local_time" => Some(TemporalKind::LocalTime),
            "local_date_time" => Some(TemporalKind::LocalDateTime),
            "duration" => Some(TemporalKind::Duration),
            _ => None,
        }
    }

    /// The `objectType` string.
    pub fn as_str(self) -> &'static str {
        match self {
            TemporalKind::Date => "date",
            TemporalKind::LocalTime => "local_time",
            TemporalKind::LocalDateTime => "local_date_time",
            TemporalKind::Duration => "duration",
        }
    }
}

// ===== Host object constructors =====

/// Host object for a date, `days` since 1970-01-01.
pub fn date(days: i64) -> Value {
    json!({ OBJECT_TYPE_KEY: TemporalKind::Date.as_str(), "days": days })
}

/// Host object for a local time, `nanoseconds` since midnight.
pub fn local_time(nanoseconds: i64) -> Value {
    json!({ OBJECT_TYPE_KEY: TemporalKind::LocalTime.as_str(), "nanoseconds": nanoseconds })
}

/// Host object for a local date-time.
pub fn local_date_time(seconds: i64, nanoseconds: i64) -> Value {
    json!({
        OBJECT_TYPE_KEY: TemporalKind::LocalDateTime.as_str(),
        "seconds": seconds,
        "nanoseconds": nanoseconds,
    })
}

/// Host object for a duration without a month component.
pub fn duration(days: i64, seconds: i64, nanoseconds: i64) -> Value {
    json!({
        OBJECT_TYPE_KEY: TemporalKind::Duration.as_str(),
        "months": 0,
        "days": days,
        "seconds": seconds,
        "nanoseconds": nanoseconds,
    })
}

// ===== chrono views =====

impl Date {
    /// Calendar date, if representable.
    pub fn to_chrono(self) -> Option<NaiveDate> {
        let epoch = NaiveDate::from_ymd_opt(1970, 1, 1)?;
        if self.days >= 0 {
            epoch.checked_add_days(Days::new(self.days as u64))
        } else {
            epoch.checked_sub_days(Days::new(self.days.unsigned_abs()))
        }
    }

    /// `YYYY-MM-DD`
    pub fn display(self) -> Option<String> {
        self.to_chrono().map(|d| d.format("%Y-%m-%d").to_string())
    }
}

impl LocalTime {
    /// Wall-clock time, if within one day.
    pub fn to_chrono(self) -> Option<NaiveTime> {
        if !(0..86_400 * NANOS_PER_SECOND).contains(&self.nanoseconds) {
            return None;
        }
        NaiveTime::from_num_seconds_from_midnight_opt(
            (self.nanoseconds / NANOS_PER_SECOND) as u32,
            (self.nanoseconds % NANOS_PER_SECOND) as u32,
        )
    }

    /// `HH:MM:SS.mmm`
    pub fn display(self) -> Option<String> {
        self.to_chrono().map(|t| t.format("%H:%M:%S%.3f").to_string())
    }
}

impl LocalDateTime {
    /// Naive date-time, if representable.
    pub fn to_chrono(self) -> Option<chrono::NaiveDateTime> {
        let nanos = u32::try_from(self.nanoseconds)
            .ok()
            .filter(|n| (*n as i64) < NANOS_PER_SECOND)?;
        DateTime::from_timestamp(self.seconds, nanos).map(|dt| dt.naive_utc())
    }

    /// `YYYY-MM-DDTHH:MM:SS.mmm`
    pub fn display(self) -> Option<String> {
        self.to_chrono()
            .map(|dt| dt.format("%Y-%m-%dT%H:%M:%S%.3f").to_string())
    }
}

impl Duration {
    /// ISO-8601 `P{m}M{d}DT{s}.{mmm}S`, with seconds and nanoseconds folded
    /// together and truncated to milliseconds.
    pub fn display(self) -> String {
        let total = self.seconds as i128 * NANOS_PER_SECOND as i128 + self.nanoseconds as i128;
        let sign = if total < 0 { "-" } else { "" };
        let abs = total.unsigned_abs();
        let whole = abs / NANOS_PER_SECOND as u128;
        let millis = (abs % NANOS_PER_SECOND as u128) / NANOS_PER_MILLI as u128;
        format!(
            "P{}M{}DT{}{}.{:03}S",
            self.months, self.days, sign, whole, millis
        )
    }
}
