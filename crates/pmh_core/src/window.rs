//! Date bound parsing and conversion of `from`/`until` into millisecond windows.

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// Lower bound used when `from` is absent (the epoch).
pub const EPOCH_START_MILLIS: i64 = 0;
/// Upper bound used when `until` is absent: 9999-12-31T23:59:59.999Z.
pub const FAR_FUTURE_MILLIS: i64 = 253_402_300_799_999;

const DAY_END_MILLIS: i64 = 24 * 60 * 60 * 1000 - 1;

/// A parsed `from`/`until` value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bound {
    Date(NaiveDate),
    DateTime(DateTime<FixedOffset>),
}

impl Bound {
    /// First millisecond covered by this bound.
    fn floor_millis(&self) -> i64 {
        match self {
            Bound::Date(date) => start_of_day_millis(*date),
            Bound::DateTime(dt) => dt.timestamp_millis(),
        }
    }

    /// Last millisecond covered by this bound.
    fn ceil_millis(&self) -> i64 {
        match self {
            Bound::Date(date) => start_of_day_millis(*date) + DAY_END_MILLIS,
            Bound::DateTime(dt) => dt.timestamp_millis(),
        }
    }
}

fn start_of_day_millis(date: NaiveDate) -> i64 {
    date.and_time(NaiveTime::MIN).and_utc().timestamp_millis()
}

/// Parses a bound. Values containing `T` are date-times (offset optional,
/// UTC when missing); everything else must be a `YYYY-MM-DD` date.
pub fn parse_bound(value: &str) -> Option<Bound> {
    let value = value.trim();
    if value.contains('T') {
        if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
            return Some(Bound::DateTime(dt));
        }
        let naive = NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f")
            .or_else(|_| NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M"))
            .ok()?;
        let utc = FixedOffset::east_opt(0)?;
        return utc.from_local_datetime(&naive).single().map(Bound::DateTime);
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .map(Bound::Date)
}

/// Validates a `from`/`until` pair.
///
/// Absent bounds always pass and a bound that fails to parse is rejected.
/// Otherwise the pair is rejected when `from` starts after `until` ends, so
/// bounds of mixed granularity are compared on the day they cover.
pub fn check_window(from: Option<&str>, until: Option<&str>) -> bool {
    let from = match from.map(parse_bound) {
        Some(None) => return false,
        Some(Some(bound)) => Some(bound),
        None => None,
    };
    let until = match until.map(parse_bound) {
        Some(None) => return false,
        Some(Some(bound)) => Some(bound),
        None => None,
    };
    match (from, until) {
        (Some(from), Some(until)) => from.floor_millis() <= until.ceil_millis(),
        _ => true,
    }
}

/// Inclusive millisecond range derived from request bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Window {
    pub from_millis: i64,
    pub until_millis: i64,
}

impl Window {
    pub const UNBOUNDED: Window = Window {
        from_millis: EPOCH_START_MILLIS,
        until_millis: FAR_FUTURE_MILLIS,
    };
}

/// Converts validated bounds into a millisecond window.
///
/// Date-only bounds widen to whole days. A zero-width result has its upper
/// end widened by 999 ms. Returns `None` if a supplied bound does not parse.
pub fn to_millis_window(from: Option<&str>, until: Option<&str>) -> Option<Window> {
    let from_millis = match from {
        Some(value) => parse_bound(value)?.floor_millis(),
        None => EPOCH_START_MILLIS,
    };
    let mut until_millis = match until {
        Some(value) => parse_bound(value)?.ceil_millis(),
        None => FAR_FUTURE_MILLIS,
    };
    if from_millis == until_millis {
        until_millis += 999;
    }
    Some(Window {
        from_millis,
        until_millis,
    })
}

/// Formats epoch millis the way datestamps are exposed to clients.
pub fn format_datestamp(millis: i64) -> Option<String> {
    Utc.timestamp_millis_opt(millis)
        .single()
        .map(|dt| dt.format("%Y-%m-%dT%H:%M:%SZ").to_string())
}
