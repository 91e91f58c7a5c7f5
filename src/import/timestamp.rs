//! Timestamp parsing for imported records and command-line ranges
//!
//! Accepted inputs, in order of precedence:
//! - Unix timestamp in milliseconds (`1709283600000`)
//! - RFC 3339 (`2024-03-01T09:00:00Z`, `2024-03-01T10:00:00+01:00`)
//! - Naive date-times (`2024-03-01 09:00:00`, `2024-03-01T09:00`, ...)
//! - Dates (`2024-03-01`, `03/01/2024`, `2024/03/01`), meaning local midnight
//!
//! Naive inputs are read in the caller's offset.

use chrono::{DateTime, Duration, FixedOffset, NaiveDate, NaiveDateTime, TimeZone};

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
    "%m/%d/%Y %H:%M",
];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%m/%d/%Y", "%Y/%m/%d"];

/// Parse a timestamp string into Unix milliseconds
pub fn parse_timestamp(input: &str, offset: &FixedOffset) -> Option<i64> {
    let s = input.trim();
    if s.is_empty() {
        return None;
    }

    if let Ok(millis) = s.parse::<i64>() {
        return Some(millis);
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.timestamp_millis());
    }

    for fmt in DATETIME_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, fmt) {
            return local_millis(naive, offset);
        }
    }

    parse_date(s).and_then(|date| local_millis(date.and_hms_opt(0, 0, 0)?, offset))
}

/// Parse the end of a range
///
/// A bare date means the whole day, so it resolves to the last millisecond
/// of that day. Anything else parses like [`parse_timestamp`].
pub fn parse_range_end(input: &str, offset: &FixedOffset) -> Option<i64> {
    match parse_date(input.trim()) {
        Some(date) => {
            let next = date.succ_opt()?.and_hms_opt(0, 0, 0)?;
            local_millis(next, offset).map(|ms| ms - 1)
        }
        None => parse_timestamp(input, offset),
    }
}

/// Parse a relative span such as `7d`, `4w`, `3m` or `1y`
///
/// Returns `None` for spans chrono cannot represent.
pub fn parse_duration(s: &str) -> Option<Duration> {
    let s = s.trim().to_lowercase();

    if let Some(hours) = s.strip_suffix('h') {
        Duration::try_hours(hours.parse().ok()?)
    } else if let Some(days) = s.strip_suffix('d') {
        Duration::try_days(days.parse().ok()?)
    } else if let Some(weeks) = s.strip_suffix('w') {
        Duration::try_weeks(weeks.parse().ok()?)
    } else if let Some(months) = s.strip_suffix('m') {
        Duration::try_days(months.parse::<i64>().ok()?.checked_mul(30)?)
    } else if let Some(years) = s.strip_suffix('y') {
        Duration::try_days(years.parse::<i64>().ok()?.checked_mul(365)?)
    } else {
        None
    }
}

fn parse_date(s: &str) -> Option<NaiveDate> {
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
}

fn local_millis(naive: NaiveDateTime, offset: &FixedOffset) -> Option<i64> {
    offset
        .from_local_datetime(&naive)
        .single()
        .map(|dt| dt.timestamp_millis())
}
