//! Core data types for the stats engine
//!
//! This module defines the values flowing in and out of the aggregator:
//! - `Record`: A single keyed, timestamped measurement
//! - `RecordValue`: The loosely typed payload carried by a record
//! - `TimeRange`: The inclusive window to aggregate over
//! - `Bucket` and `SeriesPoint`: One period of the output series

use chrono::Utc;
use serde::{Deserialize, Serialize};

/// A single tracked measurement
///
/// Records are supplied by the caller on every aggregation call and are
/// never mutated. Unknown fields in input documents are ignored.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Record {
    /// Series identifier (e.g. "mood", "weight")
    pub key: String,
    /// Unix timestamp in milliseconds
    pub timestamp: i64,
    /// Measured value; anything non-numeric counts as 0
    #[serde(default)]
    pub value: RecordValue,
}

impl Record {
    /// Create a new record
    pub fn new(key: impl Into<String>, timestamp: i64, value: impl Into<RecordValue>) -> Self {
        Self {
            key: key.into(),
            timestamp,
            value: value.into(),
        }
    }

    /// The value used by arithmetic aggregations (non-numeric values become 0)
    pub fn numeric_value(&self) -> f64 {
        self.value.as_number().unwrap_or(0.0)
    }
}

/// Payload of a record
///
/// Input documents are not required to carry numbers, so the payload keeps
/// whatever was supplied and only coerces at aggregation time.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum RecordValue {
    /// A numeric value
    Number(f64),
    /// A string value (numeric-looking strings are still text)
    Text(String),
    /// Booleans, null, arrays and objects
    Other(serde_json::Value),
}

impl RecordValue {
    /// Numeric view of this value, `None` for anything that is not a number
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(n) if !n.is_nan() => Some(*n),
            _ => None,
        }
    }

    /// Check if this value takes part in arithmetic as itself
    pub fn is_numeric(&self) -> bool {
        self.as_number().is_some()
    }
}

impl Default for RecordValue {
    fn default() -> Self {
        Self::Other(serde_json::Value::Null)
    }
}

impl From<f64> for RecordValue {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<i64> for RecordValue {
    fn from(value: i64) -> Self {
        Self::Number(value as f64)
    }
}

impl From<&str> for RecordValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for RecordValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<bool> for RecordValue {
    fn from(value: bool) -> Self {
        Self::Other(serde_json::Value::Bool(value))
    }
}

/// Time range for aggregation (closed interval: [start, end])
///
/// Either bound may be missing; a range with a missing bound, or with
/// `start > end`, aggregates to nothing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TimeRange {
    /// Start timestamp (inclusive), in milliseconds
    pub start: Option<i64>,
    /// End timestamp (inclusive), in milliseconds
    pub end: Option<i64>,
}

impl TimeRange {
    /// Create a range with both bounds set
    pub fn new(start: i64, end: i64) -> Self {
        Self {
            start: Some(start),
            end: Some(end),
        }
    }

    /// A range with no bounds
    pub fn unbounded() -> Self {
        Self::default()
    }

    /// Create a range for the last N hours from now
    ///
    /// A span too large to represent yields an unbounded range.
    pub fn last_hours(hours: i64) -> Self {
        let end = Utc::now().timestamp_millis();
        match hours
            .checked_mul(3_600_000)
            .and_then(|span| end.checked_sub(span))
        {
            Some(start) => Self::new(start, end),
            None => Self::unbounded(),
        }
    }

    /// Create a range for the last N days from now
    pub fn last_days(days: i64) -> Self {
        match days.checked_mul(24) {
            Some(hours) => Self::last_hours(hours),
            None => Self::unbounded(),
        }
    }

    /// The smallest range covering every record with the given key
    ///
    /// Returns an unbounded range when no record matches.
    pub fn spanning(records: &[Record], key: &str) -> Self {
        let mut timestamps = records
            .iter()
            .filter(|r| r.key == key)
            .map(|r| r.timestamp);

        let Some(first) = timestamps.next() else {
            return Self::unbounded();
        };

        let (start, end) = timestamps.fold((first, first), |(lo, hi), ts| (lo.min(ts), hi.max(ts)));
        Self::new(start, end)
    }

    /// Both bounds, if present and ordered
    pub fn bounds(&self) -> Option<(i64, i64)> {
        match (self.start, self.end) {
            (Some(start), Some(end)) if start <= end => Some((start, end)),
            _ => None,
        }
    }

    /// Check if this range can produce output
    pub fn is_valid(&self) -> bool {
        self.bounds().is_some()
    }

    /// Check if a timestamp falls within this range (both ends inclusive)
    pub fn contains(&self, timestamp: i64) -> bool {
        self.bounds()
            .map(|(start, end)| timestamp >= start && timestamp <= end)
            .unwrap_or(false)
    }
}

/// One period of an aggregated series
///
/// Members borrow from the records passed to the aggregator, so a bucket
/// cannot outlive them. Serializes to the chart-facing shape
/// `{ periodKey, periodLabel, value, sampleCount }`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Bucket<'a> {
    /// Canonical sortable key (e.g. `2024-03-15`)
    pub period_key: String,
    /// Display label (e.g. `Mar 15`)
    pub period_label: String,
    /// Records falling inside this period, in input order
    #[serde(skip)]
    pub members: Vec<&'a Record>,
    /// Aggregated value (0 when there are no members)
    pub value: f64,
    /// Number of members, so "zero" and "no data" stay distinguishable
    pub sample_count: usize,
}

impl<'a> Bucket<'a> {
    pub(crate) fn new(period_key: String, period_label: String) -> Self {
        Self {
            period_key,
            period_label,
            members: Vec::new(),
            value: 0.0,
            sample_count: 0,
        }
    }

    /// Check if no record fell into this period
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Detach from the input records
    pub fn to_point(&self) -> SeriesPoint {
        SeriesPoint {
            period_key: self.period_key.clone(),
            period_label: self.period_label.clone(),
            value: self.value,
            sample_count: self.sample_count,
        }
    }
}

/// An owned series point, independent of any input records
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeriesPoint {
    pub period_key: String,
    pub period_label: String,
    pub value: f64,
    pub sample_count: usize,
}

impl SeriesPoint {
    pub fn new(
        period_key: impl Into<String>,
        period_label: impl Into<String>,
        value: f64,
        sample_count: usize,
    ) -> Self {
        Self {
            period_key: period_key.into(),
            period_label: period_label.into(),
            value,
            sample_count,
        }
    }

    /// Turn into a bucket without members
    pub fn to_bucket<'a>(&self) -> Bucket<'a> {
        Bucket {
            period_key: self.period_key.clone(),
            period_label: self.period_label.clone(),
            members: Vec::new(),
            value: self.value,
            sample_count: self.sample_count,
        }
    }
}
