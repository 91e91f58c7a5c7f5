//! Calendar periods
//!
//! Maps instants onto calendar periods (hour, day, week, month, year) in a
//! fixed local offset, and derives the canonical period keys and display
//! labels used by the aggregator.
//!
//! # Period keys
//!
//! ```text
//! Hour   2024-03-15 14:00
//! Day    2024-03-15
//! Week   2024-W11          (ISO week-numbering year and week)
//! Month  2024-03
//! Year   2024
//! ```
//!
//! Keys sort lexicographically in chronological order.

use chrono::{Datelike, Duration, FixedOffset, NaiveDate, NaiveDateTime, TimeZone, Timelike, Weekday};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Convert a millisecond timestamp to a naive date-time in the given offset
pub fn to_local(timestamp: i64, offset: &FixedOffset) -> Option<NaiveDateTime> {
    offset
        .timestamp_millis_opt(timestamp)
        .single()
        .map(|dt| dt.naive_local())
}

/// Bucket size used to partition a time range
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PeriodGranularity {
    /// Group by hour of day
    Hour,
    /// Group by calendar day
    #[default]
    Day,
    /// Group by week (see [`WeekStart`])
    Week,
    /// Group by calendar month
    Month,
    /// Group by calendar year
    Year,
}

/// First day of a week
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WeekStart {
    /// ISO weeks, Monday..Sunday
    #[default]
    Monday,
    /// Sunday..Saturday, numbered after the ISO week of the Monday that follows
    Sunday,
}

impl WeekStart {
    /// Parse from string
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "monday" | "mon" => Some(Self::Monday),
            "sunday" | "sun" => Some(Self::Sunday),
            _ => None,
        }
    }

    fn days_into_week(&self, date: NaiveDate) -> i64 {
        match self {
            Self::Monday => date.weekday().num_days_from_monday() as i64,
            Self::Sunday => date.weekday().num_days_from_sunday() as i64,
        }
    }
}

impl std::fmt::Display for WeekStart {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Monday => write!(f, "monday"),
            Self::Sunday => write!(f, "sunday"),
        }
    }
}

/// A period key that could not be turned into a label
#[derive(Error, Debug, Clone, PartialEq)]
#[error("Malformed {granularity} period key: {key:?}")]
pub struct LabelError {
    pub granularity: PeriodGranularity,
    pub key: String,
}

impl PeriodGranularity {
    /// Get all granularities, finest first
    pub fn all() -> &'static [PeriodGranularity] {
        &[
            PeriodGranularity::Hour,
            PeriodGranularity::Day,
            PeriodGranularity::Week,
            PeriodGranularity::Month,
            PeriodGranularity::Year,
        ]
    }

    /// Parse from string
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "hour" | "h" => Some(Self::Hour),
            "day" | "d" => Some(Self::Day),
            "week" | "w" => Some(Self::Week),
            "month" | "m" => Some(Self::Month),
            "year" | "y" => Some(Self::Year),
            _ => None,
        }
    }

    /// Truncate a local date-time to the start of its period
    pub fn truncate(&self, local: NaiveDateTime, week_start: WeekStart) -> Option<NaiveDateTime> {
        let date = local.date();

        match self {
            Self::Hour => date.and_hms_opt(local.hour(), 0, 0),
            Self::Day => date.and_hms_opt(0, 0, 0),
            Self::Week => date
                .checked_sub_signed(Duration::days(week_start.days_into_week(date)))?
                .and_hms_opt(0, 0, 0),
            Self::Month => NaiveDate::from_ymd_opt(date.year(), date.month(), 1)?.and_hms_opt(0, 0, 0),
            Self::Year => NaiveDate::from_ymd_opt(date.year(), 1, 1)?.and_hms_opt(0, 0, 0),
        }
    }

    /// Start of the period following the one starting at `start`
    pub fn next_start(&self, start: NaiveDateTime) -> Option<NaiveDateTime> {
        match self {
            Self::Hour => start.checked_add_signed(Duration::hours(1)),
            Self::Day => start.checked_add_signed(Duration::days(1)),
            Self::Week => start.checked_add_signed(Duration::days(7)),
            Self::Month => {
                let (year, month) = if start.month() == 12 {
                    (start.year().checked_add(1)?, 1)
                } else {
                    (start.year(), start.month() + 1)
                };
                NaiveDate::from_ymd_opt(year, month, 1)?.and_hms_opt(0, 0, 0)
            }
            Self::Year => NaiveDate::from_ymd_opt(start.year().checked_add(1)?, 1, 1)?.and_hms_opt(0, 0, 0),
        }
    }

    /// Canonical key of the period containing `local`
    pub fn period_key(&self, local: NaiveDateTime, week_start: WeekStart) -> String {
        match self {
            Self::Hour => local.format("%Y-%m-%d %H:00").to_string(),
            Self::Day => local.format("%Y-%m-%d").to_string(),
            Self::Week => {
                let date = match week_start {
                    WeekStart::Monday => local.date(),
                    // Sunday belongs with the following Monday's ISO week
                    WeekStart::Sunday => local.date().succ_opt().unwrap_or(local.date()),
                };
                let week = date.iso_week();
                format!("{:04}-W{:02}", week.year(), week.week())
            }
            Self::Month => local.format("%Y-%m").to_string(),
            Self::Year => local.format("%Y").to_string(),
        }
    }

    /// Display label for a period key
    ///
    /// # Errors
    /// Returns `LabelError` when the key does not have this granularity's shape.
    pub fn label_for_key(&self, key: &str) -> Result<String, LabelError> {
        let malformed = || LabelError {
            granularity: *self,
            key: key.to_string(),
        };

        match self {
            Self::Hour => NaiveDateTime::parse_from_str(key, "%Y-%m-%d %H:%M")
                .map(|dt| dt.format("%b %d %H:00").to_string())
                .map_err(|_| malformed()),
            Self::Day => NaiveDate::parse_from_str(key, "%Y-%m-%d")
                .map(|d| d.format("%b %d").to_string())
                .map_err(|_| malformed()),
            Self::Week => {
                let (year, week) = key.split_once("-W").ok_or_else(malformed)?;
                let year: i32 = year.parse().map_err(|_| malformed())?;
                let week: u32 = week.parse().map_err(|_| malformed())?;
                NaiveDate::from_isoywd_opt(year, week, Weekday::Mon).ok_or_else(malformed)?;
                Ok(format!("{year} W{week:02}"))
            }
            Self::Month => NaiveDate::parse_from_str(&format!("{key}-01"), "%Y-%m-%d")
                .map(|d| d.format("%b %Y").to_string())
                .map_err(|_| malformed()),
            Self::Year => {
                let year: i32 = key.parse().map_err(|_| malformed())?;
                NaiveDate::from_ymd_opt(year, 1, 1).ok_or_else(malformed)?;
                Ok(key.to_string())
            }
        }
    }

    /// Display label for a period key, falling back to the key itself
    pub fn period_label(&self, key: &str) -> String {
        self.label_for_key(key).unwrap_or_else(|err| {
            tracing::debug!("{}, using raw key as label", err);
            key.to_string()
        })
    }

    /// Ordered keys of every period touching `[start, end]`
    ///
    /// Returns `None` if more than `limit` periods would be generated.
    pub fn periods(
        &self,
        start: NaiveDateTime,
        end: NaiveDateTime,
        week_start: WeekStart,
        limit: usize,
    ) -> Option<Vec<String>> {
        let mut keys = Vec::new();

        let Some(mut cursor) = self.truncate(start, week_start) else {
            return Some(keys);
        };

        while cursor <= end {
            if keys.len() >= limit {
                return None;
            }
            keys.push(self.period_key(cursor, week_start));

            match self.next_start(cursor) {
                Some(next) => cursor = next,
                None => break,
            }
        }

        Some(keys)
    }
}

impl std::fmt::Display for PeriodGranularity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Hour => write!(f, "hour"),
            Self::Day => write!(f, "day"),
            Self::Week => write!(f, "week"),
            Self::Month => write!(f, "month"),
            Self::Year => write!(f, "year"),
        }
    }
}
