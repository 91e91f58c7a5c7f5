//! Time-series aggregator
//!
//! Buckets keyed, timestamped records into calendar periods and reduces each
//! bucket with an [`AggregationMethod`].
//!
//! # Pipeline
//!
//! ```text
//! Records → Filter (key, range) → Generate periods → Assign → Reduce → Sort
//! ```
//!
//! Every period in the range yields a bucket, populated or not, so charts
//! keep their gaps. The aggregator never fails: a missing key yields the
//! placeholder series, a missing or inverted range yields nothing.

use super::method::AggregationMethod;
use super::period::{to_local, PeriodGranularity, WeekStart};
use super::types::{Bucket, Record, SeriesPoint, TimeRange};
use chrono::{FixedOffset, Offset, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Upper bound on generated periods per call
pub const DEFAULT_MAX_PERIODS: usize = 100_000;

/// Ordering of the output buckets
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    /// Ascending period key (chronological)
    #[default]
    PeriodKey,
    /// Ascending display label, compared as text
    Label,
}

impl SortOrder {
    /// Parse from string
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "key" | "period_key" | "periodkey" => Some(Self::PeriodKey),
            "label" | "period_label" => Some(Self::Label),
            _ => None,
        }
    }
}

impl std::fmt::Display for SortOrder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::PeriodKey => write!(f, "period_key"),
            Self::Label => write!(f, "label"),
        }
    }
}

/// The demonstration series shown when no key is selected
pub fn placeholder_series() -> Vec<SeriesPoint> {
    [
        ("Jan", 186.0),
        ("Feb", 305.0),
        ("Mar", 237.0),
        ("Apr", 73.0),
        ("May", 209.0),
        ("Jun", 214.0),
    ]
    .iter()
    .enumerate()
    .map(|(i, (label, value))| SeriesPoint::new(format!("placeholder-{:02}", i + 1), *label, *value, 0))
    .collect()
}

/// Settings that stay fixed across aggregation calls
#[derive(Debug, Clone, PartialEq)]
pub struct AggregateOptions {
    /// Offset defining local calendar days
    pub offset: FixedOffset,
    /// First day of a week for `PeriodGranularity::Week`
    pub week_start: WeekStart,
    /// Output ordering
    pub sort: SortOrder,
    /// More periods than this degrade to an empty result
    pub max_periods: usize,
    /// Returned when no series key is selected
    pub placeholder: Vec<SeriesPoint>,
}

impl Default for AggregateOptions {
    fn default() -> Self {
        Self {
            offset: Utc.fix(),
            week_start: WeekStart::default(),
            sort: SortOrder::default(),
            max_periods: DEFAULT_MAX_PERIODS,
            placeholder: placeholder_series(),
        }
    }
}

impl AggregateOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_offset(mut self, offset: FixedOffset) -> Self {
        self.offset = offset;
        self
    }

    pub fn with_week_start(mut self, week_start: WeekStart) -> Self {
        self.week_start = week_start;
        self
    }

    pub fn with_sort(mut self, sort: SortOrder) -> Self {
        self.sort = sort;
        self
    }

    pub fn with_max_periods(mut self, max_periods: usize) -> Self {
        self.max_periods = max_periods;
        self
    }

    pub fn with_placeholder(mut self, placeholder: Vec<SeriesPoint>) -> Self {
        self.placeholder = placeholder;
        self
    }
}

/// Stateless aggregator over caller-supplied records
#[derive(Debug, Clone, Default)]
pub struct TimeSeriesAggregator {
    options: AggregateOptions,
}

impl TimeSeriesAggregator {
    /// Create a new aggregator
    pub fn new(options: AggregateOptions) -> Self {
        Self { options }
    }

    /// Get the options in use
    pub fn options(&self) -> &AggregateOptions {
        &self.options
    }

    /// Aggregate the records of one series into calendar periods
    ///
    /// Records are filtered to `selected_key` and to `range` (both bounds
    /// inclusive), assigned to the period containing their timestamp, and each
    /// period is reduced with `method`. Empty periods are kept with value 0.
    pub fn aggregate<'a>(
        &self,
        records: &'a [Record],
        selected_key: &str,
        range: TimeRange,
        granularity: PeriodGranularity,
        method: AggregationMethod,
    ) -> Vec<Bucket<'a>> {
        if selected_key.is_empty() {
            tracing::debug!("No series selected, returning placeholder series");
            return self.options.placeholder.iter().map(SeriesPoint::to_bucket).collect();
        }

        let Some((start, end)) = range.bounds() else {
            tracing::debug!(?range, "Missing or inverted time range");
            return Vec::new();
        };

        let offset = &self.options.offset;
        let week_start = self.options.week_start;

        let (Some(local_start), Some(local_end)) = (to_local(start, offset), to_local(end, offset)) else {
            tracing::debug!(?range, "Time range is outside the calendar");
            return Vec::new();
        };

        let Some(keys) = granularity.periods(local_start, local_end, week_start, self.options.max_periods) else {
            tracing::warn!(
                %granularity,
                max_periods = self.options.max_periods,
                "Time range spans too many periods, skipping aggregation"
            );
            return Vec::new();
        };

        // 1. One bucket per period
        let mut slots: HashMap<String, usize> = HashMap::with_capacity(keys.len());
        let mut buckets: Vec<Bucket<'a>> = Vec::with_capacity(keys.len());

        for key in keys {
            let label = granularity.period_label(&key);
            slots.insert(key.clone(), buckets.len());
            buckets.push(Bucket::new(key, label));
        }

        // 2. Assign matching records
        let mut assigned = 0usize;
        let mut dropped = 0usize;

        for record in records
            .iter()
            .filter(|r| r.key == selected_key && range.contains(r.timestamp))
        {
            let slot = to_local(record.timestamp, offset)
                .map(|local| granularity.period_key(local, week_start))
                .and_then(|key| slots.get(&key).copied());

            match slot {
                Some(idx) => {
                    buckets[idx].members.push(record);
                    assigned += 1;
                }
                None => dropped += 1,
            }
        }

        if dropped > 0 {
            tracing::debug!(dropped, "Dropped records without a matching period");
        }

        // 3. Reduce
        for bucket in &mut buckets {
            bucket.sample_count = bucket.members.len();
            bucket.value = if bucket.members.is_empty() {
                0.0
            } else {
                method.apply(&bucket.members)
            };
        }

        // 4. Order
        match self.options.sort {
            SortOrder::PeriodKey => buckets.sort_by(|a, b| a.period_key.cmp(&b.period_key)),
            SortOrder::Label => buckets.sort_by(|a, b| a.period_label.cmp(&b.period_label)),
        }

        tracing::debug!(
            key = selected_key,
            %granularity,
            %method,
            buckets = buckets.len(),
            assigned,
            "Aggregated series"
        );

        buckets
    }
}

/// Aggregate with default options (UTC, ISO weeks, chronological order)
pub fn aggregate<'a>(
    records: &'a [Record],
    selected_key: &str,
    range: TimeRange,
    granularity: PeriodGranularity,
    method: AggregationMethod,
) -> Vec<Bucket<'a>> {
    TimeSeriesAggregator::default().aggregate(records, selected_key, range, granularity, method)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn ts(y: i32, m: u32, d: u32, h: u32, min: u32) -> i64 {
        Utc.with_ymd_and_hms(y, m, d, h, min, 0)
            .unwrap()
            .timestamp_millis()
    }

    fn end_of_day(y: i32, m: u32, d: u32) -> i64 {
        ts(y, m, d, 23, 59) + 59_999
    }

    fn mood_records() -> Vec<Record> {
        vec![
            Record::new("mood", ts(2024, 3, 1, 9, 0), 5.0),
            Record::new("mood", ts(2024, 3, 1, 14, 0), 7.0),
            Record::new("mood", ts(2024, 3, 2, 10, 0), 3.0),
        ]
    }

    fn values(buckets: &[Bucket]) -> Vec<(String, f64, usize)> {
        buckets
            .iter()
            .map(|b| (b.period_key.clone(), b.value, b.sample_count))
            .collect()
    }

    #[test]
    fn test_daily_mean() {
        let records = mood_records();
        let range = TimeRange::new(ts(2024, 3, 1, 0, 0), end_of_day(2024, 3, 2));

        let buckets = aggregate(&records, "mood", range, PeriodGranularity::Day, AggregationMethod::Mean);

        assert_eq!(
            values(&buckets),
            vec![
                ("2024-03-01".to_string(), 6.0, 2),
                ("2024-03-02".to_string(), 3.0, 1),
            ]
        );
        assert_eq!(buckets[0].period_label, "Mar 01");
    }

    #[test]
    fn test_daily_count_and_sum() {
        let records = mood_records();
        let range = TimeRange::new(ts(2024, 3, 1, 0, 0), end_of_day(2024, 3, 2));

        let count = aggregate(&records, "mood", range, PeriodGranularity::Day, AggregationMethod::Count);
        assert_eq!(count[0].value, 2.0);
        assert_eq!(count[1].value, 1.0);

        let sum = aggregate(&records, "mood", range, PeriodGranularity::Day, AggregationMethod::Sum);
        assert_eq!(sum[0].value, 12.0);
        assert_eq!(sum[1].value, 3.0);
    }

    #[test]
    fn test_empty_periods_are_kept() {
        let mut records = mood_records();
        records.push(Record::new("mood", ts(2024, 3, 5, 8, 0), 9.0));
        let range = TimeRange::new(ts(2024, 3, 1, 0, 0), end_of_day(2024, 3, 5));

        let buckets = aggregate(&records, "mood", range, PeriodGranularity::Day, AggregationMethod::Mean);

        assert_eq!(buckets.len(), 5);
        for gap in &buckets[2..4] {
            assert_eq!(gap.sample_count, 0);
            assert_eq!(gap.value, 0.0);
            assert!(gap.is_empty());
        }
        assert_eq!(buckets[4].value, 9.0);
    }

    #[test]
    fn test_zero_member_buckets_for_every_method() {
        let records = mood_records();
        let range = TimeRange::new(ts(2024, 3, 1, 0, 0), end_of_day(2024, 3, 10));

        for method in AggregationMethod::all() {
            let buckets = aggregate(&records, "mood", range, PeriodGranularity::Day, *method);
            assert_eq!(buckets.len(), 10);
            for bucket in buckets.iter().filter(|b| b.sample_count == 0) {
                assert_eq!(bucket.value, 0.0, "{method}");
            }
        }
    }

    #[test]
    fn test_placeholder_when_no_key() {
        let records = mood_records();
        let range = TimeRange::new(ts(2024, 3, 1, 0, 0), end_of_day(2024, 3, 2));

        let buckets = aggregate(&records, "", range, PeriodGranularity::Day, AggregationMethod::Sum);
        let labels: Vec<&str> = buckets.iter().map(|b| b.period_label.as_str()).collect();

        assert_eq!(labels, vec!["Jan", "Feb", "Mar", "Apr", "May", "Jun"]);
        assert_eq!(buckets[0].value, 186.0);
        assert!(buckets.iter().all(|b| b.members.is_empty()));

        // Range does not matter either
        let unbounded = aggregate(&records, "", TimeRange::unbounded(), PeriodGranularity::Day, AggregationMethod::Sum);
        assert_eq!(unbounded.len(), 6);
    }

    #[test]
    fn test_custom_placeholder() {
        let aggregator = TimeSeriesAggregator::new(
            AggregateOptions::new().with_placeholder(vec![SeriesPoint::new("demo", "Demo", 1.0, 0)]),
        );

        let buckets = aggregator.aggregate(
            &[],
            "",
            TimeRange::unbounded(),
            PeriodGranularity::Day,
            AggregationMethod::Sum,
        );

        assert_eq!(buckets.len(), 1);
        assert_eq!(buckets[0].period_label, "Demo");
    }

    #[test]
    fn test_invalid_range_is_empty() {
        let records = mood_records();
        let start = ts(2024, 3, 1, 0, 0);
        let end = end_of_day(2024, 3, 2);

        let missing_start = TimeRange { start: None, end: Some(end) };
        let missing_end = TimeRange { start: Some(start), end: None };
        let inverted = TimeRange::new(end, start);

        for range in [missing_start, missing_end, inverted, TimeRange::unbounded()] {
            let buckets = aggregate(&records, "mood", range, PeriodGranularity::Day, AggregationMethod::Sum);
            assert!(buckets.is_empty(), "{range:?}");
        }
    }

    #[test]
    fn test_records_partitioned_by_key_and_range() {
        let records = vec![
            Record::new("mood", ts(2024, 3, 1, 0, 0), 1.0),
            Record::new("mood", ts(2024, 3, 1, 12, 0), 2.0),
            Record::new("weight", ts(2024, 3, 1, 12, 0), 70.0),
            Record::new("mood", ts(2024, 3, 3, 12, 0), 3.0),
            Record::new("mood", ts(2024, 2, 29, 23, 59), 4.0),
            Record::new("mood", ts(2024, 3, 4, 0, 0), 5.0),
        ];
        // End bound lands exactly on the 2024-03-03 record
        let range = TimeRange::new(ts(2024, 3, 1, 0, 0), ts(2024, 3, 3, 12, 0));

        let buckets = aggregate(&records, "mood", range, PeriodGranularity::Day, AggregationMethod::Sum);

        let total: usize = buckets.iter().map(|b| b.sample_count).sum();
        assert_eq!(total, 3);
        assert_eq!(
            values(&buckets),
            vec![
                ("2024-03-01".to_string(), 3.0, 2),
                ("2024-03-02".to_string(), 0.0, 0),
                ("2024-03-03".to_string(), 3.0, 1),
            ]
        );
        assert!(buckets
            .iter()
            .flat_map(|b| b.members.iter())
            .all(|r| r.key == "mood"));
    }

    #[test]
    fn test_first_keeps_input_order() {
        let records = vec![
            Record::new("mood", ts(2024, 3, 1, 18, 0), 8.0),
            Record::new("mood", ts(2024, 3, 1, 9, 0), 2.0),
        ];
        let range = TimeRange::new(ts(2024, 3, 1, 0, 0), end_of_day(2024, 3, 1));

        let buckets = aggregate(&records, "mood", range, PeriodGranularity::Day, AggregationMethod::First);

        assert_eq!(buckets[0].value, 8.0);
    }

    #[test]
    fn test_hourly_buckets() {
        let records = mood_records();
        let range = TimeRange::new(ts(2024, 3, 1, 8, 0), ts(2024, 3, 1, 15, 0));

        let buckets = aggregate(&records, "mood", range, PeriodGranularity::Hour, AggregationMethod::Max);

        assert_eq!(buckets.len(), 8);
        assert_eq!(buckets[1].period_key, "2024-03-01 09:00");
        assert_eq!(buckets[1].period_label, "Mar 01 09:00");
        assert_eq!(buckets[1].value, 5.0);
        assert_eq!(buckets[6].value, 7.0);
    }

    #[test]
    fn test_weekly_buckets() {
        let records = vec![
            Record::new("steps", ts(2024, 3, 4, 9, 0), 1000.0),
            Record::new("steps", ts(2024, 3, 10, 21, 0), 2000.0),
            Record::new("steps", ts(2024, 3, 11, 7, 0), 500.0),
        ];
        let range = TimeRange::new(ts(2024, 3, 4, 0, 0), end_of_day(2024, 3, 17));

        let monday = aggregate(&records, "steps", range, PeriodGranularity::Week, AggregationMethod::Sum);
        assert_eq!(
            values(&monday),
            vec![
                ("2024-W10".to_string(), 3000.0, 2),
                ("2024-W11".to_string(), 500.0, 1),
            ]
        );

        let aggregator = TimeSeriesAggregator::new(AggregateOptions::new().with_week_start(WeekStart::Sunday));
        let sunday = aggregator.aggregate(&records, "steps", range, PeriodGranularity::Week, AggregationMethod::Sum);
        // Sunday 2024-03-10 opens the week numbered W11; 2024-03-04 sits in the week opened on 03-03
        assert_eq!(
            values(&sunday),
            vec![
                ("2024-W10".to_string(), 1000.0, 1),
                ("2024-W11".to_string(), 2500.0, 2),
                ("2024-W12".to_string(), 0.0, 0),
            ]
        );
    }

    #[test]
    fn test_yearly_and_monthly_labels() {
        let records = vec![
            Record::new("weight", ts(2023, 12, 20, 8, 0), 72.0),
            Record::new("weight", ts(2024, 1, 5, 8, 0), 71.0),
        ];
        let range = TimeRange::new(ts(2023, 12, 1, 0, 0), ts(2024, 1, 31, 0, 0));

        let months = aggregate(&records, "weight", range, PeriodGranularity::Month, AggregationMethod::Min);
        let labels: Vec<&str> = months.iter().map(|b| b.period_label.as_str()).collect();
        assert_eq!(labels, vec!["Dec 2023", "Jan 2024"]);

        let years = aggregate(&records, "weight", range, PeriodGranularity::Year, AggregationMethod::Min);
        assert_eq!(values(&years)[0], ("2023".to_string(), 72.0, 1));
        assert_eq!(values(&years)[1], ("2024".to_string(), 71.0, 1));
    }

    #[test]
    fn test_label_sort_is_textual() {
        let records = vec![Record::new("mood", ts(2024, 1, 10, 0, 0), 1.0)];
        let range = TimeRange::new(ts(2023, 11, 1, 0, 0), ts(2024, 2, 1, 0, 0));

        let by_key = aggregate(&records, "mood", range, PeriodGranularity::Month, AggregationMethod::Sum);
        let keys: Vec<&str> = by_key.iter().map(|b| b.period_key.as_str()).collect();
        assert_eq!(keys, vec!["2023-11", "2023-12", "2024-01", "2024-02"]);

        let aggregator = TimeSeriesAggregator::new(AggregateOptions::new().with_sort(SortOrder::Label));
        let by_label = aggregator.aggregate(&records, "mood", range, PeriodGranularity::Month, AggregationMethod::Sum);
        let labels: Vec<&str> = by_label.iter().map(|b| b.period_label.as_str()).collect();
        assert_eq!(labels, vec!["Dec 2023", "Feb 2024", "Jan 2024", "Nov 2023"]);
    }

    #[test]
    fn test_offset_moves_day_boundary() {
        let records = vec![Record::new("mood", ts(2024, 1, 15, 23, 30), 4.0)];
        let range = TimeRange::new(ts(2024, 1, 15, 0, 0), ts(2024, 1, 16, 12, 0));

        let utc = aggregate(&records, "mood", range, PeriodGranularity::Day, AggregationMethod::Sum);
        assert_eq!(utc[0].sample_count, 1);
        assert_eq!(utc[0].period_key, "2024-01-15");

        let cet = FixedOffset::east_opt(3600).unwrap();
        let aggregator = TimeSeriesAggregator::new(AggregateOptions::new().with_offset(cet));
        let local = aggregator.aggregate(&records, "mood", range, PeriodGranularity::Day, AggregationMethod::Sum);

        assert_eq!(
            values(&local),
            vec![
                ("2024-01-15".to_string(), 0.0, 0),
                ("2024-01-16".to_string(), 4.0, 1),
            ]
        );
    }

    #[test]
    fn test_too_many_periods_degrades_to_empty() {
        let records = mood_records();
        let aggregator = TimeSeriesAggregator::new(AggregateOptions::new().with_max_periods(24));
        let range = TimeRange::new(ts(2024, 3, 1, 0, 0), end_of_day(2024, 3, 2));

        let hourly = aggregator.aggregate(&records, "mood", range, PeriodGranularity::Hour, AggregationMethod::Sum);
        assert!(hourly.is_empty());

        let daily = aggregator.aggregate(&records, "mood", range, PeriodGranularity::Day, AggregationMethod::Sum);
        assert_eq!(daily.len(), 2);
    }

    #[test]
    fn test_aggregation_is_idempotent() {
        let records = mood_records();
        let range = TimeRange::new(ts(2024, 3, 1, 0, 0), end_of_day(2024, 3, 4));
        let aggregator = TimeSeriesAggregator::default();

        let first = aggregator.aggregate(&records, "mood", range, PeriodGranularity::Day, AggregationMethod::Mean);
        let second = aggregator.aggregate(&records, "mood", range, PeriodGranularity::Day, AggregationMethod::Mean);

        assert_eq!(first, second);
        assert_eq!(records, mood_records());
    }
}
