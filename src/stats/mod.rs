//! Lifestats Aggregation Engine
//!
//! Turns raw tracking records into chart-ready series:
//!
//! - **types**: Records, time ranges and output buckets
//! - **period**: Calendar periods, period keys and labels
//! - **method**: Aggregation methods (sum, mean, min, max, count, first)
//! - **aggregator**: The bucketing and reduction pipeline
//! - **memo**: Optional caller-side memoization
//!
//! # Example
//!
//! ```rust
//! use lifestats::stats::{aggregate, AggregationMethod, PeriodGranularity, Record, TimeRange};
//!
//! let records = vec![
//!     Record::new("mood", 1_709_283_600_000, 5.0), // 2024-03-01 09:00 UTC
//!     Record::new("mood", 1_709_301_600_000, 7.0), // 2024-03-01 14:00 UTC
//!     Record::new("mood", 1_709_373_600_000, 3.0), // 2024-03-02 10:00 UTC
//! ];
//! let range = TimeRange::new(1_709_251_200_000, 1_709_423_999_999);
//!
//! let series = aggregate(&records, "mood", range, PeriodGranularity::Day, AggregationMethod::Mean);
//!
//! assert_eq!(series.len(), 2);
//! assert_eq!(series[0].value, 6.0);
//! assert_eq!(series[0].sample_count, 2);
//! assert_eq!(series[1].period_label, "Mar 02");
//! ```

pub mod aggregator;
pub mod memo;
pub mod method;
pub mod period;
pub mod types;

pub use aggregator::{
    aggregate, placeholder_series, AggregateOptions, SortOrder, TimeSeriesAggregator,
    DEFAULT_MAX_PERIODS,
};
pub use memo::MemoizedSeries;
pub use method::{AggregationMethod, Reducer};
pub use period::{to_local, LabelError, PeriodGranularity, WeekStart};
pub use types::{Bucket, Record, RecordValue, SeriesPoint, TimeRange};
