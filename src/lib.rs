//! # lifestats
//!
//! Time-bucketed aggregation for personal tracking data: turns raw, timestamped
//! records (mood, weight, sleep, ...) into chart-ready series of per-period values.
//!
//! ## Modules
//!
//! - [`stats`]: The aggregation engine
//! - [`import`]: Loading records from JSON, NDJSON and CSV files
//! - [`config`]: TOML configuration with environment overrides
//! - [`logging`]: Tracing subscriber setup
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use lifestats::import::RecordImporter;
//! use lifestats::stats::{AggregationMethod, PeriodGranularity, TimeRange, TimeSeriesAggregator};
//! use std::path::Path;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let imported = RecordImporter::new().import(Path::new("journal.ndjson"))?;
//!
//!     let aggregator = TimeSeriesAggregator::default();
//!     let series = aggregator.aggregate(
//!         &imported.records,
//!         "mood",
//!         TimeRange::last_days(30),
//!         PeriodGranularity::Week,
//!         AggregationMethod::Mean,
//!     );
//!
//!     for bucket in &series {
//!         println!("{}: {:.1} ({} entries)", bucket.period_label, bucket.value, bucket.sample_count);
//!     }
//!
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod import;
pub mod logging;
pub mod stats;

pub use config::Config;
pub use stats::{
    AggregateOptions, AggregationMethod, Bucket, PeriodGranularity, Record, RecordValue,
    SeriesPoint, TimeRange, TimeSeriesAggregator,
};
