//! Caller-side memoization
//!
//! The aggregator keeps no state. Callers that recompute a series whenever
//! any input might have changed (a dashboard re-rendering, a watch loop) can
//! wrap it in a [`MemoizedSeries`], which remembers the last result and only
//! recomputes when the input tuple actually differs.

use super::aggregator::TimeSeriesAggregator;
use super::method::AggregationMethod;
use super::period::PeriodGranularity;
use super::types::{Bucket, Record, RecordValue, SeriesPoint, TimeRange};
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

/// Memoizes the most recent aggregation result
#[derive(Debug, Default)]
pub struct MemoizedSeries {
    aggregator: TimeSeriesAggregator,
    cached: Option<(u64, Vec<SeriesPoint>)>,
    hits: u64,
    misses: u64,
}

impl MemoizedSeries {
    pub fn new(aggregator: TimeSeriesAggregator) -> Self {
        Self {
            aggregator,
            cached: None,
            hits: 0,
            misses: 0,
        }
    }

    /// Get the series for these inputs, recomputing only if they changed
    pub fn get(
        &mut self,
        records: &[Record],
        selected_key: &str,
        range: TimeRange,
        granularity: PeriodGranularity,
        method: AggregationMethod,
    ) -> &[SeriesPoint] {
        let fingerprint = fingerprint(records, selected_key, range, granularity, method);

        let hit = matches!(&self.cached, Some((cached, _)) if *cached == fingerprint);

        if hit {
            self.hits += 1;
        } else {
            let points = self
                .aggregator
                .aggregate(records, selected_key, range, granularity, method)
                .iter()
                .map(Bucket::to_point)
                .collect();
            self.cached = Some((fingerprint, points));
            self.misses += 1;
        }

        match &self.cached {
            Some((_, points)) => points,
            None => &[],
        }
    }

    /// Drop the cached result
    pub fn invalidate(&mut self) {
        self.cached = None;
    }

    /// Number of calls answered from the cache
    pub fn hits(&self) -> u64 {
        self.hits
    }

    /// Number of calls that recomputed
    pub fn misses(&self) -> u64 {
        self.misses
    }
}

fn fingerprint(
    records: &[Record],
    selected_key: &str,
    range: TimeRange,
    granularity: PeriodGranularity,
    method: AggregationMethod,
) -> u64 {
    let mut hasher = DefaultHasher::new();

    selected_key.hash(&mut hasher);
    range.hash(&mut hasher);
    granularity.hash(&mut hasher);
    method.hash(&mut hasher);

    records.len().hash(&mut hasher);
    for record in records {
        record.key.hash(&mut hasher);
        record.timestamp.hash(&mut hasher);
        hash_value(&record.value, &mut hasher);
    }

    hasher.finish()
}

fn hash_value(value: &RecordValue, hasher: &mut impl Hasher) {
    match value {
        RecordValue::Number(n) => {
            0u8.hash(hasher);
            n.to_bits().hash(hasher);
        }
        RecordValue::Text(s) => {
            1u8.hash(hasher);
            s.hash(hasher);
        }
        RecordValue::Other(v) => {
            2u8.hash(hasher);
            v.to_string().hash(hasher);
        }
    }
}
