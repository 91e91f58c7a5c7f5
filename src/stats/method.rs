//! Aggregation methods
//!
//! Each method reduces the members of one bucket to a scalar. Methods are
//! dispatched through a table of plain functions so that adding a variant
//! without a reducer fails to compile.
//!
//! All reducers coerce non-numeric values to 0. They are only ever called
//! with at least one member; the aggregator short-circuits empty buckets.

use super::types::Record;
use serde::{Deserialize, Serialize};

/// Reduces the members of a bucket to a value
pub type Reducer = fn(&[&Record]) -> f64;

/// Aggregation functions available for a series
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AggregationMethod {
    /// Sum of values
    Sum,
    /// Average of values
    #[default]
    Mean,
    /// Minimum value
    Min,
    /// Maximum value
    Max,
    /// Number of records, whatever their value
    Count,
    /// First value in input order
    First,
}

impl AggregationMethod {
    /// Get all methods for iteration
    pub fn all() -> &'static [AggregationMethod] {
        &[
            AggregationMethod::Sum,
            AggregationMethod::Mean,
            AggregationMethod::Min,
            AggregationMethod::Max,
            AggregationMethod::Count,
            AggregationMethod::First,
        ]
    }

    /// The reducer implementing this method
    pub fn reducer(&self) -> Reducer {
        match self {
            Self::Sum => sum,
            Self::Mean => mean,
            Self::Min => min,
            Self::Max => max,
            Self::Count => count,
            Self::First => first,
        }
    }

    /// Apply this method to bucket members
    ///
    /// An empty slice always yields 0.
    pub fn apply(&self, members: &[&Record]) -> f64 {
        if members.is_empty() {
            return 0.0;
        }
        (self.reducer())(members)
    }

    /// Parse from string
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "sum" => Some(Self::Sum),
            "mean" | "avg" | "average" => Some(Self::Mean),
            "min" => Some(Self::Min),
            "max" => Some(Self::Max),
            "count" => Some(Self::Count),
            "first" => Some(Self::First),
            _ => None,
        }
    }
}

impl std::fmt::Display for AggregationMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sum => write!(f, "sum"),
            Self::Mean => write!(f, "mean"),
            Self::Min => write!(f, "min"),
            Self::Max => write!(f, "max"),
            Self::Count => write!(f, "count"),
            Self::First => write!(f, "first"),
        }
    }
}

fn sum(members: &[&Record]) -> f64 {
    members.iter().map(|r| r.numeric_value()).sum()
}

fn mean(members: &[&Record]) -> f64 {
    sum(members) / members.len() as f64
}

fn min(members: &[&Record]) -> f64 {
    members
        .iter()
        .map(|r| r.numeric_value())
        .fold(f64::INFINITY, f64::min)
}

fn max(members: &[&Record]) -> f64 {
    members
        .iter()
        .map(|r| r.numeric_value())
        .fold(f64::NEG_INFINITY, f64::max)
}

fn count(members: &[&Record]) -> f64 {
    members.len() as f64
}

fn first(members: &[&Record]) -> f64 {
    members.first().map(|r| r.numeric_value()).unwrap_or(0.0)
}
