// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Metric identifiers, values and errors.

use std::fmt::{self, Display};

/// A structured metric identifier: a namespace and a name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MetricId {
    /// The broad category (e.g. "assets", "monitor").
    pub namespace: String,
    /// The metric name within the namespace (e.g. "evicted_total").
    pub name: String,
}

impl MetricId {
    /// Creates a new `MetricId`.
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }
}

impl Display for MetricId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.namespace, self.name)
    }
}

/// The fundamental type of a metric.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricType {
    /// Only ever increases.
    Counter,
    /// Goes up and down.
    Gauge,
    /// Records a distribution over fixed buckets.
    Histogram,
}

/// The current value of a metric.
#[derive(Debug, Clone, PartialEq)]
pub enum MetricValue {
    /// A counter value.
    Counter(u64),
    /// A gauge value.
    Gauge(f64),
    /// Bucketed observations.
    Histogram {
        /// Upper bounds of the buckets, ascending.
        bucket_bounds: Vec<f64>,
        /// Observation count per bucket; one extra slot counts overflow.
        bucket_counts: Vec<u64>,
        /// Sum of every observation.
        sum: f64,
        /// Number of observations.
        count: u64,
    },
}

impl MetricValue {
    /// Returns the [`MetricType`] of this value.
    pub fn metric_type(&self) -> MetricType {
        match self {
            MetricValue::Counter(_) => MetricType::Counter,
            MetricValue::Gauge(_) => MetricType::Gauge,
            MetricValue::Histogram { .. } => MetricType::Histogram,
        }
    }

    /// Returns the value as a `u64` if it is a counter.
    pub fn as_counter(&self) -> Option<u64> {
        match self {
            MetricValue::Counter(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns the value as an `f64` if it is a gauge.
    pub fn as_gauge(&self) -> Option<f64> {
        match self {
            MetricValue::Gauge(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns the mean observation if this is a non-empty histogram.
    pub fn histogram_mean(&self) -> Option<f64> {
        match self {
            MetricValue::Histogram { sum, count, .. } if *count > 0 => {
                Some(*sum / *count as f64)
            }
            _ => None,
        }
    }
}

/// A metric together with its description.
#[derive(Debug, Clone)]
pub struct Metric {
    /// The metric's identifier.
    pub id: MetricId,
    /// What the metric measures.
    pub description: String,
    /// The unit of measurement ("count", "ms", "ratio", ...).
    pub unit: String,
    /// The current value.
    pub value: MetricValue,
}

/// A specialized `Result` type for metric operations.
pub type MetricsResult<T> = Result<T, MetricsError>;

/// An error raised by the metrics registry.
#[derive(Debug, Clone, PartialEq)]
pub enum MetricsError {
    /// The metric was never registered.
    MetricNotFound(MetricId),
    /// The operation does not apply to the metric's type.
    TypeMismatch {
        /// The type the operation expected.
        expected: MetricType,
        /// The type actually registered.
        found: MetricType,
    },
    /// Histogram bounds were empty or not ascending.
    InvalidBuckets(MetricId),
}

impl Display for MetricsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetricsError::MetricNotFound(id) => write!(f, "Metric not found: {id}"),
            MetricsError::TypeMismatch { expected, found } => {
                write!(f, "Type mismatch: expected {expected:?}, found {found:?}")
            }
            MetricsError::InvalidBuckets(id) => {
                write!(f, "Histogram buckets for {id} must be non-empty and ascending")
            }
        }
    }
}

impl std::error::Error for MetricsError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metric_id_formats_as_namespace_colon_name() {
        assert_eq!(MetricId::new("assets", "evicted_total").to_string(), "assets:evicted_total");
    }

    #[test]
    fn value_accessors_match_type() {
        assert_eq!(MetricValue::Counter(3).as_counter(), Some(3));
        assert_eq!(MetricValue::Counter(3).as_gauge(), None);
        assert_eq!(MetricValue::Gauge(0.5).metric_type(), MetricType::Gauge);

        let histogram = MetricValue::Histogram {
            bucket_bounds: vec![1.0],
            bucket_counts: vec![1, 1],
            sum: 6.0,
            count: 2,
        };
        assert_eq!(histogram.histogram_mean(), Some(3.0));
    }
}
