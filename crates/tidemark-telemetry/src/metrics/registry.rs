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

//! Registry for managing metrics.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, PoisonError};
use tidemark_core::telemetry::{
    Metric, MetricId, MetricType, MetricValue, MetricsError, MetricsResult,
};

type Store = Arc<Mutex<BTreeMap<MetricId, Metric>>>;

/// Thread-safe storage of every metric, keyed by [`MetricId`].
///
/// Registration returns a typed handle; updates through a handle only touch
/// the shared map for the duration of one lock.
#[derive(Debug, Clone, Default)]
pub struct MetricsRegistry {
    store: Store,
}

impl MetricsRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a counter starting at zero.
    ///
    /// Registering an existing id returns a handle to the existing metric.
    pub fn register_counter(
        &self,
        namespace: impl Into<String>,
        name: impl Into<String>,
        description: impl Into<String>,
    ) -> MetricsResult<CounterHandle> {
        let id = MetricId::new(namespace, name);
        self.insert(&id, description.into(), "count", MetricValue::Counter(0))?;
        Ok(CounterHandle(Handle::new(id, &self.store)))
    }

    /// Registers a gauge starting at zero.
    pub fn register_gauge(
        &self,
        namespace: impl Into<String>,
        name: impl Into<String>,
        description: impl Into<String>,
        unit: impl Into<String>,
    ) -> MetricsResult<GaugeHandle> {
        let id = MetricId::new(namespace, name);
        self.insert(&id, description.into(), unit, MetricValue::Gauge(0.0))?;
        Ok(GaugeHandle(Handle::new(id, &self.store)))
    }

    /// Registers a histogram with ascending bucket upper bounds.
    pub fn register_histogram(
        &self,
        namespace: impl Into<String>,
        name: impl Into<String>,
        description: impl Into<String>,
        unit: impl Into<String>,
        bucket_bounds: Vec<f64>,
    ) -> MetricsResult<HistogramHandle> {
        let id = MetricId::new(namespace, name);
        if bucket_bounds.is_empty() || bucket_bounds.windows(2).any(|w| w[0] >= w[1]) {
            return Err(MetricsError::InvalidBuckets(id));
        }
        let bucket_counts = vec![0; bucket_bounds.len() + 1];
        let value = MetricValue::Histogram {
            bucket_bounds,
            bucket_counts,
            sum: 0.0,
            count: 0,
        };
        self.insert(&id, description.into(), unit, value)?;
        Ok(HistogramHandle(Handle::new(id, &self.store)))
    }

    /// Returns a copy of a metric.
    pub fn get_metric(&self, id: &MetricId) -> MetricsResult<Metric> {
        lock(&self.store)
            .get(id)
            .cloned()
            .ok_or_else(|| MetricsError::MetricNotFound(id.clone()))
    }

    /// Returns the number of registered metrics.
    pub fn metric_count(&self) -> usize {
        lock(&self.store).len()
    }

    /// Returns copies of every metric in `namespace`, ordered by name.
    pub fn namespace_metrics(&self, namespace: &str) -> Vec<Metric> {
        lock(&self.store)
            .values()
            .filter(|m| m.id.namespace == namespace)
            .cloned()
            .collect()
    }

    /// Renders counters and gauges as a flat JSON object (`"ns:name": value`).
    pub fn snapshot_json(&self) -> serde_json::Value {
        let store = lock(&self.store);
        let mut map = serde_json::Map::new();
        for metric in store.values() {
            let value = match &metric.value {
                MetricValue::Counter(v) => serde_json::json!(v),
                MetricValue::Gauge(v) => serde_json::json!(v),
                MetricValue::Histogram { count, sum, .. } => {
                    serde_json::json!({ "count": count, "sum": sum })
                }
            };
            map.insert(metric.id.to_string(), value);
        }
        serde_json::Value::Object(map)
    }

    fn insert(
        &self,
        id: &MetricId,
        description: String,
        unit: impl Into<String>,
        value: MetricValue,
    ) -> MetricsResult<()> {
        let mut store = lock(&self.store);
        if let Some(existing) = store.get(id) {
            let found = existing.value.metric_type();
            if found != value.metric_type() {
                return Err(MetricsError::TypeMismatch {
                    expected: value.metric_type(),
                    found,
                });
            }
            return Ok(());
        }
        log::debug!("Registered metric {id}");
        store.insert(
            id.clone(),
            Metric {
                id: id.clone(),
                description,
                unit: unit.into(),
                value,
            },
        );
        Ok(())
    }
}

fn lock(store: &Store) -> std::sync::MutexGuard<'_, BTreeMap<MetricId, Metric>> {
    store.lock().unwrap_or_else(PoisonError::into_inner)
}

#[derive(Debug, Clone)]
struct Handle {
    id: MetricId,
    store: Store,
}

impl Handle {
    fn new(id: MetricId, store: &Store) -> Self {
        Self {
            id,
            store: store.clone(),
        }
    }

    fn with_value<R>(&self, f: impl FnOnce(&mut MetricValue) -> MetricsResult<R>) -> MetricsResult<R> {
        let mut store = lock(&self.store);
        let metric = store
            .get_mut(&self.id)
            .ok_or_else(|| MetricsError::MetricNotFound(self.id.clone()))?;
        f(&mut metric.value)
    }
}

fn mismatch(expected: MetricType, value: &MetricValue) -> MetricsError {
    MetricsError::TypeMismatch {
        expected,
        found: value.metric_type(),
    }
}

/// Handle to a registered counter.
#[derive(Debug, Clone)]
pub struct CounterHandle(Handle);

impl CounterHandle {
    /// Adds one, returning the new total.
    pub fn increment(&self) -> MetricsResult<u64> {
        self.increment_by(1)
    }

    /// Adds `amount`, returning the new total.
    pub fn increment_by(&self, amount: u64) -> MetricsResult<u64> {
        self.0.with_value(|value| match value {
            MetricValue::Counter(v) => {
                *v = v.saturating_add(amount);
                Ok(*v)
            }
            other => Err(mismatch(MetricType::Counter, other)),
        })
    }

    /// Returns the current total.
    pub fn get(&self) -> MetricsResult<u64> {
        self.0.with_value(|value| {
            value
                .as_counter()
                .ok_or_else(|| mismatch(MetricType::Counter, value))
        })
    }

    /// The metric's id.
    pub fn id(&self) -> &MetricId {
        &self.0.id
    }
}

/// Handle to a registered gauge.
#[derive(Debug, Clone)]
pub struct GaugeHandle(Handle);

impl GaugeHandle {
    /// Sets the gauge.
    pub fn set(&self, new_value: f64) -> MetricsResult<()> {
        self.0.with_value(|value| match value {
            MetricValue::Gauge(v) => {
                *v = new_value;
                Ok(())
            }
            other => Err(mismatch(MetricType::Gauge, other)),
        })
    }

    /// Returns the current value.
    pub fn get(&self) -> MetricsResult<f64> {
        self.0.with_value(|value| {
            value
                .as_gauge()
                .ok_or_else(|| mismatch(MetricType::Gauge, value))
        })
    }

    /// The metric's id.
    pub fn id(&self) -> &MetricId {
        &self.0.id
    }
}

/// Handle to a registered histogram.
#[derive(Debug, Clone)]
pub struct HistogramHandle(Handle);

impl HistogramHandle {
    /// Records one observation.
    pub fn observe(&self, sample: f64) -> MetricsResult<()> {
        self.0.with_value(|value| match value {
            MetricValue::Histogram {
                bucket_bounds,
                bucket_counts,
                sum,
                count,
            } => {
                let slot = bucket_bounds
                    .iter()
                    .position(|bound| sample <= *bound)
                    .unwrap_or(bucket_bounds.len());
                bucket_counts[slot] += 1;
                *sum += sample;
                *count += 1;
                Ok(())
            }
            other => Err(mismatch(MetricType::Histogram, other)),
        })
    }

    /// Returns the number of observations.
    pub fn count(&self) -> MetricsResult<u64> {
        self.0.with_value(|value| match value {
            MetricValue::Histogram { count, .. } => Ok(*count),
            other => Err(mismatch(MetricType::Histogram, other)),
        })
    }

    /// The metric's id.
    pub fn id(&self) -> &MetricId {
        &self.0.id
    }
}
