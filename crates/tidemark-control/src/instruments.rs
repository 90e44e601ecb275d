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

//! The manager's metrics, registered once against a shared registry.

use tidemark_telemetry::{
    CounterHandle, GaugeHandle, HistogramHandle, MetricsRegistry, ScopedMetricTimer,
};

/// Load time buckets, in milliseconds.
const LOAD_TIME_BUCKETS_MS: [f64; 7] = [1.0, 5.0, 10.0, 50.0, 100.0, 500.0, 1000.0];

/// Metric handles used by the loader, the monitor and the watcher.
///
/// Registration failures leave the corresponding handle empty; recording
/// failures are logged. Neither ever interrupts the policy.
#[derive(Debug, Clone, Default)]
pub struct Instruments {
    admitted: Option<CounterHandle>,
    deferred: Option<CounterHandle>,
    failed: Option<CounterHandle>,
    evicted: Option<CounterHandle>,
    emergencies: Option<CounterHandle>,
    growth_events: Option<CounterHandle>,
    usage_ratio: Option<GaugeHandle>,
    load_time: Option<HistogramHandle>,
}

impl Instruments {
    /// Registers every metric in `registry`.
    pub fn register(registry: &MetricsRegistry) -> Self {
        Self {
            admitted: counter(registry, "assets", "admitted_total", "Assets admitted into the registry"),
            deferred: counter(registry, "assets", "deferred_total", "Descriptors pushed to the admission queue"),
            failed: counter(registry, "assets", "failed_total", "Asset loads that failed"),
            evicted: counter(registry, "assets", "evicted_total", "Assets evicted and disposed"),
            emergencies: counter(registry, "monitor", "emergency_total", "Emergency cleanup cascades"),
            growth_events: counter(registry, "watcher", "growth_events_total", "Sustained collection growth events"),
            usage_ratio: registry
                .register_gauge("monitor", "usage_ratio", "Memory usage over budget", "ratio")
                .map_err(|e| log::warn!("ResourceManager: cannot register usage gauge: {e}"))
                .ok(),
            load_time: registry
                .register_histogram(
                    "assets",
                    "load_time",
                    "Time spent loading one asset",
                    "ms",
                    LOAD_TIME_BUCKETS_MS.to_vec(),
                )
                .map_err(|e| log::warn!("ResourceManager: cannot register load histogram: {e}"))
                .ok(),
        }
    }

    pub(crate) fn admitted(&self) {
        bump(&self.admitted, 1);
    }

    pub(crate) fn deferred(&self, count: usize) {
        bump(&self.deferred, count as u64);
    }

    pub(crate) fn failed(&self) {
        bump(&self.failed, 1);
    }

    pub(crate) fn evicted(&self, count: usize) {
        bump(&self.evicted, count as u64);
    }

    pub(crate) fn emergency(&self) {
        bump(&self.emergencies, 1);
    }

    pub(crate) fn growth_event(&self) {
        bump(&self.growth_events, 1);
    }

    pub(crate) fn usage_ratio(&self, ratio: f64) {
        if let Some(gauge) = &self.usage_ratio {
            if let Err(e) = gauge.set(ratio) {
                log::debug!("ResourceManager: failed to record usage ratio: {e}");
            }
        }
    }

    /// A timer recording into the load-time histogram when dropped.
    pub(crate) fn time_load(&self) -> Option<ScopedMetricTimer<'_>> {
        self.load_time.as_ref().map(ScopedMetricTimer::new)
    }
}

fn counter(registry: &MetricsRegistry, namespace: &str, name: &str, description: &str) -> Option<CounterHandle> {
    registry
        .register_counter(namespace, name, description)
        .map_err(|e| log::warn!("ResourceManager: cannot register {namespace}:{name}: {e}"))
        .ok()
}

fn bump(handle: &Option<CounterHandle>, amount: u64) {
    if amount == 0 {
        return;
    }
    if let Some(counter) = handle {
        if let Err(e) = counter.increment_by(amount) {
            log::debug!("ResourceManager: failed to bump {}: {e}", counter.id());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tidemark_core::telemetry::MetricId;

    #[test]
    fn records_into_the_shared_registry() {
        let registry = MetricsRegistry::new();
        let instruments = Instruments::register(&registry);

        instruments.admitted();
        instruments.deferred(3);
        instruments.usage_ratio(0.42);
        drop(instruments.time_load());

        let deferred = registry
            .get_metric(&MetricId::new("assets", "deferred_total"))
            .unwrap();
        assert_eq!(deferred.value.as_counter(), Some(3));
        let ratio = registry
            .get_metric(&MetricId::new("monitor", "usage_ratio"))
            .unwrap();
        assert_eq!(ratio.value.as_gauge(), Some(0.42));
    }

    #[test]
    fn default_instruments_are_inert() {
        let instruments = Instruments::default();
        instruments.admitted();
        instruments.usage_ratio(1.0);
        assert!(instruments.time_load().is_none());
    }
}
