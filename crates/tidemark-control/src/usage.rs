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

//! Measurement of current memory usage against the budget.

use crate::registry::{lock_registry, SharedRegistry};
use serde::Serialize;
use std::sync::Arc;
use tidemark_core::budget::MemoryBudget;
use tidemark_core::host::HeapMetrics;

/// Where a usage figure came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum UsageSource {
    /// The host reported its heap size.
    HostHeap,
    /// No heap metrics: loaded asset count times a fixed estimate.
    AssetCountEstimate,
}

/// One usage measurement.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct UsageSample {
    /// Bytes considered in use.
    pub used_bytes: u64,
    /// The host heap limit, when known.
    pub limit_bytes: Option<u64>,
    /// `used_bytes / budget`.
    pub ratio: f64,
    /// How `used_bytes` was obtained.
    pub source: UsageSource,
}

/// Computes usage ratios from host heap metrics, or from the registry when
/// the host cannot report them.
#[derive(Clone)]
pub struct UsageProbe {
    heap: Option<Arc<dyn HeapMetrics>>,
    registry: SharedRegistry,
    budget: MemoryBudget,
    bytes_per_asset: u64,
}

impl UsageProbe {
    /// Creates a probe.
    pub fn new(
        heap: Option<Arc<dyn HeapMetrics>>,
        registry: SharedRegistry,
        budget: MemoryBudget,
        bytes_per_asset: u64,
    ) -> Self {
        Self {
            heap,
            registry,
            budget,
            bytes_per_asset,
        }
    }

    /// The budget ratios are measured against.
    pub fn budget(&self) -> &MemoryBudget {
        &self.budget
    }

    /// Takes one measurement. Never fails.
    pub fn sample(&self) -> UsageSample {
        if let Some(heap) = self.heap.as_ref().and_then(|heap| heap.sample()) {
            return UsageSample {
                used_bytes: heap.used_bytes,
                limit_bytes: Some(heap.limit_bytes),
                ratio: self.budget.ratio_of(heap.used_bytes),
                source: UsageSource::HostHeap,
            };
        }

        let loaded = lock_registry(&self.registry).len() as u64;
        let used_bytes = loaded.saturating_mul(self.bytes_per_asset);
        UsageSample {
            used_bytes,
            limit_bytes: None,
            ratio: self.budget.ratio_of(used_bytes),
            source: UsageSource::AssetCountEstimate,
        }
    }

    /// Shorthand for `sample().ratio`.
    pub fn ratio(&self) -> f64 {
        self.sample().ratio
    }
}
