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

//! Device tiers and the soft memory budget derived from them.

use serde::{Deserialize, Serialize};
use std::fmt;

/// One mebibyte.
pub const MIB: u64 = 1024 * 1024;
/// One gibibyte.
pub const GIB: u64 = 1024 * MIB;

/// The capability class of the running device.
///
/// The derived `Ord` follows declaration order: `LowMemory < Mobile < Desktop`.
/// Budgets and concurrency limits are monotonic in this order.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
pub enum DeviceTier {
    /// Little RAM, an old mobile OS, or a weak desktop.
    LowMemory,
    /// A reasonably modern phone or tablet.
    #[default]
    Mobile,
    /// A desktop or laptop class machine.
    Desktop,
}

impl fmt::Display for DeviceTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self:?}")
    }
}

/// The result of profiling the device once at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapabilityProfile {
    /// The classified tier.
    pub tier: DeviceTier,
    /// The soft ceiling on live asset memory, in bytes.
    pub memory_budget: u64,
    /// How many asset loads may run in parallel within a chunk.
    pub max_concurrent_loads: usize,
}

/// Usage-to-budget ratios that drive the admission gate.
///
/// Ratios rather than byte counts, so the same policy applies to every tier.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BudgetRatios {
    /// Below this ratio a paused gate reopens and eviction stops.
    pub low_water_mark: f64,
    /// At or above this ratio admission pauses and eviction starts.
    pub high_water_mark: f64,
    /// At or above this ratio the emergency cleanup cascade runs.
    pub escalation_mark: f64,
}

impl Default for BudgetRatios {
    fn default() -> Self {
        Self {
            low_water_mark: 0.70,
            high_water_mark: 0.85,
            escalation_mark: 0.95,
        }
    }
}

impl BudgetRatios {
    /// Returns `true` if `low < high < escalation` and all ratios are positive.
    pub fn is_ordered(&self) -> bool {
        self.low_water_mark > 0.0
            && self.low_water_mark < self.high_water_mark
            && self.high_water_mark < self.escalation_mark
    }
}

/// The byte ceiling together with its hysteresis ratios.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MemoryBudget {
    /// The soft ceiling, in bytes.
    pub bytes: u64,
    /// The water marks, as fractions of `bytes`.
    pub ratios: BudgetRatios,
}

impl MemoryBudget {
    /// Creates a budget with the given ceiling and ratios.
    pub fn new(bytes: u64, ratios: BudgetRatios) -> Self {
        Self { bytes, ratios }
    }

    /// Converts a usage in bytes into a usage ratio.
    ///
    /// A zero budget is treated as fully consumed.
    pub fn ratio_of(&self, used_bytes: u64) -> f64 {
        if self.bytes == 0 {
            return f64::INFINITY;
        }
        used_bytes as f64 / self.bytes as f64
    }

    /// The usage, in bytes, at which admission pauses.
    pub fn high_water_bytes(&self) -> u64 {
        (self.bytes as f64 * self.ratios.high_water_mark) as u64
    }

    /// The usage, in bytes, below which admission resumes.
    pub fn low_water_bytes(&self) -> u64 {
        (self.bytes as f64 * self.ratios.low_water_mark) as u64
    }
}
