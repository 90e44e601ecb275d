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

//! Tunables of the resource manager.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use tidemark_core::budget::{BudgetRatios, MIB};

/// Every tunable constant of the manager, with production defaults.
///
/// Missing fields in a serialized config fall back to their defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ManagerConfig {
    /// Low-water, high-water and escalation marks.
    pub ratios: BudgetRatios,
    /// Period of the fast heap sampler, in milliseconds.
    pub fast_sample_interval_ms: u64,
    /// Period of the slow policy sweep, in milliseconds.
    pub policy_sweep_interval_ms: u64,
    /// Bytes assumed per loaded asset when host heap metrics are unavailable.
    pub estimated_bytes_per_asset: u64,
    /// Assets farther than this from the viewer are eviction candidates.
    pub eviction_distance: f32,
    /// Probability, per policy sweep, of an eviction pass without pressure.
    pub proactive_eviction_chance: f64,
    /// How long the emergency cascade keeps physics paused, in milliseconds.
    pub physics_cooldown_ms: u64,
    /// Pause between load chunks and phases, in milliseconds.
    pub chunk_yield_ms: u64,
    /// Delay between a collection's first unchecked mutation and its recheck.
    pub watcher_debounce_ms: u64,
    /// Consecutive growth rechecks that raise a growth event.
    pub growth_threshold: u32,
    /// Pixel density applied while the host is in the background.
    pub background_pixel_density: f32,
    /// Capacity of the growth event channel.
    pub growth_event_buffer: usize,
    /// Collaborator collections the growth watcher instruments.
    pub watched_collections: Vec<String>,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            ratios: BudgetRatios::default(),
            fast_sample_interval_ms: 1_000,
            policy_sweep_interval_ms: 5_000,
            estimated_bytes_per_asset: 10 * MIB,
            eviction_distance: 100.0,
            proactive_eviction_chance: 0.1,
            physics_cooldown_ms: 5_000,
            chunk_yield_ms: 10,
            watcher_debounce_ms: 100,
            growth_threshold: 3,
            background_pixel_density: 0.5,
            growth_event_buffer: 256,
            watched_collections: Vec::new(),
        }
    }
}

impl ManagerConfig {
    /// Parses a JSON config, then repairs it with [`ManagerConfig::validate`].
    pub fn from_json_str(json: &str) -> anyhow::Result<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| anyhow::anyhow!("Invalid resource manager config: {e}"))?;
        Ok(config.validate())
    }

    /// Returns a copy whose values are usable: ratios ordered, periods and
    /// counts non-zero, the eviction distance positive and finite,
    /// probabilities in `[0, 1]`.
    pub fn validate(mut self) -> Self {
        if !self.ratios.is_ordered() || self.ratios.escalation_mark > 1.5 {
            log::warn!(
                "Config: water marks {:?} are not ordered, using defaults.",
                self.ratios
            );
            self.ratios = BudgetRatios::default();
        }
        if self.fast_sample_interval_ms == 0 {
            log::warn!("Config: fast_sample_interval_ms must be non-zero, using 1000.");
            self.fast_sample_interval_ms = 1_000;
        }
        if self.policy_sweep_interval_ms == 0 {
            log::warn!("Config: policy_sweep_interval_ms must be non-zero, using 5000.");
            self.policy_sweep_interval_ms = 5_000;
        }
        if !self.eviction_distance.is_finite() || self.eviction_distance <= 0.0 {
            log::warn!(
                "Config: eviction_distance {} must be positive and finite, using 100.",
                self.eviction_distance
            );
            self.eviction_distance = 100.0;
        }
        if self.growth_threshold == 0 {
            self.growth_threshold = 1;
        }
        if self.growth_event_buffer == 0 {
            self.growth_event_buffer = 1;
        }
        self.proactive_eviction_chance = self.proactive_eviction_chance.clamp(0.0, 1.0);
        self.background_pixel_density = self.background_pixel_density.clamp(0.1, 1.0);
        self
    }

    /// The fast sampler period.
    pub fn fast_sample_interval(&self) -> Duration {
        Duration::from_millis(self.fast_sample_interval_ms)
    }

    /// The policy sweep period.
    pub fn policy_sweep_interval(&self) -> Duration {
        Duration::from_millis(self.policy_sweep_interval_ms)
    }

    /// The emergency physics cool-down.
    pub fn physics_cooldown(&self) -> Duration {
        Duration::from_millis(self.physics_cooldown_ms)
    }

    /// The inter-chunk yield.
    pub fn chunk_yield(&self) -> Duration {
        Duration::from_millis(self.chunk_yield_ms)
    }

    /// The watcher's debounce delay.
    pub fn watcher_debounce(&self) -> Duration {
        Duration::from_millis(self.watcher_debounce_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_keeps_defaults() {
        let config = ManagerConfig::from_json_str(r#"{ "growth_threshold": 5 }"#).unwrap();
        assert_eq!(config.growth_threshold, 5);
        assert_eq!(config.fast_sample_interval_ms, 1_000);
        assert_eq!(config.ratios, BudgetRatios::default());
    }

    #[test]
    fn unordered_ratios_are_repaired() {
        let json = r#"{ "ratios": { "low_water_mark": 0.9, "high_water_mark": 0.5, "escalation_mark": 0.95 } }"#;
        let config = ManagerConfig::from_json_str(json).unwrap();
        assert_eq!(config.ratios, BudgetRatios::default());
    }

    #[test]
    fn invalid_json_is_an_error() {
        assert!(ManagerConfig::from_json_str("{ not json").is_err());
    }

    #[test]
    fn zero_periods_and_out_of_range_chance_are_clamped() {
        let config = ManagerConfig {
            fast_sample_interval_ms: 0,
            proactive_eviction_chance: 4.0,
            growth_threshold: 0,
            ..Default::default()
        }
        .validate();
        assert_eq!(config.fast_sample_interval_ms, 1_000);
        assert_eq!(config.proactive_eviction_chance, 1.0);
        assert_eq!(config.growth_threshold, 1);
    }

    #[test]
    fn unusable_eviction_distance_is_replaced() {
        for distance in [-5.0, 0.0, f32::NAN, f32::INFINITY] {
            let config = ManagerConfig {
                eviction_distance: distance,
                ..Default::default()
            }
            .validate();
            assert_eq!(config.eviction_distance, 100.0);
        }

        let json = r#"{ "eviction_distance": -1.0 }"#;
        assert_eq!(ManagerConfig::from_json_str(json).unwrap().eviction_distance, 100.0);

        let kept = ManagerConfig {
            eviction_distance: 42.5,
            ..Default::default()
        }
        .validate();
        assert_eq!(kept.eviction_distance, 42.5);
    }
}
