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

//! Diagnostic snapshots of the manager's state.
//!
//! [`analyze`] folds the monitor's view of the world into an
//! [`AnalysisReport`] and derives human-readable alerts from it, the same
//! alerts the loops would act on.

use crate::metrics::UsageHistory;
use crate::usage::{UsageSample, UsageSource};
use crate::watcher::GrowthSample;
use serde::Serialize;
use std::collections::BTreeMap;
use tidemark_core::asset::LoadPhase;
use tidemark_core::budget::{CapabilityProfile, MemoryBudget};

/// A usage trend (ratio per half window) above which an alert is raised.
const RISING_TREND_THRESHOLD: f64 = 0.05;

/// Everything [`analyze`] looks at.
#[derive(Debug, Clone)]
pub struct AnalysisInput<'a> {
    /// The device profile.
    pub profile: CapabilityProfile,
    /// The budget and its marks.
    pub budget: MemoryBudget,
    /// A fresh usage measurement.
    pub usage: UsageSample,
    /// Recent usage ratios.
    pub history: &'a UsageHistory,
    /// Whether admission is paused.
    pub admission_paused: bool,
    /// Loaded assets per phase.
    pub loaded_per_phase: BTreeMap<LoadPhase, usize>,
    /// Descriptors waiting in the admission queue.
    pub deferred: usize,
    /// Watched collections.
    pub growth: Vec<GrowthSample>,
    /// Whether the emergency cascade currently holds physics paused.
    pub physics_paused_by_manager: bool,
    /// The metrics registry rendered as JSON.
    pub metrics: serde_json::Value,
}

/// The result of a forced analysis.
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisReport {
    /// The device profile.
    pub profile: CapabilityProfile,
    /// Budget in bytes.
    pub budget_bytes: u64,
    /// Bytes considered in use.
    pub used_bytes: u64,
    /// `used_bytes / budget_bytes`.
    pub usage_ratio: f64,
    /// How usage was measured.
    pub usage_source: UsageSource,
    /// Whether admission is paused.
    pub admission_paused: bool,
    /// Total loaded assets.
    pub loaded: usize,
    /// Loaded assets per phase.
    pub loaded_per_phase: BTreeMap<LoadPhase, usize>,
    /// Descriptors waiting for headroom.
    pub deferred: usize,
    /// Average of the recent usage ratios.
    pub average_ratio: f64,
    /// Direction of the recent usage ratios.
    pub ratio_trend: f64,
    /// Highest recent usage ratio.
    pub peak_ratio: f64,
    /// Watched collections.
    pub growth: Vec<GrowthSample>,
    /// Whether physics is paused by the emergency cascade.
    pub physics_paused_by_manager: bool,
    /// Counter and gauge values.
    pub metrics: serde_json::Value,
    /// Findings worth a human's attention.
    pub alerts: Vec<String>,
}

/// Builds the report and its alerts.
pub fn analyze(input: AnalysisInput<'_>) -> AnalysisReport {
    let ratios = input.budget.ratios;
    let ratio = input.usage.ratio;
    let mut alerts = Vec::new();

    if ratio >= ratios.escalation_mark {
        alerts.push(format!(
            "Usage at {:.0}% of budget, above the escalation mark ({:.0}%).",
            ratio * 100.0,
            ratios.escalation_mark * 100.0
        ));
    } else if ratio >= ratios.high_water_mark {
        alerts.push(format!(
            "Usage at {:.0}% of budget, above the high-water mark ({:.0}%).",
            ratio * 100.0,
            ratios.high_water_mark * 100.0
        ));
    }

    let trend = input.history.trend();
    if trend > RISING_TREND_THRESHOLD && ratio >= ratios.low_water_mark {
        alerts.push(format!("Usage is climbing ({:+.2} per window).", trend));
    }

    if input.usage.source == UsageSource::AssetCountEstimate {
        alerts.push("Host heap metrics unavailable, usage is estimated from the asset count.".to_string());
    }

    if input.admission_paused && input.deferred > 0 {
        alerts.push(format!(
            "Admission paused with {} descriptors waiting.",
            input.deferred
        ));
    }

    for sample in input.growth.iter().filter(|s| s.consecutive_growth > 0) {
        alerts.push(format!(
            "Collection '{}' grew on {} consecutive rechecks ({} elements).",
            sample.name, sample.consecutive_growth, sample.last_size
        ));
    }

    if input.physics_paused_by_manager {
        alerts.push("Physics is paused by the emergency cascade.".to_string());
    }

    AnalysisReport {
        profile: input.profile,
        budget_bytes: input.budget.bytes,
        used_bytes: input.usage.used_bytes,
        usage_ratio: ratio,
        usage_source: input.usage.source,
        admission_paused: input.admission_paused,
        loaded: input.loaded_per_phase.values().sum(),
        loaded_per_phase: input.loaded_per_phase,
        deferred: input.deferred,
        average_ratio: input.history.average(),
        ratio_trend: trend,
        peak_ratio: input.history.peak(),
        growth: input.growth,
        physics_paused_by_manager: input.physics_paused_by_manager,
        metrics: input.metrics,
        alerts,
    }
}
