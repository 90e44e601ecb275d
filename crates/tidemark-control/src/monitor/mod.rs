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

//! Pressure assessment, eviction and emergency degradation.
//!
//! The [`BudgetMonitor`] turns a usage ratio into a [`PressureDecision`]
//! using three marks: at or above the high-water mark admission is paused and
//! eviction runs; at or above the escalation mark the [`EmergencyCascade`]
//! runs as well; admission resumes only once usage falls below the low-water
//! mark. The gap between the low and high marks keeps the gate from
//! flapping when usage hovers around a single threshold.

mod emergency;
mod eviction;
mod visibility;

pub use emergency::{CascadeReport, EmergencyCascade};
pub use eviction::EvictionPolicy;
pub use visibility::VisibilityHints;

use crate::gate::AdmissionGate;
use serde::Serialize;
use tidemark_core::budget::BudgetRatios;

/// What the monitor decided for one usage sample.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct PressureDecision {
    /// The assessed ratio.
    pub ratio: f64,
    /// Admission went from open to paused on this sample.
    pub paused_now: bool,
    /// Admission went from paused to open on this sample.
    pub resumed_now: bool,
    /// An eviction pass should run.
    pub evict: bool,
    /// The emergency cascade should run.
    pub emergency: bool,
}

/// The hysteresis state machine behind the admission gate.
#[derive(Debug)]
pub struct BudgetMonitor {
    ratios: BudgetRatios,
    gate: AdmissionGate,
    growth_pending: bool,
}

impl BudgetMonitor {
    /// Creates a monitor driving `gate`.
    pub fn new(ratios: BudgetRatios, gate: AdmissionGate) -> Self {
        Self {
            ratios,
            gate,
            growth_pending: false,
        }
    }

    /// The marks in use.
    pub fn ratios(&self) -> BudgetRatios {
        self.ratios
    }

    /// Requests an eviction pass on the next assessment regardless of the
    /// ratio.
    pub fn note_growth(&mut self) {
        self.growth_pending = true;
    }

    /// Whether a growth-triggered eviction is pending.
    pub fn growth_pending(&self) -> bool {
        self.growth_pending
    }

    /// Assesses one usage sample and flips the gate as needed.
    pub fn assess(&mut self, ratio: f64) -> PressureDecision {
        let over_high = ratio >= self.ratios.high_water_mark;
        let under_low = ratio < self.ratios.low_water_mark;

        let paused_now = over_high && self.gate.pause();
        let resumed_now = under_low && self.gate.resume();
        if paused_now {
            log::warn!(
                "Monitor: usage at {:.0}% of budget, pausing admission.",
                ratio * 100.0
            );
        }
        if resumed_now {
            log::info!(
                "Monitor: usage back to {:.0}% of budget, resuming admission.",
                ratio * 100.0
            );
        }

        let growth = std::mem::take(&mut self.growth_pending);
        PressureDecision {
            ratio,
            paused_now,
            resumed_now,
            evict: over_high || growth,
            emergency: ratio >= self.ratios.escalation_mark,
        }
    }
}
