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

//! Partitioning of descriptors into load phases.

use tidemark_core::asset::{AssetDescriptor, LoadPhase};

/// Splits descriptors into the four phases, in phase order.
///
/// Every phase is present, possibly empty. Within a phase descriptors are
/// sorted by descending priority; ties keep their input order.
pub fn plan_phases(descriptors: Vec<AssetDescriptor>) -> Vec<(LoadPhase, Vec<AssetDescriptor>)> {
    let mut plan: Vec<(LoadPhase, Vec<AssetDescriptor>)> =
        LoadPhase::ALL.iter().map(|&phase| (phase, Vec::new())).collect();

    for descriptor in descriptors {
        if let Some((_, bucket)) = plan.iter_mut().find(|(phase, _)| *phase == descriptor.phase()) {
            bucket.push(descriptor);
        }
    }
    for (_, bucket) in &mut plan {
        bucket.sort_by_key(|d| std::cmp::Reverse(d.priority()));
    }
    plan
}
