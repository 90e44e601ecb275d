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

//! # Tidemark Core
//!
//! Foundational crate containing the asset contracts, collaborator traits and
//! budget types shared by the admission loader, the budget monitor and the
//! growth watcher. It holds no policy of its own.

#![warn(missing_docs)]

pub mod asset;
pub mod budget;
pub mod clock;
pub mod event;
pub mod host;
pub mod math;
pub mod telemetry;

pub use asset::{AssetDescriptor, AssetHandle, AssetLoadError, LoadPhase, LoadedAssetInfo};
pub use budget::{BudgetRatios, CapabilityProfile, DeviceTier, MemoryBudget};
pub use clock::{Clock, ManualClock, SystemClock};
