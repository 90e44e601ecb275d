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

//! # Tidemark Control
//!
//! The policy layer of the resource manager: it decides how many heavyweight
//! assets are loaded, in which order, and which ones are evicted, under a soft
//! memory budget measured at runtime.
//!
//! - [`profiler`] classifies the device once and derives the budget.
//! - [`admission`] loads descriptors phase by phase in bounded chunks.
//! - [`monitor`] samples usage, gates admission with hysteresis, evicts and
//!   escalates to the emergency cascade.
//! - [`watcher`] detects sustained growth of collaborator collections.
//! - [`service`] ties them together in the [`ResourceManager`].

#![warn(missing_docs)]

pub mod admission;
pub mod analysis;
pub mod config;
pub mod gate;
pub mod instruments;
pub mod metrics;
pub mod monitor;
pub mod profiler;
pub mod registry;
pub mod service;
pub mod usage;
pub mod watcher;

pub use admission::{AdmissionLoader, AdmissionQueue, LoadReport};
pub use analysis::AnalysisReport;
pub use config::ManagerConfig;
pub use gate::AdmissionGate;
pub use monitor::{BudgetMonitor, PressureDecision};
pub use profiler::profile;
pub use registry::{AssetRegistry, InsertOutcome, LoadedAsset, SharedRegistry};
pub use service::{Collaborators, RandomSource, ResourceManager, ResourceManagerBuilder, SweepReport};
pub use watcher::{GrowthSample, GrowthWatcher};
