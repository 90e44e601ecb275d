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

//! Events exchanged between the watcher and the monitor.

pub mod bus;

pub use self::bus::EventBus;

/// Raised by the growth watcher when a collection kept growing across
/// several independent rechecks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GrowthEvent {
    /// The watched collection's name.
    pub collection: String,
    /// Its size at the recheck that crossed the threshold.
    pub size: usize,
    /// How many consecutive growth rechecks led to this event.
    pub consecutive_growth: u32,
}
