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

//! The physics collaborator.

/// Pause control of the physics world.
///
/// Other parts of the host may pause and resume physics independently; the
/// manager only ever resumes a pause it started itself.
pub trait PhysicsControl: Send + Sync {
    /// Stops stepping the simulation.
    fn pause(&self);
    /// Resumes stepping the simulation.
    fn resume(&self);
    /// Returns `true` while the simulation is paused, by anyone.
    fn is_paused(&self) -> bool;
}
