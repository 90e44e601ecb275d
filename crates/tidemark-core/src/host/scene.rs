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

//! The background-scene collaborator.

/// The optional operations a [`SceneDetail`] implementation supports.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SceneCapabilities {
    /// `reduce_level_of_detail` is meaningful.
    pub reduce_level_of_detail: bool,
    /// `clear_transient_effects` is meaningful.
    pub clear_transient_effects: bool,
}

impl SceneCapabilities {
    /// Every operation supported.
    pub const ALL: Self = Self {
        reduce_level_of_detail: true,
        clear_transient_effects: true,
    };
}

/// Detail controls of the background scene, used by the emergency cascade.
pub trait SceneDetail: Send + Sync {
    /// Which of the operations below are supported.
    fn capabilities(&self) -> SceneCapabilities;

    /// Switches background content to coarser meshes.
    fn reduce_level_of_detail(&self) {}

    /// Drops particle systems and other short-lived effects.
    fn clear_transient_effects(&self) {}
}
