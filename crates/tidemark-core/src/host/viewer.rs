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

//! Where the active camera is and what it sees.

use crate::math::{Frustum, Vec3};

/// The viewer's position and view volume at one instant.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewpoint {
    /// The camera's world position.
    pub position: Vec3,
    /// The camera's view frustum.
    pub frustum: Frustum,
}

/// Supplies the current [`Viewpoint`] for eviction checks.
pub trait ViewerProvider: Send + Sync {
    /// Returns the active viewpoint, or `None` when no camera exists yet.
    fn viewpoint(&self) -> Option<Viewpoint>;
}
