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

//! The host-side handle of a loaded asset.

use super::LoadPhase;
use crate::math::Vec3;

/// A loaded resource owned by the host runtime.
///
/// The handle is returned by the asset loader collaborator and owned by the
/// asset registry afterwards. Eviction calls [`AssetHandle::dispose`] exactly
/// once, in the same critical section that removes the registry entry.
pub trait AssetHandle: Send + Sync {
    /// The last known world position, used for distance and frustum checks.
    fn position(&self) -> Vec3;

    /// Releases geometry, material and texture resources, removes any physics
    /// body and detaches the asset from its parent container.
    fn dispose(&mut self);

    /// A rough size estimate in bytes, if the host knows it.
    fn size_hint(&self) -> Option<u64> {
        None
    }
}

/// A plain snapshot of an admitted asset, returned to callers.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadedAssetInfo {
    /// The asset name.
    pub name: String,
    /// The classification tag.
    pub tag: String,
    /// The phase it was admitted in.
    pub phase: LoadPhase,
    /// Its priority score.
    pub priority: i32,
    /// Its world position at admission time.
    pub position: Vec3,
}
