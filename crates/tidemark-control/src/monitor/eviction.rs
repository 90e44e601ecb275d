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

//! Which loaded assets are no longer worth their memory.

use crate::registry::{AssetRegistry, LoadedAsset};
use tidemark_core::asset::LoadPhase;
use tidemark_core::host::Viewpoint;

/// Evicts assets that are outside the view frustum or farther than a fixed
/// distance from the viewer.
///
/// Essential assets are never evicted. Without a viewpoint nothing is.
#[derive(Debug, Clone, Copy)]
pub struct EvictionPolicy {
    max_distance: f32,
}

impl EvictionPolicy {
    /// Creates a policy with the given distance threshold.
    pub fn new(max_distance: f32) -> Self {
        Self { max_distance }
    }

    /// Whether `asset` should go, as seen from `viewpoint`.
    pub fn is_unused(&self, asset: &LoadedAsset, viewpoint: &Viewpoint) -> bool {
        if asset.info.phase == LoadPhase::Essential {
            return false;
        }
        let position = asset.handle.position();
        !viewpoint.frustum.contains_point(position)
            || position.distance(viewpoint.position) > self.max_distance
    }

    /// Removes and disposes every unused asset. Returns the evicted names.
    pub fn evict(&self, registry: &mut AssetRegistry, viewpoint: Option<&Viewpoint>) -> Vec<String> {
        let Some(viewpoint) = viewpoint else {
            log::debug!("Monitor: no viewpoint available, skipping eviction.");
            return Vec::new();
        };
        registry.evict_where(|asset| self.is_unused(asset, viewpoint))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::FRAC_PI_2;
    use tidemark_core::asset::{AssetHandle, LoadedAssetInfo};
    use tidemark_core::math::{Frustum, Vec3};

    struct Placed(Vec3);

    impl AssetHandle for Placed {
        fn position(&self) -> Vec3 {
            self.0
        }
        fn dispose(&mut self) {}
    }

    fn insert(registry: &mut AssetRegistry, name: &str, phase: LoadPhase, position: Vec3) {
        registry.insert(
            LoadedAssetInfo {
                name: name.to_string(),
                tag: String::new(),
                phase,
                priority: 0,
                position,
            },
            Box::new(Placed(position)),
        );
    }

    fn viewpoint() -> Viewpoint {
        // Looking down -Z from the origin.
        Viewpoint {
            position: Vec3::ZERO,
            frustum: Frustum::perspective(
                Vec3::ZERO,
                Vec3::new(0.0, 0.0, -1.0),
                Vec3::Y,
                FRAC_PI_2,
                1.0,
                0.1,
                1000.0,
            ),
        }
    }

    #[test]
    fn evicts_out_of_view_and_far_assets_only() {
        let mut registry = AssetRegistry::new();
        insert(&mut registry, "visible", LoadPhase::Decorative, Vec3::new(0.0, 0.0, -10.0));
        insert(&mut registry, "behind", LoadPhase::Decorative, Vec3::new(0.0, 0.0, 10.0));
        insert(&mut registry, "far", LoadPhase::Interactive, Vec3::new(0.0, 0.0, -500.0));
        insert(&mut registry, "hud", LoadPhase::Essential, Vec3::new(0.0, 0.0, 50.0));

        let evicted = EvictionPolicy::new(100.0).evict(&mut registry, Some(&viewpoint()));

        assert_eq!(evicted, vec!["behind".to_string(), "far".to_string()]);
        assert_eq!(registry.names(), vec!["hud".to_string(), "visible".to_string()]);
    }

    #[test]
    fn no_viewpoint_means_no_eviction() {
        let mut registry = AssetRegistry::new();
        insert(&mut registry, "behind", LoadPhase::Background, Vec3::new(0.0, 0.0, 10.0));
        assert!(EvictionPolicy::new(100.0).evict(&mut registry, None).is_empty());
        assert_eq!(registry.len(), 1);
    }
}
