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

//! Simulated host collaborators.

use async_trait::async_trait;
use std::f32::consts::FRAC_PI_3;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tidemark_core::asset::{AssetDescriptor, AssetHandle, AssetLoadError};
use tidemark_core::budget::GIB;
use tidemark_core::host::{
    AssetLoader, HeapMetrics, HeapSample, PhysicsControl, RendererCapabilities, RendererHints,
    TrackedCollection, ViewerProvider, Viewpoint,
};
use tidemark_core::math::{Frustum, Vec3};

/// Heap usage driven by the simulated loads.
#[derive(Debug, Default)]
pub struct SimulatedHeap {
    used: AtomicU64,
}

impl HeapMetrics for SimulatedHeap {
    fn sample(&self) -> Option<HeapSample> {
        Some(HeapSample {
            used_bytes: self.used.load(Ordering::Relaxed),
            limit_bytes: 4 * GIB,
        })
    }
}

pub struct SimulatedMesh {
    name: String,
    position: Vec3,
    bytes: u64,
    heap: Arc<SimulatedHeap>,
    scene: Arc<TrackedCollection<String>>,
}

impl AssetHandle for SimulatedMesh {
    fn position(&self) -> Vec3 {
        self.position
    }

    fn dispose(&mut self) {
        self.scene.remove_where(|entry| *entry == self.name);
        let _ = self
            .heap
            .used
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |used| {
                Some(used.saturating_sub(self.bytes))
            });
        log::debug!("Sandbox: disposed '{}'.", self.name);
    }

    fn size_hint(&self) -> Option<u64> {
        Some(self.bytes)
    }
}

/// Pretends to fetch and decode a mesh, charging a fixed size per asset.
pub struct SimulatedLoader {
    heap: Arc<SimulatedHeap>,
    scene: Arc<TrackedCollection<String>>,
    bytes_per_asset: u64,
}

impl SimulatedLoader {
    pub fn new(heap: Arc<SimulatedHeap>, scene: Arc<TrackedCollection<String>>, bytes_per_asset: u64) -> Self {
        Self {
            heap,
            scene,
            bytes_per_asset,
        }
    }
}

#[async_trait]
impl AssetLoader for SimulatedLoader {
    async fn load(&self, descriptor: &AssetDescriptor) -> Result<Box<dyn AssetHandle>, AssetLoadError> {
        tokio::time::sleep(Duration::from_millis(20)).await;

        let position = match descriptor.params().get("position") {
            Some(value) => {
                let [x, y, z]: [f32; 3] = serde_json::from_value(value.clone()).map_err(|e| {
                    AssetLoadError::Decode {
                        name: descriptor.name().to_string(),
                        details: e.to_string(),
                    }
                })?;
                Vec3::new(x, y, z)
            }
            None => Vec3::new(0.0, 0.0, -5.0),
        };

        self.heap.used.fetch_add(self.bytes_per_asset, Ordering::Relaxed);
        self.scene.insert(descriptor.name().to_string());
        Ok(Box::new(SimulatedMesh {
            name: descriptor.name().to_string(),
            position,
            bytes: self.bytes_per_asset,
            heap: Arc::clone(&self.heap),
            scene: Arc::clone(&self.scene),
        }))
    }
}

pub struct SimulatedRenderer;

impl RendererHints for SimulatedRenderer {
    fn capabilities(&self) -> RendererCapabilities {
        RendererCapabilities {
            pixel_density: true,
            clear_caches: true,
            clear_non_essential_assets: false,
        }
    }

    fn set_pixel_density(&self, ratio: f32) {
        log::info!("Sandbox: renderer pixel density set to {ratio}.");
    }

    fn clear_caches(&self) {
        log::info!("Sandbox: renderer caches cleared.");
    }
}

#[derive(Default)]
pub struct SimulatedPhysics {
    paused: AtomicBool,
}

impl PhysicsControl for SimulatedPhysics {
    fn pause(&self) {
        self.paused.store(true, Ordering::SeqCst);
        log::info!("Sandbox: physics paused.");
    }

    fn resume(&self) {
        self.paused.store(false, Ordering::SeqCst);
        log::info!("Sandbox: physics resumed.");
    }

    fn is_paused(&self) -> bool {
        self.paused.load(Ordering::SeqCst)
    }
}

/// A camera at the origin looking down -Z.
pub struct SimulatedViewer;

impl ViewerProvider for SimulatedViewer {
    fn viewpoint(&self) -> Option<Viewpoint> {
        Some(Viewpoint {
            position: Vec3::ZERO,
            frustum: Frustum::perspective(
                Vec3::ZERO,
                Vec3::new(0.0, 0.0, -1.0),
                Vec3::Y,
                FRAC_PI_3,
                16.0 / 9.0,
                0.1,
                500.0,
            ),
        })
    }
}
