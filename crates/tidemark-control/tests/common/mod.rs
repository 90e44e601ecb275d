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

//! Mock host collaborators shared by the integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::HashSet;
use std::f32::consts::FRAC_PI_2;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tidemark_core::asset::{AssetDescriptor, AssetHandle, AssetLoadError};
use tidemark_core::budget::GIB;
use tidemark_core::host::{
    AssetLoader, HeapMetrics, HeapSample, PhysicsControl, RendererCapabilities, RendererHints,
    SceneCapabilities, SceneDetail, SubscriptionId, TrackedCollection, ViewerProvider, Viewpoint,
    Visibility, VisibilityCallback, VisibilitySignal,
};
use tidemark_core::math::{Frustum, Vec3};

/// In front of the default viewer, well within the eviction distance.
pub const VISIBLE: [f32; 3] = [0.0, 0.0, -10.0];
/// Behind the default viewer.
pub const BEHIND: [f32; 3] = [0.0, 0.0, 10.0];

/// A descriptor placed at `position`.
pub fn placed(name: &str, tag: &str, position: [f32; 3]) -> AssetDescriptor {
    AssetDescriptor::new(name, tag).with_params(serde_json::json!({ "position": position }))
}

/// Heap usage the tests can move by hand.
#[derive(Debug, Default)]
pub struct MockHeap {
    used: AtomicU64,
}

impl MockHeap {
    pub fn set(&self, bytes: u64) {
        self.used.store(bytes, Ordering::SeqCst);
    }

    pub fn add(&self, bytes: u64) {
        self.used.fetch_add(bytes, Ordering::SeqCst);
    }

    pub fn sub(&self, bytes: u64) {
        let _ = self
            .used
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |used| Some(used.saturating_sub(bytes)));
    }

    pub fn used(&self) -> u64 {
        self.used.load(Ordering::SeqCst)
    }
}

impl HeapMetrics for MockHeap {
    fn sample(&self) -> Option<HeapSample> {
        Some(HeapSample {
            used_bytes: self.used(),
            limit_bytes: 4 * GIB,
        })
    }
}

/// A loaded asset that reports its disposal.
pub struct MockHandle {
    name: String,
    position: Vec3,
    bytes: u64,
    heap: Option<Arc<MockHeap>>,
    scene: Option<Arc<TrackedCollection<String>>>,
    disposed: Arc<Mutex<Vec<String>>>,
}

impl AssetHandle for MockHandle {
    fn position(&self) -> Vec3 {
        self.position
    }

    fn dispose(&mut self) {
        if let Some(scene) = &self.scene {
            scene.remove_where(|entry| *entry == self.name);
        }
        if let Some(heap) = &self.heap {
            heap.sub(self.bytes);
        }
        self.disposed.lock().unwrap().push(self.name.clone());
    }

    fn size_hint(&self) -> Option<u64> {
        Some(self.bytes)
    }
}

/// Records every load and can be told to fail some names.
#[derive(Default)]
pub struct MockLoader {
    pub order: Mutex<Vec<String>>,
    pub calls: AtomicUsize,
    pub disposed: Arc<Mutex<Vec<String>>>,
    failing: HashSet<String>,
    heap: Option<Arc<MockHeap>>,
    bytes_per_load: u64,
    scene: Option<Arc<TrackedCollection<String>>>,
    delay: Option<Duration>,
}

impl MockLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every load grows `heap` by `bytes`; disposal shrinks it back.
    pub fn charging(mut self, heap: &Arc<MockHeap>, bytes: u64) -> Self {
        self.heap = Some(Arc::clone(heap));
        self.bytes_per_load = bytes;
        self
    }

    /// Loaded assets are added to `scene` and removed on disposal.
    pub fn attaching_to(mut self, scene: &Arc<TrackedCollection<String>>) -> Self {
        self.scene = Some(Arc::clone(scene));
        self
    }

    /// Every load takes `delay` before it completes.
    pub fn slow(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn failing(mut self, name: &str) -> Self {
        self.failing.insert(name.to_string());
        self
    }

    pub fn order(&self) -> Vec<String> {
        self.order.lock().unwrap().clone()
    }

    pub fn disposed(&self) -> Vec<String> {
        self.disposed.lock().unwrap().clone()
    }
}

#[async_trait]
impl AssetLoader for MockLoader {
    async fn load(&self, descriptor: &AssetDescriptor) -> Result<Box<dyn AssetHandle>, AssetLoadError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.order.lock().unwrap().push(descriptor.name().to_string());
        match self.delay {
            Some(delay) => tokio::time::sleep(delay).await,
            None => tokio::task::yield_now().await,
        }

        if self.failing.contains(descriptor.name()) {
            return Err(AssetLoadError::NotFound(descriptor.name().to_string()));
        }

        let [x, y, z] = descriptor
            .params()
            .get("position")
            .and_then(|value| serde_json::from_value::<[f32; 3]>(value.clone()).ok())
            .unwrap_or(VISIBLE);
        if let Some(heap) = &self.heap {
            heap.add(self.bytes_per_load);
        }
        if let Some(scene) = &self.scene {
            scene.insert(descriptor.name().to_string());
        }
        Ok(Box::new(MockHandle {
            name: descriptor.name().to_string(),
            position: Vec3::new(x, y, z),
            bytes: self.bytes_per_load,
            heap: self.heap.clone(),
            scene: self.scene.clone(),
            disposed: Arc::clone(&self.disposed),
        }))
    }
}

/// A viewer at the origin looking down -Z.
pub struct FixedViewer;

impl ViewerProvider for FixedViewer {
    fn viewpoint(&self) -> Option<Viewpoint> {
        Some(Viewpoint {
            position: Vec3::ZERO,
            frustum: Frustum::perspective(
                Vec3::ZERO,
                Vec3::new(0.0, 0.0, -1.0),
                Vec3::Y,
                FRAC_PI_2,
                16.0 / 9.0,
                0.1,
                1000.0,
            ),
        })
    }
}

#[derive(Default)]
pub struct MockPhysics {
    paused: AtomicBool,
    pub pauses: AtomicUsize,
    pub resumes: AtomicUsize,
}

impl PhysicsControl for MockPhysics {
    fn pause(&self) {
        self.paused.store(true, Ordering::SeqCst);
        self.pauses.fetch_add(1, Ordering::SeqCst);
    }

    fn resume(&self) {
        self.paused.store(false, Ordering::SeqCst);
        self.resumes.fetch_add(1, Ordering::SeqCst);
    }

    fn is_paused(&self) -> bool {
        self.paused.load(Ordering::SeqCst)
    }
}

/// Records the renderer and scene calls in order.
#[derive(Default)]
pub struct CallLog {
    calls: Mutex<Vec<String>>,
}

impl CallLog {
    pub fn push(&self, call: impl Into<String>) {
        self.calls.lock().unwrap().push(call.into());
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

pub struct MockRenderer {
    pub log: Arc<CallLog>,
    pub capabilities: RendererCapabilities,
}

impl RendererHints for MockRenderer {
    fn capabilities(&self) -> RendererCapabilities {
        self.capabilities
    }

    fn set_pixel_density(&self, ratio: f32) {
        self.log.push(format!("pixel_density:{ratio}"));
    }

    fn clear_caches(&self) {
        self.log.push("clear_caches");
    }

    fn clear_non_essential_assets(&self) {
        self.log.push("clear_non_essential_assets");
    }
}

pub struct MockScene {
    pub log: Arc<CallLog>,
}

impl SceneDetail for MockScene {
    fn capabilities(&self) -> SceneCapabilities {
        SceneCapabilities::ALL
    }

    fn reduce_level_of_detail(&self) {
        self.log.push("reduce_level_of_detail");
    }

    fn clear_transient_effects(&self) {
        self.log.push("clear_transient_effects");
    }
}

/// A visibility signal the tests fire by hand.
#[derive(Default)]
pub struct MockVisibility {
    callbacks: Mutex<Vec<(SubscriptionId, VisibilityCallback)>>,
    next_id: AtomicU64,
}

impl MockVisibility {
    pub fn emit(&self, visibility: Visibility) {
        let callbacks: Vec<VisibilityCallback> = self
            .callbacks
            .lock()
            .unwrap()
            .iter()
            .map(|(_, callback)| Arc::clone(callback))
            .collect();
        for callback in callbacks {
            callback(visibility);
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.callbacks.lock().unwrap().len()
    }
}

impl VisibilitySignal for MockVisibility {
    fn subscribe(&self, callback: VisibilityCallback) -> SubscriptionId {
        let id = SubscriptionId::next(&self.next_id);
        self.callbacks.lock().unwrap().push((id, callback));
        id
    }

    fn unsubscribe(&self, id: SubscriptionId) {
        self.callbacks.lock().unwrap().retain(|(existing, _)| *existing != id);
    }
}
