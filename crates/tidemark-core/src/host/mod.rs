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

//! Interfaces of the host-side collaborators.
//!
//! The resource manager never owns the renderer, the scene, the physics world
//! or the asset decoding pipeline. It talks to them only through the narrow
//! traits in this module, which the host implements (or mocks, in tests).
//!
//! Optional operations are advertised through capability structs: the manager
//! checks them before calling and silently skips anything unsupported.

pub mod collection;
pub mod device;
pub mod heap;
pub mod loader;
pub mod physics;
pub mod renderer;
pub mod scene;
pub mod viewer;
pub mod visibility;

pub use self::collection::{
    CollectionDirectory, MutationKind, MutationObserver, StaticDirectory, TrackedCollection,
    WatchedCollection,
};
pub use self::device::{DeviceSignals, HostSignals};
pub use self::heap::{HeapMetrics, HeapSample};
pub use self::loader::AssetLoader;
pub use self::physics::PhysicsControl;
pub use self::renderer::{RendererCapabilities, RendererHints};
pub use self::scene::{SceneCapabilities, SceneDetail};
pub use self::viewer::{ViewerProvider, Viewpoint};
pub use self::visibility::{Visibility, VisibilityCallback, VisibilitySignal};

use std::sync::atomic::{AtomicU64, Ordering};

/// Identifies one observer registration on a collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(pub u64);

impl SubscriptionId {
    /// Allocates the next identifier from `counter`.
    pub fn next(counter: &AtomicU64) -> Self {
        Self(counter.fetch_add(1, Ordering::Relaxed))
    }
}
