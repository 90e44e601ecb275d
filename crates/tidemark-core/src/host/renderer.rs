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

//! The rendering collaborator.

/// The optional operations a [`RendererHints`] implementation supports.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RendererCapabilities {
    /// `set_pixel_density` is meaningful.
    pub pixel_density: bool,
    /// `clear_caches` is meaningful.
    pub clear_caches: bool,
    /// `clear_non_essential_assets` is meaningful.
    pub clear_non_essential_assets: bool,
}

impl RendererCapabilities {
    /// Every operation supported.
    pub const ALL: Self = Self {
        pixel_density: true,
        clear_caches: true,
        clear_non_essential_assets: true,
    };
}

/// Degradation hints the manager sends to the renderer.
///
/// All operations default to no-ops; implementors override the ones they
/// support and advertise them in [`RendererHints::capabilities`].
pub trait RendererHints: Send + Sync {
    /// Which of the operations below are supported.
    fn capabilities(&self) -> RendererCapabilities;

    /// Sets the render resolution scale relative to the native pixel ratio.
    fn set_pixel_density(&self, _ratio: f32) {}

    /// Drops renderer-side caches (shader programs, render targets, ...).
    fn clear_caches(&self) {}

    /// Drops any asset the renderer itself considers non-essential.
    fn clear_non_essential_assets(&self) {}
}
