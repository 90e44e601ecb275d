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

//! Render-resolution hints on foreground/background transitions.

use std::sync::Arc;
use tidemark_core::budget::DeviceTier;
use tidemark_core::host::{RendererHints, Visibility};

/// Lowers the renderer's pixel density while the host is hidden and restores
/// the tier's density when it comes back.
#[derive(Clone)]
pub struct VisibilityHints {
    renderer: Option<Arc<dyn RendererHints>>,
    foreground_density: f32,
    background_density: f32,
}

impl VisibilityHints {
    /// Creates hints for a device of the given tier.
    pub fn new(
        renderer: Option<Arc<dyn RendererHints>>,
        tier: DeviceTier,
        background_density: f32,
    ) -> Self {
        Self {
            renderer,
            foreground_density: Self::foreground_density_for(tier),
            background_density,
        }
    }

    /// The pixel density used in the foreground on a given tier.
    pub fn foreground_density_for(tier: DeviceTier) -> f32 {
        match tier {
            DeviceTier::LowMemory => 1.0,
            DeviceTier::Mobile => 1.5,
            DeviceTier::Desktop => 2.0,
        }
    }

    /// Applies the density for `visibility`. Returns the density set, or
    /// `None` if the renderer cannot take the hint.
    pub fn apply(&self, visibility: Visibility) -> Option<f32> {
        let renderer = self.renderer.as_ref()?;
        if !renderer.capabilities().pixel_density {
            return None;
        }
        let density = match visibility {
            Visibility::Foreground => self.foreground_density,
            Visibility::Background => self.background_density,
        };
        renderer.set_pixel_density(density);
        log::info!("Monitor: host moved to {:?}, pixel density {}.", visibility, density);
        Some(density)
    }
}
