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

//! The emergency cleanup cascade run at the escalation mark.

use serde::Serialize;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tidemark_core::clock::Clock;
use tidemark_core::host::{PhysicsControl, RendererHints, SceneDetail};

/// Which steps one cascade run actually performed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CascadeReport {
    /// The renderer dropped its caches.
    pub cleared_caches: bool,
    /// The renderer dropped its non-essential assets.
    pub cleared_non_essential: bool,
    /// The scene switched to coarser detail.
    pub reduced_level_of_detail: bool,
    /// The scene dropped transient effects.
    pub cleared_transient_effects: bool,
    /// Physics was paused by this run.
    pub paused_physics: bool,
}

/// Degrades the renderer, the scene and physics, in that order.
///
/// Unsupported collaborator operations are skipped. Physics is paused only if
/// it was running, and only the pause this cascade made is undone when the
/// cool-down expires: the cascade holds a single ownership flag, not a count.
pub struct EmergencyCascade {
    renderer: Option<Arc<dyn RendererHints>>,
    scene: Option<Arc<dyn SceneDetail>>,
    physics: Option<Arc<dyn PhysicsControl>>,
    cooldown: Duration,
    clock: Arc<dyn Clock>,
    /// When we paused physics, the instant it must be resumed.
    physics_resume_at: Mutex<Option<Duration>>,
}

impl EmergencyCascade {
    /// Creates a cascade over whichever collaborators are present.
    pub fn new(
        renderer: Option<Arc<dyn RendererHints>>,
        scene: Option<Arc<dyn SceneDetail>>,
        physics: Option<Arc<dyn PhysicsControl>>,
        cooldown: Duration,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            renderer,
            scene,
            physics,
            cooldown,
            clock,
            physics_resume_at: Mutex::new(None),
        }
    }

    /// Runs every supported step once.
    pub fn run(&self) -> CascadeReport {
        let mut report = CascadeReport::default();

        if let Some(renderer) = &self.renderer {
            let caps = renderer.capabilities();
            if caps.clear_caches {
                renderer.clear_caches();
                report.cleared_caches = true;
            }
            if caps.clear_non_essential_assets {
                renderer.clear_non_essential_assets();
                report.cleared_non_essential = true;
            }
        }

        if let Some(scene) = &self.scene {
            let caps = scene.capabilities();
            if caps.reduce_level_of_detail {
                scene.reduce_level_of_detail();
                report.reduced_level_of_detail = true;
            }
            if caps.clear_transient_effects {
                scene.clear_transient_effects();
                report.cleared_transient_effects = true;
            }
        }

        if let Some(physics) = &self.physics {
            let mut resume_at = self.resume_slot();
            if resume_at.is_none() && !physics.is_paused() {
                physics.pause();
                *resume_at = Some(self.clock.now() + self.cooldown);
                report.paused_physics = true;
            }
        }

        log::warn!("Monitor: emergency cleanup cascade ran: {:?}", report);
        report
    }

    /// Resumes physics once the cool-down has expired, if we paused it.
    ///
    /// Returns `true` if physics was resumed.
    pub fn tick(&self) -> bool {
        let Some(physics) = &self.physics else {
            return false;
        };
        let mut resume_at = self.resume_slot();
        match *resume_at {
            Some(deadline) if self.clock.now() >= deadline => {
                *resume_at = None;
                Self::resume_if_paused(physics.as_ref())
            }
            _ => false,
        }
    }

    /// Resumes physics right away if we paused it.
    pub fn release(&self) -> bool {
        let Some(physics) = &self.physics else {
            return false;
        };
        if self.resume_slot().take().is_some() {
            return Self::resume_if_paused(physics.as_ref());
        }
        false
    }

    /// Whether the current physics pause is ours.
    pub fn owns_physics_pause(&self) -> bool {
        self.resume_slot().is_some()
    }

    fn resume_if_paused(physics: &dyn PhysicsControl) -> bool {
        if physics.is_paused() {
            physics.resume();
            log::info!("Monitor: physics cool-down over, resuming physics.");
            true
        } else {
            false
        }
    }

    fn resume_slot(&self) -> MutexGuard<'_, Option<Duration>> {
        self.physics_resume_at
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl std::fmt::Debug for EmergencyCascade {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmergencyCascade")
            .field("renderer", &self.renderer.is_some())
            .field("scene", &self.scene.is_some())
            .field("physics", &self.physics.is_some())
            .field("cooldown", &self.cooldown)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use tidemark_core::clock::ManualClock;
    use tidemark_core::host::{RendererCapabilities, SceneCapabilities};

    #[derive(Default)]
    struct Physics {
        paused: AtomicBool,
        pauses: AtomicUsize,
        resumes: AtomicUsize,
    }

    impl PhysicsControl for Physics {
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

    #[derive(Default)]
    struct Renderer {
        cleared: AtomicUsize,
    }

    impl RendererHints for Renderer {
        fn capabilities(&self) -> RendererCapabilities {
            RendererCapabilities {
                clear_caches: true,
                ..Default::default()
            }
        }
        fn clear_caches(&self) {
            self.cleared.fetch_add(1, Ordering::SeqCst);
        }
    }

    struct Scene;

    impl SceneDetail for Scene {
        fn capabilities(&self) -> SceneCapabilities {
            SceneCapabilities::ALL
        }
    }

    fn cascade(physics: &Arc<Physics>, clock: &ManualClock) -> EmergencyCascade {
        EmergencyCascade::new(
            Some(Arc::new(Renderer::default())),
            Some(Arc::new(Scene)),
            Some(Arc::clone(physics) as Arc<dyn PhysicsControl>),
            Duration::from_secs(5),
            Arc::new(clock.clone()),
        )
    }

    #[test]
    fn skips_unsupported_steps() {
        let physics = Arc::new(Physics::default());
        let report = cascade(&physics, &ManualClock::new()).run();

        assert!(report.cleared_caches);
        assert!(!report.cleared_non_essential);
        assert!(report.reduced_level_of_detail);
        assert!(report.cleared_transient_effects);
        assert!(report.paused_physics);
    }

    #[test]
    fn resumes_own_pause_after_cooldown() {
        let physics = Arc::new(Physics::default());
        let clock = ManualClock::new();
        let cascade = cascade(&physics, &clock);

        cascade.run();
        cascade.run();
        assert_eq!(physics.pauses.load(Ordering::SeqCst), 1);
        assert!(cascade.owns_physics_pause());

        clock.advance(Duration::from_secs(4));
        assert!(!cascade.tick());
        assert!(physics.is_paused());

        clock.advance(Duration::from_secs(1));
        assert!(cascade.tick());
        assert!(!physics.is_paused());
        assert!(!cascade.owns_physics_pause());
    }

    #[test]
    fn never_touches_a_pause_it_did_not_make() {
        let physics = Arc::new(Physics::default());
        physics.pause();
        let clock = ManualClock::new();
        let cascade = cascade(&physics, &clock);

        assert!(!cascade.run().paused_physics);
        clock.advance(Duration::from_secs(10));
        assert!(!cascade.tick());
        assert!(!cascade.release());
        assert!(physics.is_paused());
        assert_eq!(physics.resumes.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn release_resumes_immediately() {
        let physics = Arc::new(Physics::default());
        let cascade = cascade(&physics, &ManualClock::new());
        cascade.run();
        assert!(cascade.release());
        assert!(!physics.is_paused());
    }
}
