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

//! The resource manager service.
//!
//! [`ResourceManager`] owns the shared registry, the admission loader, the
//! budget monitor, the emergency cascade and the growth watcher, and runs two
//! periodic loops on the Tokio runtime:
//!
//! - the fast loop ticks the watcher, samples usage, flips the admission gate
//!   and evicts or escalates under pressure;
//! - the slow loop redrives deferred descriptors and occasionally evicts even
//!   without pressure.

use crate::admission::{AdmissionLoader, AdmissionQueue, LoadReport};
use crate::analysis::{analyze, AnalysisInput, AnalysisReport};
use crate::config::ManagerConfig;
use crate::gate::AdmissionGate;
use crate::instruments::Instruments;
use crate::metrics::UsageHistory;
use crate::monitor::{BudgetMonitor, EmergencyCascade, EvictionPolicy, PressureDecision, VisibilityHints};
use crate::registry::{lock_registry, AssetRegistry, SharedRegistry};
use crate::usage::{UsageProbe, UsageSample};
use crate::watcher::{GrowthSample, GrowthWatcher};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use tidemark_core::asset::{AssetDescriptor, LoadedAssetInfo};
use tidemark_core::budget::{CapabilityProfile, MemoryBudget};
use tidemark_core::clock::{Clock, SystemClock};
use tidemark_core::event::{EventBus, GrowthEvent};
use tidemark_core::host::{
    AssetLoader, CollectionDirectory, HeapMetrics, HostSignals, PhysicsControl, RendererHints,
    SceneDetail, SubscriptionId, ViewerProvider, Visibility, VisibilitySignal,
};
use tidemark_telemetry::MetricsRegistry;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

/// Source of uniform samples in `[0, 1)` for the opportunistic eviction.
pub type RandomSource = Box<dyn Fn() -> f64 + Send + Sync>;

/// The host collaborators. Only the asset loader is mandatory.
#[derive(Clone)]
pub struct Collaborators {
    loader: Arc<dyn AssetLoader>,
    renderer: Option<Arc<dyn RendererHints>>,
    scene: Option<Arc<dyn SceneDetail>>,
    physics: Option<Arc<dyn PhysicsControl>>,
    viewer: Option<Arc<dyn ViewerProvider>>,
    heap: Option<Arc<dyn HeapMetrics>>,
    visibility: Option<Arc<dyn VisibilitySignal>>,
    collections: Option<Arc<dyn CollectionDirectory>>,
}

impl Collaborators {
    /// Starts from the asset loader alone.
    pub fn new(loader: Arc<dyn AssetLoader>) -> Self {
        Self {
            loader,
            renderer: None,
            scene: None,
            physics: None,
            viewer: None,
            heap: None,
            visibility: None,
            collections: None,
        }
    }

    /// Adds the renderer.
    pub fn with_renderer(mut self, renderer: Arc<dyn RendererHints>) -> Self {
        self.renderer = Some(renderer);
        self
    }

    /// Adds the background scene.
    pub fn with_scene(mut self, scene: Arc<dyn SceneDetail>) -> Self {
        self.scene = Some(scene);
        self
    }

    /// Adds the physics world.
    pub fn with_physics(mut self, physics: Arc<dyn PhysicsControl>) -> Self {
        self.physics = Some(physics);
        self
    }

    /// Adds the viewer provider used for eviction.
    pub fn with_viewer(mut self, viewer: Arc<dyn ViewerProvider>) -> Self {
        self.viewer = Some(viewer);
        self
    }

    /// Adds host heap metrics.
    pub fn with_heap_metrics(mut self, heap: Arc<dyn HeapMetrics>) -> Self {
        self.heap = Some(heap);
        self
    }

    /// Adds the visibility signal.
    pub fn with_visibility(mut self, visibility: Arc<dyn VisibilitySignal>) -> Self {
        self.visibility = Some(visibility);
        self
    }

    /// Adds the directory of watchable collections.
    pub fn with_collections(mut self, collections: Arc<dyn CollectionDirectory>) -> Self {
        self.collections = Some(collections);
        self
    }
}

/// Builds a [`ResourceManager`].
pub struct ResourceManagerBuilder {
    collaborators: Collaborators,
    config: ManagerConfig,
    signals: HostSignals,
    profile: Option<CapabilityProfile>,
    clock: Option<Arc<dyn Clock>>,
    metrics: Option<MetricsRegistry>,
    random: Option<RandomSource>,
}

impl ResourceManagerBuilder {
    /// Replaces the default config. It is validated on build.
    pub fn config(mut self, config: ManagerConfig) -> Self {
        self.config = config;
        self
    }

    /// Host signals the profiler classifies the device from.
    pub fn host_signals(mut self, signals: HostSignals) -> Self {
        self.signals = signals;
        self
    }

    /// Skips the profiler and uses `profile` as is.
    pub fn profile(mut self, profile: CapabilityProfile) -> Self {
        self.profile = Some(profile);
        self
    }

    /// Time source for debouncing and the physics cool-down.
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Registry the manager records its metrics into.
    pub fn metrics(mut self, metrics: MetricsRegistry) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Replaces the random source of the opportunistic eviction.
    pub fn random_source(mut self, random: impl Fn() -> f64 + Send + Sync + 'static) -> Self {
        self.random = Some(Box::new(random));
        self
    }

    /// Profiles the device and assembles the manager. Does not start the loops.
    pub fn build(self) -> ResourceManager {
        let config = self.config.validate();
        let profile = self
            .profile
            .unwrap_or_else(|| crate::profiler::profile(&self.signals));
        let budget = MemoryBudget::new(profile.memory_budget, config.ratios);
        let clock = self.clock.unwrap_or_else(|| Arc::new(SystemClock::new()));
        let metrics = self.metrics.unwrap_or_default();
        let instruments = Instruments::register(&metrics);
        let collaborators = self.collaborators;

        let registry = AssetRegistry::shared();
        let gate = AdmissionGate::new();
        let probe = UsageProbe::new(
            collaborators.heap.clone(),
            Arc::clone(&registry),
            budget,
            config.estimated_bytes_per_asset,
        );
        let admission = AdmissionLoader::new(
            Arc::clone(&collaborators.loader),
            Arc::clone(&registry),
            Arc::new(Mutex::new(AdmissionQueue::new())),
            gate.clone(),
            probe.clone(),
            profile.max_concurrent_loads,
            config.chunk_yield(),
            instruments.clone(),
        );
        let cascade = EmergencyCascade::new(
            collaborators.renderer.clone(),
            collaborators.scene.clone(),
            collaborators.physics.clone(),
            config.physics_cooldown(),
            Arc::clone(&clock),
        );
        let hints = VisibilityHints::new(
            collaborators.renderer.clone(),
            profile.tier,
            config.background_pixel_density,
        );
        let growth_events = Arc::new(EventBus::bounded(config.growth_event_buffer));
        let mut watcher = GrowthWatcher::new(
            collaborators.collections.clone(),
            Arc::clone(&clock),
            config.watcher_debounce(),
            config.growth_threshold,
            Arc::clone(&growth_events),
        );
        watcher.install(&config.watched_collections);

        let shared = Shared {
            monitor: Mutex::new(BudgetMonitor::new(config.ratios, gate.clone())),
            eviction: EvictionPolicy::new(config.eviction_distance),
            history: Mutex::new(UsageHistory::default()),
            watcher: Mutex::new(watcher),
            visibility_subscription: Mutex::new(None),
            random: self.random.unwrap_or_else(|| Box::new(rand::random::<f64>)),
            running: AtomicBool::new(false),
            config,
            profile,
            budget,
            registry,
            gate,
            probe,
            admission,
            cascade,
            hints,
            growth_events,
            viewer: collaborators.viewer,
            visibility: collaborators.visibility,
            instruments,
            metrics,
        };
        log::info!(
            "ResourceManager: ready ({} tier, {} bytes budget, {} concurrent loads).",
            profile.tier,
            budget.bytes,
            profile.max_concurrent_loads
        );
        let shared = Arc::new(shared);

        if let Some(signal) = &shared.visibility {
            let weak: Weak<Shared> = Arc::downgrade(&shared);
            let id = signal.subscribe(Arc::new(move |visibility: Visibility| {
                if let Some(shared) = weak.upgrade() {
                    shared.on_visibility(visibility);
                }
            }));
            *lock(&shared.visibility_subscription) = Some(id);
        }

        ResourceManager {
            shared,
            loops: Mutex::new(Vec::new()),
        }
    }
}

/// What one slow policy sweep did.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SweepReport {
    /// Outcome of redriving the admission queue.
    pub redriven: LoadReport,
    /// Whether the opportunistic eviction pass ran.
    pub proactive_eviction: bool,
    /// Assets evicted by that pass.
    pub evicted: Vec<String>,
}

struct Shared {
    config: ManagerConfig,
    profile: CapabilityProfile,
    budget: MemoryBudget,
    registry: SharedRegistry,
    gate: AdmissionGate,
    probe: UsageProbe,
    admission: AdmissionLoader,
    monitor: Mutex<BudgetMonitor>,
    history: Mutex<UsageHistory>,
    eviction: EvictionPolicy,
    cascade: EmergencyCascade,
    hints: VisibilityHints,
    watcher: Mutex<GrowthWatcher>,
    growth_events: Arc<EventBus<GrowthEvent>>,
    viewer: Option<Arc<dyn ViewerProvider>>,
    visibility: Option<Arc<dyn VisibilitySignal>>,
    visibility_subscription: Mutex<Option<SubscriptionId>>,
    instruments: Instruments,
    metrics: MetricsRegistry,
    random: RandomSource,
    running: AtomicBool,
}

impl Shared {
    fn sample(&self) -> PressureDecision {
        lock(&self.watcher).tick();
        let events = self.growth_events.drain();
        if !events.is_empty() {
            for _ in &events {
                self.instruments.growth_event();
            }
            lock(&self.monitor).note_growth();
        }

        let usage = self.probe.sample();
        self.instruments.usage_ratio(usage.ratio);
        lock(&self.history).push(usage.ratio);
        let decision = lock(&self.monitor).assess(usage.ratio);
        log::debug!("Monitor: {:?}", decision);

        if decision.evict {
            self.evict_unused();
        }
        if decision.emergency {
            self.cascade.run();
            self.instruments.emergency();
        }
        self.cascade.tick();
        decision
    }

    async fn sweep(&self) -> SweepReport {
        let redriven = self.admission.drain_deferred().await;
        let proactive_eviction = (self.random)() < self.config.proactive_eviction_chance;
        let evicted = if proactive_eviction {
            log::debug!("Monitor: opportunistic eviction pass.");
            self.evict_unused()
        } else {
            Vec::new()
        };
        SweepReport {
            redriven,
            proactive_eviction,
            evicted,
        }
    }

    fn on_visibility(&self, visibility: Visibility) -> Option<f32> {
        if visibility == Visibility::Background {
            self.evict_unused();
        }
        self.hints.apply(visibility)
    }

    fn evict_unused(&self) -> Vec<String> {
        let viewpoint = self.viewer.as_ref().and_then(|viewer| viewer.viewpoint());
        let evicted = self
            .eviction
            .evict(&mut lock_registry(&self.registry), viewpoint.as_ref());
        if !evicted.is_empty() {
            self.instruments.evicted(evicted.len());
            log::info!("Monitor: evicted {} assets: {:?}", evicted.len(), evicted);
        }
        evicted
    }
}

/// Adaptive memory budget and lifecycle manager for heavyweight assets.
pub struct ResourceManager {
    shared: Arc<Shared>,
    loops: Mutex<Vec<JoinHandle<()>>>,
}

impl ResourceManager {
    /// Starts building a manager around `collaborators`.
    pub fn builder(collaborators: Collaborators) -> ResourceManagerBuilder {
        ResourceManagerBuilder {
            collaborators,
            config: ManagerConfig::default(),
            signals: HostSignals::default(),
            profile: None,
            clock: None,
            metrics: None,
            random: None,
        }
    }

    /// The device profile the budget was derived from.
    pub fn profile(&self) -> CapabilityProfile {
        self.shared.profile
    }

    /// The budget and its marks.
    pub fn budget(&self) -> MemoryBudget {
        self.shared.budget
    }

    /// The validated config in use.
    pub fn config(&self) -> &ManagerConfig {
        &self.shared.config
    }

    /// The metrics registry the manager records into.
    pub fn metrics(&self) -> &MetricsRegistry {
        &self.shared.metrics
    }

    /// Loads `descriptors` phase by phase under the budget.
    ///
    /// Returns the assets admitted by this call. Descriptors that did not fit
    /// are deferred and redriven by the slow sweep.
    pub async fn load_assets_with_budget(
        &self,
        descriptors: Vec<AssetDescriptor>,
    ) -> Vec<LoadedAssetInfo> {
        self.shared.admission.load_all(descriptors).await
    }

    /// The report of the last [`ResourceManager::load_assets_with_budget`] call.
    pub fn last_load_report(&self) -> Option<LoadReport> {
        self.shared.admission.last_report()
    }

    /// Redrives deferred descriptors once, outside the slow loop.
    pub async fn drain_deferred(&self) -> LoadReport {
        self.shared.admission.drain_deferred().await
    }

    /// Runs one fast-loop iteration now.
    pub fn sample_now(&self) -> PressureDecision {
        self.shared.sample()
    }

    /// Runs one slow-loop iteration now.
    pub async fn sweep_now(&self) -> SweepReport {
        self.shared.sweep().await
    }

    /// Starts the fast sampler and the slow sweep on the current Tokio runtime.
    ///
    /// Returns `false` if the loops are already running or no runtime is
    /// available.
    pub fn start_monitoring(&self) -> bool {
        if self.shared.running.swap(true, Ordering::SeqCst) {
            return false;
        }
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            log::warn!("ResourceManager: no Tokio runtime, monitoring not started.");
            self.shared.running.store(false, Ordering::SeqCst);
            return false;
        };

        let fast = {
            let shared = Arc::clone(&self.shared);
            let period = shared.config.fast_sample_interval();
            runtime.spawn(async move {
                let mut interval = tokio::time::interval(period);
                interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
                loop {
                    interval.tick().await;
                    if !shared.running.load(Ordering::Relaxed) {
                        break;
                    }
                    shared.sample();
                }
            })
        };
        let slow = {
            let shared = Arc::clone(&self.shared);
            let period = shared.config.policy_sweep_interval();
            runtime.spawn(async move {
                let mut interval = tokio::time::interval(period);
                interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
                // The first tick completes immediately; the first sweep waits a period.
                interval.tick().await;
                loop {
                    interval.tick().await;
                    if !shared.running.load(Ordering::Relaxed) {
                        break;
                    }
                    shared.sweep().await;
                }
            })
        };

        lock(&self.loops).extend([fast, slow]);
        log::info!(
            "ResourceManager: monitoring started (sample every {:?}, sweep every {:?}).",
            self.shared.config.fast_sample_interval(),
            self.shared.config.policy_sweep_interval()
        );
        true
    }

    /// Stops both loops. Returns `false` if they were not running.
    pub fn stop_monitoring(&self) -> bool {
        if !self.shared.running.swap(false, Ordering::SeqCst) {
            return false;
        }
        for handle in lock(&self.loops).drain(..) {
            handle.abort();
        }
        log::info!("ResourceManager: monitoring stopped.");
        true
    }

    /// Whether the loops are running.
    pub fn is_monitoring(&self) -> bool {
        self.shared.running.load(Ordering::SeqCst)
    }

    /// Whether admission is currently paused.
    pub fn is_admission_paused(&self) -> bool {
        self.shared.gate.is_paused()
    }

    /// Number of deferred descriptors.
    pub fn deferred_count(&self) -> usize {
        self.shared.admission.deferred_count()
    }

    /// Deferred names, oldest first.
    pub fn deferred_names(&self) -> Vec<String> {
        self.shared.admission.deferred_names()
    }

    /// Snapshots of the loaded assets, sorted by name.
    pub fn loaded_assets(&self) -> Vec<LoadedAssetInfo> {
        lock_registry(&self.shared.registry).infos()
    }

    /// Number of loaded assets.
    pub fn loaded_count(&self) -> usize {
        lock_registry(&self.shared.registry).len()
    }

    /// A fresh usage measurement.
    pub fn usage(&self) -> UsageSample {
        self.shared.probe.sample()
    }

    /// Runs the eviction policy now. Returns the evicted names.
    pub fn evict_unused(&self) -> Vec<String> {
        self.shared.evict_unused()
    }

    /// Evicts one asset by name. Returns `false` if it was not loaded.
    pub fn unload(&self, name: &str) -> bool {
        let unloaded = lock_registry(&self.shared.registry).unload(name);
        if unloaded {
            self.shared.instruments.evicted(1);
            log::debug!("ResourceManager: unloaded '{}'.", name);
        }
        unloaded
    }

    /// Instruments more collaborator collections for growth detection.
    pub fn install_watchers<S: AsRef<str>>(&self, names: &[S]) -> usize {
        lock(&self.shared.watcher).install(names)
    }

    /// State of the watched collections.
    pub fn growth_samples(&self) -> Vec<GrowthSample> {
        lock(&self.shared.watcher).samples()
    }

    /// Reacts to a visibility transition as if the host had signalled it.
    ///
    /// Going to the background evicts unused assets and lowers the pixel
    /// density; coming back restores the tier's density. Returns the density
    /// applied, if the renderer supports it.
    pub fn on_visibility_change(&self, visibility: Visibility) -> Option<f32> {
        self.shared.on_visibility(visibility)
    }

    /// Whether physics is currently paused by the emergency cascade.
    pub fn owns_physics_pause(&self) -> bool {
        self.shared.cascade.owns_physics_pause()
    }

    /// Takes a diagnostic snapshot and logs it.
    pub fn force_analysis(&self) -> AnalysisReport {
        let shared = &self.shared;
        let usage = shared.probe.sample();
        let history = lock(&shared.history).clone();
        let loaded_per_phase = lock_registry(&shared.registry).phase_counts();

        let report = analyze(AnalysisInput {
            profile: shared.profile,
            budget: shared.budget,
            usage,
            history: &history,
            admission_paused: shared.gate.is_paused(),
            loaded_per_phase,
            deferred: shared.admission.deferred_count(),
            growth: lock(&shared.watcher).samples(),
            physics_paused_by_manager: shared.cascade.owns_physics_pause(),
            metrics: shared.metrics.snapshot_json(),
        });

        log::info!(
            "ResourceManager: analysis: {} loaded, {} deferred, usage {:.1}% ({:?}), paused: {}.",
            report.loaded,
            report.deferred,
            report.usage_ratio * 100.0,
            report.usage_source,
            report.admission_paused
        );
        for alert in &report.alerts {
            log::warn!("ResourceManager: {}", alert);
        }
        report
    }

    /// Stops the loops and releases everything the manager holds.
    ///
    /// Unsubscribes from the visibility signal and watched collections,
    /// resumes physics if the cascade paused it, disposes every loaded asset
    /// and forgets deferred descriptors. Loads still running when this is
    /// called are disposed as soon as they finish. Safe to call more than once.
    pub fn dispose(&self) {
        let shared = &self.shared;
        self.stop_monitoring();

        if let Some(id) = lock(&shared.visibility_subscription).take() {
            if let Some(signal) = &shared.visibility {
                signal.unsubscribe(id);
            }
        }
        lock(&shared.watcher).detach_all();
        shared.cascade.release();
        let disposed = lock_registry(&shared.registry).close();
        shared.admission.clear_deferred();
        log::info!("ResourceManager: disposed ({} assets released).", disposed);
    }
}

impl Drop for ResourceManager {
    fn drop(&mut self) {
        self.stop_monitoring();
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| {
        log::error!("ResourceManager: lock poisoned, recovering.");
        poisoned.into_inner()
    })
}
