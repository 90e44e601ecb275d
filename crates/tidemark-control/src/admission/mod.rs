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

//! Phased, budget-aware admission of heavyweight assets.
//!
//! Descriptors are partitioned into the four load phases and loaded
//! phase by phase. Within a phase they are loaded in chunks of
//! `max_concurrent_loads`: the loads of one chunk run in parallel, chunks run
//! one after the other. Before each load the usage ratio is checked against
//! the high-water mark; a descriptor that does not fit goes to the
//! [`AdmissionQueue`] and is redriven later by [`AdmissionLoader::drain_deferred`].

mod plan;
mod queue;

pub use plan::plan_phases;
pub use queue::AdmissionQueue;

use crate::gate::AdmissionGate;
use crate::instruments::Instruments;
use crate::registry::{lock_registry, InsertOutcome, SharedRegistry};
use crate::usage::UsageProbe;
use serde::Serialize;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tidemark_core::asset::{AssetDescriptor, LoadedAssetInfo};
use tidemark_core::host::AssetLoader;
use tokio::task::JoinHandle;

/// Outcome of one admission run.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LoadReport {
    /// Names admitted into the registry, in admission order.
    pub admitted: Vec<String>,
    /// Names pushed to the admission queue.
    pub deferred: Vec<String>,
    /// Names whose load failed, with the reason.
    pub failed: Vec<(String, String)>,
    /// Names skipped because they were already loaded or loading.
    pub duplicates: Vec<String>,
}

impl LoadReport {
    /// Whether anything was admitted, deferred or failed.
    pub fn is_empty(&self) -> bool {
        self.admitted.is_empty()
            && self.deferred.is_empty()
            && self.failed.is_empty()
            && self.duplicates.is_empty()
    }
}

/// Drives the asset loader collaborator under the memory budget.
#[derive(Clone)]
pub struct AdmissionLoader {
    loader: Arc<dyn AssetLoader>,
    registry: SharedRegistry,
    queue: Arc<Mutex<AdmissionQueue>>,
    gate: AdmissionGate,
    probe: UsageProbe,
    max_concurrent_loads: usize,
    chunk_yield: Duration,
    instruments: Instruments,
    last_report: Arc<Mutex<Option<LoadReport>>>,
}

impl AdmissionLoader {
    /// Creates a loader sharing `registry`, `queue` and `gate` with the monitor.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        loader: Arc<dyn AssetLoader>,
        registry: SharedRegistry,
        queue: Arc<Mutex<AdmissionQueue>>,
        gate: AdmissionGate,
        probe: UsageProbe,
        max_concurrent_loads: usize,
        chunk_yield: Duration,
        instruments: Instruments,
    ) -> Self {
        Self {
            loader,
            registry,
            queue,
            gate,
            probe,
            max_concurrent_loads: max_concurrent_loads.max(1),
            chunk_yield,
            instruments,
            last_report: Arc::new(Mutex::new(None)),
        }
    }

    /// Loads `descriptors` phase by phase and returns the admitted assets.
    ///
    /// If usage is above the high-water mark once a phase has completed, every
    /// later phase is deferred wholesale and this run stops.
    pub async fn load_all(&self, descriptors: Vec<AssetDescriptor>) -> Vec<LoadedAssetInfo> {
        let mut report = LoadReport::default();
        let mut admitted = Vec::new();
        let mut phases = plan_phases(descriptors).into_iter();
        let high_water = self.probe.budget().ratios.high_water_mark;

        while let Some((phase, batch)) = phases.next() {
            if batch.is_empty() {
                continue;
            }
            let total = batch.len();
            let mut pending = batch.into_iter().peekable();
            while pending.peek().is_some() {
                let chunk: Vec<AssetDescriptor> =
                    pending.by_ref().take(self.max_concurrent_loads).collect();
                admitted.extend(self.load_chunk(chunk, high_water, false, &mut report).await);
                self.yield_between_chunks().await;
            }
            log::info!(
                "Loader: phase {} complete ({} descriptors, {} loaded in total).",
                phase,
                total,
                lock_registry(&self.registry).len()
            );

            let ratio = self.probe.ratio();
            if ratio >= high_water {
                let remaining: Vec<AssetDescriptor> =
                    phases.by_ref().flat_map(|(_, batch)| batch).collect();
                if !remaining.is_empty() {
                    log::warn!(
                        "Loader: usage at {:.0}% after phase {}, deferring {} remaining descriptors.",
                        ratio * 100.0,
                        phase,
                        remaining.len()
                    );
                    for descriptor in remaining {
                        self.defer(descriptor, &mut report);
                    }
                }
                break;
            }
        }

        log::info!(
            "Loader: admitted {}, deferred {}, failed {}, duplicates {}.",
            report.admitted.len(),
            report.deferred.len(),
            report.failed.len(),
            report.duplicates.len()
        );
        *lock_report(&self.last_report) = Some(report);
        admitted
    }

    /// Redrives up to `max_concurrent_loads` deferred descriptors, oldest first.
    ///
    /// Does nothing while admission is paused or while usage is at or above
    /// the low-water mark.
    pub async fn drain_deferred(&self) -> LoadReport {
        let mut report = LoadReport::default();
        if lock_registry(&self.registry).is_closed() {
            return report;
        }
        if self.gate.is_paused() {
            log::debug!("Loader: admission paused, deferred queue left untouched.");
            return report;
        }
        let low_water = self.probe.budget().ratios.low_water_mark;
        if self.probe.ratio() >= low_water {
            return report;
        }

        let batch = lock_queue(&self.queue).pop_up_to(self.max_concurrent_loads);
        if batch.is_empty() {
            return report;
        }
        log::debug!("Loader: redriving {} deferred descriptors.", batch.len());
        self.load_chunk(batch, low_water, true, &mut report).await;
        report
    }

    /// The report of the last [`AdmissionLoader::load_all`] run.
    pub fn last_report(&self) -> Option<LoadReport> {
        lock_report(&self.last_report).clone()
    }

    /// Number of deferred descriptors.
    pub fn deferred_count(&self) -> usize {
        lock_queue(&self.queue).len()
    }

    /// Names of the deferred descriptors, oldest first.
    pub fn deferred_names(&self) -> Vec<String> {
        lock_queue(&self.queue).names()
    }

    /// Forgets every deferred descriptor.
    pub fn clear_deferred(&self) {
        lock_queue(&self.queue).clear();
    }

    /// Loads one chunk in parallel. `ceiling` is the usage ratio at or above
    /// which a descriptor is deferred instead of loaded.
    ///
    /// Each load runs as its own task and registers its asset itself, so
    /// dropping this future mid-chunk never loses a finished load. When
    /// `redrive` is set the chunk came from the admission queue: whatever
    /// does not get started goes back to the head of the queue in order.
    async fn load_chunk(
        &self,
        chunk: Vec<AssetDescriptor>,
        ceiling: f64,
        redrive: bool,
        report: &mut LoadReport,
    ) -> Vec<LoadedAssetInfo> {
        let runtime = tokio::runtime::Handle::try_current().ok();
        let mut pending = PendingChunk {
            queue: &self.queue,
            registry: &self.registry,
            remaining: chunk.into(),
            restore: redrive,
        };
        let mut started: Vec<(String, JoinHandle<Settled>)> = Vec::new();
        let mut admitted = Vec::new();

        while let Some(descriptor) = pending.next() {
            let name = descriptor.name().to_string();
            let claim = {
                let mut registry = lock_registry(&self.registry);
                if registry.is_closed() {
                    None
                } else {
                    Some(registry.reserve(&name))
                }
            };
            match claim {
                None => {
                    log::debug!("Loader: manager disposed, dropping '{}'.", name);
                    report.failed.push((name, DISPOSED.to_string()));
                    continue;
                }
                Some(false) => {
                    log::debug!("Loader: '{}' is already loaded or loading.", name);
                    report.duplicates.push(name);
                    continue;
                }
                Some(true) => {}
            }

            let ratio = self.probe.ratio();
            let paused = self.gate.is_paused();
            if paused || ratio >= ceiling {
                lock_registry(&self.registry).release(&name);
                log::debug!(
                    "Loader: deferring '{}' (usage {:.0}%, paused: {}).",
                    name,
                    ratio * 100.0,
                    paused
                );
                if redrive {
                    pending.put_back(descriptor);
                    break;
                }
                self.defer(descriptor, report);
                continue;
            }

            match &runtime {
                Some(runtime) => {
                    let task = runtime.spawn(self.clone().load_one(descriptor, redrive));
                    started.push((name, task));
                }
                None => {
                    let settled = self.clone().load_one(descriptor, redrive).await;
                    admitted.extend(report.record(settled));
                }
            }
        }
        report.deferred.extend(pending.restore_remaining());

        for (name, task) in started {
            let settled = task.await.unwrap_or_else(|join_error| {
                log::warn!("Loader: load task for '{}' ended abnormally: {}", name, join_error);
                self.instruments.failed();
                Settled::Failed(name, format!("load task aborted: {join_error}"))
            });
            admitted.extend(report.record(settled));
        }
        admitted
    }

    /// Loads one asset and registers it.
    ///
    /// The reservation taken by [`AdmissionLoader::load_chunk`] is held until
    /// the asset is registered. If this future is dropped before that, the
    /// reservation is released and, with `requeue`, the descriptor returns
    /// to the head of the queue.
    async fn load_one(self, descriptor: AssetDescriptor, requeue: bool) -> Settled {
        let name = descriptor.name().to_string();
        let mut reservation = Reservation {
            registry: Arc::clone(&self.registry),
            requeue: requeue.then(|| (Arc::clone(&self.queue), descriptor.clone())),
            name: name.clone(),
            armed: true,
        };

        let result = {
            let _timer = self.instruments.time_load();
            self.loader.load(&descriptor).await
        };
        let handle = match result {
            Ok(handle) => handle,
            Err(e) => {
                reservation.requeue = None;
                drop(reservation);
                log::warn!("Loader: failed to load '{}': {}", name, e);
                self.instruments.failed();
                return Settled::Failed(name, e.to_string());
            }
        };
        reservation.armed = false;

        let info = LoadedAssetInfo {
            name,
            tag: descriptor.tag().to_string(),
            phase: descriptor.phase(),
            priority: descriptor.priority(),
            position: handle.position(),
        };
        let outcome = lock_registry(&self.registry).insert(info.clone(), handle);
        match outcome {
            InsertOutcome::Admitted => {
                log::debug!("Loader: admitted '{}' ({}).", info.name, info.phase);
                self.instruments.admitted();
                Settled::Admitted(info)
            }
            InsertOutcome::Duplicate => Settled::Duplicate(info.name),
            InsertOutcome::Closed => {
                self.instruments.failed();
                Settled::Failed(info.name, DISPOSED.to_string())
            }
        }
    }

    fn defer(&self, descriptor: AssetDescriptor, report: &mut LoadReport) {
        let name = descriptor.name().to_string();
        if lock_registry(&self.registry).is_closed() {
            report.failed.push((name, DISPOSED.to_string()));
            return;
        }
        if lock_queue(&self.queue).push(descriptor) {
            self.instruments.deferred(1);
        }
        report.deferred.push(name);
    }

    async fn yield_between_chunks(&self) {
        if self.chunk_yield.is_zero() || tokio::runtime::Handle::try_current().is_err() {
            return;
        }
        tokio::time::sleep(self.chunk_yield).await;
    }
}

const DISPOSED: &str = "manager disposed";

/// How one load ended.
enum Settled {
    Admitted(LoadedAssetInfo),
    Duplicate(String),
    Failed(String, String),
}

impl LoadReport {
    fn record(&mut self, settled: Settled) -> Option<LoadedAssetInfo> {
        match settled {
            Settled::Admitted(info) => {
                self.admitted.push(info.name.clone());
                Some(info)
            }
            Settled::Duplicate(name) => {
                self.duplicates.push(name);
                None
            }
            Settled::Failed(name, reason) => {
                self.failed.push((name, reason));
                None
            }
        }
    }
}

/// In-flight claim on a name. Dropped while armed, it releases the claim
/// and puts the descriptor back at the head of the queue if asked to.
struct Reservation {
    registry: SharedRegistry,
    requeue: Option<(Arc<Mutex<AdmissionQueue>>, AssetDescriptor)>,
    name: String,
    armed: bool,
}

impl Drop for Reservation {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let closed = {
            let mut registry = lock_registry(&self.registry);
            registry.release(&self.name);
            registry.is_closed()
        };
        if let Some((queue, descriptor)) = self.requeue.take() {
            // A panicking load would be retried forever.
            if !closed && !std::thread::panicking() {
                log::debug!("Loader: load of '{}' cancelled, requeued.", self.name);
                lock_queue(&queue).push_front(descriptor);
            }
        }
    }
}

/// Descriptors of a chunk that have not been started yet.
struct PendingChunk<'a> {
    queue: &'a Mutex<AdmissionQueue>,
    registry: &'a SharedRegistry,
    remaining: VecDeque<AssetDescriptor>,
    restore: bool,
}

impl PendingChunk<'_> {
    fn next(&mut self) -> Option<AssetDescriptor> {
        self.remaining.pop_front()
    }

    fn put_back(&mut self, descriptor: AssetDescriptor) {
        self.remaining.push_front(descriptor);
    }

    /// Returns the unstarted descriptors to the head of the queue, keeping
    /// their order, and names them. Does nothing once the registry is closed.
    fn restore_remaining(&mut self) -> Vec<String> {
        if !self.restore || self.remaining.is_empty() {
            return Vec::new();
        }
        if lock_registry(self.registry).is_closed() {
            self.remaining.clear();
            return Vec::new();
        }
        let mut names = Vec::with_capacity(self.remaining.len());
        let mut queue = lock_queue(self.queue);
        while let Some(descriptor) = self.remaining.pop_back() {
            names.push(descriptor.name().to_string());
            queue.push_front(descriptor);
        }
        names.reverse();
        names
    }
}

impl Drop for PendingChunk<'_> {
    fn drop(&mut self) {
        self.restore_remaining();
    }
}

fn lock_queue(queue: &Mutex<AdmissionQueue>) -> MutexGuard<'_, AdmissionQueue> {
    queue.lock().unwrap_or_else(|poisoned| {
        log::error!("Loader: admission queue lock was poisoned, recovering.");
        poisoned.into_inner()
    })
}

fn lock_report(report: &Mutex<Option<LoadReport>>) -> MutexGuard<'_, Option<LoadReport>> {
    report.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
}
