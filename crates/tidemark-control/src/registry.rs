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

//! The set of admitted assets and their host handles.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};
use tidemark_core::asset::{AssetHandle, LoadPhase, LoadedAssetInfo};

/// An admitted asset: its snapshot plus the owned host handle.
pub struct LoadedAsset {
    /// Name, tag, phase, priority and position at admission.
    pub info: LoadedAssetInfo,
    /// The host handle, disposed when the asset leaves the registry.
    pub handle: Box<dyn AssetHandle>,
}

impl std::fmt::Debug for LoadedAsset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoadedAsset")
            .field("info", &self.info)
            .finish_non_exhaustive()
    }
}

/// What [`AssetRegistry::insert`] did with a finished load.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    /// The asset is now registered.
    Admitted,
    /// The name was already registered; the newcomer was disposed.
    Duplicate,
    /// The registry is closed; the newcomer was disposed.
    Closed,
}

/// Every loaded asset, keyed by name, plus the names currently being loaded.
///
/// Removal and disposal always happen inside the same `&mut self` call, so
/// no observer holding the lock can see a disposed asset still registered.
#[derive(Debug, Default)]
pub struct AssetRegistry {
    assets: HashMap<String, LoadedAsset>,
    in_flight: HashSet<String>,
    closed: bool,
}

/// The registry as shared between the loader, the monitor and the sweeps.
pub type SharedRegistry = Arc<Mutex<AssetRegistry>>;

/// Locks the shared registry, recovering the data if a holder panicked.
pub fn lock_registry(registry: &SharedRegistry) -> MutexGuard<'_, AssetRegistry> {
    registry.lock().unwrap_or_else(|poisoned| {
        log::error!("ResourceManager: asset registry lock was poisoned, recovering.");
        poisoned.into_inner()
    })
}

impl AssetRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Wraps a new registry for sharing.
    pub fn shared() -> SharedRegistry {
        Arc::new(Mutex::new(Self::new()))
    }

    /// Claims `name` for loading. Fails if it is loaded or already in flight.
    pub fn reserve(&mut self, name: &str) -> bool {
        if self.assets.contains_key(name) || self.in_flight.contains(name) {
            return false;
        }
        self.in_flight.insert(name.to_string());
        true
    }

    /// Drops a reservation without admitting anything.
    pub fn release(&mut self, name: &str) {
        self.in_flight.remove(name);
    }

    /// Admits a loaded asset, clearing its reservation.
    ///
    /// If the name is already registered, or the registry has been closed,
    /// the new handle is disposed instead.
    pub fn insert(
        &mut self,
        info: LoadedAssetInfo,
        mut handle: Box<dyn AssetHandle>,
    ) -> InsertOutcome {
        self.in_flight.remove(&info.name);
        if self.closed {
            log::debug!(
                "ResourceManager: '{}' finished loading after shutdown, disposing it.",
                info.name
            );
            handle.dispose();
            return InsertOutcome::Closed;
        }
        if self.assets.contains_key(&info.name) {
            log::warn!(
                "ResourceManager: '{}' is already loaded, disposing the duplicate.",
                info.name
            );
            handle.dispose();
            return InsertOutcome::Duplicate;
        }
        self.assets
            .insert(info.name.clone(), LoadedAsset { info, handle });
        InsertOutcome::Admitted
    }

    /// Whether `name` is loaded.
    pub fn contains(&self, name: &str) -> bool {
        self.assets.contains_key(name)
    }

    /// Whether `name` is loaded or being loaded.
    pub fn is_known(&self, name: &str) -> bool {
        self.contains(name) || self.in_flight.contains(name)
    }

    /// Number of loaded assets.
    pub fn len(&self) -> usize {
        self.assets.len()
    }

    /// Whether nothing is loaded.
    pub fn is_empty(&self) -> bool {
        self.assets.is_empty()
    }

    /// Number of loads currently in flight.
    pub fn in_flight_count(&self) -> usize {
        self.in_flight.len()
    }

    /// The loaded names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.assets.keys().cloned().collect();
        names.sort();
        names
    }

    /// Snapshots of every loaded asset, with positions refreshed from the
    /// handles.
    pub fn infos(&self) -> Vec<LoadedAssetInfo> {
        let mut infos: Vec<LoadedAssetInfo> = self
            .assets
            .values()
            .map(|asset| LoadedAssetInfo {
                position: asset.handle.position(),
                ..asset.info.clone()
            })
            .collect();
        infos.sort_by(|a, b| a.name.cmp(&b.name));
        infos
    }

    /// Looks up one asset.
    pub fn get(&self, name: &str) -> Option<&LoadedAsset> {
        self.assets.get(name)
    }

    /// Removes and disposes every asset matching `predicate`.
    ///
    /// Returns the evicted names, sorted.
    pub fn evict_where(&mut self, mut predicate: impl FnMut(&LoadedAsset) -> bool) -> Vec<String> {
        let doomed: Vec<String> = self
            .assets
            .iter()
            .filter(|(_, asset)| predicate(asset))
            .map(|(name, _)| name.clone())
            .collect();

        let mut evicted = Vec::with_capacity(doomed.len());
        for name in doomed {
            if let Some(mut asset) = self.assets.remove(&name) {
                asset.handle.dispose();
                evicted.push(name);
            }
        }
        evicted.sort();
        evicted
    }

    /// Removes and disposes a single asset. Returns `false` if it was not loaded.
    pub fn unload(&mut self, name: &str) -> bool {
        match self.assets.remove(name) {
            Some(mut asset) => {
                asset.handle.dispose();
                true
            }
            None => false,
        }
    }

    /// Disposes everything and forgets pending reservations.
    pub fn drain_all(&mut self) -> usize {
        let count = self.assets.len();
        for (_, mut asset) in self.assets.drain() {
            asset.handle.dispose();
        }
        self.in_flight.clear();
        count
    }

    /// Disposes everything and refuses any later admission. Returns how many
    /// assets were disposed.
    pub fn close(&mut self) -> usize {
        self.closed = true;
        self.drain_all()
    }

    /// Whether [`AssetRegistry::close`] has been called.
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Loaded asset count per phase.
    pub fn phase_counts(&self) -> BTreeMap<LoadPhase, usize> {
        let mut counts: BTreeMap<LoadPhase, usize> =
            LoadPhase::ALL.iter().map(|&phase| (phase, 0)).collect();
        for asset in self.assets.values() {
            *counts.entry(asset.info.phase).or_default() += 1;
        }
        counts
    }

    /// Sum of the handles' size hints, if every handle has one.
    pub fn hinted_bytes(&self) -> Option<u64> {
        self.assets
            .values()
            .map(|asset| asset.handle.size_hint())
            .sum()
    }
}

impl Drop for AssetRegistry {
    fn drop(&mut self) {
        if !self.assets.is_empty() {
            log::debug!(
                "ResourceManager: disposing {} assets left in the registry.",
                self.assets.len()
            );
            self.drain_all();
        }
    }
}
