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

//! Leak-style growth detection on collaborator collections.
//!
//! Each instrumented collection gets a mutation observer that only marks the
//! collection dirty and stamps the time. [`GrowthWatcher::tick`] rechecks a
//! dirty collection once it has been quiet for the debounce delay, so a burst
//! of mutations costs a single recheck. A recheck compares the current size
//! with the last one: strict growth bumps a per-collection streak, anything
//! else resets it. When the streak reaches the threshold a [`GrowthEvent`] is
//! published and the streak starts over.

use serde::Serialize;
use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;
use tidemark_core::clock::Clock;
use tidemark_core::event::{EventBus, GrowthEvent};
use tidemark_core::host::{
    CollectionDirectory, MutationKind, MutationObserver, SubscriptionId, WatchedCollection,
};

/// Collection name to the time of its latest unchecked mutation.
type DirtyMap = Mutex<HashMap<String, Duration>>;

/// The recorded state of one watched collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GrowthSample {
    /// The collection's name.
    pub name: String,
    /// Size at the last recheck (or at installation).
    pub last_size: usize,
    /// Current streak of growth rechecks.
    pub consecutive_growth: u32,
}

struct Watched {
    collection: Arc<dyn WatchedCollection>,
    subscription: SubscriptionId,
    last_size: usize,
    consecutive_growth: u32,
}

/// Debounced growth detection over named collaborator collections.
pub struct GrowthWatcher {
    directory: Option<Arc<dyn CollectionDirectory>>,
    clock: Arc<dyn Clock>,
    debounce: Duration,
    threshold: u32,
    watched: HashMap<String, Watched>,
    pending: BTreeSet<String>,
    dirty: Arc<DirtyMap>,
    events: Arc<EventBus<GrowthEvent>>,
    rechecks: u64,
    growth_signals: u64,
}

impl GrowthWatcher {
    /// Creates a watcher resolving names through `directory` and publishing
    /// on `events`.
    pub fn new(
        directory: Option<Arc<dyn CollectionDirectory>>,
        clock: Arc<dyn Clock>,
        debounce: Duration,
        threshold: u32,
        events: Arc<EventBus<GrowthEvent>>,
    ) -> Self {
        Self {
            directory,
            clock,
            debounce,
            threshold: threshold.max(1),
            watched: HashMap::new(),
            pending: BTreeSet::new(),
            dirty: Arc::new(Mutex::new(HashMap::new())),
            events,
            rechecks: 0,
            growth_signals: 0,
        }
    }

    /// Instruments each named collection once.
    ///
    /// Already instrumented names are skipped. Names the directory cannot
    /// resolve yet are remembered and retried on every [`GrowthWatcher::tick`].
    /// Returns how many collections were newly instrumented.
    pub fn install<S: AsRef<str>>(&mut self, names: &[S]) -> usize {
        names
            .iter()
            .filter(|name| self.install_one(name.as_ref()))
            .count()
    }

    fn install_one(&mut self, name: &str) -> bool {
        if self.watched.contains_key(name) {
            log::debug!("Watcher: '{}' is already instrumented.", name);
            return false;
        }
        let Some(collection) = self.directory.as_ref().and_then(|d| d.lookup(name)) else {
            if self.pending.insert(name.to_string()) {
                log::debug!("Watcher: '{}' is not available yet, will retry.", name);
            }
            return false;
        };

        let subscription = collection.subscribe(self.observer_for(name));
        let last_size = collection.len();
        self.pending.remove(name);
        self.watched.insert(
            name.to_string(),
            Watched {
                collection,
                subscription,
                last_size,
                consecutive_growth: 0,
            },
        );
        log::info!("Watcher: instrumented '{}' (size {}).", name, last_size);
        true
    }

    fn observer_for(&self, name: &str) -> MutationObserver {
        let dirty: Weak<DirtyMap> = Arc::downgrade(&self.dirty);
        let clock = Arc::clone(&self.clock);
        let name = name.to_string();
        Arc::new(move |kind: MutationKind| {
            let Some(dirty) = dirty.upgrade() else {
                return;
            };
            log::trace!("Watcher: {:?} on '{}'.", kind, name);
            lock_dirty(&dirty)
                .entry(name.clone())
                .or_insert_with(|| clock.now());
        })
    }

    /// Retries pending installations and rechecks every collection whose
    /// oldest unchecked mutation is at least the debounce delay old.
    ///
    /// Mutations arriving after that first one do not push the recheck back,
    /// so a collection that never stops changing is still rechecked once per
    /// debounce window.
    ///
    /// Returns the growth events raised by this tick; they are also published
    /// on the event bus.
    pub fn tick(&mut self) -> Vec<GrowthEvent> {
        if !self.pending.is_empty() {
            let pending: Vec<String> = self.pending.iter().cloned().collect();
            self.install(&pending);
        }

        let now = self.clock.now();
        let due: Vec<String> = {
            let mut dirty = lock_dirty(&self.dirty);
            let due: Vec<String> = dirty
                .iter()
                .filter(|(_, last)| now.saturating_sub(**last) >= self.debounce)
                .map(|(name, _)| name.clone())
                .collect();
            for name in &due {
                dirty.remove(name);
            }
            due
        };

        due.iter().filter_map(|name| self.recheck(name)).collect()
    }

    fn recheck(&mut self, name: &str) -> Option<GrowthEvent> {
        let watched = self.watched.get_mut(name)?;
        self.rechecks += 1;

        let size = watched.collection.len();
        let grew = size > watched.last_size;
        watched.last_size = size;
        if !grew {
            watched.consecutive_growth = 0;
            return None;
        }

        self.growth_signals += 1;
        watched.consecutive_growth += 1;
        log::debug!(
            "Watcher: '{}' grew to {} ({} in a row).",
            name,
            size,
            watched.consecutive_growth
        );
        if watched.consecutive_growth < self.threshold {
            return None;
        }

        let event = GrowthEvent {
            collection: name.to_string(),
            size,
            consecutive_growth: watched.consecutive_growth,
        };
        watched.consecutive_growth = 0;
        log::warn!(
            "Watcher: sustained growth of '{}' ({} elements after {} growing rechecks).",
            name,
            size,
            event.consecutive_growth
        );
        self.events.publish(event.clone());
        Some(event)
    }

    /// Unsubscribes from every collection and forgets all state.
    pub fn detach_all(&mut self) {
        for (name, watched) in self.watched.drain() {
            watched.collection.unsubscribe(watched.subscription);
            log::debug!("Watcher: detached from '{}'.", name);
        }
        self.pending.clear();
        lock_dirty(&self.dirty).clear();
    }

    /// Per-collection state, sorted by name.
    pub fn samples(&self) -> Vec<GrowthSample> {
        let mut samples: Vec<GrowthSample> = self
            .watched
            .iter()
            .map(|(name, watched)| GrowthSample {
                name: name.clone(),
                last_size: watched.last_size,
                consecutive_growth: watched.consecutive_growth,
            })
            .collect();
        samples.sort_by(|a, b| a.name.cmp(&b.name));
        samples
    }

    /// Whether `name` is instrumented.
    pub fn is_watching(&self, name: &str) -> bool {
        self.watched.contains_key(name)
    }

    /// Names waiting for their collection to appear.
    pub fn pending_names(&self) -> Vec<String> {
        self.pending.iter().cloned().collect()
    }

    /// Number of rechecks performed so far.
    pub fn recheck_count(&self) -> u64 {
        self.rechecks
    }

    /// Number of individual growth signals (not events) so far.
    pub fn growth_signal_count(&self) -> u64 {
        self.growth_signals
    }
}

impl Drop for GrowthWatcher {
    fn drop(&mut self) {
        self.detach_all();
    }
}

impl std::fmt::Debug for GrowthWatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GrowthWatcher")
            .field("watched", &self.watched.keys().collect::<Vec<_>>())
            .field("pending", &self.pending)
            .field("debounce", &self.debounce)
            .field("threshold", &self.threshold)
            .finish()
    }
}

fn lock_dirty(dirty: &DirtyMap) -> MutexGuard<'_, HashMap<String, Duration>> {
    dirty.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tidemark_core::clock::ManualClock;
    use tidemark_core::host::{StaticDirectory, TrackedCollection};

    const DEBOUNCE: Duration = Duration::from_millis(100);

    struct Fixture {
        clock: ManualClock,
        collection: Arc<TrackedCollection<u32>>,
        directory: Arc<StaticDirectory>,
        events: Arc<EventBus<GrowthEvent>>,
    }

    impl Fixture {
        fn new() -> Self {
            let collection = Arc::new(TrackedCollection::new());
            let directory = Arc::new(StaticDirectory::new());
            directory.register("bodies", Arc::clone(&collection) as Arc<dyn WatchedCollection>);
            Self {
                clock: ManualClock::new(),
                collection,
                directory,
                events: Arc::new(EventBus::new()),
            }
        }

        fn watcher(&self) -> GrowthWatcher {
            GrowthWatcher::new(
                Some(Arc::clone(&self.directory) as Arc<dyn CollectionDirectory>),
                Arc::new(self.clock.clone()),
                DEBOUNCE,
                3,
                Arc::clone(&self.events),
            )
        }

        fn burst(&self, count: u32) {
            for i in 0..count {
                self.collection.insert(i);
            }
        }
    }

    #[test]
    fn install_is_idempotent() {
        let fixture = Fixture::new();
        let mut watcher = fixture.watcher();

        assert_eq!(watcher.install(&["bodies"]), 1);
        assert_eq!(watcher.install(&["bodies"]), 0);
        assert_eq!(fixture.collection.observer_count(), 1);
    }

    #[test]
    fn burst_is_coalesced_into_one_recheck() {
        let fixture = Fixture::new();
        let mut watcher = fixture.watcher();
        watcher.install(&["bodies"]);

        fixture.burst(10);
        fixture.clock.advance(Duration::from_millis(50));
        assert!(watcher.tick().is_empty());
        assert_eq!(watcher.recheck_count(), 0);

        fixture.clock.advance(Duration::from_millis(50));
        watcher.tick();
        assert_eq!(watcher.recheck_count(), 1);
        assert_eq!(watcher.growth_signal_count(), 1);
        assert_eq!(watcher.samples()[0].last_size, 10);
    }

    #[test]
    fn later_mutations_do_not_postpone_the_recheck() {
        let fixture = Fixture::new();
        let mut watcher = fixture.watcher();
        watcher.install(&["bodies"]);

        fixture.burst(1);
        fixture.clock.advance(Duration::from_millis(80));
        fixture.burst(1);
        fixture.clock.advance(Duration::from_millis(10));
        watcher.tick();
        assert_eq!(watcher.recheck_count(), 0);

        fixture.clock.advance(Duration::from_millis(10));
        watcher.tick();
        assert_eq!(watcher.recheck_count(), 1);
        assert_eq!(watcher.samples()[0].last_size, 2);
    }

    #[test]
    fn continuous_churn_is_rechecked_and_reported() {
        let fixture = Fixture::new();
        let mut watcher = fixture.watcher();
        watcher.install(&["bodies"]);

        // One insert every 50ms, one tick per second.
        let mut raised = Vec::new();
        for step in 1..=120u32 {
            fixture.clock.advance(Duration::from_millis(50));
            fixture.collection.insert(step);
            if step % 20 == 0 {
                raised.extend(watcher.tick());
            }
        }

        assert_eq!(watcher.recheck_count(), 6);
        assert_eq!(raised.len(), 2);
        assert_eq!(raised[1].size, 120);
    }

    #[test]
    fn sustained_growth_raises_one_event_then_resets() {
        let fixture = Fixture::new();
        let mut watcher = fixture.watcher();
        watcher.install(&["bodies"]);

        let mut raised = Vec::new();
        for _ in 0..3 {
            fixture.burst(2);
            fixture.clock.advance(DEBOUNCE);
            raised.extend(watcher.tick());
        }

        assert_eq!(raised.len(), 1);
        assert_eq!(raised[0].size, 6);
        assert_eq!(raised[0].consecutive_growth, 3);
        assert_eq!(fixture.events.drain(), raised);
        assert_eq!(watcher.samples()[0].consecutive_growth, 0);
    }

    #[test]
    fn shrink_breaks_the_streak() {
        let fixture = Fixture::new();
        let mut watcher = fixture.watcher();
        watcher.install(&["bodies"]);

        for step in 0..5 {
            if step == 2 {
                fixture.collection.remove_where(|_| true);
            } else {
                fixture.burst(1);
            }
            fixture.clock.advance(DEBOUNCE);
            assert!(watcher.tick().is_empty(), "unexpected event at step {step}");
        }
    }

    #[test]
    fn single_growth_does_not_fire() {
        let fixture = Fixture::new();
        let mut watcher = fixture.watcher();
        watcher.install(&["bodies"]);

        fixture.burst(50);
        fixture.clock.advance(DEBOUNCE);
        assert!(watcher.tick().is_empty());
        assert!(fixture.events.drain().is_empty());
    }

    #[test]
    fn missing_collection_is_installed_when_it_appears() {
        let fixture = Fixture::new();
        let mut watcher = fixture.watcher();

        assert_eq!(watcher.install(&["mixers"]), 0);
        assert_eq!(watcher.pending_names(), vec!["mixers".to_string()]);

        let mixers = Arc::new(TrackedCollection::<u8>::new());
        fixture
            .directory
            .register("mixers", Arc::clone(&mixers) as Arc<dyn WatchedCollection>);
        watcher.tick();

        assert!(watcher.is_watching("mixers"));
        assert!(watcher.pending_names().is_empty());
        assert_eq!(mixers.observer_count(), 1);
    }

    #[test]
    fn detach_unsubscribes() {
        let fixture = Fixture::new();
        let mut watcher = fixture.watcher();
        watcher.install(&["bodies"]);
        watcher.detach_all();
        assert_eq!(fixture.collection.observer_count(), 0);
        assert!(!watcher.is_watching("bodies"));
    }
}
