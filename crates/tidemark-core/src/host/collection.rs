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

//! Observable collaborator collections.
//!
//! The growth watcher needs to know when a collaborator's collection (scene
//! children, physics bodies, animation mixers, asset registries) is mutated.
//! Instead of patching the collaborator's methods at runtime, collections
//! expose an observer registration. [`TrackedCollection`] is an adapter that
//! performs the mutation and notifies observers in one call, for hosts whose
//! own containers cannot be modified.

use super::SubscriptionId;
use std::collections::HashMap;
use std::sync::atomic::AtomicU64;
use std::sync::{Arc, Mutex, PoisonError};

/// What kind of mutation an observer is told about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationKind {
    /// An element was added.
    Insert,
    /// An element was removed.
    Remove,
}

/// Callback invoked after every mutation of a watched collection.
pub type MutationObserver = Arc<dyn Fn(MutationKind) + Send + Sync>;

/// A collaborator collection whose size can be sampled and whose mutations
/// can be observed.
pub trait WatchedCollection: Send + Sync {
    /// The current number of elements.
    fn len(&self) -> usize;

    /// Returns `true` if the collection holds no elements.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Registers an observer called after each insert/remove.
    fn subscribe(&self, observer: MutationObserver) -> SubscriptionId;

    /// Removes an observer. Unknown ids are ignored.
    fn unsubscribe(&self, id: SubscriptionId);
}

/// Looks up collaborator collections by name.
///
/// A collection that does not exist yet (its subsystem has not finished
/// starting) is reported as `None`; the watcher retries later.
pub trait CollectionDirectory: Send + Sync {
    /// Returns the named collection, if it exists.
    fn lookup(&self, name: &str) -> Option<Arc<dyn WatchedCollection>>;
}

/// A [`CollectionDirectory`] backed by a map that can be filled at any time.
#[derive(Default)]
pub struct StaticDirectory {
    entries: Mutex<HashMap<String, Arc<dyn WatchedCollection>>>,
}

impl StaticDirectory {
    /// Creates an empty directory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes `collection` available under `name`, replacing any previous entry.
    pub fn register(&self, name: impl Into<String>, collection: Arc<dyn WatchedCollection>) {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(name.into(), collection);
    }
}

impl CollectionDirectory for StaticDirectory {
    fn lookup(&self, name: &str) -> Option<Arc<dyn WatchedCollection>> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned()
    }
}

/// A vector that notifies its observers after every mutation.
pub struct TrackedCollection<T> {
    items: Mutex<Vec<T>>,
    observers: Mutex<Vec<(SubscriptionId, MutationObserver)>>,
    next_id: AtomicU64,
}

impl<T> TrackedCollection<T> {
    /// Creates an empty collection.
    pub fn new() -> Self {
        Self {
            items: Mutex::new(Vec::new()),
            observers: Mutex::new(Vec::new()),
            next_id: AtomicU64::new(0),
        }
    }

    /// Appends `item` and notifies observers.
    pub fn insert(&self, item: T) {
        self.items
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(item);
        self.notify(MutationKind::Insert);
    }

    /// Removes the first element matching `predicate` and notifies observers.
    pub fn remove_where(&self, predicate: impl Fn(&T) -> bool) -> Option<T> {
        let removed = {
            let mut items = self.items.lock().unwrap_or_else(PoisonError::into_inner);
            let index = items.iter().position(predicate)?;
            items.remove(index)
        };
        self.notify(MutationKind::Remove);
        Some(removed)
    }

    /// Removes every element and notifies observers once.
    pub fn clear(&self) {
        let was_empty = {
            let mut items = self.items.lock().unwrap_or_else(PoisonError::into_inner);
            let was_empty = items.is_empty();
            items.clear();
            was_empty
        };
        if !was_empty {
            self.notify(MutationKind::Remove);
        }
    }

    /// Returns the number of registered observers.
    pub fn observer_count(&self) -> usize {
        self.observers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    fn notify(&self, kind: MutationKind) {
        // Snapshot so observers may (un)subscribe from inside the callback.
        let observers: Vec<MutationObserver> = self
            .observers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(_, observer)| observer.clone())
            .collect();
        for observer in observers {
            observer(kind);
        }
    }
}

impl<T> Default for TrackedCollection<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Send> WatchedCollection for TrackedCollection<T> {
    fn len(&self) -> usize {
        self.items
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    fn subscribe(&self, observer: MutationObserver) -> SubscriptionId {
        let id = SubscriptionId::next(&self.next_id);
        self.observers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((id, observer));
        id
    }

    fn unsubscribe(&self, id: SubscriptionId) {
        self.observers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .retain(|(existing, _)| *existing != id);
    }
}
