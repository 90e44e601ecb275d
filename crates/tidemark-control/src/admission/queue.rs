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

//! Descriptors waiting for memory headroom.

use std::collections::{HashSet, VecDeque};
use tidemark_core::asset::AssetDescriptor;

/// A FIFO of deferred descriptors, unique by name.
#[derive(Debug, Default)]
pub struct AdmissionQueue {
    entries: VecDeque<AssetDescriptor>,
    names: HashSet<String>,
}

impl AdmissionQueue {
    /// Creates an empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a descriptor. Returns `false` if one with the same name is
    /// already waiting.
    pub fn push(&mut self, descriptor: AssetDescriptor) -> bool {
        if !self.names.insert(descriptor.name().to_string()) {
            return false;
        }
        self.entries.push_back(descriptor);
        true
    }

    /// Puts a descriptor back at the head, ahead of everything waiting.
    /// Returns `false` if one with the same name is already waiting.
    pub fn push_front(&mut self, descriptor: AssetDescriptor) -> bool {
        if !self.names.insert(descriptor.name().to_string()) {
            return false;
        }
        self.entries.push_front(descriptor);
        true
    }

    /// Removes the oldest descriptor.
    pub fn pop_front(&mut self) -> Option<AssetDescriptor> {
        let descriptor = self.entries.pop_front()?;
        self.names.remove(descriptor.name());
        Some(descriptor)
    }

    /// Removes up to `count` descriptors, oldest first.
    pub fn pop_up_to(&mut self, count: usize) -> Vec<AssetDescriptor> {
        let mut batch = Vec::with_capacity(count.min(self.entries.len()));
        while batch.len() < count {
            match self.pop_front() {
                Some(descriptor) => batch.push(descriptor),
                None => break,
            }
        }
        batch
    }

    /// Whether a descriptor named `name` is waiting.
    pub fn contains(&self, name: &str) -> bool {
        self.names.contains(name)
    }

    /// Number of waiting descriptors.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing is waiting.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Waiting names, oldest first.
    pub fn names(&self) -> Vec<String> {
        self.entries.iter().map(|d| d.name().to_string()).collect()
    }

    /// Drops everything.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.names.clear();
    }
}
