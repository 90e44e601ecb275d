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

//! The shared admission pause flag.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// A cloneable flag telling the admission loader to stop taking new loads.
///
/// Only the budget monitor flips it; the loader and the policy sweep read it.
#[derive(Debug, Clone, Default)]
pub struct AdmissionGate {
    paused: Arc<AtomicBool>,
}

impl AdmissionGate {
    /// Creates an open gate.
    pub fn new() -> Self {
        Self::default()
    }

    /// Closes the gate. Returns `true` if it was open before.
    pub fn pause(&self) -> bool {
        !self.paused.swap(true, Ordering::SeqCst)
    }

    /// Opens the gate. Returns `true` if it was closed before.
    pub fn resume(&self) -> bool {
        self.paused.swap(false, Ordering::SeqCst)
    }

    /// Whether new admissions are currently refused.
    pub fn is_paused(&self) -> bool {
        self.paused.load(Ordering::SeqCst)
    }
}
