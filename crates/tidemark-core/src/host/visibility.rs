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

//! Foreground/background transitions of the host application.

use super::SubscriptionId;
use std::sync::Arc;

/// Whether the host application is visible to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    /// The app or tab is in front.
    Foreground,
    /// The app or tab has been hidden or minimized.
    Background,
}

/// Callback invoked on every visibility transition.
pub type VisibilityCallback = Arc<dyn Fn(Visibility) + Send + Sync>;

/// Lets the manager register for visibility transitions.
pub trait VisibilitySignal: Send + Sync {
    /// Registers `callback`, returning an id for later removal.
    fn subscribe(&self, callback: VisibilityCallback) -> SubscriptionId;
    /// Removes a registration. Unknown ids are ignored.
    fn unsubscribe(&self, id: SubscriptionId);
}
