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

//! Coarse device signals used to classify the host once at startup.

/// What the host reports about itself. Any field may be unknown.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HostSignals {
    /// Approximate physical RAM, in bytes.
    pub total_ram_bytes: Option<u64>,
    /// Logical CPU core count.
    pub logical_cores: Option<usize>,
    /// OS / browser fingerprint, e.g. `"Android 7.1"` or `"Windows 11"`.
    pub platform: Option<String>,
}

/// A source of [`HostSignals`].
pub trait DeviceSignals: Send + Sync {
    /// Reads the signals. Must not fail; unknown values are `None`.
    fn signals(&self) -> HostSignals;
}
