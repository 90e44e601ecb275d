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

//! Host heap metrics.

/// One reading of the host's memory usage.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HeapSample {
    /// Bytes currently in use.
    pub used_bytes: u64,
    /// The host's own limit, in bytes.
    pub limit_bytes: u64,
}

/// An optional query of the host's heap usage.
///
/// When no implementation is provided, or when [`HeapMetrics::sample`]
/// returns `None`, the monitor falls back to estimating usage from the number
/// of loaded assets.
pub trait HeapMetrics: Send + Sync {
    /// Returns the current reading, if the host exposes one.
    fn sample(&self) -> Option<HeapSample>;
}
