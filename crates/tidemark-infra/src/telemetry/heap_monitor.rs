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

//! Process memory reported as host heap metrics.
//!
//! The resident set of the current process stands in for the host heap; the
//! machine's total RAM is reported as the limit.

use anyhow::anyhow;
use std::sync::Mutex;
use sysinfo::{Pid, ProcessesToUpdate, System};
use tidemark_core::host::{HeapMetrics, HeapSample};

/// Samples the resident memory of the current process.
pub struct ProcessHeapMetrics {
    pid: Pid,
    system: Mutex<System>,
}

impl ProcessHeapMetrics {
    /// Creates a probe for the current process.
    pub fn new() -> anyhow::Result<Self> {
        let pid = sysinfo::get_current_pid()
            .map_err(|e| anyhow!("Cannot resolve the current process id: {e}"))?;
        let mut system = System::new();
        system.refresh_memory();
        Ok(Self {
            pid,
            system: Mutex::new(system),
        })
    }
}

impl HeapMetrics for ProcessHeapMetrics {
    fn sample(&self) -> Option<HeapSample> {
        let Ok(mut system) = self.system.lock() else {
            log::warn!("Monitor: process probe state unavailable.");
            return None;
        };
        system.refresh_processes(ProcessesToUpdate::Some(&[self.pid]), true);
        let used_bytes = system.process(self.pid)?.memory();
        Some(HeapSample {
            used_bytes,
            limit_bytes: system.total_memory(),
        })
    }
}
