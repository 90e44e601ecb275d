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

//! sysinfo-based implementation of the DeviceSignals trait.

use std::sync::{Arc, Mutex};
use sysinfo::System;
use tidemark_core::host::{DeviceSignals, HostSignals};

/// Reads total RAM, logical core count and the OS description.
pub struct SysinfoSignals {
    system: Arc<Mutex<System>>,
}

impl SysinfoSignals {
    /// Creates the probe and takes a first reading.
    pub fn new() -> Self {
        let mut system = System::new();
        system.refresh_memory();
        system.refresh_cpu_all();
        Self {
            system: Arc::new(Mutex::new(system)),
        }
    }

    /// Refreshes memory and CPU information.
    pub fn refresh(&self) {
        if let Ok(mut system) = self.system.lock() {
            system.refresh_memory();
            system.refresh_cpu_all();
        }
    }

    fn platform() -> Option<String> {
        System::long_os_version()
            .or_else(System::name)
            .or_else(|| Some(std::env::consts::OS.to_string()))
    }
}

impl DeviceSignals for SysinfoSignals {
    fn signals(&self) -> HostSignals {
        let (total_ram_bytes, logical_cores) = match self.system.lock() {
            Ok(system) => {
                let ram = system.total_memory();
                let cores = system.cpus().len();
                ((ram > 0).then_some(ram), (cores > 0).then_some(cores))
            }
            Err(_) => {
                log::warn!("Profiler: sysinfo state unavailable, reporting unknown RAM and cores.");
                (None, None)
            }
        };
        HostSignals {
            total_ram_bytes,
            logical_cores,
            platform: Self::platform(),
        }
    }
}

impl Default for SysinfoSignals {
    fn default() -> Self {
        Self::new()
    }
}
