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

//! One-shot classification of the running device.
//!
//! [`profile`] is a pure function of the host's coarse signals. It never
//! fails: unknown signals fall back to the conservative [`DeviceTier::Mobile`].

use tidemark_core::budget::{CapabilityProfile, DeviceTier, GIB, MIB};
use tidemark_core::host::HostSignals;

/// Devices with less RAM than this are always [`DeviceTier::LowMemory`].
const LOW_MEMORY_RAM: u64 = 4 * GIB;
/// Desktops with fewer logical cores than this are [`DeviceTier::LowMemory`].
const MIN_DESKTOP_CORES: usize = 4;
/// Desktop concurrency never exceeds this.
const MAX_DESKTOP_CONCURRENCY: usize = 6;

/// Android releases older than this are treated as constrained.
const MIN_ANDROID_MAJOR: u32 = 8;
/// iOS releases older than this are treated as constrained.
const MIN_IOS_MAJOR: u32 = 13;

const MOBILE_MARKERS: &[&str] = &["android", "iphone", "ipad", "ipod", "mobile"];
const IOS_MARKERS: &[&str] = &["iphone os", "cpu os", "ios"];

const LOW_MEMORY_BUDGET: u64 = 150 * MIB;
const MOBILE_BUDGET: u64 = 300 * MIB;
const MOBILE_CONCURRENCY: usize = 2;

/// Classifies the device and derives its memory budget and load concurrency.
///
/// Budget and concurrency are monotonic in the tier: a lower tier never gets
/// a larger budget or more parallel loads than a higher one.
pub fn profile(signals: &HostSignals) -> CapabilityProfile {
    let tier = classify(signals);

    let (memory_budget, max_concurrent_loads) = match tier {
        DeviceTier::LowMemory => (LOW_MEMORY_BUDGET, 1),
        DeviceTier::Mobile => (MOBILE_BUDGET, MOBILE_CONCURRENCY),
        DeviceTier::Desktop => {
            // Desktop is only chosen when both RAM and cores are known.
            let ram = signals.total_ram_bytes.unwrap_or(LOW_MEMORY_RAM);
            let cores = signals.logical_cores.unwrap_or(MIN_DESKTOP_CORES);
            (desktop_budget(ram), cores.min(MAX_DESKTOP_CONCURRENCY))
        }
    };

    let profile = CapabilityProfile {
        tier,
        memory_budget,
        max_concurrent_loads,
    };
    log::info!(
        "Profiler: tier={} budget={}MiB concurrency={} (ram={:?}, cores={:?}, platform={:?})",
        profile.tier,
        profile.memory_budget / MIB,
        profile.max_concurrent_loads,
        signals.total_ram_bytes.map(|b| b / MIB),
        signals.logical_cores,
        signals.platform,
    );
    profile
}

fn classify(signals: &HostSignals) -> DeviceTier {
    let platform = signals
        .platform
        .as_deref()
        .unwrap_or_default()
        .to_ascii_lowercase();
    let is_mobile = MOBILE_MARKERS.iter().any(|m| platform.contains(m));

    if signals.total_ram_bytes.is_some_and(|ram| ram < LOW_MEMORY_RAM) {
        return DeviceTier::LowMemory;
    }
    if is_mobile && is_constrained_mobile_os(&platform) {
        return DeviceTier::LowMemory;
    }
    if !is_mobile
        && signals
            .logical_cores
            .is_some_and(|cores| cores < MIN_DESKTOP_CORES)
    {
        return DeviceTier::LowMemory;
    }

    if is_mobile || signals.total_ram_bytes.is_none() || signals.logical_cores.is_none() {
        DeviceTier::Mobile
    } else {
        DeviceTier::Desktop
    }
}

fn desktop_budget(ram: u64) -> u64 {
    if ram < 8 * GIB {
        512 * MIB
    } else if ram < 16 * GIB {
        GIB
    } else {
        2 * GIB
    }
}

fn is_constrained_mobile_os(platform: &str) -> bool {
    if let Some(major) = major_version_after(platform, "android") {
        return major < MIN_ANDROID_MAJOR;
    }
    IOS_MARKERS
        .iter()
        .find_map(|marker| major_version_after(platform, marker))
        .is_some_and(|major| major < MIN_IOS_MAJOR)
}

/// Parses the integer that follows `marker`, e.g. `7` in `"android 7.1"`.
fn major_version_after(haystack: &str, marker: &str) -> Option<u32> {
    let start = haystack.find(marker)? + marker.len();
    let digits: String = haystack[start..]
        .trim_start_matches([' ', '/'])
        .chars()
        .take_while(|c| c.is_ascii_digit())
        .collect();
    digits.parse().ok()
}
