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

mod common;

use common::{placed, MockHeap, MockLoader, BEHIND};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tidemark_control::{Collaborators, ManagerConfig, ResourceManager};
use tidemark_core::asset::AssetDescriptor;
use tidemark_core::budget::{CapabilityProfile, DeviceTier, GIB, MIB};
use tidemark_core::host::{HeapMetrics, HeapSample, HostSignals};
use tidemark_core::telemetry::MetricId;

fn profile(budget_mib: u64, concurrency: usize) -> CapabilityProfile {
    CapabilityProfile {
        tier: DeviceTier::Desktop,
        memory_budget: budget_mib * MIB,
        max_concurrent_loads: concurrency,
    }
}

fn config() -> ManagerConfig {
    ManagerConfig {
        chunk_yield_ms: 0,
        ..Default::default()
    }
}

fn manager(collaborators: Collaborators, budget_mib: u64, concurrency: usize) -> ResourceManager {
    ResourceManager::builder(collaborators)
        .profile(profile(budget_mib, concurrency))
        .config(config())
        .build()
}

#[tokio::test]
async fn phases_load_in_order_and_by_priority_within_a_phase() {
    let loader = Arc::new(MockLoader::new());
    let manager = manager(Collaborators::new(loader.clone()), 1024, 1);

    let loaded = manager
        .load_assets_with_budget(vec![
            AssetDescriptor::new("cloud", "cloud"),
            AssetDescriptor::new("bench", "prop"),
            AssetDescriptor::new("door", "door").with_priority(10),
            AssetDescriptor::new("hero", "hero").with_priority(300),
            AssetDescriptor::new("sun", "light"),
            AssetDescriptor::new("camera", "camera").with_priority(500),
        ])
        .await;

    assert_eq!(
        loader.order(),
        vec!["camera", "sun", "hero", "door", "bench", "cloud"]
    );
    let admitted: Vec<&str> = loaded.iter().map(|info| info.name.as_str()).collect();
    assert_eq!(admitted, loader.order());
}

#[tokio::test]
async fn interactive_assets_are_admitted_before_decoration() {
    let loader = Arc::new(MockLoader::new());
    let manager = manager(Collaborators::new(loader.clone()), 1024, 1);

    manager
        .load_assets_with_budget(vec![
            AssetDescriptor::new("vase", "decor").with_priority(-25),
            AssetDescriptor::new("lever", "interactive").with_priority(100),
        ])
        .await;

    assert_eq!(loader.order(), vec!["lever", "vase"]);
}

#[tokio::test]
async fn the_same_name_is_never_admitted_twice() {
    let loader = Arc::new(MockLoader::new());
    let manager = manager(Collaborators::new(loader.clone()), 1024, 4);

    manager
        .load_assets_with_budget(vec![
            AssetDescriptor::new("rock", "prop"),
            AssetDescriptor::new("rock", "prop"),
            AssetDescriptor::new("tree", "plant"),
        ])
        .await;
    assert_eq!(loader.calls.load(Ordering::SeqCst), 2);
    assert_eq!(
        manager.last_load_report().unwrap().duplicates,
        vec!["rock".to_string()]
    );

    let again = manager
        .load_assets_with_budget(vec![AssetDescriptor::new("rock", "prop")])
        .await;
    assert!(again.is_empty());
    assert_eq!(loader.calls.load(Ordering::SeqCst), 2);
    assert_eq!(manager.loaded_count(), 2);
}

#[tokio::test]
async fn descriptors_beyond_the_high_water_mark_are_deferred() {
    // 10 MiB per asset by the count estimate against a 100 MiB budget.
    let loader = Arc::new(MockLoader::new());
    let manager = manager(Collaborators::new(loader.clone()), 100, 1);

    let descriptors = (0..20)
        .map(|i| AssetDescriptor::new(format!("prop_{i:02}"), "prop"))
        .collect();
    let loaded = manager.load_assets_with_budget(descriptors).await;

    assert_eq!(loaded.len(), 9);
    assert_eq!(manager.deferred_count(), 11);
    let usage = manager.usage();
    assert!(usage.used_bytes <= manager.budget().high_water_bytes() + 10 * MIB);

    let report = manager.last_load_report().unwrap();
    assert_eq!(report.deferred.len(), 11);
    assert_eq!(report.deferred[0], "prop_09");
    let deferred = manager
        .metrics()
        .get_metric(&MetricId::new("assets", "deferred_total"))
        .unwrap();
    assert_eq!(deferred.value.as_counter(), Some(11));
}

#[tokio::test]
async fn later_phases_are_deferred_wholesale_after_a_heavy_phase() {
    let heap = Arc::new(MockHeap::default());
    let loader = Arc::new(MockLoader::new().charging(&heap, 30 * MIB));
    let manager = manager(
        Collaborators::new(loader.clone()).with_heap_metrics(heap.clone()),
        100,
        2,
    );

    manager
        .load_assets_with_budget(vec![
            AssetDescriptor::new("hero", "hero"),
            AssetDescriptor::new("bench", "prop"),
            AssetDescriptor::new("cloud", "cloud"),
            AssetDescriptor::new("camera", "camera"),
            AssetDescriptor::new("sun", "light"),
            AssetDescriptor::new("sky", "skybox"),
        ])
        .await;

    assert_eq!(loader.calls.load(Ordering::SeqCst), 3);
    assert_eq!(
        manager.deferred_names(),
        vec!["hero".to_string(), "bench".to_string(), "cloud".to_string()]
    );

    // Still above the low-water mark: nothing moves.
    assert!(manager.drain_deferred().await.is_empty());
    assert_eq!(manager.deferred_count(), 3);

    // Headroom frees up: the oldest entries are redriven, one chunk at a time.
    heap.set(10 * MIB);
    let redriven = manager.drain_deferred().await;
    assert_eq!(redriven.admitted, vec!["hero".to_string(), "bench".to_string()]);
    assert_eq!(manager.deferred_names(), vec!["cloud".to_string()]);
}

#[tokio::test]
async fn deferred_queue_is_frozen_while_admission_is_paused() {
    let heap = Arc::new(MockHeap::default());
    let loader = Arc::new(MockLoader::new());
    let manager = manager(
        Collaborators::new(loader.clone()).with_heap_metrics(heap.clone()),
        100,
        2,
    );

    heap.set(90 * MIB);
    manager
        .load_assets_with_budget(vec![AssetDescriptor::new("bench", "prop")])
        .await;
    assert_eq!(manager.deferred_count(), 1);

    assert!(manager.sample_now().paused_now);
    heap.set(0);
    assert!(manager.drain_deferred().await.is_empty());
    assert_eq!(manager.deferred_count(), 1);

    assert!(manager.sample_now().resumed_now);
    assert_eq!(manager.drain_deferred().await.admitted, vec!["bench".to_string()]);
    assert_eq!(loader.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn one_failing_load_does_not_stop_the_run() {
    let loader = Arc::new(MockLoader::new().failing("broken"));
    let manager = manager(Collaborators::new(loader.clone()), 1024, 2);

    let loaded = manager
        .load_assets_with_budget(vec![
            AssetDescriptor::new("a", "prop"),
            AssetDescriptor::new("broken", "prop"),
            AssetDescriptor::new("b", "prop"),
            placed("c", "cloud", BEHIND),
        ])
        .await;

    assert_eq!(loaded.len(), 3);
    let report = manager.last_load_report().unwrap();
    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.failed[0].0, "broken");
    let failed = manager
        .metrics()
        .get_metric(&MetricId::new("assets", "failed_total"))
        .unwrap();
    assert_eq!(failed.value.as_counter(), Some(1));

    // A failed name is not reserved: it can be retried.
    manager
        .load_assets_with_budget(vec![AssetDescriptor::new("broken", "prop")])
        .await;
    assert_eq!(loader.calls.load(Ordering::SeqCst), 5);
}

#[tokio::test]
async fn low_memory_device_loads_essentials_first_one_at_a_time() -> anyhow::Result<()> {
    let loader = Arc::new(MockLoader::new());
    let manager = ResourceManager::builder(Collaborators::new(loader.clone()))
        .host_signals(HostSignals {
            total_ram_bytes: Some(2 * GIB),
            logical_cores: Some(8),
            platform: Some("Windows 10".to_string()),
        })
        .config(ManagerConfig::from_json_str(r#"{ "chunk_yield_ms": 0 }"#)?)
        .build();

    assert_eq!(manager.profile().tier, DeviceTier::LowMemory);
    assert_eq!(manager.profile().max_concurrent_loads, 1);
    assert_eq!(manager.budget().bytes, 150 * MIB);

    let mut descriptors: Vec<AssetDescriptor> = (0..5)
        .map(|i| AssetDescriptor::new(format!("filler_{i}"), "background"))
        .collect();
    descriptors.extend((0..5).map(|i| AssetDescriptor::new(format!("light_{i}"), "light")));
    manager.load_assets_with_budget(descriptors).await;

    let order = loader.order();
    assert_eq!(order.len(), 10);
    assert!(order[..5].iter().all(|name| name.starts_with("light_")));
    assert!(order[5..].iter().all(|name| name.starts_with("filler_")));
    Ok(())
}

/// Reads `low` for a set number of samples, then `high`.
struct SteppingHeap {
    low_reads_left: AtomicUsize,
    low: u64,
    high: u64,
}

impl SteppingHeap {
    fn new(low: u64, high: u64) -> Self {
        Self {
            low_reads_left: AtomicUsize::new(0),
            low,
            high,
        }
    }

    fn stay_low_for(&self, reads: usize) {
        self.low_reads_left.store(reads, Ordering::SeqCst);
    }
}

impl HeapMetrics for SteppingHeap {
    fn sample(&self) -> Option<HeapSample> {
        let low = self
            .low_reads_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| left.checked_sub(1))
            .is_ok();
        Some(HeapSample {
            used_bytes: if low { self.low } else { self.high },
            limit_bytes: 4 * GIB,
        })
    }
}

#[tokio::test]
async fn redrive_cut_short_by_pressure_keeps_queue_order() {
    let heap = Arc::new(SteppingHeap::new(0, 90 * MIB));
    let loader = Arc::new(MockLoader::new());
    let manager = manager(
        Collaborators::new(loader.clone()).with_heap_metrics(heap.clone()),
        100,
        3,
    );

    manager
        .load_assets_with_budget(
            ["a", "b", "c", "d"]
                .iter()
                .map(|name| AssetDescriptor::new(*name, "prop"))
                .collect(),
        )
        .await;
    assert_eq!(manager.deferred_names(), vec!["a", "b", "c", "d"]);

    // Low for the pre-check and for "a", then back above the low-water mark.
    heap.stay_low_for(2);
    let report = manager.drain_deferred().await;

    assert_eq!(report.admitted, vec!["a".to_string()]);
    assert_eq!(report.deferred, vec!["b".to_string(), "c".to_string()]);
    assert_eq!(manager.deferred_names(), vec!["b", "c", "d"]);
    assert_eq!(loader.order(), vec!["a".to_string()]);
}

#[tokio::test]
async fn stopping_monitoring_mid_redrive_still_admits_the_load() {
    let heap = Arc::new(MockHeap::default());
    let loader = Arc::new(MockLoader::new().slow(Duration::from_millis(300)));
    let manager = ResourceManager::builder(
        Collaborators::new(loader.clone()).with_heap_metrics(heap.clone()),
    )
    .profile(profile(100, 2))
    .config(ManagerConfig {
        fast_sample_interval_ms: 5,
        policy_sweep_interval_ms: 20,
        proactive_eviction_chance: 0.0,
        ..config()
    })
    .build();

    heap.set(90 * MIB);
    manager
        .load_assets_with_budget(vec![AssetDescriptor::new("a", "prop")])
        .await;
    assert_eq!(manager.deferred_count(), 1);

    heap.set(0);
    assert!(manager.start_monitoring());
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(manager.deferred_count(), 0);
    assert!(manager.stop_monitoring());

    tokio::time::sleep(Duration::from_millis(500)).await;
    assert_eq!(manager.loaded_count(), 1);
    assert_eq!(manager.deferred_count(), 0);
    assert!(loader.disposed().is_empty());

    let again = manager
        .load_assets_with_budget(vec![AssetDescriptor::new("a", "prop")])
        .await;
    assert!(again.is_empty());
    assert_eq!(manager.last_load_report().unwrap().duplicates, vec!["a".to_string()]);
    assert_eq!(loader.calls.load(Ordering::SeqCst), 1);
}

#[test]
fn redrive_dropped_with_its_runtime_returns_to_the_queue() -> anyhow::Result<()> {
    let heap = Arc::new(MockHeap::default());
    let loader = Arc::new(MockLoader::new().slow(Duration::from_millis(300)));
    let manager = Arc::new(manager(
        Collaborators::new(loader.clone()).with_heap_metrics(heap.clone()),
        100,
        2,
    ));

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()?;
    heap.set(90 * MIB);
    runtime.block_on(manager.load_assets_with_budget(vec![AssetDescriptor::new("a", "prop")]));
    heap.set(0);

    let redrive = {
        let manager = Arc::clone(&manager);
        async move { manager.drain_deferred().await }
    };
    runtime.spawn(redrive);
    runtime.block_on(async { tokio::time::sleep(Duration::from_millis(50)).await });
    assert_eq!(manager.deferred_count(), 0);
    assert_eq!(loader.calls.load(Ordering::SeqCst), 1);
    drop(runtime);

    assert_eq!(manager.deferred_names(), vec!["a"]);
    assert_eq!(manager.loaded_count(), 0);

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()?;
    let report = runtime.block_on(manager.drain_deferred());
    assert_eq!(report.admitted, vec!["a".to_string()]);
    assert_eq!(manager.loaded_count(), 1);
    Ok(())
}

#[tokio::test]
async fn loads_finishing_after_dispose_are_disposed() -> anyhow::Result<()> {
    let loader = Arc::new(MockLoader::new().slow(Duration::from_millis(100)));
    let manager = Arc::new(manager(Collaborators::new(loader.clone()), 1024, 2));

    let loading = tokio::spawn({
        let manager = Arc::clone(&manager);
        async move {
            manager
                .load_assets_with_budget(vec![AssetDescriptor::new("late", "prop")])
                .await
        }
    });
    tokio::time::sleep(Duration::from_millis(30)).await;
    manager.dispose();

    let loaded = loading.await?;
    assert!(loaded.is_empty());
    assert_eq!(manager.loaded_count(), 0);
    assert_eq!(loader.disposed(), vec!["late".to_string()]);
    let report = manager.last_load_report().unwrap();
    assert_eq!(report.failed, vec![("late".to_string(), "manager disposed".to_string())]);

    // Nothing is admitted or queued once disposed.
    let after = manager
        .load_assets_with_budget(vec![AssetDescriptor::new("later", "prop")])
        .await;
    assert!(after.is_empty());
    assert_eq!(manager.deferred_count(), 0);
    assert_eq!(loader.calls.load(Ordering::SeqCst), 1);
    Ok(())
}
