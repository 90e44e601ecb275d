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

// Tidemark Sandbox
// Drives the resource manager against a simulated scene.

mod host;

use anyhow::{Context, Result};
use host::{SimulatedHeap, SimulatedLoader, SimulatedPhysics, SimulatedRenderer, SimulatedViewer};
use std::sync::Arc;
use std::time::Duration;
use tidemark_control::{Collaborators, ManagerConfig, ResourceManager};
use tidemark_core::asset::AssetDescriptor;
use tidemark_core::budget::MIB;
use tidemark_core::host::{DeviceSignals, StaticDirectory, TrackedCollection, WatchedCollection};
use tidemark_infra::{ProcessHeapMetrics, SysinfoSignals};

const CONFIG: &str = r#"{
    "fast_sample_interval_ms": 250,
    "policy_sweep_interval_ms": 1000,
    "watched_collections": ["scene", "particles"]
}"#;

fn scene_descriptors() -> Vec<AssetDescriptor> {
    let mut descriptors = vec![
        AssetDescriptor::new("main_camera", "camera"),
        AssetDescriptor::new("sun", "light"),
        AssetDescriptor::new("skybox", "skybox"),
        AssetDescriptor::new("player", "player").with_priority(150),
        AssetDescriptor::new("front_door", "door"),
    ];
    for i in 0..24 {
        // Alternate in front of and behind the camera.
        let z = if i % 2 == 0 { -20.0 - i as f32 } else { 20.0 + i as f32 };
        descriptors.push(
            AssetDescriptor::new(format!("prop_{i:02}"), "prop")
                .with_params(serde_json::json!({ "position": [i as f32 - 12.0, 0.0, z] })),
        );
    }
    for i in 0..12 {
        descriptors.push(AssetDescriptor::new(format!("cloud_{i:02}"), "cloud"));
    }
    descriptors
}

#[tokio::main]
async fn main() -> Result<()> {
    use env_logger::{Builder, Env};

    Builder::from_env(Env::default().default_filter_or("info")).init();

    let use_process_heap = std::env::args().any(|arg| arg == "--process-heap");
    let config = ManagerConfig::from_json_str(CONFIG)?;

    let heap = Arc::new(SimulatedHeap::default());
    let scene = Arc::new(TrackedCollection::<String>::new());
    let particles = Arc::new(TrackedCollection::<u32>::new());
    let directory = Arc::new(StaticDirectory::new());
    directory.register("scene", scene.clone() as Arc<dyn WatchedCollection>);
    directory.register("particles", particles.clone() as Arc<dyn WatchedCollection>);

    let mut collaborators = Collaborators::new(Arc::new(SimulatedLoader::new(
        heap.clone(),
        scene.clone(),
        24 * MIB,
    )))
    .with_renderer(Arc::new(SimulatedRenderer))
    .with_physics(Arc::new(SimulatedPhysics::default()))
    .with_viewer(Arc::new(SimulatedViewer))
    .with_collections(directory);
    collaborators = if use_process_heap {
        let probe = ProcessHeapMetrics::new().context("Failed to create the process heap probe")?;
        collaborators.with_heap_metrics(Arc::new(probe))
    } else {
        collaborators.with_heap_metrics(heap.clone())
    };

    let manager = ResourceManager::builder(collaborators)
        .host_signals(SysinfoSignals::new().signals())
        .config(config)
        .build();
    manager.start_monitoring();

    let loaded = manager.load_assets_with_budget(scene_descriptors()).await;
    log::info!(
        "Sandbox: {} assets loaded, {} deferred.",
        loaded.len(),
        manager.deferred_count()
    );

    // A particle system that never releases its emitters.
    for tick in 0..12u32 {
        particles.insert(tick);
        tokio::time::sleep(Duration::from_millis(300)).await;
    }

    let report = manager.force_analysis();
    println!(
        "{}",
        serde_json::to_string_pretty(&report).context("Failed to render the analysis report")?
    );

    manager.dispose();
    Ok(())
}
