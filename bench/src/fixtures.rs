//! Behaviors, assets and pre-populated scenes shared by the benchmarks.

use std::sync::Arc;

use rand::{Rng, SeedableRng, rngs::StdRng};
use rusty_lifecycle::{Guid, ObjectId, Singleton, SingletonRegistry, scene::Scene};

/// A singleton looked up on every frame.
#[derive(Singleton, Default)]
pub struct FrameClock {
    pub ticks: u64,
}

/// A singleton that is usually created lazily.
#[derive(Singleton, Default)]
#[singleton(on_duplicate = "discard_container")]
pub struct AudioMixer;

/// A plain behavior that clutters the hierarchy.
#[derive(Default)]
pub struct Prop {
    pub mass: f32,
}

/// A shared asset payload.
pub struct Mesh {
    pub vertices: Vec<[f32; 3]>,
}

/// A scene with `containers` containers spread over a few roots, each carrying a [`Prop`],
/// plus `candidates` unregistered [`FrameClock`] behaviors scattered among them.
pub fn populated_scene(containers: usize, candidates: usize) -> Scene {
    let scene = Scene::new(Arc::new(SingletonRegistry::new()));
    let mut rng = StdRng::seed_from_u64(0x5eed);

    let roots: Vec<ObjectId> = (0..8).map(|i| scene.spawn(format!("root-{i}"))).collect();
    let mut all = roots.clone();
    for i in 0..containers {
        let parent = all[rng.gen_range(0..all.len())];
        if let Ok(container) = scene.spawn_child(format!("node-{i}"), parent) {
            let _ = scene.attach(container, Prop { mass: rng.r#gen() });
            all.push(container);
        }
    }
    for _ in 0..candidates {
        let container = all[rng.gen_range(0..all.len())];
        let _ = scene.attach(container, FrameClock::default());
    }
    scene
}

/// `count` distinct guids.
pub fn guids(count: usize) -> Vec<Guid> {
    (0..count).map(|i| Guid::new(format!("asset-{i:08x}"))).collect()
}

/// A mesh with `count` vertices.
pub fn mesh(count: usize) -> Arc<Mesh> {
    Arc::new(Mesh {
        vertices: vec![[0.0; 3]; count],
    })
}
