//! Walk through a singleton's life across two levels, plus an asset clone resolving back to
//! its source.
//!
//! Run with `RUST_LOG=debug` to see the registries at work.

use std::sync::Arc;

use parking_lot::Mutex;
use rusty_lifecycle::{
    Activation, DuplicateAction, Guid, Host, Identity, Singleton, global, scene::Scene,
};

// ============================================================================
// Behaviors
// ============================================================================

#[derive(Singleton, Default)]
#[singleton(on_duplicate = "discard_container", persistent)]
struct MusicPlayer {
    track: Mutex<String>,
}

#[derive(Singleton, Default)]
#[singleton(on_duplicate = "discard_duplicate")]
struct HudController;

// ============================================================================
// Assets
// ============================================================================

struct Palette {
    colors: Vec<u32>,
    identity: Mutex<Identity>,
}

impl Palette {
    fn clone_for_load(&self) -> Arc<Palette> {
        Arc::new(Palette {
            colors: self.colors.clone(),
            identity: Mutex::new(self.identity.lock().duplicate()),
        })
    }
}

fn main() {
    env_logger::init();
    global::reset();

    let scene = Scene::new(Arc::clone(global::singletons()));
    let registry = scene.registry();

    // Level one ships its own music player and HUD.
    let level_one = scene.spawn("level-one");
    let audio = scene.spawn_child("audio", level_one).expect("audio holder");
    let (player, _) = scene
        .attach_singleton(audio, MusicPlayer::default())
        .expect("first music player");
    if let Some(player) = player.upgrade() {
        *player.track.lock() = "overture".to_string();
    }
    scene
        .attach_singleton(level_one, HudController)
        .expect("first hud");
    println!(
        "music player lives under the persistent root: {}",
        scene.parent_of(audio) == Some(scene.persistent_root())
    );

    // Level two brings duplicates of both.
    let level_two = scene.spawn("level-two");
    let audio_two = scene.spawn_child("audio", level_two).expect("audio holder");
    let (_, music) = scene
        .attach_singleton(audio_two, MusicPlayer::default())
        .expect("music duplicate");
    let hud_holder = scene.spawn_child("hud", level_two).expect("hud holder");
    let (_, hud) = scene
        .attach_singleton(hud_holder, HudController)
        .expect("hud duplicate");
    println!(
        "second music player: {music:?}, its holder alive: {}",
        scene.is_alive(audio_two)
    );
    println!("second hud: {hud:?}, holder alive: {}", scene.is_alive(hud_holder));
    assert_eq!(music, Activation::Discarded(DuplicateAction::DiscardContainer));

    // A context transition keeps only what is persistent.
    let destroyed = scene.unload();
    println!("unloaded {destroyed} containers");

    let survivor = registry
        .get::<MusicPlayer, _>(&scene)
        .and_then(|instance| instance.upgrade());
    match survivor {
        Some(player) => println!("music still playing: {}", player.track.lock()),
        None => println!("music player was lost"),
    }
    let hud = registry.get_or_create::<HudController, _>(&scene, true);
    println!("hud recreated on demand: {:?}", hud.map(|hud| hud.container()));

    // Asset clones resolve back to the canonical palette.
    let identities = global::identities();
    let original = Arc::new(Palette {
        colors: vec![0xff0000, 0x00ff00],
        identity: Mutex::new(Identity::new(Guid::new("palette-main"))),
    });
    let loaded = original.clone_for_load();
    original.identity.lock().enable(identities, &original);
    loaded.identity.lock().enable(identities, &loaded);

    let source: Option<Arc<Palette>> = loaded.identity.lock().source(identities);
    println!(
        "clone resolves to original: {} ({} colors, {} holders)",
        source.is_some_and(|source| Arc::ptr_eq(&source, &original)),
        loaded.colors.len(),
        identities.ref_count("palette-main")
    );

    loaded.identity.lock().disable(identities);
    original.identity.lock().disable(identities);
    println!("holders after unload: {}", identities.ref_count("palette-main"));
}
