//! Integration test for run progression: catalog, reconciliation, nanobot
//! builds and profile persistence working together.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rogue_wave_economy::{
    BuildPriority, GameMode, NanobotConfig, NanobotEvent, NanobotManager, PersistentData, PlayerSnapshot,
    PlayerStatus, ProfileStore, RecipeCatalog, RecipeId, RogueLiteContext,
};
use std::sync::Arc;

const CATALOG: &str = r#"
[[recipe]]
id = "00000000-0000-0000-0000-0000000000a1"
name = "Pistol Rounds"
cost = 5
build_time = 1.0
kind = { type = "ammo", ammo_type = "pistol", amount = 20 }

[[recipe]]
id = "00000000-0000-0000-0000-0000000000a2"
name = "Pistol"
cost = 20
build_time = 2.0
feedback = { start_cue = "forge_weapon" }
kind = { type = "weapon", weapon = "pistol", primary = true, ammo_recipe = "00000000-0000-0000-0000-0000000000a1" }

[[recipe]]
id = "00000000-0000-0000-0000-0000000000a3"
name = "Med Kit"
cost = 10
build_time = 1.5
kind = { type = "health", heal_amount = 40.0 }

[[recipe]]
id = "00000000-0000-0000-0000-0000000000a4"
name = "Armour Plating"
max_stack = 3
kind = { type = "stat", stat = "armour", modifier = 5.0 }

[[recipe]]
id = "00000000-0000-0000-0000-0000000000a5"
name = "Scanner"
cost = 15
dependencies = ["00000000-0000-0000-0000-0000000000a2"]
kind = { type = "tool", tool = "scanner" }
"#;

fn id(text: &str) -> RecipeId {
    text.parse().unwrap()
}

fn temp_store() -> ProfileStore {
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    ProfileStore::new(std::env::temp_dir().join(format!("rogue_wave_progression_{nanos}")))
}

fn game_mode() -> GameMode {
    let mut mode = GameMode::new("Campaign", "hub");
    mode.run_starting_recipes = vec![id("00000000-0000-0000-0000-0000000000a2")];
    mode
}

#[test]
fn test_full_run_cycle_persists_progress() {
    let catalog = Arc::new(RecipeCatalog::from_toml_str(CATALOG).unwrap());
    let pistol = id("00000000-0000-0000-0000-0000000000a2");
    let rounds = id("00000000-0000-0000-0000-0000000000a1");
    let medkit = id("00000000-0000-0000-0000-0000000000a3");
    let plating = id("00000000-0000-0000-0000-0000000000a4");

    let mut ctx = RogueLiteContext::new(Arc::clone(&catalog), game_mode());
    let report = ctx.pre_spawn_step();
    assert!(report.run_recipes.contains(&pistol));
    assert!(report.run_recipes.contains(&rounds), "granted weapons bring their ammo");
    assert_eq!(report.loadout, vec![pistol]);

    ctx.add_resources(100);
    assert!(ctx.add_run_recipe(&medkit));
    assert!(ctx.add_run_recipe(&plating));

    // A hurt player without the pistol: the pistol is a power-up, the
    // medkit outranks it
    let mut player = PlayerSnapshot::new(100.0).with_ammo("pistol", 40, 40);
    player.damage(30.0);

    let mut nanobots = NanobotManager::new(NanobotConfig::default(), 42);
    let mut priorities = Vec::new();
    for _ in 0..40 {
        for event in nanobots.tick(0.25, &mut ctx, &player) {
            match event {
                NanobotEvent::BuildStarted { priority, .. } => priorities.push(priority),
                NanobotEvent::BuildFinished { output: Some(output), .. } => player.apply(&output),
                _ => {}
            }
        }
    }
    assert_eq!(priorities.first(), Some(&BuildPriority::Health));
    assert!(priorities.contains(&BuildPriority::PowerUp));
    assert!(player.holds("pistol"));
    assert_eq!(player.health, 100.0);

    let folded = ctx.complete_run();
    assert!(folded.contains(&pistol));
    assert!(folded.contains(&plating));

    let store = temp_store();
    assert!(ctx.save_if_dirty(&store, "tester").unwrap());
    assert!(!ctx.is_dirty());
    assert!(!ctx.save_if_dirty(&store, "tester").unwrap(), "nothing new to save");

    let mut restored = RogueLiteContext::new(catalog, game_mode());
    assert!(restored.load_profile(&store, "tester").unwrap());
    assert_eq!(restored.persistent().recipes(), ctx.persistent().recipes());
    assert_eq!(restored.persistent().resources(), ctx.persistent().resources());
    assert_eq!(restored.persistent().game_level(), 1);
    assert_eq!(restored.persistent().weapon_build_order(), &[pistol]);
    assert!(!restored.is_dirty());

    restored.pre_spawn_step();
    assert_eq!(restored.run().count(&pistol), 1, "permanent and starting pistol merge");

    std::fs::remove_dir_all(store.root()).unwrap();
}

#[test]
fn test_unknown_ids_in_profile_are_dropped() {
    let store = temp_store();
    std::fs::create_dir_all(store.root()).unwrap();
    std::fs::write(
        store.path_for("legacy").unwrap(),
        r#"{
            "version": 1,
            "recipes": ["00000000-0000-0000-0000-0000000000a4", "ffffffff-0000-0000-0000-000000000000"],
            "weapon_build_order": [],
            "resources": 12
        }"#,
    )
    .unwrap();

    let catalog = Arc::new(RecipeCatalog::from_toml_str(CATALOG).unwrap());
    let mut ctx = RogueLiteContext::new(catalog, game_mode());
    assert!(ctx.load_profile(&store, "legacy").unwrap());
    assert_eq!(ctx.persistent().recipes(), &[id("00000000-0000-0000-0000-0000000000a4")]);
    assert_eq!(ctx.persistent().resources(), 12);
    assert!(ctx.is_dirty(), "repaired data needs saving");

    let mut fresh = RogueLiteContext::new(ctx.catalog_handle(), game_mode());
    assert!(!fresh.load_profile(&store, "nobody").unwrap());
    assert_eq!(fresh.persistent(), &PersistentData::default());

    std::fs::remove_dir_all(store.root()).unwrap();
}

#[test]
fn test_stack_limits_hold_under_random_acquisition() {
    let catalog = Arc::new(RecipeCatalog::from_toml_str(CATALOG).unwrap());
    let ids: Vec<RecipeId> = catalog.iter().map(|r| r.id).collect();
    let mut rng = ChaCha8Rng::seed_from_u64(2024);
    let mut ctx = RogueLiteContext::new(Arc::clone(&catalog), game_mode());

    for step in 0..500 {
        let pick = ids[rng.gen_range(0..ids.len())];
        match rng.gen_range(0..6) {
            0 | 1 => {
                ctx.add_run_recipe(&pick);
            }
            2 => {
                ctx.add_permanent_recipe(&pick);
            }
            3 => {
                ctx.make_permanent(&pick);
            }
            4 => {
                ctx.pre_spawn_step();
            }
            _ => {
                if step % 7 == 0 {
                    ctx.on_death();
                } else {
                    ctx.complete_run();
                }
            }
        }

        for recipe in catalog.iter() {
            assert!(ctx.persistent().count(&recipe.id) <= recipe.max_stack);
            assert!(ctx.run().count(&recipe.id) <= recipe.max_stack);
        }
    }
}
