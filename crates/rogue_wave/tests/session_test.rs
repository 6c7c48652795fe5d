//! Integration test for the session: generation at run start, nanobot
//! builds reaching the host, deaths, level transitions and the shipped
//! data directory.

use rogue_wave::economy::{BuildOutput, PlayerSnapshot, ProfileStore, RecipeCatalog, RecipeId};
use rogue_wave::procedural::{CampaignLevel, GridCoord, LevelSeed, TileId};
use rogue_wave::{EventBus, EventReceiver, GameConfig, GameEvent, Session, SessionError, TransitionReason};
use std::path::PathBuf;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

const CATALOG: &str = r#"
[[recipe]]
id = "00000000-0000-0000-0000-0000000000b1"
name = "Pistol Rounds"
cost = 5
offer_weight = 0.0
kind = { type = "ammo", ammo_type = "pistol", amount = 20 }

[[recipe]]
id = "00000000-0000-0000-0000-0000000000b2"
name = "Pistol"
cost = 10
kind = { type = "weapon", weapon = "pistol", primary = true, ammo_recipe = "00000000-0000-0000-0000-0000000000b1" }

[[recipe]]
id = "00000000-0000-0000-0000-0000000000b3"
name = "Med Kit"
cost = 5
kind = { type = "health", heal_amount = 25.0 }

[[recipe]]
id = "00000000-0000-0000-0000-0000000000b4"
name = "Armour Plating"
max_stack = 3
kind = { type = "stat", stat = "armour", modifier = 5.0 }
"#;

const PROVING_GROUNDS: &str = r#"
[level]
name = "Proving Grounds"
x_size = 5
y_size = 5

[[tile]]
id = "player_spawn"
required = true
max_instances = 1
region = { bottom_left = [0.4, 0.4], top_right = [0.6, 0.6] }

[[tile]]
id = "plains"
weight = 3.0
enemy_spawn_chance = 0.5
"#;

const RIDGE: &str = r#"
[level]
name = "Ridge"
x_size = 7
y_size = 7
seed = 77

[[tile]]
id = "player_spawn"
required = true
max_instances = 1
region = { bottom_left = [0.4, 0.4], top_right = [0.6, 0.6] }

[[tile]]
id = "rocks"
terrain = "terrain"
enemy_spawn_chance = 1.0
"#;

const CONFIG: &str = r#"
[nanobots]
generic_jitter = 0.0

[levelling]
base_cost = 50
growth = 1.0

[session]
autosave_interval = 0.0
offers_per_level_up = 2

[[game_mode]]
name = "Campaign"
scene = "hub"
run_starting_recipes = ["00000000-0000-0000-0000-0000000000b2"]
"#;

const ROUNDS: RecipeId = RecipeId::from_u128(0xb1);
const PISTOL: RecipeId = RecipeId::from_u128(0xb2);
const MEDKIT: RecipeId = RecipeId::from_u128(0xb3);
const PLATING: RecipeId = RecipeId::from_u128(0xb4);

fn temp_store() -> ProfileStore {
    static NEXT: AtomicU32 = AtomicU32::new(0);
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    let n = NEXT.fetch_add(1, Ordering::Relaxed);
    ProfileStore::new(std::env::temp_dir().join(format!("rogue_wave_session_{nanos}_{n}")))
}

fn levels() -> Vec<CampaignLevel> {
    vec![
        CampaignLevel::from_toml_str(PROVING_GROUNDS).unwrap(),
        CampaignLevel::from_toml_str(RIDGE).unwrap(),
    ]
}

fn open(store: ProfileStore) -> (Session, EventReceiver) {
    let config = GameConfig::from_toml_str(CONFIG).unwrap();
    let catalog = Arc::new(RecipeCatalog::from_toml_str(CATALOG).unwrap());
    let (sender, receiver) = EventBus::create_pair(256);
    let session = Session::new(config, catalog, levels(), store, "tester", "Campaign", sender).unwrap();
    (session, receiver)
}

#[test]
fn test_start_run_generates_level_and_grants_recipes() {
    let (mut session, events) = open(temp_store());

    let level = session.start_run().unwrap().clone();
    assert_eq!(level.name, "Proving Grounds");
    assert_eq!(level.index, 0);
    assert_eq!(level.generated.grid.find(&TileId::from("player_spawn")), Some(GridCoord::new(2, 2)));
    assert!(level.generated.verify(session.levels()[0].palette()).is_empty());
    assert_eq!(level.loadout, vec![PISTOL]);

    let ctx = session.context();
    assert!(ctx.run().contains(&PISTOL));
    assert!(ctx.run().contains(&ROUNDS), "granted weapons bring their ammo");

    let received = events.drain();
    let generated = received
        .iter()
        .position(|e| matches!(e, GameEvent::LevelGenerated { name, .. } if name == "Proving Grounds"))
        .expect("level generated event");
    let started = received
        .iter()
        .position(|e| {
            matches!(
                e,
                GameEvent::RunStarted { run_number: 0, game_level: 0, loadout } if loadout == &vec![PISTOL]
            )
        })
        .expect("run started event");
    assert!(generated < started);
}

#[test]
fn test_level_seed_follows_run_number() {
    let (mut first, _) = open(temp_store());
    let (mut second, _) = open(temp_store());

    let grid_a = first.start_run().unwrap().generated.clone();
    let grid_b = second.start_run().unwrap().generated.clone();
    assert_eq!(grid_a, grid_b, "same configuration, same run, same level");

    let seed_before = first.level_seed(0);
    first.on_player_death().unwrap();
    assert_ne!(first.level_seed(0), seed_before);

    // Fixed-seed levels ignore the run number
    assert_eq!(first.level_seed(1), LevelSeed::new(77));
}

#[test]
fn test_nanobots_build_and_spawn_pickups() {
    let (mut session, events) = open(temp_store());
    session.start_run().unwrap();
    session.context_mut().add_resources(40);
    let _ = events.drain();

    let mut player = PlayerSnapshot::new(100.0).with_ammo("pistol", 4, 20);
    let mut pickups = Vec::new();
    let mut cues = Vec::new();
    for _ in 0..40 {
        session.tick(0.25, &player);
        for event in events.drain() {
            match event {
                GameEvent::PickupSpawned { output, .. } => {
                    player.apply(&output);
                    pickups.push(output);
                }
                GameEvent::BuildFinished { cue, .. } => cues.push(cue),
                _ => {}
            }
        }
    }

    assert_eq!(
        pickups,
        vec![
            BuildOutput::Weapon { weapon: "pistol".into() },
            BuildOutput::Ammo { ammo_type: "pistol".into(), amount: 20 },
        ]
    );
    assert_eq!(cues, vec!["nanobot_build_complete".to_string(); 2]);
    assert_eq!(session.context().persistent().resources(), 25);
    assert_eq!(session.nanobots().builds_completed(), 2);
}

#[test]
fn test_death_returns_to_hub_and_resets_run() {
    let store = temp_store();
    let root = store.root().to_path_buf();
    let (mut session, events) = open(store);
    session.start_run().unwrap();
    assert!(session.acquire_recipe(&PLATING, false));
    let _ = events.drain();

    session.on_player_death().unwrap();
    assert!(session.active_level().is_none());
    assert_eq!(session.context().run().count(&PLATING), 0);
    assert_eq!(session.context().persistent().run_number(), 1);
    assert_eq!(session.context().persistent().game_level(), 0);

    let received = events.drain();
    assert!(received.contains(&GameEvent::SceneTransition {
        scene: "hub".to_string(),
        reason: TransitionReason::Death,
    }));
    assert!(received.contains(&GameEvent::ProfileSaved {
        profile: "tester".to_string(),
    }));
    assert!(ProfileStore::new(root).exists("tester"));

    session.start_run().unwrap();
    assert!(events
        .drain()
        .iter()
        .any(|e| matches!(e, GameEvent::RunStarted { run_number: 1, game_level: 0, .. })));
}

#[test]
fn test_permanent_find_joins_the_running_level() {
    let (mut session, _events) = open(temp_store());
    session.start_run().unwrap();
    assert!(session.acquire_recipe(&PLATING, false));
    assert!(session.acquire_recipe(&PLATING, true));

    assert_eq!(session.context().run().count(&PLATING), 2);
    assert_eq!(session.context().persistent().count(&PLATING), 1);
    assert_eq!(session.context().temporary_count(&PLATING), 1);
}

#[test]
fn test_level_complete_advances_campaign() {
    let store = temp_store();
    let root = store.root().to_path_buf();
    let (mut session, events) = open(store);
    session.start_run().unwrap();
    assert!(session.acquire_recipe(&PLATING, false));
    let _ = events.drain();

    assert_eq!(session.on_level_complete().unwrap(), "Ridge");
    let received = events.drain();
    assert!(received.contains(&GameEvent::SceneTransition {
        scene: "Ridge".to_string(),
        reason: TransitionReason::LevelComplete,
    }));
    assert!(received.contains(&GameEvent::RecipeAcquired {
        recipe: PLATING,
        permanent: true,
    }));
    assert!(session.context().persistent().contains(&PLATING));
    assert_eq!(session.context().persistent().game_level(), 1);

    let level = session.start_run().unwrap().clone();
    assert_eq!(level.name, "Ridge");
    assert_eq!(level.index, 1);
    assert_eq!(level.generated.seed, LevelSeed::new(77));
    assert!(!level.encounters.spawners.is_empty());

    // The campaign repeats its last level
    assert_eq!(session.on_level_complete().unwrap(), "Ridge");
    assert_eq!(session.context().persistent().game_level(), 2);

    let (reopened, _) = open(ProfileStore::new(root));
    assert_eq!(reopened.context().persistent().game_level(), 2);
    assert!(reopened.context().persistent().contains(&PLATING));
}

#[test]
fn test_level_up_offers_and_acceptance() {
    let (mut session, events) = open(temp_store());
    session.start_run().unwrap();
    let _ = events.drain();

    let level_ups = session.collect_resources(60);
    assert_eq!(level_ups.len(), 1);
    assert_eq!(level_ups[0].level, 1);

    let mut offers = session.pending_offers().to_vec();
    offers.sort();
    assert_eq!(offers, vec![MEDKIT, PLATING], "owned recipes and zero weights are never offered");
    assert!(events
        .drain()
        .iter()
        .any(|e| matches!(e, GameEvent::NanobotLevelUp { level: 1, offers } if offers.len() == 2)));

    assert!(!session.accept_offer(&PISTOL), "not on offer");
    assert!(session.accept_offer(&MEDKIT));
    assert!(session.pending_offers().is_empty());
    assert!(session.context().run().contains(&MEDKIT));
    assert!(events.drain().contains(&GameEvent::RecipeAcquired {
        recipe: MEDKIT,
        permanent: false,
    }));
}

#[test]
fn test_open_errors() {
    let config = GameConfig::from_toml_str(CONFIG).unwrap();
    let catalog = Arc::new(RecipeCatalog::from_toml_str(CATALOG).unwrap());
    let (sender, _receiver) = EventBus::create_pair(8);

    let result = Session::new(
        config.clone(),
        Arc::clone(&catalog),
        levels(),
        temp_store(),
        "tester",
        "Arena",
        sender.clone(),
    );
    assert!(matches!(result, Err(SessionError::UnknownGameMode(mode)) if mode == "Arena"));

    let result = Session::new(config, catalog, Vec::new(), temp_store(), "tester", "Campaign", sender);
    assert!(matches!(result, Err(SessionError::NoLevels)));
}

#[test]
fn test_shipped_data_plays_through_campaign() {
    let data = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("data");
    let config = GameConfig::load(data.join("game.toml")).unwrap();
    let (sender, events) = EventBus::create_pair(config.session.event_capacity);
    let mut session = Session::open(&data, config, temp_store(), "shipped", "Campaign", sender).unwrap();

    for expected in ["Outskirts", "Foundry"] {
        let level = session.start_run().unwrap().clone();
        assert_eq!(level.name, expected);
        assert!(level.generated.grid.find(&TileId::from("player_spawn")).is_some());
        assert!(level.generated.verify(session.levels()[level.index].palette()).is_empty());
        assert!(!level.loadout.is_empty());
        session.on_level_complete().unwrap();
    }
    assert!(events.has_events());

    let (sender, _events) = EventBus::create_pair(64);
    let config = GameConfig::load(data.join("game.toml")).unwrap();
    let arsenal = Session::open(&data, config, temp_store(), "shipped", "Arsenal", sender).unwrap();
    assert_eq!(arsenal.context().game_mode().loadout_size, 3);
}
