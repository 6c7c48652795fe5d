//! # Rogue Wave Simulator
//!
//! Headless driver that plays scripted runs against a data directory and
//! prints what happened. Useful for balancing and for checking data files.
//!
//! ## Usage
//!
//! ```bash
//! # Five runs with the shipped data
//! rogue_wave_sim
//!
//! # Twenty short runs on a throwaway profile
//! rogue_wave_sim --runs 20 --seconds 60 --profile-dir /tmp/rw --profile balance
//!
//! # Custom balance file, verbose logging
//! rogue_wave_sim --config my_game.toml --verbose
//! ```

use anyhow::{Context, Result};
use clap::Parser;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rogue_wave::economy::{BuildOutput, PlayerSnapshot, ProfileStore, Recipe};
use rogue_wave::{EventBus, EventReceiver, GameConfig, GameEvent, Session};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

// ============================================================================
// CLI Arguments
// ============================================================================

#[derive(Parser, Debug)]
#[command(name = "rogue_wave_sim")]
#[command(about = "Plays scripted Rogue Wave runs headlessly")]
#[command(version)]
struct Args {
    /// Data directory holding game.toml, Recipes/ and levels/
    #[arg(short, long)]
    data: Option<PathBuf>,

    /// Game configuration (defaults to <data>/game.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Profile directory (defaults to the user data directory)
    #[arg(long)]
    profile_dir: Option<PathBuf>,

    /// Profile name
    #[arg(short, long, default_value = "sim")]
    profile: String,

    /// Game mode
    #[arg(short, long, default_value = "Campaign")]
    mode: String,

    /// Runs to play
    #[arg(short, long, default_value = "5")]
    runs: u32,

    /// Seconds survived before a level counts as cleared
    #[arg(long, default_value = "120")]
    seconds: f32,

    /// Simulation step in seconds
    #[arg(long, default_value = "0.1")]
    dt: f32,

    /// Seed for the scripted player
    #[arg(long, default_value = "7")]
    seed: u64,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

impl Args {
    fn validate(&self) -> Result<()> {
        anyhow::ensure!(
            self.dt.is_finite() && self.dt > 0.0,
            "--dt must be a positive number of seconds, got {}",
            self.dt
        );
        anyhow::ensure!(
            self.seconds.is_finite() && self.seconds >= 0.0,
            "--seconds must not be negative, got {}",
            self.seconds
        );
        Ok(())
    }
}

// ============================================================================
// Scripted Player
// ============================================================================

/// Weapon pickup name, ammo type, ammo capacity.
const WEAPON_AMMO: &[(&str, &str, u32)] = &[
    ("pistol", "pistol", 96),
    ("shotgun", "shotgun", 24),
    ("pulse_rifle", "pulse", 160),
];

const MAX_HEALTH: f32 = 100.0;
const FIRE_INTERVAL: f32 = 0.5;
const HITS_PER_SECOND: f32 = 0.4;
const SHIELD_PER_HIT: f32 = 0.25;
const PICKUPS_PER_SECOND: f32 = 0.5;

struct ScriptedPlayer {
    snapshot: PlayerSnapshot,
    firing: Option<&'static str>,
    fire_timer: f32,
}

impl ScriptedPlayer {
    fn new() -> Self {
        let snapshot = WEAPON_AMMO
            .iter()
            .fold(PlayerSnapshot::new(MAX_HEALTH), |player, (_, ammo, max)| {
                player.with_ammo(ammo, max / 4, *max)
            });
        Self {
            snapshot,
            firing: None,
            fire_timer: 0.0,
        }
    }

    /// Picks up a build and switches to a newly built weapon.
    fn pick_up(&mut self, output: &BuildOutput) {
        self.snapshot.apply(output);
        if let BuildOutput::Weapon { weapon } = output {
            if let Some((_, ammo, _)) = WEAPON_AMMO.iter().find(|(name, _, _)| *name == weapon.as_str()) {
                self.firing = Some(*ammo);
            }
        }
    }

    fn step(&mut self, dt: f32, rng: &mut ChaCha8Rng) {
        self.fire_timer += dt;
        while self.fire_timer >= FIRE_INTERVAL {
            self.fire_timer -= FIRE_INTERVAL;
            if let Some(ammo) = self.firing {
                self.snapshot.fire(ammo, 1);
            }
        }

        if rng.gen_bool(chance(HITS_PER_SECOND, dt)) {
            let damage: f32 = rng.gen_range(5.0..20.0);
            if self.snapshot.shield > 0.0 {
                self.snapshot.shield = (self.snapshot.shield - SHIELD_PER_HIT).max(0.0);
            } else {
                self.snapshot.damage(damage);
            }
        }
    }
}

fn chance(per_second: f32, dt: f32) -> f64 {
    f64::from((per_second * dt).clamp(0.0, 1.0))
}

// ============================================================================
// Summary
// ============================================================================

#[derive(Default)]
struct Summary {
    runs: u32,
    levels_cleared: u32,
    deaths: u32,
    builds: u32,
    pickups: u32,
    level_ups: u32,
    offers_accepted: u32,
    saves: u32,
}

impl Summary {
    fn print(&self, session: &Session) {
        let persistent = session.context().persistent();
        let catalog = session.context().catalog();

        println!("Rogue Wave simulation, profile {:?}", session.profile());
        println!(
            "  runs {} | cleared {} | deaths {}",
            self.runs, self.levels_cleared, self.deaths
        );
        println!(
            "  builds {} | pickups {} | level-ups {} | offers taken {} | saves {}",
            self.builds, self.pickups, self.level_ups, self.offers_accepted, self.saves
        );
        println!(
            "  next run {} | campaign level {} | nanobot level {} | resources {}",
            persistent.run_number(),
            persistent.game_level(),
            persistent.nanobot_level(),
            persistent.resources()
        );
        println!("  permanent recipes:");
        for recipe in catalog.iter().filter(|r| persistent.contains(&r.id)) {
            println!("    {} x{}", recipe.name, persistent.count(&recipe.id));
        }
    }
}

// ============================================================================
// Main
// ============================================================================

fn main() -> Result<()> {
    let args = Args::parse();
    args.validate()?;

    let filter = if args.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    let data = args
        .data
        .clone()
        .unwrap_or_else(|| PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("data"));
    let config_path = args.config.clone().unwrap_or_else(|| data.join("game.toml"));
    let config = GameConfig::load(&config_path)
        .with_context(|| format!("loading {}", config_path.display()))?;

    let store = match &args.profile_dir {
        Some(dir) => ProfileStore::new(dir),
        None => ProfileStore::user_default()?,
    };
    tracing::info!("Profiles stored in {}", store.root().display());

    let (sender, receiver) = EventBus::create_pair(config.session.event_capacity);
    let mut session = Session::open(&data, config, store, &args.profile, &args.mode, sender)
        .with_context(|| format!("opening session over {}", data.display()))?;

    let mut rng = ChaCha8Rng::seed_from_u64(args.seed);
    let mut summary = Summary::default();
    for _ in 0..args.runs {
        play_run(&mut session, &receiver, &args, &mut rng, &mut summary)?;
    }

    summary.print(&session);
    Ok(())
}

fn play_run(
    session: &mut Session,
    events: &EventReceiver,
    args: &Args,
    rng: &mut ChaCha8Rng,
    summary: &mut Summary,
) -> Result<()> {
    let level = session.start_run()?;
    tracing::info!(
        "Playing {} ({} spawners over {} waves)",
        level.name,
        level.encounters.spawners.len(),
        level.encounters.wave_count()
    );

    let mut player = ScriptedPlayer::new();
    handle_events(session, events, &mut player, summary);

    let mut elapsed = 0.0;
    while elapsed < args.seconds {
        session.tick(args.dt, &player.snapshot);
        player.step(args.dt, rng);
        if rng.gen_bool(chance(PICKUPS_PER_SECOND, args.dt)) {
            session.collect_resources(rng.gen_range(5..=15));
        }
        handle_events(session, events, &mut player, summary);

        if player.snapshot.is_dead() {
            tracing::info!("Died after {:.1}s", elapsed);
            summary.deaths += 1;
            session.on_player_death()?;
            handle_events(session, events, &mut player, summary);
            return Ok(());
        }
        elapsed += args.dt;
    }

    let next = session.on_level_complete()?;
    tracing::info!("Level cleared, next up: {}", next);
    summary.levels_cleared += 1;
    handle_events(session, events, &mut player, summary);
    Ok(())
}

fn handle_events(
    session: &mut Session,
    events: &EventReceiver,
    player: &mut ScriptedPlayer,
    summary: &mut Summary,
) {
    for event in events.drain() {
        tracing::debug!("{:?}", event);
        match event {
            GameEvent::RunStarted { loadout, .. } => {
                summary.runs += 1;
                let catalog = session.context().catalog_handle();
                for output in loadout
                    .iter()
                    .filter_map(|id| catalog.get(id).and_then(Recipe::build_output))
                {
                    player.pick_up(&output);
                }
            }
            GameEvent::BuildStarted { .. } => summary.builds += 1,
            GameEvent::PickupSpawned { output, .. } => {
                summary.pickups += 1;
                player.pick_up(&output);
            }
            GameEvent::NanobotLevelUp { offers, .. } => {
                summary.level_ups += 1;
                if offers.first().is_some_and(|choice| session.accept_offer(choice)) {
                    summary.offers_accepted += 1;
                }
            }
            GameEvent::ProfileSaved { .. } => summary.saves += 1,
            _ => {}
        }
    }
}
