//! Benchmark for nanobot decisions and catalog validation.
//!
//! Run with: cargo bench --package rogue_wave_economy --bench nanobot_benchmark

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use rogue_wave_economy::{
    GameMode, NanobotConfig, NanobotManager, PlayerSnapshot, Recipe, RecipeCatalog, RecipeId, RecipeKind,
    RogueLiteContext,
};
use std::sync::Arc;

fn create_test_catalog() -> RecipeCatalog {
    let mut recipes = Vec::new();
    for i in 0..200u128 {
        let id = RecipeId::from_u128(i + 1);
        let kind = match i % 4 {
            0 => RecipeKind::Ammo { ammo_type: format!("ammo_{}", i % 8), amount: 10 },
            1 => RecipeKind::Health { heal_amount: (i % 50) as f32 + 5.0 },
            2 => RecipeKind::Tool { tool: format!("tool_{i}") },
            _ => RecipeKind::Generic { item: format!("item_{i}"), approx_frequency: 30.0 },
        };
        let mut recipe = Recipe::new(id, format!("Recipe_{i}"), kind).with_cost(5);
        // Chain every tenth recipe onto the previous one
        if i % 10 == 9 {
            recipe = recipe.with_dependency(RecipeId::from_u128(i));
        }
        recipes.push(recipe);
    }
    RecipeCatalog::new(recipes).unwrap()
}

fn benchmark_catalog_validation(c: &mut Criterion) {
    let catalog = create_test_catalog();
    c.bench_function("cycle_detection_200_recipes", |b| {
        b.iter(|| black_box(catalog.validate_no_cycles()));
    });
}

fn benchmark_decision(c: &mut Criterion) {
    let catalog = Arc::new(create_test_catalog());
    let mut ctx = RogueLiteContext::new(Arc::clone(&catalog), GameMode::new("Bench", "hub"));
    for recipe in catalog.iter() {
        ctx.add_run_recipe(&recipe.id);
    }
    ctx.add_resources(1_000_000);

    let mut player = PlayerSnapshot::new(100.0);
    for t in 0..8 {
        player = player.with_ammo(&format!("ammo_{t}"), 30, 40);
    }
    player.damage(33.0);

    let mut manager = NanobotManager::new(NanobotConfig::default(), 1);
    c.bench_function("nanobot_select_200_recipes", |b| {
        b.iter(|| black_box(manager.select(&ctx, &player)));
    });
}

criterion_group!(benches, benchmark_catalog_validation, benchmark_decision);
criterion_main!(benches);
