//! # Nanobot Levelling and Recipe Offers
//!
//! Collecting resources levels the nanobots up. Each level-up offers the
//! player a handful of recipes drawn by weight from those they are eligible
//! for.

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::recipe::{Recipe, RecipeId};
use crate::rogue_lite::RogueLiteContext;

/// Levelling curve: level `n` costs `base_cost * growth^n` resources.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LevellingConfig {
    /// Resources needed to go from level 0 to level 1.
    pub base_cost: u32,
    /// Multiplier applied per level.
    pub growth: f32,
    /// Highest reachable level.
    pub max_level: u32,
}

impl Default for LevellingConfig {
    fn default() -> Self {
        Self {
            base_cost: 100,
            growth: 1.25,
            max_level: 50,
        }
    }
}

impl LevellingConfig {
    /// Resources needed to advance from `level` to `level + 1`. Never zero.
    #[must_use]
    pub fn resources_for_level(&self, level: u32) -> u32 {
        let exponent = i32::try_from(level).unwrap_or(i32::MAX);
        let cost = f64::from(self.base_cost) * f64::from(self.growth).powi(exponent);
        if cost >= f64::from(u32::MAX) {
            return u32::MAX;
        }
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let cost = cost.round() as u32;
        cost.max(1)
    }
}

/// A nanobot level reached.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelUp {
    /// The new level.
    pub level: u32,
}

/// Weighted recipe offers.
pub struct RecipeOffers;

impl RecipeOffers {
    /// True when the recipe may be offered: positive weight, every
    /// dependency owned and room left in its stack.
    #[must_use]
    pub fn is_eligible(ctx: &RogueLiteContext, recipe: &Recipe) -> bool {
        recipe.offer_weight > 0.0
            && recipe.dependencies.iter().all(|d| ctx.owns(d))
            && ctx.owned_count(&recipe.id) < recipe.max_stack
    }

    /// Draws up to `count` distinct eligible recipes, without replacement.
    pub fn roll(ctx: &RogueLiteContext, count: usize, rng: &mut impl Rng) -> Vec<RecipeId> {
        let mut pool: Vec<(RecipeId, f32)> = ctx
            .catalog()
            .iter()
            .filter(|r| Self::is_eligible(ctx, r))
            .map(|r| (r.id, r.offer_weight))
            .collect();

        let mut offers = Vec::with_capacity(count.min(pool.len()));
        while offers.len() < count && !pool.is_empty() {
            let total: f32 = pool.iter().map(|(_, w)| w).sum();
            let mut roll = rng.gen::<f32>() * total;
            let mut chosen = pool.len() - 1;
            for (i, (_, weight)) in pool.iter().enumerate() {
                if roll < *weight {
                    chosen = i;
                    break;
                }
                roll -= weight;
            }
            offers.push(pool.swap_remove(chosen).0);
        }

        tracing::debug!("Rolled {} recipe offers", offers.len());
        offers
    }

    /// Accepts an offer into the current run.
    pub fn accept(ctx: &mut RogueLiteContext, id: &RecipeId) -> bool {
        ctx.add_run_recipe(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::RecipeCatalog;
    use crate::data::GameMode;
    use crate::recipe::RecipeKind;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;
    use std::sync::Arc;

    fn tool(n: u128) -> Recipe {
        Recipe::new(RecipeId::from_u128(n), format!("tool-{n}"), RecipeKind::Tool { tool: format!("t{n}") })
    }

    fn context() -> RogueLiteContext {
        let catalog = RecipeCatalog::new(vec![
            tool(1),
            tool(2).with_dependency(RecipeId::from_u128(1)),
            tool(3).with_offer_weight(0.0),
            tool(4).with_offer_weight(5.0),
        ])
        .unwrap();
        RogueLiteContext::new(Arc::new(catalog), GameMode::new("Campaign", "hub"))
    }

    #[test]
    fn test_levelling_curve() {
        let config = LevellingConfig { base_cost: 100, growth: 1.5, max_level: 10 };
        assert_eq!(config.resources_for_level(0), 100);
        assert_eq!(config.resources_for_level(1), 150);
        assert_eq!(config.resources_for_level(2), 225);
    }

    #[test]
    fn test_offers_respect_eligibility() {
        let mut ctx = context();
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        for _ in 0..50 {
            let offers = RecipeOffers::roll(&ctx, 3, &mut rng);
            assert_eq!(offers.len(), 2);
            assert!(!offers.contains(&RecipeId::from_u128(2)), "dependency not owned");
            assert!(!offers.contains(&RecipeId::from_u128(3)), "zero weight");
        }

        assert!(RecipeOffers::accept(&mut ctx, &RecipeId::from_u128(1)));
        let offers = RecipeOffers::roll(&ctx, 5, &mut rng);
        let mut sorted = offers.clone();
        sorted.sort();
        assert_eq!(sorted, vec![RecipeId::from_u128(2), RecipeId::from_u128(4)]);
    }

    #[test]
    fn test_offers_are_weighted() {
        let ctx = context();
        let mut rng = ChaCha8Rng::seed_from_u64(9);
        let heavy = (0..1000)
            .filter(|_| RecipeOffers::roll(&ctx, 1, &mut rng) == vec![RecipeId::from_u128(4)])
            .count();
        // 5:1 odds
        assert!(heavy > 750, "heavy offer drawn {heavy} times");
    }
}
