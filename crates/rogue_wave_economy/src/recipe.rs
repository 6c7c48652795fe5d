//! # Recipes
//!
//! A recipe is an immutable, data-defined reward the nanobots can build:
//! ammunition, healing, shield charge, weapons, tools, generic pickups and
//! passive stat boosts.
//!
//! Kinds are a closed sum type. Every dispatch on a recipe is an exhaustive
//! `match` on [`RecipeKind`].
//!
//! ## TOML format
//!
//! ```toml
//! [[recipe]]
//! id = "5f0d6b36-3a0e-4a51-9a43-6f0f8a0bd1a1"
//! name = "Pistol Rounds"
//! cost = 15
//! build_time = 2.0
//! kind = { type = "ammo", ammo_type = "pistol", amount = 24 }
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::EconomyError;
use crate::player::PlayerStatus;

/// Stable recipe identifier, serialised as a hyphenated GUID string.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecipeId(Uuid);

impl RecipeId {
    /// Wraps a UUID.
    #[inline]
    #[must_use]
    pub const fn new(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Generates a fresh random id.
    #[must_use]
    pub fn random() -> Self {
        Self(Uuid::new_v4())
    }

    /// Builds an id from a 128-bit value. Handy for fixtures.
    #[inline]
    #[must_use]
    pub const fn from_u128(value: u128) -> Self {
        Self(Uuid::from_u128(value))
    }

    /// The underlying UUID.
    #[inline]
    #[must_use]
    pub const fn uuid(&self) -> Uuid {
        self.0
    }
}

impl fmt::Display for RecipeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.hyphenated())
    }
}

impl FromStr for RecipeId {
    type Err = EconomyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s)
            .map(Self)
            .map_err(|e| EconomyError::Parse {
                source_name: format!("recipe id {s:?}"),
                message: e.to_string(),
            })
    }
}

/// Optional audio/particle cue names played around a build.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildFeedback {
    /// Cue played when the build starts.
    pub start_cue: Option<String>,
    /// Cue played when the build completes.
    pub complete_cue: Option<String>,
}

/// What a recipe is, with only the fields that kind needs.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RecipeKind {
    /// Refills one ammunition type.
    Ammo {
        /// Ammunition type name.
        ammo_type: String,
        /// Rounds produced.
        amount: u32,
    },
    /// Restores health.
    Health {
        /// Health restored.
        heal_amount: f32,
    },
    /// Restores shield charge.
    Shield {
        /// Charge restored.
        charge_amount: f32,
    },
    /// Builds a weapon.
    Weapon {
        /// Weapon pickup name.
        weapon: String,
        /// Recipe that feeds this weapon.
        #[serde(default)]
        ammo_recipe: Option<RecipeId>,
        /// Primary weapons go to the front of the build order.
        #[serde(default)]
        primary: bool,
    },
    /// Builds a tool.
    Tool {
        /// Tool pickup name.
        tool: String,
    },
    /// Builds an item periodically.
    Generic {
        /// Item pickup name.
        item: String,
        /// Seconds between builds, before jitter.
        approx_frequency: f32,
    },
    /// Passive stat boost, applied while owned. Never built.
    Stat {
        /// Stat name.
        stat: String,
        /// Additive modifier.
        modifier: f32,
    },
}

/// Fieldless projection of [`RecipeKind`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecipeCategory {
    /// Ammunition.
    Ammo,
    /// Healing.
    Health,
    /// Shield charge.
    Shield,
    /// Weapon.
    Weapon,
    /// Tool.
    Tool,
    /// Periodic generic item.
    Generic,
    /// Passive stat boost.
    Stat,
}

impl RecipeKind {
    /// The fieldless category.
    #[must_use]
    pub const fn category(&self) -> RecipeCategory {
        match self {
            Self::Ammo { .. } => RecipeCategory::Ammo,
            Self::Health { .. } => RecipeCategory::Health,
            Self::Shield { .. } => RecipeCategory::Shield,
            Self::Weapon { .. } => RecipeCategory::Weapon,
            Self::Tool { .. } => RecipeCategory::Tool,
            Self::Generic { .. } => RecipeCategory::Generic,
            Self::Stat { .. } => RecipeCategory::Stat,
        }
    }
}

/// What the host should spawn or apply when a build finishes.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum BuildOutput {
    /// Ammunition pickup.
    Ammo {
        /// Ammunition type name.
        ammo_type: String,
        /// Rounds.
        amount: u32,
    },
    /// Health pickup.
    Heal {
        /// Health restored.
        amount: f32,
    },
    /// Shield charge pickup.
    ShieldCharge {
        /// Charge restored.
        amount: f32,
    },
    /// Weapon pickup.
    Weapon {
        /// Weapon name.
        weapon: String,
    },
    /// Tool pickup.
    Tool {
        /// Tool name.
        tool: String,
    },
    /// Generic item pickup.
    Item {
        /// Item name.
        item: String,
    },
}

/// A data-defined reward.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Recipe {
    /// Stable identifier.
    pub id: RecipeId,
    /// Display name.
    pub name: String,
    /// Display description.
    #[serde(default)]
    pub description: String,
    /// Resources spent when a build starts.
    #[serde(default)]
    pub cost: u32,
    /// Seconds to build.
    #[serde(default = "default_build_time")]
    pub build_time: f32,
    /// Copies that may be owned at once. 1 means non-stackable.
    #[serde(default = "default_max_stack")]
    pub max_stack: u32,
    /// Recipes that must be owned before this one is offered.
    #[serde(default)]
    pub dependencies: Vec<RecipeId>,
    /// Weight in level-up offers. 0 means never offered.
    #[serde(default = "default_offer_weight")]
    pub offer_weight: f32,
    /// Build cues.
    #[serde(default)]
    pub feedback: BuildFeedback,
    /// Kind-specific data.
    pub kind: RecipeKind,
}

const fn default_build_time() -> f32 {
    1.0
}

const fn default_max_stack() -> u32 {
    1
}

const fn default_offer_weight() -> f32 {
    1.0
}

impl Recipe {
    /// Creates a recipe with default cost, timing and stacking.
    #[must_use]
    pub fn new(id: RecipeId, name: impl Into<String>, kind: RecipeKind) -> Self {
        Self {
            id,
            name: name.into(),
            description: String::new(),
            cost: 0,
            build_time: default_build_time(),
            max_stack: default_max_stack(),
            dependencies: Vec::new(),
            offer_weight: default_offer_weight(),
            feedback: BuildFeedback::default(),
            kind,
        }
    }

    /// Sets the resource cost.
    #[must_use]
    pub const fn with_cost(mut self, cost: u32) -> Self {
        self.cost = cost;
        self
    }

    /// Sets the build time in seconds.
    #[must_use]
    pub fn with_build_time(mut self, seconds: f32) -> Self {
        self.build_time = seconds;
        self
    }

    /// Sets the stack limit.
    #[must_use]
    pub const fn with_max_stack(mut self, max_stack: u32) -> Self {
        self.max_stack = max_stack;
        self
    }

    /// Adds a dependency.
    #[must_use]
    pub fn with_dependency(mut self, dependency: RecipeId) -> Self {
        self.dependencies.push(dependency);
        self
    }

    /// Sets the offer weight.
    #[must_use]
    pub fn with_offer_weight(mut self, weight: f32) -> Self {
        self.offer_weight = weight;
        self
    }

    /// Sets the build cues.
    #[must_use]
    pub fn with_feedback(mut self, start: Option<&str>, complete: Option<&str>) -> Self {
        self.feedback = BuildFeedback {
            start_cue: start.map(str::to_string),
            complete_cue: complete.map(str::to_string),
        };
        self
    }

    /// The fieldless category.
    #[inline]
    #[must_use]
    pub const fn category(&self) -> RecipeCategory {
        self.kind.category()
    }

    /// True when more than one copy may be owned.
    #[inline]
    #[must_use]
    pub const fn is_stackable(&self) -> bool {
        self.max_stack > 1
    }

    /// Whether building this recipe now would help the player.
    #[must_use]
    pub fn should_build(&self, player: &impl PlayerStatus) -> bool {
        match &self.kind {
            RecipeKind::Ammo { ammo_type, .. } => player.ammo_fraction(ammo_type) < 1.0,
            RecipeKind::Health { .. } => player.missing_health() > 0.0,
            RecipeKind::Shield { .. } => !player.shield_recharging() && !player.shield_full(),
            RecipeKind::Weapon { weapon, .. } => !player.holds(weapon),
            RecipeKind::Tool { tool } => !player.holds(tool),
            RecipeKind::Generic { .. } => true,
            RecipeKind::Stat { .. } => false,
        }
    }

    /// What finishing a build produces. `None` for recipes that are never built.
    #[must_use]
    pub fn build_output(&self) -> Option<BuildOutput> {
        match &self.kind {
            RecipeKind::Ammo { ammo_type, amount } => Some(BuildOutput::Ammo {
                ammo_type: ammo_type.clone(),
                amount: *amount,
            }),
            RecipeKind::Health { heal_amount } => Some(BuildOutput::Heal {
                amount: *heal_amount,
            }),
            RecipeKind::Shield { charge_amount } => Some(BuildOutput::ShieldCharge {
                amount: *charge_amount,
            }),
            RecipeKind::Weapon { weapon, .. } => Some(BuildOutput::Weapon {
                weapon: weapon.clone(),
            }),
            RecipeKind::Tool { tool } => Some(BuildOutput::Tool { tool: tool.clone() }),
            RecipeKind::Generic { item, .. } => Some(BuildOutput::Item { item: item.clone() }),
            RecipeKind::Stat { .. } => None,
        }
    }

    /// The ammo recipe a weapon cascades, if any.
    #[must_use]
    pub const fn ammo_recipe(&self) -> Option<RecipeId> {
        match &self.kind {
            RecipeKind::Weapon { ammo_recipe, .. } => *ammo_recipe,
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::player::PlayerSnapshot;

    #[test]
    fn test_recipe_id_text_round_trip() {
        let id = RecipeId::from_u128(0x5f0d_6b36_3a0e_4a51_9a43_6f0f_8a0b_d1a1);
        let text = id.to_string();
        assert_eq!(text, "5f0d6b36-3a0e-4a51-9a43-6f0f8a0bd1a1");
        assert_eq!(text.parse::<RecipeId>().unwrap(), id);
        assert!("not-a-guid".parse::<RecipeId>().is_err());
    }

    #[test]
    fn test_parse_tagged_kind() {
        let text = r#"
            id = "5f0d6b36-3a0e-4a51-9a43-6f0f8a0bd1a1"
            name = "Pistol Rounds"
            cost = 15
            kind = { type = "ammo", ammo_type = "pistol", amount = 24 }
        "#;
        let recipe: Recipe = toml::from_str(text).unwrap();
        assert_eq!(recipe.category(), RecipeCategory::Ammo);
        assert_eq!(recipe.max_stack, 1);
        assert_eq!(recipe.build_time, 1.0);
        assert!(recipe.feedback.start_cue.is_none());
    }

    #[test]
    fn test_should_build_per_kind() {
        let mut player = PlayerSnapshot::new(100.0)
            .with_ammo("pistol", 10, 40)
            .with_item("blaster");
        player.health = 60.0;

        let ammo = Recipe::new(
            RecipeId::from_u128(1),
            "rounds",
            RecipeKind::Ammo { ammo_type: "pistol".into(), amount: 10 },
        );
        let heal = Recipe::new(RecipeId::from_u128(2), "medkit", RecipeKind::Health { heal_amount: 25.0 });
        let shield = Recipe::new(RecipeId::from_u128(3), "cell", RecipeKind::Shield { charge_amount: 0.5 });
        let owned_weapon = Recipe::new(
            RecipeId::from_u128(4),
            "blaster",
            RecipeKind::Weapon { weapon: "blaster".into(), ammo_recipe: None, primary: true },
        );
        let stat = Recipe::new(
            RecipeId::from_u128(5),
            "armour",
            RecipeKind::Stat { stat: "armour".into(), modifier: 5.0 },
        );

        assert!(ammo.should_build(&player));
        assert!(heal.should_build(&player));
        assert!(!shield.should_build(&player), "shield starts full");
        assert!(!owned_weapon.should_build(&player));
        assert!(!stat.should_build(&player));
        assert!(stat.build_output().is_none());

        player.shield = 0.2;
        assert!(shield.should_build(&player));
        player.shield_recharging = true;
        assert!(!shield.should_build(&player));
    }
}
