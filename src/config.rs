//! Game Configuration
//!
//! Immutable tuning data loaded once at startup. Every field has a default
//! matching the shipped balance, and JSON files may override any subset of
//! fields. A config is validated before the engine sees it; an invalid one is
//! a startup error, never a runtime one.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::game::inventory::{ItemKind, Targeting};
use crate::game::pill::{PillType, ShapeId};

/// Configuration loading and validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Config file could not be read
    #[error("failed to read config file {path}: {source}")]
    Io {
        /// Path that failed
        path: String,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// Config file is not valid JSON for this schema
    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),

    /// Config parsed but breaks a rule the engine relies on
    #[error("invalid config: {}", .0.join("; "))]
    Invalid(Vec<String>),
}

// =============================================================================
// SECTIONS
// =============================================================================

/// Player count limits for a match.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchRules {
    /// Players required before play can start
    pub min_players: usize,
    /// Lobby capacity
    pub max_players: usize,
}

impl Default for MatchRules {
    fn default() -> Self {
        Self { min_players: 2, max_players: 6 }
    }
}

/// Phase and turn timers, in seconds.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimerConfig {
    /// Time a player has to act on their turn
    pub turn_secs: u32,
    /// Loadout selection window
    pub draft_secs: u32,
    /// Between-round shop window
    pub shopping_secs: u32,
    /// Artificial delay before a bot acts
    pub bot_timeout_secs: u32,
}

impl Default for TimerConfig {
    fn default() -> Self {
        Self {
            turn_secs: 30,
            draft_secs: 60,
            shopping_secs: 30,
            bot_timeout_secs: 5,
        }
    }
}

/// Lives and resistance.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HealthConfig {
    /// Lives a player joins with
    pub initial_lives: u8,
    /// Upper bound for lives (LIFE pills cannot exceed it)
    pub max_lives: u8,
    /// Resistance a player joins with
    pub initial_resistance: i32,
    /// Resistance ceiling per life, also the ceiling for banked overflow
    pub resistance_cap: i32,
    /// Resistance restored after a collapse
    pub collapse_reset: i32,
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            initial_lives: 3,
            max_lives: 3,
            initial_resistance: 6,
            resistance_cap: 6,
            collapse_reset: 6,
        }
    }
}

/// Probability curve for one pill type.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct PillDistribution {
    /// First round the type may appear in
    pub unlock_round: u32,
    /// Share at round 1 (or at unlock)
    pub initial_pct: f64,
    /// Share once the horizon is reached
    pub final_pct: f64,
}

impl PillDistribution {
    const fn new(unlock_round: u32, initial_pct: f64, final_pct: f64) -> Self {
        Self { unlock_round, initial_pct, final_pct }
    }
}

/// Pool sizing, distribution and shape diversity.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolConfig {
    /// Pool size at round 1
    pub base_size: usize,
    /// Pool grows by one pill every N rounds
    pub increment_every_n_rounds: u32,
    /// Pool size ceiling
    pub max_size: usize,
    /// Distinct shapes every pool must contain
    pub min_shape_diversity: usize,
    /// Round at which the distribution reaches its final shares
    pub distribution_horizon: u32,
    /// Full shape redraws attempted before falling back to injection
    pub shape_redraw_attempts: u32,
    /// Per-type distribution curves
    pub distribution: BTreeMap<PillType, PillDistribution>,
}

impl Default for PoolConfig {
    fn default() -> Self {
        let distribution = BTreeMap::from([
            (PillType::Safe, PillDistribution::new(1, 0.45, 0.15)),
            (PillType::DmgLow, PillDistribution::new(1, 0.40, 0.20)),
            (PillType::DmgHigh, PillDistribution::new(3, 0.0, 0.25)),
            (PillType::Heal, PillDistribution::new(2, 0.10, 0.15)),
            (PillType::Fatal, PillDistribution::new(6, 0.0, 0.18)),
            (PillType::Life, PillDistribution::new(5, 0.05, 0.13)),
        ]);

        Self {
            base_size: 6,
            increment_every_n_rounds: 3,
            max_size: 12,
            min_shape_diversity: 3,
            distribution_horizon: 10,
            shape_redraw_attempts: 8,
            distribution,
        }
    }
}

/// A base shape and the round it unlocks at.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShapeUnlock {
    /// Shape name
    pub shape: ShapeId,
    /// First round it may appear in
    pub unlock_round: u32,
}

/// Event-limited shape.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeasonalShape {
    /// Shape name
    pub shape: ShapeId,
    /// Season label (`christmas`, `halloween`, ...)
    pub season: String,
    /// Only enabled seasonal shapes are ever unlocked
    pub enabled: bool,
}

/// Shape catalog.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShapeConfig {
    /// Round-gated shapes
    pub base: Vec<ShapeUnlock>,
    /// Seasonal shapes, available from round 1 while enabled
    pub seasonal: Vec<SeasonalShape>,
}

impl Default for ShapeConfig {
    fn default() -> Self {
        let unlock = |shape: &str, unlock_round: u32| ShapeUnlock {
            shape: ShapeId::from(shape),
            unlock_round,
        };
        let seasonal = |shape: &str, season: &str| SeasonalShape {
            shape: ShapeId::from(shape),
            season: season.to_string(),
            enabled: false,
        };

        let mut base: Vec<ShapeUnlock> = [
            "capsule", "round", "triangle", "oval", "cross", "heart",
            "flower", "star", "coin", "gem", "fruit",
        ]
        .into_iter()
        .map(|shape| unlock(shape, 1))
        .collect();
        base.extend([
            unlock("pumpkin", 3),
            unlock("skull", 3),
            unlock("bear", 5),
            unlock("domino", 7),
            unlock("pineapple", 8),
        ]);

        Self {
            base,
            seasonal: vec![
                seasonal("christmas-tree", "christmas"),
                seasonal("snowflake", "christmas"),
                seasonal("pumpkin-lantern", "halloween"),
            ],
        }
    }
}

/// Base effect values per pill type plus item effect magnitudes.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EffectValues {
    /// SAFE
    pub safe: i32,
    /// DMG_LOW
    pub dmg_low: i32,
    /// DMG_HIGH
    pub dmg_high: i32,
    /// HEAL
    pub heal: i32,
    /// FATAL
    pub fatal: i32,
    /// LIFE (lives, not resistance)
    pub life: i32,
    /// Resistance restored by a Pocket Pill
    pub pocket_pill_heal: i32,
    /// Rounds a Shield lasts if not consumed by damage
    pub shield_rounds: u32,
}

impl Default for EffectValues {
    fn default() -> Self {
        Self {
            safe: 0,
            dmg_low: -2,
            dmg_high: -4,
            heal: 2,
            fatal: -999,
            life: 1,
            pocket_pill_heal: 2,
            shield_rounds: 1,
        }
    }
}

impl EffectValues {
    /// Base value for a pill type.
    pub fn base_value(&self, pill_type: PillType) -> i32 {
        match pill_type {
            PillType::Safe => self.safe,
            PillType::DmgLow => self.dmg_low,
            PillType::DmgHigh => self.dmg_high,
            PillType::Heal => self.heal,
            PillType::Fatal => self.fatal,
            PillType::Life => self.life,
        }
    }
}

/// Catalog entry for an item.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemConfig {
    /// Price in pill coins
    pub cost: u32,
    /// What the item must be aimed at
    pub targeting: Targeting,
    /// Several units may share one slot
    pub stackable: bool,
    /// Units per slot (1 for non-stackable items)
    pub stack_limit: u32,
}

fn default_items() -> BTreeMap<ItemKind, ItemConfig> {
    let item = |cost, targeting, stack_limit| ItemConfig {
        cost,
        targeting,
        stackable: stack_limit > 1,
        stack_limit,
    };

    BTreeMap::from([
        (ItemKind::Scanner, item(15, Targeting::Pill, 3)),
        (ItemKind::ShapeScanner, item(20, Targeting::Shape, 2)),
        (ItemKind::Inverter, item(25, Targeting::Pill, 1)),
        (ItemKind::Double, item(25, Targeting::Pill, 1)),
        (ItemKind::PocketPill, item(20, Targeting::SelfOnly, 3)),
        (ItemKind::Shield, item(30, Targeting::SelfOnly, 1)),
        (ItemKind::Handcuffs, item(30, Targeting::Opponent, 2)),
        (ItemKind::ForceFeed, item(35, Targeting::PillAndOpponent, 1)),
        (ItemKind::Shuffle, item(30, Targeting::None, 2)),
        (ItemKind::Discard, item(25, Targeting::Pill, 2)),
    ])
}

/// Inventory limits.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InventoryConfig {
    /// Distinct slots per player
    pub max_slots: usize,
}

impl Default for InventoryConfig {
    fn default() -> Self {
        Self { max_slots: 5 }
    }
}

/// Reward multipliers by match stage.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QuestMultipliers {
    /// Rounds before `mid_from_round`
    pub early: f64,
    /// Rounds from `mid_from_round` up to `late_from_round`
    pub mid: f64,
    /// Rounds from `late_from_round` on
    pub late: f64,
    /// First mid-game round
    pub mid_from_round: u32,
    /// First late-game round
    pub late_from_round: u32,
}

impl Default for QuestMultipliers {
    fn default() -> Self {
        Self {
            early: 1.0,
            mid: 1.5,
            late: 2.0,
            mid_from_round: 4,
            late_from_round: 8,
        }
    }
}

/// Coins and shape quest rewards.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EconomyConfig {
    /// Coins a player joins with
    pub initial_pill_coins: u32,
    /// Quest reward before the stage multiplier
    pub shape_quest_base_reward: u32,
    /// Stage multipliers
    pub quest_multipliers: QuestMultipliers,
    /// Shortest quest sequence
    pub quest_length_min: usize,
    /// Longest quest sequence
    pub quest_length_max: usize,
}

impl Default for EconomyConfig {
    fn default() -> Self {
        Self {
            initial_pill_coins: 100,
            shape_quest_base_reward: 10,
            quest_multipliers: QuestMultipliers::default(),
            quest_length_min: 2,
            quest_length_max: 3,
        }
    }
}

// =============================================================================
// GAME CONFIG
// =============================================================================

/// Complete tuning data for a match.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    /// Player count limits
    pub rules: MatchRules,
    /// Timers
    pub timers: TimerConfig,
    /// Lives and resistance
    pub health: HealthConfig,
    /// Pool generation
    pub pool: PoolConfig,
    /// Shape catalog
    pub shapes: ShapeConfig,
    /// Effect magnitudes
    pub effects: EffectValues,
    /// Item catalog
    pub items: BTreeMap<ItemKind, ItemConfig>,
    /// Inventory limits
    pub inventory: InventoryConfig,
    /// Coins and quests
    pub economy: EconomyConfig,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            rules: MatchRules::default(),
            timers: TimerConfig::default(),
            health: HealthConfig::default(),
            pool: PoolConfig::default(),
            shapes: ShapeConfig::default(),
            effects: EffectValues::default(),
            items: default_items(),
            inventory: InventoryConfig::default(),
            economy: EconomyConfig::default(),
        }
    }
}

impl GameConfig {
    /// Parse and validate a JSON document. Missing fields take defaults.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: GameConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a JSON config file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json_str(&raw)
    }

    /// Catalog entry for an item.
    pub fn item(&self, kind: ItemKind) -> Option<&ItemConfig> {
        self.items.get(&kind)
    }

    /// Shapes available at `round` (base shapes unlocked by then plus
    /// enabled seasonal shapes), in catalog order.
    pub fn unlocked_shapes(&self, round: u32) -> Vec<ShapeId> {
        self.shapes
            .base
            .iter()
            .filter(|s| s.unlock_round <= round)
            .map(|s| s.shape.clone())
            .chain(
                self.shapes
                    .seasonal
                    .iter()
                    .filter(|s| s.enabled)
                    .map(|s| s.shape.clone()),
            )
            .collect()
    }

    /// Check every rule the engine relies on. Reports all problems at once.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut problems = Vec::new();

        if self.rules.min_players < 2 {
            problems.push("rules.min_players must be at least 2".to_string());
        }
        if self.rules.max_players < self.rules.min_players {
            problems.push("rules.max_players must be >= rules.min_players".to_string());
        }

        if self.timers.turn_secs == 0 {
            problems.push("timers.turn_secs must be positive".to_string());
        }

        let health = &self.health;
        if health.max_lives == 0 {
            problems.push("health.max_lives must be positive".to_string());
        }
        if health.initial_lives == 0 || health.initial_lives > health.max_lives {
            problems.push("health.initial_lives must be in 1..=max_lives".to_string());
        }
        if health.resistance_cap <= 0 {
            problems.push("health.resistance_cap must be positive".to_string());
        }
        if health.initial_resistance <= 0 || health.initial_resistance > health.resistance_cap {
            problems.push("health.initial_resistance must be in 1..=resistance_cap".to_string());
        }
        if health.collapse_reset <= 0 || health.collapse_reset > health.resistance_cap {
            problems.push("health.collapse_reset must be in 1..=resistance_cap".to_string());
        }

        let pool = &self.pool;
        if pool.base_size == 0 {
            problems.push("pool.base_size must be positive".to_string());
        }
        if pool.max_size < pool.base_size {
            problems.push("pool.max_size must be >= pool.base_size".to_string());
        }
        if pool.increment_every_n_rounds == 0 {
            problems.push("pool.increment_every_n_rounds must be at least 1".to_string());
        }
        if pool.distribution_horizon < 2 {
            problems.push("pool.distribution_horizon must be at least 2".to_string());
        }
        if pool.min_shape_diversity == 0 {
            problems.push("pool.min_shape_diversity must be positive".to_string());
        }
        if pool.base_size < pool.min_shape_diversity {
            problems.push(format!(
                "pool.base_size ({}) cannot hold pool.min_shape_diversity ({}) shapes",
                pool.base_size, pool.min_shape_diversity
            ));
        }

        for (pill_type, dist) in &pool.distribution {
            let in_range = |v: f64| (0.0..=1.0).contains(&v);
            if !in_range(dist.initial_pct) || !in_range(dist.final_pct) {
                problems.push(format!("pool.distribution.{} percentages must be in [0, 1]", pill_type));
            }
            if dist.unlock_round == 0 {
                problems.push(format!("pool.distribution.{} unlock_round must be at least 1", pill_type));
            }
        }

        // Past the horizon and the last unlock, the raw mass no longer changes.
        let last_round = pool
            .distribution
            .values()
            .map(|d| d.unlock_round)
            .max()
            .unwrap_or(1)
            .max(pool.distribution_horizon);
        for round in 1..=last_round {
            let mass: f64 = crate::game::pool::raw_distribution(round, self).values().sum();
            if mass <= 0.0 {
                problems.push(format!("pool.distribution has no weight at round {}", round));
                break;
            }
        }

        let unlocked = self.unlocked_shapes(1);
        let mut distinct = unlocked.clone();
        distinct.sort();
        distinct.dedup();
        if distinct.len() < pool.min_shape_diversity {
            problems.push(format!(
                "only {} shapes unlocked at round 1, pool.min_shape_diversity is {}",
                distinct.len(),
                pool.min_shape_diversity
            ));
        }

        if self.inventory.max_slots == 0 {
            problems.push("inventory.max_slots must be positive".to_string());
        }

        for kind in ItemKind::ALL {
            match self.items.get(&kind) {
                None => problems.push(format!("items.{} is missing", kind)),
                Some(item) => {
                    if item.stack_limit == 0 {
                        problems.push(format!("items.{}.stack_limit must be at least 1", kind));
                    }
                    if !item.stackable && item.stack_limit != 1 {
                        problems.push(format!("items.{} is not stackable but stack_limit is {}", kind, item.stack_limit));
                    }
                }
            }
        }

        let economy = &self.economy;
        if economy.quest_length_min == 0 || economy.quest_length_max < economy.quest_length_min {
            problems.push("economy quest lengths must satisfy 1 <= min <= max".to_string());
        }
        let multipliers = &economy.quest_multipliers;
        if multipliers.late_from_round < multipliers.mid_from_round {
            problems.push("economy.quest_multipliers.late_from_round must be >= mid_from_round".to_string());
        }

        if problems.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Invalid(problems))
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
