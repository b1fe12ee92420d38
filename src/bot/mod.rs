//! Bot Decision Module
//!
//! Bots read a snapshot and propose an action; the event processor applies
//! it like any other input. Policies never touch state and are deterministic
//! for a given seed, so a bot match replays exactly like a human one.

pub mod easy;
pub mod runner;

use crate::config::GameConfig;
use crate::core::rng::{derive_stream_seed, Stream};
use crate::game::events::GameEvent;
use crate::game::inventory::{ItemKind, ItemTarget};
use crate::game::pill::{Pill, PillId, PillType};
use crate::game::pool::Pool;
use crate::game::state::{BotLevel, Match, Player, PlayerId};

pub use easy::EasyBot;

/// Action proposed by a bot.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BotAction {
    /// Consume a pill, ending the turn
    ConsumePill(PillId),
    /// Use an item, keeping the turn
    UseItem {
        /// Item to use
        item: ItemKind,
        /// Its target
        target: ItemTarget,
    },
}

impl BotAction {
    /// Turn the proposal into a root event for `player`.
    pub fn into_event(self, timestamp: u64, player: PlayerId) -> GameEvent {
        match self {
            BotAction::ConsumePill(pill) => GameEvent::pill_consumed(timestamp, player, pill),
            BotAction::UseItem { item, target } => GameEvent::item_used(timestamp, player, item, target),
        }
    }
}

/// A bot difficulty tier.
pub trait BotPolicy {
    /// Tier this policy plays.
    fn level(&self) -> BotLevel;

    /// Pick one item to buy with `budget` coins, or None to stop shopping.
    fn decide_draft_action(&self, player: &Player, config: &GameConfig, budget: u32) -> Option<ItemKind>;

    /// Pick the next action of the bot's turn. None when no pill is left.
    fn decide_turn_action(
        &self,
        bot: &Player,
        opponents: &[&Player],
        pool: &Pool,
        state: &Match,
        seed: u32,
    ) -> Option<BotAction>;
}

/// Policy for a tier. Only Easy is implemented.
pub fn policy_for(level: BotLevel) -> Option<Box<dyn BotPolicy>> {
    match level {
        BotLevel::Easy => Some(Box::new(EasyBot)),
        BotLevel::Normal | BotLevel::Hard | BotLevel::Insane => None,
    }
}

/// Seed for the `decision`-th bot decision of a match.
pub fn decision_seed(match_seed: u32, decision: u64) -> u32 {
    derive_stream_seed(match_seed, Stream::Bot { decision })
}

// =============================================================================
// HELPERS
// =============================================================================

/// Surviving players other than `id`.
pub fn opponents_of<'a>(state: &'a Match, id: &PlayerId) -> Vec<&'a Player> {
    state
        .players
        .values()
        .filter(|p| p.is_alive() && &p.id != id)
        .collect()
}

/// Available pills.
pub fn available_pills(pool: &Pool) -> Vec<&Pill> {
    pool.available_pills().collect()
}

/// Available pills the table can see.
pub fn revealed_pills_of(pool: &Pool, pill_type: PillType) -> Vec<&Pill> {
    pool.available_pills()
        .filter(|p| p.is_revealed && p.pill_type == pill_type)
        .collect()
}

/// Available pills nobody has seen.
pub fn unrevealed_pills(pool: &Pool) -> Vec<&Pill> {
    pool.available_pills().filter(|p| !p.is_revealed).collect()
}

/// Last chance, low resistance, or a single life.
pub fn is_player_in_danger(player: &Player) -> bool {
    player.is_last_chance || player.resistance <= 2 || player.lives == 1
}

/// How close a player is to elimination. Higher is worse; eliminated
/// players score 1000.
pub fn calculate_threat_score(player: &Player) -> u32 {
    if player.is_eliminated {
        return 1000;
    }

    let mut score = 0;
    if player.is_last_chance {
        score += 50;
    }
    score += match player.lives {
        1 => 30,
        2 => 10,
        _ => 0,
    };
    if player.resistance <= 0 {
        score += 50;
    }
    if player.resistance <= 2 {
        score += 20;
    }
    if player.resistance <= 4 {
        score += 10;
    }
    score
}
