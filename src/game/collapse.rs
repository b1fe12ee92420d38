//! Collapse Handling
//!
//! Dual health: resistance is spent first, and running out of it costs a
//! life. At zero lives the player is on their last chance, and one more
//! collapse eliminates them.
//!
//! ```text
//!   ALIVE --collapse, lives > 0--> ALIVE
//!   ALIVE --collapse to 0 lives--> LAST_CHANCE --collapse--> ELIMINATED
//!   LAST_CHANCE --LIFE pill--> ALIVE
//! ```

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::config::HealthConfig;
use crate::game::state::{Player, PlayerId};

/// Outcome of a resistance exhaustion.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum CollapseKind {
    /// Lost a life, still in the match
    Collapsed,
    /// Out of the match
    Eliminated,
}

/// Result of processing a collapse.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollapseResult {
    /// Affected player
    pub player_id: PlayerId,
    /// Collapse or elimination
    pub kind: CollapseKind,
    /// Lives before
    pub lives_before: u8,
    /// Lives after
    pub lives_after: u8,
    /// Resistance after
    pub resistance_after: i32,
    /// Last chance flag after
    pub is_last_chance: bool,
}

impl CollapseResult {
    /// Was the player eliminated?
    #[inline]
    pub fn is_elimination(&self) -> bool {
        self.kind == CollapseKind::Eliminated
    }
}

/// Resistance a collapse restores for this player.
#[inline]
pub fn collapse_reset_value(player: &Player, health: &HealthConfig) -> i32 {
    health.collapse_reset.min(player.resistance_cap)
}

/// Apply a normal collapse to a copy of `player`.
pub fn handle_collapse(player: &Player, health: &HealthConfig) -> Player {
    let mut next = player.clone();
    next.lives = next.lives.saturating_sub(1);
    next.resistance = collapse_reset_value(player, health);
    next.extra_resistance = 0;
    next.total_collapses += 1;
    if next.lives == 0 {
        next.is_last_chance = true;
    }
    next
}

/// A player already on last chance whose resistance ran out is eliminated.
#[inline]
pub fn check_elimination(player: &Player) -> bool {
    player.is_last_chance && player.resistance <= 0
}

/// Decide what resistance exhaustion does to `player`. None while resistance
/// is positive or the player is already out.
pub fn process_collapse_or_elimination(player: &Player, health: &HealthConfig) -> Option<CollapseResult> {
    if player.is_eliminated || player.resistance > 0 {
        return None;
    }

    if check_elimination(player) {
        return Some(CollapseResult {
            player_id: player.id.clone(),
            kind: CollapseKind::Eliminated,
            lives_before: player.lives,
            lives_after: 0,
            resistance_after: 0,
            is_last_chance: false,
        });
    }

    let collapsed = handle_collapse(player, health);
    Some(CollapseResult {
        player_id: player.id.clone(),
        kind: CollapseKind::Collapsed,
        lives_before: player.lives,
        lives_after: collapsed.lives,
        resistance_after: collapsed.resistance,
        is_last_chance: collapsed.is_last_chance,
    })
}

/// Write a collapse result back to a copy of `player`.
pub fn apply_collapse_to_player(player: &Player, result: &CollapseResult, health: &HealthConfig) -> Player {
    match result.kind {
        CollapseKind::Collapsed => {
            let next = handle_collapse(player, health);
            info!(
                player = %player.id,
                lives = next.lives,
                last_chance = next.is_last_chance,
                "player collapsed"
            );
            next
        }
        CollapseKind::Eliminated => {
            let mut next = player.clone();
            next.lives = 0;
            next.resistance = 0;
            next.extra_resistance = 0;
            next.is_last_chance = false;
            next.is_eliminated = true;
            next.is_active_turn = false;
            next.total_collapses += 1;
            next.active_statuses.clear();
            info!(player = %player.id, collapses = next.total_collapses, "player eliminated");
            next
        }
    }
}

/// Post-collapse sanity: lives within bounds, resistance back at the reset
/// value, and the last-chance and eliminated flags consistent with lives.
pub fn validate_collapse_state(player: &Player, health: &HealthConfig) -> bool {
    if player.lives > health.max_lives {
        return false;
    }
    if player.is_eliminated {
        return player.lives == 0 && player.resistance == 0 && !player.is_active_turn;
    }
    if player.resistance != collapse_reset_value(player, health) {
        return false;
    }
    if player.lives == 0 {
        return player.is_last_chance;
    }
    !player.is_last_chance
}

// =============================================================================
// TESTS
// =============================================================================
