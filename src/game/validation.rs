//! State invariants - sanity checks that detect engine bugs.
//!
//! Every mutating event is followed by these checks. Caller misuse is caught
//! earlier as a rejection, so a violation here always means the engine
//! produced a state it should not have.

use std::collections::BTreeSet;

use thiserror::Error;

use crate::config::GameConfig;
use crate::game::pool::Pool;
use crate::game::state::{Match, MatchPhase, Player};

/// Invariant violation error.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invariant violation: {message}")]
pub struct InvariantViolation {
    /// Description of the violated invariant.
    pub message: String,
}

impl InvariantViolation {
    fn new(message: impl Into<String>) -> Self {
        Self { message: message.into() }
    }
}

/// Check a single player.
#[must_use]
pub fn validate_player_invariants(player: &Player, config: &GameConfig) -> Vec<InvariantViolation> {
    let mut violations = Vec::new();
    let id = &player.id;

    if player.lives > config.health.max_lives {
        violations.push(InvariantViolation::new(format!(
            "player {} has {} lives > max {}",
            id, player.lives, config.health.max_lives
        )));
    }

    if player.extra_resistance < 0 || player.extra_resistance > player.resistance_cap {
        violations.push(InvariantViolation::new(format!(
            "player {} extra resistance {} outside 0..={}",
            id, player.extra_resistance, player.resistance_cap
        )));
    }

    if player.resistance > player.resistance_cap {
        violations.push(InvariantViolation::new(format!(
            "player {} resistance {} above cap {}",
            id, player.resistance, player.resistance_cap
        )));
    }

    if !player.is_eliminated && player.resistance <= 0 {
        violations.push(InvariantViolation::new(format!(
            "player {} has resistance {} but no collapse was processed",
            id, player.resistance
        )));
    }

    if player.inventory.len() > config.inventory.max_slots {
        violations.push(InvariantViolation::new(format!(
            "player {} holds {} inventory slots > max {}",
            id,
            player.inventory.len(),
            config.inventory.max_slots
        )));
    }

    if !crate::game::inventory::validate_inventory(player, config) {
        violations.push(InvariantViolation::new(format!(
            "player {} inventory breaks stacking rules",
            id
        )));
    }

    if player.is_eliminated && player.is_active_turn {
        violations.push(InvariantViolation::new(format!(
            "eliminated player {} holds the active turn",
            id
        )));
    }

    if player.lives == 0 && !player.is_last_chance && !player.is_eliminated {
        violations.push(InvariantViolation::new(format!(
            "player {} has 0 lives but is neither on last chance nor eliminated",
            id
        )));
    }

    if player.lives > 0 && (player.is_last_chance || player.is_eliminated) {
        violations.push(InvariantViolation::new(format!(
            "player {} has {} lives but is flagged last chance or eliminated",
            id, player.lives
        )));
    }

    violations
}

/// Check a pool's structure.
#[must_use]
pub fn validate_pool_invariants(pool: &Pool, config: &GameConfig) -> Vec<InvariantViolation> {
    let mut violations = Vec::new();
    let round = pool.round_number;

    if pool.size < config.pool.base_size || pool.size > config.pool.max_size {
        violations.push(InvariantViolation::new(format!(
            "round {} pool size {} outside {}..={}",
            round, pool.size, config.pool.base_size, config.pool.max_size
        )));
    }

    if pool.pills.len() != pool.size {
        violations.push(InvariantViolation::new(format!(
            "round {} pool holds {} pills but size is {}",
            round,
            pool.pills.len(),
            pool.size
        )));
    }

    let mut ids = BTreeSet::new();
    for (index, pill) in pool.pills.iter().enumerate() {
        if !ids.insert(&pill.id) {
            violations.push(InvariantViolation::new(format!("duplicate pill id {}", pill.id)));
        }
        if pill.position != index {
            violations.push(InvariantViolation::new(format!(
                "pill {} at index {} has position {}",
                pill.id, index, pill.position
            )));
        }
        let distinct_modifiers: BTreeSet<_> = pill.modifiers.iter().collect();
        if distinct_modifiers.len() != pill.modifiers.len() {
            violations.push(InvariantViolation::new(format!(
                "pill {} carries a duplicated modifier",
                pill.id
            )));
        }
    }

    let mut expected = pool.clone();
    expected.recount();
    if expected.counters != pool.counters {
        violations.push(InvariantViolation::new(format!(
            "round {} counters {:?} do not match available pills {:?}",
            round, pool.counters, expected.counters
        )));
    }

    if pool.revealed.len() > pool.size {
        violations.push(InvariantViolation::new(format!(
            "round {} has {} revealed pills > size {}",
            round,
            pool.revealed.len(),
            pool.size
        )));
    }
    let mut revealed_seen = BTreeSet::new();
    for id in &pool.revealed {
        if !revealed_seen.insert(id) {
            violations.push(InvariantViolation::new(format!("pill {} revealed twice", id)));
        }
        match pool.pill(id) {
            Some(pill) if pill.is_revealed => {}
            Some(_) => violations.push(InvariantViolation::new(format!(
                "pill {} listed as revealed but hidden",
                id
            ))),
            None => violations.push(InvariantViolation::new(format!(
                "revealed pill {} is not in the pool",
                id
            ))),
        }
    }

    let unlocked: BTreeSet<_> = pool.unlocked_shapes.iter().collect();
    let target = config.pool.min_shape_diversity.min(unlocked.len()).min(pool.size);
    let distinct = pool.distinct_shapes().len();
    if distinct < target {
        violations.push(InvariantViolation::new(format!(
            "round {} pool has {} distinct shapes < required {}",
            round, distinct, target
        )));
    }

    violations
}

/// Check the whole match: every player, the current pool and the
/// cross-entity rules.
#[must_use]
pub fn validate_match_invariants(state: &Match, config: &GameConfig) -> Vec<InvariantViolation> {
    let mut violations = Vec::new();

    for (id, player) in &state.players {
        if &player.id != id {
            violations.push(InvariantViolation::new(format!(
                "player stored under {} carries id {}",
                id, player.id
            )));
        }
        violations.extend(validate_player_invariants(player, config));
    }

    if state.players.len() > config.rules.max_players {
        violations.push(InvariantViolation::new(format!(
            "{} players > max {}",
            state.players.len(),
            config.rules.max_players
        )));
    }

    let active: Vec<&Player> = state.players.values().filter(|p| p.is_active_turn).collect();
    if active.len() > 1 {
        violations.push(InvariantViolation::new(format!(
            "{} players hold the active turn",
            active.len()
        )));
    }

    let in_play = matches!(state.phase, MatchPhase::Match | MatchPhase::Results);
    if in_play {
        let order: BTreeSet<_> = state.turn_order.iter().collect();
        let players: BTreeSet<_> = state.players.keys().collect();
        if state.turn_order.len() != state.players.len() || order != players {
            violations.push(InvariantViolation::new(
                "turn order is not a permutation of the players",
            ));
        }
        if state.active_turn_index >= state.turn_order.len() {
            violations.push(InvariantViolation::new(format!(
                "active turn index {} out of range for {} players",
                state.active_turn_index,
                state.turn_order.len()
            )));
        }
    }

    match state.phase {
        MatchPhase::Match => {
            if state.players.len() < config.rules.min_players {
                violations.push(InvariantViolation::new(format!(
                    "match in play with {} players < min {}",
                    state.players.len(),
                    config.rules.min_players
                )));
            }
            if active.len() != 1 {
                violations.push(InvariantViolation::new(
                    "match in play without exactly one active player",
                ));
            } else if state.turn_order.get(state.active_turn_index) != Some(&active[0].id) {
                violations.push(InvariantViolation::new(format!(
                    "active player {} does not sit at active turn index {}",
                    active[0].id, state.active_turn_index
                )));
            }
            if state.alive_player_count() < 2 {
                violations.push(InvariantViolation::new(
                    "match still in play with fewer than two players left",
                ));
            }
            match state.round() {
                Some(round) if round.number == state.current_round => {
                    violations.extend(validate_pool_invariants(&round.pool, config));
                }
                _ => violations.push(InvariantViolation::new(format!(
                    "current round {} is missing",
                    state.current_round
                ))),
            }
        }
        MatchPhase::Results => {
            if !active.is_empty() {
                violations.push(InvariantViolation::new("finished match still has an active player"));
            }
            if let Some(winner) = &state.winner_id {
                match state.get_player(winner) {
                    Some(p) if p.is_alive() => {}
                    _ => violations.push(InvariantViolation::new(format!(
                        "winner {} is not a surviving player",
                        winner
                    ))),
                }
            }
            if state.alive_player_count() > 1 {
                violations.push(InvariantViolation::new(
                    "match finished with more than one survivor",
                ));
            }
        }
        MatchPhase::Lobby | MatchPhase::Draft => {
            if !active.is_empty() {
                violations.push(InvariantViolation::new("player active before the match started"));
            }
        }
    }

    violations
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::rng::SeededRng;
    use crate::game::pill::PillState;
    use crate::game::pool::generate_pool;
    use crate::game::state::PlayerId;

    fn config() -> GameConfig {
        GameConfig::default()
    }

    #[test]
    fn test_fresh_player_is_valid() {
        let player = Player::new(PlayerId::from("p"), "P", &config());
        assert!(validate_player_invariants(&player, &config()).is_empty());
    }

    #[test]
    fn test_uncollapsed_player_flagged() {
        let mut player = Player::new(PlayerId::from("p"), "P", &config());
        player.resistance = -1;
        let violations = validate_player_invariants(&player, &config());
        assert_eq!(violations.len(), 1);
        assert!(violations[0].to_string().starts_with("invariant violation: "));
    }

    #[test]
    fn test_zero_lives_without_last_chance_flagged() {
        let mut player = Player::new(PlayerId::from("p"), "P", &config());
        player.lives = 0;
        assert!(!validate_player_invariants(&player, &config()).is_empty());

        player.is_last_chance = true;
        assert!(validate_player_invariants(&player, &config()).is_empty());
    }

    #[test]
    fn test_eliminated_active_player_flagged() {
        let mut player = Player::new(PlayerId::from("p"), "P", &config());
        player.lives = 0;
        player.resistance = 0;
        player.is_eliminated = true;
        player.is_active_turn = true;
        assert!(!validate_player_invariants(&player, &config()).is_empty());
    }

    #[test]
    fn test_extra_above_cap_flagged() {
        let mut player = Player::new(PlayerId::from("p"), "P", &config());
        player.extra_resistance = 7;
        assert!(!validate_player_invariants(&player, &config()).is_empty());
    }

    #[test]
    fn test_generated_pool_is_valid() {
        let config = config();
        let pool = generate_pool(6, &config, &mut SeededRng::new(5));
        assert!(validate_pool_invariants(&pool, &config).is_empty());
    }

    #[test]
    fn test_stale_counters_flagged() {
        let config = config();
        let mut pool = generate_pool(1, &config, &mut SeededRng::new(5));
        pool.pills[0].state = PillState::Consumed;
        assert!(!validate_pool_invariants(&pool, &config).is_empty());

        pool.recount();
        assert!(validate_pool_invariants(&pool, &config).is_empty());
    }

    #[test]
    fn test_hidden_revealed_pill_flagged() {
        let config = config();
        let mut pool = generate_pool(1, &config, &mut SeededRng::new(5));
        pool.revealed.push(pool.pills[0].id.clone());
        assert!(!validate_pool_invariants(&pool, &config).is_empty());
    }

    #[test]
    fn test_lobby_match_is_valid() {
        let config = config();
        let mut state = Match::new(1);
        for name in ["a", "b"] {
            let id = PlayerId::from(name);
            state.players.insert(id.clone(), Player::new(id, name, &config));
        }
        assert!(validate_match_invariants(&state, &config).is_empty());
    }

    #[test]
    fn test_two_active_players_flagged() {
        let config = config();
        let mut state = Match::new(1);
        for name in ["a", "b"] {
            let id = PlayerId::from(name);
            let mut player = Player::new(id.clone(), name, &config);
            player.is_active_turn = true;
            state.players.insert(id, player);
        }
        let violations = validate_match_invariants(&state, &config);
        assert!(violations.iter().any(|v| v.message.contains("active turn")));
    }
}
