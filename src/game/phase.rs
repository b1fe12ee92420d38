//! Match Phase State Machine
//!
//! ```text
//!   LOBBY --> DRAFT --> MATCH --> RESULTS
//!     ^         |         |          |
//!     +---------+---------+----------+   (any phase may return to LOBBY)
//! ```
//!
//! Entering MATCH fixes the turn order, deals round 1 and hands the turn to
//! the first surviving player in order.

use thiserror::Error;
use tracing::{debug, info};

use crate::config::GameConfig;
use crate::core::rng::{SeededRng, Stream};
use crate::game::pool::generate_pool;
use crate::game::quest::generate_shape_quests;
use crate::game::state::{Match, MatchPhase, PlayerId, Round};
use crate::game::turn::{
    clear_active_turn, first_player_index, set_active_turn, turn_order_for_match, TurnError,
};

/// Phase transition errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PhaseError {
    /// Edge not in the state machine
    #[error("cannot move from {from:?} to {to:?}")]
    InvalidTransition {
        /// Current phase
        from: MatchPhase,
        /// Requested phase
        to: MatchPhase,
    },

    /// Too few players to start
    #[error("need at least {min} players to start, have {have}")]
    NotEnoughPlayers {
        /// Required
        min: usize,
        /// Present
        have: usize,
    },

    /// RESULTS requested while several players survive
    #[error("match is not decided, {alive} players still alive")]
    MatchNotOver {
        /// Survivors
        alive: usize,
    },

    /// Turn order could not be built
    #[error(transparent)]
    Turn(#[from] TurnError),
}

/// Whether the state machine allows `from -> to`.
pub fn can_transition(from: MatchPhase, to: MatchPhase) -> bool {
    use MatchPhase::*;
    from == to
        || to == Lobby
        || matches!((from, to), (Lobby, Draft) | (Draft, Match) | (Match, Results))
}

/// Result of [`check_match_end`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MatchEndCheck {
    /// One or zero players remain
    pub ended: bool,
    /// Sole survivor, None for a draw or while undecided
    pub winner_id: Option<PlayerId>,
}

/// Has the match been decided?
pub fn check_match_end(state: &Match) -> MatchEndCheck {
    let alive = state.alive_player_ids();
    match alive.as_slice() {
        [] => MatchEndCheck { ended: true, winner_id: None },
        [winner] => MatchEndCheck {
            ended: true,
            winner_id: Some(winner.clone()),
        },
        _ => MatchEndCheck { ended: false, winner_id: None },
    }
}

/// Deal a round: generate its pool and shape quests from the match seed and
/// make it current.
pub fn begin_round(state: &mut Match, number: u32, config: &GameConfig, now: u64) {
    let mut pool_rng = SeededRng::for_stream(state.seed, Stream::Pool { round: number });
    let pool = generate_pool(number, config, &mut pool_rng);

    let mut quest_rng = SeededRng::for_stream(state.seed, Stream::Quest { round: number });
    let quests = generate_shape_quests(&state.alive_player_ids(), &pool, &config.economy, &mut quest_rng);

    debug!(round = number, pills = pool.size, quests = quests.len(), "round started");

    state.rounds.push(Round::new(number, pool, quests, now));
    state.current_round = number;
}

/// Move a copy of the match to another phase.
pub fn transition_to_phase(
    state: &Match,
    to: MatchPhase,
    config: &GameConfig,
    now: u64,
) -> Result<Match, PhaseError> {
    let from = state.phase;
    if !can_transition(from, to) {
        return Err(PhaseError::InvalidTransition { from, to });
    }
    if from == to {
        return Ok(state.clone());
    }

    let mut next = state.clone();

    match to {
        MatchPhase::Lobby => {
            next.turn_order.clear();
            next.active_turn_index = 0;
            next.rounds.clear();
            next.current_round = 0;
            next.winner_id = None;
            next.started_at = None;
            next.ended_at = None;
            next.shuffle_uses = 0;
            for player in next.players.values_mut() {
                player.reset_health(config);
            }
        }
        MatchPhase::Draft => {
            next.started_at.get_or_insert(now);
        }
        MatchPhase::Match => {
            let have = next.players.len();
            if have < config.rules.min_players {
                return Err(PhaseError::NotEnoughPlayers {
                    min: config.rules.min_players,
                    have,
                });
            }

            if next.turn_order.is_empty() {
                next.turn_order = turn_order_for_match(&next)?;
            }
            if next.rounds.is_empty() {
                begin_round(&mut next, 1, config, now);
            }
            if next.active_player_id().is_none() {
                let index = first_player_index(&next.turn_order, &next.players)
                    .ok_or(PhaseError::MatchNotOver { alive: 0 })?;
                next.active_turn_index = index;
                let first = next.turn_order[index].clone();
                set_active_turn(&mut next.players, &first);
            }
            next.started_at.get_or_insert(now);
        }
        MatchPhase::Results => {
            let end = check_match_end(&next);
            if !end.ended {
                return Err(PhaseError::MatchNotOver {
                    alive: next.alive_player_count(),
                });
            }
            next.winner_id = end.winner_id;
            next.ended_at = Some(now);
            clear_active_turn(&mut next.players);
        }
    }

    next.phase = to;
    info!(from = ?from, to = ?to, "phase transition");
    Ok(next)
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::state::Player;

    fn lobby(names: &[&str]) -> Match {
        let config = GameConfig::default();
        let mut state = Match::new(2024);
        for name in names {
            let id = PlayerId::from(*name);
            state.players.insert(id.clone(), Player::new(id, *name, &config));
        }
        state
    }

    #[test]
    fn test_transition_table() {
        use MatchPhase::*;
        assert!(can_transition(Lobby, Draft));
        assert!(can_transition(Draft, Match));
        assert!(can_transition(Match, Results));
        assert!(can_transition(Results, Lobby));
        assert!(can_transition(Match, Lobby));
        assert!(can_transition(Draft, Draft));

        assert!(!can_transition(Lobby, Match));
        assert!(!can_transition(Results, Match));
        assert!(!can_transition(Draft, Results));
        assert!(!can_transition(Match, Draft));
    }

    #[test]
    fn test_invalid_transition_rejected() {
        let config = GameConfig::default();
        let state = lobby(&["a", "b"]);
        assert_eq!(
            transition_to_phase(&state, MatchPhase::Match, &config, 0),
            Err(PhaseError::InvalidTransition {
                from: MatchPhase::Lobby,
                to: MatchPhase::Match
            })
        );
    }

    #[test]
    fn test_entering_match_deals_round_one() {
        let config = GameConfig::default();
        let state = lobby(&["a", "b", "c"]);
        let state = transition_to_phase(&state, MatchPhase::Draft, &config, 10).unwrap();
        let state = transition_to_phase(&state, MatchPhase::Match, &config, 20).unwrap();

        assert_eq!(state.phase, MatchPhase::Match);
        assert_eq!(state.current_round, 1);
        assert_eq!(state.rounds.len(), 1);
        assert_eq!(state.turn_order.len(), 3);
        assert_eq!(state.started_at, Some(10));
        assert_eq!(state.active_player_id(), Some(&state.turn_order[state.active_turn_index]));
        assert_eq!(state.rounds[0].shape_quests.len(), 3);
    }

    #[test]
    fn test_match_needs_two_players() {
        let config = GameConfig::default();
        let state = lobby(&["solo"]);
        let state = transition_to_phase(&state, MatchPhase::Draft, &config, 0).unwrap();
        assert_eq!(
            transition_to_phase(&state, MatchPhase::Match, &config, 0),
            Err(PhaseError::NotEnoughPlayers { min: 2, have: 1 })
        );
    }

    #[test]
    fn test_results_require_decided_match() {
        let config = GameConfig::default();
        let state = lobby(&["a", "b"]);
        let state = transition_to_phase(&state, MatchPhase::Draft, &config, 0).unwrap();
        let mut state = transition_to_phase(&state, MatchPhase::Match, &config, 0).unwrap();

        assert!(matches!(
            transition_to_phase(&state, MatchPhase::Results, &config, 0),
            Err(PhaseError::MatchNotOver { alive: 2 })
        ));

        if let Some(p) = state.get_player_mut(&PlayerId::from("b")) {
            p.lives = 0;
            p.resistance = 0;
            p.is_eliminated = true;
        }
        let done = transition_to_phase(&state, MatchPhase::Results, &config, 99).unwrap();
        assert_eq!(done.winner_id, Some(PlayerId::from("a")));
        assert_eq!(done.ended_at, Some(99));
        assert!(done.active_player_id().is_none());
    }

    #[test]
    fn test_back_to_lobby_resets() {
        let config = GameConfig::default();
        let state = lobby(&["a", "b"]);
        let state = transition_to_phase(&state, MatchPhase::Draft, &config, 0).unwrap();
        let mut state = transition_to_phase(&state, MatchPhase::Match, &config, 0).unwrap();
        if let Some(p) = state.get_player_mut(&PlayerId::from("a")) {
            p.lives = 1;
        }

        let reset = transition_to_phase(&state, MatchPhase::Lobby, &config, 0).unwrap();
        assert_eq!(reset.phase, MatchPhase::Lobby);
        assert!(reset.rounds.is_empty());
        assert!(reset.turn_order.is_empty());
        assert_eq!(reset.current_round, 0);
        assert!(reset.players.values().all(|p| p.lives == 3 && !p.is_active_turn));
    }

    #[test]
    fn test_check_match_end() {
        let mut state = lobby(&["a", "b"]);
        assert!(!check_match_end(&state).ended);

        for name in ["a", "b"] {
            if let Some(p) = state.get_player_mut(&PlayerId::from(name)) {
                p.is_eliminated = true;
            }
        }
        assert_eq!(check_match_end(&state), MatchEndCheck { ended: true, winner_id: None });
    }

    #[test]
    fn test_round_one_is_seed_deterministic() {
        let config = GameConfig::default();
        let run = || {
            let state = lobby(&["a", "b", "c", "d"]);
            let state = transition_to_phase(&state, MatchPhase::Draft, &config, 0).unwrap();
            transition_to_phase(&state, MatchPhase::Match, &config, 0).unwrap()
        };
        assert_eq!(run(), run());
    }
}
