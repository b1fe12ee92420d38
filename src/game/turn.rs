//! Turn Management
//!
//! The turn order is a seeded permutation fixed once per match. Turns pass
//! round-robin along it, skipping eliminated players. A handcuffed player is
//! passed over once and loses the status, unless skipping them would leave
//! nobody to play.

use std::collections::BTreeMap;

use thiserror::Error;

use crate::config::GameConfig;
use crate::core::rng::{SeededRng, Stream};
use crate::game::pill::PillId;
use crate::game::state::{Match, Player, PlayerId, StatusKind, Turn};

/// Turn management errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TurnError {
    /// Turn order requested for an empty roster
    #[error("cannot build a turn order without players")]
    NoPlayers,

    /// Player not in the match
    #[error("player {0} is not in the match")]
    UnknownPlayer(PlayerId),

    /// Player already out
    #[error("player {0} is eliminated")]
    Eliminated(PlayerId),

    /// No round to play a turn in
    #[error("no round in progress")]
    NoRound,

    /// Another turn has not ended yet
    #[error("turn of {0} is still in progress")]
    TurnInProgress(PlayerId),
}

/// Seeded permutation of the players.
pub fn initialize_turn_order(players: &[PlayerId], rng: &mut SeededRng) -> Result<Vec<PlayerId>, TurnError> {
    if players.is_empty() {
        return Err(TurnError::NoPlayers);
    }
    Ok(rng.shuffled(players))
}

/// Turn order for a match, drawn from its dedicated stream.
pub fn turn_order_for_match(state: &Match) -> Result<Vec<PlayerId>, TurnError> {
    let ids: Vec<PlayerId> = state.players.keys().cloned().collect();
    let mut rng = SeededRng::for_stream(state.seed, Stream::TurnOrder);
    initialize_turn_order(&ids, &mut rng)
}

fn is_alive(players: &BTreeMap<PlayerId, Player>, id: &PlayerId) -> bool {
    players.get(id).is_some_and(|p| p.is_alive())
}

/// Index of the next non-eliminated player after `current_index`, wrapping.
///
/// Tries at most `turn_order.len()` positions, so the current player is
/// returned when they are the only survivor and None when nobody is left.
pub fn get_next_player(
    turn_order: &[PlayerId],
    current_index: usize,
    players: &BTreeMap<PlayerId, Player>,
) -> Option<usize> {
    let len = turn_order.len();
    (1..=len)
        .map(|step| (current_index + step) % len)
        .find(|&idx| is_alive(players, &turn_order[idx]))
}

/// Id variant of [`get_next_player`].
pub fn get_next_player_id(
    turn_order: &[PlayerId],
    current_index: usize,
    players: &BTreeMap<PlayerId, Player>,
) -> Option<PlayerId> {
    get_next_player(turn_order, current_index, players).map(|idx| turn_order[idx].clone())
}

/// First non-eliminated position of the order.
pub fn first_player_index(turn_order: &[PlayerId], players: &BTreeMap<PlayerId, Player>) -> Option<usize> {
    turn_order.iter().position(|id| is_alive(players, id))
}

/// Give the turn to exactly one player.
pub fn set_active_turn(players: &mut BTreeMap<PlayerId, Player>, active: &PlayerId) {
    for (id, player) in players.iter_mut() {
        player.is_active_turn = id == active;
    }
}

/// Nobody holds the turn.
pub fn clear_active_turn(players: &mut BTreeMap<PlayerId, Player>) {
    for player in players.values_mut() {
        player.is_active_turn = false;
    }
}

/// Who plays next.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TurnAdvance {
    /// Index into the turn order
    pub index: usize,
    /// Player to act
    pub player_id: PlayerId,
    /// Handcuffed players passed over on the way
    pub skipped: Vec<PlayerId>,
}

/// Compute the next player after the active one, honoring handcuffs.
pub fn advance_turn(state: &Match) -> Option<TurnAdvance> {
    let order = &state.turn_order;
    let alive = state.alive_player_count();
    let mut skipped: Vec<PlayerId> = Vec::new();
    let mut index = state.active_turn_index;

    for _ in 0..order.len() {
        let next = get_next_player(order, index, &state.players)?;
        let id = &order[next];
        let handcuffed = state
            .get_player(id)
            .is_some_and(|p| p.has_status(StatusKind::Handcuffed));

        if handcuffed && !skipped.contains(id) && skipped.len() + 1 < alive {
            skipped.push(id.clone());
            index = next;
            continue;
        }

        return Some(TurnAdvance {
            index: next,
            player_id: id.clone(),
            skipped,
        });
    }

    None
}

/// Open a turn for `player_id` in the current round.
pub fn start_turn(state: &Match, player_id: &PlayerId, config: &GameConfig, now: u64) -> Result<Turn, TurnError> {
    let player = state
        .get_player(player_id)
        .ok_or_else(|| TurnError::UnknownPlayer(player_id.clone()))?;
    if player.is_eliminated {
        return Err(TurnError::Eliminated(player_id.clone()));
    }

    let round = state.round().ok_or(TurnError::NoRound)?;
    if let Some(open) = round.open_turn() {
        return Err(TurnError::TurnInProgress(open.player_id.clone()));
    }

    Ok(Turn {
        player_id: player_id.clone(),
        timer_secs: config.timers.turn_secs,
        items_used: Vec::new(),
        pill_consumed: None,
        started_at: now,
        ended_at: None,
    })
}

/// Close a turn.
pub fn end_turn(turn: &Turn, pill_consumed: Option<PillId>, now: u64) -> Turn {
    let mut ended = turn.clone();
    if pill_consumed.is_some() {
        ended.pill_consumed = pill_consumed;
    }
    ended.ended_at = Some(now.max(turn.started_at));
    ended
}

/// Per-turn timeout in milliseconds.
pub fn turn_timeout_ms(config: &GameConfig) -> u64 {
    u64::from(config.timers.turn_secs) * 1000
}

/// Elapsed time of a turn, frozen once it ended.
pub fn get_turn_duration(turn: &Turn, now: u64) -> u64 {
    turn.ended_at.unwrap_or(now).saturating_sub(turn.started_at)
}

/// Has the turn ended or run out of time?
pub fn should_end_turn(turn: &Turn, now: u64) -> bool {
    !turn.is_open() || get_turn_duration(turn, now) >= u64::from(turn.timer_secs) * 1000
}

/// Pill consumed on behalf of a player whose timer expired: a uniform pick
/// among the available pills, from a stream keyed by round and turn.
pub fn timeout_pill(state: &Match) -> Option<PillId> {
    let round = state.round()?;
    let available: Vec<&PillId> = round.pool.available_pills().map(|p| &p.id).collect();
    let turn = round.turns.len().saturating_sub(1) as u32;
    let mut rng = SeededRng::for_stream(
        state.seed,
        Stream::TimeoutPick {
            round: round.number,
            turn,
        },
    );
    rng.choice(&available).map(|id| (*id).clone())
}

// =============================================================================
// TESTS
// =============================================================================
