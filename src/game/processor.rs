//! Event Processor
//!
//! The reducer at the heart of the engine: `(Match, GameEvent) -> Match`.
//!
//! ```text
//!   root event --> validate --> apply --> cascade --> invariants --> outcome
//!                     |                     |              |
//!                  Ignored            derived events   Halt / Recover
//! ```
//!
//! A root event either applies fully or not at all. Caller misuse (wrong
//! phase, not your turn, consumed pill) is a [`Rejection`]: logged and
//! returned as a no-op. A broken invariant after applying is an engine bug
//! and is handled according to [`RecoveryMode`].
//!
//! Derived events (EffectApplied, CollapseTriggered, RoundCompleted,
//! MatchEnded) are produced by the cascade and returned for the caller's
//! log. They are already reflected in the returned state and must not be
//! submitted again; a replay feeds root events only.

use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::config::GameConfig;
use crate::core::rng::{SeededRng, Stream};
use crate::game::collapse::{apply_collapse_to_player, process_collapse_or_elimination};
use crate::game::effect::{apply_effect_to_player, resolve_pill_effect, Effect};
use crate::game::events::{EffectSource, GameEvent, GameEventData};
use crate::game::inventory::{
    purchase_item, remove_item_from_inventory, resolve_item_use, InventoryError, ItemEffect, ItemKind, ItemTarget,
};
use crate::game::phase::{begin_round, check_match_end, transition_to_phase, PhaseError};
use crate::game::pill::{PillId, PillState};
use crate::game::pool::Pool;
use crate::game::quest::{discard_open_quests, record_consumption, QuestProgress};
use crate::game::state::{BotLevel, Match, MatchPhase, Player, PlayerId, RoundState, StatusKind};
use crate::game::turn::{advance_turn, clear_active_turn, end_turn, set_active_turn, start_turn, TurnError};
use crate::game::validation::{validate_match_invariants, InvariantViolation};

// =============================================================================
// OUTCOMES & ERRORS
// =============================================================================

/// Why a root event was ignored.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Rejection {
    /// Event not valid in the current phase
    #[error("{event} is not allowed during {phase:?}")]
    WrongPhase {
        /// Event kind
        event: &'static str,
        /// Current phase
        phase: MatchPhase,
    },

    /// Player not in the match
    #[error("unknown player {0}")]
    UnknownPlayer(PlayerId),

    /// Player id already taken
    #[error("player {0} already joined")]
    DuplicatePlayer(PlayerId),

    /// Lobby at capacity
    #[error("lobby is full ({0} players)")]
    LobbyFull(usize),

    /// Player is out of the match
    #[error("player {0} is eliminated")]
    PlayerEliminated(PlayerId),

    /// Another player holds the turn
    #[error("it is not {0}'s turn")]
    NotYourTurn(PlayerId),

    /// Action before TurnStarted
    #[error("{0} has not started a turn")]
    TurnNotStarted(PlayerId),

    /// Pill not in the current pool
    #[error("unknown pill {0}")]
    UnknownPill(PillId),

    /// Pill already consumed
    #[error("pill {0} was already consumed")]
    PillConsumed(PillId),

    /// Explicit RoundCompleted while the round is still running
    #[error("round {requested} cannot complete (current round {current}, {remaining} pills left)")]
    RoundNotFinished {
        /// Round named by the event
        requested: u32,
        /// Round in progress
        current: u32,
        /// Available pills
        remaining: usize,
    },

    /// Explicit MatchEnded while several players survive
    #[error("match is not decided, {alive} players alive")]
    MatchNotDecided {
        /// Survivors
        alive: usize,
    },

    /// Explicit MatchEnded naming the wrong winner
    #[error("claimed winner {claimed:?} does not match {actual:?}")]
    WinnerMismatch {
        /// Winner named by the event
        claimed: Option<PlayerId>,
        /// Actual survivor
        actual: Option<PlayerId>,
    },

    /// CollapseTriggered for a player with resistance left
    #[error("no collapse pending for {0}")]
    NoCollapsePending(PlayerId),

    /// Item could not be used
    #[error(transparent)]
    Item(#[from] InventoryError),

    /// Phase change refused
    #[error(transparent)]
    Phase(#[from] PhaseError),

    /// Turn could not be opened
    #[error(transparent)]
    Turn(#[from] TurnError),
}

/// What to do when an applied event breaks an invariant.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RecoveryMode {
    /// Stop and surface the offending event and state
    Halt,
    /// Log, roll the event back and continue
    Recover,
}

impl Default for RecoveryMode {
    /// Halt in debug builds, recover in release builds.
    fn default() -> Self {
        if cfg!(debug_assertions) {
            RecoveryMode::Halt
        } else {
            RecoveryMode::Recover
        }
    }
}

/// How a root event was handled.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ProcessStatus {
    /// State advanced
    Applied,
    /// Rejected as a no-op
    Ignored(Rejection),
    /// Applied, broke invariants, rolled back
    RolledBack(Vec<InvariantViolation>),
}

/// Result of processing one root event.
#[derive(Clone, Debug)]
pub struct ProcessOutcome {
    /// State after the event
    pub state: Match,
    /// Events produced by the cascade, in order
    pub derived: Vec<GameEvent>,
    /// How the event was handled
    pub status: ProcessStatus,
}

impl ProcessOutcome {
    /// Did the event change the state?
    pub fn is_applied(&self) -> bool {
        self.status == ProcessStatus::Applied
    }
}

/// Result of processing a sequence of root events.
#[derive(Clone, Debug)]
pub struct SequenceOutcome {
    /// Final state
    pub state: Match,
    /// Events that applied
    pub applied: usize,
    /// Rejected events, by index in the input
    pub ignored: Vec<(usize, Rejection)>,
    /// Events rolled back in recover mode
    pub rolled_back: usize,
    /// Every derived event, in order
    pub derived: Vec<GameEvent>,
}

/// Processing failures.
#[derive(Debug, Error)]
pub enum ProcessError {
    /// An applied event broke an invariant in halt mode
    #[error("{} invariant violation(s) after {}", violations.len(), event.kind())]
    InvariantViolation {
        /// Offending event
        event: Box<GameEvent>,
        /// State the event produced
        state: Box<Match>,
        /// What broke
        violations: Vec<InvariantViolation>,
    },
}

// =============================================================================
// PROCESSOR
// =============================================================================

/// Applies events to match state under a fixed configuration.
#[derive(Clone, Debug)]
pub struct EventProcessor {
    config: GameConfig,
    mode: RecoveryMode,
}

impl EventProcessor {
    /// Processor with the build's default recovery mode.
    pub fn new(config: GameConfig) -> Self {
        Self::with_mode(config, RecoveryMode::default())
    }

    /// Processor with an explicit recovery mode.
    pub fn with_mode(config: GameConfig, mode: RecoveryMode) -> Self {
        Self { config, mode }
    }

    /// Configuration in use.
    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    /// Recovery mode in use.
    pub fn mode(&self) -> RecoveryMode {
        self.mode
    }

    /// Apply one root event to a copy of `state`.
    pub fn process_event(&self, state: &Match, event: &GameEvent) -> Result<ProcessOutcome, ProcessError> {
        let mut reducer = Reducer::new(&self.config, state.clone(), event.timestamp);

        if let Err(rejection) = reducer.apply(&event.data) {
            warn!(event = event.kind(), player = ?event.player_id(), %rejection, "event ignored");
            return Ok(ProcessOutcome {
                state: state.clone(),
                derived: Vec::new(),
                status: ProcessStatus::Ignored(rejection),
            });
        }

        let Reducer { state: next, derived, .. } = reducer;
        let violations = validate_match_invariants(&next, &self.config);

        if violations.is_empty() {
            #[cfg(feature = "debug-tracing")]
            debug!(
                event = event.kind(),
                hash = %hex::encode(next.compute_hash()),
                derived = derived.len(),
                "event applied"
            );
            return Ok(ProcessOutcome {
                state: next,
                derived,
                status: ProcessStatus::Applied,
            });
        }

        match self.mode {
            RecoveryMode::Halt => {
                for violation in &violations {
                    error!(event = event.kind(), %violation, "invariant broken, halting");
                }
                Err(ProcessError::InvariantViolation {
                    event: Box::new(event.clone()),
                    state: Box::new(next),
                    violations,
                })
            }
            RecoveryMode::Recover => {
                for violation in &violations {
                    warn!(event = event.kind(), %violation, "invariant broken, event rolled back");
                }
                Ok(ProcessOutcome {
                    state: state.clone(),
                    derived: Vec::new(),
                    status: ProcessStatus::RolledBack(violations),
                })
            }
        }
    }

    /// Fold a sequence of root events over `state`.
    ///
    /// Rejected events are skipped. In halt mode the first invariant
    /// violation stops the fold.
    pub fn process_event_sequence(&self, state: &Match, events: &[GameEvent]) -> Result<SequenceOutcome, ProcessError> {
        let mut outcome = SequenceOutcome {
            state: state.clone(),
            applied: 0,
            ignored: Vec::new(),
            rolled_back: 0,
            derived: Vec::new(),
        };

        for (index, event) in events.iter().enumerate() {
            let step = self.process_event(&outcome.state, event)?;
            match step.status {
                ProcessStatus::Applied => outcome.applied += 1,
                ProcessStatus::Ignored(rejection) => outcome.ignored.push((index, rejection)),
                ProcessStatus::RolledBack(_) => outcome.rolled_back += 1,
            }
            outcome.state = step.state;
            outcome.derived.extend(step.derived);
        }

        Ok(outcome)
    }
}

/// Replay root events from an initial state in halt mode.
pub fn replay_events(initial: &Match, events: &[GameEvent], config: &GameConfig) -> Result<Match, ProcessError> {
    let processor = EventProcessor::with_mode(config.clone(), RecoveryMode::Halt);
    processor
        .process_event_sequence(initial, events)
        .map(|outcome| outcome.state)
}

// =============================================================================
// REDUCER
// =============================================================================

/// Working copy for one root event. Dropped on rejection.
struct Reducer<'a> {
    config: &'a GameConfig,
    state: Match,
    derived: Vec<GameEvent>,
    now: u64,
}

impl<'a> Reducer<'a> {
    fn new(config: &'a GameConfig, state: Match, now: u64) -> Self {
        Self {
            config,
            state,
            derived: Vec::new(),
            now,
        }
    }

    fn apply(&mut self, data: &GameEventData) -> Result<(), Rejection> {
        match data {
            GameEventData::PlayerJoined {
                player_id,
                name,
                is_bot,
                bot_level,
                loadout,
            } => self.player_joined(player_id, name, *is_bot, *bot_level, loadout),
            GameEventData::TurnStarted { player_id } => self.turn_started(player_id),
            GameEventData::ItemUsed { player_id, item, target } => self.item_used(player_id, *item, target),
            GameEventData::PillConsumed { player_id, pill_id } => self.pill_consumed(player_id, pill_id),
            GameEventData::EffectApplied { target, effect, source } => self.effect_applied(target, effect, source),
            GameEventData::CollapseTriggered { player_id } => self.collapse_triggered(player_id),
            GameEventData::RoundCompleted { round } => self.round_completed(*round),
            GameEventData::MatchEnded { winner_id } => self.match_ended(winner_id.as_ref()),
        }
    }

    // -------------------------------------------------------------------------
    // Root events
    // -------------------------------------------------------------------------

    fn player_joined(
        &mut self,
        player_id: &PlayerId,
        name: &str,
        is_bot: bool,
        bot_level: Option<BotLevel>,
        loadout: &[ItemKind],
    ) -> Result<(), Rejection> {
        self.require_phase("PLAYER_JOINED", MatchPhase::Lobby)?;
        if self.state.players.contains_key(player_id) {
            return Err(Rejection::DuplicatePlayer(player_id.clone()));
        }
        let max = self.config.rules.max_players;
        if self.state.players.len() >= max {
            return Err(Rejection::LobbyFull(max));
        }

        let mut player = if is_bot {
            Player::new_bot(player_id.clone(), name, bot_level.unwrap_or_default(), self.config)
        } else {
            Player::new(player_id.clone(), name, self.config)
        };

        for &item in loadout {
            match purchase_item(&player, item, self.config) {
                Ok(next) => player = next,
                Err(err) => warn!(player = %player_id, %item, %err, "loadout item skipped"),
            }
        }

        info!(player = %player_id, bot = is_bot, coins = player.pill_coins, "player joined");
        self.state.players.insert(player_id.clone(), player);
        Ok(())
    }

    fn turn_started(&mut self, player_id: &PlayerId) -> Result<(), Rejection> {
        match self.state.phase {
            MatchPhase::Lobby => {
                self.transition(MatchPhase::Draft)?;
                self.transition(MatchPhase::Match)?;
            }
            MatchPhase::Draft => self.transition(MatchPhase::Match)?,
            MatchPhase::Match => {}
            MatchPhase::Results => {
                return Err(Rejection::WrongPhase {
                    event: "TURN_STARTED",
                    phase: MatchPhase::Results,
                })
            }
        }

        if self.player(player_id)?.is_eliminated {
            return Err(Rejection::PlayerEliminated(player_id.clone()));
        }
        if self.state.active_player_id() != Some(player_id) {
            return Err(Rejection::NotYourTurn(player_id.clone()));
        }

        let turn = start_turn(&self.state, player_id, self.config, self.now)?;
        let round = self.state.round_mut().ok_or(TurnError::NoRound)?;
        debug!(player = %player_id, round = round.number, turn = round.turns.len(), "turn started");
        round.turns.push(turn);
        Ok(())
    }

    fn item_used(&mut self, player_id: &PlayerId, item: ItemKind, target: &ItemTarget) -> Result<(), Rejection> {
        self.require_acting("ITEM_USED", player_id)?;

        let player = self.player(player_id)?;
        if player.item_quantity(item) == 0 {
            return Err(InventoryError::NotHeld(item).into());
        }
        let effects = resolve_item_use(item, player_id, target, &self.state, self.config)?;
        let updated = remove_item_from_inventory(player, item)?;
        self.state.players.insert(player_id.clone(), updated);

        if let Some(turn) = self.state.round_mut().and_then(|r| r.open_turn_mut()) {
            turn.items_used.push(item);
        }
        debug!(player = %player_id, %item, effects = effects.len(), "item used");

        for effect in effects {
            self.apply_item_effect(item, effect)?;
        }
        self.settle(false)
    }

    fn pill_consumed(&mut self, player_id: &PlayerId, pill_id: &PillId) -> Result<(), Rejection> {
        self.require_acting("PILL_CONSUMED", player_id)?;
        self.consume_pill(player_id, pill_id)?;
        self.close_open_turn(Some(pill_id.clone()));
        self.settle(true)
    }

    fn effect_applied(&mut self, target: &PlayerId, effect: &Effect, source: &EffectSource) -> Result<(), Rejection> {
        self.require_phase("EFFECT_APPLIED", MatchPhase::Match)?;
        self.apply_effect(target, *effect, source.clone(), false)?;
        self.settle(false)
    }

    fn collapse_triggered(&mut self, player_id: &PlayerId) -> Result<(), Rejection> {
        self.require_phase("COLLAPSE_TRIGGERED", MatchPhase::Match)?;
        let health = &self.config.health;
        let player = self.player(player_id)?;
        let result = process_collapse_or_elimination(player, health)
            .ok_or_else(|| Rejection::NoCollapsePending(player_id.clone()))?;
        let next = apply_collapse_to_player(player, &result, health);
        self.state.players.insert(player_id.clone(), next);
        self.settle(false)
    }

    fn round_completed(&mut self, requested: u32) -> Result<(), Rejection> {
        self.require_phase("ROUND_COMPLETED", MatchPhase::Match)?;
        let current = self.state.current_round;
        let remaining = self.state.pool().map_or(0, Pool::available_count);
        if requested != current || remaining > 0 {
            return Err(Rejection::RoundNotFinished {
                requested,
                current,
                remaining,
            });
        }

        self.close_open_turn(None);
        self.advance();
        self.complete_round();
        Ok(())
    }

    fn match_ended(&mut self, claimed: Option<&PlayerId>) -> Result<(), Rejection> {
        self.require_phase("MATCH_ENDED", MatchPhase::Match)?;
        let check = check_match_end(&self.state);
        if !check.ended {
            return Err(Rejection::MatchNotDecided {
                alive: self.state.alive_player_count(),
            });
        }
        if check.winner_id.as_ref() != claimed {
            return Err(Rejection::WinnerMismatch {
                claimed: claimed.cloned(),
                actual: check.winner_id,
            });
        }
        self.finish_match()
    }

    // -------------------------------------------------------------------------
    // Cascade
    // -------------------------------------------------------------------------

    fn consume_pill(&mut self, consumer: &PlayerId, pill_id: &PillId) -> Result<(), Rejection> {
        if self.player(consumer)?.is_eliminated {
            return Err(Rejection::PlayerEliminated(consumer.clone()));
        }

        let round = self.state.round_mut().ok_or(TurnError::NoRound)?;
        let pill = round
            .pool
            .pill_mut(pill_id)
            .ok_or_else(|| Rejection::UnknownPill(pill_id.clone()))?;
        if !pill.is_available() {
            return Err(Rejection::PillConsumed(pill_id.clone()));
        }
        pill.state = PillState::Consumed;
        let consumed = pill.clone();
        round.pool.reveal(pill_id);
        round.pool.recount();

        let progress = round
            .quest_for_mut(consumer)
            .map_or(QuestProgress::Unchanged, |quest| record_consumption(quest, &consumed.shape));
        if let QuestProgress::Completed(reward) = progress {
            let player = self.player_mut(consumer)?;
            player.pill_coins = player.pill_coins.saturating_add(reward);
            info!(player = %consumer, reward, "shape quest completed");
        }

        let effect = resolve_pill_effect(&consumed, self.player(consumer)?, &self.config.effects);
        debug!(
            player = %consumer,
            pill = %pill_id,
            pill_type = %consumed.pill_type,
            value = effect.value,
            "pill consumed"
        );
        self.apply_effect(consumer, effect, EffectSource::Pill(pill_id.clone()), true)
    }

    /// Apply an effect and any collapse it causes. `emit` records the
    /// EffectApplied as a derived event.
    fn apply_effect(
        &mut self,
        target: &PlayerId,
        effect: Effect,
        source: EffectSource,
        emit: bool,
    ) -> Result<(), Rejection> {
        let health = &self.config.health;
        let player = self.player(target)?;
        if player.is_eliminated {
            return Err(Rejection::PlayerEliminated(target.clone()));
        }

        let mut next = apply_effect_to_player(player, &effect, health);
        if emit {
            self.derived
                .push(GameEvent::effect_applied(self.now, target.clone(), effect, source));
        }

        if let Some(result) = process_collapse_or_elimination(&next, health) {
            self.derived.push(GameEvent::collapse_triggered(self.now, target.clone()));
            next = apply_collapse_to_player(&next, &result, health);
        }

        self.state.players.insert(target.clone(), next);
        Ok(())
    }

    fn apply_item_effect(&mut self, item: ItemKind, effect: ItemEffect) -> Result<(), Rejection> {
        match effect {
            ItemEffect::RevealPill(pill) => {
                self.pool_mut()?.reveal(&pill);
            }
            ItemEffect::RevealShape(shape) => {
                let pool = self.pool_mut()?;
                let matching: Vec<PillId> = pool
                    .available_pills()
                    .filter(|p| p.shape == shape)
                    .map(|p| p.id.clone())
                    .collect();
                for id in &matching {
                    pool.reveal(id);
                }
            }
            ItemEffect::AddModifier { pill, modifier } => {
                if let Some(target) = self.pool_mut()?.pill_mut(&pill) {
                    target.add_modifier(modifier);
                }
            }
            ItemEffect::ApplyStatus { target, status, rounds } => {
                self.player_mut(&target)?.add_status(status, rounds);
            }
            ItemEffect::Heal { target, amount } => {
                self.apply_effect(&target, Effect::heal(amount), EffectSource::Item(item), true)?;
            }
            ItemEffect::ForceFeed { target, pill } => {
                self.consume_pill(&target, &pill)?;
            }
            ItemEffect::ShufflePool => self.shuffle_pool()?,
            ItemEffect::DiscardPill(pill) => {
                let pool = self.pool_mut()?;
                if let Some(target) = pool.pill_mut(&pill) {
                    target.state = PillState::Consumed;
                }
                pool.recount();
            }
        }
        Ok(())
    }

    /// Seeded reorder of the pool. Available pills are hidden again; ids are
    /// kept and positions renumbered.
    fn shuffle_pool(&mut self) -> Result<(), Rejection> {
        let use_index = self.state.shuffle_uses;
        let mut rng = SeededRng::for_stream(self.state.seed, Stream::ShuffleItem { use_index });
        self.state.shuffle_uses += 1;

        let pool = self.pool_mut()?;
        rng.shuffle(&mut pool.pills);
        for (position, pill) in pool.pills.iter_mut().enumerate() {
            pill.position = position;
            if pill.is_available() {
                pill.is_revealed = false;
            }
        }
        let hidden: Vec<PillId> = pool
            .pills
            .iter()
            .filter(|p| !p.is_revealed)
            .map(|p| p.id.clone())
            .collect();
        pool.revealed.retain(|id| !hidden.contains(id));
        Ok(())
    }

    /// Resolve what follows a change: match end, round end, or the next turn.
    fn settle(&mut self, turn_over: bool) -> Result<(), Rejection> {
        if self.state.phase != MatchPhase::Match {
            return Ok(());
        }

        let end = check_match_end(&self.state);
        if end.ended {
            self.derived.push(GameEvent::match_ended(self.now, end.winner_id));
            return self.finish_match();
        }

        if self.state.pool().is_some_and(Pool::is_exhausted) {
            let finished = self.state.current_round;
            self.close_open_turn(None);
            self.advance();
            self.complete_round();
            self.derived.push(GameEvent::round_completed(self.now, finished));
            return Ok(());
        }

        let active_gone = self.state.active_player_id().is_none();
        if turn_over || active_gone {
            self.close_open_turn(None);
            self.advance();
        }
        Ok(())
    }

    fn finish_match(&mut self) -> Result<(), Rejection> {
        self.close_open_turn(None);
        if let Some(round) = self.state.round_mut() {
            round.state = RoundState::Completed;
            round.ended_at = Some(self.now);
            discard_open_quests(&mut round.shape_quests);
        }
        self.transition(MatchPhase::Results)?;
        info!(
            winner = ?self.state.winner_id,
            rounds = self.state.current_round,
            "match ended"
        );
        Ok(())
    }

    /// Hand the turn to the next player, consuming handcuffs on the way.
    fn advance(&mut self) {
        let Some(next) = advance_turn(&self.state) else {
            clear_active_turn(&mut self.state.players);
            return;
        };

        for skipped in &next.skipped {
            if let Some(player) = self.state.get_player_mut(skipped) {
                player.remove_status(StatusKind::Handcuffed);
            }
            debug!(player = %skipped, "handcuffed, turn skipped");
        }

        self.state.active_turn_index = next.index;
        set_active_turn(&mut self.state.players, &next.player_id);
    }

    fn complete_round(&mut self) {
        let number = self.state.current_round;
        if let Some(round) = self.state.round_mut() {
            round.state = RoundState::Completed;
            round.ended_at = Some(self.now);
            discard_open_quests(&mut round.shape_quests);
        }
        for player in self.state.players.values_mut() {
            player.tick_statuses();
        }
        info!(round = number, alive = self.state.alive_player_count(), "round completed");
        begin_round(&mut self.state, number + 1, self.config, self.now);
    }

    fn close_open_turn(&mut self, pill: Option<PillId>) {
        let now = self.now;
        if let Some(turn) = self.state.round_mut().and_then(|r| r.open_turn_mut()) {
            *turn = end_turn(turn, pill, now);
        }
    }

    // -------------------------------------------------------------------------
    // Lookups & guards
    // -------------------------------------------------------------------------

    fn transition(&mut self, to: MatchPhase) -> Result<(), Rejection> {
        self.state = transition_to_phase(&self.state, to, self.config, self.now)?;
        Ok(())
    }

    fn player(&self, id: &PlayerId) -> Result<&Player, Rejection> {
        self.state
            .get_player(id)
            .ok_or_else(|| Rejection::UnknownPlayer(id.clone()))
    }

    fn player_mut(&mut self, id: &PlayerId) -> Result<&mut Player, Rejection> {
        self.state
            .get_player_mut(id)
            .ok_or_else(|| Rejection::UnknownPlayer(id.clone()))
    }

    fn pool_mut(&mut self) -> Result<&mut Pool, Rejection> {
        self.state
            .round_mut()
            .map(|r| &mut r.pool)
            .ok_or(Rejection::Turn(TurnError::NoRound))
    }

    fn require_phase(&self, event: &'static str, phase: MatchPhase) -> Result<(), Rejection> {
        if self.state.phase == phase {
            Ok(())
        } else {
            Err(Rejection::WrongPhase {
                event,
                phase: self.state.phase,
            })
        }
    }

    /// The player must hold the turn and have started it.
    fn require_acting(&self, event: &'static str, player_id: &PlayerId) -> Result<(), Rejection> {
        self.require_phase(event, MatchPhase::Match)?;
        if self.player(player_id)?.is_eliminated {
            return Err(Rejection::PlayerEliminated(player_id.clone()));
        }
        if self.state.active_player_id() != Some(player_id) {
            return Err(Rejection::NotYourTurn(player_id.clone()));
        }
        let started = self
            .state
            .round()
            .and_then(|r| r.open_turn())
            .is_some_and(|t| &t.player_id == player_id);
        if !started {
            return Err(Rejection::TurnNotStarted(player_id.clone()));
        }
        Ok(())
    }
}

// =============================================================================
// TESTS
// =============================================================================
