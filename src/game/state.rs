//! Game State Definitions
//!
//! All state types for match simulation.
//! Uses BTreeMap for deterministic iteration order.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::GameConfig;
use crate::core::hash::{compute_state_hash, hash_with_domain, StateHash, StateHasher};
use crate::game::inventory::ItemKind;
use crate::game::pill::PillId;
use crate::game::pool::Pool;
use crate::game::quest::ShapeQuest;

// =============================================================================
// PLAYER ID
// =============================================================================

/// Unique player identifier.
///
/// Implements Ord for deterministic BTreeMap ordering.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlayerId(pub String);

impl PlayerId {
    /// Create from any string-like id.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow as str.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for PlayerId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// =============================================================================
// STATUSES
// =============================================================================

/// Timed status effect.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[repr(u8)]
pub enum StatusKind {
    /// Next damage is blocked
    Shielded = 0,
    /// Next turn is skipped
    Handcuffed = 1,
}

/// Active status with its remaining duration.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Status {
    /// Status kind
    pub kind: StatusKind,
    /// Round boundaries left before it expires. Handcuffs ignore it and
    /// last until the skipped turn.
    pub remaining_rounds: u32,
}

/// Bot difficulty tier.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
#[repr(u8)]
pub enum BotLevel {
    /// Conservative, mostly random play
    #[default]
    Easy = 0,
    /// Reserved tier
    Normal = 1,
    /// Reserved tier
    Hard = 2,
    /// Reserved tier
    Insane = 3,
}

/// Derived position in the ALIVE -> LAST_CHANCE -> ELIMINATED machine.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum CollapseState {
    /// At least one life left
    Alive,
    /// Zero lives, one more collapse eliminates
    LastChance,
    /// Out of the match
    Eliminated,
}

/// One inventory slot.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventorySlot {
    /// Item held
    pub item: ItemKind,
    /// Units in this slot
    pub quantity: u32,
}

// =============================================================================
// PLAYER
// =============================================================================

/// State of a single player in the match.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Player {
    /// Unique player ID
    pub id: PlayerId,

    /// Display name
    pub name: String,

    /// Remaining lives (0 = last chance)
    pub lives: u8,

    /// Health within the current life. May be <= 0 until the collapse is processed.
    pub resistance: i32,

    /// Resistance ceiling
    pub resistance_cap: i32,

    /// Healing banked above the cap (0..=resistance_cap)
    pub extra_resistance: i32,

    /// Zero lives but still in the match
    pub is_last_chance: bool,

    /// Terminal
    pub is_eliminated: bool,

    /// Collapses suffered so far
    pub total_collapses: u32,

    /// Held items
    pub inventory: Vec<InventorySlot>,

    /// Currency
    pub pill_coins: u32,

    /// Active statuses
    pub active_statuses: Vec<Status>,

    /// Currently the player to act
    pub is_active_turn: bool,

    /// Controlled by a bot policy
    pub is_bot: bool,

    /// Bot tier, if a bot
    pub bot_level: Option<BotLevel>,
}

impl Player {
    /// Create a player with starting health and coins.
    pub fn new(id: PlayerId, name: impl Into<String>, config: &GameConfig) -> Self {
        Self {
            id,
            name: name.into(),
            lives: config.health.initial_lives,
            resistance: config.health.initial_resistance,
            resistance_cap: config.health.resistance_cap,
            extra_resistance: 0,
            is_last_chance: false,
            is_eliminated: false,
            total_collapses: 0,
            inventory: Vec::new(),
            pill_coins: config.economy.initial_pill_coins,
            active_statuses: Vec::new(),
            is_active_turn: false,
            is_bot: false,
            bot_level: None,
        }
    }

    /// Create a bot player.
    pub fn new_bot(id: PlayerId, name: impl Into<String>, level: BotLevel, config: &GameConfig) -> Self {
        Self {
            is_bot: true,
            bot_level: Some(level),
            ..Self::new(id, name, config)
        }
    }

    /// Restore starting health, clearing statuses and turn flags.
    /// Inventory and coins are kept.
    pub fn reset_health(&mut self, config: &GameConfig) {
        self.lives = config.health.initial_lives;
        self.resistance = config.health.initial_resistance;
        self.resistance_cap = config.health.resistance_cap;
        self.extra_resistance = 0;
        self.is_last_chance = false;
        self.is_eliminated = false;
        self.total_collapses = 0;
        self.active_statuses.clear();
        self.is_active_turn = false;
    }

    /// Still in the match?
    #[inline]
    pub fn is_alive(&self) -> bool {
        !self.is_eliminated
    }

    /// Position in the collapse state machine.
    pub fn collapse_state(&self) -> CollapseState {
        if self.is_eliminated {
            CollapseState::Eliminated
        } else if self.is_last_chance {
            CollapseState::LastChance
        } else {
            CollapseState::Alive
        }
    }

    /// Check for an active status.
    #[inline]
    pub fn has_status(&self, kind: StatusKind) -> bool {
        self.active_statuses.iter().any(|s| s.kind == kind)
    }

    /// Add a status, refreshing the duration if already present.
    pub fn add_status(&mut self, kind: StatusKind, rounds: u32) {
        match self.active_statuses.iter_mut().find(|s| s.kind == kind) {
            Some(existing) => existing.remaining_rounds = existing.remaining_rounds.max(rounds),
            None => self.active_statuses.push(Status { kind, remaining_rounds: rounds }),
        }
    }

    /// Remove a status. Returns true if it was present.
    pub fn remove_status(&mut self, kind: StatusKind) -> bool {
        let before = self.active_statuses.len();
        self.active_statuses.retain(|s| s.kind != kind);
        self.active_statuses.len() != before
    }

    /// Count down timed statuses by one round, dropping expired ones.
    pub fn tick_statuses(&mut self) {
        for status in &mut self.active_statuses {
            if status.kind != StatusKind::Handcuffed {
                status.remaining_rounds = status.remaining_rounds.saturating_sub(1);
            }
        }
        self.active_statuses.retain(|s| s.remaining_rounds > 0);
    }

    /// Units held of an item.
    pub fn item_quantity(&self, item: ItemKind) -> u32 {
        self.inventory
            .iter()
            .filter(|slot| slot.item == item)
            .map(|slot| slot.quantity)
            .sum()
    }

    /// Add player data to hasher.
    pub fn hash_into(&self, hasher: &mut StateHasher) {
        hasher.update_str(self.id.as_str());
        hasher.update_u8(self.lives);
        hasher.update_i32(self.resistance);
        hasher.update_i32(self.resistance_cap);
        hasher.update_i32(self.extra_resistance);
        hasher.update_bool(self.is_last_chance);
        hasher.update_bool(self.is_eliminated);
        hasher.update_u32(self.total_collapses);
        hasher.update_usize(self.inventory.len());
        for slot in &self.inventory {
            hasher.update_u8(slot.item as u8);
            hasher.update_u32(slot.quantity);
        }
        hasher.update_u32(self.pill_coins);
        hasher.update_usize(self.active_statuses.len());
        for status in &self.active_statuses {
            hasher.update_u8(status.kind as u8);
            hasher.update_u32(status.remaining_rounds);
        }
        hasher.update_bool(self.is_active_turn);
        hasher.update_bool(self.is_bot);
    }
}

// =============================================================================
// ROUND & TURN
// =============================================================================

/// A single player's turn.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    /// Acting player
    pub player_id: PlayerId,
    /// Time limit for this turn
    pub timer_secs: u32,
    /// Items used, in order
    pub items_used: Vec<ItemKind>,
    /// Pill consumed to end the turn
    pub pill_consumed: Option<PillId>,
    /// Start timestamp (ms)
    pub started_at: u64,
    /// End timestamp (ms), None while in progress
    pub ended_at: Option<u64>,
}

impl Turn {
    /// Still in progress?
    #[inline]
    pub fn is_open(&self) -> bool {
        self.ended_at.is_none()
    }

    fn hash_into(&self, hasher: &mut StateHasher) {
        hasher.update_str(self.player_id.as_str());
        hasher.update_u32(self.timer_secs);
        hasher.update_usize(self.items_used.len());
        for item in &self.items_used {
            hasher.update_u8(*item as u8);
        }
        hasher.update_option(self.pill_consumed.as_ref(), |h, id| h.update_str(id.as_str()));
        hasher.update_u64(self.started_at);
        hasher.update_option(self.ended_at.as_ref(), |h, t| h.update_u64(*t));
    }
}

/// Round lifecycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[repr(u8)]
pub enum RoundState {
    /// Pills still being drawn
    #[default]
    Active = 0,
    /// Pool exhausted
    Completed = 1,
}

/// One round: a pool and the turns played against it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Round {
    /// Round number (1-based)
    pub number: u32,
    /// Pill pool
    pub pool: Pool,
    /// Turns played
    pub turns: Vec<Turn>,
    /// Shape quests handed out this round
    pub shape_quests: Vec<ShapeQuest>,
    /// Lifecycle state
    pub state: RoundState,
    /// Start timestamp (ms)
    pub started_at: u64,
    /// End timestamp (ms)
    pub ended_at: Option<u64>,
}

impl Round {
    /// Fresh active round.
    pub fn new(number: u32, pool: Pool, shape_quests: Vec<ShapeQuest>, started_at: u64) -> Self {
        Self {
            number,
            pool,
            turns: Vec::new(),
            shape_quests,
            state: RoundState::Active,
            started_at,
            ended_at: None,
        }
    }

    /// Turn in progress, if any.
    pub fn open_turn(&self) -> Option<&Turn> {
        self.turns.last().filter(|t| t.is_open())
    }

    /// Mutable turn in progress, if any.
    pub fn open_turn_mut(&mut self) -> Option<&mut Turn> {
        self.turns.last_mut().filter(|t| t.is_open())
    }

    /// Active quest of a player.
    pub fn quest_for_mut(&mut self, player_id: &PlayerId) -> Option<&mut ShapeQuest> {
        self.shape_quests.iter_mut().find(|q| &q.player_id == player_id)
    }

    fn hash_into(&self, hasher: &mut StateHasher) {
        hasher.update_u32(self.number);
        self.pool.hash_into(hasher);
        hasher.update_usize(self.turns.len());
        for turn in &self.turns {
            turn.hash_into(hasher);
        }
        hasher.update_usize(self.shape_quests.len());
        for quest in &self.shape_quests {
            quest.hash_into(hasher);
        }
        hasher.update_u8(self.state as u8);
        hasher.update_u64(self.started_at);
        hasher.update_option(self.ended_at.as_ref(), |h, t| h.update_u64(*t));
    }
}

// =============================================================================
// MATCH STATE
// =============================================================================

/// Match lifecycle phase.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[repr(u8)]
pub enum MatchPhase {
    /// Gathering players
    #[default]
    Lobby = 0,
    /// Loadout selection
    Draft = 1,
    /// Active play
    Match = 2,
    /// Winner decided
    Results = 3,
}

/// Complete match state.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Match {
    /// Match identifier, derived from the seed
    pub id: Uuid,

    /// Seed every random stream is derived from
    pub seed: u32,

    /// Current phase
    pub phase: MatchPhase,

    /// Fixed permutation of player ids
    pub turn_order: Vec<PlayerId>,

    /// Index into `turn_order` of the player to act
    pub active_turn_index: usize,

    /// All players (BTreeMap for deterministic iteration)
    pub players: BTreeMap<PlayerId, Player>,

    /// Rounds played, oldest first
    pub rounds: Vec<Round>,

    /// Current round number (0 before the first round)
    pub current_round: u32,

    /// Winner once decided
    pub winner_id: Option<PlayerId>,

    /// Timestamp the match left the lobby (ms)
    pub started_at: Option<u64>,

    /// Timestamp the match ended (ms)
    pub ended_at: Option<u64>,

    /// Shuffle activations so far, indexes the shuffle stream
    pub shuffle_uses: u64,
}

impl Match {
    /// Create a new match in the lobby.
    pub fn new(seed: u32) -> Self {
        Self {
            id: match_id_from_seed(seed),
            seed,
            phase: MatchPhase::Lobby,
            turn_order: Vec::new(),
            active_turn_index: 0,
            players: BTreeMap::new(),
            rounds: Vec::new(),
            current_round: 0,
            winner_id: None,
            started_at: None,
            ended_at: None,
            shuffle_uses: 0,
        }
    }

    /// Get player by ID.
    pub fn get_player(&self, id: &PlayerId) -> Option<&Player> {
        self.players.get(id)
    }

    /// Get mutable player by ID.
    pub fn get_player_mut(&mut self, id: &PlayerId) -> Option<&mut Player> {
        self.players.get_mut(id)
    }

    /// Count non-eliminated players.
    pub fn alive_player_count(&self) -> usize {
        self.players.values().filter(|p| p.is_alive()).count()
    }

    /// Non-eliminated player ids in id order.
    pub fn alive_player_ids(&self) -> Vec<PlayerId> {
        self.players
            .values()
            .filter(|p| p.is_alive())
            .map(|p| p.id.clone())
            .collect()
    }

    /// The round currently being played.
    pub fn round(&self) -> Option<&Round> {
        self.current_round
            .checked_sub(1)
            .and_then(|idx| self.rounds.get(idx as usize))
    }

    /// Mutable access to the round currently being played.
    pub fn round_mut(&mut self) -> Option<&mut Round> {
        let idx = self.current_round.checked_sub(1)?;
        self.rounds.get_mut(idx as usize)
    }

    /// Pool of the current round.
    pub fn pool(&self) -> Option<&Pool> {
        self.round().map(|r| &r.pool)
    }

    /// Player whose turn it is.
    pub fn active_player_id(&self) -> Option<&PlayerId> {
        self.players.values().find(|p| p.is_active_turn).map(|p| &p.id)
    }

    /// Compute deterministic state hash.
    pub fn compute_hash(&self) -> StateHash {
        compute_state_hash(self.seed, self.current_round, |hasher| {
            hasher.update_bytes(self.id.as_bytes());
            hasher.update_u8(self.phase as u8);

            hasher.update_usize(self.turn_order.len());
            for id in &self.turn_order {
                hasher.update_str(id.as_str());
            }
            hasher.update_usize(self.active_turn_index);

            // BTreeMap iteration is sorted by id
            hasher.update_usize(self.players.len());
            for player in self.players.values() {
                player.hash_into(hasher);
            }

            hasher.update_usize(self.rounds.len());
            for round in &self.rounds {
                round.hash_into(hasher);
            }

            hasher.update_option(self.winner_id.as_ref(), |h, id| h.update_str(id.as_str()));
            hasher.update_option(self.started_at.as_ref(), |h, t| h.update_u64(*t));
            hasher.update_option(self.ended_at.as_ref(), |h, t| h.update_u64(*t));
            hasher.update_u64(self.shuffle_uses);
        })
    }

    /// Canonical binary snapshot for byte-level comparison.
    pub fn to_bytes(&self) -> Result<Vec<u8>, bincode::Error> {
        bincode::serialize(self)
    }

    /// Restore from a snapshot produced by [`Match::to_bytes`].
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, bincode::Error> {
        bincode::deserialize(bytes)
    }
}

/// Derive a stable match UUID from the seed.
fn match_id_from_seed(seed: u32) -> Uuid {
    let digest = hash_with_domain(b"DOSED_MATCH_ID_V1", &seed.to_le_bytes());
    let mut bytes = [0u8; 16];
    bytes.copy_from_slice(&digest[..16]);
    uuid::Builder::from_random_bytes(bytes).into_uuid()
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> GameConfig {
        GameConfig::default()
    }

    #[test]
    fn test_new_player_starting_values() {
        let player = Player::new(PlayerId::from("p1"), "Alice", &config());
        assert_eq!(player.lives, 3);
        assert_eq!(player.resistance, 6);
        assert_eq!(player.extra_resistance, 0);
        assert_eq!(player.pill_coins, 100);
        assert_eq!(player.collapse_state(), CollapseState::Alive);
        assert!(!player.is_bot);
    }

    #[test]
    fn test_new_bot() {
        let bot = Player::new_bot(PlayerId::from("b1"), "Bot", BotLevel::Easy, &config());
        assert!(bot.is_bot);
        assert_eq!(bot.bot_level, Some(BotLevel::Easy));
    }

    #[test]
    fn test_status_lifecycle() {
        let mut player = Player::new(PlayerId::from("p1"), "Alice", &config());
        player.add_status(StatusKind::Shielded, 1);
        player.add_status(StatusKind::Handcuffed, 2);
        assert!(player.has_status(StatusKind::Shielded));

        player.tick_statuses();
        player.tick_statuses();
        assert!(!player.has_status(StatusKind::Shielded));
        assert!(player.has_status(StatusKind::Handcuffed));

        assert!(player.remove_status(StatusKind::Handcuffed));
        assert!(!player.remove_status(StatusKind::Handcuffed));
    }

    #[test]
    fn test_add_status_refreshes_instead_of_duplicating() {
        let mut player = Player::new(PlayerId::from("p1"), "Alice", &config());
        player.add_status(StatusKind::Shielded, 1);
        player.add_status(StatusKind::Shielded, 3);
        assert_eq!(player.active_statuses.len(), 1);
        assert_eq!(player.active_statuses[0].remaining_rounds, 3);
    }

    #[test]
    fn test_match_id_is_seed_derived() {
        assert_eq!(Match::new(12345).id, Match::new(12345).id);
        assert_ne!(Match::new(12345).id, Match::new(54321).id);
    }

    #[test]
    fn test_hash_determinism() {
        let make = || {
            let mut state = Match::new(42);
            for name in ["a", "b", "c"] {
                let id = PlayerId::from(name);
                state.players.insert(id.clone(), Player::new(id, name, &config()));
            }
            state
        };

        assert_eq!(make().compute_hash(), make().compute_hash());

        let mut changed = make();
        if let Some(p) = changed.get_player_mut(&PlayerId::from("b")) {
            p.resistance -= 1;
        }
        assert_ne!(make().compute_hash(), changed.compute_hash());
    }

    #[test]
    fn test_bincode_snapshot_roundtrip() {
        let mut state = Match::new(7);
        let id = PlayerId::from("solo");
        state.players.insert(id.clone(), Player::new(id, "Solo", &config()));

        let bytes = state.to_bytes().unwrap();
        let restored = Match::from_bytes(&bytes).unwrap();
        assert_eq!(restored, state);
    }

    #[test]
    fn test_no_round_before_start() {
        let state = Match::new(1);
        assert!(state.round().is_none());
        assert!(state.pool().is_none());
        assert!(state.active_player_id().is_none());
    }
}
