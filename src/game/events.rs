//! Game Events
//!
//! The closed set of events the reducer understands. Callers submit root
//! events; the reducer answers with the derived events its cascade produced.
//! Timestamps are supplied by the caller, the engine never reads a clock.

use serde::{Deserialize, Serialize};

use crate::core::hash::{StateHash, StateHasher};
use crate::game::effect::Effect;
use crate::game::inventory::{ItemKind, ItemTarget};
use crate::game::pill::PillId;
use crate::game::state::{BotLevel, PlayerId};

/// Where an applied effect came from.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum EffectSource {
    /// A consumed pill
    Pill(PillId),
    /// An item
    Item(ItemKind),
    /// Outside the pill/item systems (admin tools, scripted events)
    External,
}

/// Game event data.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameEventData {
    /// Player entered the lobby
    PlayerJoined {
        /// Joining player
        player_id: PlayerId,
        /// Display name
        name: String,
        /// Seat is played by a bot
        is_bot: bool,
        /// Bot tier, if any
        bot_level: Option<BotLevel>,
        /// Items bought with starting coins
        loadout: Vec<ItemKind>,
    },

    /// Player took the turn
    TurnStarted {
        /// Player whose turn opens
        player_id: PlayerId,
    },

    /// Player used an item
    ItemUsed {
        /// Acting player
        player_id: PlayerId,
        /// Item spent
        item: ItemKind,
        /// What it is aimed at
        target: ItemTarget,
    },

    /// Player consumed a pill
    PillConsumed {
        /// Acting player
        player_id: PlayerId,
        /// Pill swallowed
        pill_id: PillId,
    },

    /// Effect landed on a player
    EffectApplied {
        /// Affected player
        target: PlayerId,
        /// Resolved effect
        effect: Effect,
        /// Where it came from
        source: EffectSource,
    },

    /// Resistance ran out
    CollapseTriggered {
        /// Collapsing player
        player_id: PlayerId,
    },

    /// Pool exhausted, next round dealt
    RoundCompleted {
        /// Round that just finished
        round: u32,
    },

    /// Match decided
    MatchEnded {
        /// Sole survivor, None on a draw
        winner_id: Option<PlayerId>,
    },
}

/// A game event with its caller-supplied timestamp.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameEvent {
    /// Milliseconds, caller's clock
    pub timestamp: u64,

    /// Event data
    pub data: GameEventData,
}

impl GameEvent {
    /// Create a new event.
    pub fn new(timestamp: u64, data: GameEventData) -> Self {
        Self { timestamp, data }
    }

    /// Create player joined event.
    pub fn player_joined(
        timestamp: u64,
        player_id: PlayerId,
        name: impl Into<String>,
        bot_level: Option<BotLevel>,
        loadout: Vec<ItemKind>,
    ) -> Self {
        Self::new(
            timestamp,
            GameEventData::PlayerJoined {
                player_id,
                name: name.into(),
                is_bot: bot_level.is_some(),
                bot_level,
                loadout,
            },
        )
    }

    /// Create turn started event.
    pub fn turn_started(timestamp: u64, player_id: PlayerId) -> Self {
        Self::new(timestamp, GameEventData::TurnStarted { player_id })
    }

    /// Create item used event.
    pub fn item_used(timestamp: u64, player_id: PlayerId, item: ItemKind, target: ItemTarget) -> Self {
        Self::new(timestamp, GameEventData::ItemUsed { player_id, item, target })
    }

    /// Create pill consumed event.
    pub fn pill_consumed(timestamp: u64, player_id: PlayerId, pill_id: PillId) -> Self {
        Self::new(timestamp, GameEventData::PillConsumed { player_id, pill_id })
    }

    /// Create effect applied event.
    pub fn effect_applied(timestamp: u64, target: PlayerId, effect: Effect, source: EffectSource) -> Self {
        Self::new(timestamp, GameEventData::EffectApplied { target, effect, source })
    }

    /// Create collapse triggered event.
    pub fn collapse_triggered(timestamp: u64, player_id: PlayerId) -> Self {
        Self::new(timestamp, GameEventData::CollapseTriggered { player_id })
    }

    /// Create round completed event.
    pub fn round_completed(timestamp: u64, round: u32) -> Self {
        Self::new(timestamp, GameEventData::RoundCompleted { round })
    }

    /// Create match ended event.
    pub fn match_ended(timestamp: u64, winner_id: Option<PlayerId>) -> Self {
        Self::new(timestamp, GameEventData::MatchEnded { winner_id })
    }

    /// Player the event is about, if any.
    pub fn player_id(&self) -> Option<&PlayerId> {
        match &self.data {
            GameEventData::PlayerJoined { player_id, .. }
            | GameEventData::TurnStarted { player_id }
            | GameEventData::ItemUsed { player_id, .. }
            | GameEventData::PillConsumed { player_id, .. }
            | GameEventData::CollapseTriggered { player_id } => Some(player_id),
            GameEventData::EffectApplied { target, .. } => Some(target),
            GameEventData::MatchEnded { winner_id } => winner_id.as_ref(),
            GameEventData::RoundCompleted { .. } => None,
        }
    }

    /// Short name for logs.
    pub fn kind(&self) -> &'static str {
        match &self.data {
            GameEventData::PlayerJoined { .. } => "PLAYER_JOINED",
            GameEventData::TurnStarted { .. } => "TURN_STARTED",
            GameEventData::ItemUsed { .. } => "ITEM_USED",
            GameEventData::PillConsumed { .. } => "PILL_CONSUMED",
            GameEventData::EffectApplied { .. } => "EFFECT_APPLIED",
            GameEventData::CollapseTriggered { .. } => "COLLAPSE_TRIGGERED",
            GameEventData::RoundCompleted { .. } => "ROUND_COMPLETED",
            GameEventData::MatchEnded { .. } => "MATCH_ENDED",
        }
    }
}

/// Hash of an ordered event log. Two logs hash equal only if every event,
/// timestamp included, is identical and in the same order.
pub fn hash_event_log(events: &[GameEvent]) -> Result<StateHash, bincode::Error> {
    let mut hasher = StateHasher::for_event_log();
    hasher.update_usize(events.len());
    for event in events {
        hasher.update_bytes(&bincode::serialize(event)?);
    }
    Ok(hasher.finalize())
}
