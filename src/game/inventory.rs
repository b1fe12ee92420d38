//! Items & Inventory
//!
//! Players carry up to `max_slots` inventory slots. Stackable items share a
//! slot up to their stack limit; non-stackable items occupy one slot each and
//! can only be held once.
//!
//! Using an item is split the same way as pill effects: `resolve_item_use`
//! validates the target and returns a list of [`ItemEffect`]s, which the
//! event processor then applies.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::GameConfig;
use crate::game::pill::{PillId, PillModifier, ShapeId};
use crate::game::state::{InventorySlot, Match, Player, PlayerId, StatusKind};

// =============================================================================
// CATALOG TYPES
// =============================================================================

/// Item identifier.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
#[repr(u8)]
pub enum ItemKind {
    /// Reveal one pill
    Scanner = 0,
    /// Reveal every pill of a shape
    ShapeScanner = 1,
    /// Add INVERTED to a pill
    Inverter = 2,
    /// Add DOUBLED to a pill
    Double = 3,
    /// Immediate resistance heal
    PocketPill = 4,
    /// Block the next damage
    Shield = 5,
    /// Opponent skips their next turn
    Handcuffs = 6,
    /// Opponent consumes a chosen pill
    ForceFeed = 7,
    /// Reorder the pool and hide every pill
    Shuffle = 8,
    /// Remove a pill from play
    Discard = 9,
}

impl ItemKind {
    /// All items in catalog order.
    pub const ALL: [ItemKind; 10] = [
        ItemKind::Scanner,
        ItemKind::ShapeScanner,
        ItemKind::Inverter,
        ItemKind::Double,
        ItemKind::PocketPill,
        ItemKind::Shield,
        ItemKind::Handcuffs,
        ItemKind::ForceFeed,
        ItemKind::Shuffle,
        ItemKind::Discard,
    ];
}

impl fmt::Display for ItemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ItemKind::Scanner => "scanner",
            ItemKind::ShapeScanner => "shape-scanner",
            ItemKind::Inverter => "inverter",
            ItemKind::Double => "double",
            ItemKind::PocketPill => "pocket-pill",
            ItemKind::Shield => "shield",
            ItemKind::Handcuffs => "handcuffs",
            ItemKind::ForceFeed => "force-feed",
            ItemKind::Shuffle => "shuffle",
            ItemKind::Discard => "discard",
        };
        f.write_str(name)
    }
}

/// What an item must be aimed at.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Targeting {
    /// The user
    #[serde(rename = "SELF")]
    SelfOnly,
    /// Another surviving player
    Opponent,
    /// An available pill
    Pill,
    /// A shape present in the pool
    Shape,
    /// An available pill and another surviving player
    PillAndOpponent,
    /// Nothing
    None,
}

/// Target supplied with an item use.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum ItemTarget {
    /// No target
    #[default]
    None,
    /// A pill
    Pill(PillId),
    /// A shape
    Shape(ShapeId),
    /// A player
    Opponent(PlayerId),
    /// A pill forced onto a player
    PillAndOpponent {
        /// Pill to consume
        pill: PillId,
        /// Player who consumes it
        opponent: PlayerId,
    },
}

// =============================================================================
// ERRORS
// =============================================================================

/// Inventory and item use errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InventoryError {
    /// Every slot is taken
    #[error("inventory is full ({max_slots} slots)")]
    Full {
        /// Slot limit
        max_slots: usize,
    },

    /// Adding would exceed the stack limit
    #[error("{item} stack limit of {limit} reached")]
    StackLimit {
        /// Item
        item: ItemKind,
        /// Limit
        limit: u32,
    },

    /// Not enough coins
    #[error("{item} costs {cost} coins, player has {available}")]
    InsufficientCoins {
        /// Item
        item: ItemKind,
        /// Price
        cost: u32,
        /// Coins held
        available: u32,
    },

    /// Item not held
    #[error("player does not hold {0}")]
    NotHeld(ItemKind),

    /// Item missing from the catalog
    #[error("{0} is not in the item catalog")]
    UnknownItem(ItemKind),

    /// Target does not match what the item needs
    #[error("{item} needs a {expected:?} target")]
    WrongTarget {
        /// Item
        item: ItemKind,
        /// Targeting rule
        expected: Targeting,
    },

    /// Targeted pill cannot be used
    #[error("pill {0} is not available")]
    PillUnavailable(PillId),

    /// Targeted shape is not in the pool
    #[error("no pill of shape {0} in the pool")]
    ShapeAbsent(ShapeId),

    /// Targeted opponent is missing, eliminated or the user
    #[error("{0} is not a valid opponent")]
    InvalidOpponent(PlayerId),

    /// Modifier already on the pill
    #[error("pill {pill} already carries {modifier:?}")]
    ModifierPresent {
        /// Pill
        pill: PillId,
        /// Modifier
        modifier: PillModifier,
    },

    /// No round in progress
    #[error("no pool to use {0} on")]
    NoPool(ItemKind),
}

// =============================================================================
// INVENTORY OPERATIONS
// =============================================================================

/// Add `quantity` units of an item to a copy of `player`.
pub fn add_item_to_inventory(
    player: &Player,
    item: ItemKind,
    quantity: u32,
    config: &GameConfig,
) -> Result<Player, InventoryError> {
    let catalog = config.item(item).ok_or(InventoryError::UnknownItem(item))?;
    let mut next = player.clone();

    if let Some(slot) = next.inventory.iter_mut().find(|s| s.item == item) {
        let limit = if catalog.stackable { catalog.stack_limit } else { 1 };
        if slot.quantity + quantity > limit {
            return Err(InventoryError::StackLimit { item, limit });
        }
        slot.quantity += quantity;
        return Ok(next);
    }

    if next.inventory.len() >= config.inventory.max_slots {
        return Err(InventoryError::Full { max_slots: config.inventory.max_slots });
    }
    let limit = if catalog.stackable { catalog.stack_limit } else { 1 };
    if quantity > limit {
        return Err(InventoryError::StackLimit { item, limit });
    }

    next.inventory.push(InventorySlot { item, quantity });
    Ok(next)
}

/// Remove one unit of an item from a copy of `player`. Empty slots are
/// dropped.
pub fn remove_item_from_inventory(player: &Player, item: ItemKind) -> Result<Player, InventoryError> {
    let mut next = player.clone();
    let index = next
        .inventory
        .iter()
        .position(|s| s.item == item && s.quantity > 0)
        .ok_or(InventoryError::NotHeld(item))?;

    next.inventory[index].quantity -= 1;
    if next.inventory[index].quantity == 0 {
        next.inventory.remove(index);
    }
    Ok(next)
}

/// Buy one unit of an item with pill coins.
pub fn purchase_item(player: &Player, item: ItemKind, config: &GameConfig) -> Result<Player, InventoryError> {
    let cost = config.item(item).ok_or(InventoryError::UnknownItem(item))?.cost;
    if player.pill_coins < cost {
        return Err(InventoryError::InsufficientCoins {
            item,
            cost,
            available: player.pill_coins,
        });
    }

    let mut next = add_item_to_inventory(player, item, 1, config)?;
    next.pill_coins -= cost;
    Ok(next)
}

/// Slot count within limit, no empty slots, one slot per item, every
/// quantity within its stack limit.
pub fn validate_inventory(player: &Player, config: &GameConfig) -> bool {
    if player.inventory.len() > config.inventory.max_slots {
        return false;
    }

    let mut seen = Vec::with_capacity(player.inventory.len());
    for slot in &player.inventory {
        if slot.quantity == 0 || seen.contains(&slot.item) {
            return false;
        }
        seen.push(slot.item);

        let Some(catalog) = config.item(slot.item) else {
            return false;
        };
        let limit = if catalog.stackable { catalog.stack_limit } else { 1 };
        if slot.quantity > limit {
            return false;
        }
    }
    true
}

// =============================================================================
// ITEM EFFECTS
// =============================================================================

/// A state change produced by an item.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ItemEffect {
    /// Reveal a pill
    RevealPill(PillId),
    /// Reveal every pill of a shape
    RevealShape(ShapeId),
    /// Add a modifier to a pill
    AddModifier {
        /// Pill
        pill: PillId,
        /// Modifier
        modifier: PillModifier,
    },
    /// Put a status on a player
    ApplyStatus {
        /// Player
        target: PlayerId,
        /// Status kind
        status: StatusKind,
        /// Duration in rounds
        rounds: u32,
    },
    /// Heal a player's resistance
    Heal {
        /// Player
        target: PlayerId,
        /// Amount
        amount: i32,
    },
    /// Make a player consume a pill
    ForceFeed {
        /// Player
        target: PlayerId,
        /// Pill
        pill: PillId,
    },
    /// Reorder the pool and hide every pill
    ShufflePool,
    /// Remove a pill from play
    DiscardPill(PillId),
}

fn require_available_pill(state: &Match, item: ItemKind, pill: &PillId) -> Result<(), InventoryError> {
    let pool = state.pool().ok_or(InventoryError::NoPool(item))?;
    match pool.pill(pill) {
        Some(p) if p.is_available() => Ok(()),
        _ => Err(InventoryError::PillUnavailable(pill.clone())),
    }
}

fn require_opponent(state: &Match, user: &PlayerId, opponent: &PlayerId) -> Result<(), InventoryError> {
    match state.get_player(opponent) {
        Some(p) if p.is_alive() && opponent != user => Ok(()),
        _ => Err(InventoryError::InvalidOpponent(opponent.clone())),
    }
}

/// Validate an item use against the match and list its effects.
///
/// Does not check that the user holds the item; the caller removes it.
pub fn resolve_item_use(
    item: ItemKind,
    user: &PlayerId,
    target: &ItemTarget,
    state: &Match,
    config: &GameConfig,
) -> Result<Vec<ItemEffect>, InventoryError> {
    let targeting = config.item(item).ok_or(InventoryError::UnknownItem(item))?.targeting;
    let wrong_target = || InventoryError::WrongTarget { item, expected: targeting };

    let effects = match (item, target) {
        (ItemKind::Scanner, ItemTarget::Pill(pill)) => {
            require_available_pill(state, item, pill)?;
            vec![ItemEffect::RevealPill(pill.clone())]
        }
        (ItemKind::ShapeScanner, ItemTarget::Shape(shape)) => {
            let pool = state.pool().ok_or(InventoryError::NoPool(item))?;
            if !pool.available_pills().any(|p| &p.shape == shape) {
                return Err(InventoryError::ShapeAbsent(shape.clone()));
            }
            vec![ItemEffect::RevealShape(shape.clone())]
        }
        (ItemKind::Inverter | ItemKind::Double, ItemTarget::Pill(pill)) => {
            require_available_pill(state, item, pill)?;
            let modifier = if item == ItemKind::Inverter {
                PillModifier::Inverted
            } else {
                PillModifier::Doubled
            };
            let present = state
                .pool()
                .and_then(|pool| pool.pill(pill))
                .is_some_and(|p| p.has_modifier(modifier));
            if present {
                return Err(InventoryError::ModifierPresent { pill: pill.clone(), modifier });
            }
            vec![ItemEffect::AddModifier { pill: pill.clone(), modifier }]
        }
        (ItemKind::PocketPill, ItemTarget::None) => vec![ItemEffect::Heal {
            target: user.clone(),
            amount: config.effects.pocket_pill_heal,
        }],
        (ItemKind::Shield, ItemTarget::None) => vec![ItemEffect::ApplyStatus {
            target: user.clone(),
            status: StatusKind::Shielded,
            rounds: config.effects.shield_rounds,
        }],
        (ItemKind::Handcuffs, ItemTarget::Opponent(opponent)) => {
            require_opponent(state, user, opponent)?;
            vec![ItemEffect::ApplyStatus {
                target: opponent.clone(),
                status: StatusKind::Handcuffed,
                rounds: 1,
            }]
        }
        (ItemKind::ForceFeed, ItemTarget::PillAndOpponent { pill, opponent }) => {
            require_available_pill(state, item, pill)?;
            require_opponent(state, user, opponent)?;
            vec![ItemEffect::ForceFeed {
                target: opponent.clone(),
                pill: pill.clone(),
            }]
        }
        (ItemKind::Shuffle, ItemTarget::None) => {
            state.pool().ok_or(InventoryError::NoPool(item))?;
            vec![ItemEffect::ShufflePool]
        }
        (ItemKind::Discard, ItemTarget::Pill(pill)) => {
            require_available_pill(state, item, pill)?;
            vec![ItemEffect::DiscardPill(pill.clone())]
        }
        _ => return Err(wrong_target()),
    };

    Ok(effects)
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

    fn player() -> Player {
        Player::new(PlayerId::from("p"), "P", &config())
    }

    #[test]
    fn test_add_and_stack() {
        let config = config();
        let p = add_item_to_inventory(&player(), ItemKind::Scanner, 2, &config).unwrap();
        let p = add_item_to_inventory(&p, ItemKind::Scanner, 1, &config).unwrap();
        assert_eq!(p.item_quantity(ItemKind::Scanner), 3);
        assert_eq!(p.inventory.len(), 1);

        let err = add_item_to_inventory(&p, ItemKind::Scanner, 1, &config).unwrap_err();
        assert_eq!(err, InventoryError::StackLimit { item: ItemKind::Scanner, limit: 3 });
    }

    #[test]
    fn test_non_stackable_held_once() {
        let config = config();
        let p = add_item_to_inventory(&player(), ItemKind::Shield, 1, &config).unwrap();
        assert!(add_item_to_inventory(&p, ItemKind::Shield, 1, &config).is_err());
    }

    #[test]
    fn test_slot_limit() {
        let config = config();
        let mut p = player();
        for item in &ItemKind::ALL[..5] {
            p = add_item_to_inventory(&p, *item, 1, &config).unwrap();
        }
        let err = add_item_to_inventory(&p, ItemKind::Discard, 1, &config).unwrap_err();
        assert_eq!(err, InventoryError::Full { max_slots: 5 });
        assert!(validate_inventory(&p, &config));
    }

    #[test]
    fn test_remove_drops_empty_slot() {
        let config = config();
        let p = add_item_to_inventory(&player(), ItemKind::Handcuffs, 2, &config).unwrap();
        let p = remove_item_from_inventory(&p, ItemKind::Handcuffs).unwrap();
        assert_eq!(p.item_quantity(ItemKind::Handcuffs), 1);
        let p = remove_item_from_inventory(&p, ItemKind::Handcuffs).unwrap();
        assert!(p.inventory.is_empty());
        assert_eq!(
            remove_item_from_inventory(&p, ItemKind::Handcuffs).unwrap_err(),
            InventoryError::NotHeld(ItemKind::Handcuffs)
        );
    }

    #[test]
    fn test_purchase_spends_coins() {
        let config = config();
        let p = purchase_item(&player(), ItemKind::ForceFeed, &config).unwrap();
        assert_eq!(p.pill_coins, 65);
        assert_eq!(p.item_quantity(ItemKind::ForceFeed), 1);
    }

    #[test]
    fn test_purchase_without_coins_fails() {
        let config = config();
        let mut p = player();
        p.pill_coins = 10;
        let err = purchase_item(&p, ItemKind::Shield, &config).unwrap_err();
        assert!(matches!(err, InventoryError::InsufficientCoins { cost: 30, available: 10, .. }));
    }

    #[test]
    fn test_validate_rejects_duplicate_slots() {
        let config = config();
        let mut p = player();
        p.inventory.push(InventorySlot { item: ItemKind::Scanner, quantity: 1 });
        p.inventory.push(InventorySlot { item: ItemKind::Scanner, quantity: 1 });
        assert!(!validate_inventory(&p, &config));
    }

    #[test]
    fn test_wrong_target_rejected() {
        let config = config();
        let state = Match::new(1);
        let err = resolve_item_use(ItemKind::Shield, &PlayerId::from("p"), &ItemTarget::Pill(PillId("x".into())), &state, &config)
            .unwrap_err();
        assert!(matches!(err, InventoryError::WrongTarget { .. }));
    }

    #[test]
    fn test_self_items_resolve_without_pool() {
        let config = config();
        let state = Match::new(1);
        let user = PlayerId::from("p");

        let shield = resolve_item_use(ItemKind::Shield, &user, &ItemTarget::None, &state, &config).unwrap();
        assert_eq!(
            shield,
            vec![ItemEffect::ApplyStatus { target: user.clone(), status: StatusKind::Shielded, rounds: 1 }]
        );

        let pocket = resolve_item_use(ItemKind::PocketPill, &user, &ItemTarget::None, &state, &config).unwrap();
        assert_eq!(pocket, vec![ItemEffect::Heal { target: user, amount: 2 }]);
    }

    #[test]
    fn test_pill_items_need_a_pool() {
        let config = config();
        let state = Match::new(1);
        let err = resolve_item_use(ItemKind::Shuffle, &PlayerId::from("p"), &ItemTarget::None, &state, &config)
            .unwrap_err();
        assert_eq!(err, InventoryError::NoPool(ItemKind::Shuffle));
    }

    #[test]
    fn test_item_kind_serde_is_kebab_case() {
        assert_eq!(serde_json::to_string(&ItemKind::PocketPill).unwrap(), "\"pocket-pill\"");
        assert_eq!(serde_json::to_string(&Targeting::SelfOnly).unwrap(), "\"SELF\"");
    }
}
