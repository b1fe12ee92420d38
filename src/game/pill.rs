//! Pill Definitions
//!
//! A pill is one drawable slot of a round's pool. Its type decides the base
//! effect, its modifiers transform that effect, and its shape is a cosmetic
//! attribute that items and shape quests key on.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::core::hash::StateHasher;

// =============================================================================
// PILL TYPE
// =============================================================================

/// Kind of effect a pill carries.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[repr(u8)]
pub enum PillType {
    /// No effect
    Safe = 0,
    /// Light damage
    DmgLow = 1,
    /// Heavy damage
    DmgHigh = 2,
    /// Restores resistance
    Heal = 3,
    /// Drains the current life outright
    Fatal = 4,
    /// Grants an extra life
    Life = 5,
}

impl PillType {
    /// All pill types in canonical order.
    pub const ALL: [PillType; 6] = [
        PillType::Safe,
        PillType::DmgLow,
        PillType::DmgHigh,
        PillType::Heal,
        PillType::Fatal,
        PillType::Life,
    ];

    /// Whether INVERTED/DOUBLED modifiers change this type's effect.
    #[inline]
    pub fn accepts_modifiers(self) -> bool {
        matches!(self, PillType::DmgLow | PillType::DmgHigh | PillType::Heal)
    }
}

impl fmt::Display for PillType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PillType::Safe => "SAFE",
            PillType::DmgLow => "DMG_LOW",
            PillType::DmgHigh => "DMG_HIGH",
            PillType::Heal => "HEAL",
            PillType::Fatal => "FATAL",
            PillType::Life => "LIFE",
        };
        f.write_str(name)
    }
}

/// Transformation applied to a pill's effect before resolution.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[repr(u8)]
pub enum PillModifier {
    /// Damage becomes healing and vice versa
    Inverted = 0,
    /// Magnitude doubled
    Doubled = 1,
}

/// Lifecycle of a pill within its pool.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[repr(u8)]
pub enum PillState {
    /// Still drawable
    #[default]
    Available = 0,
    /// Consumed or discarded
    Consumed = 1,
}

// =============================================================================
// IDENTIFIERS
// =============================================================================

/// Pill identifier, unique within a pool (`r{round}-p{position}`).
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PillId(pub String);

impl PillId {
    /// Identifier of the pill generated at `position` in `round`.
    pub fn for_position(round: u32, position: usize) -> Self {
        Self(format!("r{}-p{}", round, position))
    }

    /// Borrow as str.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PillId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Shape name (`capsule`, `skull`, ...).
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ShapeId(pub String);

impl ShapeId {
    /// Create from a shape name.
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Borrow as str.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ShapeId {
    fn from(name: &str) -> Self {
        Self(name.to_string())
    }
}

impl fmt::Display for ShapeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// =============================================================================
// PILL
// =============================================================================

/// A single pill in a pool.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pill {
    /// Unique id within the pool
    pub id: PillId,

    /// Cosmetic shape
    pub shape: ShapeId,

    /// Effect type
    pub pill_type: PillType,

    /// Applied modifiers, no duplicates, in application order
    pub modifiers: Vec<PillModifier>,

    /// Available or consumed
    pub state: PillState,

    /// Type visible to every player
    pub is_revealed: bool,

    /// Slot in the pool (0..size-1)
    pub position: usize,
}

impl Pill {
    /// Fresh, unrevealed, unmodified pill.
    pub fn new(round: u32, position: usize, pill_type: PillType, shape: ShapeId) -> Self {
        Self {
            id: PillId::for_position(round, position),
            shape,
            pill_type,
            modifiers: Vec::new(),
            state: PillState::Available,
            is_revealed: false,
            position,
        }
    }

    /// Can still be drawn.
    #[inline]
    pub fn is_available(&self) -> bool {
        self.state == PillState::Available
    }

    /// Check for a modifier.
    #[inline]
    pub fn has_modifier(&self, modifier: PillModifier) -> bool {
        self.modifiers.contains(&modifier)
    }

    /// Add a modifier. Returns false if it was already present.
    pub fn add_modifier(&mut self, modifier: PillModifier) -> bool {
        if self.has_modifier(modifier) {
            return false;
        }
        self.modifiers.push(modifier);
        true
    }

    /// Add pill data to hasher.
    pub fn hash_into(&self, hasher: &mut StateHasher) {
        hasher.update_str(self.id.as_str());
        hasher.update_str(self.shape.as_str());
        hasher.update_u8(self.pill_type as u8);
        hasher.update_usize(self.modifiers.len());
        for modifier in &self.modifiers {
            hasher.update_u8(*modifier as u8);
        }
        hasher.update_u8(self.state as u8);
        hasher.update_bool(self.is_revealed);
        hasher.update_usize(self.position);
    }
}

// =============================================================================
// TESTS
// =============================================================================
