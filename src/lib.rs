//! # DOSED Rules Engine
//!
//! Deterministic rules engine for DOSED, a turn-based pill-roulette game.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      DOSED ENGINE                            │
//! ├─────────────────────────────────────────────────────────────┤
//! │  core/            - Deterministic primitives                 │
//! │  ├── rng.rs       - Seeded MT19937, per-purpose streams      │
//! │  └── hash.rs      - State hashing for replay verification    │
//! │                                                              │
//! │  config.rs        - Tuning data, loaded once, validated      │
//! │                                                              │
//! │  game/            - Rules (deterministic)                    │
//! │  ├── pill.rs      - Pill types, modifiers, shapes            │
//! │  ├── state.rs     - Match, round, turn, player state         │
//! │  ├── pool.rs      - Round pool generation                    │
//! │  ├── effect.rs    - Pill effects and shields                 │
//! │  ├── collapse.rs  - Lives and elimination                    │
//! │  ├── turn.rs      - Turn order and handcuffs                 │
//! │  ├── phase.rs     - Match phase state machine                │
//! │  ├── inventory.rs - Items                                    │
//! │  ├── quest.rs     - Shape quests                             │
//! │  ├── validation.rs- Invariants                               │
//! │  ├── events.rs    - The 8 game events                        │
//! │  └── processor.rs - Event reducer                            │
//! │                                                              │
//! │  bot/             - Bot policies (read-only on state)        │
//! │  └── easy.rs      - Easy tier                                │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Determinism Guarantee
//!
//! The `core/`, `game/` and `bot/` modules are **100% deterministic**:
//! - No HashMap (uses BTreeMap for sorted iteration)
//! - No system time dependencies, timestamps come with events
//! - All randomness from seeded MT19937 streams derived from the match seed
//!
//! Given the same initial state and the same root events, replay produces
//! **identical state** and an identical state hash.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod bot;
pub mod config;
pub mod core;
pub mod game;

// Re-export commonly used types
pub use crate::config::{ConfigError, GameConfig};
pub use crate::core::hash::StateHash;
pub use crate::core::rng::SeededRng;
pub use crate::game::events::{GameEvent, GameEventData};
pub use crate::game::processor::{replay_events, EventProcessor, ProcessError, RecoveryMode};
pub use crate::game::state::{Match, MatchPhase, Player, PlayerId};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
