//! Game Logic Module
//!
//! All rules code. 100% deterministic, no I/O, no clock.
//!
//! ## Module Structure
//!
//! - `pill`: Pill types, modifiers, shapes
//! - `state`: Match, round, turn and player state
//! - `pool`: Per-round pool generation
//! - `effect`: Pill effects, shields, resistance cap
//! - `collapse`: ALIVE -> LAST_CHANCE -> ELIMINATED
//! - `turn`: Turn order and turn lifecycle
//! - `phase`: LOBBY -> DRAFT -> MATCH -> RESULTS
//! - `inventory`: Items, purchases, item effects
//! - `quest`: Shape quests and rewards
//! - `validation`: Invariant checks
//! - `events`: Game events for replay/verification
//! - `processor`: The event reducer

pub mod pill;
pub mod state;
pub mod pool;
pub mod effect;
pub mod collapse;
pub mod turn;
pub mod phase;
pub mod inventory;
pub mod quest;
pub mod validation;
pub mod events;
pub mod processor;

// Re-export key types
pub use pill::{Pill, PillId, PillModifier, PillState, PillType, ShapeId};
pub use state::{BotLevel, Match, MatchPhase, Player, PlayerId, Round, StatusKind, Turn};
pub use pool::Pool;
pub use effect::{Effect, EffectKind};
pub use inventory::{ItemKind, ItemTarget};
pub use events::{EffectSource, GameEvent, GameEventData};
pub use processor::{EventProcessor, ProcessOutcome, ProcessStatus, RecoveryMode, Rejection};
pub use validation::InvariantViolation;
