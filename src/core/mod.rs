//! Core deterministic primitives.
//!
//! Everything above this module draws randomness and hashes state through
//! these types, so they are the foundation of replay verification.

pub mod rng;
pub mod hash;

// Re-export core types
pub use rng::{SeededRng, Stream, derive_stream_seed};
pub use hash::{StateHash, StateHasher, compute_state_hash};
