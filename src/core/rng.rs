//! Deterministic Random Number Generator
//!
//! Uses the 32-bit Mersenne Twister (MT19937) so that a match seed yields the
//! exact same sequence of pools, turn orders and bot decisions on every
//! platform.
//!
//! The engine never touches the process-wide default instance. Every consumer
//! of randomness builds its own generator from [`derive_stream_seed`], so
//! adding a draw in one place cannot shift the sequence seen by another.

use std::cell::RefCell;

use serde::{Deserialize, Serialize};

const N: usize = 624;
const M: usize = 397;
const MATRIX_A: u32 = 0x9908_b0df;
const UPPER_MASK: u32 = 0x8000_0000;
const LOWER_MASK: u32 = 0x7fff_ffff;

/// Seed used by the default instance until [`set_seed`] is called.
pub const DEFAULT_SEED: u32 = 5489;

/// Deterministic PRNG using MT19937.
///
/// # Determinism Guarantee
///
/// Given the same seed, this RNG produces the exact same sequence on any
/// platform. Floating point results are derived from a single `u32` draw
/// divided by 2^32, which is exact in `f64`.
///
/// # Example
///
/// ```
/// use dosed::core::rng::SeededRng;
///
/// let mut rng = SeededRng::new(5489);
/// assert_eq!(rng.next_u32(), 3499211612); // Reference MT19937 output
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeededRng {
    seed: u32,
    mt: Vec<u32>,
    index: usize,
}

impl Default for SeededRng {
    fn default() -> Self {
        Self::new(DEFAULT_SEED)
    }
}

impl SeededRng {
    /// Create a new generator from a 32-bit seed.
    pub fn new(seed: u32) -> Self {
        let mut mt = vec![0u32; N];
        mt[0] = seed;
        for i in 1..N {
            let prev = mt[i - 1];
            mt[i] = 1_812_433_253u32
                .wrapping_mul(prev ^ (prev >> 30))
                .wrapping_add(i as u32);
        }
        Self { seed, mt, index: N }
    }

    /// Create a generator for one independent stream of a match.
    pub fn for_stream(match_seed: u32, stream: Stream) -> Self {
        Self::new(derive_stream_seed(match_seed, stream))
    }

    /// Seed this generator was created with.
    pub fn seed(&self) -> u32 {
        self.seed
    }

    fn twist(&mut self) {
        for i in 0..N {
            let y = (self.mt[i] & UPPER_MASK) | (self.mt[(i + 1) % N] & LOWER_MASK);
            let mut next = self.mt[(i + M) % N] ^ (y >> 1);
            if y & 1 != 0 {
                next ^= MATRIX_A;
            }
            self.mt[i] = next;
        }
        self.index = 0;
    }

    /// Generate the next tempered 32-bit value.
    #[inline]
    pub fn next_u32(&mut self) -> u32 {
        if self.index >= N {
            self.twist();
        }

        let mut y = self.mt[self.index];
        self.index += 1;

        y ^= y >> 11;
        y ^= (y << 7) & 0x9d2c_5680;
        y ^= (y << 15) & 0xefc6_0000;
        y ^ (y >> 18)
    }

    /// Uniform float in `[0, 1)`.
    #[inline]
    pub fn random(&mut self) -> f64 {
        f64::from(self.next_u32()) / 4_294_967_296.0
    }

    /// Uniform integer in `[min, max]` (inclusive).
    ///
    /// # Panics
    ///
    /// Panics if `min > max`. That is a programming error, not a runtime
    /// condition.
    pub fn random_int(&mut self, min: i32, max: i32) -> i32 {
        assert!(min <= max, "random_int called with min {} > max {}", min, max);
        let span = i64::from(max) - i64::from(min) + 1;
        let offset = (self.random() * span as f64).floor() as i64;
        // random() < 1.0 keeps offset below span, the clamp only guards rounding
        (i64::from(min) + offset.min(span - 1)) as i32
    }

    /// Uniform index in `[0, len)`. `len` must be non-zero.
    #[inline]
    pub fn random_index(&mut self, len: usize) -> usize {
        debug_assert!(len > 0, "random_index on empty range");
        let idx = (self.random() * len as f64) as usize;
        idx.min(len.saturating_sub(1))
    }

    /// Uniform float in `[min, max)`.
    #[inline]
    pub fn random_float(&mut self, min: f64, max: f64) -> f64 {
        min + self.random() * (max - min)
    }

    /// Returns true with the given probability.
    #[inline]
    pub fn chance(&mut self, probability: f64) -> bool {
        self.random() < probability
    }

    /// Select a random element from a slice.
    pub fn choice<'a, T>(&mut self, slice: &'a [T]) -> Option<&'a T> {
        if slice.is_empty() {
            None
        } else {
            let idx = self.random_index(slice.len());
            slice.get(idx)
        }
    }

    /// Shuffle a slice in place using Fisher-Yates.
    pub fn shuffle<T>(&mut self, slice: &mut [T]) {
        for i in (1..slice.len()).rev() {
            let j = self.random_index(i + 1);
            slice.swap(i, j);
        }
    }

    /// Shuffled copy of a slice. The input is left untouched.
    pub fn shuffled<T: Clone>(&mut self, slice: &[T]) -> Vec<T> {
        let mut out = slice.to_vec();
        self.shuffle(&mut out);
        out
    }
}

// =============================================================================
// STREAM DERIVATION
// =============================================================================

/// Independent randomness streams of a match.
///
/// Each variant maps to its own derived seed, so the draws made by one system
/// never depend on how many draws another system made before it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Stream {
    /// Turn order permutation (once per match)
    TurnOrder,
    /// Pill pool of a round
    Pool {
        /// Round number (1-based)
        round: u32,
    },
    /// Shape quests handed out at the start of a round
    Quest {
        /// Round number (1-based)
        round: u32,
    },
    /// Shuffle item activation
    ShuffleItem {
        /// Match-wide activation counter
        use_index: u64,
    },
    /// Pill picked automatically when a turn timer expires
    TimeoutPick {
        /// Round number (1-based)
        round: u32,
        /// Turn index within the round
        turn: u32,
    },
    /// Bot decision for a single turn
    Bot {
        /// Match-wide decision counter
        decision: u64,
    },
}

impl Stream {
    fn tag(self) -> (u64, u64) {
        match self {
            Stream::TurnOrder => (1, 0),
            Stream::Pool { round } => (2, u64::from(round)),
            Stream::Quest { round } => (3, u64::from(round)),
            Stream::ShuffleItem { use_index } => (4, use_index),
            Stream::TimeoutPick { round, turn } => (5, (u64::from(round) << 32) | u64::from(turn)),
            Stream::Bot { decision } => (6, decision),
        }
    }
}

/// Derive the seed of an independent stream from the match seed.
///
/// Uses SplitMix64 mixing so that neighbouring rounds or counters produce
/// unrelated seeds.
pub fn derive_stream_seed(match_seed: u32, stream: Stream) -> u32 {
    let (domain, index) = stream.tag();
    let mut state = (u64::from(match_seed) << 32) | domain;
    let first = splitmix64(&mut state);
    let mut state = first ^ index.wrapping_mul(0x9E37_79B9_7F4A_7C15);
    (splitmix64(&mut state) >> 32) as u32
}

/// SplitMix64 step.
#[inline]
fn splitmix64(state: &mut u64) -> u64 {
    *state = state.wrapping_add(0x9E37_79B9_7F4A_7C15);
    let mut z = *state;
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

// =============================================================================
// DEFAULT INSTANCE
// =============================================================================

thread_local! {
    static DEFAULT_RNG: RefCell<SeededRng> = RefCell::new(SeededRng::new(DEFAULT_SEED));
}

/// Reseed the default instance of the current thread.
pub fn set_seed(seed: u32) {
    DEFAULT_RNG.with(|rng| *rng.borrow_mut() = SeededRng::new(seed));
}

/// Run a closure against the default instance of the current thread.
pub fn with_default<R>(f: impl FnOnce(&mut SeededRng) -> R) -> R {
    DEFAULT_RNG.with(|rng| f(&mut rng.borrow_mut()))
}

// =============================================================================
// TESTS
// =============================================================================
