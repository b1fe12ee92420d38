//! State Hashing for Verification
//!
//! Provides deterministic hashing of match state for:
//! - Replay validation (same seed + same events = same hash)
//! - Cheap equality checks between a live match and its recorded log

use sha2::{Digest, Sha256};

/// Hash output type (256 bits / 32 bytes)
pub type StateHash = [u8; 32];

/// Deterministic hasher for match state.
///
/// Wraps SHA-256 with helpers for the primitive types the engine stores.
/// Order of updates is critical for determinism.
pub struct StateHasher {
    hasher: Sha256,
}

impl StateHasher {
    /// Create a new hasher with domain separator.
    pub fn new(domain: &[u8]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(domain);
        Self { hasher }
    }

    /// Create hasher for match state.
    pub fn for_match_state() -> Self {
        Self::new(b"DOSED_MATCH_STATE_V1")
    }

    /// Create hasher for an event log.
    pub fn for_event_log() -> Self {
        Self::new(b"DOSED_EVENT_LOG_V1")
    }

    /// Update with raw bytes.
    #[inline]
    pub fn update_bytes(&mut self, bytes: &[u8]) {
        self.hasher.update(bytes);
    }

    /// Update with a u8 value.
    #[inline]
    pub fn update_u8(&mut self, value: u8) {
        self.hasher.update([value]);
    }

    /// Update with a u32 value (little-endian).
    #[inline]
    pub fn update_u32(&mut self, value: u32) {
        self.hasher.update(value.to_le_bytes());
    }

    /// Update with a u64 value (little-endian).
    #[inline]
    pub fn update_u64(&mut self, value: u64) {
        self.hasher.update(value.to_le_bytes());
    }

    /// Update with an i32 value (little-endian).
    #[inline]
    pub fn update_i32(&mut self, value: i32) {
        self.hasher.update(value.to_le_bytes());
    }

    /// Update with a length or index.
    #[inline]
    pub fn update_usize(&mut self, value: usize) {
        self.update_u64(value as u64);
    }

    /// Update with a boolean.
    #[inline]
    pub fn update_bool(&mut self, value: bool) {
        self.update_u8(value as u8);
    }

    /// Update with a string, length-prefixed so that adjacent strings
    /// cannot alias.
    #[inline]
    pub fn update_str(&mut self, value: &str) {
        self.update_usize(value.len());
        self.hasher.update(value.as_bytes());
    }

    /// Update with an optional value, tagging presence.
    pub fn update_option<T>(&mut self, value: Option<&T>, mut f: impl FnMut(&mut Self, &T)) {
        match value {
            Some(v) => {
                self.update_u8(1);
                f(self, v);
            }
            None => self.update_u8(0),
        }
    }

    /// Finalize and return the hash.
    pub fn finalize(self) -> StateHash {
        self.hasher.finalize().into()
    }
}

/// Compute hash with domain separator.
pub fn hash_with_domain(domain: &[u8], data: &[u8]) -> StateHash {
    let mut hasher = Sha256::new();
    hasher.update(domain);
    hasher.update(data);
    hasher.finalize().into()
}

/// Compute state hash for match verification.
///
/// Called by `Match::compute_hash()`. The closure adds the state-specific
/// data after the seed and round number.
pub fn compute_state_hash<F>(seed: u32, round: u32, add_state: F) -> StateHash
where
    F: FnOnce(&mut StateHasher),
{
    let mut hasher = StateHasher::for_match_state();

    hasher.update_u32(seed);
    hasher.update_u32(round);

    add_state(&mut hasher);

    hasher.finalize()
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_hasher_determinism() {
        let make_hash = || {
            let mut hasher = StateHasher::for_match_state();
            hasher.update_u32(100);
            hasher.update_i32(-4);
            hasher.update_str("capsule");
            hasher.update_bool(true);
            hasher.finalize()
        };

        assert_eq!(make_hash(), make_hash());
    }

    #[test]
    fn test_hash_order_matters() {
        let hash1 = {
            let mut h = StateHasher::new(b"test");
            h.update_u32(1);
            h.update_u32(2);
            h.finalize()
        };

        let hash2 = {
            let mut h = StateHasher::new(b"test");
            h.update_u32(2);
            h.update_u32(1);
            h.finalize()
        };

        assert_ne!(hash1, hash2);
    }

    #[test]
    fn test_strings_do_not_alias() {
        let hash1 = {
            let mut h = StateHasher::new(b"test");
            h.update_str("ab");
            h.update_str("c");
            h.finalize()
        };

        let hash2 = {
            let mut h = StateHasher::new(b"test");
            h.update_str("a");
            h.update_str("bc");
            h.finalize()
        };

        assert_ne!(hash1, hash2);
    }

    #[test]
    fn test_option_presence_is_tagged() {
        let some_zero = {
            let mut h = StateHasher::new(b"test");
            h.update_option(Some(&0u32), |h, v| h.update_u32(*v));
            h.finalize()
        };
        let none = {
            let mut h = StateHasher::new(b"test");
            h.update_option(None::<&u32>, |h, v| h.update_u32(*v));
            h.finalize()
        };

        assert_ne!(some_zero, none);
    }

    #[test]
    fn test_domain_separation() {
        let data = [1u8, 2, 3, 4];

        let hash1 = hash_with_domain(b"DOMAIN_A", &data);
        let hash2 = hash_with_domain(b"DOMAIN_B", &data);

        assert_ne!(hash1, hash2);
        assert_ne!(hash_with_domain(b"DOMAIN_A", &[1u8, 2, 3]), hash1);
    }

    #[test]
    fn test_compute_state_hash() {
        let hash = compute_state_hash(12345, 1, |hasher| {
            hasher.update_i32(6);
            hasher.update_bool(true);
        });

        let hash2 = compute_state_hash(12345, 1, |hasher| {
            hasher.update_i32(6);
            hasher.update_bool(true);
        });

        assert_eq!(hash, hash2);

        let hash3 = compute_state_hash(12345, 2, |hasher| {
            hasher.update_i32(6);
            hasher.update_bool(true);
        });

        assert_ne!(hash, hash3);
    }
}
