//! Canary generation: a random alphanumeric prefix plus a fixed "breaker" suffix of
//! metacharacters, drawn independently per surface so that a reflection on one
//! surface can never be mistaken for one on another.
//!
//! Grounded on the teacher's own short-random-token helpers in `buster.rs`
//! (`random_ip`, `random_user_agent`), which use the same `rand::rng()` +
//! `random_range` idiom for building small randomized values per request.

use rand::distr::Alphanumeric;
use rand::Rng;

/// Metacharacters that tend to trigger server-side echoing or error paths:
/// single quote, double quote, backtick, percent, dollar, brace, pipe, backslash.
pub const BREAKER: &str = "'\"`%${|\\";

const MIN_BASE_LEN: usize = 30;
const MAX_BASE_LEN: usize = 35;

/// Upper bound on a canary's total length (base value + breaker), used by
/// finders to size their minimum chunk and by the bucket controller to size
/// its filler probes.
pub fn max_canary_len() -> usize {
    MAX_BASE_LEN + BREAKER.len()
}

/// A per-surface canary: a random base value plus the fixed breaker, and the
/// concatenation used as the literal injected value.
#[derive(Debug, Clone)]
pub struct Canary {
    pub base_value: String,
    pub breaker: String,
    pub value: String,
}

impl Canary {
    /// Draws a fresh canary. Every call independently samples its own base value,
    /// so calling this once per surface per request guarantees no cross-surface
    /// collisions (design note §9).
    pub fn generate() -> Self {
        let mut rng = rand::rng();
        let len = rng.random_range(MIN_BASE_LEN..=MAX_BASE_LEN);
        let base_value: String = (&mut rng)
            .sample_iter(&Alphanumeric)
            .take(len)
            .map(char::from)
            .collect();
        let breaker = BREAKER.to_string();
        let value = format!("{base_value}{breaker}");
        Self {
            base_value,
            breaker,
            value,
        }
    }

    /// Invariant check used by tests: canary length never shrinks the breaker away.
    pub fn is_well_formed(&self, max_canary_value: usize) -> bool {
        self.value.len() >= self.breaker.len()
            && self.base_value.len() + self.breaker.len() <= max_canary_value
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canary_suffix_is_always_the_breaker() {
        for _ in 0..50 {
            let c = Canary::generate();
            assert!(c.value.ends_with(BREAKER));
            assert!(c.base_value.len() >= MIN_BASE_LEN && c.base_value.len() <= MAX_BASE_LEN);
            assert!(c.is_well_formed(64));
        }
    }

    #[test]
    fn independent_draws_do_not_collide() {
        let a = Canary::generate();
        let b = Canary::generate();
        assert_ne!(a.base_value, b.base_value);
    }
}
