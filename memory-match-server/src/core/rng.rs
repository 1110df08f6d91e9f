//! Deterministic Random Number Generator
//!
//! Uses Xorshift128+ for the board shuffle. Given the same seed, the same
//! board layout is produced on every platform, which makes games replayable
//! from a logged seed.

use sha2::{Digest, Sha256};

/// Deterministic PRNG using the Xorshift128+ algorithm.
///
/// # Example
///
/// ```
/// use memory_match::core::rng::DeterministicRng;
///
/// let mut a = DeterministicRng::new(12345);
/// let mut b = DeterministicRng::new(12345);
/// assert_eq!(a.next_u64(), b.next_u64());
/// ```
#[derive(Clone, Debug)]
pub struct DeterministicRng {
    state: [u64; 2],
}

impl Default for DeterministicRng {
    fn default() -> Self {
        Self::new(0)
    }
}

impl DeterministicRng {
    /// Create a new RNG from a 64-bit seed.
    ///
    /// Uses SplitMix64 to initialize the internal state, ensuring
    /// good distribution even from weak seeds.
    pub fn new(seed: u64) -> Self {
        let mut s = seed;
        let state0 = splitmix64(&mut s);
        let state1 = splitmix64(&mut s);

        // Xorshift must never run from the all-zero state
        let state = if state0 == 0 && state1 == 0 {
            [1, 1]
        } else {
            [state0, state1]
        };

        Self { state }
    }

    /// Generate the next 64-bit random value.
    #[inline]
    pub fn next_u64(&mut self) -> u64 {
        let s0 = self.state[0];
        let mut s1 = self.state[1];
        let result = s0.wrapping_add(s1);

        s1 ^= s0;
        self.state[0] = s0.rotate_left(24) ^ s1 ^ (s1 << 16);
        self.state[1] = s1.rotate_left(37);

        result
    }

    /// Generate a uniformly distributed integer in `[0, max)`.
    ///
    /// Rejects draws from the incomplete top bucket so every value is
    /// equally likely.
    pub fn next_below(&mut self, max: u64) -> u64 {
        if max <= 1 {
            return 0;
        }
        let zone = u64::MAX - (u64::MAX % max);
        loop {
            let value = self.next_u64();
            if value < zone {
                return value % max;
            }
        }
    }

    /// Shuffle a slice in place using the Fisher-Yates algorithm.
    pub fn shuffle<T>(&mut self, slice: &mut [T]) {
        for i in (1..slice.len()).rev() {
            let j = self.next_below(i as u64 + 1) as usize;
            slice.swap(i, j);
        }
    }
}

/// SplitMix64 for seed initialization.
#[inline]
fn splitmix64(state: &mut u64) -> u64 {
    *state = state.wrapping_add(0x9E3779B97F4A7C15);
    let mut z = *state;
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58476D1CE4E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D049BB133111EB);
    z ^ (z >> 31)
}

/// Derive a board seed from a game id and caller-supplied entropy.
///
/// The server passes wall-clock nanos as entropy so two games with the
/// same id still get different boards.
pub fn derive_board_seed(game_id: &[u8; 16], entropy: u128) -> u64 {
    let mut hasher = Sha256::new();

    hasher.update(b"MEMORY_MATCH_SEED_V1");
    hasher.update(game_id);
    hasher.update(entropy.to_le_bytes());

    let hash = hasher.finalize();
    let mut seed = [0u8; 8];
    seed.copy_from_slice(&hash[..8]);
    u64::from_le_bytes(seed)
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rng_determinism() {
        let mut rng1 = DeterministicRng::new(12345);
        let mut rng2 = DeterministicRng::new(12345);

        for _ in 0..1000 {
            assert_eq!(rng1.next_u64(), rng2.next_u64());
        }
    }

    #[test]
    fn test_rng_different_seeds() {
        let mut rng1 = DeterministicRng::new(12345);
        let mut rng2 = DeterministicRng::new(54321);

        assert_ne!(rng1.next_u64(), rng2.next_u64());
    }

    #[test]
    fn test_next_below_range() {
        let mut rng = DeterministicRng::new(1234);

        for _ in 0..1000 {
            assert!(rng.next_below(7) < 7);
        }

        assert_eq!(rng.next_below(0), 0);
        assert_eq!(rng.next_below(1), 0);
    }

    #[test]
    fn test_next_below_hits_every_value() {
        let mut rng = DeterministicRng::new(42);
        let mut seen = [0u32; 6];

        for _ in 0..6000 {
            seen[rng.next_below(6) as usize] += 1;
        }

        // Each bucket should land near 1000
        for count in seen {
            assert!(count > 800 && count < 1200, "skewed bucket: {count}");
        }
    }

    #[test]
    fn test_shuffle_determinism() {
        let mut rng1 = DeterministicRng::new(1111);
        let mut rng2 = DeterministicRng::new(1111);

        let mut arr1 = [1, 2, 3, 4, 5, 6, 7, 8, 9, 10];
        let mut arr2 = [1, 2, 3, 4, 5, 6, 7, 8, 9, 10];

        rng1.shuffle(&mut arr1);
        rng2.shuffle(&mut arr2);

        assert_eq!(arr1, arr2);
    }

    #[test]
    fn test_shuffle_is_permutation() {
        let mut rng = DeterministicRng::new(99);
        let mut arr: Vec<u32> = (0..40).collect();

        rng.shuffle(&mut arr);
        let mut sorted = arr.clone();
        sorted.sort_unstable();

        assert_eq!(sorted, (0..40).collect::<Vec<_>>());
    }

    #[test]
    fn test_derive_board_seed() {
        let game_id = [1u8; 16];

        let seed1 = derive_board_seed(&game_id, 7);
        let seed2 = derive_board_seed(&game_id, 7);
        assert_eq!(seed1, seed2);

        assert_ne!(seed1, derive_board_seed(&game_id, 8));
        assert_ne!(seed1, derive_board_seed(&[2u8; 16], 7));
    }
}
