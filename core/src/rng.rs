//! Deterministic random number generation.
//!
//! RULE: Nothing in the decision core may call any platform RNG.
//! Every execution owns exactly one `PseudoRandom`, seeded once at
//! construction from (player id hash + game id hash + salt). Two runs
//! with identical seeds and identical world states replay identically.
//!
//! Agents are generic over `RandomSource` so a scripted source can be
//! injected in tests.

use crate::error::{SimError, SimResult};
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg64Mcg;

/// The randomness capability every agent takes as an explicit dependency.
pub trait RandomSource {
    /// Uniform integer in `[min, max)`. Returns `min` when the range is empty.
    fn next_int(&mut self, min: i64, max: i64) -> i64;

    /// True with probability `1 / odds`.
    fn chance(&mut self, odds: u32) -> bool {
        if odds <= 1 {
            return true;
        }
        self.next_int(0, odds as i64) == 0
    }

    /// Uniform pick. An empty slice is a caller bug and fails loudly.
    fn rand_element<'a, T>(&mut self, items: &'a [T]) -> SimResult<&'a T> {
        if items.is_empty() {
            return Err(SimError::EmptySelection {
                context: "rand_element",
            });
        }
        let index = self.next_int(0, items.len() as i64) as usize;
        Ok(&items[index])
    }

    /// In-place Fisher–Yates shuffle drawing `next_int(0, i + 1)` from the top down.
    fn shuffle<T>(&mut self, items: &mut [T]) {
        for i in (1..items.len()).rev() {
            let j = self.next_int(0, i as i64 + 1) as usize;
            items.swap(i, j);
        }
    }
}

/// Seeded generator owned by a single execution.
pub struct PseudoRandom {
    seed: u64,
    inner: Pcg64Mcg,
}

impl PseudoRandom {
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            inner: Pcg64Mcg::seed_from_u64(seed),
        }
    }

    /// Seed derived from a player and a game, plus a fixed salt that
    /// separates different agent kinds acting for the same player.
    pub fn for_player(player_id: &str, game_id: &str, salt: u64) -> Self {
        Self::new(player_seed(player_id, game_id, salt))
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }
}

impl RandomSource for PseudoRandom {
    fn next_int(&mut self, min: i64, max: i64) -> i64 {
        if max <= min {
            return min;
        }
        self.inner.gen_range(min..max)
    }
}

/// The game's 32-bit string hash: `h = h * 31 + unit` over UTF-16 code
/// units with wrapping, absolute value of the result.
pub fn simple_hash(s: &str) -> u64 {
    let mut hash: i32 = 0;
    for unit in s.encode_utf16() {
        hash = hash
            .wrapping_shl(5)
            .wrapping_sub(hash)
            .wrapping_add(unit as i32);
    }
    hash.unsigned_abs() as u64
}

pub fn player_seed(player_id: &str, game_id: &str, salt: u64) -> u64 {
    simple_hash(player_id)
        .wrapping_add(simple_hash(game_id))
        .wrapping_add(salt)
}
