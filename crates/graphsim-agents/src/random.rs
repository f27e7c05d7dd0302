//! Forkable deterministic randomness.
//!
//! The whole simulation hangs off one master [`RandomSource`]. Every consumer
//! (an agent invocation, a region) receives its own child forked from its
//! parent with [`RandomSource::next_source`], so the randomness a region sees
//! depends only on the master seed and the order of forks, never on which
//! backend is running or how many draws a sibling made.
//!
//! Each helper consumes a fixed, documented number of 64-bit draws so the
//! stream stays aligned whatever values come out of it.

use graphsim_world::uniform_index;
use rand::{RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// A seeded ChaCha8 stream that can fork child streams.
///
/// Not a security primitive.
#[derive(Debug, Clone)]
pub struct RandomSource {
    seed: u64,
    rng: ChaCha8Rng,
}

impl RandomSource {
    /// Start a new stream from a seed.
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    /// The seed this stream was started from.
    pub const fn seed(&self) -> u64 {
        self.seed
    }

    /// Fork a child stream. Consumes one draw from `self`.
    #[must_use]
    pub fn next_source(&mut self) -> Self {
        Self::new(self.rng.next_u64())
    }

    /// A fair coin. Consumes one draw.
    pub fn next_bool(&mut self) -> bool {
        self.rng.next_u64() & 1 == 1
    }

    /// A value in `0..bound`, or 0 when `bound` is 0. Consumes one draw.
    pub fn next_below(&mut self, bound: usize) -> usize {
        uniform_index(self.rng.next_u64(), bound)
    }

    /// A non-negative 63-bit value, as stored in `BIGINT` columns.
    /// Consumes one draw.
    pub fn next_u63(&mut self) -> i64 {
        i64::try_from(self.rng.next_u64().wrapping_shr(1)).unwrap_or(i64::MAX)
    }

    /// Pick one element. Consumes one draw, or none for an empty slice.
    pub fn choose<'a, T>(&mut self, items: &'a [T]) -> Option<&'a T> {
        if items.is_empty() {
            return None;
        }
        items.get(self.next_below(items.len()))
    }

    /// Fisher-Yates shuffle in place. Consumes `len - 1` draws.
    pub fn shuffle<T>(&mut self, items: &mut [T]) {
        let mut upper = items.len();
        while upper > 1 {
            let last = upper.saturating_sub(1);
            let j = self.next_below(upper);
            items.swap(last, j);
            upper = last;
        }
    }

    /// Assign each of `resources` items to one of `recipients`.
    ///
    /// Returns, per resource, the index of the recipient it went to. Consumes
    /// one draw per resource when there are two or more recipients and none
    /// otherwise. With no recipients the allocation is empty.
    pub fn random_allocation(&mut self, recipients: usize, resources: usize) -> Vec<usize> {
        match recipients {
            0 => Vec::new(),
            1 => vec![0; resources],
            _ => (0..resources).map(|_| self.next_below(recipients)).collect(),
        }
    }
}

impl RngCore for RandomSource {
    fn next_u32(&mut self) -> u32 {
        self.rng.next_u32()
    }

    fn next_u64(&mut self) -> u64 {
        self.rng.next_u64()
    }

    fn fill_bytes(&mut self, dst: &mut [u8]) {
        self.rng.fill_bytes(dst);
    }
}
