use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

use crate::cache::CacheLine;

/// A generic trait for implementing new replacement policies. The cache
/// invokes exactly one policy instance for its whole lifetime; swapping
/// policies requires rebuilding the cache.
///
/// Policies stamp their recency metadata directly into the lines of the set
/// they are handed, and keep any counters or generator state as instance
/// state, so independent caches never share or race on a counter.
pub trait ReplacementPolicy {
    /// Updates the policy when a resident line is hit
    ///
    /// Not applicable for some policies, a default which does nothing is
    /// provided
    ///
    /// # Arguments
    ///
    /// * `lines`: The lines of the set that was accessed
    /// * `way`: The way within the set that was hit
    fn update_on_access(&mut self, _lines: &mut [CacheLine], _way: usize) {}

    /// Updates the policy when a line is filled, whether into an empty way
    /// or over an evicted victim
    ///
    /// # Arguments
    ///
    /// * `lines`: The lines of the set that was filled
    /// * `way`: The way within the set that now holds the new line
    fn update_on_fill(&mut self, _lines: &mut [CacheLine], _way: usize) {}

    /// Selects the way to evict from a full set.
    ///
    /// Only called once every way in the set holds a valid line, except for
    /// the random policy, whose choice is independent of line validity -
    /// callers must not rely on the victim being valid there.
    ///
    /// Deterministic policies break ties towards the lowest way index.
    ///
    /// # Arguments
    ///
    /// * `lines`: The lines of the set needing an eviction
    ///
    /// returns: usize
    fn select_victim(&mut self, lines: &[CacheLine]) -> usize;

    /// Restores the policy to its freshly-constructed state
    fn reset(&mut self) {}
}

/// Least Recently Used replacement policy
///
/// Keeps a strictly increasing logical clock, stamped into a line's recency
/// field on every hit and every fill. The victim is the valid line with the
/// smallest stamp.
pub struct LeastRecentlyUsed {
    clock: u64,
}

impl LeastRecentlyUsed {
    pub fn new() -> Self {
        Self { clock: 1 }
    }

    fn stamp(&mut self, lines: &mut [CacheLine], way: usize) {
        lines[way].recency = self.clock;
        self.clock += 1;
    }
}

impl Default for LeastRecentlyUsed {
    fn default() -> Self {
        Self::new()
    }
}

impl ReplacementPolicy for LeastRecentlyUsed {
    fn update_on_access(&mut self, lines: &mut [CacheLine], way: usize) {
        self.stamp(lines, way);
    }

    fn update_on_fill(&mut self, lines: &mut [CacheLine], way: usize) {
        self.stamp(lines, way);
    }

    fn select_victim(&mut self, lines: &[CacheLine]) -> usize {
        let mut victim = 0;
        let mut min_stamp = u64::MAX;
        for (way, line) in lines.iter().enumerate() {
            if line.valid && line.recency < min_stamp {
                min_stamp = line.recency;
                victim = way;
            }
        }
        victim
    }

    fn reset(&mut self) {
        self.clock = 1;
    }
}

/// First-In First-Out replacement policy
///
/// Stamps a line only when it is filled; hits never refresh the stamp, so
/// the victim is always the line that has been resident the longest.
pub struct FirstInFirstOut {
    clock: u64,
}

impl FirstInFirstOut {
    pub fn new() -> Self {
        Self { clock: 1 }
    }
}

impl Default for FirstInFirstOut {
    fn default() -> Self {
        Self::new()
    }
}

impl ReplacementPolicy for FirstInFirstOut {
    fn update_on_fill(&mut self, lines: &mut [CacheLine], way: usize) {
        lines[way].recency = self.clock;
        self.clock += 1;
    }

    fn select_victim(&mut self, lines: &[CacheLine]) -> usize {
        let mut victim = 0;
        let mut min_stamp = u64::MAX;
        for (way, line) in lines.iter().enumerate() {
            if line.valid && line.recency < min_stamp {
                min_stamp = line.recency;
                victim = way;
            }
        }
        victim
    }

    fn reset(&mut self) {
        self.clock = 1;
    }
}

/// Most Recently Used replacement policy
///
/// Stamps lines exactly like LRU but evicts the valid line with the
/// *largest* stamp. Useful under cyclic access patterns larger than the
/// cache, where the most recently touched block is the least likely to be
/// needed again soon.
pub struct MostRecentlyUsed {
    clock: u64,
}

impl MostRecentlyUsed {
    pub fn new() -> Self {
        Self { clock: 1 }
    }

    fn stamp(&mut self, lines: &mut [CacheLine], way: usize) {
        lines[way].recency = self.clock;
        self.clock += 1;
    }
}

impl Default for MostRecentlyUsed {
    fn default() -> Self {
        Self::new()
    }
}

impl ReplacementPolicy for MostRecentlyUsed {
    fn update_on_access(&mut self, lines: &mut [CacheLine], way: usize) {
        self.stamp(lines, way);
    }

    fn update_on_fill(&mut self, lines: &mut [CacheLine], way: usize) {
        self.stamp(lines, way);
    }

    fn select_victim(&mut self, lines: &[CacheLine]) -> usize {
        let mut victim = 0;
        let mut max_stamp = 0;
        for (way, line) in lines.iter().enumerate() {
            if line.valid && line.recency > max_stamp {
                max_stamp = line.recency;
                victim = way;
            }
        }
        victim
    }

    fn reset(&mut self) {
        self.clock = 1;
    }
}

/// Random replacement policy
///
/// Picks a victim uniformly among all ways, valid or not. The generator is
/// owned by the policy instance; seeding it makes victim selection, and
/// therefore whole-trace replay, reproducible.
pub struct RandomReplacement {
    rng: SmallRng,
    seed: Option<u64>,
}

impl RandomReplacement {
    pub fn new(seed: Option<u64>) -> Self {
        Self {
            rng: Self::make_rng(seed),
            seed,
        }
    }

    fn make_rng(seed: Option<u64>) -> SmallRng {
        match seed {
            Some(seed) => SmallRng::seed_from_u64(seed),
            None => SmallRng::from_entropy(),
        }
    }
}

impl ReplacementPolicy for RandomReplacement {
    fn select_victim(&mut self, lines: &[CacheLine]) -> usize {
        self.rng.gen_range(0..lines.len())
    }

    fn reset(&mut self) {
        self.rng = Self::make_rng(self.seed);
    }
}
