use log::trace;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

use crate::config::{
    CacheConfig, CacheGeometry, ConfigError, ReplacementPolicyConfig, WriteMissPolicyConfig,
    WritePolicyConfig,
};
use crate::replacement_policies::{
    FirstInFirstOut, LeastRecentlyUsed, MostRecentlyUsed, RandomReplacement, ReplacementPolicy,
};
use crate::stats::{AccessStatistics, CacheStatus, TraceResults};
use crate::trace::{AccessKind, TraceEntry};

/// Splits a 32-bit address into its tag, set index, and block offset for one
/// fixed geometry.
///
/// Pure and infallible: the masks are derived from a validated geometry, so
/// every address decomposes, however large.
#[derive(Debug, Clone, Copy)]
pub struct AddressDecoder {
    offset_bits: u32,
    index_bits: u32,
    index_mask: u32,
    offset_mask: u32,
}

impl AddressDecoder {
    fn new(geometry: &CacheGeometry) -> Self {
        Self {
            offset_bits: geometry.offset_bits,
            index_bits: geometry.index_bits,
            index_mask: ((1u64 << geometry.index_bits) - 1) as u32,
            offset_mask: ((1u64 << geometry.offset_bits) - 1) as u32,
        }
    }

    pub fn tag(&self, address: u32) -> u32 {
        ((address as u64) >> (self.index_bits + self.offset_bits)) as u32
    }

    pub fn set_index(&self, address: u32) -> u32 {
        (address >> self.offset_bits) & self.index_mask
    }

    pub fn offset(&self, address: u32) -> u32 {
        address & self.offset_mask
    }
}

/// One cache line. Owned by its set for the lifetime of the cache; a reset
/// clears lines in place rather than reallocating them.
///
/// `recency` is opaque policy metadata - an LRU/MRU clock value or a FIFO
/// installation stamp, depending on the active policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheLine {
    pub valid: bool,
    pub dirty: bool,
    pub tag: u32,
    pub recency: u64,
    pub data: Vec<i32>,
}

impl CacheLine {
    fn new(words_per_block: usize) -> Self {
        Self {
            valid: false,
            dirty: false,
            tag: 0,
            recency: 0,
            data: vec![0; words_per_block],
        }
    }

    fn clear(&mut self) {
        self.valid = false;
        self.dirty = false;
        self.tag = 0;
        self.recency = 0;
        self.data.fill(0);
    }
}

/// Details of the most recent access, kept for state inspection
#[derive(Debug, Clone, Copy, Default)]
pub struct LastAccess {
    pub set_index: usize,
    pub way: usize,
    pub hit: bool,
    pub compulsory_miss: bool,
    pub write: bool,
    pub dirty_eviction: bool,
    pub evicted_tag: Option<u32>,
}

/// A set-associative cache engine.
///
/// Lines are stored in one flat pre-sized arena indexed by
/// `set_index * associativity + way`, which keeps sets contiguous and avoids
/// per-line allocation. Every access touches exactly one set and mutates at
/// most one line plus the statistics counters.
///
/// The engine is single-threaded by design: callers that share an instance
/// across threads must serialise access themselves.
pub struct SetAssociativeCache {
    config: CacheConfig,
    geometry: CacheGeometry,
    decoder: AddressDecoder,
    lines: Vec<CacheLine>,
    policy: Box<dyn ReplacementPolicy>,
    stats: AccessStatistics,
    last_access: LastAccess,
    data_rng: SmallRng,
}

impl SetAssociativeCache {
    /// Creates a new cache for a given configuration
    ///
    /// Invalid geometry is rejected here; once constructed, accesses cannot
    /// fail.
    ///
    /// # Arguments
    ///
    /// * `config`: A cache configuration, usually resulting from parsing JSON
    ///
    /// returns: Result<SetAssociativeCache, ConfigError>
    pub fn new(config: CacheConfig) -> Result<Self, ConfigError> {
        let geometry = config.geometry()?;
        let decoder = AddressDecoder::new(&geometry);
        let lines =
            vec![CacheLine::new(geometry.words_per_block); geometry.num_sets * geometry.associativity];
        let policy: Box<dyn ReplacementPolicy> = match config.replacement_policy {
            ReplacementPolicyConfig::Lru => Box::new(LeastRecentlyUsed::new()),
            ReplacementPolicyConfig::Fifo => Box::new(FirstInFirstOut::new()),
            ReplacementPolicyConfig::Random => Box::new(RandomReplacement::new(config.seed)),
            ReplacementPolicyConfig::Mru => Box::new(MostRecentlyUsed::new()),
        };
        let data_rng = match config.seed {
            Some(seed) => SmallRng::seed_from_u64(seed),
            None => SmallRng::from_entropy(),
        };
        Ok(Self {
            config,
            geometry,
            decoder,
            lines,
            policy,
            stats: AccessStatistics::default(),
            last_access: LastAccess::default(),
            data_rng,
        })
    }

    /// Reads the block containing `address`, returning true on a hit.
    ///
    /// A miss always installs the block: into an invalid way when one exists
    /// (a compulsory miss), otherwise over the policy's victim (a conflict
    /// miss). Evicting a dirty victim under write-back records a writeback
    /// before the line is overwritten.
    pub fn read(&mut self, address: u32) -> bool {
        self.stats.total_accesses += 1;
        let tag = self.decoder.tag(address);
        let set_index = self.decoder.set_index(address) as usize;
        self.last_access = LastAccess {
            set_index,
            ..LastAccess::default()
        };

        let (base, end) = self.set_bounds(set_index);
        if let Some(way) = self.find_line(base, end, tag) {
            self.stats.hits += 1;
            self.last_access.hit = true;
            self.last_access.way = way;
            self.policy.update_on_access(&mut self.lines[base..end], way);
            trace!("read hit: address={address:#010x} set={set_index} way={way}");
            return true;
        }

        self.stats.misses += 1;
        let way = self.fill_line(set_index, tag);
        trace!("read miss: address={address:#010x} set={set_index} filled way={way}");
        false
    }

    /// Writes `value` into the block containing `address`, returning true on
    /// a hit.
    ///
    /// Write-through leaves a hit line clean (the write passes straight
    /// through to memory); write-back marks it dirty. On a miss,
    /// no-write-allocate leaves the cache untouched, while write-allocate
    /// installs the block exactly as a read miss would and then applies the
    /// same dirty rule as a hit.
    pub fn write(&mut self, address: u32, value: i32) -> bool {
        self.stats.total_accesses += 1;
        let tag = self.decoder.tag(address);
        let set_index = self.decoder.set_index(address) as usize;
        let offset = self.decoder.offset(address) as usize;
        self.last_access = LastAccess {
            set_index,
            write: true,
            ..LastAccess::default()
        };

        let (base, end) = self.set_bounds(set_index);
        if let Some(way) = self.find_line(base, end, tag) {
            self.stats.hits += 1;
            self.last_access.hit = true;
            self.last_access.way = way;
            let line = &mut self.lines[base + way];
            if offset < line.data.len() {
                line.data[offset] = value;
            }
            if self.config.write_policy == WritePolicyConfig::WriteBack {
                line.dirty = true;
            }
            self.policy.update_on_access(&mut self.lines[base..end], way);
            trace!("write hit: address={address:#010x} set={set_index} way={way}");
            return true;
        }

        self.stats.misses += 1;
        if self.config.write_miss_policy == WriteMissPolicyConfig::NoWriteAllocate {
            trace!("write miss: address={address:#010x} set={set_index} no allocation");
            return false;
        }
        let way = self.fill_line(set_index, tag);
        let line = &mut self.lines[base + way];
        if offset < line.data.len() {
            line.data[offset] = value;
        }
        if self.config.write_policy == WritePolicyConfig::WriteBack {
            line.dirty = true;
        }
        trace!("write miss: address={address:#010x} set={set_index} allocated way={way}");
        false
    }

    /// Replays a trace from a cold cache, applying each entry in order
    ///
    /// # Arguments
    ///
    /// * `entries`: The parsed trace, in access order
    ///
    /// returns: TraceResults
    pub fn replay_trace(&mut self, entries: &[TraceEntry]) -> TraceResults {
        self.reset();
        let mut reads = 0;
        let mut writes = 0;
        for entry in entries {
            match entry.kind {
                AccessKind::Read => {
                    reads += 1;
                    self.read(entry.address);
                }
                AccessKind::Write => {
                    writes += 1;
                    self.write(entry.address, entry.data);
                }
            }
        }
        TraceResults {
            total_accesses: self.stats.total_accesses,
            reads,
            writes,
            hits: self.stats.hits,
            misses: self.stats.misses,
            writebacks: self.stats.writebacks,
            dirty_evictions: self.stats.dirty_evictions,
            hit_rate: self.stats.hit_rate(),
            miss_rate: self.stats.miss_rate(),
            replacement_policy: self.config.replacement_policy.to_string(),
            write_policy: self.config.write_policy.to_string(),
            write_miss_policy: self.config.write_miss_policy.to_string(),
        }
    }

    /// Replaces the cache's configuration wholesale, which implies a full
    /// reset. Validation happens first, so a failed reconfiguration leaves
    /// the cache untouched.
    pub fn reconfigure(&mut self, config: CacheConfig) -> Result<(), ConfigError> {
        *self = Self::new(config)?;
        Ok(())
    }

    /// Clears all line state, policy counters, and statistics atomically. No
    /// line is valid afterwards.
    pub fn reset(&mut self) {
        for line in &mut self.lines {
            line.clear();
        }
        self.policy.reset();
        self.stats = AccessStatistics::default();
        self.last_access = LastAccess::default();
    }

    /// Zeroes the statistics counters without touching line state
    pub fn reset_statistics(&mut self) {
        self.stats = AccessStatistics::default();
    }

    pub fn stats(&self) -> &AccessStatistics {
        &self.stats
    }

    pub fn last_access(&self) -> &LastAccess {
        &self.last_access
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    pub fn geometry(&self) -> &CacheGeometry {
        &self.geometry
    }

    pub fn decoder(&self) -> &AddressDecoder {
        &self.decoder
    }

    /// The line at (set, way), for state inspection
    pub fn line(&self, set_index: usize, way: usize) -> &CacheLine {
        &self.lines[set_index * self.geometry.associativity + way]
    }

    /// Gets the number of uninitialised cache lines. Useful for analysing
    /// cache occupancy or debugging
    pub fn uninitialised_line_count(&self) -> usize {
        self.lines.iter().filter(|line| !line.valid).count()
    }

    /// A read-only snapshot of the cache's configuration and counters
    pub fn status(&self) -> CacheStatus {
        CacheStatus {
            cache_size: self.config.cache_size,
            block_size: self.config.block_size,
            associativity: self.config.associativity,
            num_sets: self.geometry.num_sets as u64,
            tag_bits: self.geometry.tag_bits,
            index_bits: self.geometry.index_bits,
            offset_bits: self.geometry.offset_bits,
            replacement_policy: self.config.replacement_policy.to_string(),
            write_policy: self.config.write_policy.to_string(),
            write_miss_policy: self.config.write_miss_policy.to_string(),
            stats: self.stats,
            hit_rate: self.stats.hit_rate(),
        }
    }

    fn set_bounds(&self, set_index: usize) -> (usize, usize) {
        let base = set_index * self.geometry.associativity;
        (base, base + self.geometry.associativity)
    }

    fn find_line(&self, base: usize, end: usize, tag: u32) -> Option<usize> {
        self.lines[base..end]
            .iter()
            .position(|line| line.valid && line.tag == tag)
    }

    /// Installs `tag` into the set, evicting a victim when no invalid way is
    /// left, and returns the way that was filled. Updates the miss-subtype,
    /// writeback, and dirty-eviction counters.
    fn fill_line(&mut self, set_index: usize, tag: u32) -> usize {
        let (base, end) = self.set_bounds(set_index);
        let way = match self.lines[base..end].iter().position(|line| !line.valid) {
            Some(way) => {
                self.stats.compulsory_misses += 1;
                self.last_access.compulsory_miss = true;
                way
            }
            None => {
                let way = self.policy.select_victim(&self.lines[base..end]);
                self.stats.conflict_misses += 1;
                let victim = &self.lines[base + way];
                self.last_access.evicted_tag = Some(victim.tag);
                if self.config.write_policy == WritePolicyConfig::WriteBack && victim.dirty {
                    self.stats.writebacks += 1;
                    self.stats.dirty_evictions += 1;
                    self.last_access.dirty_eviction = true;
                }
                way
            }
        };
        let line = &mut self.lines[base + way];
        line.valid = true;
        line.tag = tag;
        line.dirty = false;
        line.recency = 0;
        // Real contents aren't modelled; blocks are filled with placeholder
        // words
        for word in line.data.iter_mut() {
            *word = self.data_rng.gen_range(0..1000);
        }
        self.policy.update_on_fill(&mut self.lines[base..end], way);
        self.last_access.way = way;
        way
    }
}
