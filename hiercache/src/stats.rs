use serde::Serialize;

/// Counters accumulated by a single cache. Reset together, never partially.
///
/// `misses` counts every miss; the compulsory/conflict split only covers
/// misses that filled a line, so a no-write-allocate write miss contributes
/// to `misses` alone.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AccessStatistics {
    pub total_accesses: u64,
    pub hits: u64,
    pub misses: u64,
    pub compulsory_misses: u64,
    pub conflict_misses: u64,
    pub writebacks: u64,
    pub dirty_evictions: u64,
}

impl AccessStatistics {
    pub fn hit_rate(&self) -> f64 {
        if self.total_accesses == 0 {
            0.0
        } else {
            self.hits as f64 / self.total_accesses as f64
        }
    }

    pub fn miss_rate(&self) -> f64 {
        1.0 - self.hit_rate()
    }
}

/// The result of replaying a trace through a single cache. Can be serialised
/// to the output format
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TraceResults {
    pub total_accesses: u64,
    pub reads: u64,
    pub writes: u64,
    pub hits: u64,
    pub misses: u64,
    pub writebacks: u64,
    pub dirty_evictions: u64,
    pub hit_rate: f64,
    pub miss_rate: f64,
    pub replacement_policy: String,
    pub write_policy: String,
    pub write_miss_policy: String,
}

/// A read-only snapshot of one cache: its geometry, policies, and counters.
/// Querying it never mutates the cache.
#[derive(Debug, Clone, Serialize)]
pub struct CacheStatus {
    pub cache_size: u64,
    pub block_size: u64,
    pub associativity: u64,
    pub num_sets: u64,
    pub tag_bits: u32,
    pub index_bits: u32,
    pub offset_bits: u32,
    pub replacement_policy: String,
    pub write_policy: String,
    pub write_miss_policy: String,
    pub stats: AccessStatistics,
    pub hit_rate: f64,
}

/// A read-only snapshot of a hierarchy's accounting.
///
/// Per-level hit rates are conditional: L2 is measured against requests that
/// missed L1, and L3 against requests that missed both. Rates are
/// percentages.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HierarchyStatus {
    pub total_requests: u64,
    pub l1_hits: u64,
    pub l2_hits: u64,
    pub l3_hits: u64,
    pub main_memory_accesses: u64,
    pub l1_hit_rate: f64,
    pub l2_hit_rate: f64,
    pub l3_hit_rate: f64,
    pub overall_hit_rate: f64,
    pub average_access_time: f64,
}
