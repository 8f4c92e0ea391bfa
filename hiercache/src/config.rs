use std::fmt;

use serde::Deserialize;
use thiserror::Error;

/// Width of the modelled address space in bits. Tags are whatever is left of
/// an address after the index and offset fields are removed.
pub const ADDRESS_BITS: u32 = 32;

/// Size of one data word in bytes. Lines store `block_size / WORD_BYTES`
/// words of placeholder data.
pub const WORD_BYTES: u64 = 4;

/// A configuration for a single set-associative cache
#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
    pub cache_size: u64,
    pub block_size: u64,
    pub associativity: u64,
    #[serde(default)]
    pub replacement_policy: ReplacementPolicyConfig,
    #[serde(default)]
    pub write_policy: WritePolicyConfig,
    #[serde(default)]
    pub write_miss_policy: WriteMissPolicyConfig,
    /// Seed for the placeholder-data generator and the random replacement
    /// policy. Replays with the same seed are fully deterministic; without a
    /// seed the generators are seeded from OS entropy.
    #[serde(default)]
    pub seed: Option<u64>,
}

/// A configuration for one level of a cache hierarchy: the geometry of the
/// underlying cache plus its fixed access cost in cycles and a display name
#[derive(Debug, Clone, Deserialize)]
pub struct LevelConfig {
    pub name: String,
    pub cache_size: u64,
    pub block_size: u64,
    pub associativity: u64,
    pub access_time: u64,
    #[serde(default)]
    pub replacement_policy: ReplacementPolicyConfig,
    #[serde(default = "LevelConfig::default_write_policy")]
    pub write_policy: WritePolicyConfig,
    #[serde(default)]
    pub write_miss_policy: WriteMissPolicyConfig,
    #[serde(default)]
    pub seed: Option<u64>,
}

impl LevelConfig {
    pub fn new(
        name: impl Into<String>,
        cache_size: u64,
        block_size: u64,
        associativity: u64,
        access_time: u64,
    ) -> Self {
        Self {
            name: name.into(),
            cache_size,
            block_size,
            associativity,
            access_time,
            replacement_policy: ReplacementPolicyConfig::default(),
            write_policy: Self::default_write_policy(),
            write_miss_policy: WriteMissPolicyConfig::default(),
            seed: None,
        }
    }

    // Hierarchy levels default to write-back, unlike standalone caches
    fn default_write_policy() -> WritePolicyConfig {
        WritePolicyConfig::WriteBack
    }

    /// The configuration of the cache engine backing this level
    pub fn engine_config(&self) -> CacheConfig {
        CacheConfig {
            cache_size: self.cache_size,
            block_size: self.block_size,
            associativity: self.associativity,
            replacement_policy: self.replacement_policy,
            write_policy: self.write_policy,
            write_miss_policy: self.write_miss_policy,
            seed: self.seed,
        }
    }
}

/// A configuration for a three-level cache hierarchy backed by main memory
#[derive(Debug, Clone, Deserialize)]
pub struct HierarchyConfig {
    pub l1: LevelConfig,
    pub l2: LevelConfig,
    pub l3: LevelConfig,
    #[serde(default = "HierarchyConfig::default_memory_time")]
    pub main_memory_access_time: u64,
    /// Only inclusive behaviour is modelled; an exclusive hierarchy is
    /// accepted as configuration but behaves identically.
    #[serde(default = "HierarchyConfig::default_inclusive")]
    pub inclusive: bool,
}

impl HierarchyConfig {
    fn default_memory_time() -> u64 {
        100
    }

    fn default_inclusive() -> bool {
        true
    }
}

impl Default for HierarchyConfig {
    fn default() -> Self {
        Self {
            l1: LevelConfig::new("L1", 1024, 64, 2, 1),
            l2: LevelConfig::new("L2", 8192, 64, 4, 10),
            l3: LevelConfig::new("L3", 32768, 64, 8, 30),
            main_memory_access_time: Self::default_memory_time(),
            inclusive: Self::default_inclusive(),
        }
    }
}

/// The top-level simulation configuration, usually resulting from parsing
/// JSON: either a full hierarchy or a single standalone cache
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum SimulationConfig {
    Hierarchy(HierarchyConfig),
    Single(CacheConfig),
}

/// The replacement policy - lru, fifo, random, or mru. Defaults to lru.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Deserialize)]
pub enum ReplacementPolicyConfig {
    #[serde(alias = "lru")]
    Lru,
    #[serde(alias = "fifo")]
    Fifo,
    #[serde(alias = "random")]
    Random,
    #[serde(alias = "mru")]
    Mru,
}

impl Default for ReplacementPolicyConfig {
    fn default() -> Self {
        ReplacementPolicyConfig::Lru
    }
}

impl fmt::Display for ReplacementPolicyConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ReplacementPolicyConfig::Lru => "LRU",
            ReplacementPolicyConfig::Fifo => "FIFO",
            ReplacementPolicyConfig::Random => "Random",
            ReplacementPolicyConfig::Mru => "MRU",
        })
    }
}

/// The write-hit policy - write_through or write_back. Defaults to
/// write_through.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Deserialize)]
pub enum WritePolicyConfig {
    #[serde(alias = "write_through")]
    WriteThrough,
    #[serde(alias = "write_back")]
    WriteBack,
}

impl Default for WritePolicyConfig {
    fn default() -> Self {
        WritePolicyConfig::WriteThrough
    }
}

impl fmt::Display for WritePolicyConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            WritePolicyConfig::WriteThrough => "Write-Through",
            WritePolicyConfig::WriteBack => "Write-Back",
        })
    }
}

/// The write-miss policy - write_allocate or no_write_allocate. Defaults to
/// write_allocate.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Deserialize)]
pub enum WriteMissPolicyConfig {
    #[serde(alias = "write_allocate")]
    WriteAllocate,
    #[serde(alias = "no_write_allocate")]
    NoWriteAllocate,
}

impl Default for WriteMissPolicyConfig {
    fn default() -> Self {
        WriteMissPolicyConfig::WriteAllocate
    }
}

impl fmt::Display for WriteMissPolicyConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            WriteMissPolicyConfig::WriteAllocate => "Write-Allocate",
            WriteMissPolicyConfig::NoWriteAllocate => "No-Write-Allocate",
        })
    }
}

/// An invalid cache geometry, rejected when the cache is constructed
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{field} must be greater than zero")]
    Zero { field: &'static str },
    #[error("cache_size {cache_size} is not divisible by block_size * associativity ({block_size} * {associativity})")]
    Indivisible {
        cache_size: u64,
        block_size: u64,
        associativity: u64,
    },
    #[error("{field} must be a power of two, got {value}")]
    NotPowerOfTwo { field: &'static str, value: u64 },
    #[error("geometry needs {index_bits} index and {offset_bits} offset bits, which does not fit a 32-bit address")]
    AddressSpace { index_bits: u32, offset_bits: u32 },
}

/// The derived geometry of a validated cache configuration. Bit-mask address
/// decomposition is only valid because `block_size` and `num_sets` are
/// checked to be powers of two.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheGeometry {
    pub num_sets: usize,
    pub associativity: usize,
    pub words_per_block: usize,
    pub offset_bits: u32,
    pub index_bits: u32,
    pub tag_bits: u32,
}

impl CacheConfig {
    /// Validates the configuration and derives its geometry.
    ///
    /// Fails fast on invalid geometry; nothing here is ever silently
    /// coerced. Once a geometry exists, address decomposition cannot fail.
    pub fn geometry(&self) -> Result<CacheGeometry, ConfigError> {
        for (field, value) in [
            ("cache_size", self.cache_size),
            ("block_size", self.block_size),
            ("associativity", self.associativity),
        ] {
            if value == 0 {
                return Err(ConfigError::Zero { field });
            }
        }
        if self.cache_size % (self.block_size * self.associativity) != 0 {
            return Err(ConfigError::Indivisible {
                cache_size: self.cache_size,
                block_size: self.block_size,
                associativity: self.associativity,
            });
        }
        let num_sets = self.cache_size / (self.block_size * self.associativity);
        if !self.block_size.is_power_of_two() {
            return Err(ConfigError::NotPowerOfTwo {
                field: "block_size",
                value: self.block_size,
            });
        }
        if !num_sets.is_power_of_two() {
            return Err(ConfigError::NotPowerOfTwo {
                field: "num_sets",
                value: num_sets,
            });
        }
        let offset_bits = self.block_size.trailing_zeros();
        let index_bits = num_sets.trailing_zeros();
        if offset_bits + index_bits > ADDRESS_BITS {
            return Err(ConfigError::AddressSpace {
                index_bits,
                offset_bits,
            });
        }
        Ok(CacheGeometry {
            num_sets: num_sets as usize,
            associativity: self.associativity as usize,
            words_per_block: (self.block_size / WORD_BYTES) as usize,
            offset_bits,
            index_bits,
            tag_bits: ADDRESS_BITS - index_bits - offset_bits,
        })
    }
}
