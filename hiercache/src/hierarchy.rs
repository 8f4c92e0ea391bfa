use std::fmt;
use std::fmt::Write as _;

use log::{debug, warn};
use serde::Serialize;

use crate::cache::SetAssociativeCache;
use crate::config::{ConfigError, HierarchyConfig, LevelConfig, WriteMissPolicyConfig};
use crate::stats::HierarchyStatus;

// A fill is cheaper than a full probe: it moves a block that is already on
// its way, so each level charges a small fixed cost instead of its access
// time
const L1_FILL_CYCLES: u64 = 1;
const L2_FILL_CYCLES: u64 = 2;
const L3_FILL_CYCLES: u64 = 3;

/// The four stops a request can make, ordered fastest first
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum CacheLevel {
    L1,
    L2,
    L3,
    MainMemory,
}

impl fmt::Display for CacheLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            CacheLevel::L1 => "L1",
            CacheLevel::L2 => "L2",
            CacheLevel::L3 => "L3",
            CacheLevel::MainMemory => "MEM",
        })
    }
}

/// What happened at one level while servicing a request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum LevelOutcome {
    Hit,
    Miss,
    Fill,
}

impl LevelOutcome {
    fn as_str(self) -> &'static str {
        match self {
            LevelOutcome::Hit => "HIT",
            LevelOutcome::Miss => "MISS",
            LevelOutcome::Fill => "FILL",
        }
    }
}

/// One level's contribution to a request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LevelAccess {
    pub level: CacheLevel,
    pub outcome: LevelOutcome,
    pub cycles: u64,
}

/// The per-level outcome of one logical request: every level touched in
/// order, the level that resolved it, and the cycles the whole journey cost.
/// Produced fresh per request and never retained by the hierarchy.
#[derive(Debug, Clone, Serialize)]
pub struct HierarchyAccessResult {
    pub levels: Vec<LevelAccess>,
    pub final_level: CacheLevel,
    pub total_access_time: u64,
    pub overall_hit: bool,
    pub access_path: String,
}

/// A three-level inclusive cache hierarchy backed by a modelled main memory.
///
/// Owns its three engines outright and is their only caller. A request
/// probes L1 first and walks down on misses; the first level to hit (main
/// memory always does) back-fills every faster level, so an address resident
/// at level N is also resident at levels 1..N once the access completes.
pub struct HierarchicalCache {
    l1: SetAssociativeCache,
    l2: SetAssociativeCache,
    l3: SetAssociativeCache,
    l1_config: LevelConfig,
    l2_config: LevelConfig,
    l3_config: LevelConfig,
    main_memory_access_time: u64,
    inclusive: bool,
    total_requests: u64,
    l1_hits: u64,
    l2_hits: u64,
    l3_hits: u64,
    main_memory_accesses: u64,
    total_access_time: u64,
}

impl HierarchicalCache {
    /// Creates a hierarchy from per-level configurations
    ///
    /// Every level is validated before any engine is built, so construction
    /// either fully succeeds or changes nothing.
    ///
    /// # Arguments
    ///
    /// * `config`: The hierarchy configuration, usually resulting from
    ///   parsing JSON
    ///
    /// returns: Result<HierarchicalCache, ConfigError>
    pub fn new(config: &HierarchyConfig) -> Result<Self, ConfigError> {
        let l1 = SetAssociativeCache::new(config.l1.engine_config())?;
        let l2 = SetAssociativeCache::new(config.l2.engine_config())?;
        let l3 = SetAssociativeCache::new(config.l3.engine_config())?;
        if !config.inclusive {
            warn!("exclusive inclusion policy is not modelled; the hierarchy will behave inclusively");
        }
        Ok(Self {
            l1,
            l2,
            l3,
            l1_config: config.l1.clone(),
            l2_config: config.l2.clone(),
            l3_config: config.l3.clone(),
            main_memory_access_time: config.main_memory_access_time,
            inclusive: config.inclusive,
            total_requests: 0,
            l1_hits: 0,
            l2_hits: 0,
            l3_hits: 0,
            main_memory_accesses: 0,
            total_access_time: 0,
        })
    }

    /// Reads `address` through the hierarchy.
    ///
    /// Probes L1, then L2, then L3, charging each probed level's access
    /// time. The first hit stops the walk and back-fills all faster levels;
    /// a miss at L3 is charged the main-memory access time unconditionally
    /// (memory always resolves) and fills every level on the way back. A
    /// probe miss installs the block at that level as a side effect, so the
    /// back-fill at that level lands as a recency-refreshing hit.
    pub fn read(&mut self, address: u32) -> HierarchyAccessResult {
        self.total_requests += 1;
        let mut levels = Vec::new();
        let mut path = String::new();
        let mut time = 0;

        let l1_hit = self.l1.read(address);
        time += self.l1_config.access_time;
        levels.push(Self::probe_record(CacheLevel::L1, l1_hit, self.l1_config.access_time));
        let _ = write!(path, "L1:{}", Self::probe_status(l1_hit));
        if l1_hit {
            self.l1_hits += 1;
            return self.finish_read(address, levels, path, time, CacheLevel::L1, true);
        }

        let l2_hit = self.l2.read(address);
        time += self.l2_config.access_time;
        levels.push(Self::probe_record(CacheLevel::L2, l2_hit, self.l2_config.access_time));
        let _ = write!(path, " -> L2:{}", Self::probe_status(l2_hit));
        if l2_hit {
            self.l2_hits += 1;
            self.fill_faster_levels(address, CacheLevel::L2);
            levels.push(Self::fill_record(CacheLevel::L1));
            time += L1_FILL_CYCLES;
            path.push_str(" -> L1:FILL");
            return self.finish_read(address, levels, path, time, CacheLevel::L2, true);
        }

        let l3_hit = self.l3.read(address);
        time += self.l3_config.access_time;
        levels.push(Self::probe_record(CacheLevel::L3, l3_hit, self.l3_config.access_time));
        let _ = write!(path, " -> L3:{}", Self::probe_status(l3_hit));
        if l3_hit {
            self.l3_hits += 1;
            self.fill_faster_levels(address, CacheLevel::L3);
            levels.push(Self::fill_record(CacheLevel::L2));
            levels.push(Self::fill_record(CacheLevel::L1));
            time += L2_FILL_CYCLES + L1_FILL_CYCLES;
            path.push_str(" -> L2:FILL -> L1:FILL");
            return self.finish_read(address, levels, path, time, CacheLevel::L3, true);
        }

        self.main_memory_accesses += 1;
        levels.push(LevelAccess {
            level: CacheLevel::MainMemory,
            outcome: LevelOutcome::Hit,
            cycles: self.main_memory_access_time,
        });
        time += self.main_memory_access_time;
        path.push_str(" -> MEM:HIT");
        self.fill_faster_levels(address, CacheLevel::MainMemory);
        levels.push(Self::fill_record(CacheLevel::L3));
        levels.push(Self::fill_record(CacheLevel::L2));
        levels.push(Self::fill_record(CacheLevel::L1));
        time += L3_FILL_CYCLES + L2_FILL_CYCLES + L1_FILL_CYCLES;
        path.push_str(" -> L3:FILL -> L2:FILL -> L1:FILL");
        self.finish_read(address, levels, path, time, CacheLevel::MainMemory, false)
    }

    /// Writes `value` at `address` through the hierarchy.
    ///
    /// Levels are probed in order with their own write policies; the first
    /// write hit resolves the request. After a hit at level K, every faster
    /// write-allocate level receives a synthetic read-fill so it stays
    /// consistent with the level that serviced the write. A write that
    /// misses through to memory runs the same fill cascade from L3 down to
    /// L1, gated by each level's own write-miss policy. Only probed levels
    /// and memory contribute latency on the write path.
    pub fn write(&mut self, address: u32, value: i32) -> HierarchyAccessResult {
        self.total_requests += 1;
        let mut levels = Vec::new();
        let mut path = String::new();
        let _ = write!(path, "WRITE 0x{address:x} (data={value}): ");
        let mut time = 0;

        let l1_hit = self.l1.write(address, value);
        time += self.l1_config.access_time;
        levels.push(Self::probe_record(CacheLevel::L1, l1_hit, self.l1_config.access_time));
        let _ = write!(path, "L1-{}", Self::probe_status(l1_hit));

        let (final_level, overall_hit) = if l1_hit {
            self.l1_hits += 1;
            path.push_str(" (COMPLETE)");
            (CacheLevel::L1, true)
        } else {
            let l2_hit = self.l2.write(address, value);
            time += self.l2_config.access_time;
            levels.push(Self::probe_record(CacheLevel::L2, l2_hit, self.l2_config.access_time));
            let _ = write!(path, " -> L2-{}", Self::probe_status(l2_hit));

            if l2_hit {
                self.l2_hits += 1;
                self.write_fill(address, CacheLevel::L1, &mut path);
                (CacheLevel::L2, true)
            } else {
                let l3_hit = self.l3.write(address, value);
                time += self.l3_config.access_time;
                levels.push(Self::probe_record(CacheLevel::L3, l3_hit, self.l3_config.access_time));
                let _ = write!(path, " -> L3-{}", Self::probe_status(l3_hit));

                if l3_hit {
                    self.l3_hits += 1;
                    self.write_fill(address, CacheLevel::L2, &mut path);
                    self.write_fill(address, CacheLevel::L1, &mut path);
                    (CacheLevel::L3, true)
                } else {
                    self.main_memory_accesses += 1;
                    time += self.main_memory_access_time;
                    levels.push(LevelAccess {
                        level: CacheLevel::MainMemory,
                        outcome: LevelOutcome::Hit,
                        cycles: self.main_memory_access_time,
                    });
                    path.push_str(" -> MEMORY");
                    self.write_fill(address, CacheLevel::L3, &mut path);
                    self.write_fill(address, CacheLevel::L2, &mut path);
                    self.write_fill(address, CacheLevel::L1, &mut path);
                    (CacheLevel::MainMemory, false)
                }
            }
        };

        self.total_access_time += time;
        debug!("{path} [{time} cycles]");
        HierarchyAccessResult {
            levels,
            final_level,
            total_access_time: time,
            overall_hit,
            access_path: path,
        }
    }

    /// Replaces all three engines with freshly-built ones and resets all
    /// statistics. Validation happens up front, so a failed reconfiguration
    /// leaves the hierarchy untouched.
    pub fn reconfigure(
        &mut self,
        l1: LevelConfig,
        l2: LevelConfig,
        l3: LevelConfig,
        main_memory_access_time: u64,
    ) -> Result<(), ConfigError> {
        let new_l1 = SetAssociativeCache::new(l1.engine_config())?;
        let new_l2 = SetAssociativeCache::new(l2.engine_config())?;
        let new_l3 = SetAssociativeCache::new(l3.engine_config())?;
        self.l1 = new_l1;
        self.l2 = new_l2;
        self.l3 = new_l3;
        self.l1_config = l1;
        self.l2_config = l2;
        self.l3_config = l3;
        self.main_memory_access_time = main_memory_access_time;
        self.reset_statistics();
        Ok(())
    }

    /// Zeroes the hierarchy's counters and fully resets all three engines
    pub fn reset_statistics(&mut self) {
        self.total_requests = 0;
        self.l1_hits = 0;
        self.l2_hits = 0;
        self.l3_hits = 0;
        self.main_memory_accesses = 0;
        self.total_access_time = 0;
        self.l1.reset();
        self.l2.reset();
        self.l3.reset();
    }

    pub fn l1(&self) -> &SetAssociativeCache {
        &self.l1
    }

    pub fn l2(&self) -> &SetAssociativeCache {
        &self.l2
    }

    pub fn l3(&self) -> &SetAssociativeCache {
        &self.l3
    }

    pub fn level_configs(&self) -> [&LevelConfig; 3] {
        [&self.l1_config, &self.l2_config, &self.l3_config]
    }

    pub fn inclusive(&self) -> bool {
        self.inclusive
    }

    pub fn total_requests(&self) -> u64 {
        self.total_requests
    }

    /// L1's hit rate over all requests, as a percentage
    pub fn l1_hit_rate(&self) -> f64 {
        if self.total_requests == 0 {
            return 0.0;
        }
        self.l1_hits as f64 / self.total_requests as f64 * 100.0
    }

    /// L2's hit rate over the requests that missed L1, as a percentage
    pub fn l2_hit_rate(&self) -> f64 {
        let l1_misses = self.total_requests - self.l1_hits;
        if l1_misses == 0 {
            return 0.0;
        }
        self.l2_hits as f64 / l1_misses as f64 * 100.0
    }

    /// L3's hit rate over the requests that missed both L1 and L2, as a
    /// percentage
    pub fn l3_hit_rate(&self) -> f64 {
        let l2_misses = self.total_requests - self.l1_hits - self.l2_hits;
        if l2_misses == 0 {
            return 0.0;
        }
        self.l3_hits as f64 / l2_misses as f64 * 100.0
    }

    pub fn overall_hit_rate(&self) -> f64 {
        if self.total_requests == 0 {
            return 0.0;
        }
        let total_hits = self.l1_hits + self.l2_hits + self.l3_hits;
        total_hits as f64 / self.total_requests as f64 * 100.0
    }

    pub fn average_access_time(&self) -> f64 {
        if self.total_requests == 0 {
            return 0.0;
        }
        self.total_access_time as f64 / self.total_requests as f64
    }

    /// A read-only snapshot of the hierarchy's counters and rates
    pub fn status(&self) -> HierarchyStatus {
        HierarchyStatus {
            total_requests: self.total_requests,
            l1_hits: self.l1_hits,
            l2_hits: self.l2_hits,
            l3_hits: self.l3_hits,
            main_memory_accesses: self.main_memory_accesses,
            l1_hit_rate: self.l1_hit_rate(),
            l2_hit_rate: self.l2_hit_rate(),
            l3_hit_rate: self.l3_hit_rate(),
            overall_hit_rate: self.overall_hit_rate(),
            average_access_time: self.average_access_time(),
        }
    }

    /// Back-fills `address` into every level faster than `from`, fastest
    /// last. Fills are synthetic reads: they never fail and never recurse
    /// further down the hierarchy.
    fn fill_faster_levels(&mut self, address: u32, from: CacheLevel) {
        match from {
            CacheLevel::MainMemory => {
                self.l3.read(address);
                self.l2.read(address);
                self.l1.read(address);
            }
            CacheLevel::L3 => {
                self.l2.read(address);
                self.l1.read(address);
            }
            CacheLevel::L2 => {
                self.l1.read(address);
            }
            CacheLevel::L1 => {}
        }
    }

    /// Read-fills one level on the write path, but only when that level
    /// allocates on write misses
    fn write_fill(&mut self, address: u32, level: CacheLevel, path: &mut String) {
        let (cache, config) = match level {
            CacheLevel::L1 => (&mut self.l1, &self.l1_config),
            CacheLevel::L2 => (&mut self.l2, &self.l2_config),
            CacheLevel::L3 => (&mut self.l3, &self.l3_config),
            CacheLevel::MainMemory => return,
        };
        if config.write_miss_policy == WriteMissPolicyConfig::WriteAllocate {
            cache.read(address);
            let _ = write!(path, " (FILL-{level})");
        }
    }

    fn finish_read(
        &mut self,
        address: u32,
        levels: Vec<LevelAccess>,
        path: String,
        time: u64,
        final_level: CacheLevel,
        overall_hit: bool,
    ) -> HierarchyAccessResult {
        self.total_access_time += time;
        debug!("READ 0x{address:x}: {path} [{time} cycles]");
        HierarchyAccessResult {
            levels,
            final_level,
            total_access_time: time,
            overall_hit,
            access_path: path,
        }
    }

    fn probe_record(level: CacheLevel, hit: bool, cycles: u64) -> LevelAccess {
        LevelAccess {
            level,
            outcome: if hit {
                LevelOutcome::Hit
            } else {
                LevelOutcome::Miss
            },
            cycles,
        }
    }

    fn fill_record(level: CacheLevel) -> LevelAccess {
        let cycles = match level {
            CacheLevel::L1 => L1_FILL_CYCLES,
            CacheLevel::L2 => L2_FILL_CYCLES,
            CacheLevel::L3 => L3_FILL_CYCLES,
            CacheLevel::MainMemory => 0,
        };
        LevelAccess {
            level,
            outcome: LevelOutcome::Fill,
            cycles,
        }
    }

    fn probe_status(hit: bool) -> &'static str {
        if hit {
            LevelOutcome::Hit.as_str()
        } else {
            LevelOutcome::Miss.as_str()
        }
    }
}
