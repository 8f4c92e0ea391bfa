use crate::config::{
    ConfigError, HierarchyConfig, LevelConfig, WriteMissPolicyConfig, WritePolicyConfig,
};
use crate::hierarchy::{CacheLevel, HierarchicalCache, LevelOutcome};

fn default_hierarchy() -> HierarchicalCache {
    HierarchicalCache::new(&HierarchyConfig::default()).unwrap()
}

// Addresses 0x200 apart collide in the default L1 (8 sets) but spread across
// the default L2 (32 sets); addresses 0x800 apart collide in both.

#[test]
fn cold_read_walks_to_memory_and_fills_every_level() {
    let mut hierarchy = default_hierarchy();
    let result = hierarchy.read(0x0);
    assert_eq!(result.total_access_time, 1 + 10 + 30 + 100 + 3 + 2 + 1);
    assert_eq!(result.final_level, CacheLevel::MainMemory);
    assert!(!result.overall_hit);
    assert_eq!(
        result.access_path,
        "L1:MISS -> L2:MISS -> L3:MISS -> MEM:HIT -> L3:FILL -> L2:FILL -> L1:FILL"
    );
    assert_eq!(result.levels.len(), 7);
    let cycle_sum: u64 = result.levels.iter().map(|level| level.cycles).sum();
    assert_eq!(cycle_sum, result.total_access_time);
    assert_eq!(result.levels[3].level, CacheLevel::MainMemory);
    assert_eq!(result.levels[3].outcome, LevelOutcome::Hit);
    assert_eq!(result.levels[6].outcome, LevelOutcome::Fill);
}

#[test]
fn immediate_reread_costs_one_cycle() {
    let mut hierarchy = default_hierarchy();
    hierarchy.read(0x0);
    let result = hierarchy.read(0x0);
    assert_eq!(result.total_access_time, 1);
    assert_eq!(result.final_level, CacheLevel::L1);
    assert!(result.overall_hit);
    assert_eq!(result.access_path, "L1:HIT");
}

#[test]
fn l2_resolution_fills_l1() {
    let mut hierarchy = default_hierarchy();
    // Warm everything with 0x0, then push it out of the 2-way L1 set with
    // two more colliding blocks; the 4-way L2 set keeps it
    hierarchy.read(0x0);
    hierarchy.read(0x200);
    hierarchy.read(0x400);
    let result = hierarchy.read(0x0);
    assert_eq!(result.final_level, CacheLevel::L2);
    assert_eq!(result.total_access_time, 1 + 10 + 1);
    assert_eq!(result.access_path, "L1:MISS -> L2:HIT -> L1:FILL");
    // Inclusion: the fill made the very next read an L1 hit
    let again = hierarchy.read(0x0);
    assert_eq!(again.final_level, CacheLevel::L1);
    assert_eq!(again.total_access_time, 1);
}

#[test]
fn l3_resolution_fills_l2_then_l1() {
    let mut hierarchy = default_hierarchy();
    // 0x800-strided blocks collide with 0x0 in both L1 and L2. Four of them
    // overflow the 4-way L2 set, evicting 0x0 from L2 and L1 but leaving it
    // in the 8-way L3 set.
    hierarchy.read(0x0);
    for address in [0x800, 0x1000, 0x1800, 0x2000] {
        hierarchy.read(address);
    }
    let result = hierarchy.read(0x0);
    assert_eq!(result.final_level, CacheLevel::L3);
    assert_eq!(result.total_access_time, 1 + 10 + 30 + 2 + 1);
    assert_eq!(
        result.access_path,
        "L1:MISS -> L2:MISS -> L3:HIT -> L2:FILL -> L1:FILL"
    );
    let again = hierarchy.read(0x0);
    assert_eq!(again.final_level, CacheLevel::L1);
}

#[test]
fn hit_rates_use_conditional_denominators() {
    let mut hierarchy = default_hierarchy();
    hierarchy.read(0x0);
    hierarchy.read(0x0);
    assert_eq!(hierarchy.total_requests(), 2);
    assert_eq!(hierarchy.l1_hit_rate(), 50.0);
    // One request missed L1 and none of them hit L2
    assert_eq!(hierarchy.l2_hit_rate(), 0.0);
    assert_eq!(hierarchy.l3_hit_rate(), 0.0);
    assert_eq!(hierarchy.overall_hit_rate(), 50.0);
    assert_eq!(hierarchy.average_access_time(), 74.0);
}

#[test]
fn l2_hit_rate_counts_only_l1_misses() {
    let mut hierarchy = default_hierarchy();
    hierarchy.read(0x0);
    hierarchy.read(0x200);
    hierarchy.read(0x400);
    hierarchy.read(0x0);
    let status = hierarchy.status();
    assert_eq!(status.total_requests, 4);
    assert_eq!(status.l1_hits, 0);
    assert_eq!(status.l2_hits, 1);
    assert_eq!(status.main_memory_accesses, 3);
    // 1 L2 hit over 4 L1 misses
    assert_eq!(status.l2_hit_rate, 25.0);
    assert_eq!(status.overall_hit_rate, 25.0);
}

#[test]
fn cold_write_misses_through_and_fills_under_write_allocate() {
    let mut hierarchy = default_hierarchy();
    let result = hierarchy.write(0x0, 5);
    // Fills are free on the write path; only probes and memory cost cycles
    assert_eq!(result.total_access_time, 1 + 10 + 30 + 100);
    assert_eq!(result.final_level, CacheLevel::MainMemory);
    assert!(!result.overall_hit);
    assert_eq!(
        result.access_path,
        "WRITE 0x0 (data=5): L1-MISS -> L2-MISS -> L3-MISS -> MEMORY (FILL-L3) (FILL-L2) (FILL-L1)"
    );
    // The cascade left the block in L1
    let read = hierarchy.read(0x0);
    assert_eq!(read.final_level, CacheLevel::L1);
}

#[test]
fn write_hit_at_l1_completes_immediately() {
    let mut hierarchy = default_hierarchy();
    hierarchy.write(0x0, 5);
    let result = hierarchy.write(0x0, 6);
    assert_eq!(result.total_access_time, 1);
    assert_eq!(result.final_level, CacheLevel::L1);
    assert!(result.overall_hit);
    assert_eq!(result.access_path, "WRITE 0x0 (data=6): L1-HIT (COMPLETE)");
    assert_eq!(hierarchy.status().l1_hits, 1);
}

#[test]
fn write_hit_at_l2_fills_only_write_allocate_levels() {
    let mut l1 = LevelConfig::new("L1", 1024, 64, 2, 1);
    l1.write_miss_policy = WriteMissPolicyConfig::NoWriteAllocate;
    let config = HierarchyConfig {
        l1,
        ..HierarchyConfig::default()
    };
    let mut hierarchy = HierarchicalCache::new(&config).unwrap();
    // Residency in L2 but not L1
    hierarchy.read(0x0);
    hierarchy.read(0x200);
    hierarchy.read(0x400);
    let result = hierarchy.write(0x0, 9);
    assert_eq!(result.final_level, CacheLevel::L2);
    assert_eq!(result.total_access_time, 1 + 10);
    assert_eq!(result.access_path, "WRITE 0x0 (data=9): L1-MISS -> L2-HIT");
    // No fill happened, so the next read still has to go to L2
    let read = hierarchy.read(0x0);
    assert_eq!(read.final_level, CacheLevel::L2);
}

#[test]
fn no_write_allocate_everywhere_leaves_the_hierarchy_cold() {
    let mut levels = [
        LevelConfig::new("L1", 1024, 64, 2, 1),
        LevelConfig::new("L2", 8192, 64, 4, 10),
        LevelConfig::new("L3", 32768, 64, 8, 30),
    ];
    for level in &mut levels {
        level.write_policy = WritePolicyConfig::WriteThrough;
        level.write_miss_policy = WriteMissPolicyConfig::NoWriteAllocate;
    }
    let [l1, l2, l3] = levels;
    let config = HierarchyConfig {
        l1,
        l2,
        l3,
        ..HierarchyConfig::default()
    };
    let mut hierarchy = HierarchicalCache::new(&config).unwrap();
    let write = hierarchy.write(0x0, 1);
    assert_eq!(write.total_access_time, 141);
    assert_eq!(
        write.access_path,
        "WRITE 0x0 (data=1): L1-MISS -> L2-MISS -> L3-MISS -> MEMORY"
    );
    // Nothing was installed anywhere, so a read walks the full path
    let read = hierarchy.read(0x0);
    assert_eq!(read.total_access_time, 147);
    assert_eq!(hierarchy.status().main_memory_accesses, 2);
}

#[test]
fn reconfigure_replaces_engines_and_resets_counters() {
    let mut hierarchy = default_hierarchy();
    hierarchy.read(0x0);
    hierarchy
        .reconfigure(
            LevelConfig::new("L1", 512, 64, 2, 2),
            LevelConfig::new("L2", 4096, 64, 4, 20),
            LevelConfig::new("L3", 16384, 64, 8, 40),
            50,
        )
        .unwrap();
    assert_eq!(hierarchy.total_requests(), 0);
    assert_eq!(hierarchy.average_access_time(), 0.0);
    assert_eq!(hierarchy.l1().uninitialised_line_count(), 8);
    let result = hierarchy.read(0x0);
    assert_eq!(result.total_access_time, 2 + 20 + 40 + 50 + 6);
}

#[test]
fn failed_reconfigure_changes_nothing() {
    let mut hierarchy = default_hierarchy();
    hierarchy.read(0x0);
    let result = hierarchy.reconfigure(
        LevelConfig::new("L1", 512, 64, 2, 2),
        LevelConfig::new("L2", 4096, 64, 4, 20),
        LevelConfig::new("L3", 16384, 64, 0, 40),
        50,
    );
    assert!(matches!(result, Err(ConfigError::Zero { .. })));
    // Old engines and counters are intact
    assert_eq!(hierarchy.total_requests(), 1);
    let read = hierarchy.read(0x0);
    assert_eq!(read.final_level, CacheLevel::L1);
}

#[test]
fn exclusive_flag_is_accepted_but_behaves_inclusively() {
    let config = HierarchyConfig {
        inclusive: false,
        ..HierarchyConfig::default()
    };
    let mut hierarchy = HierarchicalCache::new(&config).unwrap();
    assert!(!hierarchy.inclusive());
    let result = hierarchy.read(0x0);
    assert_eq!(result.total_access_time, 147);
    let again = hierarchy.read(0x0);
    assert_eq!(again.final_level, CacheLevel::L1);
}

#[test]
fn invalid_level_rejects_the_whole_hierarchy() {
    let config = HierarchyConfig {
        l2: LevelConfig::new("L2", 1000, 64, 2, 10),
        ..HierarchyConfig::default()
    };
    assert!(matches!(
        HierarchicalCache::new(&config),
        Err(ConfigError::Indivisible { .. })
    ));
}

#[test]
fn status_snapshot_serialises() {
    let mut hierarchy = default_hierarchy();
    hierarchy.read(0x0);
    hierarchy.read(0x0);
    let value = serde_json::to_value(hierarchy.status()).unwrap();
    assert_eq!(value["total_requests"], 2);
    assert_eq!(value["l1_hits"], 1);
    assert_eq!(value["average_access_time"], 74.0);
}
