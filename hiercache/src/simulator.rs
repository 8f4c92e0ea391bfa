use std::time::{Duration, Instant};

use serde::Serialize;

use crate::cache::SetAssociativeCache;
use crate::config::{ConfigError, SimulationConfig};
use crate::hierarchy::HierarchicalCache;
use crate::stats::{HierarchyStatus, TraceResults};
use crate::trace::{AccessKind, TraceEntry};

/// The simulator replays parsed traces against a configured target and
/// collects results.
///
/// It supports calling simulate multiple times, and will update the time
/// taken to simulate accordingly; each call replays from a cold target.
pub struct Simulator {
    target: Target,
    simulation_time: Duration,
}

enum Target {
    Single(SetAssociativeCache),
    Hierarchy(HierarchicalCache),
}

/// The result of one simulation. Can be serialised to the output format
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum SimulationReport {
    Single(TraceResults),
    Hierarchy(HierarchyReport),
}

/// The result of replaying a trace through a hierarchy
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HierarchyReport {
    pub reads: u64,
    pub writes: u64,
    pub status: HierarchyStatus,
}

impl Simulator {
    /// Creates a new simulator for a given configuration
    ///
    /// # Arguments
    ///
    /// * `config`: A simulation configuration, usually resulting from
    ///   parsing JSON - either a single cache or a full hierarchy
    ///
    /// returns: Result<Simulator, ConfigError>
    pub fn new(config: &SimulationConfig) -> Result<Self, ConfigError> {
        let target = match config {
            SimulationConfig::Single(cache) => {
                Target::Single(SetAssociativeCache::new(cache.clone())?)
            }
            SimulationConfig::Hierarchy(hierarchy) => {
                Target::Hierarchy(HierarchicalCache::new(hierarchy)?)
            }
        };
        Ok(Self {
            target,
            simulation_time: Duration::new(0, 0),
        })
    }

    /// Replays a parsed trace against the target, from cold
    ///
    /// # Arguments
    ///
    /// * `entries`: The parsed trace, in access order
    ///
    /// returns: SimulationReport
    pub fn simulate(&mut self, entries: &[TraceEntry]) -> SimulationReport {
        let start = Instant::now();
        let report = match &mut self.target {
            Target::Single(cache) => SimulationReport::Single(cache.replay_trace(entries)),
            Target::Hierarchy(hierarchy) => {
                hierarchy.reset_statistics();
                let mut reads = 0;
                let mut writes = 0;
                for entry in entries {
                    match entry.kind {
                        AccessKind::Read => {
                            reads += 1;
                            hierarchy.read(entry.address);
                        }
                        AccessKind::Write => {
                            writes += 1;
                            hierarchy.write(entry.address, entry.data);
                        }
                    }
                }
                SimulationReport::Hierarchy(HierarchyReport {
                    reads,
                    writes,
                    status: hierarchy.status(),
                })
            }
        };
        self.simulation_time += start.elapsed();
        report
    }

    /// Gets the wall-clock execution time for processing
    pub fn get_execution_time(&self) -> &Duration {
        &self.simulation_time
    }

    /// Gets the number of uninitialised lines per cache, labelled for
    /// display
    pub fn uninitialised_line_counts(&self) -> Vec<(String, u64)> {
        match &self.target {
            Target::Single(cache) => {
                vec![("cache".to_string(), cache.uninitialised_line_count() as u64)]
            }
            Target::Hierarchy(hierarchy) => hierarchy
                .level_configs()
                .iter()
                .zip([hierarchy.l1(), hierarchy.l2(), hierarchy.l3()])
                .map(|(config, cache)| {
                    (config.name.clone(), cache.uninitialised_line_count() as u64)
                })
                .collect(),
        }
    }
}
