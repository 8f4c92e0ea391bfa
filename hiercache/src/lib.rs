//! # HierCache
//!
//! Hiercache is a library for simulating set-associative caches and
//! inclusive multi-level cache hierarchies
//!
//! It provides a cache engine parameterised by a replacement policy
//! (LRU, FIFO, Random, or MRU) with configurable write and write-miss
//! policies, a three-level hierarchy that models fill propagation and
//! access latency, and a simulator to replay line-oriented memory trace
//! files
//!
//! Accuracy is the priority: misses are split into compulsory and conflict,
//! writebacks and dirty evictions are tracked, and per-level hit rates use
//! conditional denominators

/// Contains the implementation of the cache engine and its address decoder
pub mod cache;

/// Contains definitions for the JSON input format and geometry validation
pub mod config;

/// Contains the three-level cache hierarchy and its access results
pub mod hierarchy;

/// Contains readers for trace files
pub mod io;

/// Contains the provided replacement policies, with a trait for implementing
/// custom replacement policies
pub mod replacement_policies;

/// Contains the simulator used to replay a trace with a given configuration
pub mod simulator;

/// Contains statistics counters and serialisable status snapshots
pub mod stats;

/// Contains the trace format and its parser
pub mod trace;

#[cfg(test)]
mod test;
