//! Statistics collection and reporting module
//!
//! Periodically logs the pool's aggregate hashrate, worker liveness,
//! candidates found and the process's CPU and memory use. The CPU figure
//! is the quickest way to check that the load factor is being honored.

/// Submodule containing the statistics reporter implementation
pub mod reporter;

// Re-export main components
pub use reporter::{HardwareStats, MiningStats, StatsReporter};
