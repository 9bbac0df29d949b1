//! XMR Idle Miner - throttled background RandomX mining in Rust
//!
//! This crate provides a pool of RandomX search workers meant to run in the
//! background of a host application:
//! - Nonce-space partitioning across workers
//! - A duty-cycle regulator that caps CPU use with a live load factor
//! - Smoothed per-worker and aggregate hashrate
//! - Job hand-off with lazy rekeying when the seed hash changes
//! - A small runner reading jobs as JSON lines, plus benchmarking

#![warn(missing_docs)]
#![forbid(unsafe_code)]

/// Miner core: jobs, engines, workers and the pool
pub mod miner;

/// Statistics collection and reporting functionality
pub mod stats;

/// Utility functions and error handling
pub mod utils;

/// Command-line interface definitions
pub mod cli;

/// Configuration management
pub mod config;

/// Shared type definitions
pub mod types;

// Core exports
pub use cli::Commands;
pub use config::Config;
pub use miner::{Candidate, Job, JobMessage, Pool, PoolConfig, Target, Worker};
pub use stats::{HardwareStats, MiningStats, StatsReporter};
pub use types::RandomXMode;
pub use utils::{MinerError, init_logging};
