// src/miner/mod.rs
//! Core mining functionality
//!
//! This module contains the worker-pool engine:
//! - Job values and nonce partitioning
//! - The hash engine capability and its RandomX implementation
//! - Per-worker hashrate estimation and CPU throttling
//! - Worker threads and the pool that drives them

/// Candidate results and the sink they are reported to
pub mod candidate;

/// Hash engine capability
///
/// Workers hash through a [`HashEngine`] they own exclusively, rekeyed in
/// place whenever the job seed changes.
pub mod engine;

/// Per-worker hashrate estimator
pub mod hashrate;

/// Mining job value type and nonce manipulation
pub mod job;

/// Worker pool control surface
///
/// Creates workers on the first job, broadcasts jobs, propagates load-factor
/// changes and aggregates hashrate.
pub mod pool;

/// CPU duty-cycle regulator
pub mod regulator;

/// Truncated share target
pub mod target;

/// Worker thread implementation
///
/// Contains the search loop and the job hand-off protocol between the pool
/// and each worker thread.
pub mod worker;

// Re-export main components for cleaner imports
pub use self::candidate::{Candidate, CandidateSink};
pub use self::engine::{Digest, EngineFactory, HashEngine};
pub use self::hashrate::Hashrate;
pub use self::job::{Job, JobMessage, Nonce};
pub use self::pool::{Pool, PoolConfig};
pub use self::regulator::{LoadFactor, Regulator};
pub use self::target::Target;
pub use self::worker::{Worker, WorkerState};
