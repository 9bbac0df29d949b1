// src/miner/engine/mod.rs
//! Hash engine capability
//!
//! Workers never talk to a hashing library directly. Each worker owns one
//! [`HashEngine`] created through an [`EngineFactory`] when its search session
//! starts, and rekeys it in place whenever a new job carries a different seed.
//! This keeps the scheduling and throttling logic independent of RandomX and
//! lets tests drive it with a deterministic engine.

/// RandomX engine backed by `rust-randomx`
///
/// Light mode keeps only the 256MB cache; fast mode builds the full ~2GB
/// dataset for several times the throughput. Either is built once per seed
/// and shared by all engines of a factory.
pub mod randomx;

use crate::utils::error::MinerError;

/// Size of a digest produced by an engine
pub const DIGEST_SIZE: usize = 32;

/// Fixed-size digest
pub type Digest = [u8; DIGEST_SIZE];

/// Per-worker hashing context
///
/// An engine is used from exactly one worker thread, so methods take
/// `&mut self` and no internal synchronization is required.
pub trait HashEngine: Send {
    /// Re-initializes the context for a new seed
    ///
    /// Must tolerate being called repeatedly on the same context.
    fn rekey(&mut self, seed: &[u8]) -> Result<(), MinerError>;

    /// Computes the digest of `blob` under the current seed
    fn hash(&mut self, blob: &[u8]) -> Digest;
}

/// Creates hash engines for new search sessions
///
/// Shared by all workers of a pool, hence `Send + Sync`.
pub trait EngineFactory: Send + Sync {
    /// Initializes an engine keyed with `seed`
    ///
    /// # Errors
    /// Returns [`MinerError::EngineInit`] if the seed is unsupported.
    fn create(&self, seed: &[u8]) -> Result<Box<dyn HashEngine>, MinerError>;

    /// Short name used in log lines
    fn name(&self) -> &str;
}
