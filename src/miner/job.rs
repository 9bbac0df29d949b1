// src/miner/job.rs
//! Mining job value type
//!
//! A [`Job`] is validated once when it enters the pool and is then copied
//! into every worker. Each worker owns its copy and rewrites the nonce field
//! inside the blob as it walks its lane of the nonce space.

use crate::miner::target::Target;
use crate::utils::error::MinerError;
use serde::{Deserialize, Serialize};

/// Nonce embedded in the hashing blob
pub type Nonce = u32;

/// Byte offset of the nonce inside a Monero hashing blob
pub const NONCE_OFFSET: usize = 39;

/// Width of the nonce field in bytes
pub const NONCE_SIZE: usize = std::mem::size_of::<Nonce>();

/// Required seed hash length (RandomX key size)
pub const SEED_HASH_SIZE: usize = 32;

/// Represents a mining job received from the host
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Job {
    id: String,
    blob: Vec<u8>,
    seed_hash: Vec<u8>,
    height: u64,
    target: Target,
}

impl Job {
    /// Creates a job, validating blob and seed hash sizes
    ///
    /// # Errors
    /// - [`MinerError::InvalidBlob`] if the blob cannot hold the nonce field
    /// - [`MinerError::InvalidSeedHash`] if the seed hash is not 32 bytes
    pub fn new(
        id: impl Into<String>,
        blob: Vec<u8>,
        seed_hash: Vec<u8>,
        height: u64,
        target: Target,
    ) -> Result<Self, MinerError> {
        if !Self::validate_blob(&blob) {
            return Err(MinerError::InvalidBlob(blob.len()));
        }
        if !Self::validate_seed_hash(&seed_hash) {
            return Err(MinerError::InvalidSeedHash(seed_hash.len()));
        }

        Ok(Job {
            id: id.into(),
            blob,
            seed_hash,
            height,
            target,
        })
    }

    /// True if the blob is long enough to contain the nonce field
    pub fn validate_blob(blob: &[u8]) -> bool {
        blob.len() >= NONCE_OFFSET + NONCE_SIZE
    }

    /// True if the seed hash has exactly the engine key size
    pub fn validate_seed_hash(seed_hash: &[u8]) -> bool {
        seed_hash.len() == SEED_HASH_SIZE
    }

    /// Job identifier echoed back with candidates
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Current hashing blob, including the nonce field
    pub fn blob(&self) -> &[u8] {
        &self.blob
    }

    /// Seed hash keying the hash engine
    pub fn seed_hash(&self) -> &[u8] {
        &self.seed_hash
    }

    /// Informational block height
    pub fn height(&self) -> u64 {
        self.height
    }

    /// Share target for this job
    pub fn target(&self) -> &Target {
        &self.target
    }

    /// Overwrites the nonce field in place
    pub fn nonce_set(&mut self, nonce: Nonce) {
        self.nonce_field_mut().copy_from_slice(&nonce.to_le_bytes());
    }

    /// Advances the nonce, wrapping around on overflow
    pub fn nonce_add(&mut self, delta: Nonce) {
        let next = self.nonce().wrapping_add(delta);
        self.nonce_set(next);
    }

    /// Reads the nonce field back
    pub fn nonce(&self) -> Nonce {
        let mut bytes = [0u8; NONCE_SIZE];
        bytes.copy_from_slice(&self.blob[NONCE_OFFSET..NONCE_OFFSET + NONCE_SIZE]);
        Nonce::from_le_bytes(bytes)
    }

    /// Byte-wise seed comparison; a mismatch means the engine must be rekeyed
    pub fn seed_equal(&self, other: &Job) -> bool {
        self.seed_hash == other.seed_hash
    }

    fn nonce_field_mut(&mut self) -> &mut [u8] {
        &mut self.blob[NONCE_OFFSET..NONCE_OFFSET + NONCE_SIZE]
    }
}

/// Job notification as delivered by Monero-style stratum pools
///
/// Binary fields are hex encoded. `height` may be missing on older pools.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobMessage {
    /// Pool-assigned job identifier
    pub job_id: String,
    /// Hex-encoded hashing blob
    pub blob: String,
    /// Hex-encoded RandomX seed hash
    pub seed_hash: String,
    /// Block height the job was built for
    #[serde(default)]
    pub height: u64,
    /// Hex-encoded 4-byte target
    pub target: String,
}

impl JobMessage {
    /// Decodes hex fields and validates the resulting job
    pub fn into_job(self) -> Result<Job, MinerError> {
        let blob = hex::decode(&self.blob)?;
        let seed_hash = hex::decode(&self.seed_hash)?;
        let target = Target::from_hex(&self.target)?;
        Job::new(self.job_id, blob, seed_hash, self.height, target)
    }
}
