// src/miner/target.rs
//! Truncated difficulty target
//!
//! Pools hand out the most-significant 4 bytes of the share threshold. A
//! digest is accepted by comparing those bytes one by one against the
//! high-order end of the digest, which is a cheaper and looser check than a
//! full 256-bit comparison. Pools issue targets with this check in mind, so
//! it is kept as is.

use crate::miner::engine::Digest;
use crate::utils::error::MinerError;
use std::fmt;

/// Compact share target
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Target([u8; Target::SIZE]);

impl Target {
    /// Width of the compared window in bytes
    pub const SIZE: usize = 4;

    /// Wraps raw target bytes as sent by the pool
    pub fn new(bytes: [u8; Target::SIZE]) -> Self {
        Target(bytes)
    }

    /// Builds a target from a slice, rejecting any other width
    pub fn from_slice(bytes: &[u8]) -> Result<Self, MinerError> {
        let bytes: [u8; Target::SIZE] = bytes
            .try_into()
            .map_err(|_| MinerError::InvalidTarget(bytes.len()))?;
        Ok(Target(bytes))
    }

    /// Decodes a hex-encoded target (8 hex characters)
    pub fn from_hex(s: &str) -> Result<Self, MinerError> {
        Self::from_slice(&hex::decode(s)?)
    }

    /// Raw target bytes
    pub fn as_bytes(&self) -> &[u8; Target::SIZE] {
        &self.0
    }

    /// Checks whether `digest` satisfies this target
    ///
    /// Both arrays are walked from their last byte backwards, pairing
    /// `target[3]` with `digest[31]`, `target[2]` with `digest[30]` and so on.
    /// Every paired digest byte must be less than or equal to its target byte.
    pub fn is_met_by(&self, digest: &Digest) -> bool {
        self.0
            .iter()
            .rev()
            .zip(digest.iter().rev())
            .all(|(target, hash)| target >= hash)
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}
