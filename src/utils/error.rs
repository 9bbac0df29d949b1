// src/utils/error.rs
use std::io;
use thiserror::Error;

/// Main error type for the mining application
///
/// Covers job validation failures rejected at the pool boundary, failures
/// that end a single worker's search session, and the configuration and
/// I/O errors of the host binary.
#[derive(Error, Debug)]
pub enum MinerError {
    /// Job blob is too short to hold the nonce field
    #[error("Invalid blob length: {0} bytes")]
    InvalidBlob(usize),

    /// Seed hash does not have the size the hash engine expects
    #[error("Invalid seed hash length: {0} bytes")]
    InvalidSeedHash(usize),

    /// Target does not have the fixed compared width
    #[error("Invalid target length: {0} bytes")]
    InvalidTarget(usize),

    /// Hash engine could not be initialized or rekeyed for a seed
    #[error("Hash engine init failed: {0}")]
    EngineInit(String),

    /// Worker thread could not be started
    #[error("Failed to spawn worker thread: {0}")]
    ThreadSpawn(#[source] io::Error),

    /// Standard I/O operation errors
    #[error("I/O error: {0}")]
    IoError(#[from] io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// Configuration file or parameter errors
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Invalid user input or parameter errors
    #[error("Invalid input: {0}")]
    InputError(String),

    /// Async task execution errors
    #[error("Task execution error: {0}")]
    TaskError(String),
}

impl MinerError {
    /// Returns true for errors raised while validating a job
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            MinerError::InvalidBlob(_) | MinerError::InvalidSeedHash(_) | MinerError::InvalidTarget(_)
        )
    }
}

/// Converts hex decoding errors into MinerError
///
/// Raised while decoding job messages (blob, seed hash, target).
impl From<hex::FromHexError> for MinerError {
    fn from(e: hex::FromHexError) -> Self {
        MinerError::InputError(format!("Hex conversion failed: {}", e))
    }
}

impl From<toml::de::Error> for MinerError {
    fn from(e: toml::de::Error) -> Self {
        MinerError::ConfigError(format!("Invalid config format: {}", e))
    }
}

/// Converts async task join errors into MinerError
impl From<tokio::task::JoinError> for MinerError {
    fn from(e: tokio::task::JoinError) -> Self {
        MinerError::TaskError(format!("Async task failed: {}", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_errors_are_classified() {
        assert!(MinerError::InvalidBlob(3).is_validation());
        assert!(MinerError::InvalidSeedHash(31).is_validation());
        assert!(MinerError::InvalidTarget(8).is_validation());
        assert!(!MinerError::EngineInit("bad seed".into()).is_validation());
    }

    #[test]
    fn hex_errors_become_input_errors() {
        let err: MinerError = hex::decode("zz").unwrap_err().into();
        assert!(matches!(err, MinerError::InputError(_)));
    }
}
