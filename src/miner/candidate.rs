// src/miner/candidate.rs
//! Candidate results and the sink they are reported to

use crate::miner::engine::Digest;
use crate::miner::job::Nonce;
use crossbeam_channel::Sender;
use serde::Serialize;

/// A nonce whose digest satisfied the job target
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    /// Job ID this candidate belongs to
    pub job_id: String,
    /// Digest that met the target
    pub digest: Digest,
    /// Nonce that produced the digest
    pub nonce: Nonce,
}

/// Submission payload in the shape Monero pools expect
#[derive(Debug, Clone, Serialize)]
pub struct Submission {
    /// Job the result was found for
    pub job_id: String,
    /// Hex of the nonce's little-endian bytes
    pub nonce: String,
    /// Hex of the digest
    pub result: String,
}

impl Candidate {
    /// Lowercase hex of the digest
    pub fn result_hex(&self) -> String {
        hex::encode(self.digest)
    }

    /// Lowercase hex of the nonce as it is laid out in the blob
    pub fn nonce_hex(&self) -> String {
        hex::encode(self.nonce.to_le_bytes())
    }

    /// Converts into the hex-encoded submission form
    pub fn to_submission(&self) -> Submission {
        Submission {
            job_id: self.job_id.clone(),
            nonce: self.nonce_hex(),
            result: self.result_hex(),
        }
    }
}

/// Receives candidates from worker threads
///
/// Called inline from the hot loop of every worker, possibly concurrently,
/// so implementations must be thread-safe and return quickly.
pub trait CandidateSink: Send + Sync {
    /// Reports one satisfying nonce
    fn report(&self, candidate: Candidate);
}

impl CandidateSink for Sender<Candidate> {
    fn report(&self, candidate: Candidate) {
        if let Err(e) = self.send(candidate) {
            log::warn!("Dropping candidate, receiver gone: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_encodings_match_pool_format() {
        let mut digest = [0u8; 32];
        digest[0] = 0xAB;
        digest[31] = 0x01;
        let candidate = Candidate {
            job_id: "876543".into(),
            digest,
            nonce: 0x0000_01FF,
        };

        assert_eq!(candidate.nonce_hex(), "ff010000");
        let result = candidate.result_hex();
        assert_eq!(result.len(), 64);
        assert!(result.starts_with("ab"));
        assert!(result.ends_with("01"));

        let json = serde_json::to_value(candidate.to_submission()).unwrap();
        assert_eq!(json["job_id"], "876543");
        assert_eq!(json["nonce"], "ff010000");
    }

    #[test]
    fn channel_sink_forwards_and_tolerates_closed_receiver() {
        let (tx, rx) = crossbeam_channel::unbounded();
        let candidate = Candidate {
            job_id: "a".into(),
            digest: [0; 32],
            nonce: 7,
        };
        tx.report(candidate.clone());
        assert_eq!(rx.recv().unwrap(), candidate);

        drop(rx);
        tx.report(candidate);
    }
}
