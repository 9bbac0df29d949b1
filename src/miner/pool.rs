// src/miner/pool.rs
//! Worker pool control surface
//!
//! The [`Pool`] owns the worker set and serializes every control operation
//! (job broadcast, stop, load-factor change, hashrate read) behind one lock.
//! Workers are created lazily on the first job and torn down together on
//! [`Pool::stop`]; the next job after a stop builds a fresh set.

use crate::miner::candidate::CandidateSink;
use crate::miner::engine::EngineFactory;
use crate::miner::job::{Job, JobMessage};
use crate::miner::regulator::LoadFactor;
use crate::miner::target::Target;
use crate::miner::worker::Worker;
use crate::utils::error::MinerError;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Default CPU divisor shared by worker-count derivation and throttling
pub const DEFAULT_CPU_DIVISOR: u32 = 2;

/// Default load factor
pub const DEFAULT_LOAD_FACTOR: f64 = 0.5;

/// Pool sizing and throttling settings
#[derive(Debug, Clone)]
pub struct PoolConfig {
    /// Divisor `D`: workers = cores / D, load factor ceiling = 1 / D
    pub cpu_divisor: u32,
    /// Initial load factor pushed to every worker
    pub load_factor: f64,
    /// Fixed worker count instead of the derived one (0 or `None` = derive)
    pub worker_threads: Option<usize>,
}

impl Default for PoolConfig {
    fn default() -> Self {
        PoolConfig {
            cpu_divisor: DEFAULT_CPU_DIVISOR,
            load_factor: DEFAULT_LOAD_FACTOR,
            worker_threads: None,
        }
    }
}

struct PoolState {
    workers: Vec<Worker>,
    load_factor: f64,
}

/// Coordinates mining jobs across worker threads
pub struct Pool {
    cpu_divisor: u32,
    worker_threads: Option<usize>,
    factory: Arc<dyn EngineFactory>,
    sink: Arc<dyn CandidateSink>,
    state: Mutex<PoolState>,
}

impl Pool {
    /// Creates an empty pool; no threads are started until the first job
    pub fn new(
        config: PoolConfig,
        factory: Arc<dyn EngineFactory>,
        sink: Arc<dyn CandidateSink>,
    ) -> Self {
        Pool {
            cpu_divisor: config.cpu_divisor.max(1),
            worker_threads: config.worker_threads.filter(|&n| n > 0),
            factory,
            sink,
            state: Mutex::new(PoolState {
                workers: Vec::new(),
                load_factor: config.load_factor,
            }),
        }
    }

    /// Worker count for `hardware_threads` logical CPUs: `max(1, cpus / D)`
    pub fn derive_worker_count(hardware_threads: usize, cpu_divisor: u32) -> usize {
        (hardware_threads / cpu_divisor.max(1) as usize).max(1)
    }

    /// Broadcasts an already validated job, creating workers if needed
    pub fn submit_job(&self, job: Job) {
        let mut state = self.lock();

        if state.workers.is_empty() {
            let count = self.worker_count_for_start();
            log::info!(
                "Starting {} workers ({} engine, load factor {:.2})",
                count,
                self.factory.name(),
                state.load_factor
            );
            let load_factor = state.load_factor;
            state.workers = (0..count)
                .map(|index| {
                    Worker::new(
                        index,
                        count,
                        LoadFactor::new(self.cpu_divisor, load_factor),
                        Arc::clone(&self.factory),
                        Arc::clone(&self.sink),
                    )
                })
                .collect();
        }

        log::info!("New job {} at height {}", job.id(), job.height());
        for worker in state.workers.iter_mut() {
            if let Err(e) = worker.set_job(job.clone()) {
                log::error!("Worker {} not started: {}", worker.index(), e);
            }
        }
    }

    /// Decodes, validates and broadcasts a job message
    ///
    /// # Errors
    /// Returns the decoding or validation error; the pool is left untouched.
    pub fn submit(&self, message: JobMessage) -> Result<(), MinerError> {
        let job = message.into_job()?;
        self.submit_job(job);
        Ok(())
    }

    /// Starts mining or switches to a new job from raw fields
    ///
    /// Returns `false` without side effects if the blob, seed hash or target
    /// has the wrong size.
    pub fn start_job(
        &self,
        id: &str,
        blob: &[u8],
        seed_hash: &[u8],
        height: u64,
        target: &[u8],
    ) -> bool {
        let job = Target::from_slice(target)
            .and_then(|target| Job::new(id, blob.to_vec(), seed_hash.to_vec(), height, target));

        match job {
            Ok(job) => {
                self.submit_job(job);
                true
            }
            Err(e) => {
                log::warn!("Rejected job {}: {}", id, e);
                false
            }
        }
    }

    /// Stops and joins every worker, returning the pool to its initial state
    pub fn stop(&self) {
        let mut state = self.lock();
        if state.workers.is_empty() {
            return;
        }
        // raise every stop flag first so workers wind down in parallel
        for worker in state.workers.iter() {
            worker.cancel();
        }
        for worker in state.workers.iter_mut() {
            worker.stop();
        }
        state.workers.clear();
        log::info!("All workers stopped");
    }

    /// Updates the load factor of the pool and of every running worker
    ///
    /// Workers clamp the value to `[0, 1/D]`.
    pub fn set_load_factor(&self, modifier: f64) {
        let mut state = self.lock();
        state.load_factor = modifier;
        for worker in state.workers.iter() {
            worker.set_modifier(modifier);
        }
        log::debug!("Load factor set to {:.3}", modifier);
    }

    /// Sum of every live worker's smoothed hashrate
    ///
    /// Workers keep ticking while this is read, so the sum is approximate.
    pub fn hashrate(&self) -> f64 {
        self.lock().workers.iter().map(Worker::hashrate).sum()
    }

    /// Last load factor requested through the pool
    pub fn load_factor(&self) -> f64 {
        self.lock().load_factor
    }

    /// Number of workers in the current set (0 when stopped)
    pub fn worker_count(&self) -> usize {
        self.lock().workers.len()
    }

    /// Number of workers whose thread is still running
    pub fn live_workers(&self) -> usize {
        self.lock().workers.iter().filter(|w| w.is_alive()).count()
    }

    /// True between the first job and the next stop
    pub fn is_running(&self) -> bool {
        !self.lock().workers.is_empty()
    }

    fn worker_count_for_start(&self) -> usize {
        self.worker_threads
            .unwrap_or_else(|| Self::derive_worker_count(num_cpus::get(), self.cpu_divisor))
    }

    fn lock(&self) -> MutexGuard<'_, PoolState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for Pool {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::miner::candidate::Candidate;
    use crate::miner::engine::{DIGEST_SIZE, Digest, HashEngine};

    struct MissEngine;

    impl HashEngine for MissEngine {
        fn rekey(&mut self, _seed: &[u8]) -> Result<(), MinerError> {
            Ok(())
        }

        fn hash(&mut self, _blob: &[u8]) -> Digest {
            [0xFF; DIGEST_SIZE]
        }
    }

    struct MissFactory;

    impl EngineFactory for MissFactory {
        fn create(&self, _seed: &[u8]) -> Result<Box<dyn HashEngine>, MinerError> {
            Ok(Box::new(MissEngine))
        }

        fn name(&self) -> &str {
            "miss"
        }
    }

    fn pool(workers: usize) -> Pool {
        let (tx, _rx) = crossbeam_channel::unbounded::<Candidate>();
        Pool::new(
            PoolConfig {
                worker_threads: Some(workers),
                ..PoolConfig::default()
            },
            Arc::new(MissFactory),
            Arc::new(tx),
        )
    }

    #[test]
    fn derives_worker_count_from_divisor() {
        assert_eq!(Pool::derive_worker_count(8, 2), 4);
        assert_eq!(Pool::derive_worker_count(7, 2), 3);
        assert_eq!(Pool::derive_worker_count(1, 2), 1);
        assert_eq!(Pool::derive_worker_count(0, 2), 1);
        assert_eq!(Pool::derive_worker_count(16, 0), 16);
    }

    #[test]
    fn invalid_jobs_are_rejected_without_side_effects() {
        let pool = pool(2);
        assert!(!pool.start_job("a", &[0u8; 42], &[0u8; 32], 1, &[0xFF; 4]));
        assert!(!pool.start_job("a", &[0u8; 76], &[0u8; 31], 1, &[0xFF; 4]));
        assert!(!pool.start_job("a", &[0u8; 76], &[0u8; 32], 1, &[0xFF; 8]));
        assert_eq!(pool.worker_count(), 0);
        assert!(!pool.is_running());
    }

    #[test]
    fn first_job_creates_workers_and_stop_clears_them() {
        let pool = pool(3);
        assert!(pool.start_job("a", &[0u8; 76], &[0u8; 32], 1, &[0x00; 4]));
        assert_eq!(pool.worker_count(), 3);
        assert!(pool.is_running());

        pool.stop();
        assert_eq!(pool.worker_count(), 0);
        assert_eq!(pool.hashrate(), 0.0);

        // idempotent
        pool.stop();
        assert!(!pool.is_running());
    }

    #[test]
    fn load_factor_is_recorded_before_and_after_start() {
        let pool = pool(1);
        pool.set_load_factor(0.1);
        assert_eq!(pool.load_factor(), 0.1);
        assert!(pool.start_job("a", &[0u8; 76], &[0u8; 32], 1, &[0x00; 4]));
        pool.set_load_factor(0.3);
        assert_eq!(pool.load_factor(), 0.3);
        pool.stop();
    }
}
