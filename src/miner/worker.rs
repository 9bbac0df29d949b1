// src/miner/worker.rs
//! Worker thread implementation
//!
//! A [`Worker`] owns one long-lived OS thread that runs a [`SearchSession`]:
//! a hash engine, a hashrate estimator and a regulator racing over the
//! worker's lane of the nonce space (`index, index + C, index + 2C, ...`).
//!
//! The control side never touches the session directly. It publishes jobs
//! into a single-slot [`JobMailbox`] and the session picks them up at the top
//! of its next iteration, so a job switch never interrupts a hash and a
//! session always sees either the whole previous job or the whole new one.

use crate::miner::candidate::{Candidate, CandidateSink};
use crate::miner::engine::{EngineFactory, HashEngine};
use crate::miner::hashrate::{Hashrate, HashrateHandle};
use crate::miner::job::{Job, Nonce};
use crate::miner::regulator::{LoadFactor, Regulator};
use crate::utils::error::MinerError;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};

/// Lifecycle of a worker as seen from the control side
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
    /// No thread yet, no job assigned
    Idle,
    /// Thread searching the current job
    Running,
    /// A newer job is published and will be adopted on the next iteration
    SupersededPending,
    /// Stop requested, thread not yet joined
    Stopping,
    /// Thread exited (stopped, failed to start, or engine failure)
    Stopped,
}

/// Single-slot job hand-off between the control side and a session
///
/// The slot is guarded by a lock; the `pending` and `can_run` flags can be
/// observed without it.
#[derive(Debug, Default)]
pub struct JobMailbox {
    slot: Mutex<Option<Job>>,
    pending: AtomicBool,
    can_run: AtomicBool,
}

impl JobMailbox {
    /// Creates an empty mailbox
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the slot with `job` and flags it for adoption
    pub fn publish(&self, job: Job) {
        let mut slot = self.slot.lock().unwrap_or_else(PoisonError::into_inner);
        *slot = Some(job);
        self.can_run.store(true, Ordering::Release);
        self.pending.store(true, Ordering::Release);
    }

    /// Takes the pending flag and returns a copy of the latest job
    ///
    /// Returns `None` when nothing new was published since the last call.
    pub fn take_pending(&self) -> Option<Job> {
        // flag and slot change together under the lock, as in `publish`
        let slot = self.slot.lock().unwrap_or_else(PoisonError::into_inner);
        if !self.pending.swap(false, Ordering::AcqRel) {
            return None;
        }
        slot.clone()
    }

    /// Copy of the latest job without consuming the pending flag
    pub fn current(&self) -> Option<Job> {
        self.slot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// True if a published job has not been adopted yet
    pub fn is_pending(&self) -> bool {
        self.pending.load(Ordering::Acquire)
    }

    /// Requests the session to stop at its next iteration
    pub fn cancel(&self) {
        self.can_run.store(false, Ordering::Release);
    }

    /// False once [`JobMailbox::cancel`] was called
    pub fn can_run(&self) -> bool {
        self.can_run.load(Ordering::Acquire)
    }
}

/// Result of one loop iteration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// Keep searching
    Continue,
    /// Cancellation observed
    Stop,
}

/// One worker's search state for the lifetime of its engine
pub struct SearchSession {
    index: Nonce,
    stride: Nonce,
    mailbox: Arc<JobMailbox>,
    engine: Box<dyn HashEngine>,
    job: Job,
    hashrate: Hashrate,
    regulator: Regulator,
    sink: Arc<dyn CandidateSink>,
}

impl SearchSession {
    /// Starts a session on the job currently in `mailbox`
    ///
    /// Creates the engine keyed with that job's seed and resets the
    /// hashrate estimator. The job is adopted (and its nonce rebased) by the
    /// first call to [`SearchSession::step`].
    ///
    /// # Errors
    /// - [`MinerError::EngineInit`] if the engine cannot be created or the
    ///   mailbox holds no job
    pub fn start(
        index: Nonce,
        stride: Nonce,
        mailbox: Arc<JobMailbox>,
        factory: &dyn EngineFactory,
        mut hashrate: Hashrate,
        regulator: Regulator,
        sink: Arc<dyn CandidateSink>,
    ) -> Result<Self, MinerError> {
        let job = mailbox
            .current()
            .ok_or_else(|| MinerError::EngineInit("no job to key the engine with".into()))?;
        let engine = factory.create(job.seed_hash())?;
        hashrate.reset();

        Ok(SearchSession {
            index,
            stride: stride.max(1),
            mailbox,
            engine,
            job,
            hashrate,
            regulator,
            sink,
        })
    }

    /// Job currently being searched
    pub fn job(&self) -> &Job {
        &self.job
    }

    /// Runs one iteration of the search loop
    ///
    /// Adopts a pending job, hashes the blob, reports a candidate if the
    /// target is met, advances the nonce by the stride, then ticks the
    /// hashrate estimator and the regulator (which may sleep).
    ///
    /// # Errors
    /// Returns the engine's error if rekeying for a new seed fails.
    pub fn step(&mut self) -> Result<Step, MinerError> {
        if !self.mailbox.can_run() {
            return Ok(Step::Stop);
        }

        if let Some(next) = self.mailbox.take_pending() {
            self.adopt(next)?;
        }

        let digest = self.engine.hash(self.job.blob());
        if self.job.target().is_met_by(&digest) {
            let nonce = self.job.nonce();
            log::debug!(
                "Worker {} found candidate for job {} at nonce {:#010x}",
                self.index,
                self.job.id(),
                nonce
            );
            self.sink.report(Candidate {
                job_id: self.job.id().to_owned(),
                digest,
                nonce,
            });
        }

        self.job.nonce_add(self.stride);
        self.hashrate.tick();
        self.regulator.tick();
        Ok(Step::Continue)
    }

    /// Runs until cancelled or the engine fails
    pub fn run(&mut self) -> Result<(), MinerError> {
        while self.step()? == Step::Continue {}
        Ok(())
    }

    fn adopt(&mut self, next: Job) -> Result<(), MinerError> {
        if !self.job.seed_equal(&next) {
            log::info!("Worker {} rekeying engine for job {}", self.index, next.id());
            self.engine.rekey(next.seed_hash())?;
        }
        self.job = next;
        self.job.nonce_set(self.index);
        log::debug!(
            "Worker {} adopted job {} (height {}, target {})",
            self.index,
            self.job.id(),
            self.job.height(),
            self.job.target()
        );
        Ok(())
    }
}

/// Control-side handle of one search thread
pub struct Worker {
    index: usize,
    concurrency: usize,
    mailbox: Arc<JobMailbox>,
    alive: Arc<AtomicBool>,
    hashrate: HashrateHandle,
    meter: Option<Hashrate>,
    load: LoadFactor,
    factory: Arc<dyn EngineFactory>,
    sink: Arc<dyn CandidateSink>,
    thread: Option<JoinHandle<()>>,
    stopped: bool,
}

impl Worker {
    /// Creates an idle worker `index` out of `concurrency`
    ///
    /// No thread is started until the first [`Worker::set_job`].
    pub fn new(
        index: usize,
        concurrency: usize,
        load: LoadFactor,
        factory: Arc<dyn EngineFactory>,
        sink: Arc<dyn CandidateSink>,
    ) -> Self {
        let meter = Hashrate::new();
        Worker {
            index,
            concurrency,
            mailbox: Arc::new(JobMailbox::new()),
            alive: Arc::new(AtomicBool::new(false)),
            hashrate: meter.handle(),
            meter: Some(meter),
            load,
            factory,
            sink,
            thread: None,
            stopped: false,
        }
    }

    /// Publishes `job` to this worker, starting its thread on first use
    ///
    /// # Errors
    /// Returns [`MinerError::ThreadSpawn`] if the thread could not be
    /// started. The worker then stays stopped.
    pub fn set_job(&mut self, job: Job) -> Result<(), MinerError> {
        self.mailbox.publish(job);

        if self.thread.is_some() || self.stopped {
            return Ok(());
        }
        self.spawn()
    }

    /// Updates this worker's load factor
    pub fn set_modifier(&self, modifier: f64) {
        self.load.set(modifier);
    }

    /// Smoothed hashrate of this worker, 0 once its thread has exited
    pub fn hashrate(&self) -> f64 {
        if !self.is_alive() {
            return 0.0;
        }
        self.hashrate.get()
    }

    /// Position of this worker in the pool
    pub fn index(&self) -> usize {
        self.index
    }

    /// True while the search thread is running
    pub fn is_alive(&self) -> bool {
        self.alive.load(Ordering::Acquire)
    }

    /// Current lifecycle state
    pub fn state(&self) -> WorkerState {
        if self.stopped {
            return WorkerState::Stopped;
        }
        if self.thread.is_none() {
            return WorkerState::Idle;
        }
        if !self.is_alive() {
            WorkerState::Stopped
        } else if !self.mailbox.can_run() {
            WorkerState::Stopping
        } else if self.mailbox.is_pending() {
            WorkerState::SupersededPending
        } else {
            WorkerState::Running
        }
    }

    /// Asks the thread to stop at its next iteration without waiting
    pub fn cancel(&self) {
        self.mailbox.cancel();
    }

    /// Signals the thread to stop and joins it
    pub fn stop(&mut self) {
        self.cancel();
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                log::error!("Worker {} panicked", self.index);
            }
        }
        self.stopped = true;
    }

    fn spawn(&mut self) -> Result<(), MinerError> {
        let Some(meter) = self.meter.take() else {
            return Ok(());
        };

        let index = self.index as Nonce;
        let stride = self.concurrency as Nonce;
        let mailbox = Arc::clone(&self.mailbox);
        let factory = Arc::clone(&self.factory);
        let sink = Arc::clone(&self.sink);
        let regulator = Regulator::new(self.load.clone());
        let alive = Arc::clone(&self.alive);

        self.alive.store(true, Ordering::Release);
        let spawned = thread::Builder::new()
            .name(format!("miner-worker-{}", self.index))
            .spawn(move || {
                let _alive = AliveGuard(alive);
                let session = SearchSession::start(
                    index,
                    stride,
                    mailbox,
                    factory.as_ref(),
                    meter,
                    regulator,
                    sink,
                );
                let result = session.and_then(|mut session| session.run());
                match result {
                    Ok(()) => log::info!("Worker {} stopped", index),
                    Err(e) => log::error!("Worker {} exited: {}", index, e),
                }
            });

        match spawned {
            Ok(handle) => {
                self.thread = Some(handle);
                Ok(())
            }
            Err(e) => {
                self.alive.store(false, Ordering::Release);
                self.stopped = true;
                Err(MinerError::ThreadSpawn(e))
            }
        }
    }
}

impl Drop for Worker {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Clears the liveness flag when the search thread exits, even on panic
struct AliveGuard(Arc<AtomicBool>);

impl Drop for AliveGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}
