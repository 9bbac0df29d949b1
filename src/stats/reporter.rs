// src/stats/reporter.rs
use crate::miner::pool::Pool;
use crossbeam_channel::{Receiver, Sender};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};
use sysinfo::{Pid, ProcessRefreshKind, ProcessesToUpdate, System};

/// Statistics related to mining performance
#[derive(Debug, Clone, Default)]
pub struct MiningStats {
    /// Smoothed aggregate hashrate (hashes per second)
    pub hashrate: f64,
    /// Workers currently in the pool
    pub workers: usize,
    /// Workers whose thread is still running
    pub live_workers: usize,
    /// Candidates reported since the reporter started
    pub candidates_found: u64,
    /// Load factor last requested through the pool
    pub load_factor: f64,
    /// Time since the reporter started
    pub uptime: Duration,
}

/// Statistics related to hardware performance
#[derive(Debug, Clone)]
pub struct HardwareStats {
    /// CPU usage of this process in percent of one core (may exceed 100)
    pub process_cpu: f32,
    /// Average usage across all cores (0-100)
    pub system_cpu: f32,
    /// Resident memory of this process (in bytes)
    pub memory_used: u64,
}

/// Collects and periodically logs pool and process statistics
pub struct StatsReporter {
    pool: Arc<Pool>,
    candidates: Arc<AtomicU64>,
    started: Instant,
    report_interval: Duration,
    running: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
}

impl StatsReporter {
    /// Creates a reporter for `pool` logging every `report_interval`
    pub fn new(pool: Arc<Pool>, report_interval: Duration) -> Self {
        StatsReporter {
            pool,
            candidates: Arc::new(AtomicU64::new(0)),
            started: Instant::now(),
            report_interval,
            running: Arc::new(AtomicBool::new(false)),
            thread: None,
        }
    }

    /// Counts every candidate passing through the returned channel
    ///
    /// Candidates read from `input` are counted and forwarded to the
    /// returned receiver on a background thread.
    pub fn count_candidates<T: Send + 'static>(&self, input: Receiver<T>) -> Receiver<T> {
        let (tx, rx): (Sender<T>, Receiver<T>) = crossbeam_channel::unbounded();
        let counter = Arc::clone(&self.candidates);

        std::thread::spawn(move || {
            for item in input {
                counter.fetch_add(1, Ordering::Relaxed);
                if tx.send(item).is_err() {
                    break;
                }
            }
        });
        rx
    }

    /// Current mining statistics
    pub fn get_stats(&self) -> MiningStats {
        snapshot(&self.pool, &self.candidates, self.started)
    }

    /// Starts the periodic reporting of statistics on a background thread
    pub fn start_reporting(&mut self) {
        if self.running.swap(true, Ordering::SeqCst) {
            return;
        }

        let pool = Arc::clone(&self.pool);
        let candidates = Arc::clone(&self.candidates);
        let running = Arc::clone(&self.running);
        let started = self.started;
        let interval = self.report_interval;

        let spawned = std::thread::Builder::new()
            .name("stats-reporter".into())
            .spawn(move || {
                let mut system = System::new();
                let pid = sysinfo::get_current_pid().ok();

                while sleep_while_running(&running, interval) {
                    let mining = snapshot(&pool, &candidates, started);
                    let hw = hardware_stats(&mut system, pid);

                    log::info!(
                        "Hashrate: {:.2} H/s | Workers: {}/{} | Candidates: {} | Load: {:.2} | CPU: {:.1}% (system {:.1}%) | RSS: {} MB",
                        mining.hashrate,
                        mining.live_workers,
                        mining.workers,
                        mining.candidates_found,
                        mining.load_factor,
                        hw.process_cpu,
                        hw.system_cpu,
                        hw.memory_used / (1024 * 1024)
                    );
                }
            });

        match spawned {
            Ok(handle) => self.thread = Some(handle),
            Err(e) => {
                self.running.store(false, Ordering::SeqCst);
                log::warn!("Stats reporting disabled: {}", e);
            }
        }
    }

    /// Stops the reporting thread
    pub fn stop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.thread.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for StatsReporter {
    fn drop(&mut self) {
        self.stop();
    }
}

fn snapshot(pool: &Pool, candidates: &AtomicU64, started: Instant) -> MiningStats {
    MiningStats {
        hashrate: pool.hashrate(),
        workers: pool.worker_count(),
        live_workers: pool.live_workers(),
        candidates_found: candidates.load(Ordering::Relaxed),
        load_factor: pool.load_factor(),
        uptime: started.elapsed(),
    }
}

/// Sleeps in short slices so a stop request is seen quickly
fn sleep_while_running(running: &AtomicBool, interval: Duration) -> bool {
    let slice = Duration::from_millis(100);
    let deadline = Instant::now() + interval;
    while running.load(Ordering::SeqCst) {
        let now = Instant::now();
        if now >= deadline {
            return true;
        }
        std::thread::sleep(slice.min(deadline - now));
    }
    false
}

fn hardware_stats(system: &mut System, pid: Option<Pid>) -> HardwareStats {
    system.refresh_cpu_usage();
    let (process_cpu, memory_used) = match pid {
        Some(pid) => {
            system.refresh_processes_specifics(
                ProcessesToUpdate::Some(&[pid]),
                true,
                ProcessRefreshKind::nothing().with_cpu().with_memory(),
            );
            system
                .process(pid)
                .map(|p| (p.cpu_usage(), p.memory()))
                .unwrap_or((0.0, 0))
        }
        None => (0.0, 0),
    };

    HardwareStats {
        process_cpu,
        system_cpu: system.global_cpu_usage(),
        memory_used,
    }
}
