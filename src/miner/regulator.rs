// src/miner/regulator.rs
//! CPU duty-cycle regulator
//!
//! The regulator is ticked once per hash from inside the search loop. Every
//! [`TICKS_TO_MEASURE`] ticks it looks at how long that window of hashes took
//! and sleeps for a proportional amount, so the injected idle time follows
//! the real cost of hashing rather than a wall-clock timer.
//!
//! The load factor `m` is clamped to `[0, 1/D]` where `D` is the CPU divisor
//! also used to derive the worker count. Each window sleeps
//! `elapsed - elapsed * m * D` milliseconds; at `m = 1/D` it never sleeps.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread;
use std::time::{Duration, Instant};

/// Number of ticks in one measurement window
pub const TICKS_TO_MEASURE: u32 = 5;

/// Shared, clamped load-factor knob
///
/// Cloning yields another handle to the same value; the pool keeps one
/// handle per worker and updates it while the worker keeps ticking.
#[derive(Debug, Clone)]
pub struct LoadFactor {
    bits: Arc<AtomicU64>,
    divisor: u32,
}

impl LoadFactor {
    /// Creates a knob with the given CPU divisor and initial value
    ///
    /// A divisor of zero is treated as one.
    pub fn new(divisor: u32, modifier: f64) -> Self {
        let load = LoadFactor {
            bits: Arc::new(AtomicU64::new(0f64.to_bits())),
            divisor: divisor.max(1),
        };
        load.set(modifier);
        load
    }

    /// Clamps `modifier` to `[0, 1/D]` and publishes it
    pub fn set(&self, modifier: f64) {
        let clamped = if modifier.is_nan() {
            0.0
        } else {
            modifier.clamp(0.0, self.ceiling())
        };
        self.bits.store(clamped.to_bits(), Ordering::Relaxed);
    }

    /// Current clamped load factor
    pub fn get(&self) -> f64 {
        f64::from_bits(self.bits.load(Ordering::Relaxed))
    }

    /// CPU divisor `D`
    pub fn divisor(&self) -> u32 {
        self.divisor
    }

    /// Highest accepted load factor, `1/D`
    pub fn ceiling(&self) -> f64 {
        1.0 / self.divisor as f64
    }
}

/// Per-worker throttle state
#[derive(Debug)]
pub struct Regulator {
    load: LoadFactor,
    ticks: u32,
    window_start: Instant,
}

impl Regulator {
    /// Creates a regulator reading its load factor from `load`
    pub fn new(load: LoadFactor) -> Self {
        Regulator {
            load,
            ticks: 0,
            window_start: Instant::now(),
        }
    }

    /// Updates the shared load factor
    ///
    /// Takes effect from the next completed window.
    pub fn set_modifier(&self, modifier: f64) {
        self.load.set(modifier);
    }

    /// Current load factor
    pub fn modifier(&self) -> f64 {
        self.load.get()
    }

    /// Advances the window and sleeps when it closes
    pub fn tick(&mut self) {
        if let Some(pause) = self.tick_at(Instant::now()) {
            thread::sleep(pause);
        }
    }

    /// Advances the window at `now`, returning the pause owed if it closes
    pub fn tick_at(&mut self, now: Instant) -> Option<Duration> {
        let tick = self.ticks + 1;
        self.ticks = tick % TICKS_TO_MEASURE;

        if tick == 1 {
            self.window_start = now;
            None
        } else if tick == TICKS_TO_MEASURE {
            let elapsed_ms = now.saturating_duration_since(self.window_start).as_millis() as f64;
            self.pause_for(elapsed_ms)
        } else {
            None
        }
    }

    fn pause_for(&self, elapsed_ms: f64) -> Option<Duration> {
        let factor = self.load.get() * self.load.divisor() as f64;
        let sleep_ms = (elapsed_ms - elapsed_ms * factor) as u64;
        (sleep_ms > 0).then(|| Duration::from_millis(sleep_ms))
    }
}
