// src/miner/hashrate.rs
//! Per-worker hashrate estimator
//!
//! Each tick converts the time since the previous hash into an instantaneous
//! rate and folds it into an exponential moving average. The worker thread is
//! the only writer; the pool reads the current value through a
//! [`HashrateHandle`] without taking any lock.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

/// Smoothing factor applied to every new sample
pub const SMOOTHING: f64 = 0.003;

/// Exponential moving average of hashes per second
#[derive(Debug)]
pub struct Hashrate {
    /// f64 bits of the smoothed rate
    rate: Arc<AtomicU64>,
    last: Instant,
}

/// Read-only view of a worker's smoothed hashrate
#[derive(Debug, Clone)]
pub struct HashrateHandle {
    rate: Arc<AtomicU64>,
}

impl Hashrate {
    /// Creates an estimator at zero, anchored at the current instant
    pub fn new() -> Self {
        Hashrate {
            rate: Arc::new(AtomicU64::new(0f64.to_bits())),
            last: Instant::now(),
        }
    }

    /// Returns a handle that observes this estimator from another thread
    pub fn handle(&self) -> HashrateHandle {
        HashrateHandle {
            rate: Arc::clone(&self.rate),
        }
    }

    /// Records one completed hash
    pub fn tick(&mut self) {
        self.tick_at(Instant::now());
    }

    /// Records one completed hash at `now`
    pub fn tick_at(&mut self, now: Instant) {
        let elapsed_ms = now.saturating_duration_since(self.last).as_millis() as f64;
        let instant = 1000.0 / elapsed_ms.max(1.0);
        let previous = self.hashrate();
        self.store(previous + SMOOTHING * (instant - previous));
        self.last = now;
    }

    /// Zeroes the estimate and re-anchors the clock
    pub fn reset(&mut self) {
        self.reset_at(Instant::now());
    }

    /// Zeroes the estimate and re-anchors the clock at `now`
    pub fn reset_at(&mut self, now: Instant) {
        self.store(0.0);
        self.last = now;
    }

    /// Current smoothed estimate in hashes per second
    pub fn hashrate(&self) -> f64 {
        f64::from_bits(self.rate.load(Ordering::Relaxed))
    }

    fn store(&self, value: f64) {
        self.rate.store(value.to_bits(), Ordering::Relaxed);
    }
}

impl Default for Hashrate {
    fn default() -> Self {
        Self::new()
    }
}

impl HashrateHandle {
    /// Current smoothed estimate in hashes per second
    pub fn get(&self) -> f64 {
        f64::from_bits(self.rate.load(Ordering::Relaxed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn starts_at_zero() {
        let rate = Hashrate::new();
        assert_eq!(rate.hashrate(), 0.0);
        assert_eq!(rate.handle().get(), 0.0);
    }

    #[test]
    fn single_tick_moves_by_smoothing_factor() {
        let start = Instant::now();
        let mut rate = Hashrate::new();
        rate.reset_at(start);
        rate.tick_at(start + Duration::from_millis(10));
        // instant rate 100 H/s, one step from zero
        assert!((rate.hashrate() - 100.0 * SMOOTHING).abs() < 1e-9);
    }

    #[test]
    fn converges_geometrically_to_fixed_interval_rate() {
        let start = Instant::now();
        let mut rate = Hashrate::new();
        rate.reset_at(start);

        let step = Duration::from_millis(10);
        let mut now = start;
        let mut previous = 0.0;
        for n in 1..=2000u32 {
            now += step;
            rate.tick_at(now);
            let value = rate.hashrate();
            assert!(value >= previous && value <= 100.0);
            let expected = 100.0 * (1.0 - (1.0 - SMOOTHING).powi(n as i32));
            assert!((value - expected).abs() < 1e-6);
            previous = value;
        }
        assert!(previous > 99.0);
    }

    #[test]
    fn sub_millisecond_ticks_count_as_one_millisecond() {
        let start = Instant::now();
        let mut rate = Hashrate::new();
        rate.reset_at(start);
        rate.tick_at(start + Duration::from_micros(300));
        assert!((rate.hashrate() - 1000.0 * SMOOTHING).abs() < 1e-9);
    }

    #[test]
    fn reset_zeroes_and_handle_sees_it() {
        let start = Instant::now();
        let mut rate = Hashrate::new();
        let handle = rate.handle();
        rate.reset_at(start);
        rate.tick_at(start + Duration::from_millis(2));
        assert!(handle.get() > 0.0);

        rate.reset();
        assert_eq!(handle.get(), 0.0);
    }
}
