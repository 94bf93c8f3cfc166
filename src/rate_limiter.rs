//! Stamp admission control.
//!
//! Calls arriving faster than the configured rate are dropped, not queued.
//! Time comes from a [`StampClock`] so tests can drive it by hand.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// Monotonic seconds since some fixed point.
pub trait StampClock: Send {
    fn now_seconds(&self) -> f64;
}

/// Wall clock measured from construction.
#[derive(Clone, Debug)]
pub struct SystemClock {
    start: Instant,
}

impl Default for SystemClock {
    fn default() -> Self {
        Self {
            start: Instant::now(),
        }
    }
}

impl StampClock for SystemClock {
    fn now_seconds(&self) -> f64 {
        self.start.elapsed().as_secs_f64()
    }
}

/// Hand-driven clock. Clones share the same time.
#[derive(Clone, Debug, Default)]
pub struct ManualClock {
    bits: Arc<AtomicU64>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, seconds: f64) {
        self.bits.store(seconds.to_bits(), Ordering::SeqCst);
    }

    pub fn advance(&self, seconds: f64) {
        self.set(self.now_seconds() + seconds);
    }
}

impl StampClock for ManualClock {
    fn now_seconds(&self) -> f64 {
        f64::from_bits(self.bits.load(Ordering::SeqCst))
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct RateLimiter {
    /// `None` means unlimited.
    min_interval: Option<f64>,
    last_accepted: Option<f64>,
}

impl RateLimiter {
    pub fn new(max_per_second: f32) -> Self {
        let min_interval = (max_per_second > 0.0).then(|| 1.0 / max_per_second as f64);
        Self {
            min_interval,
            last_accepted: None,
        }
    }

    pub fn is_limited(&self) -> bool {
        self.min_interval.is_some()
    }

    /// Admit a stamp at `now`. The first stamp is always admitted; later ones
    /// need `1 / max_per_second` seconds since the last admitted stamp.
    pub fn try_acquire(&mut self, now: f64) -> bool {
        let Some(min_interval) = self.min_interval else {
            return true;
        };
        if let Some(last) = self.last_accepted {
            if now - last < min_interval {
                return false;
            }
        }
        self.last_accepted = Some(now);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unlimited_admits_everything() {
        let mut limiter = RateLimiter::new(0.0);
        assert!(!limiter.is_limited());
        assert!((0..100).all(|_| limiter.try_acquire(0.0)));
    }

    #[test]
    fn test_burst_admits_one() {
        let mut limiter = RateLimiter::new(2.0);
        let admitted = (0..5)
            .filter(|i| limiter.try_acquire(*i as f64 * 0.02))
            .count();
        assert_eq!(admitted, 1);
    }

    #[test]
    fn test_interval_measured_from_last_admitted() {
        let mut limiter = RateLimiter::new(2.0);
        assert!(limiter.try_acquire(10.0));
        assert!(!limiter.try_acquire(10.4));
        // Dropped calls do not push the window forward.
        assert!(limiter.try_acquire(10.5));
        assert!(!limiter.try_acquire(10.9));
    }

    #[test]
    fn test_manual_clock_shared_between_clones() {
        let clock = ManualClock::new();
        let observer = clock.clone();
        clock.advance(1.25);
        clock.advance(0.25);
        assert_eq!(observer.now_seconds(), 1.5);
    }
}
