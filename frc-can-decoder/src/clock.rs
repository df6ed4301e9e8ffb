//! Wall clock abstraction for the polling loops
//!
//! Liveness and replay both run against "now". [`SystemClock`] reads the real
//! UTC clock; [`ManualClock`] is a shared simulated clock whose `sleep`
//! advances time instantly.

use crate::types::Timestamp;
use chrono::Utc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

pub trait Clock {
    /// Current time in seconds
    fn now(&self) -> Timestamp;

    /// Wait for `duration`
    fn sleep(&self, duration: Duration);
}

/// Real time: epoch seconds from `chrono::Utc`
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        let now = Utc::now();
        now.timestamp() as f64 + now.timestamp_subsec_nanos() as f64 / 1_000_000_000.0
    }

    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

/// Simulated clock; clones share the same time
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    bits: Arc<AtomicU64>,
}

impl ManualClock {
    pub fn new(start: Timestamp) -> Self {
        Self {
            bits: Arc::new(AtomicU64::new(start.to_bits())),
        }
    }

    pub fn set(&self, now: Timestamp) {
        self.bits.store(now.to_bits(), Ordering::SeqCst);
    }

    pub fn advance(&self, duration: Duration) {
        self.set(self.now() + duration.as_secs_f64());
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Timestamp {
        f64::from_bits(self.bits.load(Ordering::SeqCst))
    }

    fn sleep(&self, duration: Duration) {
        self.advance(duration);
    }
}

impl<C: Clock + ?Sized> Clock for &C {
    fn now(&self) -> Timestamp {
        (**self).now()
    }

    fn sleep(&self, duration: Duration) {
        (**self).sleep(duration)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manual_clock_shared() {
        let clock = ManualClock::new(100.0);
        let other = clock.clone();
        clock.sleep(Duration::from_millis(1500));
        assert_eq!(other.now(), 101.5);
        other.set(5.0);
        assert_eq!(clock.now(), 5.0);
    }

    #[test]
    fn test_system_clock_is_epoch_seconds() {
        // Any time after 2020-01-01
        assert!(SystemClock.now() > 1_577_836_800.0);
    }
}
