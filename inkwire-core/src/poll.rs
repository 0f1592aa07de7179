//! Poll-with-backoff
//!
//! An empty link is not an error. The server sleeps a short fixed interval
//! and tries again, tracking how long it has gone without input so a stalled
//! session can be detected.

use embedded_hal::delay::DelayNs;

/// Fixed-interval backoff with an idle accumulator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Backoff {
    interval_ms: u32,
    idle_ms: u32,
}

impl Backoff {
    /// Create a backoff sleeping `interval_ms` per empty poll
    pub fn new(interval_ms: u32) -> Self {
        Self {
            interval_ms,
            idle_ms: 0,
        }
    }

    /// Sleep one interval and count it as idle time
    pub fn wait<D: DelayNs>(&mut self, delay: &mut D) {
        delay.delay_ms(self.interval_ms);
        self.idle_ms = self.idle_ms.saturating_add(self.interval_ms);
    }

    /// Input arrived; start counting again
    pub fn reset(&mut self) {
        self.idle_ms = 0;
    }

    /// Time spent waiting since the last reset
    pub fn idle_ms(&self) -> u32 {
        self.idle_ms
    }

    /// Whether the idle time has reached `limit_ms`
    pub fn expired(&self, limit_ms: Option<u32>) -> bool {
        limit_ms.is_some_and(|limit| self.idle_ms >= limit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct CountingDelay {
        total_ns: u64,
    }

    impl DelayNs for CountingDelay {
        fn delay_ns(&mut self, ns: u32) {
            self.total_ns += u64::from(ns);
        }
    }

    #[test]
    fn test_wait_accumulates() {
        let mut delay = CountingDelay { total_ns: 0 };
        let mut backoff = Backoff::new(10);

        for _ in 0..3 {
            backoff.wait(&mut delay);
        }

        assert_eq!(backoff.idle_ms(), 30);
        assert_eq!(delay.total_ns, 30_000_000);
    }

    #[test]
    fn test_reset_and_expiry() {
        let mut delay = CountingDelay { total_ns: 0 };
        let mut backoff = Backoff::new(25);

        backoff.wait(&mut delay);
        backoff.wait(&mut delay);
        assert!(backoff.expired(Some(50)));
        assert!(!backoff.expired(None));

        backoff.reset();
        assert!(!backoff.expired(Some(50)));
    }
}
