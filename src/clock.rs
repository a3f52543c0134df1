//! Trait abstraction for the monotonic clock to enable testing
//!
//! The link supervisor only ever compares elapsed time, so the sole
//! requirement is monotonicity. Timeout detection must be driven from the
//! polled context: a dead transport stops producing input events, so the
//! clock read cannot depend on input arriving.

use std::time::Instant;

/// Monotonically increasing time source, in microseconds since an
/// arbitrary epoch.
pub trait MonotonicClock {
    /// Current monotonic time in microseconds.
    fn now_micros(&self) -> u64;
}

/// Monotonic clock backed by [`std::time::Instant`].
#[derive(Debug, Clone)]
pub struct StdClock {
    epoch: Instant,
}

impl StdClock {
    /// Creates a clock whose epoch is the moment of construction.
    #[must_use]
    pub fn new() -> Self {
        Self {
            epoch: Instant::now(),
        }
    }
}

impl Default for StdClock {
    fn default() -> Self {
        Self::new()
    }
}

impl MonotonicClock for StdClock {
    fn now_micros(&self) -> u64 {
        self.epoch.elapsed().as_micros() as u64
    }
}

#[cfg(test)]
pub mod mocks {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;

    /// Manually advanced clock for deterministic timeout tests.
    #[derive(Debug, Clone)]
    pub struct MockClock {
        now: Rc<Cell<u64>>,
    }

    impl MockClock {
        pub fn new() -> Self {
            Self {
                now: Rc::new(Cell::new(0)),
            }
        }

        /// Advance simulated time by `micros`.
        pub fn advance_micros(&self, micros: u64) {
            self.now.set(self.now.get() + micros);
        }

        /// Advance simulated time by `millis`.
        pub fn advance_millis(&self, millis: u64) {
            self.advance_micros(millis * 1_000);
        }
    }

    impl MonotonicClock for MockClock {
        fn now_micros(&self) -> u64 {
            self.now.get()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::mocks::MockClock;
    use super::*;

    #[test]
    fn test_std_clock_is_monotonic() {
        let clock = StdClock::new();
        let a = clock.now_micros();
        let b = clock.now_micros();
        assert!(b >= a);
    }

    #[test]
    fn test_mock_clock_advances() {
        let clock = MockClock::new();
        assert_eq!(clock.now_micros(), 0);

        clock.advance_millis(5);
        assert_eq!(clock.now_micros(), 5_000);

        clock.advance_micros(1);
        assert_eq!(clock.now_micros(), 5_001);
    }

    #[test]
    fn test_mock_clock_clones_share_time() {
        let clock = MockClock::new();
        let view = clock.clone();

        clock.advance_millis(10);
        assert_eq!(view.now_micros(), 10_000);
    }
}
