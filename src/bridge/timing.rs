//! Monotonic time source and the rate limiter for periodic branches.

/// Monotonic milliseconds since boot.
pub trait Clock {
    fn now_ms(&self) -> u64;
}

impl<F: Fn() -> u64> Clock for F {
    fn now_ms(&self) -> u64 {
        self()
    }
}

/// Minimum-interval gate.  The first call is always due.
#[derive(Clone, Copy, Debug)]
pub struct Interval {
    period_ms: u64,
    last: Option<u64>,
}

impl Interval {
    pub const fn new(period_ms: u64) -> Self {
        Self {
            period_ms,
            last: None,
        }
    }

    /// `true` (and re-armed) if at least one period passed since the last
    /// `true`.
    pub fn due(&mut self, now_ms: u64) -> bool {
        match self.last {
            Some(last) if now_ms.saturating_sub(last) < self.period_ms => false,
            _ => {
                self.last = Some(now_ms);
                true
            }
        }
    }

    pub fn reset(&mut self) {
        self.last = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fires_once_per_period() {
        let mut iv = Interval::new(50);
        assert!(iv.due(1000));
        assert!(!iv.due(1000));
        assert!(!iv.due(1049));
        assert!(iv.due(1050));
        assert!(!iv.due(1080));
        assert!(iv.due(1200));
    }

    #[test]
    fn reset_makes_next_call_due() {
        let mut iv = Interval::new(1000);
        assert!(iv.due(0));
        iv.reset();
        assert!(iv.due(10));
    }

    #[test]
    fn closures_are_clocks() {
        let t = core::cell::Cell::new(42u64);
        let clock = || t.get();
        assert_eq!(clock.now_ms(), 42);
        t.set(43);
        assert_eq!(clock.now_ms(), 43);
    }
}
