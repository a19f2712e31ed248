//! Time sources
//!
//! Timestamps are decimal seconds since a fixed epoch. The filter only ever
//! subtracts them, so any monotonic-in-practice source works.

use std::cell::Cell;

use chrono::Utc;

/// Source of the current time in decimal seconds
pub trait Clock {
    fn now(&self) -> f64;
}

/// Unix wall clock with microsecond resolution
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> f64 {
        Utc::now().timestamp_micros() as f64 / 1.0e6
    }
}

/// Clock that only moves when told to
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    t: Cell<f64>,
}

impl ManualClock {
    pub fn new(t: f64) -> Self {
        Self { t: Cell::new(t) }
    }

    pub fn set(&self, t: f64) {
        self.t.set(t);
    }

    pub fn advance(&self, dt: f64) {
        self.t.set(self.t.get() + dt);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> f64 {
        self.t.get()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manual_clock() {
        let clock = ManualClock::new(1.5);
        clock.advance(0.25);
        assert_eq!(clock.now(), 1.75);
        clock.set(-3.0);
        assert_eq!(clock.now(), -3.0);
    }

    #[test]
    fn test_system_clock_is_unix_seconds() {
        // 2020-01-01T00:00:00Z
        assert!(SystemClock.now() > 1_577_836_800.0);
    }
}
