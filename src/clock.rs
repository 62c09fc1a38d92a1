//! Monotonic time source shared by the network poll loop, the accept loop and
//! stream sessions.

use std::time::{Duration, Instant};

pub trait Clock {
    /// Time elapsed since the clock's origin (boot for the system clock).
    fn now(&self) -> Duration;

    /// Block the calling task.
    fn sleep(&self, duration: Duration);
}

/// Wall clock backed by `Instant`; `thread::sleep` yields to FreeRTOS on the device.
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Duration {
        self.origin.elapsed()
    }

    fn sleep(&self, duration: Duration) {
        if !duration.is_zero() {
            std::thread::sleep(duration);
        }
    }
}

/// Clock that only moves when slept on or advanced by hand.
#[cfg(test)]
pub struct ManualClock {
    now: std::cell::Cell<Duration>,
    sleeps: std::cell::Cell<u32>,
}

#[cfg(test)]
impl ManualClock {
    pub fn new() -> Self {
        Self {
            now: std::cell::Cell::new(Duration::ZERO),
            sleeps: std::cell::Cell::new(0),
        }
    }

    pub fn advance(&self, by: Duration) {
        self.now.set(self.now.get() + by);
    }

    pub fn sleep_count(&self) -> u32 {
        self.sleeps.get()
    }
}

#[cfg(test)]
impl Clock for ManualClock {
    fn now(&self) -> Duration {
        self.now.get()
    }

    fn sleep(&self, duration: Duration) {
        self.sleeps.set(self.sleeps.get() + 1);
        self.advance(duration);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manual_clock_advances_on_sleep() {
        let clock = ManualClock::new();
        clock.sleep(Duration::from_millis(80));
        clock.sleep(Duration::from_millis(20));
        assert_eq!(clock.now(), Duration::from_millis(100));
        assert_eq!(clock.sleep_count(), 2);
    }

    #[test]
    fn system_clock_is_monotonic() {
        let clock = SystemClock::new();
        let a = clock.now();
        clock.sleep(Duration::from_millis(1));
        assert!(clock.now() > a);
    }
}
