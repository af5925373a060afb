//! Time sources
//!
//! Every timer in the crate reads milliseconds from a [`Clock`]. The browser
//! build reads `performance.now()`; tests and the headless binary advance a
//! [`VirtualClock`] by hand so nothing ever waits on real time.

use std::cell::Cell;
use std::rc::Rc;

/// Monotonic millisecond time source
pub trait Clock {
    /// Current time in milliseconds
    fn now_ms(&self) -> f64;

    /// Current time in seconds
    fn now_secs(&self) -> f64 {
        self.now_ms() / 1000.0
    }
}

/// Manually advanced clock
///
/// Cloning shares the underlying time, so a test can hand one clone to the
/// preloader, another to the simulated audio backend, and drive both.
#[derive(Debug, Clone, Default)]
pub struct VirtualClock {
    now: Rc<Cell<f64>>,
}

impl VirtualClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start at a given time (ms)
    pub fn starting_at(ms: f64) -> Self {
        let clock = Self::new();
        clock.set(ms);
        clock
    }

    /// Move time forward by `ms` (negative values are ignored)
    pub fn advance(&self, ms: f64) {
        if ms > 0.0 {
            self.now.set(self.now.get() + ms);
        }
    }

    /// Jump to an absolute time; never moves backwards
    pub fn set(&self, ms: f64) {
        if ms > self.now.get() {
            self.now.set(ms);
        }
    }
}

impl Clock for VirtualClock {
    fn now_ms(&self) -> f64 {
        self.now.get()
    }
}

/// Page-relative monotonic time from `performance.now()`
#[cfg(target_arch = "wasm32")]
#[derive(Debug, Clone, Copy, Default)]
pub struct BrowserClock;

#[cfg(target_arch = "wasm32")]
impl Clock for BrowserClock {
    fn now_ms(&self) -> f64 {
        // Date is only a fallback for hosts without the Performance API
        web_sys::window()
            .and_then(|w| w.performance())
            .map(|p| p.now())
            .unwrap_or_else(js_sys::Date::now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_virtual_clock_shared_between_clones() {
        let clock = VirtualClock::new();
        let other = clock.clone();
        clock.advance(250.0);
        assert_eq!(other.now_ms(), 250.0);
        assert_eq!(other.now_secs(), 0.25);
    }

    #[test]
    fn test_virtual_clock_never_rewinds() {
        let clock = VirtualClock::starting_at(1000.0);
        clock.set(500.0);
        clock.advance(-10.0);
        assert_eq!(clock.now_ms(), 1000.0);
    }
}
