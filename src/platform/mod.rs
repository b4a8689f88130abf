//! Platform abstraction layer
//!
//! Handles browser/native differences for:
//! - Time (monotonic milliseconds and wall-clock timestamps)
//! - Deferred callbacks (countdown timers) with cancellation

pub mod timers;

use std::cell::Cell;
use std::rc::Rc;

use chrono::{DateTime, Duration, Utc};

pub use timers::{Fired, TimerQueue, TimerToken};

/// Source of time for the engine
pub trait Clock {
    /// Monotonic milliseconds (same timeline as animation-frame timestamps)
    fn now_ms(&self) -> f64;
    /// Wall-clock time for session records
    fn wall_time(&self) -> DateTime<Utc>;
}

/// Real time: `performance.now()` in the browser, `Instant` natively
pub struct SystemClock {
    #[cfg(not(target_arch = "wasm32"))]
    origin: std::time::Instant,
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            #[cfg(not(target_arch = "wasm32"))]
            origin: std::time::Instant::now(),
        }
    }
}

impl Clock for SystemClock {
    #[cfg(target_arch = "wasm32")]
    fn now_ms(&self) -> f64 {
        web_sys::window()
            .and_then(|w| w.performance())
            .map(|p| p.now())
            .unwrap_or_else(js_sys::Date::now)
    }

    #[cfg(not(target_arch = "wasm32"))]
    fn now_ms(&self) -> f64 {
        self.origin.elapsed().as_secs_f64() * 1000.0
    }

    fn wall_time(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Hand-driven clock for tests and headless runs.
/// Clones share the same time.
#[derive(Debug, Clone)]
pub struct ManualClock {
    now_ms: Rc<Cell<f64>>,
    epoch: DateTime<Utc>,
}

impl ManualClock {
    pub fn new(epoch: DateTime<Utc>) -> Self {
        Self {
            now_ms: Rc::new(Cell::new(0.0)),
            epoch,
        }
    }

    pub fn set(&self, now_ms: f64) {
        self.now_ms.set(now_ms);
    }

    pub fn advance(&self, ms: f64) -> f64 {
        let now = self.now_ms.get() + ms;
        self.now_ms.set(now);
        now
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> f64 {
        self.now_ms.get()
    }

    fn wall_time(&self) -> DateTime<Utc> {
        self.epoch + Duration::microseconds((self.now_ms.get() * 1000.0) as i64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_manual_clock_shared_between_clones() {
        let epoch = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        let clock = ManualClock::new(epoch);
        let other = clock.clone();
        clock.advance(1500.0);
        assert_eq!(other.now_ms(), 1500.0);
        assert_eq!(other.wall_time(), epoch + Duration::milliseconds(1500));
    }

    #[test]
    fn test_system_clock_is_monotonic() {
        let clock = SystemClock::new();
        let a = clock.now_ms();
        let b = clock.now_ms();
        assert!(b >= a);
    }
}
