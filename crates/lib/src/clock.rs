//! Time provider abstraction
//!
//! Pseudonyms created by the reconciler are stamped with the current time.
//! The [`Clock`] trait lets production code use system time while tests pin
//! it to a known value.
//!
//! # Example
//!
//! ```
//! use enrollsync::clock::{Clock, FixedClock};
//!
//! let clock = FixedClock::new(1000);
//! assert_eq!(clock.now_millis(), 1000);
//! clock.advance(500);
//! assert_eq!(clock.now_millis(), 1500);
//! ```

use std::fmt::Debug;
use std::sync::atomic::{AtomicI64, Ordering};

/// A time provider for getting current timestamps.
pub trait Clock: Send + Sync + Debug {
    /// Returns the current time as milliseconds since Unix epoch.
    fn now_millis(&self) -> i64;

    /// Returns the current time as an RFC3339-formatted string.
    fn now_rfc3339(&self) -> String {
        chrono::DateTime::from_timestamp_millis(self.now_millis())
            .unwrap_or_default()
            .to_rfc3339()
    }
}

/// Production clock using real system time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> i64 {
        chrono::Utc::now().timestamp_millis()
    }
}

/// Clock that only moves when told to.
#[derive(Debug)]
pub struct FixedClock {
    millis: AtomicI64,
}

impl FixedClock {
    /// Create a clock frozen at the given time in milliseconds.
    pub fn new(millis: i64) -> Self {
        Self {
            millis: AtomicI64::new(millis),
        }
    }

    /// Advance the clock by the given number of milliseconds.
    pub fn advance(&self, ms: i64) {
        self.millis.fetch_add(ms, Ordering::SeqCst);
    }

    /// Set the clock to a specific time in milliseconds.
    pub fn set(&self, ms: i64) {
        self.millis.store(ms, Ordering::SeqCst);
    }
}

impl Clock for FixedClock {
    fn now_millis(&self) -> i64 {
        self.millis.load(Ordering::SeqCst)
    }
}

impl Default for FixedClock {
    fn default() -> Self {
        // 2024-01-01 00:00:00 UTC
        Self::new(1704067200000)
    }
}
