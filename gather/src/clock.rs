//! Clock abstraction.
//!
//! Phase derivation and reconciliation depend on "now"; injecting the clock
//! keeps both deterministic under test. Production wiring uses
//! [`SystemClock`]; tests use [`ManualClock`] and move time explicitly.

use std::sync::{Arc, RwLock};

use chrono::Duration;

use crate::types::Timestamp;

/// A source of the current moment.
pub trait Clock: Send + Sync {
    /// Returns the current moment.
    fn now(&self) -> Timestamp;
}

/// The real system clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        Timestamp::now()
    }
}

/// A settable clock for deterministic tests.
///
/// Clones share the same underlying instant, so a clock handed to a service
/// can be advanced from the test body.
#[derive(Debug, Clone)]
pub struct ManualClock {
    instant: Arc<RwLock<Timestamp>>,
}

impl ManualClock {
    /// Creates a manual clock frozen at the given instant.
    pub fn starting_at(instant: Timestamp) -> Self {
        Self {
            instant: Arc::new(RwLock::new(instant)),
        }
    }

    /// Moves the clock to an absolute instant.
    pub fn set(&self, instant: Timestamp) {
        *self.instant.write().expect("RwLock poisoned") = instant;
    }

    /// Advances the clock by a duration (which may be negative).
    pub fn advance(&self, by: Duration) {
        let mut guard = self.instant.write().expect("RwLock poisoned");
        *guard = Timestamp::new(*guard.as_datetime() + by);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Timestamp {
        *self.instant.read().expect("RwLock poisoned")
    }
}
