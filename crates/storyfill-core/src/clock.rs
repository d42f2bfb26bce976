//! Clock abstraction for determinism.
//!
//! Session `created_at` and `updated_at` stamps and the stale-session
//! cutoff all read the time through [`Clock`], so tests can pin it with
//! a fixed clock from the test-support crate.

use chrono::{DateTime, Utc};

/// Source of "now" for the turn engine and session store.
pub trait Clock: Send + Sync {
    /// Returns the current time, used to stamp session writes.
    fn now(&self) -> DateTime<Utc>;
}

/// Production clock that delegates to the system clock.
#[derive(Debug, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
