//! Game-level tuning knobs.

use std::time::Duration;

/// Timing settings shared by the handlers and the countdown scheduler.
#[derive(Debug, Clone)]
pub struct GameSettings {
    /// Initial lobby countdown, in seconds.
    pub countdown_seconds: i32,
    /// Seconds removed from the countdown by each tick.
    pub tick_seconds: i32,
    /// Wall-clock period between ticks.
    pub tick_interval: Duration,
    /// Idle age after which a session is swept.
    pub stale_after: chrono::Duration,
}

impl GameSettings {
    /// Builds settings where one tick removes exactly the seconds it waits.
    #[must_use]
    pub fn new(countdown_seconds: i32, tick_seconds: u32, stale_after_hours: i64) -> Self {
        Self {
            countdown_seconds,
            tick_seconds: i32::try_from(tick_seconds).unwrap_or(i32::MAX),
            tick_interval: Duration::from_secs(u64::from(tick_seconds)),
            stale_after: chrono::Duration::hours(stale_after_hours),
        }
    }
}

impl Default for GameSettings {
    fn default() -> Self {
        Self::new(30, 2, 24)
    }
}
