//! Per-chat lobby countdown timers.
//!
//! A timer only issues `Tick` commands through the regular handler, so
//! the session aggregate stays the single authority over transitions.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use storyfill_core::types::ChatId;
use tokio::task::JoinHandle;
use tokio::time::{Instant, interval_at};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::application::command_handlers::handle_tick;
use crate::application::services::GameServices;
use crate::domain::commands::Tick;
use crate::domain::session::TickOutcome;

#[derive(Debug)]
struct ArmedTimer {
    generation: u64,
    handle: JoinHandle<()>,
}

/// Owns the running countdown task of each chat.
#[derive(Debug, Default)]
pub struct CountdownScheduler {
    timers: Mutex<HashMap<ChatId, ArmedTimer>>,
    next_generation: AtomicU64,
}

impl CountdownScheduler {
    /// Creates a scheduler with no timers.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a countdown task is registered for `chat_id`.
    #[must_use]
    pub fn is_armed(&self, chat_id: ChatId) -> bool {
        self.timers().contains_key(&chat_id)
    }

    /// Stops the countdown of `chat_id`. Returns `false` if none ran.
    pub fn cancel(&self, chat_id: ChatId) -> bool {
        match self.timers().remove(&chat_id) {
            Some(timer) => {
                timer.handle.abort();
                debug!(chat_id, "countdown cancelled");
                true
            }
            None => false,
        }
    }

    /// Registers the task built by `spawn`, replacing any previous one.
    fn arm(&self, chat_id: ChatId, spawn: impl FnOnce(u64) -> JoinHandle<()>) {
        let generation = self.next_generation.fetch_add(1, Ordering::Relaxed);
        let mut timers = self.timers();
        let handle = spawn(generation);
        if let Some(previous) = timers.insert(chat_id, ArmedTimer { generation, handle }) {
            previous.handle.abort();
        }
    }

    /// Unregisters a task that finished on its own.
    fn release(&self, chat_id: ChatId, generation: u64) {
        let mut timers = self.timers();
        if timers
            .get(&chat_id)
            .is_some_and(|timer| timer.generation == generation)
        {
            timers.remove(&chat_id);
        }
    }

    fn timers(&self) -> MutexGuard<'_, HashMap<ChatId, ArmedTimer>> {
        self.timers.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Starts ticking the lobby countdown of `chat_id`.
///
/// The task ends once a tick reports anything but `Continue`.
pub fn start_countdown(services: &Arc<GameServices>, chat_id: ChatId) {
    let period = services.settings.tick_interval;
    let task_services = Arc::clone(services);
    services.countdowns.arm(chat_id, move |generation| {
        tokio::spawn(async move {
            run_countdown(&task_services, chat_id, period).await;
            task_services.countdowns.release(chat_id, generation);
        })
    });
    debug!(chat_id, ?period, "countdown armed");
}

async fn run_countdown(services: &Arc<GameServices>, chat_id: ChatId, period: Duration) {
    let mut ticker = interval_at(Instant::now() + period, period);
    loop {
        ticker.tick().await;
        let command = Tick {
            correlation_id: Uuid::new_v4(),
            chat_id,
        };
        match handle_tick(&command, services).await {
            Ok(TickOutcome::Continue) => {}
            Ok(outcome) => {
                debug!(chat_id, ?outcome, "countdown finished");
                break;
            }
            Err(e) => warn!(chat_id, error = %e, "countdown tick failed"),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use chrono::{TimeZone, Utc};
    use storyfill_core::rng::DeterministicRng;
    use storyfill_test_support::{
        FixedClock, InMemorySessionRepository, MockRng, RecordingRenderSink,
    };
    use uuid::Uuid;

    use super::*;
    use crate::application::command_handlers::{handle_join, handle_start_lobby};
    use crate::domain::commands::{JoinGame, StartLobby};
    use crate::domain::session::SessionStatus;
    use crate::settings::GameSettings;

    fn fast_services(sink: &Arc<RecordingRenderSink>) -> Arc<GameServices> {
        let rng: Arc<Mutex<dyn DeterministicRng + Send>> = Arc::new(Mutex::new(MockRng));
        let settings = GameSettings {
            countdown_seconds: 30,
            tick_seconds: 15,
            tick_interval: Duration::from_millis(20),
            stale_after: chrono::Duration::hours(24),
        };
        Arc::new(GameServices::new(
            Arc::new(InMemorySessionRepository::new()),
            Arc::clone(sink) as Arc<dyn storyfill_core::render::RenderSink>,
            rng,
            Arc::new(FixedClock(Utc.with_ymd_and_hms(2026, 1, 15, 10, 0, 0).unwrap())),
            settings,
        ))
    }

    async fn wait_until_disarmed(services: &GameServices, chat_id: ChatId) {
        for _ in 0..100 {
            if !services.countdowns.is_armed(chat_id) {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("countdown for chat {chat_id} never finished");
    }

    #[tokio::test]
    async fn test_countdown_aborts_empty_lobby_and_deletes_session() {
        // Arrange
        let sink = Arc::new(RecordingRenderSink::new());
        let services = fast_services(&sink);
        let command = StartLobby {
            correlation_id: Uuid::new_v4(),
            chat_id: -7,
        };

        // Act
        handle_start_lobby(&command, &services).await.unwrap();
        wait_until_disarmed(&services, -7).await;

        // Assert
        assert!(services.store.load(-7).await.unwrap().is_none());
        assert_eq!(sink.kinds_for(-7).last().map(String::as_str), Some("lobby_aborted"));
    }

    #[tokio::test]
    async fn test_countdown_starts_game_with_four_players() {
        // Arrange
        let sink = Arc::new(RecordingRenderSink::new());
        let services = fast_services(&sink);
        let start = StartLobby {
            correlation_id: Uuid::new_v4(),
            chat_id: -8,
        };
        handle_start_lobby(&start, &services).await.unwrap();
        for player_id in 1..=4 {
            let join = JoinGame {
                correlation_id: Uuid::new_v4(),
                chat_id: -8,
                player_id,
                display_name: format!("Player {player_id}"),
            };
            handle_join(&join, &services).await.unwrap();
        }

        // Act
        wait_until_disarmed(&services, -8).await;

        // Assert
        let session = services.store.load(-8).await.unwrap().unwrap();
        assert_eq!(session.status(), SessionStatus::InProgress);
        assert_eq!(session.question_plan().len(), 4);
        assert!(sink.kinds_for(-8).contains(&"question_prompt".to_owned()));
    }

    #[tokio::test]
    async fn test_cancel_stops_running_countdown() {
        // Arrange
        let sink = Arc::new(RecordingRenderSink::new());
        let services = fast_services(&sink);
        let command = StartLobby {
            correlation_id: Uuid::new_v4(),
            chat_id: -9,
        };
        handle_start_lobby(&command, &services).await.unwrap();

        // Act
        let cancelled = services.countdowns.cancel(-9);

        // Assert
        assert!(cancelled);
        assert!(!services.countdowns.is_armed(-9));
        assert!(!services.countdowns.cancel(-9));
    }
}
