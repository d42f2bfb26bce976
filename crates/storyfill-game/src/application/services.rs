//! Dependencies shared by every handler.

use std::sync::{Arc, Mutex};

use storyfill_core::clock::Clock;
use storyfill_core::error::DomainError;
use storyfill_core::render::RenderSink;
use storyfill_core::repository::SessionRepository;
use storyfill_core::rng::DeterministicRng;

use crate::application::countdown::CountdownScheduler;
use crate::application::session_store::SessionStore;
use crate::settings::GameSettings;

/// Injected collaborators of the turn engine.
pub struct GameServices {
    /// Cached session persistence.
    pub store: SessionStore,
    /// Outbound render transport.
    pub renderer: Arc<dyn RenderSink>,
    /// Shared random source for shuffles and option draws.
    pub rng: Arc<Mutex<dyn DeterministicRng + Send>>,
    /// Time source for session timestamps.
    pub clock: Arc<dyn Clock>,
    /// Timing settings.
    pub settings: GameSettings,
    /// Per-chat countdown timers.
    pub countdowns: CountdownScheduler,
}

impl std::fmt::Debug for GameServices {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GameServices")
            .field("store", &self.store)
            .field("settings", &self.settings)
            .field("countdowns", &self.countdowns)
            .finish_non_exhaustive()
    }
}

impl GameServices {
    /// Wires the services around a repository and render sink.
    #[must_use]
    pub fn new(
        repo: Arc<dyn SessionRepository>,
        renderer: Arc<dyn RenderSink>,
        rng: Arc<Mutex<dyn DeterministicRng + Send>>,
        clock: Arc<dyn Clock>,
        settings: GameSettings,
    ) -> Self {
        Self {
            store: SessionStore::new(repo),
            renderer,
            rng,
            clock,
            settings,
            countdowns: CountdownScheduler::new(),
        }
    }

    /// Runs a synchronous domain step with the RNG locked.
    ///
    /// Never hold the guard across an await point.
    pub(crate) fn with_rng<T>(
        &self,
        step: impl FnOnce(&mut dyn DeterministicRng) -> T,
    ) -> Result<T, DomainError> {
        let mut rng_guard = self
            .rng
            .lock()
            .map_err(|e| DomainError::Infrastructure(format!("RNG mutex poisoned: {e}")))?;
        Ok(step(&mut *rng_guard))
    }
}
