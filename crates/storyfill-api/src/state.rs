//! Shared application state.

use std::sync::Arc;

use storyfill_game::application::services::GameServices;

use crate::outbox::RenderOutbox;

/// Application state shared across all request handlers.
#[derive(Debug, Clone)]
pub struct AppState {
    /// The game engine and its collaborators.
    pub services: Arc<GameServices>,
    /// Renders waiting for the chat gateway.
    pub outbox: Arc<RenderOutbox>,
}

impl AppState {
    /// Create new application state.
    #[must_use]
    pub fn new(services: Arc<GameServices>, outbox: Arc<RenderOutbox>) -> Self {
        Self { services, outbox }
    }
}
