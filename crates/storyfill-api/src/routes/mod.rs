//! Route modules and the assembled application router.

pub mod chats;
pub mod health;
pub mod stats;

use axum::Router;

use crate::state::AppState;

/// Builds the full route tree over `state`. Middleware layers are added
/// by the binary.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(health::router())
        .merge(stats::router())
        .nest("/api/v1/chats", chats::router())
        .with_state(state)
}
