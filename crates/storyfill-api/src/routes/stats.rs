//! Process-wide game statistics.

use axum::extract::State;
use axum::{Json, Router, routing::get};
use serde::Serialize;
use tracing::instrument;

use storyfill_game::application::query_handlers;

use crate::error::ApiError;
use crate::state::AppState;

/// Body of GET /api/v1/stats.
#[derive(Debug, Serialize)]
pub struct StatsResponse {
    /// Sessions currently stored, in any phase.
    pub active_sessions: u64,
}

/// GET /api/v1/stats
#[instrument(skip(state))]
async fn get_stats(State(state): State<AppState>) -> Result<Json<StatsResponse>, ApiError> {
    let active_sessions = query_handlers::count_active_sessions(&state.services).await?;
    Ok(Json(StatsResponse { active_sessions }))
}

/// Returns the statistics router.
pub fn router() -> Router<AppState> {
    Router::new().route("/api/v1/stats", get(get_stats))
}
